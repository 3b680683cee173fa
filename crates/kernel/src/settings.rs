use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use serde::Deserialize;

const DEFAULT_ENV: &str = "local";
const ENV_VAR_NAME: &str = "BOOKSHELF_ENV";
const CONFIG_DIR_ENV: &str = "BOOKSHELF_CONFIG_DIR";
const ENV_PREFIX: &str = "BOOKSHELF";

/// Plain variables understood for compatibility with container setups,
/// applied after every other source.
const LEGACY_OVERRIDES: &[(&str, &str)] = &[
    ("PORT", "server.port"),
    ("POSTGRES_USER", "database.user"),
    ("POSTGRES_PASSWORD", "database.password"),
    ("POSTGRES_HOST", "database.host"),
    ("POSTGRES_DB", "database.name"),
    ("DATABASE_URL", "database.url"),
];

/// Deployment environment the application is running in.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Staging,
    Production,
}

impl Environment {
    fn parse(name: &str) -> anyhow::Result<Self> {
        match name {
            "local" => Ok(Environment::Local),
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            other => Err(anyhow!(
                "unsupported environment '{}'; expected local/staging/production",
                other
            )),
        }
    }
}

/// Top-level configuration structure loaded from layered sources.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
    #[serde(default)]
    pub books: BooksSettings,
}

impl Settings {
    /// Load configuration by layering `.env`, config files, and the process environment.
    pub fn load() -> anyhow::Result<Self> {
        // Allow missing `.env` files without failing.
        let _ = dotenvy::dotenv();

        let vars: HashMap<String, String> = std::env::vars().collect();
        let config_dir = match vars.get(CONFIG_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => std::env::current_dir()
                .map(|cwd| cwd.join("config"))
                .context("unable to resolve current directory")?,
        };

        Self::load_from(&config_dir, &vars)
    }

    /// Load configuration from `config_dir` and an explicit variable map.
    ///
    /// Precedence, lowest first: `base.toml`, `{environment}.toml`,
    /// `BOOKSHELF_*` variables (`__` separates nested keys), then the plain
    /// `PORT` and `POSTGRES_*` variables.
    pub fn load_from(config_dir: &Path, vars: &HashMap<String, String>) -> anyhow::Result<Self> {
        let environment_name = vars
            .get(ENV_VAR_NAME)
            .map(String::as_str)
            .unwrap_or(DEFAULT_ENV);
        let environment = Environment::parse(environment_name)?;

        let base_path = config_dir.join("base.toml");
        let environment_path = config_dir.join(format!("{}.toml", environment_name));

        let prefixed: config::Map<String, String> = vars
            .iter()
            .filter(|(key, _)| key.starts_with(&format!("{ENV_PREFIX}_")))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let mut builder = config::Config::builder()
            .add_source(config::File::from(base_path).required(false))
            .add_source(config::File::from(environment_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(Some(prefixed)),
            );

        for (var, key) in LEGACY_OVERRIDES {
            builder = builder
                .set_override_option(*key, vars.get(*var).cloned())
                .with_context(|| format!("failed to apply {var}"))?;
        }

        let cfg = builder
            .build()
            .with_context(|| "failed to build configuration")?;

        let mut settings: Settings = cfg
            .try_deserialize()
            .with_context(|| "failed to deserialize configuration")?;

        settings.environment = environment;

        Ok(settings)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "ServerSettings::default_host")]
    pub host: String,
    #[serde(default = "ServerSettings::default_port")]
    pub port: u16,
    #[serde(default = "ServerSettings::default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl ServerSettings {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        8080
    }

    fn default_request_timeout_ms() -> u64 {
        15000
    }

    /// `host:port` pair the listener binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            request_timeout_ms: Self::default_request_timeout_ms(),
        }
    }
}

#[derive(Clone, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "DatabaseSettings::default_host")]
    pub host: String,
    #[serde(default = "DatabaseSettings::default_port")]
    pub port: u16,
    #[serde(default = "DatabaseSettings::default_user")]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "DatabaseSettings::default_name")]
    pub name: String,
    #[serde(default = "DatabaseSettings::default_max_connections")]
    pub max_connections: u32,
    /// Total connection attempts at startup; 1 means fail on the first error.
    #[serde(default = "DatabaseSettings::default_connect_attempts")]
    pub connect_attempts: usize,
    /// How long one attempt may wait for a connection.
    #[serde(default = "DatabaseSettings::default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// `postgres://` URL; replaces host, port, user, password and name when set.
    #[serde(default)]
    pub url: Option<String>,
}

impl DatabaseSettings {
    fn default_host() -> String {
        "localhost".to_string()
    }

    fn default_port() -> u16 {
        5432
    }

    fn default_user() -> String {
        "postgres".to_string()
    }

    fn default_name() -> String {
        "postgres".to_string()
    }

    fn default_max_connections() -> u32 {
        5
    }

    fn default_connect_attempts() -> usize {
        1
    }

    fn default_connect_timeout_ms() -> u64 {
        30000
    }

    /// Connection target without credentials, safe to log.
    pub fn target(&self) -> String {
        match self.url {
            Some(_) => "<database url>".to_string(),
            None => format!("{}@{}:{}/{}", self.user, self.host, self.port, self.name),
        }
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            user: Self::default_user(),
            password: String::new(),
            name: Self::default_name(),
            max_connections: Self::default_max_connections(),
            connect_attempts: Self::default_connect_attempts(),
            connect_timeout_ms: Self::default_connect_timeout_ms(),
            url: None,
        }
    }
}

impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("name", &self.name)
            .field("max_connections", &self.max_connections)
            .field("connect_attempts", &self.connect_attempts)
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .field("url", &self.url.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetrySettings {
    /// Default filter directive; `RUST_LOG` takes precedence when set.
    #[serde(default = "TelemetrySettings::default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
}

impl TelemetrySettings {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
            log_format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct BooksSettings {
    #[serde(default)]
    pub update_key: UpdateKey,
}

/// Which `id` an update statement is keyed on.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UpdateKey {
    /// The `{id}` path parameter; the body `id` is ignored.
    #[default]
    Path,
    /// The `id` carried in the request body; the path parameter is ignored.
    Body,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn missing_dir() -> PathBuf {
        std::env::temp_dir().join("bookshelf-settings-tests-no-such-dir")
    }

    #[test]
    fn default_environment_is_local() {
        let settings = Settings::default();
        assert_eq!(settings.environment, Environment::Local);
    }

    #[test]
    fn defaults_apply_without_sources() {
        let settings = Settings::load_from(&missing_dir(), &HashMap::new()).unwrap();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.database.host, "localhost");
        assert_eq!(settings.database.port, 5432);
        assert_eq!(settings.database.connect_attempts, 1);
        assert_eq!(settings.database.connect_timeout_ms, 30000);
        assert!(settings.database.url.is_none());
        assert_eq!(settings.books.update_key, UpdateKey::Path);
        assert_eq!(settings.telemetry.log_format, LogFormat::Pretty);
    }

    #[test]
    fn plain_postgres_variables_are_honoured() {
        let settings = Settings::load_from(
            &missing_dir(),
            &vars(&[
                ("PORT", "9090"),
                ("POSTGRES_USER", "librarian"),
                ("POSTGRES_PASSWORD", "12345"),
                ("POSTGRES_HOST", "db"),
                ("POSTGRES_DB", "library"),
            ]),
        )
        .unwrap();

        assert_eq!(settings.server.port, 9090);
        assert_eq!(settings.database.user, "librarian");
        assert_eq!(settings.database.password, "12345");
        assert_eq!(settings.database.host, "db");
        assert_eq!(settings.database.name, "library");
    }

    #[test]
    fn database_url_variable_is_honoured_and_hidden() {
        let settings = Settings::load_from(
            &missing_dir(),
            &vars(&[
                ("DATABASE_URL", "postgres://librarian:hunter2@db:5433/library"),
                ("BOOKSHELF_DATABASE__CONNECT_TIMEOUT_MS", "2500"),
            ]),
        )
        .unwrap();

        assert_eq!(
            settings.database.url.as_deref(),
            Some("postgres://librarian:hunter2@db:5433/library")
        );
        assert_eq!(settings.database.connect_timeout_ms, 2500);
        assert_eq!(settings.database.target(), "<database url>");
        assert!(!format!("{:?}", settings.database).contains("hunter2"));
    }

    #[test]
    fn plain_port_overrides_prefixed_port() {
        let settings = Settings::load_from(
            &missing_dir(),
            &vars(&[("BOOKSHELF_SERVER__PORT", "7000"), ("PORT", "7001")]),
        )
        .unwrap();
        assert_eq!(settings.server.port, 7001);
    }

    #[test]
    fn prefixed_variables_reach_nested_sections() {
        let settings = Settings::load_from(
            &missing_dir(),
            &vars(&[
                ("BOOKSHELF_BOOKS__UPDATE_KEY", "body"),
                ("BOOKSHELF_TELEMETRY__LOG_FORMAT", "json"),
                ("BOOKSHELF_DATABASE__CONNECT_ATTEMPTS", "4"),
            ]),
        )
        .unwrap();
        assert_eq!(settings.books.update_key, UpdateKey::Body);
        assert_eq!(settings.telemetry.log_format, LogFormat::Json);
        assert_eq!(settings.database.connect_attempts, 4);
    }

    #[test]
    fn unknown_environment_is_rejected() {
        let err = Settings::load_from(&missing_dir(), &vars(&[("BOOKSHELF_ENV", "qa")]))
            .unwrap_err();
        assert!(err.to_string().contains("unsupported environment 'qa'"));
    }

    #[test]
    fn database_debug_hides_password() {
        let database = DatabaseSettings {
            password: "hunter2".to_string(),
            ..DatabaseSettings::default()
        };
        let rendered = format!("{database:?}");
        assert!(!rendered.contains("hunter2"));
        assert_eq!(database.target(), "postgres@localhost:5432/postgres");
    }
}
