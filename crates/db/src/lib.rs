//! PostgreSQL pool factory and schema bootstrap.

use std::time::Duration;

use anyhow::Context;
use backon::{ExponentialBuilder, Retryable};
use bookshelf_kernel::{settings::DatabaseSettings, Migration};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};

pub use sqlx::PgPool;

/// Build connection options from settings.
///
/// A configured `url` wins over the individual fields and keeps its own
/// `sslmode`; otherwise TLS is disabled.
pub fn connect_options(settings: &DatabaseSettings) -> anyhow::Result<PgConnectOptions> {
    if let Some(url) = &settings.url {
        return url
            .parse::<PgConnectOptions>()
            .context("invalid database url");
    }

    Ok(PgConnectOptions::new()
        .host(&settings.host)
        .port(settings.port)
        .username(&settings.user)
        .password(&settings.password)
        .database(&settings.name)
        .ssl_mode(PgSslMode::Disable))
}

/// `user@host:port/name` for logs and error messages.
fn describe(options: &PgConnectOptions) -> String {
    format!(
        "{}@{}:{}/{}",
        options.get_username(),
        options.get_host(),
        options.get_port(),
        options.get_database().unwrap_or_default()
    )
}

fn retry_policy(settings: &DatabaseSettings) -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(500))
        .with_max_delay(Duration::from_secs(10))
        .with_max_times(settings.connect_attempts.saturating_sub(1))
}

/// Open a connection pool and verify the server is reachable.
///
/// Retries with exponential backoff up to `connect_attempts` in total.
pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<PgPool> {
    let options = connect_options(settings)?;
    let target = describe(&options);
    tracing::info!(target: "bookshelf-db", db = %target, "connecting to database");

    let pool = (|| async {
        PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(Duration::from_millis(settings.connect_timeout_ms))
            .connect_with(options.clone())
            .await
    })
    .retry(retry_policy(settings))
    .notify(|err: &sqlx::Error, dur: Duration| {
        tracing::warn!(
            target: "bookshelf-db",
            db = %target,
            error = %err,
            "database connection failed, retrying in {:?}",
            dur
        );
    })
    .await
    .with_context(|| format!("failed to connect to database {target}"))?;

    tracing::info!(target: "bookshelf-db", db = %target, "database connection established");
    Ok(pool)
}

/// Execute module migrations in the given order.
///
/// Every statement must be idempotent; nothing records which ones ran.
pub async fn apply_migrations(
    pool: &PgPool,
    migrations: &[(String, Migration)],
) -> anyhow::Result<()> {
    for (module, migration) in migrations {
        tracing::info!(
            target: "bookshelf-db",
            module = %module,
            migration = migration.id,
            "applying migration"
        );

        sqlx::raw_sql(migration.up)
            .execute(pool)
            .await
            .with_context(|| format!("migration {}/{} failed", module, migration.id))?;
    }

    Ok(())
}
