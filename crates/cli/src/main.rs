use anyhow::Context;
use bookshelf_kernel::settings::Settings;
use clap::{Parser, Subcommand};

/// Book catalogue service
#[derive(Debug, Parser)]
#[command(name = "bookshelf", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP service (default)
    Serve,
    /// Create the database schema and exit
    Migrate,
    /// Print the effective configuration with secrets hidden
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().with_context(|| "failed to load bookshelf settings")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            bookshelf_telemetry::init(&settings.telemetry)?;
            bookshelf_app::run(&settings).await
        }
        Command::Migrate => {
            bookshelf_telemetry::init(&settings.telemetry)?;
            bookshelf_app::migrate(&settings).await
        }
        Command::CheckConfig => {
            print_settings(&settings);
            Ok(())
        }
    }
}

fn print_settings(settings: &Settings) {
    println!("environment    = {:?}", settings.environment);
    println!("listen         = {}", settings.server.bind_address());
    println!("timeout_ms     = {}", settings.server.request_timeout_ms);
    println!("database       = {}", settings.database.target());
    println!("max_conns      = {}", settings.database.max_connections);
    println!("connect_tries  = {}", settings.database.connect_attempts);
    println!(
        "log            = {} ({:?})",
        settings.telemetry.log_level, settings.telemetry.log_format
    );
    println!("update_key     = {:?}", settings.books.update_key);
}
