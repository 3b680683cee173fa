//! Bookshelf application library
//!
//! Wires the book catalogue module into the kernel registry and runs the
//! HTTP server on top of a PostgreSQL pool.

pub mod modules;

use anyhow::Context;
use bookshelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};

/// Re-export commonly used types
pub use modules::*;

/// Connect to the database, apply module migrations, and return the
/// populated registry alongside the pool.
pub async fn bootstrap(
    settings: &Settings,
) -> anyhow::Result<(ModuleRegistry, bookshelf_db::PgPool)> {
    let pool = bookshelf_db::connect(&settings.database).await?;

    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, pool.clone(), settings);

    bookshelf_db::apply_migrations(&pool, &registry.collect_migrations())
        .await
        .context("failed to create database schema")?;

    Ok((registry, pool))
}

/// Apply the schema and exit.
pub async fn migrate(settings: &Settings) -> anyhow::Result<()> {
    let (_, pool) = bootstrap(settings).await?;
    pool.close().await;
    tracing::info!("schema is up to date");
    Ok(())
}

/// Run the service until a shutdown signal arrives.
pub async fn run(settings: &Settings) -> anyhow::Result<()> {
    tracing::info!(
        env = ?settings.environment,
        db = %settings.database.target(),
        "bookshelf-app bootstrap starting"
    );

    let (registry, pool) = bootstrap(settings).await?;

    let ctx = InitCtx { settings };
    registry.init_modules(&ctx).await?;
    registry.start_modules(&ctx).await?;

    tracing::info!("bookshelf-app bootstrap complete");

    let served = bookshelf_http::start_server(&registry, settings).await;
    let stopped = registry.stop_modules().await;
    pool.close().await;

    served?;
    stopped
}
