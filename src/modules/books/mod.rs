pub mod models;
pub mod routes;
pub mod store;

use std::sync::Arc;

use async_trait::async_trait;
use bookshelf_kernel::{
    settings::{BooksSettings, UpdateKey},
    InitCtx, Migration, Module,
};
use utoipa_axum::router::OpenApiRouter;

use routes::BooksState;
use store::BookStore;

const CREATE_BOOKS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS books (
        id     VARCHAR(36)  PRIMARY KEY,
        title  VARCHAR(255) NOT NULL,
        author VARCHAR(255) NOT NULL
    )
"#;

/// The book catalogue: CRUD routes over the `books` table.
pub struct BooksModule {
    store: Arc<dyn BookStore>,
    update_key: UpdateKey,
}

impl BooksModule {
    pub fn new(store: Arc<dyn BookStore>, settings: &BooksSettings) -> Self {
        Self {
            store,
            update_key: settings.update_key,
        }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            update_key = ?self.update_key,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> OpenApiRouter {
        routes::router(BooksState {
            store: self.store.clone(),
            update_key: self.update_key,
        })
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_init",
            up: CREATE_BOOKS_TABLE,
        }]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create a new instance of the books module
pub fn create_module(store: Arc<dyn BookStore>, settings: &BooksSettings) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(store, settings))
}
