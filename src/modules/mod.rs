pub mod books;

use std::sync::Arc;

use bookshelf_db::PgPool;
use bookshelf_kernel::{settings::Settings, ModuleRegistry};

use books::store::PgBookStore;

/// Register all project-specific modules with the registry
pub fn register_all(registry: &mut ModuleRegistry, pool: PgPool, settings: &Settings) {
    let store = Arc::new(PgBookStore::new(pool));
    registry.register(books::create_module(store, &settings.books));
}
