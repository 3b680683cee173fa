//! Persistence for books.
//!
//! Every operation is a single statement. Mutations report the number of
//! rows they touched; callers treat zero as "no such book".

mod memory;
mod postgres;

pub use memory::MemoryBookStore;
pub use postgres::PgBookStore;

use async_trait::async_trait;
use bookshelf_http::error::AppError;
use thiserror::Error;

use super::models::Book;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    /// A constraint the backing table would enforce, reported by stores
    /// that are not backed by PostgreSQL.
    #[error("{0}")]
    Rejected(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Internal(err.into())
    }
}

#[async_trait]
pub trait BookStore: Send + Sync {
    /// Insert a new row; a duplicate id is an error.
    async fn insert(&self, book: &Book) -> Result<(), StoreError>;

    /// Look a book up by primary key.
    async fn find(&self, id: &str) -> Result<Option<Book>, StoreError>;

    /// Replace title and author, returning the rows affected.
    async fn update(&self, id: &str, title: &str, author: &str) -> Result<u64, StoreError>;

    /// Remove a book, returning the rows affected.
    async fn delete(&self, id: &str) -> Result<u64, StoreError>;
}
