use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{BookStore, StoreError};
use crate::modules::books::models::Book;

const ID_MAX_CHARS: usize = 36;
const TEXT_MAX_CHARS: usize = 255;

/// In-process [`BookStore`] with the same key and column-length rules as
/// the `books` table. Used for tests and local experiments.
#[derive(Default)]
pub struct MemoryBookStore {
    books: RwLock<HashMap<String, Book>>,
}

impl MemoryBookStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored books.
    pub async fn len(&self) -> usize {
        self.books.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.books.read().await.is_empty()
    }
}

fn check_length(value: &str, max: usize) -> Result<(), StoreError> {
    if value.chars().count() > max {
        return Err(StoreError::Rejected(format!(
            "value too long for type character varying({max})"
        )));
    }
    Ok(())
}

#[async_trait]
impl BookStore for MemoryBookStore {
    async fn insert(&self, book: &Book) -> Result<(), StoreError> {
        check_length(&book.id, ID_MAX_CHARS)?;
        check_length(&book.title, TEXT_MAX_CHARS)?;
        check_length(&book.author, TEXT_MAX_CHARS)?;

        let mut books = self.books.write().await;
        if books.contains_key(&book.id) {
            return Err(StoreError::Rejected(
                "duplicate key value violates unique constraint \"books_pkey\"".to_string(),
            ));
        }
        books.insert(book.id.clone(), book.clone());
        Ok(())
    }

    async fn find(&self, id: &str) -> Result<Option<Book>, StoreError> {
        Ok(self.books.read().await.get(id).cloned())
    }

    async fn update(&self, id: &str, title: &str, author: &str) -> Result<u64, StoreError> {
        check_length(title, TEXT_MAX_CHARS)?;
        check_length(author, TEXT_MAX_CHARS)?;

        let mut books = self.books.write().await;
        match books.get_mut(id) {
            Some(book) => {
                book.title = title.to_string();
                book.author = author.to_string();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete(&self, id: &str) -> Result<u64, StoreError> {
        Ok(self.books.write().await.remove(id).map_or(0, |_| 1))
    }
}
