use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// A row of the `books` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    /// Unique identifier for the book
    pub id: String,
    /// Title of the book
    pub title: String,
    /// Author of the book
    pub author: String,
}

/// Request body for create and update.
///
/// Absent fields deserialize as empty strings so that a missing field and
/// an empty one are rejected the same way.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct BookPayload {
    /// Unique identifier for the book
    #[serde(default)]
    pub id: String,
    /// Title of the book
    #[serde(default)]
    pub title: String,
    /// Author of the book
    #[serde(default)]
    pub author: String,
}

impl BookPayload {
    /// Names of the fields that are empty, in declaration order.
    pub fn empty_fields(&self) -> Vec<&'static str> {
        [
            ("id", &self.id),
            ("title", &self.title),
            ("author", &self.author),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    pub fn into_book(self) -> Book {
        Book {
            id: self.id,
            title: self.title,
            author: self.author,
        }
    }
}
