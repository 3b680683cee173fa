//! HTTP handlers for the books resource.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use bookshelf_http::error::{AppError, ErrorResponse};
use bookshelf_kernel::settings::UpdateKey;
use utoipa_axum::{router::OpenApiRouter, routes};

use super::models::{Book, BookPayload};
use super::store::BookStore;

/// Shared handler state; the store is injected when the module is built.
#[derive(Clone)]
pub struct BooksState {
    pub store: Arc<dyn BookStore>,
    pub update_key: UpdateKey,
}

/// Routes for `/books` and `/books/{id}` with their OpenAPI description.
pub fn router(state: BooksState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(create_book))
        .routes(routes!(get_book, update_book, delete_book))
        .with_state(state)
}

/// Create a book
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    request_body = BookPayload,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Malformed payload or empty field", body = ErrorResponse),
        (status = 500, description = "Database rejected the insert", body = ErrorResponse)
    )
)]
async fn create_book(
    State(state): State<BooksState>,
    payload: Result<Json<BookPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<Book>), AppError> {
    let Json(payload) = payload?;

    let missing = payload.empty_fields();
    if !missing.is_empty() {
        return Err(AppError::missing_fields(&missing, "All fields are required"));
    }

    let book = payload.into_book();
    state.store.insert(&book).await?;

    tracing::info!(book_id = %book.id, "book created");
    Ok((StatusCode::CREATED, Json(book)))
}

/// Fetch a book by id
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    params(("id" = String, Path, description = "Book identifier")),
    responses(
        (status = 200, description = "The book", body = Book),
        (status = 400, description = "Malformed path parameter", body = ErrorResponse),
        (status = 404, description = "No book with this id", body = ErrorResponse),
        (status = 500, description = "Database error", body = ErrorResponse)
    )
)]
async fn get_book(
    State(state): State<BooksState>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<Book>, AppError> {
    let Path(id) = path?;
    match state.store.find(&id).await? {
        Some(book) => Ok(Json(book)),
        None => Err(AppError::not_found("Book not found")),
    }
}

/// Replace a book's title and author
///
/// The row is selected by the path id or by the body id, depending on the
/// `books.update_key` setting.
#[utoipa::path(
    put,
    path = "/books/{id}",
    tag = "books",
    params(("id" = String, Path, description = "Book identifier")),
    request_body = BookPayload,
    responses(
        (status = 200, description = "The updated book", body = Book),
        (status = 400, description = "Malformed path, payload or empty field", body = ErrorResponse),
        (status = 404, description = "No book with this id", body = ErrorResponse),
        (status = 500, description = "Database error", body = ErrorResponse)
    )
)]
async fn update_book(
    State(state): State<BooksState>,
    path: Result<Path<String>, PathRejection>,
    payload: Result<Json<BookPayload>, JsonRejection>,
) -> Result<Json<Book>, AppError> {
    let Path(path_id) = path?;
    let Json(payload) = payload?;

    let mut missing = payload.empty_fields();
    if state.update_key == UpdateKey::Path {
        missing.retain(|field| *field != "id");
    }
    if !missing.is_empty() {
        return Err(AppError::missing_fields(
            &missing,
            "Title and author are required fields",
        ));
    }

    let BookPayload {
        id: body_id,
        title,
        author,
    } = payload;
    let id = match state.update_key {
        UpdateKey::Path => path_id,
        UpdateKey::Body => body_id,
    };

    let affected = state.store.update(&id, &title, &author).await?;
    if affected == 0 {
        return Err(AppError::not_found(format!("Book with id {id} not found")));
    }

    tracing::info!(book_id = %id, "book updated");
    Ok(Json(Book { id, title, author }))
}

/// Delete a book
#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    params(("id" = String, Path, description = "Book identifier")),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 400, description = "Malformed path parameter", body = ErrorResponse),
        (status = 404, description = "No book with this id", body = ErrorResponse),
        (status = 500, description = "Database error", body = ErrorResponse)
    )
)]
async fn delete_book(
    State(state): State<BooksState>,
    path: Result<Path<String>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let Path(id) = path?;
    let affected = state.store.delete(&id).await?;
    if affected == 0 {
        return Err(AppError::not_found(format!("Book with id {id} not found")));
    }

    tracing::info!(book_id = %id, "book deleted");
    Ok(StatusCode::NO_CONTENT)
}
