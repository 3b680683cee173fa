//! Tests against a live PostgreSQL server.
//!
//! Run with `DATABASE_URL=postgres://... cargo test -- --ignored`.

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use bookshelf_app::books::{
    models::Book,
    store::{BookStore, PgBookStore},
};
use bookshelf_db::PgPool;
use bookshelf_kernel::{settings::Settings, ModuleRegistry};
use serde_json::{json, Value};
use tower::ServiceExt;

fn settings() -> Settings {
    let mut settings = Settings::default();
    settings.database.url =
        Some(std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a test database"));
    settings.database.connect_timeout_ms = 5000;
    settings
}

/// Connects, creates the schema and wires the books module to PostgreSQL.
async fn bootstrap() -> (ModuleRegistry, PgPool) {
    bookshelf_app::bootstrap(&settings())
        .await
        .expect("failed to bootstrap against DATABASE_URL")
}

/// Unique primary key so runs do not collide with earlier rows.
fn unique_id(tag: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{tag}-{nanos}")
}

fn book(id: &str) -> Book {
    Book {
        id: id.to_string(),
        title: "Dune".to_string(),
        author: "Herbert".to_string(),
    }
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            request = request.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(request.body(body).expect("failed to build request"))
        .await
        .expect("request failed");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("response body was not json")
    };
    (status, value)
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn schema_creation_is_idempotent() {
    let (registry, pool) = bootstrap().await;

    bookshelf_db::apply_migrations(&pool, &registry.collect_migrations())
        .await
        .expect("second schema pass failed");

    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = 'books'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(count, 1);

    pool.close().await;
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn store_round_trips_rows() {
    let (_, pool) = bootstrap().await;
    let store = PgBookStore::new(pool.clone());
    let id = unique_id("store");

    store.insert(&book(&id)).await.unwrap();
    assert_eq!(store.find(&id).await.unwrap(), Some(book(&id)));

    let err = store.insert(&book(&id)).await.unwrap_err();
    assert!(err.to_string().contains("books_pkey"));

    assert_eq!(store.update(&id, "Dune2", "Frank Herbert").await.unwrap(), 1);
    let updated = store.find(&id).await.unwrap().unwrap();
    assert_eq!(updated.title, "Dune2");
    assert_eq!(updated.author, "Frank Herbert");

    assert_eq!(store.delete(&id).await.unwrap(), 1);
    assert_eq!(store.find(&id).await.unwrap(), None);

    pool.close().await;
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn store_reports_zero_rows_for_missing_books() {
    let (_, pool) = bootstrap().await;
    let store = PgBookStore::new(pool.clone());
    let id = unique_id("missing");

    assert_eq!(store.find(&id).await.unwrap(), None);
    assert_eq!(store.update(&id, "T", "A").await.unwrap(), 0);
    assert_eq!(store.delete(&id).await.unwrap(), 0);

    pool.close().await;
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn store_rejects_ids_longer_than_column() {
    let (_, pool) = bootstrap().await;
    let store = PgBookStore::new(pool.clone());

    let err = store.insert(&book(&"x".repeat(37))).await.unwrap_err();
    assert!(err.to_string().contains("too long"));

    pool.close().await;
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn book_lifecycle_over_postgres() {
    let settings = settings();
    let (registry, pool) = bootstrap().await;
    let app = bookshelf_http::build_router(&registry, &settings);
    let id = unique_id("http");
    let uri = format!("/books/{id}");

    let (status, body) = call(
        &app,
        "POST",
        "/books",
        Some(json!({"id": id, "title": "Dune", "author": "Herbert"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["id"], id.as_str());

    let (status, body) = call(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"id": id, "title": "Dune", "author": "Herbert"}));

    let (status, body) = call(
        &app,
        "PUT",
        &uri,
        Some(json!({"id": id, "title": "Dune2", "author": "Herbert"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Dune2");

    let (status, body) = call(&app, "POST", "/books", Some(body)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("books_pkey"));

    let (status, _) = call(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = call(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    pool.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[ignore = "requires DATABASE_URL"]
async fn concurrent_duplicate_creates_race_on_primary_key() {
    let settings = settings();
    let (registry, pool) = bootstrap().await;
    let app = bookshelf_http::build_router(&registry, &settings);
    let payload = json!({"id": unique_id("race"), "title": "Dune", "author": "Herbert"});

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let app = app.clone();
            let payload = payload.clone();
            tokio::spawn(async move { call(&app, "POST", "/books", Some(payload)).await.0 })
        })
        .collect();

    let mut statuses = Vec::new();
    for handle in handles {
        statuses.push(handle.await.unwrap());
    }
    statuses.sort();
    assert_eq!(
        statuses,
        vec![StatusCode::CREATED, StatusCode::INTERNAL_SERVER_ERROR]
    );

    pool.close().await;
}
