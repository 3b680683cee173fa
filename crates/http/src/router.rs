//! Router builder for the bookshelf HTTP server

use axum::{
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::time::Duration;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;

use crate::error::{AppError, ErrorBody, ErrorResponse};
use crate::MakeRequestUuid;

/// Path the merged OpenAPI document is served from
pub const OPENAPI_PATH: &str = "/docs/openapi.json";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bookshelf API",
        version = "1.0.0",
        description = "CRUD service for the book catalogue"
    ),
    components(schemas(ErrorResponse, ErrorBody))
)]
struct ApiDoc;

/// Builder for constructing the main HTTP router.
///
/// Middleware is applied in `build`, so it wraps every route regardless
/// of the order the builder methods are called in.
pub struct RouterBuilder {
    router: OpenApiRouter,
    tracing: bool,
    cors: bool,
    request_id: bool,
    timeout: Option<Duration>,
    catch_panic: bool,
    openapi: bool,
}

impl RouterBuilder {
    /// Create a new router builder
    pub fn new() -> Self {
        Self {
            router: OpenApiRouter::with_openapi(ApiDoc::openapi()),
            tracing: false,
            cors: false,
            request_id: false,
            timeout: None,
            catch_panic: false,
            openapi: false,
        }
    }

    /// Add an undocumented route to the router
    pub fn route(mut self, path: &str, route: axum::routing::MethodRouter) -> Self {
        self.router = self.router.route(path, route);
        self
    }

    /// Merge a module's routes and their OpenAPI description
    pub fn mount_module(mut self, module_name: &str, module_router: OpenApiRouter) -> Self {
        tracing::info!(module = module_name, "mounting module routes");
        self.router = self.router.merge(module_router);
        self
    }

    /// Add tracing middleware
    pub fn with_tracing(mut self) -> Self {
        self.tracing = true;
        self
    }

    /// Add CORS middleware
    pub fn with_cors(mut self) -> Self {
        self.cors = true;
        self
    }

    /// Add request ID middleware; the id is echoed back in `x-request-id`
    pub fn with_request_id(mut self) -> Self {
        self.request_id = true;
        self
    }

    /// Add timeout middleware
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout = Some(Duration::from_millis(timeout_ms));
        self
    }

    /// Turn a panicking handler into a 500 error response
    pub fn with_catch_panic(mut self) -> Self {
        self.catch_panic = true;
        self
    }

    /// Serve the merged OpenAPI document at [`OPENAPI_PATH`]
    pub fn with_openapi(mut self) -> Self {
        self.openapi = true;
        self
    }

    /// Build the final router
    pub fn build(self) -> Router {
        let (mut router, api) = self.router.split_for_parts();

        if self.openapi {
            router = router.route(
                OPENAPI_PATH,
                get(move || {
                    let api = api.clone();
                    async move { Json(api) }
                }),
            );
        }

        if self.catch_panic {
            router = router.layer(CatchPanicLayer::custom(panic_response));
        }

        if let Some(timeout) = self.timeout {
            router = router.layer(TimeoutLayer::new(timeout));
        }

        if self.cors {
            router = router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        }

        if self.tracing {
            router = router.layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().include_headers(true))
                    .on_request(DefaultOnRequest::new().level(tracing::Level::INFO))
                    .on_response(DefaultOnResponse::new().level(tracing::Level::INFO)),
            );
        }

        // Outermost, so the trace span already sees the generated id.
        if self.request_id {
            router = router
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));
        }

        router
    }
}

fn panic_response(panic: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_default();
    tracing::error!(panic = %detail, "request handler panicked");

    AppError::Internal(anyhow::anyhow!("Internal server error")).into_response()
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}
