//! HTTP server for the club assistant.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/v1/llm` | Answer the last message of a chat history, streamed as plain text |
//! | `GET`  | `/health` | Health check (returns version and document count) |
//!
//! # Error Contract
//!
//! Rejected requests get `400` and a JSON body naming the reason; the
//! machine-readable kind is echoed in the `x-error-code` header:
//!
//! ```json
//! { "error": "Invalid request format" }
//! ```
//!
//! Anything unexpected (including handler panics) becomes `500` with a fixed
//! message. Details are logged, never returned. Once streaming has started
//! the status is always `200`; model failures surface as a fallback chunk.
//!
//! # CORS
//!
//! Only the configured frontend origin may call the API cross-origin, with
//! credentials allowed. Without a configured origin no cross-origin access
//! is granted.

use anyhow::{Context, Result};
use axum::{
    body::{Body, Bytes},
    extract::{rejection::BytesRejection, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::StreamExt;
use serde::Serialize;
use std::any::Any;
use std::convert::Infallible;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::chat::Chat;
use crate::config::Config;
use crate::llm::create_model;
use crate::store::VectorStore;
use crate::validate::{validate_request, ValidationError, ValidationPolicy};

/// Message returned for any failure that is not the client's fault.
pub const INTERNAL_ERROR_MESSAGE: &str = "An error occurred processing your request";

/// Immutable per-process state shared by all request handlers.
///
/// Built once during bootstrap and handed to the router behind an `Arc`;
/// nothing in it is mutated while serving.
pub struct AppContext {
    pub chat: Chat,
    pub policy: ValidationPolicy,
}

impl AppContext {
    pub fn new(chat: Chat, policy: ValidationPolicy) -> Self {
        Self { chat, policy }
    }

    /// Load documents, build the vector index and connect the model client.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let store = VectorStore::from_config(config)
            .await
            .context("Failed to build the document index")?;
        let model = create_model(&config.llm)?;
        let chat = Chat::new(Arc::new(store), model, config.retrieval.top_k)
            .with_context_logging(config.server.debug);
        Ok(Self::new(chat, ValidationPolicy::from_config(&config.validation)))
    }
}

/// Build the application router.
pub fn router(ctx: Arc<AppContext>, frontend_url: Option<&str>) -> Result<Router> {
    let app = Router::new()
        .route("/api/v1/llm", post(handle_llm))
        .route("/health", get(handle_health));
    Ok(with_middleware(app, frontend_url)?.with_state(ctx))
}

/// Wrap routes in the panic guard, CORS and request tracing.
///
/// CORS sits outside the panic guard so generated 500s still carry the
/// allow-origin header.
fn with_middleware<S>(app: Router<S>, frontend_url: Option<&str>) -> Result<Router<S>>
where
    S: Clone + Send + Sync + 'static,
{
    Ok(app
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(cors_layer(frontend_url)?)
        .layer(TraceLayer::new_for_http()))
}

/// Bind the configured address and serve until the process is stopped.
pub async fn run_server(config: &Config, ctx: AppContext) -> Result<()> {
    let bind_addr = config.server.bind_addr();
    let app = router(Arc::new(ctx), config.server.frontend_url.as_deref())?;

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;
    tracing::info!(addr = %bind_addr, "club assistant listening");

    axum::serve(listener, app).await?;
    Ok(())
}

fn cors_layer(frontend_url: Option<&str>) -> Result<CorsLayer> {
    let layer = CorsLayer::new()
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);

    match frontend_url {
        Some(origin) => {
            let origin = HeaderValue::from_str(origin.trim_end_matches('/'))
                .with_context(|| format!("Invalid frontend origin: {}", origin))?;
            Ok(layer.allow_origin(AllowOrigin::list([origin])))
        }
        None => {
            tracing::warn!("no frontend origin configured; cross-origin requests will be refused");
            Ok(layer)
        }
    }
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Error type that converts into an Axum HTTP response.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    fn internal() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal",
            message: INTERNAL_ERROR_MESSAGE.to_string(),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: err.code(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
        };
        (
            self.status,
            [("x-error-code", HeaderValue::from_static(self.code))],
            Json(body),
        )
            .into_response()
    }
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    tracing::error!(panic = %detail, "request handler panicked");
    ApiError::internal().into_response()
}

// ============ POST /api/v1/llm ============

/// Handler for `POST /api/v1/llm`.
///
/// Validates the chat history, then streams the answer to its last message.
/// Validation happens before any retrieval or model work.
async fn handle_llm(
    State(ctx): State<Arc<AppContext>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    let body = body.map_err(|e| {
        // Bodies over the transport limit are far past any input limit.
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            tracing::info!(code = "input_too_long", "request rejected: body too large");
            return ApiError::from(ValidationError::InputTooLong {
                max: ctx.policy.max_input_chars(),
            });
        }
        tracing::error!(error = %e, "failed to read request body");
        ApiError::internal()
    })?;

    // Undecodable JSON is as malformed as a non-list body.
    let payload: serde_json::Value =
        serde_json::from_slice(&body).map_err(|_| ValidationError::InvalidFormat)?;

    let query = validate_request(&payload, &ctx.policy).map_err(|e| {
        tracing::info!(code = e.code(), "request rejected");
        ApiError::from(e)
    })?;

    tracing::info!(chars = query.chars().count(), "answering question");
    let chunks = ctx.chat.respond(query).map(Ok::<_, Infallible>);

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(chunks),
    )
        .into_response())
}

// ============ GET /health ============

/// JSON response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    /// Always `"ok"` when the server is running.
    status: String,
    /// The crate version from `Cargo.toml`.
    version: String,
    /// Number of indexed documents.
    documents: usize,
}

async fn handle_health(State(ctx): State<Arc<AppContext>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        documents: ctx.chat.store().len(),
    })
}
