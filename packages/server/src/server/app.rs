//! Application setup and server configuration.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    extract::Extension,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, StatusCode,
    },
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use openai_client::OpenAIClient;
use serde_json::json;
use sqlx::PgPool;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{self, AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::config::Config;
use crate::domains::courses::jobs::register_course_jobs;
use crate::kernel::jobs::{JobCancellations, JobRegistry, PostgresJobQueue, SharedJobRegistry};
use crate::kernel::{HttpFetcher, OpenAIChat, ServerDeps};
use crate::server::middleware::{api_key_middleware, request_id_middleware, API_KEY_HEADER};
use crate::server::routes::{
    cancel_by_job, cancel_course_job, create_course, delete_course, delete_course_by_job,
    export_course, get_course, get_course_by_job, get_course_status, health_handler,
    list_courses, readiness_handler, regenerate_course, root_handler,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub deps: Arc<ServerDeps>,
}

/// HTTP-level settings taken from [`Config`].
#[derive(Debug, Clone, Default)]
pub struct HttpSettings {
    /// `None` disables API key checks.
    pub api_key: Option<String>,
    /// Empty or `*` allows any origin.
    pub cors_origins: Vec<String>,
}

impl From<&Config> for HttpSettings {
    fn from(config: &Config) -> Self {
        Self {
            api_key: config.api_key.clone(),
            cors_origins: config.cors_origins.clone(),
        }
    }
}

/// Wire the production dependencies: OpenAI for text, reqwest for discovery
/// and the Postgres job queue.
pub fn build_server_deps(config: &Config, pool: PgPool) -> Result<ServerDeps> {
    let mut client = OpenAIClient::new(config.openai_api_key.clone());
    if let Some(base_url) = &config.openai_base_url {
        client = client.with_base_url(base_url.clone());
    }
    let ai = OpenAIChat::new(client, config.openai_model.clone(), config.openai_temperature);
    let fetcher = HttpFetcher::new().context("Failed to build HTTP fetcher")?;

    Ok(ServerDeps::new(
        pool.clone(),
        Arc::new(ai),
        Arc::new(fetcher),
        Arc::new(PostgresJobQueue::new(pool)),
        JobCancellations::new(),
        config.discovery.clone(),
        config.generate_quizzes,
    ))
}

/// Registry with every job type the runner can execute.
pub fn build_job_registry() -> SharedJobRegistry {
    let mut registry = JobRegistry::new();
    register_course_jobs(&mut registry);
    Arc::new(registry)
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let message = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(panic = %message, "handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "detail": "Internal Server Error" })),
    )
        .into_response()
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let exposed = [
        HeaderName::from_static("x-total-count"),
        HeaderName::from_static("x-limit"),
        HeaderName::from_static("x-offset"),
        HeaderName::from_static("x-request-id"),
    ];

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(cors::Any)
            .allow_methods(cors::Any)
            .allow_headers(cors::Any)
            .expose_headers(exposed);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static(API_KEY_HEADER),
            HeaderName::from_static("x-request-id"),
        ])
        .expose_headers(exposed)
}

/// Build the Axum application router
pub fn build_app(deps: Arc<ServerDeps>, settings: &HttpSettings) -> Router {
    let state = AppState {
        db_pool: deps.db_pool.clone(),
        deps,
    };

    let api_key: Option<Arc<str>> = settings.api_key.as_deref().map(Arc::from);

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/system/healthz", get(health_handler))
        .route("/system/readyz", get(readiness_handler))
        .route("/courses", get(list_courses).post(create_course))
        .route("/courses/:id", get(get_course).delete(delete_course))
        .route("/courses/:id/status", get(get_course_status))
        .route("/courses/:id/regenerate", post(regenerate_course))
        .route("/courses/:id/cancel", post(cancel_course_job))
        .route("/courses/:id/export", get(export_course))
        .route(
            "/courses/by-job/:job_id",
            get(get_course_by_job).delete(delete_course_by_job),
        )
        .route("/courses/by-job/:job_id/cancel", post(cancel_by_job))
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(middleware::from_fn(move |req, next| {
            api_key_middleware(api_key.clone(), req, next)
        }))
        .layer(Extension(state))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors_layer(&settings.cors_origins))
        .layer(TraceLayer::new_for_http())
}
