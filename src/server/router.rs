use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use genie_core_types::ReviewRequest;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use super::state::ServeState;
use crate::errors::{GenieError, GenieResult};
use crate::review::ReviewReport;

pub fn build_review_router() -> Router<ServeState> {
    Router::new()
        .route("/", get(home_handler))
        .route("/health", get(health_handler))
        .route("/review", post(review_handler))
        .layer(cors_layer())
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn home_handler() -> Json<Value> {
    Json(json!({ "message": "Hello! API is working. Try POST to /review." }))
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn review_handler(
    State(state): State<ServeState>,
    body: Result<Json<ReviewRequest>, JsonRejection>,
) -> GenieResult<Json<ReviewReport>> {
    let Json(request) = body.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "Rejected review request body");
        GenieError::from(rejection)
    })?;
    info!(request = %request, "Review requested");
    match state.review().review(&request).await {
        Ok(report) => Ok(Json(report)),
        Err(err) => {
            error!(request = %request, error = %err, "Review failed");
            Err(err)
        }
    }
}
