use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use reticle_model::{Profile, ProfileRequest};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::{error::ApiError, handler::ApiHandler};

/// HTTP API service builder.
pub struct HttpApi<H> {
    handler: Arc<H>,
}

impl<H> HttpApi<H>
where
    H: ApiHandler,
{
    pub fn new(handler: Arc<H>) -> Self {
        Self { handler }
    }

    /// Routes:
    /// - POST /api/v1/profiles - provision a profile
    /// - GET /health - liveness
    pub fn router(self) -> Router {
        Router::new()
            .route("/api/v1/profiles", post(submit_profile::<H>))
            .route("/health", get(health))
            .layer(TraceLayer::new_for_http())
            .with_state(self.handler)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SubmitProfileResponse {
    id: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// POST /api/v1/profiles
///
/// The body is taken raw so decode failures keep their own message.
async fn submit_profile<H>(
    State(handler): State<Arc<H>>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError>
where
    H: ApiHandler,
{
    let profile = decode(&body).inspect_err(|e| debug!(error = %e, "rejected request"))?;
    let id = handler.submit_profile(profile).await?;

    let response = SubmitProfileResponse { id: id.to_string() };
    Ok((StatusCode::CREATED, Json(response)))
}

fn decode(body: &[u8]) -> Result<Profile, ApiError> {
    let req = ProfileRequest::from_json(body)?;
    Ok(Profile::try_from(req)?)
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
