//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use common::SiteId;
use serde::Serialize;

use super::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub headquarters: SiteId,
    pub sites: Vec<SiteId>,
}

/// GET /health: returns service health and the configured locations.
pub async fn check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        headquarters: state.headquarters.clone(),
        sites: state.sites.clone(),
    })
}
