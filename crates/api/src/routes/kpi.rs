//! KPI retrieval endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::SiteId;
use domain::KpiSnapshot;

use super::AppState;
use crate::error::ApiError;

/// Upper bound on snapshots returned by one history request.
const MAX_HISTORY: usize = 1000;

/// GET /kpi: the latest snapshot of every site that reported one.
pub async fn latest_per_site(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<KpiSnapshot>>, ApiError> {
    Ok(Json(state.kpi.latest_per_site().await?))
}

/// GET /kpi/{site}: the latest snapshot of one site.
pub async fn latest(
    State(state): State<Arc<AppState>>,
    Path(site): Path<String>,
) -> Result<Json<KpiSnapshot>, ApiError> {
    let site = known_site(&state, site)?;
    state
        .kpi
        .latest(&site)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No KPI snapshot for {site} yet")))
}

/// GET /kpi/{site}/{n}: up to `n` snapshots of one site, newest first.
pub async fn history(
    State(state): State<Arc<AppState>>,
    Path((site, n)): Path<(String, usize)>,
) -> Result<Json<Vec<KpiSnapshot>>, ApiError> {
    let site = known_site(&state, site)?;
    Ok(Json(state.kpi.last_n(&site, n.min(MAX_HISTORY)).await?))
}

fn known_site(state: &AppState, site: String) -> Result<SiteId, ApiError> {
    let site = SiteId::new(site);
    if state.sites.contains(&site) {
        Ok(site)
    } else {
        Err(ApiError::NotFound(format!("Unknown site {site}")))
    }
}
