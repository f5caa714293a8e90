use std::time::Duration;

use axum::Json;
use axum::extract::State;
use sea_orm::*;
use tracing::{debug, instrument};

use crate::cache::DASHBOARD_STATS_KEY;
use crate::entity::{score, student};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::dashboard::{DashboardResponse, ProfileResponse};
use crate::state::AppState;
use crate::stats;

#[utoipa::path(
    get,
    path = "/dashboard",
    tag = "Dashboard",
    operation_id = "getDashboard",
    summary = "Aggregate statistics",
    description = "Totals, the five most recent students and scores, component averages, and student count per class. Served from a cache that any write evicts; otherwise refreshed after `cache.stats_ttl_secs`.",
    responses(
        (status = 200, description = "Dashboard statistics", body = DashboardResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user))]
pub async fn dashboard(
    _auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<DashboardResponse>, AppError> {
    if let Some(cached) = state.stats_cache.get(DASHBOARD_STATS_KEY) {
        return Ok(Json(cached));
    }

    debug!("Dashboard cache miss");
    let fresh = stats::dashboard(&state.db).await?;
    state.stats_cache.set(
        DASHBOARD_STATS_KEY,
        fresh.clone(),
        Duration::from_secs(state.config.cache.stats_ttl_secs),
    );
    Ok(Json(fresh))
}

#[utoipa::path(
    get,
    path = "/profile",
    tag = "Dashboard",
    operation_id = "getProfile",
    summary = "Current user with recent activity",
    responses(
        (status = 200, description = "Profile", body = ProfileResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn profile(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ProfileResponse>, AppError> {
    let total_students = student::Entity::find().count(&state.db).await?;
    let total_scores = score::Entity::find().count(&state.db).await?;
    let recent_scores = stats::recent_scores(&state.db, stats::RECENT_LIMIT).await?;

    Ok(Json(ProfileResponse {
        id: auth_user.user_id,
        username: auth_user.username,
        role: auth_user.role,
        total_students,
        total_scores,
        recent_scores,
    }))
}
