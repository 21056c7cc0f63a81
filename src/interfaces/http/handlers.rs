use crate::domain::model::{CacheStats, PlaceDetailsResponse, ScrapeRequest, ScrapeResponse};
use crate::domain::platform::Platform;
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;

use super::ResponseError;

pub async fn scrape_profile(
    platform: Platform,
    state: AppState,
    payload: Result<Json<ScrapeRequest>, JsonRejection>,
) -> Result<Json<ScrapeResponse>, ResponseError> {
    let Json(request) = payload?;
    tracing::info!(platform = %platform, url = %request.url, page = request.page, "profile scrape requested");

    let response = state.service.scrape_profile(platform, &request).await?;
    Ok(Json(response))
}

pub async fn place_details(
    State(state): State<AppState>,
    Path(place_id): Path<String>,
) -> Result<Json<PlaceDetailsResponse>, ResponseError> {
    tracing::info!(place_id = %place_id, "place details requested");
    Ok(Json(state.service.place_details(&place_id).await?))
}

pub async fn cache_stats(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.service.stats())
}

pub async fn healthcheck() -> &'static str {
    "ok"
}
