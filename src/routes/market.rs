// src/routes/market.rs
use axum::{Json, extract::State};
use tracing::{error, info};

use crate::{
    error::AppError,
    message::{MarketTrendRequest, PopularCropsResponse},
    services::{
        market::{self, DEFAULT_CROP, EMPTY_CROP, MARKET_FAILED, MarketTrend, POPULAR_CROPS},
        metrics_manager::Feature,
    },
    state::SharedState,
};

pub async fn market_trend_handler(
    State(state): State<SharedState>,
    Json(payload): Json<MarketTrendRequest>,
) -> Result<Json<MarketTrend>, AppError> {
    let crop = market::normalize_crop(&payload.crop)
        .ok_or_else(|| AppError::BadRequest(EMPTY_CROP.to_string()))?;

    state.metrics.record_request(Feature::Market).await;

    match state.agronomist.market_trend(crop).await {
        Ok(trend) => {
            info!(crop, sources = trend.sources.len(), "market trend retrieved");
            Ok(Json(trend))
        }
        Err(err) => {
            error!(crop, error = %err, "Error getting market trend");
            state.metrics.record_failure(Feature::Market).await;
            Err(AppError::Upstream(MARKET_FAILED.to_string()))
        }
    }
}

pub async fn popular_crops_handler() -> Json<PopularCropsResponse> {
    Json(PopularCropsResponse {
        default: DEFAULT_CROP.to_string(),
        crops: POPULAR_CROPS.iter().map(|c| c.to_string()).collect(),
    })
}
