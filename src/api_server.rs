// Axum API Server Module
//
// Purpose: JSON API over the crop recommender, the seasonal rainfall table,
// market price trends and the crop calendar planner.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use chrono::{Datelike, Local, NaiveDate};
use moka::future::Cache;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::calendar::{CalendarPlanner, CalendarRequest, CropCalendar};
use crate::config::AdvisorConfig;
use crate::error::AdvisorError;
use crate::features::FeatureVector;
use crate::market::MarketPrices;
use crate::rainfall::{RainfallSummary, RainfallTable};
use crate::recommender::{CropRecommender, RankedPrediction};
use crate::season::MonthShift;

// ============================================================================
// Application State
// ============================================================================

#[derive(Clone)]
pub struct AppState {
    pub recommender: Arc<CropRecommender>,
    pub rainfall: Arc<RainfallTable>,
    pub market: Arc<MarketPrices>,
    pub planner: Arc<CalendarPlanner>,
    pub month_shift: MonthShift,
    /// Rainfall summaries keyed by region and month
    pub cache: Cache<String, RainfallSummary>,
    /// Source of "today" for season lookup and default sowing dates
    pub today: fn() -> NaiveDate,
}

impl AppState {
    /// Load every artifact named in `config`. The model and rainfall table are
    /// required; market prices and crop schedules fall back to empty tables.
    pub fn load(config: &AdvisorConfig) -> anyhow::Result<Self> {
        tracing::info!("Loading crop recommender...");
        let recommender = CropRecommender::load(&config.model_path)
            .map_err(|e| anyhow::anyhow!("Failed to load crop recommender: {}", e))?;

        tracing::info!("Loading rainfall table...");
        let rainfall = RainfallTable::from_csv(&config.rainfall_csv)?;

        tracing::info!("Loading market prices...");
        let market = if config.market_csv.exists() {
            MarketPrices::from_csv(&config.market_csv)?
        } else {
            tracing::warn!(
                "Market price table not found at {}; trends will be empty",
                config.market_csv.display()
            );
            MarketPrices::default()
        };

        tracing::info!("Loading crop schedules...");
        let planner = if config.crop_schedules.exists() {
            CalendarPlanner::from_json_file(&config.crop_schedules)?
        } else {
            tracing::warn!(
                "Crop schedules not found at {}; using the generic schedule",
                config.crop_schedules.display()
            );
            CalendarPlanner::default()
        };

        tracing::info!("Season month shift: {:?}", config.month_shift);

        Ok(Self::from_parts(recommender, rainfall, market, planner, config.month_shift))
    }

    pub fn from_parts(
        recommender: CropRecommender,
        rainfall: RainfallTable,
        market: MarketPrices,
        planner: CalendarPlanner,
        month_shift: MonthShift,
    ) -> Self {
        let cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(Duration::from_secs(3600))
            .build();

        Self {
            recommender: Arc::new(recommender),
            rainfall: Arc::new(rainfall),
            market: Arc::new(market),
            planner: Arc::new(planner),
            month_shift,
            cache,
            today: local_today,
        }
    }

    /// Replace the clock (tests pin the calendar month with this)
    pub fn with_clock(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

// ============================================================================
// Router
// ============================================================================

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))

        // Crop recommendation
        .route("/api/recommend", post(recommend))

        // Seasonal rainfall
        .route("/api/rainfall", post(rainfall))

        // Market trends
        .route("/api/market_trends", get(market_trends))

        // Crop calendar
        .route("/api/calendar", post(calendar))

        // Middleware (applied in reverse order)
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Endpoint Handlers
// ============================================================================

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn recommend(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<RankedPrediction>, AppError> {
    let payload = json_body(payload)?;
    let features = FeatureVector::from_json_map(expect_object(&payload)?).map_err(|e| match e {
        AdvisorError::InvalidInput { .. } => AppError::bad_request("Invalid numeric inputs", e),
        other => other.into(),
    })?;

    let result = state.recommender.score(&features);
    tracing::info!(
        "Recommended {} ({:.3})",
        result.prediction,
        result.ranking.first().map(|r| r.prob).unwrap_or_default()
    );

    Ok(Json(result))
}

async fn rainfall(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<RainfallSummary>, AppError> {
    let payload = json_body(payload)?;
    let region = payload
        .get("region")
        .and_then(Value::as_str)
        .filter(|r| !r.is_empty())
        .ok_or_else(|| AppError::BadRequest {
            error: "Region is required".to_string(),
            details: None,
        })?;

    let month = (state.today)().month();
    let cache_key = format!("{}:{}", region, month);

    if let Some(cached) = state.cache.get(&cache_key).await {
        tracing::debug!("Cache hit for rainfall query {}", cache_key);
        return Ok(Json(cached));
    }

    let summary = state
        .rainfall
        .average_rainfall(region, month, state.month_shift)?;
    state.cache.insert(cache_key, summary.clone()).await;

    Ok(Json(summary))
}

async fn market_trends(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "trends": state.market.trends()
    }))
}

async fn calendar(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<CropCalendar>, AppError> {
    let payload = json_body(payload)?;
    let request = CalendarRequest::from_json_map(expect_object(&payload)?)?;
    let calendar = state.planner.plan(&request, (state.today)())?;

    tracing::debug!(
        "Planned {} tasks for {} ({} -> {})",
        calendar.schedule.len(),
        calendar.crop,
        calendar.sowing_date,
        calendar.harvest_date
    );

    Ok(Json(calendar))
}

/// Extractor rejections (bad JSON, wrong content type) become a 400 `{error, details}`
fn json_body(payload: Result<Json<Value>, JsonRejection>) -> Result<Value, AppError> {
    payload.map(|Json(value)| value).map_err(|rejection| AppError::BadRequest {
        error: "Invalid input".to_string(),
        details: Some(rejection.body_text()),
    })
}

fn expect_object(payload: &Value) -> Result<&Map<String, Value>, AppError> {
    payload.as_object().ok_or_else(|| AppError::BadRequest {
        error: "Invalid input".to_string(),
        details: Some("request body must be a JSON object".to_string()),
    })
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
pub enum AppError {
    BadRequest { error: String, details: Option<String> },
    NotFound(String),
    Internal { error: String, details: Option<String> },
}

impl AppError {
    fn bad_request(error: &str, cause: AdvisorError) -> Self {
        AppError::BadRequest {
            error: error.to_string(),
            details: Some(cause.to_string()),
        }
    }
}

impl From<AdvisorError> for AppError {
    fn from(err: AdvisorError) -> Self {
        match err {
            AdvisorError::InvalidInput { .. } => AppError::bad_request("Invalid input", err),
            AdvisorError::RegionNotFound(_) => AppError::NotFound(err.to_string()),
            AdvisorError::ModelNotFound { .. } | AdvisorError::Inference(_) => {
                tracing::error!("Model failure: {}", err);
                AppError::Internal {
                    error: "Model error".to_string(),
                    details: Some(err.to_string()),
                }
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, error, details) = match self {
            AppError::BadRequest { error, details } => (StatusCode::BAD_REQUEST, error, details),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            AppError::Internal { error, details } => {
                (StatusCode::INTERNAL_SERVER_ERROR, error, details)
            }
        };

        let body = match details {
            Some(details) => serde_json::json!({ "error": error, "details": details }),
            None => serde_json::json!({ "error": error }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (AdvisorError::invalid_input("N", "bad"), StatusCode::BAD_REQUEST),
            (AdvisorError::RegionNotFound("Atlantis".into()), StatusCode::NOT_FOUND),
            (AdvisorError::Inference("shape".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (
                AdvisorError::ModelNotFound { path: "m.json".into() },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            let response = AppError::from(err).into_response();
            assert_eq!(response.status(), status);
        }
    }
}
