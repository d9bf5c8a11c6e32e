//! Crop Advisor
//!
//! Farming-advisory backend: crop recommendation from a pretrained forest
//! pipeline, seasonal rainfall lookups over the historical sub-division table,
//! market price trends and sowing/harvest calendars.
//!
//! - `features`/`model`/`recommender`: feature assembly and ranked inference
//! - `season`/`rainfall`: season bucketing and rainfall aggregation
//! - `market`, `calendar`: supporting read-only planners
//! - `evaluation`: offline accuracy report for a pipeline artifact
//! - `api_server` (feature `api`): Axum router over all of the above

pub mod calendar;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod features;
pub mod market;
pub mod model;
pub mod rainfall;
pub mod recommender;
pub mod season;

#[cfg(feature = "api")]
pub mod api_server;

// Re-export commonly used types
pub use calendar::{CalendarPlanner, CalendarRequest, CropCalendar, CropSchedule};
pub use config::AdvisorConfig;
pub use error::{AdvisorError, Result};
pub use features::{Feature, FeatureVector};
pub use market::{MarketPrice, MarketPrices};
pub use model::{CropPipeline, PipelineArtifact};
pub use rainfall::{RainfallSummary, RainfallTable};
pub use recommender::{CropProbability, CropRecommender, RankedPrediction};
pub use season::{MonthShift, Season};

#[cfg(feature = "api")]
pub use api_server::{create_router, AppState};
