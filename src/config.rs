//! Runtime configuration
//!
//! Read once from environment variables at startup. Artifact paths default to
//! locations under `DATA_DIR`.

use crate::season::MonthShift;
use anyhow::Context;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AdvisorConfig {
    pub data_dir: PathBuf,
    /// Crop pipeline artifact (required)
    pub model_path: PathBuf,
    /// Historical sub-division rainfall table (required)
    pub rainfall_csv: PathBuf,
    /// Market price table (optional)
    pub market_csv: PathBuf,
    /// Per-crop schedule table (optional)
    pub crop_schedules: PathBuf,
    pub month_shift: MonthShift,
    pub port: u16,
}

impl AdvisorConfig {
    /// Defaults rooted at `data_dir`
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            model_path: data_dir.join("models").join("crop_recommender.json"),
            rainfall_csv: data_dir.join("Sub_Division_IMD_2017.csv"),
            market_csv: data_dir.join("market_prices.csv"),
            crop_schedules: data_dir.join("crop_schedules.json"),
            month_shift: MonthShift::default(),
            port: 3000,
            data_dir,
        }
    }

    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source (environment in production)
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = lookup("DATA_DIR").unwrap_or_else(|| "data".to_string());
        let mut config = Self::with_data_dir(data_dir);

        if let Some(path) = lookup("MODEL_PATH") {
            config.model_path = path.into();
        }
        if let Some(path) = lookup("RAINFALL_CSV") {
            config.rainfall_csv = path.into();
        }
        if let Some(path) = lookup("MARKET_CSV") {
            config.market_csv = path.into();
        }
        if let Some(path) = lookup("CROP_SCHEDULES") {
            config.crop_schedules = path.into();
        }
        if let Some(shift) = lookup("SEASON_MONTH_SHIFT") {
            config.month_shift = shift
                .parse()
                .map_err(anyhow::Error::msg)
                .context("Invalid SEASON_MONTH_SHIFT")?;
        }
        if let Some(port) = lookup("PORT") {
            config.port = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid PORT '{}'", port))?;
        }

        Ok(config)
    }

    pub fn log_summary(&self) {
        tracing::info!("Configuration:");
        tracing::info!("  DATA_DIR: {}", self.data_dir.display());
        tracing::info!("  MODEL_PATH: {}", self.model_path.display());
        tracing::info!("  RAINFALL_CSV: {}", self.rainfall_csv.display());
        tracing::info!("  MARKET_CSV: {}", self.market_csv.display());
        tracing::info!("  CROP_SCHEDULES: {}", self.crop_schedules.display());
        tracing::info!("  SEASON_MONTH_SHIFT: {:?}", self.month_shift);
        tracing::info!("  PORT: {}", self.port);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AdvisorConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.model_path, PathBuf::from("data/models/crop_recommender.json"));
        assert_eq!(config.rainfall_csv, PathBuf::from("data/Sub_Division_IMD_2017.csv"));
        assert_eq!(config.month_shift, MonthShift::Calendar);
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_overrides() {
        let config = AdvisorConfig::from_lookup(lookup(&[
            ("DATA_DIR", "/srv/advisor"),
            ("MODEL_PATH", "/models/rf.json"),
            ("SEASON_MONTH_SHIFT", "legacy"),
            ("PORT", "8080"),
        ]))
        .unwrap();

        assert_eq!(config.model_path, PathBuf::from("/models/rf.json"));
        assert_eq!(config.market_csv, PathBuf::from("/srv/advisor/market_prices.csv"));
        assert_eq!(config.month_shift, MonthShift::Legacy);
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_invalid_values() {
        assert!(AdvisorConfig::from_lookup(lookup(&[("PORT", "eighty")])).is_err());
        assert!(AdvisorConfig::from_lookup(lookup(&[("SEASON_MONTH_SHIFT", "maybe")])).is_err());
    }
}
