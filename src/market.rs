//! Market price trends
//!
//! Static table of observed crop prices, loaded once from CSV
//! (`crop,price,date[,source]`). Trends report the latest observed price per
//! crop, highest first.

use anyhow::Context;
use chrono::NaiveDate;
use polars::prelude::*;
use serde::Serialize;
use std::path::Path;

/// Only the most recent observations are considered for trends
const RECENT_WINDOW: usize = 100;

/// Maximum number of crops returned by [`MarketPrices::trends`]
const MAX_TRENDS: usize = 20;

const DEFAULT_SOURCE: &str = "csv";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketPrice {
    pub crop: String,
    pub price: f64,
    pub date: NaiveDate,
    pub source: String,
}

#[derive(Debug, Default)]
pub struct MarketPrices {
    /// Sorted by date, newest first
    records: Vec<MarketPrice>,
}

impl MarketPrices {
    /// Load from CSV. Rows with a missing crop, price or unparseable date are skipped.
    pub fn from_csv(path: &Path) -> anyhow::Result<Self> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .with_context(|| format!("Failed to create CSV reader: {}", path.display()))?
            .finish()
            .with_context(|| format!("Failed to load market CSV: {}", path.display()))?;

        let prices = Self::from_dataframe(&df)?;
        tracing::info!(
            "Loaded {} market price records from {}",
            prices.len(),
            path.display()
        );
        Ok(prices)
    }

    pub fn from_dataframe(df: &DataFrame) -> anyhow::Result<Self> {
        let crops = df
            .column("crop")
            .context("Column 'crop' not found")?
            .cast(&DataType::String)?;
        let crops = crops.str()?;

        let prices = df
            .column("price")
            .context("Column 'price' not found")?
            .cast(&DataType::Float64)?;
        let prices = prices.f64()?;

        let dates = df
            .column("date")
            .context("Column 'date' not found")?
            .cast(&DataType::String)?;
        let dates = dates.str()?;

        // Source is optional
        let sources = match df.column("source") {
            Ok(column) => Some(column.cast(&DataType::String)?),
            Err(_) => None,
        };
        let sources = sources.as_ref().map(|c| c.str()).transpose()?;

        let mut records = Vec::with_capacity(df.height());
        let mut skipped = 0usize;
        for i in 0..df.height() {
            let parsed = (|| {
                let crop = crops.get(i)?.trim();
                let price = prices.get(i).filter(|p| p.is_finite())?;
                let date = NaiveDate::parse_from_str(dates.get(i)?.trim(), "%Y-%m-%d").ok()?;
                if crop.is_empty() {
                    return None;
                }
                let source = sources
                    .and_then(|s| s.get(i))
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or(DEFAULT_SOURCE);
                Some(MarketPrice {
                    crop: crop.to_string(),
                    price,
                    date,
                    source: source.to_string(),
                })
            })();

            match parsed {
                Some(record) => records.push(record),
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            tracing::warn!("Skipped {} malformed market price rows", skipped);
        }

        Ok(Self::from_records(records))
    }

    pub fn from_records(mut records: Vec<MarketPrice>) -> Self {
        // Stable: same-day rows keep file order
        records.sort_by(|a, b| b.date.cmp(&a.date));
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Latest price per crop among the most recent observations, highest price first
    pub fn trends(&self) -> Vec<MarketPrice> {
        let mut latest: Vec<MarketPrice> = Vec::new();
        for record in self.records.iter().take(RECENT_WINDOW) {
            if !latest.iter().any(|r| r.crop == record.crop) {
                latest.push(record.clone());
            }
        }

        latest.sort_by(|a, b| b.price.total_cmp(&a.price));
        latest.truncate(MAX_TRENDS);
        latest
    }
}
