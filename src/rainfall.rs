//! Seasonal Rainfall Aggregator
//!
//! Loads the historical sub-division rainfall table (one row per region per
//! year, one column per month) into a typed in-memory index, then answers
//! "average rainfall for this region in the current season" without touching
//! disk again.

use crate::error::{AdvisorError, Result};
use crate::season::{MonthShift, Season};
use anyhow::Context;
use polars::prelude::*;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::path::Path;

/// Column holding the region name
pub const REGION_COLUMN: &str = "SUBDIVISION";

/// Month columns, January first
pub const MONTH_COLUMNS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

/// One historical record: rainfall in mm per month, `None` where missing
pub type MonthlyRainfall = [Option<f64>; 12];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RainfallSummary {
    pub region: String,
    pub season: Season,
    pub average_rainfall_mm: f64,
}

/// Region -> historical monthly records
#[derive(Debug, Default)]
pub struct RainfallTable {
    regions: FxHashMap<String, Vec<MonthlyRainfall>>,
}

impl RainfallTable {
    /// Load the table from CSV
    pub fn from_csv(path: &Path) -> anyhow::Result<Self> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .with_context(|| format!("Failed to create CSV reader: {}", path.display()))?
            .finish()
            .with_context(|| format!("Failed to load rainfall CSV: {}", path.display()))?;

        let table = Self::from_dataframe(&df)?;
        tracing::info!(
            "Loaded rainfall table from {} ({} regions, {} records)",
            path.display(),
            table.len(),
            table.record_count()
        );
        Ok(table)
    }

    /// Index a pre-loaded DataFrame. Month columns of any numeric or string
    /// type are cast to f64; unparseable cells become missing values.
    pub fn from_dataframe(df: &DataFrame) -> anyhow::Result<Self> {
        let regions = df
            .column(REGION_COLUMN)
            .with_context(|| format!("Column '{}' not found", REGION_COLUMN))?
            .str()
            .with_context(|| format!("Column '{}' is not string type", REGION_COLUMN))?;

        let months = MONTH_COLUMNS
            .iter()
            .map(|name| -> anyhow::Result<Float64Chunked> {
                let column = df
                    .column(name)
                    .with_context(|| format!("Column '{}' not found", name))?
                    .cast(&DataType::Float64)
                    .with_context(|| format!("Column '{}' is not numeric", name))?;
                Ok(column.f64()?.clone())
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let records = (0..df.height()).filter_map(|i| {
            let region = regions.get(i)?;
            let mut monthly: MonthlyRainfall = [None; 12];
            for (slot, column) in monthly.iter_mut().zip(months.iter()) {
                *slot = column.get(i).filter(|v| v.is_finite());
            }
            Some((region.to_string(), monthly))
        });

        Ok(Self::from_records(records))
    }

    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = (String, MonthlyRainfall)>,
    {
        let mut regions: FxHashMap<String, Vec<MonthlyRainfall>> = FxHashMap::default();
        for (region, monthly) in records {
            regions.entry(region).or_default().push(monthly);
        }
        Self { regions }
    }

    /// Number of distinct regions
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn record_count(&self) -> usize {
        self.regions.values().map(Vec::len).sum()
    }

    pub fn contains_region(&self, region: &str) -> bool {
        self.regions.contains_key(region)
    }

    /// Region names, sorted
    pub fn regions(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.regions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Mean over records of the season's summed monthly rainfall, unrounded.
    /// Missing months contribute nothing to a record's sum.
    pub fn seasonal_average(&self, region: &str, season: Season) -> Result<f64> {
        let records = self
            .regions
            .get(region)
            .filter(|records| !records.is_empty())
            .ok_or_else(|| AdvisorError::RegionNotFound(region.to_string()))?;

        let total: f64 = records
            .iter()
            .map(|monthly| {
                season
                    .months()
                    .iter()
                    .filter_map(|m| monthly[(*m - 1) as usize])
                    .sum::<f64>()
            })
            .sum();

        Ok(total / records.len() as f64)
    }

    /// Average rainfall for `region` in the season containing `month` (1-12),
    /// rounded to 2 decimals
    pub fn average_rainfall(
        &self,
        region: &str,
        month: u32,
        shift: MonthShift,
    ) -> Result<RainfallSummary> {
        let season = shift.season_for(month).ok_or_else(|| {
            AdvisorError::invalid_input("month", format!("{} is not a calendar month", month))
        })?;

        let average = self.seasonal_average(region, season)?;
        tracing::debug!(
            "Rainfall for {} in {} (month {}): {:.2} mm",
            region,
            season,
            month,
            average
        );

        Ok(RainfallSummary {
            region: region.to_string(),
            season,
            average_rainfall_mm: round2(average),
        })
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn monthly(values: [f64; 12]) -> MonthlyRainfall {
        values.map(Some)
    }

    fn table() -> RainfallTable {
        RainfallTable::from_records(vec![
            (
                "Kerala".to_string(),
                monthly([3.1, 10.2, 25.0, 120.3, 200.5, 650.0, 700.2, 400.1, 250.4, 300.0, 150.2, 40.1]),
            ),
            (
                "Kerala".to_string(),
                monthly([5.0, 8.0, 30.0, 100.0, 180.0, 600.0, 650.0, 420.0, 230.0, 280.0, 160.0, 30.0]),
            ),
            (
                "Tamil Nadu".to_string(),
                [Some(20.0), None, Some(10.0), None, None, None, None, None, None, Some(180.0), Some(300.0), Some(150.0)],
            ),
        ])
    }

    #[test]
    fn test_monsoon_average() {
        let summary = table().average_rainfall("Kerala", 7, MonthShift::Calendar).unwrap();

        assert_eq!(summary.region, "Kerala");
        assert_eq!(summary.season, Season::Monsoon);
        // (2000.7 + 1900.0) / 2
        assert_abs_diff_eq!(summary.average_rainfall_mm, 1950.35, epsilon = 1e-9);
    }

    #[test]
    fn test_each_season_for_kerala() {
        let table = table();
        let expected = [
            (Season::Winter, 48.2),
            (Season::PreMonsoon, 327.9),
            (Season::Monsoon, 1950.35),
            (Season::PostMonsoon, 445.1),
        ];
        for (season, mm) in expected {
            let avg = table.seasonal_average("Kerala", season).unwrap();
            assert_abs_diff_eq!(round2(avg), mm, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_missing_months_count_as_zero() {
        let table = table();
        let winter = table.seasonal_average("Tamil Nadu", Season::Winter).unwrap();
        assert_abs_diff_eq!(winter, 170.0, epsilon = 1e-9);

        let monsoon = table.seasonal_average("Tamil Nadu", Season::Monsoon).unwrap();
        assert_eq!(monsoon, 0.0);
    }

    #[test]
    fn test_region_match_is_exact() {
        let table = table();
        for region in ["kerala", "Kerala ", "Tamil", ""] {
            assert!(matches!(
                table.average_rainfall(region, 7, MonthShift::Calendar),
                Err(AdvisorError::RegionNotFound(_))
            ));
        }
    }

    #[test]
    fn test_legacy_shift_changes_season() {
        let table = table();
        let calendar = table.average_rainfall("Kerala", 9, MonthShift::Calendar).unwrap();
        let legacy = table.average_rainfall("Kerala", 9, MonthShift::Legacy).unwrap();

        assert_eq!(calendar.season, Season::Monsoon);
        assert_eq!(legacy.season, Season::PostMonsoon);
        assert_abs_diff_eq!(legacy.average_rainfall_mm, 445.1, epsilon = 1e-9);
    }

    #[test]
    fn test_invalid_month() {
        assert!(matches!(
            table().average_rainfall("Kerala", 13, MonthShift::Calendar),
            Err(AdvisorError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_rounds_to_two_decimals() {
        let table = RainfallTable::from_records(vec![
            ("X".to_string(), monthly([0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0])),
            ("X".to_string(), monthly([0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0])),
            ("X".to_string(), monthly([0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0])),
        ]);
        let summary = table.average_rainfall("X", 6, MonthShift::Calendar).unwrap();
        assert_abs_diff_eq!(summary.average_rainfall_mm, 0.33, epsilon = 1e-12);
    }

    #[test]
    fn test_from_dataframe_casts_and_skips_null_regions() {
        let df = df!(
            "SUBDIVISION" => [Some("Kerala"), None, Some("Kerala")],
            "YEAR" => [2015i64, 2015, 2016],
            "JAN" => [Some(1.0), Some(9.0), None],
            "FEB" => [Some(2.0), Some(9.0), Some(4.0)],
            "MAR" => [0.0, 0.0, 0.0],
            "APR" => [0.0, 0.0, 0.0],
            "MAY" => [0.0, 0.0, 0.0],
            "JUN" => [10i64, 0, 20],
            "JUL" => [0.0, 0.0, 0.0],
            "AUG" => [0.0, 0.0, 0.0],
            "SEP" => [0.0, 0.0, 0.0],
            "OCT" => [0.0, 0.0, 0.0],
            "NOV" => [0.0, 0.0, 0.0],
            "DEC" => [Some(3.0), Some(9.0), None]
        )
        .unwrap();

        let table = RainfallTable::from_dataframe(&df).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.record_count(), 2);

        // (1 + 2 + 3) and (4) -> 5.0
        let winter = table.seasonal_average("Kerala", Season::Winter).unwrap();
        assert_abs_diff_eq!(winter, 5.0, epsilon = 1e-12);
        // Integer month column is cast
        let monsoon = table.seasonal_average("Kerala", Season::Monsoon).unwrap();
        assert_abs_diff_eq!(monsoon, 15.0, epsilon = 1e-12);
    }

    #[test]
    fn test_from_dataframe_requires_month_columns() {
        let df = df!(
            "SUBDIVISION" => ["Kerala"],
            "JAN" => [1.0]
        )
        .unwrap();
        assert!(RainfallTable::from_dataframe(&df).is_err());
    }
}
