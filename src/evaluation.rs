//! Offline evaluation of a crop pipeline against labeled samples.
//!
//! Produces overall accuracy and a per-class precision / recall / F1 report.

use crate::features::{Feature, FeatureVector};
use crate::recommender::CropRecommender;
use anyhow::Context;
use polars::prelude::*;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

pub const DEFAULT_LABEL_COLUMN: &str = "best_crop";

/// Soil readings a sample must carry when its column is present
const REQUIRED_FEATURES: [Feature; 4] = [
    Feature::Nitrogen,
    Feature::Phosphorus,
    Feature::Potassium,
    Feature::Ph,
];

#[derive(Debug, Clone)]
pub struct LabeledSample {
    pub features: FeatureVector,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub samples: usize,
    pub correct: usize,
    pub accuracy: f64,
    /// Keyed by class label, sorted
    pub per_class: BTreeMap<String, ClassMetrics>,
}

/// Read labeled samples from CSV. Feature columns that are absent take their
/// defaults. Rows with a null label, or a null N, P, K or pH cell, are dropped.
pub fn load_samples(path: &Path, label_column: &str) -> anyhow::Result<Vec<LabeledSample>> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .with_context(|| format!("Failed to create CSV reader: {}", path.display()))?
        .finish()
        .with_context(|| format!("Failed to load samples CSV: {}", path.display()))?;

    samples_from_dataframe(&df, label_column)
}

pub fn samples_from_dataframe(
    df: &DataFrame,
    label_column: &str,
) -> anyhow::Result<Vec<LabeledSample>> {
    let labels = df
        .column(label_column)
        .with_context(|| format!("Label column '{}' not found", label_column))?
        .cast(&DataType::String)?;
    let labels = labels.str()?;

    let mut columns = Vec::new();
    for feature in Feature::ALL {
        if let Ok(column) = df.column(feature.key()) {
            let values = column
                .cast(&DataType::Float64)
                .with_context(|| format!("Column '{}' is not numeric", feature.key()))?;
            columns.push((feature, values.f64()?.clone()));
        }
    }

    let samples: Vec<LabeledSample> = (0..df.height())
        .filter_map(|i| {
            let label = labels.get(i)?;
            let mut features = FeatureVector::default();
            for (feature, values) in &columns {
                match values.get(i).filter(|v| v.is_finite()) {
                    Some(v) => features.set(*feature, v),
                    None if REQUIRED_FEATURES.contains(feature) => return None,
                    None => {}
                }
            }
            Some(LabeledSample {
                features,
                label: label.to_string(),
            })
        })
        .collect();

    let dropped = df.height() - samples.len();
    if dropped > 0 {
        tracing::warn!("Dropped {} samples with a missing label or soil reading", dropped);
    }

    Ok(samples)
}

/// Score every sample in parallel and compare against its label
pub fn evaluate(recommender: &CropRecommender, samples: &[LabeledSample]) -> EvaluationReport {
    let predictions: Vec<String> = samples
        .par_iter()
        .map(|sample| recommender.score(&sample.features).prediction)
        .collect();

    let pairs = samples.iter().map(|s| s.label.as_str()).zip(predictions.iter().map(String::as_str));
    report_from_pairs(pairs)
}

/// Build the report from `(actual, predicted)` pairs
pub fn report_from_pairs<'a, I>(pairs: I) -> EvaluationReport
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    #[derive(Default)]
    struct Counts {
        true_positive: usize,
        predicted: usize,
        actual: usize,
    }

    let mut counts: BTreeMap<String, Counts> = BTreeMap::new();
    let mut samples = 0;
    let mut correct = 0;

    for (actual, predicted) in pairs {
        samples += 1;
        counts.entry(actual.to_string()).or_default().actual += 1;
        counts.entry(predicted.to_string()).or_default().predicted += 1;
        if actual == predicted {
            correct += 1;
            counts.entry(actual.to_string()).or_default().true_positive += 1;
        }
    }

    let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };

    let per_class = counts
        .into_iter()
        .map(|(label, c)| {
            let precision = ratio(c.true_positive, c.predicted);
            let recall = ratio(c.true_positive, c.actual);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            (label, ClassMetrics { precision, recall, f1, support: c.actual })
        })
        .collect();

    EvaluationReport {
        samples,
        correct,
        accuracy: ratio(correct, samples),
        per_class,
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Accuracy on {} samples: {:.4}", self.samples, self.accuracy)?;
        writeln!(f)?;
        writeln!(
            f,
            "{:<20} {:>10} {:>10} {:>10} {:>10}",
            "class", "precision", "recall", "f1-score", "support"
        )?;
        for (label, m) in &self.per_class {
            writeln!(
                f,
                "{:<20} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                label, m.precision, m.recall, m.f1, m.support
            )?;
        }
        Ok(())
    }
}
