//! Recommendation Scorer
//!
//! Turns a feature vector into a ranked list of candidate crops using the
//! pipeline loaded at startup. Scoring is read-only, so one recommender is
//! shared by every request.

use crate::error::Result;
use crate::features::FeatureVector;
use crate::model::CropPipeline;
use serde::Serialize;
use std::path::Path;

/// One entry of the ranking
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CropProbability {
    pub crop: String,
    pub prob: f64,
}

/// Primary prediction plus every known class sorted by probability
#[derive(Debug, Clone, Serialize)]
pub struct RankedPrediction {
    pub prediction: String,
    pub ranking: Vec<CropProbability>,
}

pub struct CropRecommender {
    pipeline: CropPipeline,
}

impl CropRecommender {
    /// Load the pipeline artifact. A missing file is fatal for the caller.
    pub fn load(model_path: &Path) -> Result<Self> {
        let pipeline = CropPipeline::load(model_path)?;
        tracing::info!(
            "Loaded crop pipeline from {} ({} classes, {} trees, columns: {:?})",
            model_path.display(),
            pipeline.classes().len(),
            pipeline.n_trees(),
            pipeline.columns().iter().map(|f| f.key()).collect::<Vec<_>>()
        );
        Ok(Self { pipeline })
    }

    pub fn new(pipeline: CropPipeline) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &CropPipeline {
        &self.pipeline
    }

    /// Score one feature vector.
    ///
    /// Ties keep model class order, so the primary prediction is the same
    /// class an argmax over the distribution would pick.
    pub fn score(&self, features: &FeatureVector) -> RankedPrediction {
        let proba = self.pipeline.predict_proba(features);
        let classes = self.pipeline.classes();

        let mut order: Vec<usize> = (0..classes.len()).collect();
        // Stable sort: equal probabilities stay in class order
        order.sort_by(|&a, &b| proba[b].total_cmp(&proba[a]));

        let ranking: Vec<CropProbability> = order
            .into_iter()
            .map(|idx| CropProbability {
                crop: classes[idx].clone(),
                prob: proba[idx],
            })
            .collect();

        tracing::debug!(
            "Scored features -> {} ({:.3})",
            ranking[0].crop,
            ranking[0].prob
        );

        RankedPrediction {
            prediction: ranking[0].crop.clone(),
            ranking,
        }
    }
}
