//! Crop Pipeline Artifact
//!
//! A trained recommender exported as one JSON document: the standardization
//! parameters and the random forest travel together, keyed by the feature
//! columns they were fit on.
//!
//! Tree layout follows the usual flattened form: nodes live in one vector,
//! children are referenced by index, and a sample goes left when its scaled
//! value is `<= threshold`.

use crate::error::{AdvisorError, Result};
use crate::features::{Feature, FeatureVector};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Serialized pipeline (scaler + forest)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineArtifact {
    /// Wire keys of the trained columns, in training order
    pub feature_columns: Vec<String>,
    pub scaler: StandardScaler,
    pub classifier: RandomForest,
}

/// Per-column standardization: `(x - mean) / scale`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RandomForest {
    pub classes: Vec<String>,
    pub trees: Vec<DecisionTree>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Per-class weights (sample counts or fractions)
    Leaf { value: Vec<f64> },
}

impl DecisionTree {
    /// Class distribution of the leaf reached by `row`
    fn leaf_distribution(&self, row: &[f64], n_classes: usize) -> Vec<f64> {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Split { feature, threshold, left, right } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
                TreeNode::Leaf { value } => {
                    let total: f64 = value.iter().sum();
                    if total > 0.0 {
                        return value.iter().map(|v| v / total).collect();
                    }
                    return vec![1.0 / n_classes as f64; n_classes];
                }
            }
        }
    }

    fn validate(&self, tree_idx: usize, n_features: usize, n_classes: usize) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(corrupt(format!("tree {} has no nodes", tree_idx)));
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split { feature, left, right, .. } => {
                    if *feature >= n_features {
                        return Err(corrupt(format!(
                            "tree {} node {} splits on feature {} but the pipeline has {} columns",
                            tree_idx, idx, feature, n_features
                        )));
                    }
                    // Children strictly after the parent rules out cycles
                    for child in [*left, *right] {
                        if child <= idx || child >= self.nodes.len() {
                            return Err(corrupt(format!(
                                "tree {} node {} has invalid child index {}",
                                tree_idx, idx, child
                            )));
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    if value.len() != n_classes {
                        return Err(corrupt(format!(
                            "tree {} leaf {} has {} class weights, expected {}",
                            tree_idx,
                            idx,
                            value.len(),
                            n_classes
                        )));
                    }
                    if value.iter().any(|v| !v.is_finite() || *v < 0.0) {
                        return Err(corrupt(format!(
                            "tree {} leaf {} has negative or non-finite weights",
                            tree_idx, idx
                        )));
                    }
                    // Normalization divides by the total
                    if !value.iter().sum::<f64>().is_finite() {
                        return Err(corrupt(format!(
                            "tree {} leaf {} weights overflow when summed",
                            tree_idx, idx
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Validated, ready-to-run pipeline
#[derive(Debug, Clone)]
pub struct CropPipeline {
    columns: Vec<Feature>,
    mean: Vec<f64>,
    scale: Vec<f64>,
    forest: RandomForest,
}

impl CropPipeline {
    /// Load and validate an artifact from disk
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => AdvisorError::ModelNotFound {
                path: path.display().to_string(),
            },
            _ => AdvisorError::Inference(format!(
                "failed to read model artifact {}: {}",
                path.display(),
                e
            )),
        })?;

        let artifact: PipelineArtifact = serde_json::from_str(&contents)
            .map_err(|e| corrupt(format!("failed to parse {}: {}", path.display(), e)))?;

        Self::from_artifact(artifact)
    }

    pub fn from_artifact(artifact: PipelineArtifact) -> Result<Self> {
        let n_features = artifact.feature_columns.len();
        if n_features == 0 {
            return Err(corrupt("no feature columns".to_string()));
        }

        let columns = artifact
            .feature_columns
            .iter()
            .map(|name| {
                Feature::from_key(name)
                    .ok_or_else(|| corrupt(format!("unknown feature column '{}'", name)))
            })
            .collect::<Result<Vec<_>>>()?;

        let StandardScaler { mean, scale } = artifact.scaler;
        if mean.len() != n_features || scale.len() != n_features {
            return Err(corrupt(format!(
                "scaler has {} means and {} scales for {} columns",
                mean.len(),
                scale.len(),
                n_features
            )));
        }
        if mean.iter().chain(scale.iter()).any(|v| !v.is_finite()) {
            return Err(corrupt("scaler has non-finite parameters".to_string()));
        }
        // Constant columns were exported with a zero scale
        let scale = scale
            .into_iter()
            .map(|s| if s == 0.0 { 1.0 } else { s })
            .collect();

        let forest = artifact.classifier;
        if forest.classes.is_empty() {
            return Err(corrupt("classifier has no classes".to_string()));
        }
        let mut seen = FxHashSet::default();
        if let Some(dup) = forest.classes.iter().find(|c| !seen.insert(c.as_str())) {
            return Err(corrupt(format!("duplicate class label '{}'", dup)));
        }
        if forest.trees.is_empty() {
            return Err(corrupt("classifier has no trees".to_string()));
        }
        for (tree_idx, tree) in forest.trees.iter().enumerate() {
            tree.validate(tree_idx, n_features, forest.classes.len())?;
        }

        Ok(Self { columns, mean, scale, forest })
    }

    /// Class labels in model order
    pub fn classes(&self) -> &[String] {
        &self.forest.classes
    }

    /// Trained columns in order
    pub fn columns(&self) -> &[Feature] {
        &self.columns
    }

    pub fn n_trees(&self) -> usize {
        self.forest.trees.len()
    }

    /// Assemble the row in training column order, defaults filled in, then standardize
    pub fn transform(&self, features: &FeatureVector) -> Vec<f64> {
        self.columns
            .iter()
            .zip(self.mean.iter().zip(self.scale.iter()))
            .map(|(feature, (mean, scale))| (features.get(*feature) - mean) / scale)
            .collect()
    }

    /// Full probability distribution over [`classes`](Self::classes)
    pub fn predict_proba(&self, features: &FeatureVector) -> Vec<f64> {
        let row = self.transform(features);
        let n_classes = self.forest.classes.len();

        let mut proba = vec![0.0; n_classes];
        for tree in &self.forest.trees {
            for (acc, p) in proba.iter_mut().zip(tree.leaf_distribution(&row, n_classes)) {
                *acc += p;
            }
        }

        let n_trees = self.forest.trees.len() as f64;
        proba.iter_mut().for_each(|p| *p /= n_trees);
        proba
    }
}

fn corrupt(reason: String) -> AdvisorError {
    AdvisorError::Inference(format!("corrupted artifact: {}", reason))
}
