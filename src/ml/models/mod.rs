//! Unsupervised detectors and the ensemble that combines them

pub mod autoencoder;
pub mod ensemble;
pub mod isolation_forest;
pub mod knn;

pub use autoencoder::{AutoencoderConfig, AutoencoderDetector, ReconstructionScore};
pub use ensemble::{EnsembleConfig, EnsembleScorer, ModelWeights};
pub use isolation_forest::IsolationForest;
pub use knn::{KnnConfig, KnnDetector};

use serde::{Deserialize, Serialize};

use super::features::FeatureVector;

/// Scoring interface shared by the detectors.
///
/// Fitting is inherent to each detector since their inputs differ: the
/// isolation forest consumes raw feature vectors, the autoencoder and the kNN
/// query path consume vectors already standardized with the bundle's
/// statistics.
pub trait AnomalyModel: Send + Sync {
    /// Score a sample (higher = more anomalous)
    fn score(&self, sample: &FeatureVector) -> f32;

    /// Get model name
    fn name(&self) -> &str;

    /// Check if model is trained
    fn is_trained(&self) -> bool;
}

/// Isolation forest configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Number of trees
    pub num_trees: usize,
    /// Subsample size for each tree
    pub sample_size: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            num_trees: 100,
            sample_size: 256,
        }
    }
}
