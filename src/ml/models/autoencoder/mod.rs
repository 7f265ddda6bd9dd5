//! Autoencoder-based Anomaly Detection
//!
//! Uses reconstruction error to detect anomalies. Normal orbits should
//! reconstruct with low error while anomalies should have high error.
//!
//! # Architecture
//! ```text
//! Input (7D) -> 14 -> 8 -> 3 (latent) -> 8 -> 14 -> Output (7D)
//! ```
//!
//! # Usage
//! ```ignore
//! use orbitwatch::ml::models::autoencoder::{AutoencoderConfig, AutoencoderDetector};
//!
//! let mut detector = AutoencoderDetector::new(AutoencoderConfig::default());
//!
//! // Train on standardized vectors of the reference population
//! detector.fit_with_rng(&normalized_vectors, &mut rng, &mut |_| {});
//!
//! // Per-feature reconstruction error for one object
//! let score = detector.reconstruction(&normalized_vector);
//! ```

pub mod network;
pub mod trainer;

pub use network::{Activation, Autoencoder, AutoencoderConfig};
pub use trainer::{AutoencoderTrainer, TrainedAutoencoder, TrainingProgress};

use rand::Rng;
use serde::Serialize;

use super::AnomalyModel;
use crate::ml::features::{FeatureVector, NUM_FEATURES};

/// Reconstruction of one standardized vector
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconstructionScore {
    /// Mean squared reconstruction error
    pub mse: f32,
    /// |input - reconstruction| per feature
    pub per_feature_error: [f32; NUM_FEATURES],
}

impl ReconstructionScore {
    /// Index of the largest error among the first `limit` features; the
    /// earliest index wins ties.
    pub fn dominant_feature(&self, limit: usize) -> usize {
        let mut best = 0;
        let mut max_diff = 0.0f32;
        for (i, err) in self.per_feature_error.iter().take(limit).enumerate() {
            if *err > max_diff {
                max_diff = *err;
                best = i;
            }
        }
        best
    }
}

/// Autoencoder-based anomaly detector
#[derive(Debug, Clone)]
pub struct AutoencoderDetector {
    /// Configuration
    config: AutoencoderConfig,
    /// Trained model (if available)
    trained: Option<TrainedAutoencoder>,
}

impl Default for AutoencoderDetector {
    fn default() -> Self {
        Self::new(AutoencoderConfig::default())
    }
}

impl AutoencoderDetector {
    /// Create a new autoencoder detector
    pub fn new(config: AutoencoderConfig) -> Self {
        Self {
            config,
            trained: None,
        }
    }

    /// Train on standardized vectors, reporting each epoch to `on_epoch`
    pub fn fit_with_rng<R: Rng>(
        &mut self,
        normalized: &[FeatureVector],
        rng: &mut R,
        on_epoch: &mut dyn FnMut(&TrainingProgress),
    ) {
        let samples: Vec<[f32; NUM_FEATURES]> = normalized.iter().map(|v| v.features).collect();
        let mut trainer = AutoencoderTrainer::new(self.config.clone());
        self.trained = Some(trainer.train(&samples, rng, on_epoch));
    }

    /// Reconstruct a standardized vector
    pub fn reconstruct(&self, normalized: &FeatureVector) -> Option<[f32; NUM_FEATURES]> {
        self.trained
            .as_ref()
            .filter(|t| t.trained)
            .map(|t| t.reconstruct(&normalized.features))
    }

    /// Reconstruction error for a standardized vector
    pub fn reconstruction(&self, normalized: &FeatureVector) -> Option<ReconstructionScore> {
        let output = self.reconstruct(normalized)?;

        let mut per_feature_error = [0.0f32; NUM_FEATURES];
        let mut squared = 0.0f32;
        for (i, (x, y)) in normalized.features.iter().zip(output.iter()).enumerate() {
            let diff = x - y;
            per_feature_error[i] = diff.abs();
            squared += diff * diff;
        }

        Some(ReconstructionScore {
            mse: squared / NUM_FEATURES as f32,
            per_feature_error,
        })
    }

    /// Final training loss, if trained
    pub fn final_loss(&self) -> Option<f32> {
        self.trained.as_ref().filter(|t| t.trained).map(|t| t.final_loss)
    }

    /// Epochs completed by the last fit
    pub fn epochs_trained(&self) -> usize {
        self.trained.as_ref().map(|t| t.epochs_trained).unwrap_or(0)
    }

    /// Get configuration
    pub fn config(&self) -> &AutoencoderConfig {
        &self.config
    }
}

impl AnomalyModel for AutoencoderDetector {
    /// Mean squared reconstruction error; 0.0 when untrained
    fn score(&self, sample: &FeatureVector) -> f32 {
        self.reconstruction(sample).map(|r| r.mse).unwrap_or(0.0)
    }

    fn name(&self) -> &str {
        "Autoencoder"
    }

    fn is_trained(&self) -> bool {
        self.trained.as_ref().map(|t| t.trained).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::normalization::NormalizationStatistics;
    use crate::test_support::{geo_outlier, geo_training_set, nominal_geo};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_detector_creation() {
        let detector = AutoencoderDetector::default();
        assert!(!detector.is_trained());
        assert!(detector.reconstruction(&nominal_geo(0)).is_none());
        assert_eq!(detector.score(&nominal_geo(0)), 0.0);
    }

    #[test]
    fn test_dominant_feature_ties_and_limit() {
        let score = ReconstructionScore {
            mse: 0.0,
            per_feature_error: [0.2, 0.5, 0.5, 0.1, 0.0, 0.3, 9.0],
        };
        // Age (index 6) is never considered; the first of equal maxima wins
        assert_eq!(score.dominant_feature(6), 1);

        let zero = ReconstructionScore {
            mse: 0.0,
            per_feature_error: [0.0; NUM_FEATURES],
        };
        assert_eq!(zero.dominant_feature(6), 0);
    }

    #[test]
    fn test_fit_reports_every_epoch() {
        let data = geo_training_set();
        let stats = NormalizationStatistics::fit(&data);
        let normalized = stats.normalize_all(&data);

        let mut detector = AutoencoderDetector::default();
        let mut epochs = Vec::new();
        detector.fit_with_rng(&normalized, &mut StdRng::seed_from_u64(7), &mut |p| {
            epochs.push((p.epoch, p.total_epochs))
        });

        assert!(detector.is_trained());
        assert_eq!(detector.epochs_trained(), 30);
        assert_eq!(epochs.len(), 30);
        assert_eq!(epochs.last(), Some(&(30, 30)));
        assert!(detector.final_loss().is_some());
    }

    #[test]
    fn test_outlier_reconstructs_worse() {
        let data = geo_training_set();
        let stats = NormalizationStatistics::fit(&data);
        let normalized = stats.normalize_all(&data);

        let mut detector = AutoencoderDetector::default();
        detector.fit_with_rng(&normalized, &mut StdRng::seed_from_u64(11), &mut |_| {});

        let nominal = detector
            .reconstruction(&stats.normalize(&nominal_geo(5)))
            .unwrap();
        let outlier = detector
            .reconstruction(&stats.normalize(&geo_outlier()))
            .unwrap();

        assert!(outlier.mse > nominal.mse);
        assert!(outlier.per_feature_error.iter().all(|e| *e >= 0.0));
    }
}
