//! k-nearest-neighbor density detector
//!
//! Keeps a bounded reference sample of standardized training vectors and
//! scores queries by their mean distance to the k closest reference points.
//!
//! Reference points are standardized with statistics computed over the
//! retained subset at fit time. Queries must arrive standardized with the
//! published bundle's statistics, which keeps this detector independent of the
//! autoencoder while sharing one canonical normalization at inference.

use serde::{Deserialize, Serialize};

use super::AnomalyModel;
use crate::ml::features::{FeatureVector, NUM_FEATURES};
use crate::ml::normalization::NormalizationStatistics;

/// kNN detector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnnConfig {
    /// Neighbors averaged per query
    pub k: usize,
    /// Reference points retained (first N of the training batch)
    pub max_reference_points: usize,
    /// Mean distance that maps to a score of 1.0
    pub distance_scale: f32,
}

impl Default for KnnConfig {
    fn default() -> Self {
        Self {
            k: 5,
            max_reference_points: 500,
            distance_scale: 5.0,
        }
    }
}

/// Neighbor-distance anomaly detector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnnDetector {
    config: KnnConfig,
    /// Standardized reference sample
    reference: Vec<[f32; NUM_FEATURES]>,
}

impl Default for KnnDetector {
    fn default() -> Self {
        Self::new(KnnConfig::default())
    }
}

impl KnnDetector {
    pub fn new(config: KnnConfig) -> Self {
        Self {
            config,
            reference: Vec::new(),
        }
    }

    /// Mean distance from a standardized query to its k nearest references
    pub fn mean_neighbor_distance(&self, normalized: &[f32; NUM_FEATURES]) -> Option<f32> {
        if self.reference.is_empty() {
            return None;
        }

        let mut distances: Vec<f32> = self
            .reference
            .iter()
            .map(|r| {
                r.iter()
                    .zip(normalized.iter())
                    .map(|(a, b)| (a - b).powi(2))
                    .sum::<f32>()
                    .sqrt()
            })
            .collect();

        let k = self.config.k.clamp(1, distances.len());
        distances.select_nth_unstable_by(k - 1, |a, b| a.total_cmp(b));
        let nearest = &distances[..k];

        Some(nearest.iter().sum::<f32>() / k as f32)
    }

    /// Retain the first `max_reference_points` raw vectors and standardize
    /// them with statistics of that retained subset.
    pub fn fit(&mut self, data: &[FeatureVector]) {
        let retained = &data[..data.len().min(self.config.max_reference_points)];
        let local = NormalizationStatistics::fit(retained);
        self.reference = retained.iter().map(|v| local.normalize(v).features).collect();
    }

    pub fn reference_len(&self) -> usize {
        self.reference.len()
    }

    pub fn config(&self) -> &KnnConfig {
        &self.config
    }
}

impl AnomalyModel for KnnDetector {
    /// `sample` must be standardized with the published bundle's statistics
    fn score(&self, sample: &FeatureVector) -> f32 {
        match self.mean_neighbor_distance(&sample.features) {
            Some(mean_distance) => (mean_distance / self.config.distance_scale).clamp(0.0, 1.0),
            None => 0.0,
        }
    }

    fn name(&self) -> &str {
        "kNN"
    }

    fn is_trained(&self) -> bool {
        !self.reference.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{geo_outlier, geo_training_set, nominal_geo};

    #[test]
    fn test_reference_sample_bounded() {
        let data: Vec<FeatureVector> = (0..1200).map(nominal_geo).collect();
        let mut knn = KnnDetector::default();
        knn.fit(&data);

        assert!(knn.is_trained());
        assert_eq!(knn.reference_len(), 500);
    }

    #[test]
    fn test_untrained_scores_zero() {
        let knn = KnnDetector::default();
        assert!(!knn.is_trained());
        assert_eq!(knn.score(&nominal_geo(0)), 0.0);
    }

    #[test]
    fn test_k_nearest_mean() {
        let mut knn = KnnDetector::new(KnnConfig {
            k: 2,
            ..Default::default()
        });
        // Already standardized reference points
        knn.reference = vec![
            [0.0; NUM_FEATURES],
            [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            [10.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        ];

        let d = knn.mean_neighbor_distance(&[0.0; NUM_FEATURES]).unwrap();
        assert!((d - 0.5).abs() < 1e-6);

        // k larger than the reference sample uses every point
        knn.config.k = 10;
        let d = knn.mean_neighbor_distance(&[0.0; NUM_FEATURES]).unwrap();
        assert!((d - 11.0 / 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_score_saturates() {
        let data = geo_training_set();
        let stats = NormalizationStatistics::fit(&data);
        let mut knn = KnnDetector::default();
        knn.fit(&data);

        let nominal = knn.score(&stats.normalize(&nominal_geo(3)));
        let outlier = knn.score(&stats.normalize(&geo_outlier()));

        assert!((0.0..=1.0).contains(&nominal));
        assert_eq!(outlier, 1.0);
        assert!(outlier > nominal);
    }
}
