//! Feature normalization
//!
//! Per-feature z-score statistics computed over one training batch.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::features::{FeatureVector, FEATURE_NAMES, NUM_FEATURES};

/// Floor applied to every standard deviation
pub const STD_EPSILON: f32 = 1e-5;

/// Mean and standard deviation per feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationStatistics {
    pub mean: [f32; NUM_FEATURES],
    pub std: [f32; NUM_FEATURES],
}

impl Default for NormalizationStatistics {
    fn default() -> Self {
        Self {
            mean: [0.0; NUM_FEATURES],
            std: [1.0; NUM_FEATURES],
        }
    }
}

impl NormalizationStatistics {
    /// Compute population mean/std over `samples`.
    ///
    /// Degenerate variance (constant features, single samples) is floored to
    /// [`STD_EPSILON`] instead of failing. An empty slice yields the identity
    /// statistics.
    pub fn fit(samples: &[FeatureVector]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        let n = samples.len() as f64;
        let mut sums = [0.0f64; NUM_FEATURES];
        for sample in samples {
            for (sum, &v) in sums.iter_mut().zip(sample.features.iter()) {
                *sum += v as f64;
            }
        }
        let means = sums.map(|s| s / n);

        let mut sq = [0.0f64; NUM_FEATURES];
        for sample in samples {
            for i in 0..NUM_FEATURES {
                sq[i] += (sample.features[i] as f64 - means[i]).powi(2);
            }
        }

        let mut stats = Self::default();
        for i in 0..NUM_FEATURES {
            let std = (sq[i] / n).sqrt() as f32;
            stats.mean[i] = means[i] as f32;
            stats.std[i] = if std < STD_EPSILON {
                debug!(
                    "Flooring std of {} ({:e}) to {:e}",
                    FEATURE_NAMES[i], std, STD_EPSILON
                );
                STD_EPSILON
            } else {
                std
            };
        }
        stats
    }

    /// Standardize a vector
    pub fn normalize(&self, vector: &FeatureVector) -> FeatureVector {
        let mut features = [0.0f32; NUM_FEATURES];
        for i in 0..NUM_FEATURES {
            features[i] = (vector.features[i] - self.mean[i]) / self.std[i];
        }
        FeatureVector::new(vector.catalog_number, features)
    }

    /// Invert [`normalize`](Self::normalize)
    pub fn denormalize(&self, vector: &FeatureVector) -> FeatureVector {
        let mut features = [0.0f32; NUM_FEATURES];
        for i in 0..NUM_FEATURES {
            features[i] = vector.features[i] * self.std[i] + self.mean[i];
        }
        FeatureVector::new(vector.catalog_number, features)
    }

    /// Standardize a batch
    pub fn normalize_all(&self, vectors: &[FeatureVector]) -> Vec<FeatureVector> {
        vectors.iter().map(|v| self.normalize(v)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{geo_outlier, geo_training_set};

    #[test]
    fn test_fit_mean_std() {
        let data = vec![
            FeatureVector::new(1, [1.0, 2.0, 0.0, 0.0, 0.0, 0.0, 5.0]),
            FeatureVector::new(2, [3.0, 2.0, 0.0, 0.0, 0.0, 0.0, 5.0]),
        ];
        let stats = NormalizationStatistics::fit(&data);

        assert!((stats.mean[0] - 2.0).abs() < 1e-6);
        assert!((stats.std[0] - 1.0).abs() < 1e-6);
        // Constant features are floored, not zero
        assert_eq!(stats.std[1], STD_EPSILON);
        assert_eq!(stats.std[6], STD_EPSILON);
    }

    #[test]
    fn test_normalized_batch_is_standardized() {
        let data = geo_training_set();
        let stats = NormalizationStatistics::fit(&data);
        let normalized = stats.normalize_all(&data);

        for i in 0..NUM_FEATURES {
            let mean: f32 = normalized.iter().map(|v| v.features[i]).sum::<f32>() / data.len() as f32;
            assert!(mean.abs() < 1e-2, "feature {} mean {}", i, mean);
        }
    }

    #[test]
    fn test_normalize_round_trip() {
        let stats = NormalizationStatistics::fit(&geo_training_set());

        for original in geo_training_set().iter().chain(std::iter::once(&geo_outlier())) {
            let back = stats.denormalize(&stats.normalize(original));
            for i in 0..NUM_FEATURES {
                let tol = 1e-4 * original.features[i].abs().max(1.0);
                assert!(
                    (back.features[i] - original.features[i]).abs() <= tol,
                    "feature {}: {} vs {}",
                    i,
                    back.features[i],
                    original.features[i]
                );
            }
            assert_eq!(back.catalog_number, original.catalog_number);
        }
    }

    #[test]
    fn test_empty_fit_is_identity() {
        let stats = NormalizationStatistics::fit(&[]);
        let v = FeatureVector::new(7, [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        assert_eq!(stats.normalize(&v), v);
    }
}
