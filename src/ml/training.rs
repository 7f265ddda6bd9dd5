//! Model training utilities
//!
//! Builds a complete [`ModelBundle`] from a batch of feature vectors. A bundle
//! is immutable once built; retraining always produces a new one.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use super::features::FeatureVector;
use super::models::autoencoder::TrainingProgress;
use super::models::{AnomalyModel, AutoencoderDetector, IsolationForest, KnnDetector};
use super::normalization::NormalizationStatistics;
use super::MlConfig;
use crate::error::{AnomalyError, Result};

/// One trained ensemble generation
#[derive(Debug, Clone)]
pub struct ModelBundle {
    normalization: NormalizationStatistics,
    autoencoder: AutoencoderDetector,
    isolation_forest: IsolationForest,
    knn: KnnDetector,
    generation: u64,
    trained_at: DateTime<Utc>,
    sample_count: usize,
    final_loss: f32,
}

impl ModelBundle {
    pub fn normalization(&self) -> &NormalizationStatistics {
        &self.normalization
    }

    pub fn autoencoder(&self) -> &AutoencoderDetector {
        &self.autoencoder
    }

    pub fn isolation_forest(&self) -> &IsolationForest {
        &self.isolation_forest
    }

    pub fn knn(&self) -> &KnnDetector {
        &self.knn
    }

    /// Monotonic generation number, starting at 1
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }

    /// Feature vectors the bundle was fitted on
    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Autoencoder loss after the last epoch
    pub fn final_loss(&self) -> f32 {
        self.final_loss
    }
}

/// Model trainer
pub struct ModelTrainer {
    config: MlConfig,
}

impl Default for ModelTrainer {
    fn default() -> Self {
        Self::new(MlConfig::default())
    }
}

impl ModelTrainer {
    /// Create a new trainer
    pub fn new(config: MlConfig) -> Self {
        Self { config }
    }

    fn rng(&self) -> StdRng {
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }

    /// Fit normalization and all three detectors. `vectors` must not be
    /// empty; the lifecycle manager rejects empty batches before calling.
    /// Fails if any detector is left untrained.
    pub fn train(
        &self,
        vectors: &[FeatureVector],
        generation: u64,
        progress: &mut dyn FnMut(&str),
    ) -> Result<ModelBundle> {
        let mut rng = self.rng();

        progress("Computing normalization statistics...");
        let normalization = NormalizationStatistics::fit(vectors);
        let normalized = normalization.normalize_all(vectors);

        progress("Training reconstruction autoencoder...");
        let interval = self.config.autoencoder.progress_interval.max(1);
        let mut autoencoder = AutoencoderDetector::new(self.config.autoencoder.clone());
        autoencoder.fit_with_rng(&normalized, &mut rng, &mut |p: &TrainingProgress| {
            debug!(
                "Autoencoder epoch {}/{} loss {:.6} best {:.6}",
                p.epoch, p.total_epochs, p.epoch_loss, p.best_loss
            );
            if p.epoch % interval == 0 {
                progress(&format!(
                    "Autoencoder epoch {}/{} | Loss: {:.5}",
                    p.epoch, p.total_epochs, p.epoch_loss
                ));
            }
        });

        progress("Building isolation forest...");
        let mut isolation_forest = IsolationForest::new(self.config.isolation_forest.clone());
        isolation_forest.fit_with_rng(vectors, &mut rng);

        progress("Indexing nearest-neighbor reference sample...");
        let mut knn = KnnDetector::new(self.config.knn.clone());
        knn.fit(vectors);

        let detectors: [&dyn AnomalyModel; 3] = [&autoencoder, &isolation_forest, &knn];
        if let Some(untrained) = detectors.iter().find(|d| !d.is_trained()) {
            return Err(AnomalyError::TrainingFailed(format!(
                "{} did not finish fitting on {} samples",
                untrained.name(),
                vectors.len()
            )));
        }

        let final_loss = autoencoder.final_loss().unwrap_or(0.0);
        debug!(
            "Bundle generation {} fitted: {} samples, {} trees, {} reference points",
            generation,
            vectors.len(),
            isolation_forest.trees().len(),
            knn.reference_len()
        );

        Ok(ModelBundle {
            normalization,
            autoencoder,
            isolation_forest,
            knn,
            generation,
            trained_at: Utc::now(),
            sample_count: vectors.len(),
            final_loss,
        })
    }
}
