//! Orbital Anomaly Detection Engine
//!
//! Scores catalogued objects against an unsupervised ensemble learned from the
//! catalog itself.
//!
//! # Features
//! - Feature extraction from two-line element sets
//! - Three detectors: reconstruction autoencoder, isolation forest, kNN density
//! - Weighted ensemble with age dampening and cause attribution
//! - Shadow training with atomic hot-swap of the published model bundle
//!
//! # Example
//! ```ignore
//! use orbitwatch::ml::{MlConfig, ModelLifecycleManager};
//!
//! let manager = ModelLifecycleManager::new(MlConfig::default());
//! manager.train(&catalog, None).await?;
//!
//! let result = manager.score(&record, chrono::Utc::now())?;
//! if result.is_at_least(RiskLevel::High) {
//!     println!("{}: {}", result.object_name, result.assessment);
//! }
//! ```

pub mod anomaly;
pub mod elements;
pub mod features;
pub mod models;
pub mod normalization;
pub mod training;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{AnomalyError, Result};
use crate::models::OrbitalRecord;

pub use anomaly::{AnomalyResult, CauseAttribution, ComponentScores, RiskLevel, RiskThresholds};
pub use elements::OrbitalElements;
pub use features::{
    BatchExtraction, FeatureConfig, FeatureExtractor, FeatureVector, FEATURE_NAMES, NUM_FEATURES,
};
pub use models::{
    AnomalyModel, AutoencoderConfig, AutoencoderDetector, EnsembleConfig, EnsembleScorer,
    IsolationForest, KnnConfig, KnnDetector, ModelConfig, ModelWeights,
};
pub use normalization::NormalizationStatistics;
pub use training::{ModelBundle, ModelTrainer};

/// Advisory progress text sink for [`ModelLifecycleManager::train`]
pub type ProgressCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// ML configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MlConfig {
    /// Feature extraction configuration
    pub features: FeatureConfig,
    /// Isolation forest configuration
    pub isolation_forest: ModelConfig,
    /// kNN detector configuration
    pub knn: KnnConfig,
    /// Autoencoder configuration
    pub autoencoder: AutoencoderConfig,
    /// Ensemble weighting and risk levels
    pub ensemble: EnsembleConfig,
    /// Fixed seed for every random draw during training
    pub seed: Option<u64>,
}

/// Lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleState {
    /// No bundle published yet
    Untrained,
    /// A bundle is published and usable
    Serving,
    /// A new bundle is being built; any published bundle keeps serving
    ShadowTraining,
}

/// Point-in-time view of the lifecycle manager
#[derive(Debug, Clone, Serialize)]
pub struct ModelStatus {
    pub state: LifecycleState,
    pub generation: Option<u64>,
    pub trained_at: Option<DateTime<Utc>>,
    pub sample_count: usize,
    pub trainings_completed: u64,
    pub trainings_rejected: u64,
    pub records_scored: u64,
}

/// Outcome of one successful train-and-swap cycle
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub generation: u64,
    pub records_submitted: usize,
    pub vectors_used: usize,
    pub records_discarded: usize,
    pub final_loss: f32,
    pub elapsed: Duration,
}

/// Results of scoring a batch against one bundle
#[derive(Debug, Default)]
pub struct BatchScores {
    pub results: Vec<AnomalyResult>,
    /// (index into the input batch, error)
    pub rejected: Vec<(usize, AnomalyError)>,
}

/// Clears the training flag when the train future completes or is dropped
struct TrainingGuard<'a>(&'a AtomicBool);

impl Drop for TrainingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Owns the published bundle and the shadow-train-then-swap cycle
pub struct ModelLifecycleManager {
    /// Configuration
    config: MlConfig,
    /// Feature extractor
    extractor: FeatureExtractor,
    /// Ensemble combiner
    scorer: EnsembleScorer,
    /// Published bundle; replaced as a whole
    published: RwLock<Option<Arc<ModelBundle>>>,
    /// Serializes trainers; the permit travels with the blocking fit
    trainer_lock: Arc<Mutex<()>>,
    /// Set while a shadow bundle is being built
    training: AtomicBool,
    trainings_completed: AtomicU64,
    trainings_rejected: AtomicU64,
    records_scored: AtomicU64,
}

impl Default for ModelLifecycleManager {
    fn default() -> Self {
        Self::new(MlConfig::default())
    }
}

impl ModelLifecycleManager {
    /// Create a manager with no published bundle
    pub fn new(config: MlConfig) -> Self {
        let extractor = FeatureExtractor::new(config.features.clone());
        let scorer = EnsembleScorer::new(config.ensemble.clone());

        Self {
            config,
            extractor,
            scorer,
            published: RwLock::new(None),
            trainer_lock: Arc::new(Mutex::new(())),
            training: AtomicBool::new(false),
            trainings_completed: AtomicU64::new(0),
            trainings_rejected: AtomicU64::new(0),
            records_scored: AtomicU64::new(0),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &MlConfig {
        &self.config
    }

    /// Current published bundle, if any. Holding the `Arc` keeps that
    /// generation alive across a swap.
    pub fn snapshot(&self) -> Option<Arc<ModelBundle>> {
        self.published.read().clone()
    }

    /// Get current state
    pub fn state(&self) -> LifecycleState {
        if self.training.load(Ordering::SeqCst) {
            LifecycleState::ShadowTraining
        } else if self.published.read().is_some() {
            LifecycleState::Serving
        } else {
            LifecycleState::Untrained
        }
    }

    /// Check if a bundle is published
    pub fn is_trained(&self) -> bool {
        self.published.read().is_some()
    }

    pub fn status(&self) -> ModelStatus {
        let bundle = self.snapshot();
        ModelStatus {
            state: self.state(),
            generation: bundle.as_ref().map(|b| b.generation()),
            trained_at: bundle.as_ref().map(|b| b.trained_at()),
            sample_count: bundle.as_ref().map(|b| b.sample_count()).unwrap_or(0),
            trainings_completed: self.trainings_completed.load(Ordering::Relaxed),
            trainings_rejected: self.trainings_rejected.load(Ordering::Relaxed),
            records_scored: self.records_scored.load(Ordering::Relaxed),
        }
    }

    /// Build a new bundle from `records` off the async executor and publish
    /// it. The previous bundle keeps serving until the swap, and is left in
    /// place if the batch yields no usable vectors or fitting fails.
    pub async fn train(
        &self,
        records: &[OrbitalRecord],
        progress: Option<ProgressCallback>,
    ) -> Result<TrainingReport> {
        let permit = Arc::clone(&self.trainer_lock).lock_owned().await;
        self.training.store(true, Ordering::SeqCst);
        let guard = TrainingGuard(&self.training);

        let started = Instant::now();
        let report = |message: &str| {
            info!("{}", message);
            if let Some(cb) = &progress {
                cb(message);
            }
        };

        report(&format!("Vectorizing {} orbital records...", records.len()));
        let batch = self.extractor.extract_batch(records, Utc::now());

        if batch.vectors.is_empty() {
            self.trainings_rejected.fetch_add(1, Ordering::Relaxed);
            warn!(
                "Training batch of {} records yielded no feature vectors; keeping generation {:?}",
                records.len(),
                self.snapshot().map(|b| b.generation())
            );
            return Err(AnomalyError::EmptyTrainingSet {
                submitted: records.len(),
            });
        }

        let records_discarded = batch.rejected.len();
        let vectors = batch.vectors;
        let vectors_used = vectors.len();
        if records_discarded > 0 {
            info!(
                "Discarded {} of {} records during extraction",
                records_discarded,
                records.len()
            );
        }

        let generation = self.snapshot().map(|b| b.generation()).unwrap_or(0) + 1;
        let trainer = ModelTrainer::new(self.config.clone());
        let task_progress = progress.clone();

        // The permit is returned with the bundle, so a dropped train future
        // still holds off the next trainer until this fit ends
        let (fitted, permit) = tokio::task::spawn_blocking(move || {
            let fitted = trainer.train(&vectors, generation, &mut |message| {
                info!("{}", message);
                if let Some(cb) = &task_progress {
                    cb(message);
                }
            });
            (fitted, permit)
        })
        .await
        .map_err(|e| {
            warn!("Shadow training task failed: {}", e);
            AnomalyError::TrainingFailed(e.to_string())
        })?;

        let bundle = fitted.inspect_err(|e| {
            self.trainings_rejected.fetch_add(1, Ordering::Relaxed);
            warn!("Shadow training for generation {} failed: {}", generation, e);
        })?;

        let final_loss = bundle.final_loss();
        let sample_count = bundle.sample_count();
        let previous = self.published.write().replace(Arc::new(bundle));
        drop(guard);
        drop(permit);
        // The old generation is freed once in-flight scorers release it
        drop(previous);

        self.trainings_completed.fetch_add(1, Ordering::Relaxed);
        let elapsed = started.elapsed();
        info!(
            "Hot-swap complete: generation {} ({} samples, {:?})",
            generation, sample_count, elapsed
        );
        report("Ensemble training complete; hot-swap executed.");

        Ok(TrainingReport {
            generation,
            records_submitted: records.len(),
            vectors_used,
            records_discarded,
            final_loss,
            elapsed,
        })
    }

    /// Score one record against the published bundle
    pub fn score(&self, record: &OrbitalRecord, now: DateTime<Utc>) -> Result<AnomalyResult> {
        let bundle = self.snapshot().ok_or(AnomalyError::ModelsNotTrained)?;
        self.score_against(&bundle, record, now)
    }

    /// Score one record against a bundle obtained from [`Self::snapshot`]
    pub fn score_against(
        &self,
        bundle: &ModelBundle,
        record: &OrbitalRecord,
        now: DateTime<Utc>,
    ) -> Result<AnomalyResult> {
        let vector = self.extractor.extract(record, now)?;
        let result = self.scorer.score_features(bundle, &vector, &record.name);
        self.records_scored.fetch_add(1, Ordering::Relaxed);
        Ok(result)
    }

    /// Score a batch against a single bundle snapshot, skipping records that
    /// fail to decode
    pub fn score_batch(&self, records: &[OrbitalRecord], now: DateTime<Utc>) -> Result<BatchScores> {
        let bundle = self.snapshot().ok_or(AnomalyError::ModelsNotTrained)?;
        let extracted = self.extractor.extract_batch(records, now);

        let mut scores = BatchScores {
            results: Vec::with_capacity(extracted.vectors.len()),
            rejected: extracted.rejected,
        };

        // Surviving vectors keep input order; names come from the matching records
        let mut rejected = scores.rejected.iter().map(|(idx, _)| *idx).peekable();
        let mut vectors = extracted.vectors.iter();
        for (idx, record) in records.iter().enumerate() {
            if rejected.peek() == Some(&idx) {
                rejected.next();
                continue;
            }
            if let Some(vector) = vectors.next() {
                scores
                    .results
                    .push(self.scorer.score_features(&bundle, vector, &record.name));
            }
        }

        self.records_scored
            .fetch_add(scores.results.len() as u64, Ordering::Relaxed);
        debug!(
            "Scored {} records against generation {} ({} skipped)",
            scores.results.len(),
            bundle.generation(),
            scores.rejected.len()
        );
        Ok(scores)
    }
}
