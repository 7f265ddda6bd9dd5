//! Ensemble Anomaly Scoring
//!
//! Combines the three detectors of one published bundle into a 0-100 risk
//! score, a risk level and a cause attribution.
//!
//! # Default Ensemble Weights
//! | Model | Weight | Input |
//! |-------|--------|-------|
//! | Autoencoder | 40% | standardized, `min(1, mse * 2)` |
//! | Isolation Forest | 30% | raw features |
//! | kNN | 30% | standardized |
//!
//! Objects older than 15 years have their floored score multiplied by 0.8.
//!
//! # Usage
//! ```ignore
//! use orbitwatch::ml::models::ensemble::{EnsembleConfig, EnsembleScorer};
//!
//! let scorer = EnsembleScorer::new(EnsembleConfig::default());
//! let result = scorer.score_features(&bundle, &vector, "INTELSAT 901");
//! println!("{} {}", result.risk_level, result.assessment);
//! ```

use serde::{Deserialize, Serialize};

use super::autoencoder::ReconstructionScore;
use super::AnomalyModel;
use crate::ml::anomaly::{AnomalyResult, CauseAttribution, ComponentScores, RiskThresholds};
use crate::ml::features::{FeatureVector, AGE_FEATURE, NUM_FEATURES};
use crate::ml::training::ModelBundle;

/// Model weights for ensemble
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelWeights {
    pub autoencoder: f32,
    pub isolation_forest: f32,
    pub knn: f32,
}

impl Default for ModelWeights {
    fn default() -> Self {
        Self {
            autoencoder: 0.4,
            isolation_forest: 0.3,
            knn: 0.3,
        }
    }
}

/// Ensemble configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleConfig {
    /// Model weights
    pub weights: ModelWeights,
    /// Reconstruction MSE multiplier before clamping to 1
    pub reconstruction_gain: f32,
    /// Objects strictly older than this are dampened
    pub age_dampening_years: f32,
    /// Multiplier applied to the floored score of old objects
    pub age_dampening_factor: f32,
    /// Risk level bounds
    pub thresholds: RiskThresholds,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            weights: ModelWeights::default(),
            reconstruction_gain: 2.0,
            age_dampening_years: 15.0,
            age_dampening_factor: 0.8,
            thresholds: RiskThresholds::default(),
        }
    }
}

/// Per-detector outputs for one vector, each in [0, 1]
#[derive(Debug, Clone)]
pub struct DetectorScores {
    pub autoencoder: f32,
    pub isolation_forest: f32,
    pub knn: f32,
    pub reconstruction: ReconstructionScore,
}

/// Stateless combiner over a published bundle
#[derive(Debug, Clone, Default)]
pub struct EnsembleScorer {
    config: EnsembleConfig,
}

impl EnsembleScorer {
    pub fn new(config: EnsembleConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EnsembleConfig {
        &self.config
    }

    /// Run every detector of `bundle` against one raw vector
    pub fn detector_scores(&self, bundle: &ModelBundle, vector: &FeatureVector) -> DetectorScores {
        let normalized = bundle.normalization().normalize(vector);

        let reconstruction = bundle
            .autoencoder()
            .reconstruction(&normalized)
            .unwrap_or(ReconstructionScore {
                mse: 0.0,
                per_feature_error: [0.0; NUM_FEATURES],
            });

        DetectorScores {
            autoencoder: (reconstruction.mse * self.config.reconstruction_gain).min(1.0),
            isolation_forest: bundle.isolation_forest().score(vector),
            knn: bundle.knn().score(&normalized),
            reconstruction,
        }
    }

    /// Weighted probability in [0, 1]
    pub fn combine(&self, autoencoder: f32, isolation_forest: f32, knn: f32) -> f32 {
        let w = &self.config.weights;
        w.autoencoder * autoencoder + w.isolation_forest * isolation_forest + w.knn * knn
    }

    /// Floor to integer percent, then dampen old objects
    pub fn risk_score(&self, probability: f32, age_years: f32) -> f32 {
        let mut risk = (probability * 100.0).floor().clamp(0.0, 100.0);
        if age_years > self.config.age_dampening_years {
            risk *= self.config.age_dampening_factor;
        }
        risk
    }

    /// Score one raw feature vector against `bundle`
    pub fn score_features(
        &self,
        bundle: &ModelBundle,
        vector: &FeatureVector,
        object_name: &str,
    ) -> AnomalyResult {
        let scores = self.detector_scores(bundle, vector);
        let probability = self.combine(scores.autoencoder, scores.isolation_forest, scores.knn);

        let age_years = vector.age_years();
        let risk_score = self.risk_score(probability, age_years);
        let risk_level = self.config.thresholds.classify(risk_score);

        let cause = CauseAttribution::for_feature(scores.reconstruction.dominant_feature(AGE_FEATURE));
        let assessment = format!(
            "Tri-Model Consensus: AE({}%) / IF({}%) / kNN({}%). Primary Factor: {}.",
            percent(scores.autoencoder),
            percent(scores.isolation_forest),
            percent(scores.knn),
            cause.feature,
        );

        AnomalyResult {
            catalog_number: vector.catalog_number,
            object_name: object_name.to_string(),
            risk_score,
            risk_level,
            components: ComponentScores::from_unit(
                scores.autoencoder,
                scores.isolation_forest,
                scores.knn,
            ),
            cause,
            assessment,
            age_years,
            model_generation: bundle.generation(),
        }
    }
}

/// Rounded percent for the assessment text
fn percent(unit: f32) -> i32 {
    (unit * 100.0).round() as i32
}
