//! Unsupervised anomaly detection for catalogued orbital objects.
//!
//! Element sets are turned into seven-feature vectors, scored by an
//! autoencoder, an isolation forest and a kNN density detector, and combined
//! into a 0-100 risk score. Models are retrained in the background and
//! published with an atomic swap; see [`ml::ModelLifecycleManager`].

pub mod config;
pub mod error;
pub mod ml;
pub mod models;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::Config;
pub use error::{AnomalyError, ElementSetError, Result};
pub use ml::{
    AnomalyResult, LifecycleState, MlConfig, ModelLifecycleManager, ModelStatus, ProgressCallback,
    RiskLevel, TrainingReport,
};
pub use models::OrbitalRecord;
