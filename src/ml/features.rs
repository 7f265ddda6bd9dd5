//! Feature extraction from orbital element sets
//!
//! Produces the fixed 7-dimensional vector every detector consumes.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::elements::OrbitalElements;
use crate::error::{AnomalyError, Result};
use crate::models::OrbitalRecord;

/// Number of features extracted
pub const NUM_FEATURES: usize = 7;

/// Index of the age feature (excluded from attribution)
pub const AGE_FEATURE: usize = 6;

/// Feature names, in vector order
pub const FEATURE_NAMES: [&str; NUM_FEATURES] = [
    "Inclination",
    "Eccentricity",
    "Mean Motion",
    "RAAN",
    "Arg Perigee",
    "Mean Anomaly",
    "Orbital Age",
];

/// Extracted feature vector for one object
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Feature values
    pub features: [f32; NUM_FEATURES],
    /// Catalog number of the source object
    pub catalog_number: u32,
}

impl FeatureVector {
    /// Build from raw values
    pub fn new(catalog_number: u32, features: [f32; NUM_FEATURES]) -> Self {
        Self {
            features,
            catalog_number,
        }
    }

    /// Get feature by name
    pub fn get(&self, name: &str) -> Option<f32> {
        FEATURE_NAMES
            .iter()
            .position(|&n| n == name)
            .map(|idx| self.features[idx])
    }

    /// Age in years
    pub fn age_years(&self) -> f32 {
        self.features[AGE_FEATURE]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.features
    }
}

/// Feature extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Reject element sets whose line checksums do not match
    pub verify_checksum: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            verify_checksum: true,
        }
    }
}

/// Records that survived extraction, plus the ones that did not
#[derive(Debug, Default)]
pub struct BatchExtraction {
    pub vectors: Vec<FeatureVector>,
    /// (index into the input batch, error)
    pub rejected: Vec<(usize, AnomalyError)>,
}

/// Converts orbital records into feature vectors
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    config: FeatureConfig,
}

impl FeatureExtractor {
    pub fn new(config: FeatureConfig) -> Self {
        Self { config }
    }

    /// Extract features for one record. Age is relative to `now`.
    pub fn extract(&self, record: &OrbitalRecord, now: DateTime<Utc>) -> Result<FeatureVector> {
        let elements =
            OrbitalElements::from_tle(&record.line1, &record.line2, self.config.verify_checksum)
                .map_err(|reason| AnomalyError::invalid(record.catalog_number(), reason))?;

        let launch_year = record
            .launch_date
            .map(|d| d.year())
            .or(elements.launch_year)
            .unwrap_or(elements.epoch_year);
        let age_years = (now.year() - launch_year).max(0);

        Ok(FeatureVector {
            features: [
                elements.inclination as f32,
                elements.eccentricity as f32,
                elements.mean_motion as f32,
                elements.raan as f32,
                elements.arg_perigee as f32,
                elements.mean_anomaly as f32,
                age_years as f32,
            ],
            catalog_number: elements.catalog_number,
        })
    }

    /// Extract a batch, dropping records that fail to decode
    pub fn extract_batch(&self, records: &[OrbitalRecord], now: DateTime<Utc>) -> BatchExtraction {
        let mut batch = BatchExtraction {
            vectors: Vec::with_capacity(records.len()),
            rejected: Vec::new(),
        };

        for (idx, record) in records.iter().enumerate() {
            match self.extract(record, now) {
                Ok(vector) => batch.vectors.push(vector),
                Err(e) => {
                    debug!("Skipping record {} ({}): {}", idx, record.name, e);
                    batch.rejected.push((idx, e));
                }
            }
        }

        batch
    }
}
