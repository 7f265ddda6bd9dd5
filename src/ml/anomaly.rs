//! Risk scoring output and cause attribution

use std::fmt;

use serde::{Deserialize, Serialize};

use super::features::FEATURE_NAMES;

/// Ordered risk levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Informational,
    Low,
    Moderate,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Informational => "Informational",
            RiskLevel::Low => "Low",
            RiskLevel::Moderate => "Moderate",
            RiskLevel::High => "High",
            RiskLevel::Critical => "Critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exclusive lower bounds for each level
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    pub critical: f32,
    pub high: f32,
    pub moderate: f32,
    pub low: f32,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            critical: 90.0,
            high: 70.0,
            moderate: 45.0,
            low: 25.0,
        }
    }
}

impl RiskThresholds {
    /// Map a 0-100 risk score to a level. A score equal to a bound falls in
    /// the level below it.
    pub fn classify(&self, risk_score: f32) -> RiskLevel {
        if risk_score > self.critical {
            RiskLevel::Critical
        } else if risk_score > self.high {
            RiskLevel::High
        } else if risk_score > self.moderate {
            RiskLevel::Moderate
        } else if risk_score > self.low {
            RiskLevel::Low
        } else {
            RiskLevel::Informational
        }
    }
}

/// Per-detector scores, floored to integer percent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ComponentScores {
    pub autoencoder: u8,
    pub isolation_forest: u8,
    pub knn: u8,
}

impl ComponentScores {
    /// Convert [0,1] detector outputs to percent
    pub fn from_unit(autoencoder: f32, isolation_forest: f32, knn: f32) -> Self {
        let pct = |v: f32| (v.clamp(0.0, 1.0) * 100.0).floor() as u8;
        Self {
            autoencoder: pct(autoencoder),
            isolation_forest: pct(isolation_forest),
            knn: pct(knn),
        }
    }
}

/// Cause mapped from the dominant deviating feature
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CauseAttribution {
    /// Name of the feature with the largest reconstruction error
    pub feature: &'static str,
    /// Adversary technique tag
    pub technique: &'static str,
    /// Space-threat framework classification tag
    pub classification: &'static str,
    /// Short description
    pub description: String,
}

impl CauseAttribution {
    /// Fixed lookup from feature index to cause
    pub fn for_feature(index: usize) -> Self {
        let feature = FEATURE_NAMES.get(index).copied().unwrap_or("Unknown");
        let (technique, classification, description) = match index {
            0 => (
                "T1584.006 - Spacecraft Maneuver",
                "IMP-0003: Orbit Modification",
                "UNANNOUNCED PLANE CHANGE (Inclination).".to_string(),
            ),
            1 => (
                "T1584.005 - Re-positioning",
                "IMP-0001: Loss of Positive Control",
                "ORBITAL DECAY/INSTABILITY (Eccentricity).".to_string(),
            ),
            2 => (
                "T1584.006 - Spacecraft Maneuver",
                "EX-0001: Maneuver",
                "UNSCHEDULED DELTA-V BURN (Mean Motion).".to_string(),
            ),
            3 => (
                "T1559 - Link Manipulation",
                "REC-0002: RPO",
                "NODAL DRIFT (RAAN).".to_string(),
            ),
            _ => (
                "T1584 - Compromise Infrastructure",
                "REC-0001: Monitor Satellite Telemetry",
                format!("Ensemble detection: {} deviation.", feature),
            ),
        };

        Self {
            feature,
            technique,
            classification,
            description,
        }
    }
}

/// Scoring result for one object
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyResult {
    pub catalog_number: u32,
    pub object_name: String,
    /// 0-100; may be fractional after age dampening
    pub risk_score: f32,
    pub risk_level: RiskLevel,
    pub components: ComponentScores,
    pub cause: CauseAttribution,
    /// Human-readable consensus summary
    pub assessment: String,
    pub age_years: f32,
    /// Generation of the bundle that produced this result
    pub model_generation: u64,
}

impl AnomalyResult {
    /// Risk score floored for display
    pub fn display_score(&self) -> u32 {
        self.risk_score.floor() as u32
    }

    pub fn is_at_least(&self, level: RiskLevel) -> bool {
        self.risk_level >= level
    }
}
