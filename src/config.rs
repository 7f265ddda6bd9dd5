use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::ml::MlConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ml: MlConfig,
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))
    }

    /// Parse configuration from a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Load config from default locations or fall back to defaults
    pub fn load_or_default() -> Result<Self> {
        let paths = [
            PathBuf::from("/etc/orbitwatch/config.toml"),
            PathBuf::from("orbitwatch.toml"),
        ];

        for path in &paths {
            if path.exists() {
                return Self::load(path);
            }
        }

        Ok(Self::default())
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.ml.features.verify_checksum);
        assert_eq!(config.ml.isolation_forest.num_trees, 100);
        assert_eq!(config.ml.isolation_forest.sample_size, 256);
        assert_eq!(config.ml.knn.k, 5);
        assert_eq!(config.ml.autoencoder.epochs, 30);
        assert_eq!(config.ml.ensemble.thresholds.critical, 90.0);
        assert!(config.ml.seed.is_none());
    }

    #[test]
    fn test_partial_config() {
        let config = Config::from_toml_str(
            r#"
            [ml]
            seed = 7

            [ml.knn]
            k = 3

            [ml.ensemble.weights]
            autoencoder = 0.5
            "#,
        )
        .unwrap();

        assert_eq!(config.ml.seed, Some(7));
        assert_eq!(config.ml.knn.k, 3);
        assert_eq!(config.ml.knn.max_reference_points, 500);
        assert_eq!(config.ml.ensemble.weights.autoencoder, 0.5);
        assert_eq!(config.ml.ensemble.weights.knn, 0.3);
        assert_eq!(config.ml.autoencoder.hidden_dims, vec![14, 8]);
    }

    #[test]
    fn test_empty_document_is_default() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.ml.autoencoder.latent_dim, 3);
    }

    #[test]
    fn test_config_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orbitwatch.toml");

        let mut config = Config::default();
        config.ml.seed = Some(42);
        config.ml.features.verify_checksum = false;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.ml.seed, Some(42));
        assert!(!loaded.ml.features.verify_checksum);
        assert_eq!(loaded.ml.ensemble.weights.autoencoder, 0.4);
        assert_eq!(loaded.ml.autoencoder.learning_rate, 0.01);
    }

    #[test]
    fn test_load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");

        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("missing.toml"));

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "[ml\nseed = ").unwrap();
        let err = Config::load(&bad).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
