//! CLI configuration.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use gait_core::features::ExtractionConfig;
use gait_core::normalize::DEFAULT_MIN_FRAMES;
use gait_emotion::RuleSet;
use serde::{Deserialize, Serialize};

/// Environment variable prefix, e.g. `GAIT_MODEL__PATH`
pub const ENV_PREFIX: &str = "GAIT";

/// Complete CLI configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaitConfig {
    /// Persisted model artifact
    pub model: ModelConfig,

    /// Feature extraction settings
    pub extraction: ExtractionSettings,

    /// Logging configuration
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the JSON artifact; unset means rule-based only
    pub path: Option<PathBuf>,

    /// JSON rule table replacing the built-in fallback thresholds
    pub rules: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionSettings {
    /// Minimum frame count after padding
    pub min_frames: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when no verbosity flag is given
    pub level: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: Some(PathBuf::from("models/emotion_model.json")),
            rules: None,
        }
    }
}

impl ModelConfig {
    /// Read the configured rule table, if any
    pub fn load_rules(&self) -> anyhow::Result<Option<RuleSet>> {
        let Some(path) = &self.rules else {
            return Ok(None);
        };

        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read rule table {}", path.display()))?;
        let rules = serde_json::from_str(&json)
            .with_context(|| format!("Failed to decode rule table {}", path.display()))?;
        Ok(Some(rules))
    }
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            min_frames: DEFAULT_MIN_FRAMES,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl GaitConfig {
    /// Load configuration from file, then environment overrides
    pub fn from_file(path: &Path) -> Result<Self, config::ConfigError> {
        Self::load(Some(path))
    }

    /// Load from environment variables
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::load(None)
    }

    fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&Self::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    pub fn extraction_config(&self) -> ExtractionConfig {
        ExtractionConfig {
            min_frames: self.extraction.min_frames,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = GaitConfig::default();
        assert_eq!(
            config.model.path.as_deref(),
            Some(Path::new("models/emotion_model.json"))
        );
        assert_eq!(config.model.rules, None);
        assert!(config.model.load_rules().unwrap().is_none());
        assert_eq!(config.extraction.min_frames, 4);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[model]\npath = \"/opt/gait/model.json\"\n\n[extraction]\nmin_frames = 6").unwrap();
        file.flush().unwrap();

        let config = GaitConfig::from_file(file.path()).unwrap();
        assert_eq!(
            config.model.path.as_deref(),
            Some(Path::new("/opt/gait/model.json"))
        );
        assert_eq!(config.extraction.min_frames, 6);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.extraction_config().min_frames, 6);
    }

    #[test]
    fn test_custom_rule_table() {
        let mut rules = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        let table = RuleSet {
            neutral: gait_emotion::EmotionRules {
                base: 2.0,
                rules: Vec::new(),
            },
            ..RuleSet::default()
        };
        serde_json::to_writer(&mut rules, &table).unwrap();
        rules.flush().unwrap();

        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[model]\nrules = \"{}\"", rules.path().display()).unwrap();
        file.flush().unwrap();

        let config = GaitConfig::from_file(file.path()).unwrap();
        assert_eq!(config.model.rules.as_deref(), Some(rules.path()));
        let loaded = config.model.load_rules().unwrap().unwrap();
        assert_eq!(loaded.neutral.base, 2.0);
        assert_eq!(loaded.happy.rules.len(), table.happy.rules.len());

        let broken = ModelConfig {
            path: None,
            rules: Some(PathBuf::from("/nonexistent/rules.json")),
        };
        assert!(broken.load_rules().is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(GaitConfig::from_file(Path::new("/nonexistent/gait.toml")).is_err());
    }
}
