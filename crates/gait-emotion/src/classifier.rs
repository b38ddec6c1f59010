//! Emotion classifiers and the fallback-aware model handle.

use std::path::Path;

use gait_core::features::FeatureVector;

use crate::artifact::ModelArtifact;
use crate::emotion::Prediction;
use crate::rules::{RuleBasedClassifier, RuleSet};

/// Common interface for prediction strategies
pub trait EmotionClassifier: Send + Sync {
    /// Strategy name/identifier
    fn name(&self) -> &str;

    /// Predict an emotion; never fails once features are well-formed
    fn predict(&self, features: &FeatureVector) -> Prediction;
}

impl EmotionClassifier for RuleBasedClassifier {
    fn name(&self) -> &str {
        "rule_based"
    }

    fn predict(&self, features: &FeatureVector) -> Prediction {
        RuleBasedClassifier::predict(self, features)
    }
}

/// Loaded artifact plus the rule-based fallback.
///
/// Built once and shared read-only. If the artifact is absent the handle stays
/// on the rule-based path for its whole lifetime; if a model call fails, only
/// that call is degraded.
#[derive(Debug, Clone)]
pub struct EmotionModel {
    artifact: ModelArtifact,
    rules: RuleBasedClassifier,
}

impl EmotionModel {
    /// Load the artifact at `path`; a missing or unusable file selects fallback
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::from_artifact(ModelArtifact::load(Some(path.as_ref())))
    }

    /// Handle with no model at all
    pub fn rule_based() -> Self {
        Self::from_artifact(ModelArtifact::absent("rule-based only"))
    }

    pub fn from_artifact(artifact: ModelArtifact) -> Self {
        Self {
            artifact,
            rules: RuleBasedClassifier::default(),
        }
    }

    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = RuleBasedClassifier::new(rules);
        self
    }

    /// Whether this handle permanently uses the rule-based strategy
    pub fn use_fallback(&self) -> bool {
        self.artifact.is_fallback()
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    pub fn classify(&self, features: &FeatureVector) -> Prediction {
        if self.use_fallback() {
            return self.rules.predict(features);
        }

        match self.artifact.predict(features) {
            Ok(prediction) => prediction,
            Err(e) => {
                tracing::warn!("Model prediction failed: {}. Using rule-based prediction", e);
                self.rules.predict(features)
            }
        }
    }
}

impl EmotionClassifier for EmotionModel {
    fn name(&self) -> &str {
        if self.use_fallback() {
            "rule_based"
        } else {
            "model"
        }
    }

    fn predict(&self, features: &FeatureVector) -> Prediction {
        self.classify(features)
    }
}
