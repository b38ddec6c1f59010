//! Persisted model artifacts.
//!
//! A JSON artifact on disk is one of two shapes:
//!
//! 1. **Bundle** - `{model, scaler, label_encoder, classes, feature_dim?}`;
//!    any of `model`, `scaler` or `label_encoder` marks a bundle, and then
//!    all four required keys must be present and non-null
//! 2. **Bare** - a single estimator object tagged by `kind`
//!
//! Anything else, including a missing file, resolves to [`ModelArtifact::Absent`]
//! once at load time. The artifact is immutable afterward.

use std::fs;
use std::path::Path;

use gait_core::features::{FeatureVector, FEATURE_COUNT};
use serde::{Deserialize, Serialize};

use crate::emotion::{Prediction, Strategy};
use crate::error::{ClassificationError, ClassificationResult, ModelLoadError};
use crate::estimator::{first_duplicate, Estimator};

/// Keys that mark a bundle; `classes` is shared with bare estimators
const BUNDLE_KEYS: [&str; 3] = ["model", "scaler", "label_encoder"];

/// Per-feature standardization, `(x - mean) / scale`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn transform(&self, x: &[f64]) -> ClassificationResult<Vec<f64>> {
        if x.len() != self.mean.len() || x.len() != self.scale.len() {
            return Err(ClassificationError::DimensionMismatch {
                expected: self.mean.len(),
                actual: x.len(),
            });
        }

        Ok(x.iter()
            .zip(&self.mean)
            .zip(&self.scale)
            .map(|((v, m), s)| {
                // Constant features were fitted with zero scale
                let s = if *s == 0.0 { 1.0 } else { *s };
                (v - m) / s
            })
            .collect())
    }

    fn validate(&self, n_features: usize) -> Result<(), ModelLoadError> {
        if self.mean.len() != n_features || self.scale.len() != n_features {
            return Err(ModelLoadError::InvalidBundle(format!(
                "scaler has {}/{} entries, expected {}",
                self.mean.len(),
                self.scale.len(),
                n_features
            )));
        }
        if self.mean.iter().chain(&self.scale).any(|v| !v.is_finite()) {
            return Err(ModelLoadError::InvalidBundle(
                "scaler is not finite".to_string(),
            ));
        }
        Ok(())
    }
}

/// Maps native estimator labels (class indices) to class names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelEncoder {
    pub classes: Vec<String>,
}

impl LabelEncoder {
    pub fn decode(&self, native: &str) -> ClassificationResult<&str> {
        native
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|i| self.classes.get(i))
            .map(String::as_str)
            .ok_or_else(|| ClassificationError::UnknownLabel(native.to_string()))
    }
}

fn default_feature_dim() -> usize {
    FEATURE_COUNT
}

/// Estimator with its preprocessing and label decoding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelBundle {
    pub model: Estimator,
    pub scaler: StandardScaler,
    pub label_encoder: LabelEncoder,
    pub classes: Vec<String>,
    #[serde(default = "default_feature_dim")]
    pub feature_dim: usize,
}

/// Bundle as written on disk; every key optional so a missing one can be named
#[derive(Deserialize)]
struct RawBundle {
    model: Option<Estimator>,
    scaler: Option<StandardScaler>,
    label_encoder: Option<LabelEncoder>,
    classes: Option<Vec<String>>,
    feature_dim: Option<usize>,
}

fn required<T>(value: Option<T>, key: &str) -> Result<T, ModelLoadError> {
    value.ok_or_else(|| ModelLoadError::InvalidBundle(format!("missing `{}`", key)))
}

impl TryFrom<RawBundle> for ModelBundle {
    type Error = ModelLoadError;

    fn try_from(raw: RawBundle) -> Result<Self, Self::Error> {
        Ok(Self {
            model: required(raw.model, "model")?,
            scaler: required(raw.scaler, "scaler")?,
            label_encoder: required(raw.label_encoder, "label_encoder")?,
            classes: required(raw.classes, "classes")?,
            feature_dim: raw.feature_dim.unwrap_or(FEATURE_COUNT),
        })
    }
}

impl ModelBundle {
    pub fn validate(&self) -> Result<(), ModelLoadError> {
        if self.feature_dim != FEATURE_COUNT {
            return Err(ModelLoadError::InvalidBundle(format!(
                "bundle expects {} features, extractor produces {}",
                self.feature_dim, FEATURE_COUNT
            )));
        }
        if self.classes.is_empty() {
            return Err(ModelLoadError::InvalidBundle("no classes".to_string()));
        }
        for (what, list) in [
            ("class list", &self.classes),
            ("label encoder", &self.label_encoder.classes),
        ] {
            if let Some(class) = first_duplicate(list.as_slice()) {
                return Err(ModelLoadError::InvalidBundle(format!(
                    "{} repeats class {}",
                    what, class
                )));
            }
        }

        self.model.validate(self.feature_dim)?;
        self.scaler.validate(self.feature_dim)?;

        for native in self.model.classes() {
            let name = self
                .label_encoder
                .decode(native)
                .map_err(|e| ModelLoadError::InvalidBundle(e.to_string()))?;
            if !self.classes.iter().any(|c| c == name) {
                return Err(ModelLoadError::InvalidBundle(format!(
                    "encoder class {} is not in the class list",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Scale, estimate, decode; distribution covers every bundle class
    pub fn predict(&self, features: &FeatureVector) -> ClassificationResult<Prediction> {
        if features.len() != self.feature_dim {
            return Err(ClassificationError::DimensionMismatch {
                expected: self.feature_dim,
                actual: features.len(),
            });
        }

        let scaled = self.scaler.transform(features.as_slice())?;
        let native_classes = self.model.classes();
        let native = self
            .model
            .estimate(&scaled)?
            .into_distribution(native_classes.len());

        let mut distribution: Vec<(String, f64)> =
            self.classes.iter().map(|c| (c.clone(), 0.0)).collect();
        let mut best: Option<(&str, f64)> = None;

        for (label, p) in native_classes.iter().zip(native) {
            let name = self.label_encoder.decode(label)?;
            let slot = distribution
                .iter_mut()
                .find(|(c, _)| c == name)
                .ok_or_else(|| ClassificationError::UnknownLabel(name.to_string()))?;
            slot.1 += p;
            if best.map_or(true, |(_, top)| p > top) {
                best = Some((name, p));
            }
        }

        let (emotion, confidence) = best
            .ok_or_else(|| ClassificationError::MalformedModel("no classes".to_string()))?;
        finish(emotion, confidence, distribution)
    }
}

/// Estimator used directly on raw features with its native labels
fn predict_bare(estimator: &Estimator, features: &FeatureVector) -> ClassificationResult<Prediction> {
    let classes = estimator.classes();
    let distribution: Vec<(String, f64)> = classes
        .iter()
        .cloned()
        .zip(
            estimator
                .estimate(features.as_slice())?
                .into_distribution(classes.len()),
        )
        .collect();

    let prediction = Prediction::from_distribution(distribution, Strategy::Model)
        .ok_or_else(|| ClassificationError::MalformedModel("no classes".to_string()))?;
    check_finite(&prediction)?;
    Ok(prediction)
}

fn finish(
    emotion: &str,
    confidence: f64,
    distribution: Vec<(String, f64)>,
) -> ClassificationResult<Prediction> {
    let prediction = Prediction {
        emotion: emotion.to_string(),
        confidence,
        probabilities: distribution.into_iter().collect(),
        strategy: Strategy::Model,
    };
    check_finite(&prediction)?;
    Ok(prediction)
}

fn check_finite(prediction: &Prediction) -> ClassificationResult<()> {
    let finite = prediction.confidence.is_finite()
        && prediction.probabilities.values().all(|p| p.is_finite());
    if finite {
        Ok(())
    } else {
        Err(ClassificationError::NonFinite("model output".to_string()))
    }
}

/// Loaded model state, resolved once
#[derive(Debug, Clone, PartialEq)]
pub enum ModelArtifact {
    Bundle(ModelBundle),
    Bare(Estimator),
    Absent { reason: String },
}

impl ModelArtifact {
    /// Load an artifact, resolving every failure to [`ModelArtifact::Absent`].
    ///
    /// Logs exactly once: `info` on success, `warn` with the cause otherwise.
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            tracing::warn!("No model path configured, using rule-based prediction");
            return Self::absent("no model path configured");
        };

        match Self::try_load(path) {
            Ok(artifact) => {
                tracing::info!(
                    "Loaded {} model from {}",
                    artifact.kind(),
                    path.display()
                );
                artifact
            }
            Err(e) => {
                tracing::warn!("{}. Using rule-based prediction", e);
                Self::absent(e.to_string())
            }
        }
    }

    /// Load and validate an artifact; never returns `Absent`
    pub fn try_load(path: &Path) -> Result<Self, ModelLoadError> {
        if !path.exists() {
            return Err(ModelLoadError::NotFound(path.to_path_buf()));
        }
        let json = fs::read_to_string(path).map_err(|source| ModelLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self, ModelLoadError> {
        let value: serde_json::Value = serde_json::from_str(json)?;

        let is_bundle = value
            .as_object()
            .map_or(false, |obj| BUNDLE_KEYS.iter().any(|k| obj.contains_key(*k)));

        if is_bundle {
            let raw: RawBundle = serde_json::from_value(value)?;
            let bundle = ModelBundle::try_from(raw)?;
            bundle.validate()?;
            Ok(ModelArtifact::Bundle(bundle))
        } else {
            let estimator: Estimator = serde_json::from_value(value)?;
            estimator.validate(FEATURE_COUNT)?;
            Ok(ModelArtifact::Bare(estimator))
        }
    }

    pub fn absent(reason: impl Into<String>) -> Self {
        ModelArtifact::Absent {
            reason: reason.into(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, ModelArtifact::Absent { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ModelArtifact::Bundle(_) => "bundle",
            ModelArtifact::Bare(_) => "bare",
            ModelArtifact::Absent { .. } => "absent",
        }
    }

    /// Model-based prediction; `Absent` is an error the caller degrades from
    pub fn predict(&self, features: &FeatureVector) -> ClassificationResult<Prediction> {
        match self {
            ModelArtifact::Bundle(bundle) => bundle.predict(features),
            ModelArtifact::Bare(estimator) => predict_bare(estimator, features),
            ModelArtifact::Absent { reason } => {
                Err(ClassificationError::MalformedModel(reason.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::{NearestCentroid, RandomForest, DecisionTree, TreeNode};

    fn centroid_estimator(classes: &[&str]) -> Estimator {
        Estimator::NearestCentroid(NearestCentroid {
            classes: classes.iter().map(|c| c.to_string()).collect(),
            centroids: (0..classes.len())
                .map(|i| vec![i as f64; FEATURE_COUNT])
                .collect(),
        })
    }

    fn forest_bundle() -> ModelBundle {
        // One stump on scaled mean speed: slow -> class 1, fast -> class 0
        ModelBundle {
            model: Estimator::RandomForest(RandomForest {
                classes: vec!["0".to_string(), "1".to_string()],
                trees: vec![DecisionTree {
                    nodes: vec![
                        TreeNode::Split {
                            feature: 0,
                            threshold: 0.0,
                            left: 1,
                            right: 2,
                        },
                        TreeNode::Leaf {
                            value: vec![1.0, 9.0],
                        },
                        TreeNode::Leaf {
                            value: vec![8.0, 2.0],
                        },
                    ],
                }],
            }),
            scaler: StandardScaler {
                mean: vec![1.5; FEATURE_COUNT],
                scale: vec![0.0; FEATURE_COUNT],
            },
            label_encoder: LabelEncoder {
                classes: vec!["Happy".to_string(), "Sad".to_string()],
            },
            classes: vec![
                "Happy".to_string(),
                "Sad".to_string(),
                "Neutral".to_string(),
            ],
            feature_dim: FEATURE_COUNT,
        }
    }

    #[test]
    fn test_scaler_zero_scale() {
        let scaler = StandardScaler {
            mean: vec![1.0, 2.0],
            scale: vec![0.0, 2.0],
        };
        assert_eq!(scaler.transform(&[3.0, 6.0]).unwrap(), vec![2.0, 2.0]);
        assert!(scaler.transform(&[1.0]).is_err());
    }

    #[test]
    fn test_label_encoder() {
        let encoder = LabelEncoder {
            classes: vec!["Happy".to_string(), "Sad".to_string()],
        };
        assert_eq!(encoder.decode("1").unwrap(), "Sad");
        assert!(matches!(
            encoder.decode("2"),
            Err(ClassificationError::UnknownLabel(_))
        ));
        assert!(encoder.decode("Sad").is_err());
    }

    #[test]
    fn test_bundle_prediction_covers_all_classes() {
        let bundle = forest_bundle();
        bundle.validate().unwrap();

        // Mean speed 1.0 scales below zero: left leaf
        let prediction = bundle.predict(&FeatureVector::neutral_default()).unwrap();
        assert_eq!(prediction.emotion, "Sad");
        assert!((prediction.confidence - 0.9).abs() < 1e-12);
        assert_eq!(prediction.probabilities.len(), 3);
        assert_eq!(prediction.probabilities["Neutral"], 0.0);
        assert!((prediction.total_probability() - 1.0).abs() < 1e-12);
        assert_eq!(prediction.strategy, Strategy::Model);
    }

    #[test]
    fn test_bundle_rejects_mismatched_scaler() {
        let mut bundle = forest_bundle();
        bundle.scaler.mean.pop();
        assert!(matches!(
            bundle.validate(),
            Err(ModelLoadError::InvalidBundle(_))
        ));
    }

    #[test]
    fn test_bundle_rejects_unknown_encoder_class() {
        let mut bundle = forest_bundle();
        bundle.classes = vec!["Happy".to_string()];
        assert!(bundle.validate().is_err());
    }

    #[test]
    fn test_bundle_rejects_repeated_classes() {
        let mut bundle = forest_bundle();
        bundle.label_encoder.classes = vec!["Sad".to_string(), "Sad".to_string()];
        match bundle.validate() {
            Err(ModelLoadError::InvalidBundle(msg)) => assert!(msg.contains("label encoder")),
            other => panic!("expected invalid bundle, got {:?}", other),
        }

        let mut bundle = forest_bundle();
        bundle.classes.push("Happy".to_string());
        assert!(matches!(
            bundle.validate(),
            Err(ModelLoadError::InvalidBundle(_))
        ));

        let mut bundle = forest_bundle();
        if let Estimator::RandomForest(forest) = &mut bundle.model {
            forest.classes[1] = "0".to_string();
        }
        assert!(matches!(
            bundle.validate(),
            Err(ModelLoadError::InvalidModel(_))
        ));
    }

    #[test]
    fn test_bare_estimator_json_is_not_a_bundle() {
        let centroids = r#"{"kind": "nearest_centroid", "classes": ["Angry", "Neutral"],
            "centroids": [[3.0, 3.0, 3.0, 3.0, 3.0, 3.0, 3.0, 3.0, 3.0, 3.0, 3.0, 3.0, 3.0, 3.0],
                          [0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5]]}"#;
        let artifact = ModelArtifact::from_json(centroids).unwrap();
        assert_eq!(artifact.kind(), "bare");
        assert_eq!(
            artifact.predict(&FeatureVector::neutral_default()).unwrap().emotion,
            "Neutral"
        );

        let forest = serde_json::to_string(&forest_bundle().model).unwrap();
        assert!(matches!(
            ModelArtifact::from_json(&forest).unwrap(),
            ModelArtifact::Bare(Estimator::RandomForest(_))
        ));
    }

    #[test]
    fn test_bare_label_is_one_hot() {
        let estimator = centroid_estimator(&["Calm", "Tense"]);
        let artifact = ModelArtifact::Bare(estimator);

        let prediction = artifact.predict(&FeatureVector::neutral_default()).unwrap();
        assert_eq!(prediction.confidence, 1.0);
        assert_eq!(prediction.probabilities[&prediction.emotion], 1.0);
        assert_eq!(prediction.probabilities.values().sum::<f64>(), 1.0);
    }

    #[test]
    fn test_from_json_shapes() {
        let bundle = serde_json::to_string(&forest_bundle()).unwrap();
        assert_eq!(ModelArtifact::from_json(&bundle).unwrap().kind(), "bundle");

        let bare = serde_json::to_string(&centroid_estimator(&["Happy", "Sad"])).unwrap();
        assert_eq!(ModelArtifact::from_json(&bare).unwrap().kind(), "bare");

        // One bundle key is enough to require all of them
        let partial = r#"{"model": {"kind": "nearest_centroid", "classes": [], "centroids": []}, "classes": ["Happy"]}"#;
        match ModelArtifact::from_json(partial) {
            Err(ModelLoadError::InvalidBundle(msg)) => assert!(msg.contains("scaler")),
            other => panic!("expected invalid bundle, got {:?}", other),
        }

        assert!(matches!(
            ModelArtifact::from_json("not json"),
            Err(ModelLoadError::Json(_))
        ));
        assert!(matches!(
            ModelArtifact::from_json(r#"{"kind": "svm"}"#),
            Err(ModelLoadError::Json(_))
        ));
    }

    #[test]
    fn test_absent_artifact() {
        let artifact = ModelArtifact::load(None);
        assert!(artifact.is_fallback());
        assert!(artifact.predict(&FeatureVector::neutral_default()).is_err());
    }
}
