//! Confidence tiers and display filtering for predictions.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

use crate::emotion::{Prediction, Strategy};

/// Confidence at or above this is `high`
pub const HIGH_CONFIDENCE: f64 = 0.5;
/// Confidence at or above this (and below high) is `medium`
pub const MEDIUM_CONFIDENCE: f64 = 0.3;
/// Categories below this probability are not displayed
pub const LOW_PROBABILITY: f64 = 0.05;
/// Top-two gap below this marks the result ambiguous
pub const MIN_TOP_GAP: f64 = 0.2;
/// Decimal places kept in displayed numbers
pub const DISPLAY_DECIMALS: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= HIGH_CONFIDENCE {
            ConfidenceLevel::High
        } else if confidence >= MEDIUM_CONFIDENCE {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }
}

/// Caveat attached to a displayed result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultWarning {
    LowConfidence,
    Ambiguous,
}

impl ResultWarning {
    pub fn message(&self) -> &'static str {
        match self {
            ResultWarning::LowConfidence => {
                "Prediction confidence is low. Providing more frames improves accuracy."
            }
            ResultWarning::Ambiguous => {
                "Several emotions have similar probabilities. The result may be uncertain."
            }
        }
    }
}

impl fmt::Display for ResultWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl Serialize for ResultWarning {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.message())
    }
}

/// Prediction prepared for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotatedPrediction {
    pub emotion: String,
    pub confidence: f64,
    pub confidence_level: ConfidenceLevel,
    /// Categories at or above [`LOW_PROBABILITY`]
    pub probabilities: BTreeMap<String, f64>,
    pub strategy: Strategy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<ResultWarning>,
}

fn round_display(value: f64) -> f64 {
    let factor = 10f64.powi(DISPLAY_DECIMALS);
    (value * factor).round() / factor
}

/// Attach a confidence tier, drop negligible categories, and flag weak results.
///
/// Filtering only affects the displayed distribution; the label and stated
/// confidence are unchanged. When a result is both low-confidence and
/// ambiguous, the ambiguity warning is reported.
pub fn annotate(prediction: &Prediction) -> AnnotatedPrediction {
    let confidence_level = ConfidenceLevel::from_confidence(prediction.confidence);

    let kept: Vec<f64> = prediction
        .ranked()
        .into_iter()
        .map(|(_, p)| p)
        .filter(|p| *p >= LOW_PROBABILITY)
        .collect();

    let ambiguous = kept.len() >= 2 && kept[0] - kept[1] < MIN_TOP_GAP;

    let warning = if ambiguous {
        Some(ResultWarning::Ambiguous)
    } else if confidence_level == ConfidenceLevel::Low {
        Some(ResultWarning::LowConfidence)
    } else {
        None
    };

    if let Some(w) = warning {
        tracing::debug!(emotion = %prediction.emotion, "{:?} result", w);
    }

    AnnotatedPrediction {
        emotion: prediction.emotion.clone(),
        confidence: round_display(prediction.confidence),
        confidence_level,
        probabilities: prediction
            .probabilities
            .iter()
            .filter(|(_, p)| **p >= LOW_PROBABILITY)
            .map(|(label, p)| (label.clone(), round_display(*p)))
            .collect(),
        strategy: prediction.strategy,
        warning,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prediction(pairs: &[(&str, f64)]) -> Prediction {
        Prediction::from_distribution(
            pairs.iter().map(|(l, p)| (l.to_string(), *p)),
            Strategy::RuleBased,
        )
        .unwrap()
    }

    #[test]
    fn test_confidence_tiers() {
        assert_eq!(ConfidenceLevel::from_confidence(0.85), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_confidence(0.5), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_confidence(0.4), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_confidence(0.3), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_confidence(0.2), ConfidenceLevel::Low);
    }

    #[test]
    fn test_clear_result_has_no_warning() {
        let annotated = annotate(&prediction(&[("Happy", 0.85), ("Sad", 0.12), ("Angry", 0.03)]));

        assert_eq!(annotated.emotion, "Happy");
        assert_eq!(annotated.confidence_level, ConfidenceLevel::High);
        assert_eq!(annotated.warning, None);
        assert_eq!(annotated.probabilities.len(), 2);
        assert!(!annotated.probabilities.contains_key("Angry"));
    }

    #[test]
    fn test_ambiguous_result() {
        let annotated = annotate(&prediction(&[("Happy", 0.45), ("Sad", 0.4), ("Fear", 0.15)]));
        assert_eq!(annotated.confidence_level, ConfidenceLevel::Medium);
        assert_eq!(annotated.warning, Some(ResultWarning::Ambiguous));
    }

    #[test]
    fn test_low_confidence_result() {
        let annotated = annotate(&prediction(&[
            ("Happy", 0.28),
            ("Sad", 0.04),
            ("Fear", 0.04),
            ("Disgust", 0.04),
            ("Angry", 0.04),
            ("Neutral", 0.56),
        ]));
        // Neutral wins with 0.56: clear, no warning
        assert_eq!(annotated.warning, None);

        let low = Prediction {
            emotion: "Happy".to_string(),
            confidence: 0.25,
            probabilities: [("Happy".to_string(), 0.25), ("Sad".to_string(), 0.01)]
                .into_iter()
                .collect(),
            strategy: Strategy::Model,
        };
        let annotated = annotate(&low);
        assert_eq!(annotated.confidence_level, ConfidenceLevel::Low);
        assert_eq!(annotated.warning, Some(ResultWarning::LowConfidence));
        assert_eq!(annotated.probabilities.len(), 1);
    }

    #[test]
    fn test_ambiguity_wins_over_low_confidence() {
        let annotated = annotate(&prediction(&[
            ("Happy", 0.2),
            ("Sad", 0.2),
            ("Fear", 0.2),
            ("Disgust", 0.2),
            ("Angry", 0.2),
        ]));
        assert_eq!(annotated.confidence_level, ConfidenceLevel::Low);
        assert_eq!(annotated.warning, Some(ResultWarning::Ambiguous));
    }

    #[test]
    fn test_filter_keeps_label_and_confidence() {
        let original = prediction(&[("Happy", 0.96), ("Sad", 0.04)]);
        let annotated = annotate(&original);
        assert_eq!(annotated.emotion, original.emotion);
        assert_eq!(annotated.confidence, 0.96);
        assert_eq!(annotated.probabilities.len(), 1);
    }

    #[test]
    fn test_serialized_shape() {
        let annotated = annotate(&prediction(&[("Happy", 0.5), ("Sad", 0.45), ("Fear", 0.05)]));
        let json = serde_json::to_value(&annotated).unwrap();

        assert_eq!(json["confidence_level"], "high");
        assert_eq!(json["strategy"], "rule_based");
        assert_eq!(json["warning"], ResultWarning::Ambiguous.message());
        assert_eq!(json["probabilities"]["Fear"], 0.05);

        let clear = annotate(&prediction(&[("Happy", 0.9), ("Sad", 0.1)]));
        assert!(serde_json::to_value(&clear).unwrap().get("warning").is_none());
    }
}
