//! Rule-based emotion scoring over gait features.
//!
//! ## Default Rule Table
//!
//! | Emotion | Gait pattern |
//! |---------|--------------|
//! | Happy | fast, high joint energy, lively limbs |
//! | Sad | slow, low energy, small movements |
//! | Fear | moderate pace, short spine, restricted feet |
//! | Disgust | slow, restricted feet, limited limb motion |
//! | Angry | fast, short spine, high energy, erratic speed |
//! | Neutral | constant base score |
//!
//! Each emotion sums the weights of the rules whose conditions all hold. Scores
//! are clamped at zero and normalized by their total.

use gait_core::features::{index, FeatureVector};
use serde::{Deserialize, Serialize};

use crate::emotion::{Emotion, Prediction, Strategy};

/// Strict comparison against a single feature
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Condition {
    /// `x[feature] > threshold`
    Above { feature: usize, threshold: f64 },
    /// `x[feature] < threshold`
    Below { feature: usize, threshold: f64 },
    /// `low < x[feature] < high`
    Within { feature: usize, low: f64, high: f64 },
}

impl Condition {
    /// Out-of-range feature indices never hold
    pub fn holds(&self, features: &FeatureVector) -> bool {
        match *self {
            Condition::Above { feature, threshold } => {
                features.get(feature).map_or(false, |x| x > threshold)
            }
            Condition::Below { feature, threshold } => {
                features.get(feature).map_or(false, |x| x < threshold)
            }
            Condition::Within { feature, low, high } => {
                features.get(feature).map_or(false, |x| low < x && x < high)
            }
        }
    }
}

/// Weight added when every condition holds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringRule {
    pub when: Vec<Condition>,
    pub weight: f64,
}

impl ScoringRule {
    fn new(when: Vec<Condition>, weight: f64) -> Self {
        Self { when, weight }
    }

    pub fn applies(&self, features: &FeatureVector) -> bool {
        self.when.iter().all(|c| c.holds(features))
    }
}

/// Base score plus rules for one emotion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionRules {
    #[serde(default)]
    pub base: f64,
    #[serde(default)]
    pub rules: Vec<ScoringRule>,
}

impl EmotionRules {
    pub fn score(&self, features: &FeatureVector) -> f64 {
        let bonus: f64 = self
            .rules
            .iter()
            .filter(|r| r.applies(features))
            .map(|r| r.weight)
            .sum();
        (self.base + bonus).max(0.0)
    }
}

/// Complete rule table, one entry per [`Emotion`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    pub happy: EmotionRules,
    pub sad: EmotionRules,
    pub fear: EmotionRules,
    pub disgust: EmotionRules,
    pub angry: EmotionRules,
    pub neutral: EmotionRules,
}

impl RuleSet {
    pub fn rules_for(&self, emotion: Emotion) -> &EmotionRules {
        match emotion {
            Emotion::Happy => &self.happy,
            Emotion::Sad => &self.sad,
            Emotion::Fear => &self.fear,
            Emotion::Disgust => &self.disgust,
            Emotion::Angry => &self.angry,
            Emotion::Neutral => &self.neutral,
        }
    }
}

fn above(feature: usize, threshold: f64) -> Condition {
    Condition::Above { feature, threshold }
}

fn below(feature: usize, threshold: f64) -> Condition {
    Condition::Below { feature, threshold }
}

fn within(feature: usize, low: f64, high: f64) -> Condition {
    Condition::Within { feature, low, high }
}

impl Default for RuleSet {
    fn default() -> Self {
        use index::*;

        // Speed, limb, and posture slots stand in for the pace, arm swing,
        // bounce, and regularity cues the thresholds were tuned against
        let energy = JOINT_VARIANCE_LOW;
        let regularity = SPINE_LENGTH;

        Self {
            // Happy: fast and light
            happy: EmotionRules {
                base: 0.0,
                rules: vec![
                    ScoringRule::new(vec![above(MEAN_SPEED, 1.5), above(energy, 1.2)], 0.3),
                    ScoringRule::new(vec![above(MEAN_JERK, 0.4)], 0.2),
                    ScoringRule::new(vec![above(WRIST_ASYMMETRY, 0.3)], 0.2),
                    ScoringRule::new(vec![above(MAX_SPEED, 0.6)], 0.15),
                    ScoringRule::new(vec![above(regularity, 0.7)], 0.15),
                ],
            },

            // Sad: slow and heavy
            sad: EmotionRules {
                base: 0.0,
                rules: vec![
                    ScoringRule::new(vec![below(MEAN_SPEED, 0.8), below(energy, 0.8)], 0.3),
                    ScoringRule::new(vec![below(MEAN_JERK, 0.2)], 0.2),
                    ScoringRule::new(vec![below(HAND_MOVEMENT, -0.1)], 0.2),
                    ScoringRule::new(vec![below(MAX_SPEED, 0.4)], 0.15),
                    ScoringRule::new(vec![below(WRIST_ASYMMETRY, 0.15)], 0.15),
                ],
            },

            // Fear: guarded
            fear: EmotionRules {
                base: 0.0,
                rules: vec![
                    ScoringRule::new(
                        vec![within(MEAN_SPEED, 0.9, 1.4), below(regularity, 0.65)],
                        0.3,
                    ),
                    ScoringRule::new(vec![below(FOOT_MOVEMENT, 0.45)], 0.25),
                    ScoringRule::new(vec![below(MEAN_JERK, 0.3)], 0.2),
                    ScoringRule::new(vec![within(energy, 0.9, 1.3)], 0.15),
                    ScoringRule::new(vec![below(MAX_SPEED, 0.5)], 0.1),
                ],
            },

            // Disgust: withdrawn
            disgust: EmotionRules {
                base: 0.0,
                rules: vec![
                    ScoringRule::new(vec![below(MEAN_SPEED, 1.0), below(FOOT_MOVEMENT, 0.4)], 0.3),
                    ScoringRule::new(vec![below(HAND_MOVEMENT, -0.05)], 0.2),
                    ScoringRule::new(vec![below(MEAN_JERK, 0.25)], 0.2),
                    ScoringRule::new(vec![below(MAX_SPEED, 0.45)], 0.15),
                    ScoringRule::new(vec![below(WRIST_ASYMMETRY, 0.2)], 0.15),
                ],
            },

            // Angry: fast and irregular
            angry: EmotionRules {
                base: 0.0,
                rules: vec![
                    ScoringRule::new(vec![above(MEAN_SPEED, 1.3), below(regularity, 0.6)], 0.3),
                    ScoringRule::new(vec![above(energy, 1.5)], 0.2),
                    ScoringRule::new(vec![below(FOOT_MOVEMENT, 0.4)], 0.2),
                    ScoringRule::new(vec![below(MEAN_JERK, 0.25)], 0.15),
                    ScoringRule::new(vec![above(SPEED_STD, 3.0)], 0.15),
                ],
            },

            neutral: EmotionRules {
                base: 0.5,
                rules: Vec::new(),
            },
        }
    }
}

/// Deterministic threshold classifier
#[derive(Debug, Clone, Default)]
pub struct RuleBasedClassifier {
    rules: RuleSet,
}

impl RuleBasedClassifier {
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    /// Raw non-negative scores in [`Emotion::ALL`] order
    pub fn scores(&self, features: &FeatureVector) -> [f64; Emotion::COUNT] {
        Emotion::ALL.map(|e| self.rules.rules_for(e).score(features))
    }

    /// Normalized distribution in [`Emotion::ALL`] order; uniform when every
    /// score is zero
    pub fn distribution(&self, features: &FeatureVector) -> [f64; Emotion::COUNT] {
        let scores = self.scores(features);
        let total: f64 = scores.iter().sum();

        if total > 0.0 && total.is_finite() {
            scores.map(|s| s / total)
        } else {
            [1.0 / Emotion::COUNT as f64; Emotion::COUNT]
        }
    }

    pub fn predict(&self, features: &FeatureVector) -> Prediction {
        let distribution = self.distribution(features);

        let mut best = 0;
        for (i, p) in distribution.iter().enumerate() {
            if *p > distribution[best] {
                best = i;
            }
        }

        Prediction {
            emotion: Emotion::ALL[best].name().to_string(),
            confidence: distribution[best],
            probabilities: Emotion::ALL
                .iter()
                .zip(distribution)
                .map(|(e, p)| (e.name().to_string(), p))
                .collect(),
            strategy: Strategy::RuleBased,
        }
    }
}
