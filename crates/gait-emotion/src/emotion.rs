//! Emotion categories and prediction results.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Emotion categories scored by the rule-based strategy.
///
/// Declaration order is significant: it breaks ties in the rule-based argmax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Emotion {
    Happy,
    Sad,
    Fear,
    Disgust,
    Angry,
    Neutral,
}

impl Emotion {
    pub const COUNT: usize = 6;

    pub const ALL: [Emotion; Emotion::COUNT] = [
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Fear,
        Emotion::Disgust,
        Emotion::Angry,
        Emotion::Neutral,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Emotion::Happy => "Happy",
            Emotion::Sad => "Sad",
            Emotion::Fear => "Fear",
            Emotion::Disgust => "Disgust",
            Emotion::Angry => "Angry",
            Emotion::Neutral => "Neutral",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|e| e.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which strategy produced a prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Model,
    RuleBased,
}

/// Classifier output.
///
/// `emotion` is a free-form label: trained models may carry classes outside
/// [`Emotion`]. `probabilities` sums to 1 within floating tolerance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub emotion: String,
    pub confidence: f64,
    pub probabilities: BTreeMap<String, f64>,
    pub strategy: Strategy,
}

impl Prediction {
    /// Build a prediction from an ordered distribution; the first maximum wins
    pub fn from_distribution(
        distribution: impl IntoIterator<Item = (String, f64)>,
        strategy: Strategy,
    ) -> Option<Self> {
        let mut probabilities = BTreeMap::new();
        let mut best: Option<(String, f64)> = None;

        for (label, p) in distribution {
            if best.as_ref().map_or(true, |(_, top)| p > *top) {
                best = Some((label.clone(), p));
            }
            probabilities.insert(label, p);
        }

        let (emotion, confidence) = best?;
        Some(Self {
            emotion,
            confidence,
            probabilities,
            strategy,
        })
    }

    /// Probabilities sorted by descending value, ties in label order
    pub fn ranked(&self) -> Vec<(&str, f64)> {
        let mut ranked: Vec<(&str, f64)> = self
            .probabilities
            .iter()
            .map(|(label, p)| (label.as_str(), *p))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }

    pub fn total_probability(&self) -> f64 {
        self.probabilities.values().sum()
    }
}
