//! Complete gait analyzer chaining extraction, classification, and annotation.

use std::sync::Arc;

use gait_core::features::{ExtractionConfig, FeatureExtractor, FeatureVector, MIN_RAW_FRAMES};
use gait_core::types::RawClip;
use serde::Serialize;

use crate::classifier::EmotionModel;
use crate::confidence::{annotate, AnnotatedPrediction};

/// Analysis result for one clip
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GaitAnalysis {
    #[serde(flatten)]
    pub prediction: AnnotatedPrediction,
    pub features: FeatureVector,
    /// Frame count before normalization
    pub raw_frames: usize,
    /// Whether the neutral default replaced extraction
    pub neutral_default: bool,
}

/// Complete gait emotion analyzer
#[derive(Debug, Clone)]
pub struct GaitEmotionAnalyzer {
    extractor: FeatureExtractor,
    model: Arc<EmotionModel>,
}

impl GaitEmotionAnalyzer {
    pub fn new(model: Arc<EmotionModel>) -> Self {
        Self::with_config(model, ExtractionConfig::default())
    }

    pub fn with_config(model: Arc<EmotionModel>, config: ExtractionConfig) -> Self {
        Self {
            extractor: FeatureExtractor::new(config),
            model,
        }
    }

    /// Extract features from a raw clip, classify, and annotate.
    ///
    /// Input errors propagate; once features exist a result is always produced.
    pub fn analyze(&self, raw: &RawClip) -> gait_core::Result<GaitAnalysis> {
        let raw_frames = raw.raw_frame_count();
        let features = self.extractor.extract(raw)?;
        let prediction = self.classify(&features);

        tracing::info!(
            emotion = %prediction.emotion,
            confidence = prediction.confidence,
            strategy = ?prediction.strategy,
            "Analyzed clip with {} frame(s)",
            raw_frames
        );

        Ok(GaitAnalysis {
            prediction,
            features,
            raw_frames,
            neutral_default: raw_frames < MIN_RAW_FRAMES,
        })
    }

    /// Classify a feature vector and annotate the result
    pub fn classify(&self, features: &FeatureVector) -> AnnotatedPrediction {
        annotate(&self.model.classify(features))
    }

    pub fn extract(&self, raw: &RawClip) -> gait_core::Result<FeatureVector> {
        self.extractor.extract(raw)
    }

    pub fn model(&self) -> &EmotionModel {
        &self.model
    }
}
