//! Handcrafted gait feature (HCF) assembly.
//!
//! ## Layout
//!
//! | Index | Category | Feature |
//! |-------|----------|---------|
//! | 0 | Kinematics | mean speed |
//! | 1 | Kinematics | max speed |
//! | 2 | Kinematics | speed std (population) |
//! | 3 | Kinematics | mean acceleration |
//! | 4 | Kinematics | mean jerk |
//! | 5 | Body parts | hand movement (wrists 5, 6) |
//! | 6 | Body parts | foot movement (ankles 11, 12) |
//! | 7 | Body parts | left-right wrist asymmetry |
//! | 8 | Volume | mean bounding-box volume |
//! | 9 | Posture | head tilt (joint 0 y - joint 1 y) |
//! | 10 | Posture | spine length (shoulder center to hip center) |
//! | 11-13 | Joint variance | three largest per-joint speed variances, ascending |
//!
//! Joint indices follow the canonical [`Landmark`] ordering.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::kinematics::{mean, KinematicFields};
use crate::normalize::{parse, prepare, DEFAULT_MIN_FRAMES};
use crate::types::{JointSequence, Landmark, RawClip};

pub const FEATURE_COUNT: usize = 14;

/// Valid clips with fewer frames than this skip extraction entirely
pub const MIN_RAW_FRAMES: usize = 2;

/// Floor applied to the bounding-box depth so flat (2-D) clips keep volume
pub const MIN_BOX_DEPTH: f64 = 0.001;

/// Feature slot indices
pub mod index {
    pub const MEAN_SPEED: usize = 0;
    pub const MAX_SPEED: usize = 1;
    pub const SPEED_STD: usize = 2;
    pub const MEAN_ACCELERATION: usize = 3;
    pub const MEAN_JERK: usize = 4;
    pub const HAND_MOVEMENT: usize = 5;
    pub const FOOT_MOVEMENT: usize = 6;
    pub const WRIST_ASYMMETRY: usize = 7;
    pub const BOUNDING_VOLUME: usize = 8;
    pub const HEAD_TILT: usize = 9;
    pub const SPINE_LENGTH: usize = 10;
    pub const JOINT_VARIANCE_LOW: usize = 11;
    pub const JOINT_VARIANCE_MID: usize = 12;
    pub const JOINT_VARIANCE_HIGH: usize = 13;
}

pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "mean_speed",
    "max_speed",
    "speed_std",
    "mean_acceleration",
    "mean_jerk",
    "hand_movement",
    "foot_movement",
    "wrist_asymmetry",
    "bounding_volume",
    "head_tilt",
    "spine_length",
    "joint_variance_3rd",
    "joint_variance_2nd",
    "joint_variance_1st",
];

/// Neutral walking pattern substituted for degenerate clips
pub const NEUTRAL_GAIT: [f64; FEATURE_COUNT] = [
    1.0, 0.5, 2.0, 0.1, 0.3, 0.0, 0.5, 0.2, 0.1, 0.05, 0.8, 1.0, 0.5, 0.3,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureCategory {
    Kinematics,
    BodyParts,
    Volume,
    Posture,
    JointVariance,
}

impl FeatureCategory {
    pub fn of(idx: usize) -> Option<Self> {
        match idx {
            0..=4 => Some(Self::Kinematics),
            5..=7 => Some(Self::BodyParts),
            8 => Some(Self::Volume),
            9..=10 => Some(Self::Posture),
            11..=13 => Some(Self::JointVariance),
            _ => None,
        }
    }
}

/// Fixed-length, finite gait feature vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    /// Build from raw values; non-finite entries are rejected
    pub fn new(values: [f64; FEATURE_COUNT]) -> Result<Self> {
        if let Some(i) = values.iter().position(|v| !v.is_finite()) {
            return Err(Error::Parse {
                index: i,
                value: values[i].to_string(),
                reason: "feature is not finite".to_string(),
            });
        }
        Ok(Self(values))
    }

    pub fn from_slice(values: &[f64]) -> Result<Self> {
        let values: [f64; FEATURE_COUNT] = values.try_into().map_err(|_| {
            Error::Shape(format!(
                "expected {} features, got {}",
                FEATURE_COUNT,
                values.len()
            ))
        })?;
        Self::new(values)
    }

    pub fn neutral_default() -> Self {
        Self(NEUTRAL_GAIT)
    }

    pub fn get(&self, idx: usize) -> Option<f64> {
        self.0.get(idx).copied()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.0.to_vec()
    }

    pub fn len(&self) -> usize {
        FEATURE_COUNT
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// `(name, value)` pairs in layout order
    pub fn named(&self) -> Vec<(&'static str, f64)> {
        FEATURE_NAMES.iter().copied().zip(self.0).collect()
    }

}

impl TryFrom<Vec<f64>> for FeatureVector {
    type Error = Error;

    fn try_from(values: Vec<f64>) -> Result<Self> {
        Self::from_slice(&values)
    }
}

impl From<FeatureVector> for Vec<f64> {
    fn from(features: FeatureVector) -> Self {
        features.to_vec()
    }
}

/// Assemble the 14 features from a normalized sequence and its kinematics
pub fn assemble(sequence: &JointSequence, fields: &KinematicFields) -> FeatureVector {
    let n_joints = sequence.n_joints();
    let mut features = [0.0; FEATURE_COUNT];

    // Kinematics
    features[index::MEAN_SPEED] = fields.mean_speed();
    features[index::MAX_SPEED] = fields.max_speed();
    features[index::SPEED_STD] = fields.speed_std();
    features[index::MEAN_ACCELERATION] = fields.mean_acceleration();
    features[index::MEAN_JERK] = fields.mean_jerk();

    // Body parts
    let left_wrist = Landmark::LeftWrist.index();
    let right_wrist = Landmark::RightWrist.index();
    features[index::HAND_MOVEMENT] =
        pair_or_last_speed(fields, n_joints, left_wrist, right_wrist);
    features[index::FOOT_MOVEMENT] = pair_or_last_speed(
        fields,
        n_joints,
        Landmark::LeftAnkle.index(),
        Landmark::RightAnkle.index(),
    );
    if n_joints > right_wrist {
        features[index::WRIST_ASYMMETRY] =
            (fields.joint_mean_speed(left_wrist) - fields.joint_mean_speed(right_wrist)).abs();
    }

    // Volume
    features[index::BOUNDING_VOLUME] = mean_bounding_volume(sequence);

    // Posture
    features[index::HEAD_TILT] = head_tilt(sequence);
    features[index::SPINE_LENGTH] = spine_length(sequence);

    // Joint variance
    let top = top_joint_variances(fields);
    features[index::JOINT_VARIANCE_LOW..=index::JOINT_VARIANCE_HIGH].copy_from_slice(&top);

    for (i, value) in features.iter_mut().enumerate() {
        if !value.is_finite() {
            tracing::warn!("Feature {} ({}) is not finite, clamping to 0", i, FEATURE_NAMES[i]);
            *value = 0.0;
        }
    }

    FeatureVector(features)
}

/// Mean speed over a left/right joint pair when both exist, otherwise the
/// last joint, otherwise 0 for single-joint clips
fn pair_or_last_speed(fields: &KinematicFields, n_joints: usize, left: usize, right: usize) -> f64 {
    if n_joints > left.max(right) {
        let column = |j: usize| fields.velocity.column(j).to_vec();
        let mut speeds = column(left);
        speeds.extend(column(right));
        mean(&speeds)
    } else if n_joints > 1 {
        fields.joint_mean_speed(n_joints - 1)
    } else {
        0.0
    }
}

fn mean_bounding_volume(sequence: &JointSequence) -> f64 {
    let volumes: Vec<f64> = (0..sequence.n_frames())
        .map(|f| {
            let frame = sequence.frame(f);
            let extent = |c: usize| {
                let axis = frame.column(c);
                let lo = axis.iter().cloned().fold(f64::INFINITY, f64::min);
                let hi = axis.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                hi - lo
            };
            extent(0) * extent(1) * extent(2).max(MIN_BOX_DEPTH)
        })
        .collect();
    mean(&volumes)
}

fn head_tilt(sequence: &JointSequence) -> f64 {
    if sequence.n_joints() < 2 {
        return 0.0;
    }
    let tilts: Vec<f64> = (0..sequence.n_frames())
        .map(|f| sequence.joint(f, 0).y - sequence.joint(f, 1).y)
        .collect();
    mean(&tilts)
}

fn spine_length(sequence: &JointSequence) -> f64 {
    let right_hip = Landmark::RightHip.index();
    if sequence.n_joints() <= right_hip {
        return 0.0;
    }
    let lengths: Vec<f64> = (0..sequence.n_frames())
        .map(|f| {
            let shoulders = (sequence.joint(f, Landmark::LeftShoulder.index())
                + sequence.joint(f, Landmark::RightShoulder.index()))
                / 2.0;
            let hips = (sequence.joint(f, Landmark::LeftHip.index())
                + sequence.joint(f, right_hip))
                / 2.0;
            (shoulders - hips).norm()
        })
        .collect();
    mean(&lengths)
}

/// Three largest per-joint speed variances in ascending order; clips with
/// fewer than three joints are zero-filled at the low end
fn top_joint_variances(fields: &KinematicFields) -> [f64; 3] {
    let mut variances = fields.joint_speed_variances();
    variances.sort_by(|a, b| a.total_cmp(b));

    let mut top = [0.0; 3];
    let take = variances.len().min(3);
    top[3 - take..].copy_from_slice(&variances[variances.len() - take..]);
    top
}

/// Configuration for [`FeatureExtractor`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Frames required after padding
    pub min_frames: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_frames: DEFAULT_MIN_FRAMES,
        }
    }
}

/// End-to-end raw clip → feature vector extraction
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    config: ExtractionConfig,
}

impl FeatureExtractor {
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    /// Extract the feature vector from a raw clip.
    ///
    /// Input is validated first, so malformed clips fail regardless of length.
    /// An empty clip, or one with fewer than [`MIN_RAW_FRAMES`] validated
    /// frames, yields [`FeatureVector::neutral_default`].
    pub fn extract(&self, raw: &RawClip) -> Result<FeatureVector> {
        if raw.is_empty() {
            tracing::warn!("Clip is empty, using neutral gait defaults");
            return Ok(FeatureVector::neutral_default());
        }

        let mut sequence = parse(raw)?;
        if sequence.n_frames() < MIN_RAW_FRAMES {
            tracing::warn!(
                "Clip has {} frame(s), using neutral gait defaults",
                sequence.n_frames()
            );
            return Ok(FeatureVector::neutral_default());
        }

        prepare(&mut sequence, self.config.min_frames);
        tracing::debug!(
            frames = sequence.n_frames(),
            joints = sequence.n_joints(),
            "Normalized clip"
        );
        Ok(self.extract_sequence(&sequence))
    }

    /// Extract from an already normalized sequence
    pub fn extract_sequence(&self, sequence: &JointSequence) -> FeatureVector {
        let fields = KinematicFields::from_sequence(sequence);
        assemble(sequence, &fields)
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }
}

/// Extract features with the default configuration
pub fn extract(raw: &RawClip) -> Result<FeatureVector> {
    FeatureExtractor::default().extract(raw)
}
