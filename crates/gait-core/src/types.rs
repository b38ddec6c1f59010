//! Fundamental types for gait clips.

use std::collections::HashMap;

use nalgebra::Vector3;
use ndarray::{s, Array3, ArrayView2, ArrayView3};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Joint count assumed for flat clips that do not state one
pub const DEFAULT_JOINT_COUNT: usize = 17;

/// Canonical landmark ordering for named-joint clips
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Landmark {
    Nose = 0,
    LeftShoulder = 1,
    RightShoulder = 2,
    LeftElbow = 3,
    RightElbow = 4,
    LeftWrist = 5,
    RightWrist = 6,
    LeftHip = 7,
    RightHip = 8,
    LeftKnee = 9,
    RightKnee = 10,
    LeftAnkle = 11,
    RightAnkle = 12,
}

impl Landmark {
    pub const COUNT: usize = 13;

    pub const ALL: [Landmark; Landmark::COUNT] = [
        Landmark::Nose,
        Landmark::LeftShoulder,
        Landmark::RightShoulder,
        Landmark::LeftElbow,
        Landmark::RightElbow,
        Landmark::LeftWrist,
        Landmark::RightWrist,
        Landmark::LeftHip,
        Landmark::RightHip,
        Landmark::LeftKnee,
        Landmark::RightKnee,
        Landmark::LeftAnkle,
        Landmark::RightAnkle,
    ];

    pub fn from_index(idx: usize) -> Option<Self> {
        Self::ALL.get(idx).copied()
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Key used for this landmark in named-joint frames
    pub fn name(&self) -> &'static str {
        match self {
            Landmark::Nose => "nose",
            Landmark::LeftShoulder => "left_shoulder",
            Landmark::RightShoulder => "right_shoulder",
            Landmark::LeftElbow => "left_elbow",
            Landmark::RightElbow => "right_elbow",
            Landmark::LeftWrist => "left_wrist",
            Landmark::RightWrist => "right_wrist",
            Landmark::LeftHip => "left_hip",
            Landmark::RightHip => "right_hip",
            Landmark::LeftKnee => "left_knee",
            Landmark::RightKnee => "right_knee",
            Landmark::LeftAnkle => "left_ankle",
            Landmark::RightAnkle => "right_ankle",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|l| l.name() == name)
    }
}

/// One frame of named joints; values are `[x, y]` or `[x, y, z]`
pub type NamedFrame = HashMap<String, Option<Vec<f64>>>;

/// Raw clip as delivered by the pose-extraction collaborator.
///
/// The caller decides which shape it holds; the normalizer turns every
/// variant into the same [`JointSequence`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum RawClip {
    /// Frame-major `"x,y,z"` strings, `n_joints` entries per frame
    Flat {
        points: Vec<String>,
        #[serde(default = "default_joint_count")]
        n_joints: usize,
    },
    /// Per-frame maps keyed by [`Landmark::name`]
    Named { frames: Vec<NamedFrame> },
    /// Frame-major numeric arrays, 2-D or 3-D per joint
    Arrays { frames: Vec<Vec<Vec<f64>>> },
}

fn default_joint_count() -> usize {
    DEFAULT_JOINT_COUNT
}

impl RawClip {
    pub fn flat(points: Vec<String>, n_joints: usize) -> Self {
        RawClip::Flat { points, n_joints }
    }

    /// Decode a clip from JSON.
    ///
    /// Accepts the tagged object form as well as a bare `[frame][joint][coord]`
    /// array, which is what the keypoint extraction script writes.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        if value.is_array() {
            let frames: Vec<Vec<Vec<f64>>> = serde_json::from_value(value)?;
            return Ok(RawClip::Arrays { frames });
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Frame count before any normalization
    pub fn raw_frame_count(&self) -> usize {
        match self {
            RawClip::Flat { points, n_joints } => {
                if *n_joints == 0 {
                    0
                } else {
                    points.len() / n_joints
                }
            }
            RawClip::Named { frames } => frames.len(),
            RawClip::Arrays { frames } => frames.len(),
        }
    }

    /// Whether the clip carries no entries at all
    pub fn is_empty(&self) -> bool {
        match self {
            RawClip::Flat { points, .. } => points.is_empty(),
            RawClip::Named { frames } => frames.is_empty(),
            RawClip::Arrays { frames } => frames.is_empty(),
        }
    }

    /// Override the joint count of a flat clip; other shapes carry their own
    pub fn with_joint_count(self, n: usize) -> Self {
        match self {
            RawClip::Flat { points, .. } => RawClip::Flat { points, n_joints: n },
            other => other,
        }
    }
}

/// Uniform `(frames, joints, 3)` position sequence.
///
/// Invariants: at least one frame, at least one joint, three coordinates per
/// joint. The joint count is fixed across frames by construction.
#[derive(Debug, Clone, PartialEq)]
pub struct JointSequence {
    data: Array3<f64>,
}

impl JointSequence {
    pub fn from_array(data: Array3<f64>) -> Result<Self> {
        let (n_frames, n_joints, n_coords) = data.dim();
        if n_coords != 3 {
            return Err(Error::Shape(format!(
                "expected 3 coordinates per joint, got {}",
                n_coords
            )));
        }
        if n_frames == 0 {
            return Err(Error::InsufficientData {
                required: n_joints.max(1),
                available: 0,
            });
        }
        if n_joints == 0 {
            return Err(Error::Shape("sequence has no joints".to_string()));
        }
        Ok(Self { data })
    }

    pub fn n_frames(&self) -> usize {
        self.data.dim().0
    }

    pub fn n_joints(&self) -> usize {
        self.data.dim().1
    }

    pub fn positions(&self) -> ArrayView3<'_, f64> {
        self.data.view()
    }

    /// All joints of one frame as a `(joints, 3)` view
    pub fn frame(&self, frame: usize) -> ArrayView2<'_, f64> {
        self.data.slice(s![frame, .., ..])
    }

    pub fn joint(&self, frame: usize, joint: usize) -> Vector3<f64> {
        Vector3::new(
            self.data[[frame, joint, 0]],
            self.data[[frame, joint, 1]],
            self.data[[frame, joint, 2]],
        )
    }

    /// Subtract the root joint (index 0) from every joint, frame by frame
    pub fn recenter(&mut self) {
        let root = self.data.slice(s![.., 0..1, ..]).to_owned();
        self.data -= &root;
    }

    /// Prepend copies of the first frame until `min_frames` is reached
    pub fn pad_to(&mut self, min_frames: usize) {
        let (n_frames, n_joints, _) = self.data.dim();
        if n_frames >= min_frames {
            return;
        }

        let missing = min_frames - n_frames;
        let data = &self.data;
        self.data = Array3::from_shape_fn((min_frames, n_joints, 3), |(f, j, c)| {
            if f < missing {
                data[[0, j, c]]
            } else {
                data[[f - missing, j, c]]
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_landmark_roundtrip() {
        for (i, landmark) in Landmark::ALL.iter().enumerate() {
            assert_eq!(landmark.index(), i);
            assert_eq!(Landmark::from_index(i), Some(*landmark));
            assert_eq!(Landmark::from_name(landmark.name()), Some(*landmark));
        }
        assert_eq!(Landmark::from_name("left_eye"), None);
    }

    #[test]
    fn test_recenter_zeroes_root() {
        let data = Array3::from_shape_fn((3, 4, 3), |(f, j, c)| (f * 10 + j * 3 + c) as f64);
        let mut seq = JointSequence::from_array(data).unwrap();
        seq.recenter();

        for f in 0..3 {
            assert_eq!(seq.joint(f, 0), Vector3::zeros());
            assert_eq!(seq.joint(f, 2), Vector3::new(6.0, 6.0, 6.0));
        }
    }

    #[test]
    fn test_pad_prepends_first_frame() {
        let data = Array3::from_shape_fn((2, 2, 3), |(f, j, _)| (f * 2 + j) as f64);
        let mut seq = JointSequence::from_array(data).unwrap();
        seq.pad_to(5);

        assert_eq!(seq.n_frames(), 5);
        for f in 0..4 {
            assert_eq!(seq.frame(f), seq.frame(0));
        }
        assert_eq!(seq.joint(4, 1), Vector3::new(3.0, 3.0, 3.0));
    }

    #[test]
    fn test_pad_is_noop_when_long_enough() {
        let data = Array3::zeros((6, 2, 3));
        let mut seq = JointSequence::from_array(data).unwrap();
        seq.pad_to(4);
        assert_eq!(seq.n_frames(), 6);
    }

    #[test]
    fn test_rejects_bad_shapes() {
        assert!(matches!(
            JointSequence::from_array(Array3::zeros((2, 3, 2))),
            Err(Error::Shape(_))
        ));
        assert!(matches!(
            JointSequence::from_array(Array3::zeros((0, 3, 3))),
            Err(Error::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_raw_frame_count() {
        let clip = RawClip::flat(vec!["0,0,0".to_string(); 34], 17);
        assert_eq!(clip.raw_frame_count(), 2);
        assert_eq!(clip.with_joint_count(0).raw_frame_count(), 0);
    }

    #[test]
    fn test_clip_from_json_forms() {
        let tagged = r#"{"format": "flat", "points": ["1,2,3"]}"#;
        match RawClip::from_json(tagged).unwrap() {
            RawClip::Flat { points, n_joints } => {
                assert_eq!(points.len(), 1);
                assert_eq!(n_joints, DEFAULT_JOINT_COUNT);
            }
            other => panic!("unexpected clip {:?}", other),
        }

        let bare = "[[[0.1, 0.2], [0.3, 0.4]], [[0.1, 0.2], [0.3, 0.5]]]";
        assert_eq!(RawClip::from_json(bare).unwrap().raw_frame_count(), 2);

        let named = r#"{"format": "named", "frames": [{"nose": [1.0, 2.0], "left_wrist": null}]}"#;
        assert_eq!(RawClip::from_json(named).unwrap().raw_frame_count(), 1);

        assert!(matches!(
            RawClip::from_json("{not json"),
            Err(Error::Serialization(_))
        ));
    }
}
