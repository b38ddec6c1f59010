//! Raw clip parsing, root-centering, and minimum-length padding.
//!
//! Every [`RawClip`] shape is reduced to a `(frames, joints, 3)`
//! [`JointSequence`], recentred on joint 0 so features describe relative body
//! motion rather than camera position, then head-padded so the third-order
//! differences in [`crate::kinematics`] always have samples to work with.

use ndarray::Array3;

use crate::error::{Error, Result};
use crate::types::{JointSequence, Landmark, NamedFrame, RawClip};

/// Third-order differencing needs four samples
pub const DEFAULT_MIN_FRAMES: usize = 4;

/// Normalize a raw clip into a recentred, padded sequence
pub fn normalize(raw: &RawClip, min_frames: usize) -> Result<JointSequence> {
    let mut sequence = parse(raw)?;
    prepare(&mut sequence, min_frames);
    Ok(sequence)
}

/// Validate a raw clip and lay it out as a sequence, without recentring or padding
pub fn parse(raw: &RawClip) -> Result<JointSequence> {
    match raw {
        RawClip::Flat { points, n_joints } => parse_flat(points, *n_joints),
        RawClip::Named { frames } => from_named(frames),
        RawClip::Arrays { frames } => from_arrays(frames),
    }
}

/// Recenter on the root joint, then head-pad to `min_frames`
pub fn prepare(sequence: &mut JointSequence, min_frames: usize) {
    sequence.recenter();
    sequence.pad_to(min_frames);
}

/// Parse frame-major `"x,y,z"` strings into a sequence of `n_joints` joints.
///
/// Entries are validated first so the error names the first bad index. The
/// frame count is `points / n_joints`; zero frames is insufficient data and a
/// non-zero remainder is a shape error.
pub fn parse_flat(points: &[String], n_joints: usize) -> Result<JointSequence> {
    let mut coords = Vec::with_capacity(points.len() * 3);
    for (index, entry) in points.iter().enumerate() {
        coords.extend_from_slice(&parse_point(index, entry)?);
    }

    if n_joints == 0 {
        return Err(Error::Shape("joint count must be positive".to_string()));
    }

    let total = points.len();
    let n_frames = total / n_joints;
    if n_frames == 0 {
        return Err(Error::InsufficientData {
            required: n_joints,
            available: total,
        });
    }
    if total % n_joints != 0 {
        return Err(Error::Shape(format!(
            "{} points cannot be split into frames of {} joints",
            total, n_joints
        )));
    }

    let data = Array3::from_shape_vec((n_frames, n_joints, 3), coords)
        .map_err(|e| Error::Shape(e.to_string()))?;
    JointSequence::from_array(data)
}

fn parse_point(index: usize, entry: &str) -> Result<[f64; 3]> {
    let parts: Vec<&str> = entry.split(',').collect();
    if parts.len() != 3 {
        return Err(Error::Parse {
            index,
            value: entry.to_string(),
            reason: format!("expected 3 values, found {}", parts.len()),
        });
    }

    let mut point = [0.0; 3];
    for (slot, part) in point.iter_mut().zip(parts) {
        let value: f64 = part.trim().parse().map_err(|e| Error::Parse {
            index,
            value: entry.to_string(),
            reason: format!("{}", e),
        })?;
        if !value.is_finite() {
            return Err(Error::Parse {
                index,
                value: entry.to_string(),
                reason: "coordinate is not finite".to_string(),
            });
        }
        *slot = value;
    }
    Ok(point)
}

/// Remap named-joint frames onto the canonical [`Landmark`] ordering.
///
/// Absent, null, or truncated joints become the origin; 2-D joints get `z = 0`.
pub fn from_named(frames: &[NamedFrame]) -> Result<JointSequence> {
    let mut coords = Vec::with_capacity(frames.len() * Landmark::COUNT * 3);

    for frame in frames {
        for landmark in Landmark::ALL {
            let point = match frame.get(landmark.name()) {
                Some(Some(c)) if c.len() >= 2 => {
                    [c[0], c[1], c.get(2).copied().unwrap_or(0.0)]
                }
                _ => [0.0; 3],
            };
            coords.extend_from_slice(&point);
        }
    }

    let data = Array3::from_shape_vec((frames.len(), Landmark::COUNT, 3), coords)
        .map_err(|e| Error::Shape(e.to_string()))?;
    JointSequence::from_array(data)
}

/// Build a sequence from `[frame][joint][coord]` arrays with 2 or 3 coordinates
pub fn from_arrays(frames: &[Vec<Vec<f64>>]) -> Result<JointSequence> {
    let n_joints = frames.first().map(|f| f.len()).unwrap_or(0);
    let mut coords = Vec::with_capacity(frames.len() * n_joints * 3);

    for (f, frame) in frames.iter().enumerate() {
        if frame.len() != n_joints {
            return Err(Error::Shape(format!(
                "frame {} has {} joints, expected {}",
                f,
                frame.len(),
                n_joints
            )));
        }

        for (j, joint) in frame.iter().enumerate() {
            let index = f * n_joints + j;
            if joint.len() != 2 && joint.len() != 3 {
                return Err(Error::Parse {
                    index,
                    value: format!("{:?}", joint),
                    reason: format!("expected 2 or 3 values, found {}", joint.len()),
                });
            }
            if joint.iter().any(|v| !v.is_finite()) {
                return Err(Error::Parse {
                    index,
                    value: format!("{:?}", joint),
                    reason: "coordinate is not finite".to_string(),
                });
            }
            coords.extend_from_slice(&[joint[0], joint[1], joint.get(2).copied().unwrap_or(0.0)]);
        }
    }

    let data = Array3::from_shape_vec((frames.len(), n_joints, 3), coords)
        .map_err(|e| Error::Shape(e.to_string()))?;
    JointSequence::from_array(data)
}
