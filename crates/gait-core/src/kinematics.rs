//! Kinematic differentiation of joint sequences.

use ndarray::{s, Array2, Array3, ArrayView3, Axis};

use crate::types::JointSequence;

/// Velocity, acceleration, and jerk magnitudes per joint.
///
/// Each field is one frame-gap shorter than the one before it: a sequence of
/// `F` frames yields `(F-1, J)`, `(F-2, J)`, and `(F-3, J)` matrices. Fields
/// that would have a non-positive length are empty and aggregate to 0.
#[derive(Debug, Clone, PartialEq)]
pub struct KinematicFields {
    pub velocity: Array2<f64>,
    pub acceleration: Array2<f64>,
    pub jerk: Array2<f64>,
}

impl KinematicFields {
    /// Differentiate positions up to third order
    pub fn from_sequence(sequence: &JointSequence) -> Self {
        let velocity = diff_frames(sequence.positions());
        let acceleration = diff_frames(velocity.view());
        let jerk = diff_frames(acceleration.view());

        Self {
            velocity: magnitudes(&velocity),
            acceleration: magnitudes(&acceleration),
            jerk: magnitudes(&jerk),
        }
    }

    pub fn n_joints(&self) -> usize {
        self.velocity.ncols()
    }

    pub fn speeds(&self) -> Vec<f64> {
        self.velocity.iter().copied().collect()
    }

    pub fn mean_speed(&self) -> f64 {
        mean(&self.speeds())
    }

    pub fn max_speed(&self) -> f64 {
        self.velocity.iter().cloned().fold(0.0, f64::max)
    }

    pub fn speed_std(&self) -> f64 {
        population_variance(&self.speeds()).sqrt()
    }

    pub fn mean_acceleration(&self) -> f64 {
        mean(&self.acceleration.iter().copied().collect::<Vec<_>>())
    }

    pub fn mean_jerk(&self) -> f64 {
        mean(&self.jerk.iter().copied().collect::<Vec<_>>())
    }

    /// Mean speed of a single joint across all frame-gaps
    pub fn joint_mean_speed(&self, joint: usize) -> f64 {
        if joint >= self.n_joints() {
            return 0.0;
        }
        mean(&self.velocity.column(joint).to_vec())
    }

    /// Population variance of each joint's speed across frame-gaps
    pub fn joint_speed_variances(&self) -> Vec<f64> {
        self.velocity
            .axis_iter(Axis(1))
            .map(|column| population_variance(&column.to_vec()))
            .collect()
    }
}

/// Differentiate a joint sequence
pub fn differentiate(sequence: &JointSequence) -> KinematicFields {
    KinematicFields::from_sequence(sequence)
}

/// First difference along the frame axis
fn diff_frames(data: ArrayView3<'_, f64>) -> Array3<f64> {
    let (n_frames, n_joints, n_coords) = data.dim();
    if n_frames < 2 {
        return Array3::zeros((0, n_joints, n_coords));
    }
    &data.slice(s![1.., .., ..]) - &data.slice(s![..n_frames - 1, .., ..])
}

/// Euclidean norm over the coordinate axis
fn magnitudes(data: &Array3<f64>) -> Array2<f64> {
    data.map_axis(Axis(2), |v| v.dot(&v).sqrt())
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Variance with `ddof = 0`
pub(crate) fn population_variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = mean(values);
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn linear_sequence(n_frames: usize, n_joints: usize) -> JointSequence {
        let data = Array3::from_shape_fn((n_frames, n_joints, 3), |(f, j, c)| {
            let step = [0.01, 0.01, 0.005][c];
            j as f64 * 0.1 + f as f64 * step
        });
        JointSequence::from_array(data).unwrap()
    }

    #[test]
    fn test_field_lengths() {
        let fields = differentiate(&linear_sequence(5, 17));
        assert_eq!(fields.velocity.dim(), (4, 17));
        assert_eq!(fields.acceleration.dim(), (3, 17));
        assert_eq!(fields.jerk.dim(), (2, 17));
    }

    #[test]
    fn test_linear_motion_has_constant_speed() {
        let fields = differentiate(&linear_sequence(5, 17));
        let expected = (0.01f64.powi(2) * 2.0 + 0.005f64.powi(2)).sqrt();

        for v in fields.velocity.iter() {
            assert!((v - expected).abs() < 1e-12);
        }
        assert!(fields.mean_acceleration() < 1e-12);
        assert!(fields.mean_jerk() < 1e-12);
        assert!(fields.speed_std() < 1e-12);
    }

    #[test]
    fn test_short_sequences_aggregate_to_zero() {
        let fields = differentiate(&linear_sequence(2, 3));
        assert_eq!(fields.velocity.nrows(), 1);
        assert_eq!(fields.acceleration.nrows(), 0);
        assert_eq!(fields.jerk.nrows(), 0);
        assert_eq!(fields.mean_acceleration(), 0.0);
        assert_eq!(fields.mean_jerk(), 0.0);

        let fields = differentiate(&linear_sequence(1, 3));
        assert_eq!(fields.velocity.nrows(), 0);
        assert_eq!(fields.mean_speed(), 0.0);
        assert_eq!(fields.max_speed(), 0.0);
        assert_eq!(fields.joint_speed_variances(), vec![0.0; 3]);
    }

    #[test]
    fn test_acceleration_uses_vector_difference() {
        // Joint reverses direction at constant speed: speed delta is 0,
        // but the velocity vector flips, so acceleration is not
        let data = Array3::from_shape_fn((3, 1, 3), |(f, _, c)| {
            if c == 0 {
                [0.0, 1.0, 0.0][f]
            } else {
                0.0
            }
        });
        let fields = differentiate(&JointSequence::from_array(data).unwrap());
        assert!((fields.mean_speed() - 1.0).abs() < 1e-12);
        assert!((fields.mean_acceleration() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_population_statistics() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert!((population_variance(&values) - 1.25).abs() < 1e-12);
        assert_eq!(population_variance(&[]), 0.0);
        assert_eq!(mean(&[]), 0.0);
    }
}
