//! # Gait-Core
//!
//! Turns a clip of tracked body joints into the fixed 14-dimensional
//! handcrafted feature vector (HCF) consumed by the emotion classifier.
//!
//! ## Pipeline
//!
//! 1. **Normalization** - parse the raw clip, recenter on the root joint, pad to
//!    a minimum frame count
//! 2. **Kinematics** - velocity, acceleration, and jerk magnitudes per joint
//! 3. **Features** - kinematics, body parts, volume, posture, joint variance

pub mod error;
pub mod features;
pub mod kinematics;
pub mod normalize;
pub mod types;

pub use error::{Error, Result};
pub use features::*;
pub use kinematics::*;
pub use normalize::*;
pub use types::*;
