//! # Gait-Emotion
//!
//! Emotion classification over the 14-dimensional gait feature vector.
//!
//! ## Strategies
//!
//! - **Model-based** - a persisted estimator, optionally wrapped in a bundle
//!   with a feature scaler and label encoder
//! - **Rule-based** - deterministic threshold scoring over six categories,
//!   used when no usable artifact is loaded or a model call fails
//!
//! Every prediction is then annotated with a confidence tier and an optional
//! warning for display.

pub mod analyzer;
pub mod artifact;
pub mod classifier;
pub mod confidence;
pub mod emotion;
pub mod error;
pub mod estimator;
pub mod rules;

pub use analyzer::*;
pub use artifact::*;
pub use classifier::*;
pub use confidence::*;
pub use emotion::*;
pub use error::*;
pub use estimator::*;
pub use rules::*;
