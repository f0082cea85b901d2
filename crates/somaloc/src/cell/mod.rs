//! Per-seed cell stack and the sampling primitives that run on it.
//!
//! - `stack`: cubic crop around a seed, clamped to the volume.
//! - `neighborhood`: sphere/shell means under the anisotropic metric.
//! - `local_max`: 26-neighborhood hill climb.
//! - `radial_profile`: shell-mean profile, threshold and radius estimate.

mod local_max;
mod neighborhood;
mod radial_profile;
mod stack;

pub use local_max::local_max;
pub use neighborhood::{layer_mean, shell_mean, sphere_mean};
pub use radial_profile::{local_mean_threshold, radial_profile, radius_threshold, RadialProfile};
pub use stack::CellStack;
