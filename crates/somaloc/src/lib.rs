//! somaloc: center and radius refinement for cells in 3D fluorescence
//! image stacks.
//!
//! Given an intensity volume with anisotropic z sampling and approximate
//! seed positions from an external detector, each seed is refined in
//! stages:
//!
//! 1. **Crop** – cubic cell stack around the seed, flagged when clamped by
//!    the volume border.
//! 2. **Recenter** – 26-neighborhood hill climb to the nearest local maximum.
//! 3. **Radius** – foreground/background threshold from a spot sphere and a
//!    background shell, then the first radius where the radial profile
//!    falls below it.
//! 4. **Modes** – local maxima inside the stack seed a Gaussian-kernel mean
//!    shift; the mode nearest the center becomes the centroid.
//! 5. **Second pass** – threshold and radius re-estimated around the
//!    centroid.
//!
//! All distances use `sqrt(dx² + dy² + (dz/s)²)` with `s` the z-scale.
//!
//! # Public API
//! - [`Refiner`], [`refine_cell`] and the batch functions as entry points
//! - [`RefineConfig`] for tuning
//! - [`VoxelSource`] / [`Volume`] for input
//! - [`cell`] and [`modes`] for the individual stages

mod api;
pub mod cell;
mod config;
mod error;
mod geometry;
pub mod modes;
mod pipeline;
mod volume;

#[cfg(test)]
pub(crate) mod test_utils;

pub use api::Refiner;
pub use config::{
    BorderPolicy, LocalMeanParams, MeanShiftParams, PeakSearchParams, RefineConfig,
    SecondPassParams,
};
pub use error::RefineError;
pub use geometry::{anisotropic_distance, gaussian_kernel};
pub use pipeline::{
    refine_cell, refine_cells, refine_cells_par, BatchResult, BatchSummary, CellResult,
    CellStatus, RefineDiagnostics,
};
pub use volume::{Slice16, Volume, VolumeError, VoxelSource};
