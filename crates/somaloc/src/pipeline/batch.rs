use rayon::prelude::*;

use super::result::{BatchResult, BatchSummary, CellResult};
use super::run::refine_seed;
use crate::config::RefineConfig;
use crate::error::RefineError;
use crate::volume::VoxelSource;

/// Refine every seed in order on the calling thread.
///
/// Only an invalid `config` fails the batch; per-seed failures are reported
/// as results with status `Failed`.
pub fn refine_cells<V: VoxelSource + ?Sized>(
    volume: &V,
    seeds: &[[i32; 3]],
    config: &RefineConfig,
) -> Result<BatchResult, RefineError> {
    config.validate()?;
    let cells: Vec<CellResult> = seeds
        .iter()
        .map(|&seed| refine_seed(volume, seed, config))
        .collect();
    Ok(finish(volume, cells))
}

/// Parallel [`refine_cells`] on the rayon pool. Results keep seed order.
pub fn refine_cells_par<V: VoxelSource + Sync + ?Sized>(
    volume: &V,
    seeds: &[[i32; 3]],
    config: &RefineConfig,
) -> Result<BatchResult, RefineError> {
    config.validate()?;
    let cells: Vec<CellResult> = seeds
        .par_iter()
        .map(|&seed| refine_seed(volume, seed, config))
        .collect();
    Ok(finish(volume, cells))
}

fn finish<V: VoxelSource + ?Sized>(volume: &V, cells: Vec<CellResult>) -> BatchResult {
    let summary = BatchSummary::from_cells(&cells);
    tracing::info!(
        "{} seeds: {} refined, {} skipped on border, {} failed",
        cells.len(),
        summary.n_refined,
        summary.n_skipped,
        summary.n_failed
    );
    BatchResult {
        cells,
        volume_size: volume.dimensions(),
        z_scale: volume.z_scale(),
        summary,
    }
}
