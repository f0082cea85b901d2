use super::result::{CellResult, CellStatus, RefineDiagnostics};
use crate::cell::{
    local_max, local_mean_threshold, radial_profile, radius_threshold, CellStack,
};
use crate::config::{BorderPolicy, RefineConfig};
use crate::error::RefineError;
use crate::modes::{find_peaks, ms_center, PeakParams};
use crate::volume::VoxelSource;

/// Refine one seed into a cell center and radius.
///
/// Validates `config`, crops the volume around `seed` and runs the full
/// chain. A crop clamped by the volume boundary is reported as
/// [`CellStatus::SkippedOnBorder`] unless the border policy is
/// [`BorderPolicy::Analyze`].
pub fn refine_cell<V: VoxelSource + ?Sized>(
    volume: &V,
    seed: [i32; 3],
    config: &RefineConfig,
) -> Result<CellResult, RefineError> {
    config.validate()?;
    let stack = CellStack::extract(volume, seed, config.cube_dim);
    refine_stack(stack, config)
}

/// Batch variant: the config is assumed valid and failures become
/// [`CellStatus::Failed`] results.
pub(super) fn refine_seed<V: VoxelSource + ?Sized>(
    volume: &V,
    seed: [i32; 3],
    config: &RefineConfig,
) -> CellResult {
    let stack = CellStack::extract(volume, seed, config.cube_dim);
    let on_border = stack.on_border();
    refine_stack(stack, config).unwrap_or_else(|e| {
        tracing::warn!("seed {:?} failed: {}", seed, e);
        CellResult::failed(seed, on_border, &e)
    })
}

fn refine_stack(mut stack: CellStack, config: &RefineConfig) -> Result<CellResult, RefineError> {
    let seed = stack.seed();
    if stack.on_border() && config.border_policy == BorderPolicy::Skip {
        tracing::debug!("seed {:?} skipped: crop clamped by volume border", seed);
        return Ok(CellResult::skipped(seed));
    }

    let start = stack.center();
    stack.voxel_checked(start)?;
    let lmax = local_max(&stack, start)?;
    if config.recenter_on_local_max {
        stack.set_center(lmax);
    }

    let lm = &config.local_mean;
    let threshold = local_mean_threshold(
        &stack,
        lm.spot_radius,
        lm.background_inner,
        lm.background_outer,
        lm.weight,
    )?;
    let profile = radial_profile(&stack, config.max_profile_radius);
    let initial_radius = radius_threshold(&profile, threshold);
    tracing::debug!(
        "seed {:?}: threshold {:.2}, initial radius {}",
        seed,
        threshold,
        initial_radius
    );

    // A zero suppression radius would turn every bright voxel into a peak.
    let peak_radius = config
        .peaks
        .radius
        .unwrap_or(initial_radius as f64)
        .max(1.0);
    let peaks = find_peaks(
        &stack,
        &PeakParams {
            radius: peak_radius,
            threshold: threshold.max(config.peaks.noise_threshold),
            max_peaks: config.peaks.max_peaks,
        },
    );

    let ms_opts = config.mean_shift.options(initial_radius as f64, threshold);
    let mut ms_iterations = 0;
    let mut ms_converged = false;
    let mut n_rejected = 0;
    match ms_center(&stack, &peaks, &ms_opts) {
        Some(outcome) => {
            stack.set_center(outcome.centroid);
            ms_iterations = outcome.state.iterations_run;
            ms_converged = outcome.state.converged;
            n_rejected = outcome.n_rejected;
        }
        None => tracing::warn!("seed {:?}: mean shift found no mode, keeping center", seed),
    }

    let (radius, final_threshold) = if config.second_pass.enable {
        second_pass(&stack, config, initial_radius).unwrap_or_else(|e| {
            tracing::warn!("seed {:?}: second pass skipped: {}", seed, e);
            (initial_radius, threshold)
        })
    } else {
        (initial_radius, threshold)
    };

    let center = stack.to_volume(stack.center());
    tracing::debug!(
        "seed {:?} -> center {:?}, radius {}",
        seed,
        center,
        radius
    );
    Ok(CellResult {
        seed,
        center,
        radius,
        on_border: stack.on_border(),
        status: CellStatus::Refined,
        error: None,
        diagnostics: Some(RefineDiagnostics {
            local_max: stack.to_volume(lmax),
            threshold,
            initial_radius,
            final_threshold,
            n_peaks: peaks.len(),
            n_peaks_rejected: n_rejected,
            mean_shift_iterations: ms_iterations,
            mean_shift_converged: ms_converged,
        }),
    })
}

/// Threshold and radius around the refined center, with the spot sphere and
/// background shell placed `margin` inside and outside the first estimate.
fn second_pass(
    stack: &CellStack,
    config: &RefineConfig,
    radius: u32,
) -> Result<(u32, f64), RefineError> {
    let margin = config.second_pass.margin;
    let spot = radius.saturating_sub(margin) as f64;
    let back_lo = radius.saturating_add(margin) as f64;
    let back_hi = config.local_mean.background_outer.max(back_lo + 1.0);
    let threshold =
        local_mean_threshold(stack, spot, back_lo, back_hi, config.local_mean.weight)?;
    let profile = radial_profile(stack, config.max_profile_radius);
    Ok((radius_threshold(&profile, threshold), threshold))
}
