//! Intensity-weighted Gaussian mean shift over a cell stack.
//!
//! Every candidate moves to the kernel- and intensity-weighted centroid of
//! the above-threshold voxels within `radius` of it. The update is
//! synchronous and runs for a fixed iteration budget unless an early-stop
//! tolerance or time cap is configured. The mode closest to the stack
//! center becomes the refined centroid.

use std::time::{Duration, Instant};

use nalgebra::Vector3;

use super::peaks::Peak;
use crate::cell::CellStack;
use crate::geometry::{anisotropic_distance, ball_offsets, gaussian_kernel};

/// Runtime parameters of one mean-shift run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeanShiftOptions {
    /// Neighborhood radius (anisotropic, xy-voxel units). Also the pre-filter
    /// distance from the stack center.
    pub radius: f64,
    /// Gaussian kernel bandwidth σ.
    pub bandwidth: f64,
    /// Voxels below this intensity carry no weight.
    pub threshold: f64,
    /// Iteration budget.
    pub iterations: usize,
    /// Stop once no mode moves farther than this in one iteration.
    pub convergence_tol: Option<f64>,
    /// Stop between iterations once this much time has elapsed.
    pub max_duration: Option<Duration>,
}

/// Mode estimates after a mean-shift run.
#[derive(Debug, Clone, PartialEq)]
pub struct MeanShiftState {
    /// One mode per input candidate, in input order.
    pub modes: Vec<[i32; 3]>,
    /// Iterations actually performed.
    pub iterations_run: usize,
    /// True when the convergence tolerance stopped the run early.
    pub converged: bool,
}

/// Result of [`ms_center`].
#[derive(Debug, Clone, PartialEq)]
pub struct MeanShiftOutcome {
    /// Selected mode in cell-stack coordinates.
    pub centroid: [i32; 3],
    /// Full run state.
    pub state: MeanShiftState,
    /// Number of peaks dropped by the distance pre-filter.
    pub n_rejected: usize,
}

/// Neighborhood offsets with their precomputed kernel weights.
struct WeightedBall {
    offsets: Vec<[i32; 3]>,
    kernel: Vec<f64>,
}

impl WeightedBall {
    fn new(radius: f64, bandwidth: f64, z_scale: f64) -> Self {
        let ball = ball_offsets(radius, z_scale);
        let kernel = ball
            .iter()
            .map(|o| gaussian_kernel(o.dist_sq.sqrt(), bandwidth))
            .collect();
        let offsets = ball.into_iter().map(|o| o.d).collect();
        Self { offsets, kernel }
    }
}

/// One mean-shift step from `x`. `None` when no voxel carries weight.
fn shift_point(
    stack: &CellStack,
    x: [i32; 3],
    ball: &WeightedBall,
    threshold: f64,
) -> Option<[i32; 3]> {
    let mut numerator = Vector3::<f64>::zeros();
    let mut denominator = 0.0f64;
    for (d, &k) in ball.offsets.iter().zip(&ball.kernel) {
        let p = [x[0] + d[0], x[1] + d[1], x[2] + d[2]];
        let Some(v) = stack.voxel(p) else {
            continue;
        };
        let v = v as f64;
        if v < threshold {
            continue;
        }
        let w = k * v;
        numerator += Vector3::new(p[0] as f64, p[1] as f64, p[2] as f64) * w;
        denominator += w;
    }
    if denominator <= 0.0 || !denominator.is_finite() {
        return None;
    }
    let m = numerator / denominator;
    Some([m.x as i32, m.y as i32, m.z as i32])
}

/// Keep the peaks within `radius` of the stack center.
pub fn prefilter_peaks(stack: &CellStack, peaks: &[Peak], radius: f64) -> Vec<[i32; 3]> {
    let center = stack.center();
    let s = stack.z_scale();
    peaks
        .iter()
        .map(|p| p.position)
        .filter(|&p| anisotropic_distance(p, center, s) <= radius)
        .collect()
}

/// Run the synchronous mean shift from `seeds`.
///
/// A candidate whose neighborhood carries zero weight stays where it is for
/// that iteration.
pub fn mean_shift(
    stack: &CellStack,
    seeds: Vec<[i32; 3]>,
    opts: &MeanShiftOptions,
) -> MeanShiftState {
    let s = stack.z_scale();
    let ball = WeightedBall::new(opts.radius, opts.bandwidth, s);
    let started = Instant::now();

    let mut modes = seeds;
    let mut iterations_run = 0usize;
    let mut converged = false;
    let mut next = Vec::with_capacity(modes.len());

    while iterations_run < opts.iterations && !modes.is_empty() {
        next.clear();
        let mut max_move = 0.0f64;
        let mut n_stalled = 0usize;
        for &x in &modes {
            let moved = match shift_point(stack, x, &ball, opts.threshold) {
                Some(m) => m,
                None => {
                    n_stalled += 1;
                    x
                }
            };
            max_move = max_move.max(anisotropic_distance(x, moved, s));
            next.push(moved);
        }
        std::mem::swap(&mut modes, &mut next);
        iterations_run += 1;

        tracing::trace!(
            "mean shift iteration {}: max move {:.3}, {} stalled",
            iterations_run,
            max_move,
            n_stalled
        );

        if let Some(tol) = opts.convergence_tol {
            if max_move <= tol {
                converged = true;
                break;
            }
        }
        if let Some(limit) = opts.max_duration {
            if started.elapsed() >= limit {
                tracing::warn!(
                    "mean shift stopped after {} iterations: time limit {:?} reached",
                    iterations_run,
                    limit
                );
                break;
            }
        }
    }

    MeanShiftState {
        modes,
        iterations_run,
        converged,
    }
}

/// Mode closest to `center` (first one on ties).
pub fn select_mode(modes: &[[i32; 3]], center: [i32; 3], z_scale: f64) -> Option<[i32; 3]> {
    let mut best: Option<([i32; 3], f64)> = None;
    for &m in modes {
        let d = anisotropic_distance(m, center, z_scale);
        if best.map_or(true, |(_, bd)| d < bd) {
            best = Some((m, d));
        }
    }
    best.map(|(m, _)| m)
}

/// Pre-filter `peaks`, run the mean shift and select the centroid.
///
/// Returns `None` when no peak lies within `opts.radius` of the center.
pub fn ms_center(
    stack: &CellStack,
    peaks: &[Peak],
    opts: &MeanShiftOptions,
) -> Option<MeanShiftOutcome> {
    let seeds = prefilter_peaks(stack, peaks, opts.radius);
    let n_rejected = peaks.len() - seeds.len();
    if seeds.is_empty() {
        tracing::warn!("no mean-shift seed within {:.1} of the center", opts.radius);
        return None;
    }
    let state = mean_shift(stack, seeds, opts);
    let centroid = select_mode(&state.modes, stack.center(), stack.z_scale())?;
    tracing::debug!(
        "mean shift: {} seeds ({} rejected), {} iterations, centroid {:?}",
        state.modes.len(),
        n_rejected,
        state.iterations_run,
        centroid
    );
    Some(MeanShiftOutcome {
        centroid,
        state,
        n_rejected,
    })
}
