use std::path::Path;
use std::time::Duration;

use crate::error::RefineError;
use crate::modes::MeanShiftOptions;

/// Radii and weight of the foreground/background threshold.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LocalMeanParams {
    /// Radius of the spot (foreground) sphere.
    pub spot_radius: f64,
    /// Inner radius of the background shell.
    pub background_inner: f64,
    /// Outer radius of the background shell.
    pub background_outer: f64,
    /// Weight of the spot mean in [0, 1].
    pub weight: f64,
}

impl Default for LocalMeanParams {
    fn default() -> Self {
        Self {
            spot_radius: 13.0,
            background_inner: 18.0,
            background_outer: 40.0,
            weight: 0.4,
        }
    }
}

/// Candidate-peak detection controls.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PeakSearchParams {
    /// Suppression radius. `None` uses the estimated cell radius.
    pub radius: Option<f64>,
    /// Intensity floor applied on top of the local-mean threshold.
    pub noise_threshold: f64,
    /// Optional cap on the number of peaks fed to the mean shift.
    pub max_peaks: Option<usize>,
}

impl Default for PeakSearchParams {
    fn default() -> Self {
        Self {
            radius: None,
            noise_threshold: 0.0,
            max_peaks: None,
        }
    }
}

/// Mean-shift controls.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct MeanShiftParams {
    /// Gaussian kernel bandwidth σ.
    pub bandwidth: f64,
    /// Fixed iteration budget.
    pub iterations: usize,
    /// Neighborhood radius. `None` uses the estimated cell radius.
    pub radius: Option<f64>,
    /// Opt-in early stop: maximum per-iteration mode displacement.
    pub convergence_tol: Option<f64>,
    /// Opt-in wall-clock cap per cell, in milliseconds.
    pub max_duration_ms: Option<u64>,
}

impl Default for MeanShiftParams {
    fn default() -> Self {
        Self {
            bandwidth: 10.0,
            iterations: 15,
            radius: None,
            convergence_tol: None,
            max_duration_ms: None,
        }
    }
}

impl MeanShiftParams {
    /// Resolve runtime options against the estimated radius and threshold.
    pub fn options(&self, estimated_radius: f64, threshold: f64) -> MeanShiftOptions {
        MeanShiftOptions {
            radius: self.radius.unwrap_or(estimated_radius),
            bandwidth: self.bandwidth,
            threshold,
            iterations: self.iterations,
            convergence_tol: self.convergence_tol,
            max_duration: self.max_duration_ms.map(Duration::from_millis),
        }
    }
}

/// Re-estimation of threshold and radius around the refined centroid.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SecondPassParams {
    /// Enable the second pass.
    pub enable: bool,
    /// Spot radius is `radius - margin`, background shell starts at
    /// `radius + margin`.
    pub margin: u32,
}

impl Default for SecondPassParams {
    fn default() -> Self {
        Self {
            enable: true,
            margin: 2,
        }
    }
}

/// What to do with a seed whose crop was clamped by the volume boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BorderPolicy {
    /// Report the cell as skipped without analysis.
    #[default]
    Skip,
    /// Analyze the clamped crop and flag the result as on-border.
    Analyze,
}

/// Full refinement configuration.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RefineConfig {
    /// Side length of the cubic crop around each seed (xy voxels).
    pub cube_dim: usize,
    /// Move the center to the nearest local maximum before profiling.
    pub recenter_on_local_max: bool,
    /// Foreground/background threshold radii and weight.
    pub local_mean: LocalMeanParams,
    /// Largest radius sampled by the radial profile.
    pub max_profile_radius: u32,
    /// Candidate-peak detection.
    pub peaks: PeakSearchParams,
    /// Mean-shift mode seeking.
    pub mean_shift: MeanShiftParams,
    /// Threshold/radius re-estimation after the centroid moves.
    pub second_pass: SecondPassParams,
    /// Handling of crops clamped by the volume boundary.
    pub border_policy: BorderPolicy,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            cube_dim: 70,
            recenter_on_local_max: true,
            local_mean: LocalMeanParams::default(),
            max_profile_radius: 40,
            peaks: PeakSearchParams::default(),
            mean_shift: MeanShiftParams::default(),
            second_pass: SecondPassParams::default(),
            border_policy: BorderPolicy::Skip,
        }
    }
}

impl RefineConfig {
    /// Load a (possibly partial) configuration from JSON; missing fields
    /// take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let data = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Check parameter ranges.
    pub fn validate(&self) -> Result<(), RefineError> {
        let fail = |msg: String| Err(RefineError::InvalidConfig(msg));
        if self.cube_dim == 0 {
            return fail("cube_dim must be positive".to_string());
        }
        let lm = &self.local_mean;
        if !(0.0..=1.0).contains(&lm.weight) {
            return fail(format!("local_mean.weight must be in [0, 1], got {}", lm.weight));
        }
        // No neighborhood can usefully reach beyond the crop.
        let limit = self.cube_dim as f64;
        let radius_ok = |r: f64| (0.0..=limit).contains(&r);
        if !(radius_ok(lm.spot_radius)
            && radius_ok(lm.background_inner)
            && radius_ok(lm.background_outer))
        {
            return fail(format!("local_mean radii must be in [0, cube_dim = {}]", limit));
        }
        if lm.background_outer < lm.background_inner {
            return fail(format!(
                "local_mean.background_outer ({}) < background_inner ({})",
                lm.background_outer, lm.background_inner
            ));
        }
        if self.max_profile_radius as usize > self.cube_dim {
            return fail(format!(
                "max_profile_radius ({}) exceeds cube_dim ({})",
                self.max_profile_radius, self.cube_dim
            ));
        }
        if self.second_pass.margin > self.max_profile_radius {
            return fail(format!(
                "second_pass.margin ({}) exceeds max_profile_radius ({})",
                self.second_pass.margin, self.max_profile_radius
            ));
        }
        let ms = &self.mean_shift;
        if !(ms.bandwidth.is_finite() && ms.bandwidth > 0.0) {
            return fail(format!(
                "mean_shift.bandwidth must be positive, got {}",
                ms.bandwidth
            ));
        }
        if !(ms.radius.map_or(true, radius_ok) && self.peaks.radius.map_or(true, radius_ok)) {
            return fail(format!("search radii must be in [0, cube_dim = {}]", limit));
        }
        if ms.convergence_tol.is_some_and(|t| t < 0.0) {
            return fail("mean_shift.convergence_tol must be non-negative".to_string());
        }
        Ok(())
    }
}
