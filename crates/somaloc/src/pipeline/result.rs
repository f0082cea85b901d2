/// Outcome category of one seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellStatus {
    /// Center and radius were refined.
    Refined,
    /// The crop was clamped by the volume boundary and the border policy
    /// skips such cells.
    SkippedOnBorder,
    /// A stage failed; see [`CellResult::error`].
    Failed,
}

/// Intermediate values of one refinement, for inspection and tuning.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RefineDiagnostics {
    /// Local maximum reached from the seed (volume coordinates).
    pub local_max: [i32; 3],
    /// First-pass foreground/background threshold.
    pub threshold: f64,
    /// Radius estimated around the (recentered) seed.
    pub initial_radius: u32,
    /// Threshold used for the final radius.
    pub final_threshold: f64,
    /// Peaks found, including the appended center.
    pub n_peaks: usize,
    /// Peaks discarded by the mean-shift distance pre-filter.
    pub n_peaks_rejected: usize,
    /// Mean-shift iterations performed.
    pub mean_shift_iterations: usize,
    /// True when the opt-in convergence tolerance ended the mean shift.
    pub mean_shift_converged: bool,
}

/// Refinement result for one seed.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CellResult {
    /// Input seed (volume coordinates).
    pub seed: [i32; 3],
    /// Refined center (volume coordinates); the seed when not refined.
    pub center: [i32; 3],
    /// Estimated radius in xy voxels; 0 when not refined.
    pub radius: u32,
    /// The requested crop did not fit inside the volume.
    pub on_border: bool,
    pub status: CellStatus,
    /// Failure description when `status` is `Failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<RefineDiagnostics>,
}

impl CellResult {
    pub(crate) fn skipped(seed: [i32; 3]) -> Self {
        Self {
            seed,
            center: seed,
            radius: 0,
            on_border: true,
            status: CellStatus::SkippedOnBorder,
            error: None,
            diagnostics: None,
        }
    }

    pub(crate) fn failed(seed: [i32; 3], on_border: bool, error: &crate::RefineError) -> Self {
        Self {
            seed,
            center: seed,
            radius: 0,
            on_border,
            status: CellStatus::Failed,
            error: Some(error.to_string()),
            diagnostics: None,
        }
    }

    /// True when center and radius were refined.
    pub fn is_refined(&self) -> bool {
        self.status == CellStatus::Refined
    }
}

/// Per-status counts of a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BatchSummary {
    pub n_refined: usize,
    pub n_skipped: usize,
    pub n_failed: usize,
}

impl BatchSummary {
    /// Count statuses over `cells`.
    pub fn from_cells(cells: &[CellResult]) -> Self {
        let mut s = Self::default();
        for c in cells {
            match c.status {
                CellStatus::Refined => s.n_refined += 1,
                CellStatus::SkippedOnBorder => s.n_skipped += 1,
                CellStatus::Failed => s.n_failed += 1,
            }
        }
        s
    }
}

/// Results for all seeds of one volume, in seed order.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BatchResult {
    pub cells: Vec<CellResult>,
    /// Volume dimensions [width, height, depth].
    pub volume_size: [usize; 3],
    pub z_scale: f64,
    pub summary: BatchSummary,
}
