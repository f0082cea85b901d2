//! Mode seeking: candidate peaks and the mean shift that converges them.

mod mean_shift;
mod peaks;

pub use mean_shift::{
    mean_shift, ms_center, prefilter_peaks, select_mode, MeanShiftOptions, MeanShiftOutcome,
    MeanShiftState,
};
pub use peaks::{find_peaks, Peak, PeakParams};
