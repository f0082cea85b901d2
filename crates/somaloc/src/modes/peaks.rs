//! Local-maximum detection inside a cell stack.
//!
//! A voxel is a peak when it clears the intensity threshold and dominates
//! every other voxel within an anisotropic radius. The peaks seed the mean
//! shift, so the current stack center is always appended as a fallback.

use crate::cell::CellStack;
use crate::geometry::ball_offsets;

/// A candidate mode location in cell-stack coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Peak {
    /// Voxel position (crop-local).
    pub position: [i32; 3],
    /// Intensity at `position` (0 when the position is outside the crop).
    pub intensity: u16,
}

/// Parameters for [`find_peaks`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakParams {
    /// Non-maximum suppression radius (anisotropic, xy-voxel units).
    pub radius: f64,
    /// Minimum intensity for a peak.
    pub threshold: f64,
    /// Optional cap on detected peaks (brightest kept); the fallback center
    /// is appended after the cap.
    pub max_peaks: Option<usize>,
}

/// Detect local maxima, brightest first, with the stack center appended.
///
/// Equal-intensity neighbors within `radius` are resolved in favor of the
/// earlier voxel in z/y/x scan order, so a plateau yields one peak. Peaks of
/// equal intensity keep scan order.
pub fn find_peaks(stack: &CellStack, params: &PeakParams) -> Vec<Peak> {
    let mut peaks = Vec::new();
    if !stack.is_empty() {
        let nms: Vec<[i32; 3]> = ball_offsets(params.radius, stack.z_scale())
            .into_iter()
            .map(|o| o.d)
            .filter(|d| *d != [0, 0, 0])
            .collect();

        let raw = stack.raw();
        for (idx, &val) in raw.iter().enumerate() {
            if (val as f64) < params.threshold {
                continue;
            }
            let p = stack.position_of(idx);
            let mut is_max = true;
            for d in &nms {
                let q = [p[0] + d[0], p[1] + d[1], p[2] + d[2]];
                let Some(qv) = stack.voxel(q) else {
                    continue;
                };
                if qv > val || (qv == val && stack.linear_index(q) < idx) {
                    is_max = false;
                    break;
                }
            }
            if is_max {
                peaks.push(Peak {
                    position: p,
                    intensity: val,
                });
            }
        }

        // Stable sort keeps scan order among equal intensities.
        peaks.sort_by(|a, b| b.intensity.cmp(&a.intensity));
        if let Some(max_peaks) = params.max_peaks {
            peaks.truncate(max_peaks);
        }
    }

    let center = stack.center();
    peaks.push(Peak {
        position: center,
        intensity: stack.voxel(center).unwrap_or(0),
    });
    tracing::debug!(
        "{} peaks above {:.2} (radius {:.1}) plus center",
        peaks.len() - 1,
        params.threshold,
        params.radius
    );
    peaks
}
