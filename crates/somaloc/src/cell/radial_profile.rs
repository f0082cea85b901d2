//! Radial intensity profile, foreground/background threshold and radius.

use super::neighborhood::{layer_mean, shell_mean, sphere_mean};
use super::stack::CellStack;
use crate::error::RefineError;

/// Mean intensity of one-voxel-thick shells `[r, r+1)` around the center,
/// for `r = 0..=max_radius`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RadialProfile {
    values: Vec<f64>,
}

impl RadialProfile {
    /// Wrap precomputed shell means (entry `r` is the shell `[r, r+1)`).
    pub fn from_values(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// Shell means indexed by radius.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Largest sampled radius; 0 for an empty profile.
    pub fn max_radius(&self) -> u32 {
        self.values.len().saturating_sub(1) as u32
    }
}

/// Sample the radial profile around the stack center.
///
/// A shell with no in-bounds voxel repeats the previous entry (0.0 when the
/// very first shell is empty), so the profile never has gaps.
pub fn radial_profile(stack: &CellStack, max_radius: u32) -> RadialProfile {
    let center = stack.center();
    let mut values = Vec::with_capacity(max_radius as usize + 1);
    let mut prev = 0.0f64;
    let mut n_empty = 0usize;
    for r in 0..=max_radius {
        let r = r as f64;
        let v = match layer_mean(stack, center, r, r + 1.0) {
            Some(v) => v,
            None => {
                n_empty += 1;
                prev
            }
        };
        values.push(v);
        prev = v;
    }
    if n_empty > 0 {
        tracing::debug!(
            "radial profile around {:?}: {} of {} shells empty",
            center,
            n_empty,
            values.len()
        );
    }
    RadialProfile { values }
}

/// First radius whose shell mean drops below `threshold`.
///
/// Returns the profile's last radius when no entry falls below. This is a
/// plain first-crossing rule: a noisy dip ends the search early.
pub fn radius_threshold(profile: &RadialProfile, threshold: f64) -> u32 {
    profile
        .values
        .iter()
        .position(|&v| v < threshold)
        .map_or(profile.max_radius(), |r| r as u32)
}

/// Blend of the spot mean and the background shell mean:
/// `w * sphere(r_spot) + (1 - w) * shell(r_back_lo, r_back_hi)`.
pub fn local_mean_threshold(
    stack: &CellStack,
    r_spot: f64,
    r_back_lo: f64,
    r_back_hi: f64,
    weight: f64,
) -> Result<f64, RefineError> {
    let center = stack.center();
    let spot = sphere_mean(stack, center, r_spot).ok_or(RefineError::DegenerateNeighborhood {
        stage: "spot mean",
    })?;
    let back = shell_mean(stack, center, r_back_lo, r_back_hi).ok_or(
        RefineError::DegenerateNeighborhood {
            stage: "background mean",
        },
    )?;
    tracing::debug!("spot mean {:.2}, background mean {:.2}", spot, back);
    Ok(weight * spot + (1.0 - weight) * back)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::test_utils::{blob_volume, impulse_volume};

    #[test]
    fn impulse_profile_drops_after_first_shell() {
        let vol = impulse_volume([21, 21, 21], 1.0, [10, 10, 10], 255);
        let mut cs = CellStack::extract(&vol, [10, 10, 10], 20);
        cs.set_center([10, 10, 10]);
        let profile = radial_profile(&cs, 5);
        assert_eq!(profile.values().len(), 6);
        assert_eq!(profile.max_radius(), 5);
        assert_relative_eq!(profile.values()[0], 255.0);
        assert!(profile.values()[1..].iter().all(|&v| v == 0.0));
        assert_eq!(radius_threshold(&profile, 128.0), 1);
    }

    #[test]
    fn radius_threshold_without_crossing_returns_max_radius() {
        let profile = RadialProfile::from_values(vec![9.0, 8.0, 7.0, 6.0]);
        assert_eq!(radius_threshold(&profile, 1.0), 3);
        assert_eq!(radius_threshold(&profile, 7.5), 2);
        assert_eq!(radius_threshold(&profile, 100.0), 0);
    }

    #[test]
    fn radius_threshold_is_first_crossing() {
        // A dip at r = 2 ends the search even though r = 3 recovers.
        let profile = RadialProfile::from_values(vec![100.0, 90.0, 40.0, 95.0, 10.0]);
        assert_eq!(radius_threshold(&profile, 50.0), 2);
    }

    #[test]
    fn radius_is_non_increasing_in_threshold() {
        let vol = blob_volume([41, 41, 41], 1.0, &[([20.0, 20.0, 20.0], 5.0, 1000.0)]);
        let cs = CellStack::extract(&vol, [20, 20, 20], 40);
        let profile = radial_profile(&cs, 15);
        let mut last = u32::MAX;
        for t in (0..=1000).step_by(25) {
            let r = radius_threshold(&profile, t as f64);
            assert!(r <= last, "threshold {} gave radius {} > {}", t, r, last);
            last = r;
        }
    }

    #[test]
    fn blob_profile_decreases() {
        let vol = blob_volume([41, 41, 41], 0.5, &[([20.0, 20.0, 20.0], 4.0, 1000.0)]);
        let cs = CellStack::extract(&vol, [20, 20, 20], 40);
        let profile = radial_profile(&cs, 10);
        for w in profile.values().windows(2) {
            assert!(w[1] <= w[0] + 1.0, "{:?}", profile.values());
        }
    }

    #[test]
    fn empty_shells_repeat_previous_value() {
        let vol = impulse_volume([5, 5, 5], 1.0, [2, 2, 2], 40);
        let mut cs = CellStack::extract(&vol, [2, 2, 2], 4);
        cs.set_center([2, 2, 2]);
        let profile = radial_profile(&cs, 12);
        let v = profile.values();
        assert_eq!(v.len(), 13);
        // Beyond the crop corner every shell is empty.
        assert_eq!(v[12], v[11]);
    }

    #[test]
    fn local_mean_threshold_blends_spot_and_background() {
        let vol = blob_volume([31, 31, 31], 1.0, &[([15.0, 15.0, 15.0], 3.0, 500.0)]);
        let cs = CellStack::extract(&vol, [15, 15, 15], 30);
        let c = cs.center();
        let spot = sphere_mean(&cs, c, 3.0).unwrap();
        let back = shell_mean(&cs, c, 5.0, 10.0).unwrap();
        assert!(spot > back);
        let t = local_mean_threshold(&cs, 3.0, 5.0, 10.0, 0.4).unwrap();
        assert_relative_eq!(t, 0.4 * spot + 0.6 * back, epsilon = 1e-9);
        assert_relative_eq!(
            local_mean_threshold(&cs, 3.0, 5.0, 10.0, 1.0).unwrap(),
            spot,
            epsilon = 1e-9
        );
    }

    #[test]
    fn local_mean_threshold_reports_empty_background() {
        let vol = impulse_volume([9, 9, 9], 1.0, [4, 4, 4], 10);
        let cs = CellStack::extract(&vol, [4, 4, 4], 8);
        assert_eq!(
            local_mean_threshold(&cs, 1.0, 30.0, 40.0, 0.5),
            Err(RefineError::DegenerateNeighborhood {
                stage: "background mean"
            })
        );
    }
}
