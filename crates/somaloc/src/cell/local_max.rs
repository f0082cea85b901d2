//! Discrete steepest-ascent hill climb over the 26-neighborhood.

use super::stack::CellStack;
use crate::error::RefineError;

/// The 26 neighbor offsets, z outer, y middle, x inner, most negative first.
const NEIGHBORS_26: [[i32; 3]; 26] = {
    let mut out = [[0i32; 3]; 26];
    let mut n = 0;
    let mut dz = -1;
    while dz <= 1 {
        let mut dy = -1;
        while dy <= 1 {
            let mut dx = -1;
            while dx <= 1 {
                if !(dx == 0 && dy == 0 && dz == 0) {
                    out[n] = [dx, dy, dz];
                    n += 1;
                }
                dx += 1;
            }
            dy += 1;
        }
        dz += 1;
    }
    out
};

/// Climb from `seed` to a local intensity maximum.
///
/// Each step moves to the brightest neighbor that is strictly brighter than
/// the current voxel (first in scan order on ties). Neighbors outside the
/// stack are skipped. Only the seed itself must be inside the stack.
pub fn local_max(stack: &CellStack, seed: [i32; 3]) -> Result<[i32; 3], RefineError> {
    let mut current = seed;
    let mut current_value = stack.voxel_checked(seed)?;
    let mut steps = 0usize;

    loop {
        let mut best: Option<([i32; 3], u16)> = None;
        for d in &NEIGHBORS_26 {
            let p = [current[0] + d[0], current[1] + d[1], current[2] + d[2]];
            let Some(v) = stack.voxel(p) else {
                continue;
            };
            let bar = best.map_or(current_value, |(_, bv)| bv);
            if v > bar {
                best = Some((p, v));
            }
        }
        match best {
            Some((p, v)) => {
                current = p;
                current_value = v;
                steps += 1;
            }
            None => break,
        }
    }

    tracing::trace!(
        "local max {:?} -> {:?} (value {}, {} steps)",
        seed,
        current,
        current_value,
        steps
    );
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{blob_volume, impulse_volume};

    #[test]
    fn neighbor_table_order() {
        assert_eq!(NEIGHBORS_26[0], [-1, -1, -1]);
        assert_eq!(NEIGHBORS_26[1], [0, -1, -1]);
        assert_eq!(NEIGHBORS_26[12], [-1, 0, 0]);
        assert_eq!(NEIGHBORS_26[13], [1, 0, 0]);
        assert_eq!(NEIGHBORS_26[14], [-1, 1, 0]);
        assert_eq!(NEIGHBORS_26[25], [1, 1, 1]);
        assert!(!NEIGHBORS_26.contains(&[0, 0, 0]));
    }

    #[test]
    fn adjacent_impulse_is_reached() {
        let vol = impulse_volume([21, 21, 21], 1.0, [10, 10, 10], 255);
        let cs = CellStack::extract(&vol, [10, 10, 10], 20);
        let seed = [9, 9, 9];
        assert_eq!(local_max(&cs, seed).unwrap(), [10, 10, 10]);
    }

    #[test]
    fn flat_region_does_not_move() {
        let vol = impulse_volume([21, 21, 21], 1.0, [10, 10, 10], 255);
        let cs = CellStack::extract(&vol, [10, 10, 10], 20);
        // Two voxels away every neighbor equals the seed: no strict ascent.
        assert_eq!(local_max(&cs, [8, 8, 8]).unwrap(), [8, 8, 8]);
    }

    #[test]
    fn climbs_smooth_blob_from_distance() {
        let vol = blob_volume([21, 21, 21], 1.0, &[([10.0, 10.0, 10.0], 3.0, 255.0)]);
        let cs = CellStack::extract(&vol, [10, 10, 10], 20);
        assert_eq!(local_max(&cs, [8, 8, 8]).unwrap(), [10, 10, 10]);
        assert_eq!(local_max(&cs, [14, 6, 12]).unwrap(), [10, 10, 10]);
    }

    #[test]
    fn idempotent_on_its_own_output() {
        let vol = blob_volume(
            [30, 30, 30],
            0.5,
            &[([8.0, 9.0, 10.0], 2.5, 200.0), ([20.0, 20.0, 16.0], 3.0, 180.0)],
        );
        let cs = CellStack::extract(&vol, [15, 15, 15], 30);
        for seed in [[3, 3, 3], [12, 12, 12], [25, 18, 10], [8, 9, 5]] {
            let Ok(m) = local_max(&cs, seed) else {
                continue;
            };
            assert_eq!(local_max(&cs, m).unwrap(), m);
        }
    }

    #[test]
    fn ties_pick_first_in_scan_order() {
        let mut vol = impulse_volume([9, 9, 9], 1.0, [3, 3, 3], 100);
        vol.set_voxel([5, 5, 5], 100);
        let cs = CellStack::extract(&vol, [4, 4, 4], 8);
        assert_eq!(local_max(&cs, [4, 4, 4]).unwrap(), [3, 3, 3]);
    }

    #[test]
    fn seed_outside_stack_is_an_error() {
        let vol = impulse_volume([9, 9, 9], 1.0, [4, 4, 4], 10);
        let cs = CellStack::extract(&vol, [4, 4, 4], 8);
        assert_eq!(
            local_max(&cs, [-1, 0, 0]),
            Err(RefineError::OutOfBounds { point: [-1, 0, 0] })
        );
    }
}
