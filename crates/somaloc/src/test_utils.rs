//! Synthetic volumes and configs shared by unit tests.

use crate::config::RefineConfig;
use crate::volume::{Volume, VoxelSource};

/// Zero volume with a single bright voxel.
pub(crate) fn impulse_volume(dims: [usize; 3], z_scale: f64, at: [i32; 3], value: u16) -> Volume {
    let mut vol = Volume::filled(dims, z_scale, 0).unwrap();
    vol.set_voxel(at, value);
    vol
}

/// Sum of isotropic (in physical units) Gaussian blobs, rounded to `u16`.
///
/// Each blob is `(center, sigma, amplitude)` with `center` in voxel
/// coordinates; z offsets are scaled by `1 / z_scale` before evaluation.
pub(crate) fn blob_volume(
    dims: [usize; 3],
    z_scale: f64,
    blobs: &[([f64; 3], f64, f64)],
) -> Volume {
    Volume::from_fn(dims, z_scale, |x, y, z| {
        let mut v = 0.0f64;
        for &(c, sigma, amp) in blobs {
            let dx = x as f64 - c[0];
            let dy = y as f64 - c[1];
            let dz = (z as f64 - c[2]) / z_scale;
            let d2 = dx * dx + dy * dy + dz * dz;
            v += amp * (-0.5 * d2 / (sigma * sigma)).exp();
        }
        v.round().clamp(0.0, u16::MAX as f64) as u16
    })
    .unwrap()
}

/// Configuration scaled down for the ~40-voxel test volumes.
pub(crate) fn small_config() -> RefineConfig {
    let mut cfg = RefineConfig {
        cube_dim: 30,
        max_profile_radius: 14,
        ..Default::default()
    };
    cfg.local_mean.spot_radius = 3.0;
    cfg.local_mean.background_inner = 8.0;
    cfg.local_mean.background_outer = 14.0;
    cfg.mean_shift.bandwidth = 6.0;
    cfg
}

/// Add uniform noise in `[0, amplitude]` to every voxel, reproducibly.
pub(crate) fn add_noise(vol: &mut Volume, amplitude: u16, seed: u64) {
    use rand::{rngs::StdRng, Rng, SeedableRng};
    let mut rng = StdRng::seed_from_u64(seed);
    let [w, h, d] = vol.dimensions();
    for z in 0..d as i32 {
        for y in 0..h as i32 {
            for x in 0..w as i32 {
                let v = vol.intensity([x, y, z]).unwrap_or(0);
                vol.set_voxel([x, y, z], v.saturating_add(rng.gen_range(0..=amplitude)));
            }
        }
    }
}

/// Fresh directory under the system temp dir, unique per call.
pub(crate) fn unique_temp_dir(tag: &str) -> std::path::PathBuf {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!(
        "somaloc_{tag}_{}_{nanos}_{n}",
        std::process::id()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
