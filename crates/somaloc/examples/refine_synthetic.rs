use somaloc::{RefineConfig, Refiner, Volume};
use std::error::Error;

/// Three Gaussian cells in a 120x120x40 stack with z-scale 0.4.
fn synthetic_volume(z_scale: f64) -> Result<Volume, Box<dyn Error>> {
    let cells = [[30.0, 40.0, 20.0], [70.0, 60.0, 18.0], [90.0, 30.0, 22.0]];
    let volume = Volume::from_fn([120, 120, 40], z_scale, |x, y, z| {
        let mut v = 100.0;
        for c in &cells {
            let dx = x as f64 - c[0];
            let dy = y as f64 - c[1];
            let dz = (z as f64 - c[2]) / z_scale;
            v += 1500.0 * (-0.5 * (dx * dx + dy * dy + dz * dz) / 36.0).exp();
        }
        v as u16
    })?;
    Ok(volume)
}

fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = std::env::args().collect();
    let volume = synthetic_volume(0.4)?;
    let seeds = [[33, 37, 20], [68, 63, 17], [88, 33, 21], [2, 2, 2]];

    let mut config = RefineConfig::default();
    config.cube_dim = 50;
    config.local_mean.background_outer = 24.0;
    config.max_profile_radius = 24;
    let refiner = Refiner::with_config(config);
    let result = refiner.refine_all(&volume, &seeds)?;

    for cell in &result.cells {
        println!(
            "seed {:?} -> center {:?}, radius {} ({:?})",
            cell.seed, cell.center, cell.radius, cell.status
        );
    }

    if let Some(out_path) = args.get(1) {
        let json = serde_json::to_string_pretty(&result)?;
        std::fs::write(out_path, json)?;
        println!("Wrote {out_path}");
    }
    Ok(())
}
