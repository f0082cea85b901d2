//! High-level refinement API.
//!
//! [`Refiner`] wraps a [`RefineConfig`] so one configuration can be applied
//! to many seeds and volumes.

use std::path::Path;

use crate::config::RefineConfig;
use crate::error::RefineError;
use crate::pipeline::{self, BatchResult, CellResult};
use crate::volume::VoxelSource;

/// Primary refinement interface.
///
/// # Examples
///
/// ```no_run
/// use somaloc::{Refiner, Volume};
///
/// let slices = ["stack/z000.tif", "stack/z001.tif", "stack/z002.tif"];
/// let volume = Volume::load_slices(&slices[..], 0.4).unwrap();
/// let refiner = Refiner::new();
/// let result = refiner.refine_all(&volume, &[[120, 96, 1]]).unwrap();
/// println!("{} refined", result.summary.n_refined);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Refiner {
    config: RefineConfig,
}

impl Refiner {
    /// Refiner with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Refiner with an explicit configuration.
    pub fn with_config(config: RefineConfig) -> Self {
        Self { config }
    }

    /// Load a JSON configuration and create a refiner in one step.
    pub fn from_config_json_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self::with_config(RefineConfig::from_json_file(path)?))
    }

    /// Current configuration.
    pub fn config(&self) -> &RefineConfig {
        &self.config
    }

    /// Mutable access to the configuration.
    pub fn config_mut(&mut self) -> &mut RefineConfig {
        &mut self.config
    }

    /// Refine a single seed.
    pub fn refine<V: VoxelSource + ?Sized>(
        &self,
        volume: &V,
        seed: [i32; 3],
    ) -> Result<CellResult, RefineError> {
        pipeline::refine_cell(volume, seed, &self.config)
    }

    /// Refine all seeds sequentially.
    pub fn refine_all<V: VoxelSource + ?Sized>(
        &self,
        volume: &V,
        seeds: &[[i32; 3]],
    ) -> Result<BatchResult, RefineError> {
        pipeline::refine_cells(volume, seeds, &self.config)
    }

    /// Refine all seeds on the rayon thread pool.
    pub fn refine_all_par<V: VoxelSource + Sync + ?Sized>(
        &self,
        volume: &V,
        seeds: &[[i32; 3]],
    ) -> Result<BatchResult, RefineError> {
        pipeline::refine_cells_par(volume, seeds, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::CellStatus;
    use crate::test_utils::{blob_volume, small_config};

    #[test]
    fn refiner_delegates_to_pipeline() {
        let vol = blob_volume([41, 41, 41], 1.0, &[([20.0, 20.0, 20.0], 3.0, 1000.0)]);
        let refiner = Refiner::with_config(small_config());
        let single = refiner.refine(&vol, [19, 20, 20]).unwrap();
        let batch = refiner.refine_all(&vol, &[[19, 20, 20]]).unwrap();
        assert_eq!(batch.cells[0], single);
        assert!(single.is_refined());
    }

    #[test]
    fn from_config_json_file_applies_config() {
        let dir = crate::test_utils::unique_temp_dir("refiner");
        let path = dir.join("refine.json");
        std::fs::write(
            &path,
            r#"{ "cube_dim": 30, "border_policy": "analyze",
                 "local_mean": { "background_inner": 8.0, "background_outer": 14.0 },
                 "max_profile_radius": 14 }"#,
        )
        .unwrap();
        let refiner = Refiner::from_config_json_file(&path).unwrap();
        assert_eq!(refiner.config().cube_dim, 30);
        assert_eq!(refiner.config().border_policy, crate::config::BorderPolicy::Analyze);
        assert_eq!(refiner.config().local_mean.spot_radius, 13.0);

        std::fs::write(&path, r#"{ "mean_shift": { "bandwidth": -1.0 } }"#).unwrap();
        assert!(Refiner::from_config_json_file(&path).is_err());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn config_mut_changes_behavior() {
        let vol = blob_volume([41, 41, 41], 1.0, &[([8.0, 20.0, 20.0], 3.0, 1000.0)]);
        let mut refiner = Refiner::with_config(small_config());
        assert_eq!(
            refiner.refine(&vol, [6, 20, 20]).unwrap().status,
            CellStatus::SkippedOnBorder
        );
        refiner.config_mut().border_policy = crate::config::BorderPolicy::Analyze;
        assert_eq!(
            refiner.refine(&vol, [6, 20, 20]).unwrap().status,
            CellStatus::Refined
        );
    }
}
