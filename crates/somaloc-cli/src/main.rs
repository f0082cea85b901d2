//! somaloc CLI: refine cell seeds in a stack of 2D slices.

use clap::{Args, Parser, Subcommand};
use somaloc::{BorderPolicy, RefineConfig, Refiner, Volume, VoxelSource};
use std::path::{Path, PathBuf};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "somaloc")]
#[command(about = "Refine approximate cell seeds in 3D microscopy stacks into centers and radii")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Refine seeds against a slice stack.
    Refine(CliRefineArgs),

    /// Print the default configuration as JSON.
    DefaultConfig,
}

#[derive(Debug, Clone, Args)]
struct CliRefineArgs {
    /// Slice images in z order.
    #[arg(long, num_args = 1.., conflicts_with = "slice_dir")]
    slices: Vec<PathBuf>,

    /// Directory of slice images (png/tif), sorted by file name.
    #[arg(long)]
    slice_dir: Option<PathBuf>,

    /// Ratio of z spacing to xy spacing.
    #[arg(long)]
    z_scale: f64,

    /// Seeds as a JSON array of [x, y, z] voxel coordinates.
    #[arg(long)]
    seeds: PathBuf,

    /// Refinement configuration (JSON). Flags below override its fields.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Side length of the crop around each seed.
    #[arg(long)]
    cube_dim: Option<usize>,

    /// Mean-shift kernel bandwidth.
    #[arg(long)]
    bandwidth: Option<f64>,

    /// Mean-shift iteration budget.
    #[arg(long)]
    iterations: Option<usize>,

    /// Analyze seeds whose crop is clamped by the volume border instead of
    /// skipping them.
    #[arg(long)]
    analyze_border: bool,

    /// Refine seeds in parallel.
    #[arg(long)]
    parallel: bool,

    /// Path to write results (JSON).
    #[arg(long)]
    out: PathBuf,
}

impl CliRefineArgs {
    fn to_config(&self) -> CliResult<RefineConfig> {
        let mut config = match &self.config {
            Some(path) => RefineConfig::from_json_file(path)?,
            None => RefineConfig::default(),
        };
        if let Some(dim) = self.cube_dim {
            config.cube_dim = dim;
        }
        if let Some(bw) = self.bandwidth {
            config.mean_shift.bandwidth = bw;
        }
        if let Some(n) = self.iterations {
            config.mean_shift.iterations = n;
        }
        if self.analyze_border {
            config.border_policy = BorderPolicy::Analyze;
        }
        config.validate()?;
        Ok(config)
    }

    fn slice_paths(&self) -> CliResult<Vec<PathBuf>> {
        match &self.slice_dir {
            Some(dir) => list_slices(dir),
            None if !self.slices.is_empty() => Ok(self.slices.clone()),
            None => Err("either --slices or --slice-dir is required".into()),
        }
    }
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Refine(args) => run_refine(&args),
        Commands::DefaultConfig => run_default_config(),
    }
}

fn run_default_config() -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(&RefineConfig::default())?);
    Ok(())
}

fn run_refine(args: &CliRefineArgs) -> CliResult<()> {
    let config = args.to_config()?;
    let paths = args.slice_paths()?;
    tracing::info!("Loading {} slices", paths.len());
    let volume = Volume::load_slices(&paths, args.z_scale).map_err(|e| -> CliError {
        format!("Failed to load slice stack: {}", e).into()
    })?;
    let [w, h, d] = volume.dimensions();
    tracing::info!("Volume size: {}x{}x{} (z-scale {})", w, h, d, args.z_scale);

    let seeds = read_seeds(&args.seeds)?;
    tracing::info!("{} seeds from {}", seeds.len(), args.seeds.display());

    let refiner = Refiner::with_config(config);
    let result = if args.parallel {
        refiner.refine_all_par(&volume, &seeds)?
    } else {
        refiner.refine_all(&volume, &seeds)?
    };

    let json = serde_json::to_string_pretty(&result)?;
    std::fs::write(&args.out, &json)?;
    tracing::info!("Results written to {}", args.out.display());
    Ok(())
}

fn read_seeds(path: &Path) -> CliResult<Vec<[i32; 3]>> {
    let data = std::fs::read_to_string(path)?;
    parse_seeds(&data).map_err(|e| -> CliError {
        format!("Failed to parse seeds {}: {}", path.display(), e).into()
    })
}

fn parse_seeds(data: &str) -> Result<Vec<[i32; 3]>, serde_json::Error> {
    serde_json::from_str(data)
}

fn list_slices(dir: &Path) -> CliResult<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if is_slice_file(&path) {
            paths.push(path);
        }
    }
    if paths.is_empty() {
        return Err(format!("no png/tif slices in {}", dir.display()).into());
    }
    paths.sort();
    Ok(paths)
}

fn is_slice_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .is_some_and(|e| matches!(e.as_str(), "png" | "tif" | "tiff"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> CliRefineArgs {
        let mut argv = vec![
            "somaloc", "refine", "--slices", "a.tif", "b.tif", "--z-scale", "0.4", "--seeds",
            "seeds.json", "--out", "out.json",
        ];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Refine(a) => a,
            Commands::DefaultConfig => unreachable!(),
        }
    }

    #[test]
    fn flags_override_defaults() {
        let cfg = args(&["--cube-dim", "50", "--bandwidth", "6", "--analyze-border"])
            .to_config()
            .unwrap();
        assert_eq!(cfg.cube_dim, 50);
        assert_eq!(cfg.mean_shift.bandwidth, 6.0);
        assert_eq!(cfg.mean_shift.iterations, 15);
        assert_eq!(cfg.border_policy, BorderPolicy::Analyze);
    }

    #[test]
    fn invalid_override_is_rejected() {
        assert!(args(&["--bandwidth", "0"]).to_config().is_err());
    }

    #[test]
    fn slices_keep_command_line_order() {
        let a = args(&[]);
        assert_eq!(
            a.slice_paths().unwrap(),
            vec![PathBuf::from("a.tif"), PathBuf::from("b.tif")]
        );
    }

    #[test]
    fn seeds_parse_as_triples() {
        assert_eq!(
            parse_seeds("[[1, 2, 3], [40, 50, 6]]").unwrap(),
            vec![[1, 2, 3], [40, 50, 6]]
        );
        assert!(parse_seeds("[[1, 2]]").is_err());
    }

    #[test]
    fn slice_extensions() {
        assert!(is_slice_file(Path::new("z001.TIF")));
        assert!(is_slice_file(Path::new("z001.png")));
        assert!(!is_slice_file(Path::new("notes.txt")));
        assert!(!is_slice_file(Path::new("z001")));
    }
}
