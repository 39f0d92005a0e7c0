//! Generates a synthetic confectionery sales dataset.
//!
//! Usage: `generate [config.yaml] [--out DIR] [--seed N] [--periods N]`

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing::{error, info, warn};

use emporium_engine::{GeneratorConfig, GeneratorRuntime};
use emporium_output::{RunManifest, write_dataset};

#[derive(Parser, Debug)]
#[command(name = "generate")]
#[command(about = "Generate a synthetic confectionery sales dataset")]
struct Args {
    /// Path to the generator config YAML. Omitted, the built-in
    /// defaults are used.
    config: Option<PathBuf>,

    /// Directory the dimension and fact tables are written to
    #[arg(long = "out", default_value = "out")]
    out_dir: PathBuf,

    /// Override the master seed from the config
    #[arg(long)]
    seed: Option<u64>,

    /// Override the number of weekly periods from the config
    #[arg(long)]
    periods: Option<usize>,
}

fn main() {
    emporium_tools::init_logging();

    let args = Args::parse();

    let mut config = match args.config {
        Some(ref path) => match GeneratorConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                error!("failed to load config '{}': {}", path.display(), e);
                process::exit(1);
            }
        },
        None => GeneratorConfig::default(),
    };

    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(periods) = args.periods {
        config.periods = periods;
    }
    // Overrides can invalidate scenario windows, so re-check.
    if let Err(e) = config.validate() {
        error!("config rejected: {e}");
        process::exit(1);
    }

    let runtime = match GeneratorRuntime::new(config.clone()) {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("failed to build runtime: {e}");
            process::exit(1);
        }
    };

    let dataset = match runtime.run() {
        Ok(dataset) => dataset,
        Err(e) => {
            error!("generation failed: {e}");
            process::exit(1);
        }
    };

    info!("  Products: {}", dataset.catalog.len());
    info!("  Geographies: {}", dataset.geography.len());
    info!("  Periods: {}", dataset.time.len());
    info!("  Fact rows: {}", dataset.facts.len());
    if dataset.report.degeneracy_total() > 0 {
        info!(
            "  Clamped degeneracies: {}",
            dataset.report.degeneracy_total()
        );
    }
    if !dataset.report.violations.is_empty() {
        warn!(
            "  Constraint violations: {}",
            dataset.report.violations.len()
        );
        for violation in &dataset.report.violations {
            warn!("    {violation}");
        }
    }

    if let Err(e) = write_dataset(&dataset, &args.out_dir) {
        error!("failed to write dataset: {e}");
        process::exit(1);
    }
    let manifest = RunManifest::new(&config, &dataset);
    if let Err(e) = manifest.write(&args.out_dir) {
        error!("failed to write manifest: {e}");
        process::exit(1);
    }

    info!(
        "Dataset {} written to {}",
        manifest.run_id,
        args.out_dir.display()
    );
}
