//! Checks a dataset against its statistical contracts.
//!
//! Regenerates the dataset described by the config and validates the
//! result in memory. With `--dir`, additionally compares the written
//! fact tables row for row against the regeneration, which proves the
//! recorded run was a deterministic function of its seed.
//!
//! Usage: `validate <config.yaml> [--dir DIR]`

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use tracing::{error, info, warn};

use emporium_engine::{
    Dataset, GeneratorConfig, GeneratorRuntime, ValidationConfig, validate_dataset,
};
use emporium_output::{RunManifest, fact_file, read_facts, series_year};

#[derive(Parser, Debug)]
#[command(name = "validate")]
#[command(about = "Check a generated dataset against its statistical contracts")]
struct Args {
    /// Path to the generator config YAML the dataset was produced from
    config: PathBuf,

    /// Previously written dataset directory to compare row for row
    #[arg(long = "dir")]
    dataset_dir: Option<PathBuf>,
}

fn main() {
    emporium_tools::init_logging();

    let args = Args::parse();

    let config = match GeneratorConfig::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("failed to load config '{}': {}", args.config.display(), e);
            process::exit(1);
        }
    };

    let dataset = match GeneratorRuntime::new(config.clone()).and_then(|r| r.run()) {
        Ok(dataset) => dataset,
        Err(e) => {
            error!("regeneration failed: {e}");
            process::exit(1);
        }
    };

    let report = match validate_dataset(&dataset, &ValidationConfig::default()) {
        Ok(report) => report,
        Err(e) => {
            error!("validation aborted: {e}");
            process::exit(1);
        }
    };

    info!("Checks:");
    for check in &report.checks {
        if check.skipped {
            info!("  {:<24} skipped", check.name);
        } else {
            info!(
                "  {:<24} {} evaluated, {} violations",
                check.name, check.evaluated, check.violations
            );
        }
    }
    for violation in &report.violations {
        warn!("  {violation}");
    }

    let mut failed = !report.passed();
    if failed {
        error!("{} constraint violations recorded", report.violations.len());
    }

    if let Some(ref dir) = args.dataset_dir {
        if !compare_written_facts(&config, &dataset, dir) {
            failed = true;
        }
    }

    if failed {
        process::exit(1);
    }
    info!("Dataset passed validation");
}

/// Compare the fact tables under `dir` against the regenerated facts.
/// Returns false when anything differs.
fn compare_written_facts(config: &GeneratorConfig, dataset: &Dataset, dir: &Path) -> bool {
    match RunManifest::load(dir) {
        Ok(manifest) => {
            if manifest.seed != config.seed {
                error!(
                    "dataset was written with seed {} but config has seed {}",
                    manifest.seed, config.seed
                );
                return false;
            }
        }
        Err(e) => {
            warn!("no readable manifest in {}: {}", dir.display(), e);
        }
    }

    if dataset.facts.is_empty() {
        warn!("regeneration produced no facts, nothing to compare");
        return true;
    }

    let years: BTreeSet<u32> = dataset
        .facts
        .iter()
        .map(|fact| series_year(fact.time_key))
        .collect();
    let mut written = Vec::with_capacity(dataset.facts.len());
    for year in years {
        let path = dir.join(fact_file(year));
        match read_facts(&path) {
            Ok(mut rows) => written.append(&mut rows),
            Err(e) => {
                error!("failed to read '{}': {}", path.display(), e);
                return false;
            }
        }
    }

    if written.len() != dataset.facts.len() {
        error!(
            "written dataset has {} fact rows, regeneration has {}",
            written.len(),
            dataset.facts.len()
        );
        return false;
    }
    for (idx, (disk, fresh)) in written.iter().zip(&dataset.facts).enumerate() {
        if disk != fresh {
            error!(
                "fact row {} differs: written ({}, {}, {}) vs regenerated ({}, {}, {})",
                idx,
                disk.product_key,
                disk.geography_key,
                disk.time_key,
                fresh.product_key,
                fresh.geography_key,
                fresh.time_key
            );
            return false;
        }
    }

    info!("Written facts match deterministic regeneration");
    true
}
