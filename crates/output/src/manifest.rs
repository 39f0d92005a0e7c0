//! Run manifest.
//!
//! A JSON sidecar describing what a dataset directory holds: the seed
//! and horizon that produced it, row counts, and the violation totals
//! from generation. Downstream loaders read this instead of sniffing
//! the CSVs.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use emporium_engine::{Dataset, GeneratorConfig};

use crate::error::Result;

pub const MANIFEST_FILE: &str = "manifest.json";

/// Summary of one written run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: String,
    pub created_at: DateTime<Utc>,
    pub seed: u64,
    pub periods: usize,
    pub products: usize,
    pub geographies: usize,
    pub fact_rows: usize,
    pub constraint_violations: usize,
    pub degeneracies: u64,
}

impl RunManifest {
    /// Describe a finished run.
    pub fn new(config: &GeneratorConfig, dataset: &Dataset) -> Self {
        let created_at = Utc::now();
        RunManifest {
            run_id: format!(
                "emporium-{:016x}-{}",
                config.seed,
                created_at.format("%Y%m%d%H%M%S")
            ),
            created_at,
            seed: config.seed,
            periods: dataset.time.len(),
            products: dataset.catalog.len(),
            geographies: dataset.geography.len(),
            fact_rows: dataset.facts.len(),
            constraint_violations: dataset.report.violation_count(),
            degeneracies: dataset.report.degeneracy_total(),
        }
    }

    /// Write the manifest into a dataset directory.
    pub fn write(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(MANIFEST_FILE);
        let file = fs::File::create(&path)?;
        serde_json::to_writer_pretty(file, self)?;
        info!(path = %path.display(), run_id = %self.run_id, "manifest written");
        Ok(path)
    }

    /// Load the manifest from a dataset directory.
    pub fn load(dir: &Path) -> Result<Self> {
        let text = fs::read_to_string(dir.join(MANIFEST_FILE))?;
        Ok(serde_json::from_str(&text)?)
    }
}
