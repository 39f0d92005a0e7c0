//! Error types for the generation engine.
//!
//! Only unrecoverable conditions surface as [`Error`]. Constraint
//! violations and clamped numeric degeneracies are data, not errors: they
//! are collected on the run report (see [`crate::report`]) while
//! generation continues best-effort.

use emporium_dimensions::{DimensionError, ProductKey};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A configuration value failed eager validation at startup.
    #[error("invalid configuration: {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    /// A configuration profile could not be read.
    #[error("failed to read config profile: {0}")]
    ConfigIo(#[from] std::io::Error),

    /// A configuration profile could not be parsed.
    #[error("failed to parse config YAML: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// Dimension building failed.
    #[error(transparent)]
    Dimension(#[from] DimensionError),

    /// Warmup produced a non-finite prior; the run cannot continue.
    #[error("warmup degenerate for product {product}: {detail}")]
    WarmupDegeneracy { product: ProductKey, detail: String },

    /// The runtime was asked to execute past the end of the calendar.
    #[error("period {period} out of range ({len} periods configured)")]
    PeriodOutOfRange { period: usize, len: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
