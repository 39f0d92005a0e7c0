//! Error types for dimension building.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DimensionError {
    /// A requested build size cannot be satisfied.
    #[error("invalid catalog size: {reason}")]
    InvalidCatalogSize { reason: String },

    /// The calendar builder was asked for an unrepresentable range.
    #[error("invalid calendar range: {reason}")]
    InvalidCalendar { reason: String },

    /// A lookup against a built dimension missed.
    #[error("unknown key: {key}")]
    UnknownKey { key: String },
}

pub type Result<T> = std::result::Result<T, DimensionError>;
