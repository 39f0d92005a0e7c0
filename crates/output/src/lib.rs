//! Dataset serialization for the emporium generator.
//!
//! # Architecture
//!
//! - [`tables`]: CSV writers and readers for the dimension and fact tables
//! - [`manifest`]: JSON sidecar describing a written run
//! - [`error`]: serialization failure taxonomy
//!
//! Serialization is deliberately mechanical: every row type lives in
//! the dimensions or engine crate and is written as-is. This crate owns
//! only file layout and the manifest.

pub mod error;
pub mod manifest;
pub mod tables;

pub use error::{OutputError, Result};
pub use manifest::{MANIFEST_FILE, RunManifest};
pub use tables::{
    DIM_DATE_FILE, DIM_GEOGRAPHY_FILE, DIM_PRODUCT_FILE, DatasetPaths, fact_file, read_facts,
    read_geographies, read_periods, read_products, series_year, write_dataset,
};
