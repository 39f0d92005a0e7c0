//! CSV tables for one generated dataset.
//!
//! Four table kinds: `DimProduct`, `DimGeography`, `DimDate`, and one
//! `Fact_Sales_<year>` file per series year. Rows serialize straight
//! off the dimension records and fact rows, so the struct field order
//! is the column order and a written file reads back into the same
//! types without a mapping layer.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::info;

use emporium_dimensions::{GeographyNode, ProductRecord, TimeKey, TimePeriod};
use emporium_engine::{Dataset, FactRecord};

use crate::error::Result;

pub const DIM_PRODUCT_FILE: &str = "DimProduct.csv";
pub const DIM_GEOGRAPHY_FILE: &str = "DimGeography.csv";
pub const DIM_DATE_FILE: &str = "DimDate.csv";

/// Century base for expanding the two-digit year in `YYWW` keys.
const YEAR_BASE: u32 = 2000;

/// Full series year a fact row files under.
pub fn series_year(key: TimeKey) -> u32 {
    YEAR_BASE + key.year_part()
}

/// File name of the fact table covering one series year.
pub fn fact_file(year: u32) -> String {
    format!("Fact_Sales_{year}.csv")
}

/// Files produced by one [`write_dataset`] call.
#[derive(Debug, Clone)]
pub struct DatasetPaths {
    pub products: PathBuf,
    pub geographies: PathBuf,
    pub periods: PathBuf,
    /// One file per series year, in chronological order.
    pub facts: Vec<PathBuf>,
}

/// Write every table for a dataset under `dir`, creating it if needed.
pub fn write_dataset(dataset: &Dataset, dir: &Path) -> Result<DatasetPaths> {
    fs::create_dir_all(dir)?;

    let products = dir.join(DIM_PRODUCT_FILE);
    write_rows(&products, dataset.catalog.products())?;
    let geographies = dir.join(DIM_GEOGRAPHY_FILE);
    write_rows(&geographies, dataset.geography.nodes())?;
    let periods = dir.join(DIM_DATE_FILE);
    write_rows(&periods, dataset.time.periods())?;

    let facts = write_facts(&dataset.facts, dir)?;

    info!(
        dir = %dir.display(),
        products = dataset.catalog.len(),
        rows = dataset.facts.len(),
        fact_files = facts.len(),
        "dataset written"
    );
    Ok(DatasetPaths {
        products,
        geographies,
        periods,
        facts,
    })
}

fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Fact rows arrive in period order, so each series year is one
/// contiguous slice; the writer rotates files when the year changes.
fn write_facts(facts: &[FactRecord], dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    let mut open: Option<(u32, csv::Writer<fs::File>)> = None;

    for row in facts {
        let year = series_year(row.time_key);
        if open.as_ref().is_none_or(|(y, _)| *y != year) {
            if let Some((_, mut writer)) = open.take() {
                writer.flush()?;
            }
            let path = dir.join(fact_file(year));
            paths.push(path.clone());
            open = Some((year, csv::Writer::from_path(&path)?));
        }
        if let Some((_, writer)) = open.as_mut() {
            writer.serialize(row)?;
        }
    }
    if let Some((_, mut writer)) = open.take() {
        writer.flush()?;
    }
    Ok(paths)
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

pub fn read_products(path: &Path) -> Result<Vec<ProductRecord>> {
    read_rows(path)
}

pub fn read_geographies(path: &Path) -> Result<Vec<GeographyNode>> {
    read_rows(path)
}

pub fn read_periods(path: &Path) -> Result<Vec<TimePeriod>> {
    read_rows(path)
}

pub fn read_facts(path: &Path) -> Result<Vec<FactRecord>> {
    read_rows(path)
}
