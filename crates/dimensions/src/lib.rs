//! Dimension builders for the emporium dataset generator.
//!
//! # Architecture
//!
//! - [`types`]: keys and attribute enums shared across the workspace
//! - [`product`]: manufacturer/brand tables and the product catalog builder
//! - [`geography`]: the fixed UK retail tree with store classifications
//! - [`time`]: Saturday-ending weekly trading calendar
//!
//! Dimensions are built once per run, before any fact generation, from a
//! seeded RNG stream. Builders put every behavioral fact the pipeline
//! needs on the records themselves; downstream code never re-derives
//! classifications from display strings.

pub mod error;
pub mod geography;
pub mod product;
pub mod time;
pub mod types;

pub use error::{DimensionError, Result};
pub use geography::{GeographyDim, GeographyNode};
pub use product::{CatalogSpec, Manufacturer, ProductCatalog, ProductRecord};
pub use time::{TimeDim, TimePeriod, WEEKS_PER_YEAR};
pub use types::{
    GeographyKey, ManufacturerClass, Needstate, OwnerClass, PackFormat, PriceClass, ProductKey,
    SeasonalEvent, SeasonalPeriod, SizeGroup, StoreClass, TimeKey,
};
