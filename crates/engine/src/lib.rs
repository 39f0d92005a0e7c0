//! Statistical sales generation engine for the emporium dataset.
//!
//! # Architecture
//!
//! One run walks the weekly calendar and, per period, pushes every
//! product through four phases: `Base` draws the observed tree from the
//! smoothed chain, seasonal curve, and price response; `HierarchyCorrect`
//! pulls the rollup back into its coverage band; `BrandCorrect` manages
//! the house family's share corridor; `Assemble` turns corrected node
//! values into fact rows. State lives in an explicit two-period arena
//! ([`storage`]), never in globals, and every random draw comes from a
//! site-tagged stream of the master seed ([`sampling`]), so runs are
//! reproducible bit for bit.
//!
//! - [`config`]: YAML run profile with eager validation
//! - [`sampling`]: seed derivation and clipped log-normal priors
//! - [`storage`]: per-product chain state, current and previous period
//! - [`seasonal`]: event curves and trading-period modifiers
//! - [`elasticity`]: weekly price draws and the volume response
//! - [`temporal`]: AR(1) smoothing with hard week-over-week caps
//! - [`hierarchy`]: warmup allocation, presence masks, rollup correction
//! - [`brand_share`]: house-family share corridor controller
//! - [`scenario`]: declarative scripted anomalies and their effects
//! - [`assembler`]: fact-row emission, promo split, distribution fields
//! - [`executor`]: the period loop tying the phases together
//! - [`report`]: violation records and degeneracy counters
//! - [`validate`]: post-run checks over an assembled dataset

pub mod assembler;
pub mod brand_share;
pub mod config;
pub mod elasticity;
pub mod error;
pub mod executor;
pub mod hierarchy;
pub mod numerics;
pub mod report;
pub mod sampling;
pub mod scenario;
pub mod seasonal;
pub mod storage;
pub mod temporal;
pub mod types;
pub mod validate;

pub use assembler::FactRecord;
pub use config::{Band, GeneratorConfig};
pub use error::{Error, Result};
pub use executor::{Dataset, GeneratorRuntime};
pub use report::{Constraint, ConstraintViolation, RunReport};
pub use scenario::ScenarioConfig;
pub use validate::{CheckOutcome, ValidationConfig, ValidationReport, validate_dataset};
