//! Generator configuration.
//!
//! One YAML document describes an entire run: seed, horizon, catalog
//! shape, model coefficients, and the scenario list. Everything has a
//! default, so `GeneratorConfig::default()` produces the standard
//! three-year chocolate dataset and a config file only needs to state
//! what it overrides.
//!
//! Validation is eager: `validate` walks every field before any period
//! is generated, so a bad coefficient fails the run up front instead of
//! producing a half-written dataset.

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use emporium_dimensions::CatalogSpec;

use crate::error::{Error, Result};
use crate::scenario::ScenarioConfig;

// ============================================================================
// Band
// ============================================================================

/// A closed interval used for uniform draws and plausibility clamps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub lo: f64,
    pub hi: f64,
}

impl Band {
    pub const fn new(lo: f64, hi: f64) -> Self {
        Band { lo, hi }
    }

    pub fn contains(&self, v: f64) -> bool {
        v >= self.lo && v <= self.hi
    }

    pub fn clamp(&self, v: f64) -> f64 {
        v.clamp(self.lo, self.hi)
    }

    pub fn sample(&self, rng: &mut impl rand::Rng) -> f64 {
        if self.lo == self.hi {
            self.lo
        } else {
            rng.gen_range(self.lo..=self.hi)
        }
    }

    fn check(&self, field: &str) -> Result<()> {
        if !self.lo.is_finite() || !self.hi.is_finite() || self.lo > self.hi {
            return Err(Error::InvalidConfig {
                field: field.to_string(),
                reason: format!("invalid band [{}, {}]", self.lo, self.hi),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Sub-configs
// ============================================================================

/// AR(1) smoothing coefficients for the deseasonalized series.
///
/// `blend_weight` is the share of the raw AR draw in the final value;
/// the remainder pulls toward the warmup base, which is what keeps long
/// runs from drifting away from their priors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    pub blend_weight: f64,
    pub alpha: f64,
    pub aggregate_beta: Band,
    pub leaf_beta: Band,
    pub aggregate_noise: f64,
    pub leaf_noise: f64,
    pub aggregate_mom_cap: f64,
    pub leaf_mom_cap: f64,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        SmoothingConfig {
            blend_weight: 0.7,
            alpha: 0.0,
            aggregate_beta: Band::new(0.98, 1.02),
            leaf_beta: Band::new(0.85, 1.15),
            aggregate_noise: 0.005,
            leaf_noise: 0.02,
            aggregate_mom_cap: 0.02,
            leaf_mom_cap: 0.15,
        }
    }
}

impl SmoothingConfig {
    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.blend_weight) {
            return Err(Error::InvalidConfig {
                field: "smoothing.blend_weight".to_string(),
                reason: format!("{} outside [0, 1]", self.blend_weight),
            });
        }
        self.aggregate_beta.check("smoothing.aggregate_beta")?;
        self.leaf_beta.check("smoothing.leaf_beta")?;
        for (field, v) in [
            ("smoothing.aggregate_noise", self.aggregate_noise),
            ("smoothing.leaf_noise", self.leaf_noise),
            ("smoothing.aggregate_mom_cap", self.aggregate_mom_cap),
            ("smoothing.leaf_mom_cap", self.leaf_mom_cap),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(Error::InvalidConfig {
                    field: field.to_string(),
                    reason: format!("{v} must be a non-negative number"),
                });
            }
        }
        Ok(())
    }
}

/// Coverage-ratio and channel-split targets for the geography rollup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HierarchyConfig {
    /// Root sales as a multiple of the sum over top-level retailers.
    pub coverage_ratio: f64,
    /// Relative tolerance around `coverage_ratio` before correction.
    pub ratio_tolerance: f64,
    /// How far a correction moves toward the exact target in one step.
    pub correction_blend: f64,
    pub online_share: Band,
    pub format_share: Band,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        HierarchyConfig {
            coverage_ratio: 2.5,
            ratio_tolerance: 0.10,
            correction_blend: 0.5,
            online_share: Band::new(0.10, 0.30),
            format_share: Band::new(0.20, 0.50),
        }
    }
}

impl HierarchyConfig {
    fn validate(&self) -> Result<()> {
        if !self.coverage_ratio.is_finite() || self.coverage_ratio <= 1.0 {
            return Err(Error::InvalidConfig {
                field: "hierarchy.coverage_ratio".to_string(),
                reason: format!("{} must exceed 1.0", self.coverage_ratio),
            });
        }
        if !(0.0..1.0).contains(&self.ratio_tolerance) {
            return Err(Error::InvalidConfig {
                field: "hierarchy.ratio_tolerance".to_string(),
                reason: format!("{} outside [0, 1)", self.ratio_tolerance),
            });
        }
        if !(0.0..=1.0).contains(&self.correction_blend) {
            return Err(Error::InvalidConfig {
                field: "hierarchy.correction_blend".to_string(),
                reason: format!("{} outside [0, 1]", self.correction_blend),
            });
        }
        self.online_share.check("hierarchy.online_share")?;
        self.format_share.check("hierarchy.format_share")?;
        if self.online_share.hi >= 1.0 || self.format_share.hi >= 1.0 {
            return Err(Error::InvalidConfig {
                field: "hierarchy channel shares".to_string(),
                reason: "child shares must stay below 1.0".to_string(),
            });
        }
        Ok(())
    }
}

/// House-family share corridor per geography node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrandShareConfig {
    pub floor: f64,
    pub ceiling: f64,
    /// Correction aims inside this narrower band so a corrected node
    /// does not sit exactly on the corridor edge.
    pub target_floor: f64,
    pub target_ceiling: f64,
}

impl Default for BrandShareConfig {
    fn default() -> Self {
        BrandShareConfig {
            floor: 0.04,
            ceiling: 0.10,
            target_floor: 0.05,
            target_ceiling: 0.09,
        }
    }
}

impl BrandShareConfig {
    fn validate(&self) -> Result<()> {
        let ordered = 0.0 < self.floor
            && self.floor <= self.target_floor
            && self.target_floor < self.target_ceiling
            && self.target_ceiling <= self.ceiling
            && self.ceiling < 1.0;
        if !ordered {
            return Err(Error::InvalidConfig {
                field: "brand_share".to_string(),
                reason: format!(
                    "bands must nest: 0 < {} <= {} < {} <= {} < 1",
                    self.floor, self.target_floor, self.target_ceiling, self.ceiling
                ),
            });
        }
        Ok(())
    }
}

/// Weekly pricing behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub promo_probability: f64,
    pub promo_depth: Band,
    /// Relative jitter applied to the shelf price on non-promo weeks.
    pub weekly_jitter: f64,
    pub promo_value_share_max: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        PricingConfig {
            promo_probability: 0.3,
            promo_depth: Band::new(0.05, 0.30),
            weekly_jitter: 0.02,
            promo_value_share_max: 0.4,
        }
    }
}

impl PricingConfig {
    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.promo_probability) {
            return Err(Error::InvalidConfig {
                field: "pricing.promo_probability".to_string(),
                reason: format!("{} outside [0, 1]", self.promo_probability),
            });
        }
        self.promo_depth.check("pricing.promo_depth")?;
        if self.promo_depth.lo < 0.0 || self.promo_depth.hi >= 1.0 {
            return Err(Error::InvalidConfig {
                field: "pricing.promo_depth".to_string(),
                reason: "discount depth must stay inside [0, 1)".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.promo_value_share_max) {
            return Err(Error::InvalidConfig {
                field: "pricing.promo_value_share_max".to_string(),
                reason: format!("{} outside [0, 1]", self.promo_value_share_max),
            });
        }
        if !self.weekly_jitter.is_finite() || self.weekly_jitter < 0.0 {
            return Err(Error::InvalidConfig {
                field: "pricing.weekly_jitter".to_string(),
                reason: format!("{} must be a non-negative number", self.weekly_jitter),
            });
        }
        Ok(())
    }
}

/// Cell presence and suppression thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SparsityConfig {
    /// Baseline probability that an unrestricted product trades in a
    /// given leaf retailer at all.
    pub presence_rate: f64,
    /// Cells below this value are dropped rather than emitted.
    pub min_cell_value: f64,
    /// Share of out-of-window cells kept for event-gated products.
    pub out_of_window_keep: f64,
    /// Seasonal multiplier below which an event product counts as out
    /// of its window.
    pub event_floor_gate: f64,
}

impl Default for SparsityConfig {
    fn default() -> Self {
        SparsityConfig {
            presence_rate: 0.60,
            min_cell_value: 0.1,
            out_of_window_keep: 0.10,
            event_floor_gate: 0.2,
        }
    }
}

impl SparsityConfig {
    fn validate(&self) -> Result<()> {
        for (field, v) in [
            ("sparsity.presence_rate", self.presence_rate),
            ("sparsity.out_of_window_keep", self.out_of_window_keep),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(Error::InvalidConfig {
                    field: field.to_string(),
                    reason: format!("{v} outside [0, 1]"),
                });
            }
        }
        if !self.min_cell_value.is_finite() || self.min_cell_value < 0.0 {
            return Err(Error::InvalidConfig {
                field: "sparsity.min_cell_value".to_string(),
                reason: format!("{} must be a non-negative number", self.min_cell_value),
            });
        }
        if !(0.0..=1.0).contains(&self.event_floor_gate) {
            return Err(Error::InvalidConfig {
                field: "sparsity.event_floor_gate".to_string(),
                reason: format!("{} outside [0, 1]", self.event_floor_gate),
            });
        }
        Ok(())
    }
}

// ============================================================================
// GeneratorConfig
// ============================================================================

fn default_seed() -> u64 {
    42
}

fn default_periods() -> usize {
    156
}

fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2022, 1, 1).expect("literal date")
}

fn default_parallel_threshold() -> usize {
    64
}

/// Complete description of one generator run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Master seed. Every stochastic stream derives from this.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Number of weekly periods to generate.
    #[serde(default = "default_periods")]
    pub periods: usize,
    /// Calendar anchor; the first period ends on the first Saturday on
    /// or after this date.
    #[serde(default = "default_start_date")]
    pub start_date: NaiveDate,
    #[serde(default)]
    pub catalog: CatalogSpec,
    #[serde(default)]
    pub smoothing: SmoothingConfig,
    #[serde(default)]
    pub hierarchy: HierarchyConfig,
    #[serde(default)]
    pub brand_share: BrandShareConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub sparsity: SparsityConfig,
    #[serde(default)]
    pub scenarios: Vec<ScenarioConfig>,
    /// Below this many products the per-period product loop runs
    /// serially; above it, rayon splits the work.
    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            seed: default_seed(),
            periods: default_periods(),
            start_date: default_start_date(),
            catalog: CatalogSpec::default(),
            smoothing: SmoothingConfig::default(),
            hierarchy: HierarchyConfig::default(),
            brand_share: BrandShareConfig::default(),
            pricing: PricingConfig::default(),
            sparsity: SparsityConfig::default(),
            scenarios: Vec::new(),
            parallel_threshold: default_parallel_threshold(),
        }
    }
}

impl GeneratorConfig {
    /// Load a config from a YAML file and validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&text)?;
        info!(path = %path.display(), "loaded generator config");
        Ok(config)
    }

    /// Parse a config from YAML text and validate it.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let config: GeneratorConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every field before generation starts.
    pub fn validate(&self) -> Result<()> {
        if self.periods == 0 {
            return Err(Error::InvalidConfig {
                field: "periods".to_string(),
                reason: "horizon must cover at least one week".to_string(),
            });
        }
        self.catalog.validate()?;
        self.smoothing.validate()?;
        self.hierarchy.validate()?;
        self.brand_share.validate()?;
        self.pricing.validate()?;
        self.sparsity.validate()?;
        for (idx, scenario) in self.scenarios.iter().enumerate() {
            scenario.validate(idx, self.periods)?;
        }
        Ok(())
    }
}
