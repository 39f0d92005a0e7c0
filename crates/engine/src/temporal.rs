//! Temporal consistency model.
//!
//! Week-over-week evolution of the deseasonalized sales level is an
//! AR(1) step blended back toward the warmup anchor, then clamped into
//! a relative band around the previous value. The blend keeps a
//! three-year series from wandering arbitrarily far from its prior;
//! the clamp bounds month-over-month movement before seasonal and
//! promotional multipliers are applied on top.
//!
//! The market aggregate gets a tight band and small noise; individual
//! retailer and channel levels move more freely.

use rand_distr::{Distribution, Normal};

use emporium_dimensions::ProductKey;

use crate::config::{Band, SmoothingConfig};
use crate::error::{Error, Result};
use crate::numerics::{blend, clamp_step};
use crate::sampling::{site, stream};

/// Which smoothing coefficients a geography node evolves under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmoothingTier {
    /// The total-market node.
    Aggregate,
    /// Retailer and channel nodes.
    Leaf,
}

impl SmoothingTier {
    pub fn for_level(level: u8) -> Self {
        if level == 0 {
            SmoothingTier::Aggregate
        } else {
            SmoothingTier::Leaf
        }
    }
}

/// AR(1) evolution of deseasonalized levels.
#[derive(Debug, Clone)]
pub struct TemporalConsistencyModel {
    seed: u64,
    config: SmoothingConfig,
    aggregate_noise: Normal<f64>,
    leaf_noise: Normal<f64>,
}

impl TemporalConsistencyModel {
    pub fn new(seed: u64, config: SmoothingConfig) -> Result<Self> {
        let aggregate_noise =
            Normal::new(0.0, config.aggregate_noise).map_err(|e| Error::InvalidConfig {
                field: "smoothing.aggregate_noise".to_string(),
                reason: e.to_string(),
            })?;
        let leaf_noise = Normal::new(0.0, config.leaf_noise).map_err(|e| Error::InvalidConfig {
            field: "smoothing.leaf_noise".to_string(),
            reason: e.to_string(),
        })?;
        Ok(TemporalConsistencyModel {
            seed,
            config,
            aggregate_noise,
            leaf_noise,
        })
    }

    fn coefficients(&self, tier: SmoothingTier) -> (Band, &Normal<f64>, f64) {
        match tier {
            SmoothingTier::Aggregate => (
                self.config.aggregate_beta,
                &self.aggregate_noise,
                self.config.aggregate_mom_cap,
            ),
            SmoothingTier::Leaf => (
                self.config.leaf_beta,
                &self.leaf_noise,
                self.config.leaf_mom_cap,
            ),
        }
    }

    /// Evolve one node's deseasonalized level by one week.
    ///
    /// `prev` is last week's level, `anchor` the warmup base the series
    /// reverts toward.
    pub fn next_level(
        &self,
        product: ProductKey,
        node_idx: usize,
        period_index: usize,
        prev: f64,
        anchor: f64,
        tier: SmoothingTier,
    ) -> f64 {
        let mut rng = stream(
            self.seed,
            site::TEMPORAL,
            &[product.0, node_idx as u64, period_index as u64],
        );
        let (beta_band, noise, cap) = self.coefficients(tier);
        let beta = beta_band.sample(&mut rng);
        let eps = noise.sample(&mut rng);

        let raw = self.config.alpha + prev * (beta + eps);
        let pulled = blend(anchor, raw, self.config.blend_weight);
        clamp_step(prev, pulled, cap).max(0.0)
    }
}
