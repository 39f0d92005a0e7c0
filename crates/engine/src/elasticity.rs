//! Price and elasticity model.
//!
//! Each product gets a weekly shelf price: either a promotional cut or
//! the standing price with a small jitter. The volume response is
//! linear in the relative price change, scaled by the elasticity drawn
//! onto the product at catalog build time. Deep promo cuts on elastic
//! value lines produce the familiar sawtooth of price-driven volume.

use rand::Rng;

use emporium_dimensions::ProductRecord;

use crate::config::PricingConfig;
use crate::numerics::rel_change;
use crate::sampling::{site, stream};

/// Sanity band for the volume response factor. Values outside are
/// clamped by the caller and counted as degeneracies.
pub const VOLUME_FACTOR_FLOOR: f64 = 1e-6;
pub const VOLUME_FACTOR_CEIL: f64 = 10.0;

/// One week's pricing decision for one product.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceDraw {
    pub price: f64,
    pub on_promo: bool,
}

/// Weekly price draws and their demand response.
#[derive(Debug, Clone)]
pub struct PriceElasticityModel {
    seed: u64,
    config: PricingConfig,
}

impl PriceElasticityModel {
    pub fn new(seed: u64, config: PricingConfig) -> Self {
        PriceElasticityModel { seed, config }
    }

    /// Draw the shelf price for one product in one period.
    pub fn draw(&self, product: &ProductRecord, period_index: usize) -> PriceDraw {
        let mut rng = stream(
            self.seed,
            site::PRICING,
            &[product.key.0, period_index as u64],
        );
        if rng.gen_bool(self.config.promo_probability) {
            let depth = self.config.promo_depth.sample(&mut rng);
            PriceDraw {
                price: product.base_price * (1.0 - depth),
                on_promo: true,
            }
        } else {
            let jitter = self.config.weekly_jitter;
            let factor = if jitter > 0.0 {
                1.0 + rng.gen_range(-jitter..=jitter)
            } else {
                1.0
            };
            PriceDraw {
                price: product.base_price * factor,
                on_promo: false,
            }
        }
    }

    /// Volume response to the drawn price, relative to the standing
    /// price. Elasticity is negative, so a price cut pushes volume up.
    pub fn volume_factor(product: &ProductRecord, draw: &PriceDraw) -> f64 {
        1.0 + product.elasticity * rel_change(product.base_price, draw.price)
    }
}
