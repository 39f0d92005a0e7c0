//! Fact assembly.
//!
//! The final pipeline phase turns a product's corrected node values
//! into weekly fact rows. Everything a downstream reader sees is
//! derived here: the value/volume/price identity, the promotional
//! split, distribution counts, and the stock-out and pack-size marks
//! left behind by scenarios.
//!
//! Scale and availability scenario terms are already folded into the
//! node values by the time they arrive; this phase only consumes the
//! effects that change row shape (volume caps, size switches) or row
//! flags (availability marking stores out of stock).

use rand::Rng;
use serde::{Deserialize, Serialize};

use emporium_dimensions::{GeographyDim, GeographyKey, ProductKey, ProductRecord, TimeKey};

use crate::config::{PricingConfig, SparsityConfig};
use crate::elasticity::PriceDraw;
use crate::hierarchy::ProductPriors;
use crate::report::RunReport;
use crate::sampling::{self, site};
use crate::scenario::ScenarioEffect;
use crate::types::PeriodContext;

// ============================================================================
// Constants
// ============================================================================

/// Numeric distribution fraction drawn once per (product, node) series.
const DIST_LO: f64 = 0.35;
const DIST_HI: f64 = 0.95;

/// Weighted distribution exceeds numeric by up to this factor; larger
/// stores stock first.
const WEIGHT_UPLIFT_HI: f64 = 1.15;

// ============================================================================
// Fact record
// ============================================================================

/// One (product, geography, week) output row. Field order is the CSV
/// column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactRecord {
    pub product_key: ProductKey,
    pub geography_key: GeographyKey,
    pub time_key: TimeKey,
    pub value_sales: f64,
    pub volume_sales: f64,
    pub unit_sales: f64,
    pub price_per_unit: f64,
    pub base_value_sales: f64,
    pub promo_value_sales: f64,
    pub base_volume_sales: f64,
    pub promo_volume_sales: f64,
    pub store_count: u32,
    pub stores_selling: u32,
    pub weighted_distribution: f64,
    pub out_of_stock: bool,
    pub size_code: String,
}

/// Per-product inputs for one period's assembly, borrowed from the
/// phase outputs that produced them.
pub struct CellSeries<'a> {
    pub product: &'a ProductRecord,
    pub priors: &'a ProductPriors,
    /// Corrected value per geography node, indexed like the tree.
    pub values: &'a [f64],
    pub draw: &'a PriceDraw,
    pub seasonal_multiplier: f64,
    pub effects: &'a [ScenarioEffect],
}

// ============================================================================
// Assembler
// ============================================================================

pub struct FactAssembler {
    seed: u64,
    pricing: PricingConfig,
    sparsity: SparsityConfig,
}

impl FactAssembler {
    pub fn new(seed: u64, pricing: PricingConfig, sparsity: SparsityConfig) -> Self {
        FactAssembler {
            seed,
            pricing,
            sparsity,
        }
    }

    /// Emit fact rows for every surviving node cell of one product.
    ///
    /// A cell survives when the product trades at the node, its value
    /// clears the reporting floor, and (for event products out of
    /// their selling window) the node won the warmup keep draw.
    pub fn assemble(
        &self,
        series: &CellSeries<'_>,
        period: &PeriodContext,
        geo: &GeographyDim,
        estate: &[u32],
        out: &mut Vec<FactRecord>,
        report: &mut RunReport,
    ) {
        let product = series.product;
        let in_window = product.seasonal_event.is_none()
            || series.seasonal_multiplier >= self.sparsity.event_floor_gate;

        let mut volume_cap: Option<f64> = None;
        let mut availability = 1.0_f64;
        let mut size_factor: Option<f64> = None;
        for effect in series.effects {
            match effect {
                ScenarioEffect::CapVolume(cap) => {
                    volume_cap = Some(volume_cap.map_or(*cap, |prev| prev.min(*cap)));
                }
                ScenarioEffect::Availability(frac) => availability *= frac,
                ScenarioEffect::SizeSwitch(factor) => size_factor = Some(*factor),
                ScenarioEffect::Scale(_) => {}
            }
        }
        let size_code = match size_factor {
            Some(factor) => shrunk_size_code(product, factor),
            None => product.size_code.clone(),
        };

        for (node_idx, node) in geo.nodes().iter().enumerate() {
            if !series.priors.presence[node_idx] {
                continue;
            }
            if !in_window && !series.priors.out_window_keep[node_idx] {
                continue;
            }
            let mut value =
                report.sanitize(series.values[node_idx], 0.0, f64::MAX, "assembly.value");
            if value < self.sparsity.min_cell_value {
                continue;
            }

            let price = series.draw.price;
            let mut volume = value / price;
            let mut stocked_out = availability < 1.0;
            if let Some(cap) = volume_cap {
                if volume > cap {
                    volume = cap;
                    value = volume * price;
                    stocked_out = true;
                }
            }

            // Stable per-series draws, then the per-week promo split.
            let mut series_rng =
                sampling::stream(self.seed, site::ASSEMBLY, &[product.key.0, node_idx as u64, 0]);
            let dist: f64 = series_rng.gen_range(DIST_LO..DIST_HI);
            let weight_uplift: f64 = series_rng.gen_range(1.0..WEIGHT_UPLIFT_HI);

            let promo_share = if series.draw.on_promo {
                let mut week_rng = sampling::stream(
                    self.seed,
                    site::ASSEMBLY,
                    &[product.key.0, node_idx as u64, 1 + period.index as u64],
                );
                week_rng.gen_range(0.0..self.pricing.promo_value_share_max)
            } else {
                0.0
            };
            let promo_value = value * promo_share;
            let base_value = value - promo_value;
            let promo_volume = volume * promo_share;
            let base_volume = volume - promo_volume;

            let store_count = estate[node_idx];
            let selling = (f64::from(store_count) * dist * availability).round() as u32;
            let stores_selling = selling.clamp(1, store_count.max(1));
            let weighted_distribution =
                (dist * availability * weight_uplift * 100.0).clamp(0.0, 100.0);

            out.push(FactRecord {
                product_key: product.key,
                geography_key: node.key,
                time_key: period.time_key,
                value_sales: value,
                volume_sales: volume,
                unit_sales: volume * product.multipack_count as f64,
                price_per_unit: price,
                base_value_sales: base_value,
                promo_value_sales: promo_value,
                base_volume_sales: base_volume,
                promo_volume_sales: promo_volume,
                store_count,
                stores_selling,
                weighted_distribution,
                out_of_stock: stocked_out,
                size_code: size_code.clone(),
            });
        }
    }
}

/// Size identity after a shrinkflation switch: the per-unit grams
/// shrink, the pack count stays.
fn shrunk_size_code(product: &ProductRecord, factor: f64) -> String {
    let unit_grams = product.size_grams / product.multipack_count as f64;
    let shrunk = (unit_grams * factor).round().max(1.0) as u32;
    if product.multipack_count > 1 {
        format!("{} X {}G", product.multipack_count, shrunk)
    } else {
        format!("{shrunk}G")
    }
}
