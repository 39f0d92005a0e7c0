//! Hierarchical allocation model.
//!
//! Two jobs, both per product:
//!
//! 1. Warmup: draw the market-level base from the total-market prior,
//!    split it across retailers by class-tilted weights, split retailer
//!    levels into their online and store-format children, and decide
//!    the stable presence mask. These anchors are what the temporal
//!    model reverts toward for the rest of the run.
//!
//! 2. Correction: each period, pull the market total back into the
//!    coverage band around `coverage_ratio` times the retailer sum, and
//!    rescale any channel set that outgrew its parent. Corrections are
//!    blended moves on the emitted values, not overwrites: a breach is
//!    recorded, then closed halfway, and only forced exact when the
//!    halfway move was not enough.
//!
//! The market total deliberately exceeds the retailer sum: the panel
//! reads total-market sales through stores the tracked retailers do not
//! cover.

use rand::Rng;
use tracing::debug;

use emporium_dimensions::{
    GeographyDim, PriceClass, ProductKey, ProductRecord, StoreClass, TimeKey,
};

use crate::config::{HierarchyConfig, SparsityConfig};
use crate::error::{Error, Result};
use crate::numerics::{blend, pairwise_sum, weighted_split};
use crate::report::{Constraint, ConstraintViolation, RunReport};
use crate::sampling::{ClippedLogNormal, site, stream};

/// Retailer tilt band around the class weight.
const RETAILER_TILT: (f64, f64) = (0.9, 1.1);
/// Product-by-retailer affinity band.
const PRODUCT_AFFINITY: (f64, f64) = (0.8, 1.2);
/// Children never take more than this share of their parent.
const MAX_CHILD_TAKE: f64 = 0.95;
/// Keep probability in off-class stores for premium lines.
const PREMIUM_OFF_CLASS_KEEP: f64 = 0.1;
/// Keep probability per node for range-restricted lines.
const RESTRICTED_KEEP: f64 = 0.25;

/// Warmup output for one product: anchors and masks that stay fixed
/// for the whole run.
#[derive(Debug, Clone)]
pub struct ProductPriors {
    /// Deseasonalized base level per geography node.
    pub node_base: Vec<f64>,
    /// Whether the product trades at each node at all.
    pub presence: Vec<bool>,
    /// For event-tied products: nodes that keep reporting residual
    /// sales outside the trading window.
    pub out_window_keep: Vec<bool>,
}

impl ProductPriors {
    pub fn root_base(&self) -> f64 {
        self.node_base[0]
    }
}

/// Allocation across the geography tree, plus the per-period coverage
/// and rollup corrections.
#[derive(Debug, Clone)]
pub struct HierarchicalAllocationModel {
    seed: u64,
    config: HierarchyConfig,
    sparsity: SparsityConfig,
    market_prior: ClippedLogNormal,
    estate: Vec<u32>,
}

impl HierarchicalAllocationModel {
    pub fn new(
        seed: u64,
        config: HierarchyConfig,
        sparsity: SparsityConfig,
        geo: &GeographyDim,
    ) -> Result<Self> {
        let (mu, sigma, lo, hi) = StoreClass::TotalMarket.sales_prior();
        let market_prior = ClippedLogNormal::new(mu, sigma, lo, hi)?;
        let estate = draw_estate(seed, geo);
        Ok(HierarchicalAllocationModel {
            seed,
            config,
            sparsity,
            market_prior,
            estate,
        })
    }

    /// Store estate size per node, fixed for the run.
    pub fn estate(&self) -> &[u32] {
        &self.estate
    }

    /// Draw warmup anchors and masks for one product.
    pub fn warmup(&self, product: &ProductRecord, geo: &GeographyDim) -> Result<ProductPriors> {
        let mut rng = stream(self.seed, site::WARMUP, &[product.key.0]);

        let root_base = self.market_prior.sample(&mut rng);
        if !root_base.is_finite() || root_base <= 0.0 {
            return Err(Error::WarmupDegeneracy {
                product: product.key,
                detail: format!("market prior produced {root_base}"),
            });
        }

        let retailers = geo.retailers();
        let mut weights = Vec::with_capacity(retailers.len());
        for &idx in retailers {
            let class_weight = geo.node(idx).store_class.allocation_weight();
            let tilt = rng.gen_range(RETAILER_TILT.0..=RETAILER_TILT.1);
            let affinity = rng.gen_range(PRODUCT_AFFINITY.0..=PRODUCT_AFFINITY.1);
            weights.push(class_weight * tilt * affinity);
        }

        let pool = root_base / self.config.coverage_ratio;
        let split = weighted_split(pool, &weights);

        let mut node_base = vec![0.0; geo.len()];
        node_base[geo.root()] = root_base;
        for (&idx, level) in retailers.iter().zip(split.iter()) {
            let (_, _, lo, hi) = geo.node(idx).store_class.sales_prior();
            node_base[idx] = level.clamp(lo, hi);
        }

        // Channel children: online takes its share of the parent, store
        // formats split the remainder. Draw order is fixed by node
        // order so the stream stays stable.
        for &parent_idx in retailers {
            let children = geo.children_of(parent_idx);
            if children.is_empty() {
                continue;
            }
            let parent_level = node_base[parent_idx];
            let mut online_take = 0.0;
            for &child in children {
                if geo.node(child).is_online() {
                    let share = self.config.online_share.sample(&mut rng);
                    node_base[child] = parent_level * share;
                    online_take += node_base[child];
                }
            }
            let remainder = (parent_level - online_take).max(0.0);
            let formats: Vec<usize> = children
                .iter()
                .copied()
                .filter(|&c| !geo.node(c).is_online())
                .collect();
            if !formats.is_empty() {
                let fractions: Vec<f64> = formats
                    .iter()
                    .map(|_| self.config.format_share.sample(&mut rng))
                    .collect();
                let total: f64 = fractions.iter().sum();
                let scale = if total > MAX_CHILD_TAKE {
                    MAX_CHILD_TAKE / total
                } else {
                    1.0
                };
                for (&child, fraction) in formats.iter().zip(fractions.iter()) {
                    node_base[child] = remainder * fraction * scale;
                }
            }
        }

        let presence = self.presence_mask(product, geo);
        for (level, keep) in node_base.iter_mut().zip(presence.iter()) {
            if !keep {
                *level = 0.0;
            }
        }

        let out_window_keep = self.out_window_mask(product, geo);

        Ok(ProductPriors {
            node_base,
            presence,
            out_window_keep,
        })
    }

    /// Stable trading mask for one product.
    ///
    /// Private label trades only through its own banner (plus the
    /// market total). Premium lines always range in premium, major,
    /// and online stores and rarely elsewhere. Restricted lines keep a
    /// quarter of their nodes. Everything else ranges at the baseline
    /// presence rate. A channel node can only be present when its
    /// parent is.
    fn presence_mask(&self, product: &ProductRecord, geo: &GeographyDim) -> Vec<bool> {
        let mut mask = vec![false; geo.len()];
        mask[geo.root()] = true;

        if product.private_label {
            if let Some(home) = home_retailer(&product.brand, geo) {
                mask[home] = true;
                for &child in geo.children_of(home) {
                    mask[child] = true;
                }
            }
            return mask;
        }

        for idx in 0..geo.len() {
            if idx == geo.root() {
                continue;
            }
            let node = geo.node(idx);
            let mut rng = stream(self.seed, site::PRESENCE, &[product.key.0, idx as u64, 0]);
            let mut keep = match (product.price_class, node.store_class) {
                (
                    PriceClass::Premium,
                    StoreClass::Premium | StoreClass::Major | StoreClass::Online,
                ) => true,
                (PriceClass::Premium, _) => rng.gen_bool(PREMIUM_OFF_CLASS_KEEP),
                _ => rng.gen_bool(self.sparsity.presence_rate),
            };
            if keep && product.restricted {
                keep = rng.gen_bool(RESTRICTED_KEEP);
            }
            mask[idx] = keep;
        }

        for &(child, parent) in geo.channels() {
            mask[child] = mask[child] && mask[parent];
        }

        mask
    }

    fn out_window_mask(&self, product: &ProductRecord, geo: &GeographyDim) -> Vec<bool> {
        let mut mask = vec![false; geo.len()];
        if product.seasonal_event.is_none() {
            return mask;
        }
        mask[geo.root()] = true;
        for (idx, slot) in mask.iter_mut().enumerate().skip(1) {
            let mut rng = stream(self.seed, site::PRESENCE, &[product.key.0, idx as u64, 1]);
            *slot = rng.gen_bool(self.sparsity.out_of_window_keep);
        }
        mask
    }

    /// Coverage and rollup correction for one product's period values.
    ///
    /// `values` is mutated in place; breaches are recorded before they
    /// are closed.
    pub fn correct(
        &self,
        product: ProductKey,
        time_key: TimeKey,
        values: &mut [f64],
        geo: &GeographyDim,
        report: &mut RunReport,
    ) {
        let root = geo.root();
        let retailer_values: Vec<f64> = geo.retailers().iter().map(|&i| values[i]).collect();
        let retailer_sum = pairwise_sum(&retailer_values);

        if retailer_sum > 0.0 && values[root] > 0.0 {
            let band_lo = self.config.coverage_ratio * (1.0 - self.config.ratio_tolerance);
            let band_hi = self.config.coverage_ratio * (1.0 + self.config.ratio_tolerance);
            let ratio = values[root] / retailer_sum;
            if ratio < band_lo || ratio > band_hi {
                report.record_violation(ConstraintViolation {
                    period: Some(time_key),
                    subject: format!("product {product}"),
                    constraint: Constraint::CoverageRatio,
                    observed: ratio,
                    bound: (band_lo, band_hi),
                });

                let target_root = self.config.coverage_ratio * retailer_sum;
                values[root] = blend(values[root], target_root, self.config.correction_blend);

                let pulled_ratio = values[root] / retailer_sum;
                if pulled_ratio < band_lo || pulled_ratio > band_hi {
                    // Halfway was not enough: land the retailers on the
                    // exact target instead, keeping their mix.
                    let factor = values[root] / (self.config.coverage_ratio * retailer_sum);
                    debug!(%product, %time_key, factor, "rescaling retailers onto coverage target");
                    for &retailer in geo.retailers() {
                        values[retailer] *= factor;
                        for &child in geo.children_of(retailer) {
                            values[child] *= factor;
                        }
                    }
                }
            }
        }

        for &parent in geo.retailers() {
            let children = geo.children_of(parent);
            if children.is_empty() {
                continue;
            }
            let child_values: Vec<f64> = children.iter().map(|&c| values[c]).collect();
            let child_sum = pairwise_sum(&child_values);
            if child_sum > values[parent] && child_sum > 0.0 {
                report.record_violation(ConstraintViolation {
                    period: Some(time_key),
                    subject: format!("product {product} under {}", geo.node(parent).description),
                    constraint: Constraint::ParentChildSum,
                    observed: child_sum,
                    bound: (0.0, values[parent]),
                });
                let factor = values[parent] / child_sum;
                for &child in children {
                    values[child] *= factor;
                }
            }
        }
    }
}

/// Resolve a private-label brand to its banner's retailer node by the
/// longest matching banner name.
fn home_retailer(brand: &str, geo: &GeographyDim) -> Option<usize> {
    let brand_lower = brand.to_lowercase();
    let mut best: Option<(usize, usize)> = None;
    for &idx in geo.retailers() {
        let banner = geo.node(idx).description.to_lowercase();
        if brand_lower == banner || brand_lower.starts_with(&format!("{banner} ")) {
            let len = banner.len();
            if best.is_none_or(|(_, l)| len > l) {
                best = Some((idx, len));
            }
        }
    }
    best.map(|(idx, _)| idx)
}

fn estate_range(class: StoreClass) -> (u32, u32) {
    match class {
        StoreClass::TotalMarket => (0, 0),
        StoreClass::Premium => (300, 500),
        StoreClass::Major => (600, 1_500),
        StoreClass::Discount => (550, 1_200),
        StoreClass::Convenience => (900, 3_500),
        StoreClass::Online => (1, 1),
    }
}

/// Fixed store counts per node: independent class draws, with parents
/// raised to cover their children and the market total covering all
/// retailers.
fn draw_estate(seed: u64, geo: &GeographyDim) -> Vec<u32> {
    let mut estate = vec![0u32; geo.len()];
    for idx in 0..geo.len() {
        let (lo, hi) = estate_range(geo.node(idx).store_class);
        if hi == 0 {
            continue;
        }
        let mut rng = stream(seed, site::STORES, &[idx as u64]);
        estate[idx] = if lo == hi { lo } else { rng.gen_range(lo..=hi) };
    }
    for &parent in geo.retailers() {
        let child_sum: u32 = geo.children_of(parent).iter().map(|&c| estate[c]).sum();
        estate[parent] = estate[parent].max(child_sum);
    }
    estate[geo.root()] = geo.retailers().iter().map(|&r| estate[r]).sum();
    estate
}
