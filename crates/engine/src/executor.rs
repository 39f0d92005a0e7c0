//! Generation runtime.
//!
//! # Architecture
//!
//! One `GeneratorRuntime` owns the dimensions, the stochastic models,
//! and the two-generation arena. Every period runs the same four
//! phases in order:
//!
//! 1. base: per product, advance the deseasonalized chain one step and
//!    dress it with seasonal, price, and scenario terms. Products are
//!    independent here, so the loop fans out over rayon above the
//!    configured threshold. Order-preserving collection keeps the
//!    result identical to the serial path.
//! 2. hierarchy correction: pull each product's tree back into the
//!    coverage band and rollup ordering.
//! 3. brand correction: band the house family's share per node across
//!    all products.
//! 4. assembly: emit fact rows and fold the corrected values back into
//!    the chain.
//!
//! The fold-back divides out the same multipliers the base phase
//! applied, so corrections persist in the chain while seasonal spikes
//! and scenario shocks stay transient.

use rayon::prelude::*;
use tracing::{debug, info, instrument, trace};

use emporium_dimensions::{GeographyDim, ProductCatalog, ProductRecord, TimeDim};

use crate::assembler::{CellSeries, FactAssembler, FactRecord};
use crate::brand_share::BrandShareController;
use crate::config::GeneratorConfig;
use crate::elasticity::{
    PriceDraw, PriceElasticityModel, VOLUME_FACTOR_CEIL, VOLUME_FACTOR_FLOOR,
};
use crate::error::Result;
use crate::hierarchy::{HierarchicalAllocationModel, ProductPriors};
use crate::report::RunReport;
use crate::sampling::{self, site};
use crate::scenario::{ScenarioEffect, ScenarioInjector};
use crate::seasonal::SeasonalCurveModel;
use crate::storage::{PeriodStorage, ProductState};
use crate::temporal::{SmoothingTier, TemporalConsistencyModel};
use crate::types::{PeriodContext, Phase};

/// Below this total multiplier a cell's chain level cannot be
/// recovered by division; the previous level is kept instead.
const FOLD_EPS: f64 = 1e-9;

// ============================================================================
// Dataset
// ============================================================================

/// Everything one run produces: the three dimensions, the fact rows,
/// and the constraint report.
pub struct Dataset {
    pub catalog: ProductCatalog,
    pub geography: GeographyDim,
    pub time: TimeDim,
    pub facts: Vec<FactRecord>,
    pub report: RunReport,
}

// ============================================================================
// Runtime
// ============================================================================

/// Per-product output of the base phase, kept alongside the value
/// vector for the correction and assembly phases.
struct BaseMeta {
    /// Multiplier applied per node on top of the chain level.
    mults: Vec<f64>,
    draw: PriceDraw,
    seasonal_multiplier: f64,
    degeneracies: u64,
}

pub struct GeneratorRuntime {
    config: GeneratorConfig,
    catalog: ProductCatalog,
    geo: GeographyDim,
    time: TimeDim,
    seasonal: SeasonalCurveModel,
    elasticity: PriceElasticityModel,
    temporal: TemporalConsistencyModel,
    allocation: HierarchicalAllocationModel,
    brand: BrandShareController,
    injector: ScenarioInjector,
    assembler: FactAssembler,
    /// Warmup priors per catalog index; chain anchors for the run.
    priors: Vec<ProductPriors>,
    house_mask: Vec<bool>,
    arena: PeriodStorage,
    report: RunReport,
}

impl GeneratorRuntime {
    /// Build dimensions and models, warm up every series, and seed the
    /// arena. Fails eagerly on bad config or a degenerate warmup draw.
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        config.validate()?;

        let mut catalog_rng = sampling::stream(config.seed, site::CATALOG, &[]);
        let catalog = ProductCatalog::build(&config.catalog, &mut catalog_rng)?;
        let geo = GeographyDim::build();
        let time = TimeDim::build(config.start_date, config.periods)?;

        let seasonal = SeasonalCurveModel::new(config.seed);
        let elasticity = PriceElasticityModel::new(config.seed, config.pricing.clone());
        let temporal = TemporalConsistencyModel::new(config.seed, config.smoothing.clone())?;
        let allocation = HierarchicalAllocationModel::new(
            config.seed,
            config.hierarchy.clone(),
            config.sparsity.clone(),
            &geo,
        )?;
        let brand = BrandShareController::new(config.brand_share.clone());
        let injector = ScenarioInjector::new(&config.scenarios, &catalog);
        let assembler =
            FactAssembler::new(config.seed, config.pricing.clone(), config.sparsity.clone());

        let mut priors = Vec::with_capacity(catalog.len());
        for product in catalog.products() {
            priors.push(allocation.warmup(product, &geo)?);
        }

        // Natural priors leave the house portfolio far below its share
        // corridor; lift every house series onto the corridor midpoint
        // so the banding pass starts from a feasible point.
        let house_mask: Vec<bool> = catalog
            .products()
            .iter()
            .map(|p| p.owner_class.is_house())
            .collect();
        let house_total: f64 = priors
            .iter()
            .zip(&house_mask)
            .filter(|(_, house)| **house)
            .map(|(p, _)| p.root_base())
            .sum();
        let all_total: f64 = priors.iter().map(|p| p.root_base()).sum();
        let factor = brand.warmup_factor(house_total, all_total);
        if (factor - 1.0).abs() > f64::EPSILON {
            for (prior, house) in priors.iter_mut().zip(&house_mask) {
                if *house {
                    for level in &mut prior.node_base {
                        *level *= factor;
                    }
                }
            }
            debug!(factor, "lifted house warmup levels onto the share corridor");
        }

        let mut arena = PeriodStorage::with_capacity(catalog.len());
        for (idx, product) in catalog.products().iter().enumerate() {
            arena.insert(
                product.key,
                ProductState {
                    base: priors[idx].node_base.clone(),
                    price: product.base_price,
                },
            );
        }
        arena.advance_period();

        info!(
            products = catalog.len(),
            nodes = geo.len(),
            periods = time.len(),
            scenarios = config.scenarios.len(),
            "generator runtime ready"
        );

        Ok(GeneratorRuntime {
            config,
            catalog,
            geo,
            time,
            seasonal,
            elasticity,
            temporal,
            allocation,
            brand,
            injector,
            assembler,
            priors,
            house_mask,
            arena,
            report: RunReport::default(),
        })
    }

    /// Run every period and hand back the complete dataset.
    pub fn run(mut self) -> Result<Dataset> {
        let periods_total = self.time.len();
        let contexts: Vec<PeriodContext> = self
            .time
            .periods()
            .iter()
            .map(|p| PeriodContext {
                index: p.index,
                time_key: p.time_key,
                week_of_year: p.week_of_year,
                seasonal_period: p.seasonal_period,
                periods_total,
            })
            .collect();

        let mut facts = Vec::new();
        for period in &contexts {
            self.execute_period(period, &mut facts);
            debug!(
                period = period.index,
                time_key = %period.time_key,
                facts = facts.len(),
                "period complete"
            );
        }

        self.report.facts_emitted = facts.len();
        info!(
            facts = facts.len(),
            violations = self.report.violation_count(),
            degeneracies = self.report.degeneracy_total(),
            "generation complete"
        );

        Ok(Dataset {
            catalog: self.catalog,
            geography: self.geo,
            time: self.time,
            facts,
            report: self.report,
        })
    }

    /// One period through all four phases.
    #[instrument(skip_all, fields(period = period.index))]
    fn execute_period(&mut self, period: &PeriodContext, facts: &mut Vec<FactRecord>) {
        trace!(phase = %Phase::Base, "phase start");
        let products = self.catalog.products();
        let (mut matrix, metas): (Vec<Vec<f64>>, Vec<BaseMeta>) =
            if products.len() >= self.config.parallel_threshold {
                products
                    .par_iter()
                    .enumerate()
                    .map(|(idx, product)| self.base_step(idx, product, period))
                    .unzip()
            } else {
                products
                    .iter()
                    .enumerate()
                    .map(|(idx, product)| self.base_step(idx, product, period))
                    .unzip()
            };
        let degeneracies: u64 = metas.iter().map(|m| m.degeneracies).sum();
        self.report.count_degeneracies("base.volume_factor", degeneracies);

        trace!(phase = %Phase::HierarchyCorrect, "phase start");
        for (idx, values) in matrix.iter_mut().enumerate() {
            self.allocation.correct(
                self.catalog.product(idx).key,
                period.time_key,
                values,
                &self.geo,
                &mut self.report,
            );
        }

        trace!(phase = %Phase::BrandCorrect, "phase start");
        let corrections = self.brand.corrections(
            &matrix,
            &self.house_mask,
            &self.geo,
            period.time_key,
            &mut self.report,
        );
        for (idx, values) in matrix.iter_mut().enumerate() {
            let house = self.house_mask[idx];
            for (node_idx, value) in values.iter_mut().enumerate() {
                let correction = &corrections[node_idx];
                if !correction.is_identity() {
                    *value *= if house {
                        correction.house_factor
                    } else {
                        correction.other_factor
                    };
                }
            }
        }

        trace!(phase = %Phase::Assemble, "phase start");
        let node_count = self.geo.len();
        let mut effects = Vec::new();
        for (idx, values) in matrix.iter().enumerate() {
            let product = self.catalog.product(idx);
            let meta = &metas[idx];
            self.injector.effects_for(idx, period.index, &mut effects);

            let cell = CellSeries {
                product,
                priors: &self.priors[idx],
                values,
                draw: &meta.draw,
                seasonal_multiplier: meta.seasonal_multiplier,
                effects: &effects,
            };
            self.assembler.assemble(
                &cell,
                period,
                &self.geo,
                self.allocation.estate(),
                facts,
                &mut self.report,
            );

            let mut state = ProductState::new(node_count, meta.draw.price);
            let previous = self.arena.get_previous(product.key);
            for i in 0..node_count {
                state.base[i] = if meta.mults[i] > FOLD_EPS {
                    values[i] / meta.mults[i]
                } else {
                    previous.map_or(0.0, |p| p.base[i])
                };
            }
            self.arena.insert(product.key, state);
        }

        self.arena.advance_period();
        self.report.periods_run += 1;
    }

    /// Advance one product's chain and apply the observed-layer terms.
    ///
    /// Returns the observed node values and the multipliers that
    /// produced them from the chain level.
    fn base_step(
        &self,
        idx: usize,
        product: &ProductRecord,
        period: &PeriodContext,
    ) -> (Vec<f64>, BaseMeta) {
        let node_count = self.geo.len();
        let priors = &self.priors[idx];

        let seasonal_multiplier = self.seasonal.multiplier(product, period.week_of_year);
        let draw = self.elasticity.draw(product, period.index);
        let mut volume_factor = PriceElasticityModel::volume_factor(product, &draw);
        let mut degeneracies = 0u64;
        if !volume_factor.is_finite() {
            volume_factor = 1.0;
            degeneracies += 1;
        } else if !(VOLUME_FACTOR_FLOOR..=VOLUME_FACTOR_CEIL).contains(&volume_factor) {
            volume_factor = volume_factor.clamp(VOLUME_FACTOR_FLOOR, VOLUME_FACTOR_CEIL);
            degeneracies += 1;
        }

        let mut values = vec![0.0; node_count];
        let mut mults = vec![0.0; node_count];
        let observed_mult = seasonal_multiplier * volume_factor;
        let previous_state = self.arena.get_previous(product.key);
        for i in 0..node_count {
            let previous = previous_state.map_or(priors.node_base[i], |state| state.base[i]);
            let tier = SmoothingTier::for_level(self.geo.node(i).level);
            let level = self.temporal.next_level(
                product.key,
                i,
                period.index,
                previous,
                priors.node_base[i],
                tier,
            );
            values[i] = level * observed_mult;
            mults[i] = observed_mult;
        }

        let mut effects = Vec::new();
        self.injector.effects_for(idx, period.index, &mut effects);
        for effect in &effects {
            match effect {
                ScenarioEffect::Scale(factors) => {
                    let root = self.geo.root();
                    let pre: f64 = self.retailer_sum(&values);
                    for (i, value) in values.iter_mut().enumerate() {
                        if i == root {
                            continue;
                        }
                        let f = factors.factor(self.geo.node(i).store_class);
                        *value *= f;
                        mults[i] *= f;
                    }
                    let post: f64 = self.retailer_sum(&values);
                    let root_factor = if pre > f64::EPSILON { post / pre } else { 1.0 };
                    values[root] *= root_factor;
                    mults[root] *= root_factor;
                }
                ScenarioEffect::Availability(frac) => {
                    for (value, mult) in values.iter_mut().zip(&mut mults) {
                        *value *= frac;
                        *mult *= frac;
                    }
                }
                // Shape-only effects; applied at assembly.
                ScenarioEffect::CapVolume(_) | ScenarioEffect::SizeSwitch(_) => {}
            }
        }

        for value in &mut values {
            if !value.is_finite() {
                *value = 0.0;
                degeneracies += 1;
            } else if *value < 0.0 {
                *value = 0.0;
                degeneracies += 1;
            }
        }

        (
            values,
            BaseMeta {
                mults,
                draw,
                seasonal_multiplier,
                degeneracies,
            },
        )
    }

    fn retailer_sum(&self, values: &[f64]) -> f64 {
        self.geo.retailers().iter().map(|&r| values[r]).sum()
    }
}
