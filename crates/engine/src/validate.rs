//! Post-run dataset validation.
//!
//! Re-checks the published guarantees against an assembled [`Dataset`]:
//! rollup consistency, coverage ratio, week-over-week smoothness, the
//! house share corridor, seasonal shape, sparsity, and the per-row
//! accounting identities. Breaches become [`ConstraintViolation`]
//! records on a [`ValidationReport`]; the validator describes the data
//! and the caller decides what to do about it.
//!
//! The generator enforces smoothness on the deseasonalized chain, so
//! the emitted rows carry seasonal and scenario shocks on top of it.
//! The smoothness checks here are therefore pass-rate checks: a series
//! fails only when the share of calm week pairs drops below a floor,
//! not on the first boundary jump.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use emporium_dimensions::{DimensionError, GeographyKey, SeasonalEvent, TimeKey};

use crate::assembler::FactRecord;
use crate::config::Band;
use crate::error::Result;
use crate::executor::Dataset;
use crate::report::{Constraint, ConstraintViolation};
use crate::seasonal::event_multiplier;

// ============================================================================
// Configuration
// ============================================================================

/// Thresholds for the post-run checks. Defaults mirror the generator's
/// own targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Target market-to-retailer-sum multiple.
    pub coverage_ratio: f64,
    /// Relative tolerance around `coverage_ratio`.
    pub ratio_tolerance: f64,
    /// Week-over-week cap for brand aggregates at the market node.
    pub aggregate_mom_cap: f64,
    /// Share of week pairs that must respect the aggregate cap.
    pub aggregate_mom_pass: f64,
    /// Week-over-week cap for single products at the market node.
    pub leaf_mom_cap: f64,
    /// Share of week pairs that must respect the leaf cap.
    pub leaf_mom_pass: f64,
    /// House-family share corridor at the market node.
    pub share_corridor: Band,
    /// In-window average sales must exceed the off-season average by
    /// this multiple for every event class.
    pub peak_ratio_min: f64,
    /// Populated fraction of the product x geography x period cross
    /// join.
    pub density_band: Band,
    /// Populated fraction an event class may keep outside its window.
    pub out_of_window_max: f64,
    /// Seasonal multiplier below which an event week counts as
    /// off-season.
    pub event_floor_gate: f64,
    /// Relative slack for the per-row accounting identities.
    pub identity_tolerance: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        ValidationConfig {
            coverage_ratio: 2.5,
            ratio_tolerance: 0.10,
            aggregate_mom_cap: 0.02,
            aggregate_mom_pass: 0.80,
            leaf_mom_cap: 0.15,
            leaf_mom_pass: 0.70,
            share_corridor: Band::new(0.04, 0.10),
            peak_ratio_min: 10.0,
            density_band: Band::new(0.30, 0.50),
            out_of_window_max: 0.10,
            event_floor_gate: 0.2,
            identity_tolerance: 1e-6,
        }
    }
}

// ============================================================================
// Report
// ============================================================================

/// Outcome of one named check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub name: String,
    /// Data points the check inspected.
    pub evaluated: usize,
    /// Breaches the check recorded.
    pub violations: usize,
    /// True when the run was too short or too empty to apply the check.
    pub skipped: bool,
}

/// Everything the validator found.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub checks: Vec<CheckOutcome>,
    pub violations: Vec<ConstraintViolation>,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn count_of(&self, constraint: Constraint) -> usize {
        self.violations
            .iter()
            .filter(|v| v.constraint == constraint)
            .count()
    }

    fn finish_check(&mut self, name: &str, evaluated: usize, before: usize, skipped: bool) {
        self.checks.push(CheckOutcome {
            name: name.to_string(),
            evaluated,
            violations: self.violations.len() - before,
            skipped,
        });
    }
}

// ============================================================================
// Entry point
// ============================================================================

/// Run every check against a dataset.
///
/// Fails only on malformed input (a fact row citing a key missing from
/// its dimension); constraint breaches are recorded, never fatal.
pub fn validate_dataset(dataset: &Dataset, config: &ValidationConfig) -> Result<ValidationReport> {
    let mut report = ValidationReport::default();
    let totals = scan_rows(dataset, config, &mut report)?;

    check_coverage(&totals, dataset, config, &mut report);
    check_parent_dominance(&totals, dataset, config, &mut report);
    check_brand_smoothness(&totals, config, &mut report);
    check_product_smoothness(&totals, dataset, config, &mut report);
    check_house_share(&totals, dataset, config, &mut report);
    check_seasonal_peaks(&totals, config, &mut report);
    check_density(&totals, dataset, config, &mut report);
    check_out_of_window(&totals, dataset, config, &mut report);

    info!(
        rows = totals.rows,
        checks = report.checks.len(),
        violations = report.violations.len(),
        "dataset validation finished"
    );
    Ok(report)
}

// ============================================================================
// Row scan
// ============================================================================

/// Everything the aggregate checks need, gathered in one pass over the
/// fact rows. The scan also runs the per-row accounting checks.
struct SeriesTotals {
    /// Value sales per geography node per period.
    node: Vec<Vec<f64>>,
    /// House-family value at the market node per period.
    house_root: Vec<f64>,
    /// Per-brand value at the market node per period.
    brand_root: IndexMap<String, Vec<f64>>,
    /// Per-product value at the market node per period, catalog order.
    product_root: Vec<Vec<f64>>,
    /// Market-node value per event class per period.
    event_root: [Vec<f64>; 3],
    /// Populated cells observed off-season per event class.
    event_out_cells: [usize; 3],
    /// Catalog population per event class.
    event_products: [usize; 3],
    /// Week of year per period index.
    weeks: Vec<u32>,
    rows: usize,
}

fn event_slot(event: SeasonalEvent) -> usize {
    match event {
        SeasonalEvent::Christmas => 0,
        SeasonalEvent::Easter => 1,
        SeasonalEvent::Valentine => 2,
    }
}

fn scan_rows(
    dataset: &Dataset,
    config: &ValidationConfig,
    report: &mut ValidationReport,
) -> Result<SeriesTotals> {
    let geo = &dataset.geography;
    let n_periods = dataset.time.len();
    let root = geo.root();
    let before = report.violations.len();

    let geo_index: IndexMap<GeographyKey, usize> = geo
        .nodes()
        .iter()
        .enumerate()
        .map(|(idx, node)| (node.key, idx))
        .collect();
    let period_index: IndexMap<TimeKey, usize> = dataset
        .time
        .periods()
        .iter()
        .map(|p| (p.time_key, p.index))
        .collect();

    let mut totals = SeriesTotals {
        node: vec![vec![0.0; n_periods]; geo.len()],
        house_root: vec![0.0; n_periods],
        brand_root: IndexMap::new(),
        product_root: vec![vec![0.0; n_periods]; dataset.catalog.len()],
        event_root: [
            vec![0.0; n_periods],
            vec![0.0; n_periods],
            vec![0.0; n_periods],
        ],
        event_out_cells: [0; 3],
        event_products: [0; 3],
        weeks: dataset.time.periods().iter().map(|p| p.week_of_year).collect(),
        rows: dataset.facts.len(),
    };
    for product in dataset.catalog.products() {
        if let Some(event) = product.seasonal_event {
            totals.event_products[event_slot(event)] += 1;
        }
        totals
            .brand_root
            .entry(product.brand.clone())
            .or_insert_with(|| vec![0.0; n_periods]);
    }

    let tol = config.identity_tolerance;
    for row in &dataset.facts {
        let product_idx = dataset.catalog.index_of(row.product_key)?;
        let product = dataset.catalog.product(product_idx);
        let node_idx = lookup(&geo_index, row.geography_key)?;
        let period = lookup(&period_index, row.time_key)?;

        check_row(row, product.multipack_count, tol, report);

        totals.node[node_idx][period] += row.value_sales;
        if node_idx == root {
            totals.product_root[product_idx][period] += row.value_sales;
            if product.owner_class.is_house() {
                totals.house_root[period] += row.value_sales;
            }
            if let Some(series) = totals.brand_root.get_mut(product.brand.as_str()) {
                series[period] += row.value_sales;
            }
        }
        if let Some(event) = product.seasonal_event {
            let slot = event_slot(event);
            if node_idx == root {
                totals.event_root[slot][period] += row.value_sales;
            }
            if event_multiplier(event, totals.weeks[period]) < config.event_floor_gate {
                totals.event_out_cells[slot] += 1;
            }
        }
    }

    report.finish_check("row_identities", dataset.facts.len(), before, false);
    Ok(totals)
}

fn lookup<K: std::hash::Hash + Eq + std::fmt::Display + Copy>(
    index: &IndexMap<K, usize>,
    key: K,
) -> Result<usize> {
    match index.get(&key) {
        Some(&idx) => Ok(idx),
        None => Err(DimensionError::UnknownKey {
            key: key.to_string(),
        }
        .into()),
    }
}

fn close(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol * a.abs().max(b.abs()).max(1.0)
}

/// Accounting checks for one row. At most one violation per category
/// per row, so a single bad cell cannot flood the report.
fn check_row(row: &FactRecord, multipack_count: u32, tol: f64, report: &mut ValidationReport) {
    let measures = [
        row.value_sales,
        row.volume_sales,
        row.unit_sales,
        row.base_value_sales,
        row.promo_value_sales,
        row.base_volume_sales,
        row.promo_volume_sales,
    ];
    let worst = measures.iter().copied().fold(f64::INFINITY, f64::min);
    if !worst.is_finite() || worst < 0.0 || row.price_per_unit <= 0.0 {
        report.violations.push(ConstraintViolation {
            period: Some(row.time_key),
            subject: row_subject(row),
            constraint: Constraint::NonNegative,
            observed: if worst.is_finite() { worst } else { f64::NAN },
            bound: (0.0, f64::INFINITY),
        });
    }

    let slack = tol * row.value_sales.abs().max(1.0);
    if row.promo_value_sales > row.value_sales + slack
        || row.promo_volume_sales > row.volume_sales + slack
    {
        report.violations.push(ConstraintViolation {
            period: Some(row.time_key),
            subject: row_subject(row),
            constraint: Constraint::PromoWithinTotal,
            observed: row.promo_value_sales,
            bound: (0.0, row.value_sales),
        });
    }

    let identities = [
        (row.value_sales, row.volume_sales * row.price_per_unit),
        (row.value_sales, row.base_value_sales + row.promo_value_sales),
        (row.volume_sales, row.base_volume_sales + row.promo_volume_sales),
        (row.unit_sales, row.volume_sales * multipack_count as f64),
    ];
    for (stated, derived) in identities {
        if !close(stated, derived, tol) {
            report.violations.push(ConstraintViolation {
                period: Some(row.time_key),
                subject: row_subject(row),
                constraint: Constraint::ValueIdentity,
                observed: stated,
                bound: (derived - tol * derived.abs().max(1.0), derived + tol * derived.abs().max(1.0)),
            });
            break;
        }
    }
}

fn row_subject(row: &FactRecord) -> String {
    format!("product {} at {}", row.product_key, row.geography_key)
}

// ============================================================================
// Aggregate checks
// ============================================================================

fn check_coverage(
    totals: &SeriesTotals,
    dataset: &Dataset,
    config: &ValidationConfig,
    report: &mut ValidationReport,
) {
    let geo = &dataset.geography;
    let before = report.violations.len();
    let band_lo = config.coverage_ratio * (1.0 - config.ratio_tolerance);
    let band_hi = config.coverage_ratio * (1.0 + config.ratio_tolerance);
    let mut evaluated = 0;

    for period in dataset.time.periods() {
        let root_value = totals.node[geo.root()][period.index];
        let retailer_sum: f64 = geo
            .retailers()
            .iter()
            .map(|&idx| totals.node[idx][period.index])
            .sum();
        if root_value <= 0.0 || retailer_sum <= 0.0 {
            continue;
        }
        evaluated += 1;
        let ratio = root_value / retailer_sum;
        if ratio < band_lo || ratio > band_hi {
            report.violations.push(ConstraintViolation {
                period: Some(period.time_key),
                subject: "market / retailer rollup".to_string(),
                constraint: Constraint::CoverageRatio,
                observed: ratio,
                bound: (band_lo, band_hi),
            });
        }
    }

    report.finish_check("coverage_ratio", evaluated, before, evaluated == 0);
}

fn check_parent_dominance(
    totals: &SeriesTotals,
    dataset: &Dataset,
    config: &ValidationConfig,
    report: &mut ValidationReport,
) {
    let geo = &dataset.geography;
    let before = report.violations.len();
    let mut evaluated = 0;

    for &parent in geo.retailers() {
        let children = geo.children_of(parent);
        if children.is_empty() {
            continue;
        }
        for period in dataset.time.periods() {
            let parent_value = totals.node[parent][period.index];
            let child_sum: f64 = children
                .iter()
                .map(|&c| totals.node[c][period.index])
                .sum();
            if parent_value <= 0.0 && child_sum <= 0.0 {
                continue;
            }
            evaluated += 1;
            let slack = config.identity_tolerance * parent_value.max(1.0);
            if child_sum > parent_value + slack {
                report.violations.push(ConstraintViolation {
                    period: Some(period.time_key),
                    subject: geo.node(parent).description.clone(),
                    constraint: Constraint::ParentChildSum,
                    observed: child_sum,
                    bound: (0.0, parent_value),
                });
            }
        }
    }

    report.finish_check("parent_dominance", evaluated, before, evaluated == 0);
}

/// Share of calm week pairs in a series, skipping pairs with an absent
/// side. `None` when no pair is comparable.
fn mom_pass_rate(series: &[f64], cap: f64) -> Option<(usize, f64)> {
    let mut pairs = 0;
    let mut breaches = 0;
    for pair in series.windows(2) {
        let (prev, curr) = (pair[0], pair[1]);
        if prev <= 0.0 || curr <= 0.0 {
            continue;
        }
        pairs += 1;
        if ((curr - prev) / prev).abs() > cap {
            breaches += 1;
        }
    }
    if pairs == 0 {
        return None;
    }
    Some((pairs, 1.0 - breaches as f64 / pairs as f64))
}

fn check_brand_smoothness(
    totals: &SeriesTotals,
    config: &ValidationConfig,
    report: &mut ValidationReport,
) {
    let before = report.violations.len();
    let mut evaluated = 0;

    for (brand, series) in &totals.brand_root {
        if let Some((pairs, pass_rate)) = mom_pass_rate(series, config.aggregate_mom_cap) {
            evaluated += pairs;
            if pass_rate < config.aggregate_mom_pass {
                report.violations.push(ConstraintViolation {
                    period: None,
                    subject: format!("brand {brand}"),
                    constraint: Constraint::MomBand,
                    observed: pass_rate,
                    bound: (config.aggregate_mom_pass, 1.0),
                });
            }
        }
    }

    report.finish_check("brand_smoothness", evaluated, before, evaluated == 0);
}

fn check_product_smoothness(
    totals: &SeriesTotals,
    dataset: &Dataset,
    config: &ValidationConfig,
    report: &mut ValidationReport,
) {
    let before = report.violations.len();
    let mut evaluated = 0;

    for (idx, series) in totals.product_root.iter().enumerate() {
        if let Some((pairs, pass_rate)) = mom_pass_rate(series, config.leaf_mom_cap) {
            evaluated += pairs;
            if pass_rate < config.leaf_mom_pass {
                report.violations.push(ConstraintViolation {
                    period: None,
                    subject: format!("product {}", dataset.catalog.product(idx).key),
                    constraint: Constraint::MomBand,
                    observed: pass_rate,
                    bound: (config.leaf_mom_pass, 1.0),
                });
            }
        }
    }

    report.finish_check("product_smoothness", evaluated, before, evaluated == 0);
}

fn check_house_share(
    totals: &SeriesTotals,
    dataset: &Dataset,
    config: &ValidationConfig,
    report: &mut ValidationReport,
) {
    let root = dataset.geography.root();
    let before = report.violations.len();
    let tol = config.identity_tolerance;
    let mut evaluated = 0;

    for period in dataset.time.periods() {
        let total = totals.node[root][period.index];
        let family = totals.house_root[period.index];
        if total <= 0.0 || family <= 0.0 {
            continue;
        }
        evaluated += 1;
        let share = family / total;
        if share + tol < config.share_corridor.lo || share - tol > config.share_corridor.hi {
            report.violations.push(ConstraintViolation {
                period: Some(period.time_key),
                subject: "house family".to_string(),
                constraint: Constraint::BrandShareBand,
                observed: share,
                bound: (config.share_corridor.lo, config.share_corridor.hi),
            });
        }
    }

    report.finish_check("house_share", evaluated, before, evaluated == 0);
}

fn check_seasonal_peaks(
    totals: &SeriesTotals,
    config: &ValidationConfig,
    report: &mut ValidationReport,
) {
    let before = report.violations.len();
    let mut evaluated = 0;

    for event in SeasonalEvent::ALL {
        let slot = event_slot(event);
        if totals.event_products[slot] == 0 {
            continue;
        }
        let mut in_sum = 0.0;
        let mut in_count = 0usize;
        let mut out_sum = 0.0;
        let mut out_count = 0usize;
        for (period, &week) in totals.weeks.iter().enumerate() {
            let value = totals.event_root[slot][period];
            if event_multiplier(event, week) >= config.event_floor_gate {
                in_sum += value;
                in_count += 1;
            } else {
                out_sum += value;
                out_count += 1;
            }
        }
        // The ratio needs both sides of the window in the run.
        if in_count == 0 || out_count == 0 || out_sum <= 0.0 {
            continue;
        }
        evaluated += 1;
        let ratio = (in_sum / in_count as f64) / (out_sum / out_count as f64);
        if ratio < config.peak_ratio_min {
            report.violations.push(ConstraintViolation {
                period: None,
                subject: format!("{event} lines"),
                constraint: Constraint::SeasonalPeak,
                observed: ratio,
                bound: (config.peak_ratio_min, f64::INFINITY),
            });
        }
    }

    report.finish_check("seasonal_peaks", evaluated, before, evaluated == 0);
}

fn check_density(
    totals: &SeriesTotals,
    dataset: &Dataset,
    config: &ValidationConfig,
    report: &mut ValidationReport,
) {
    let before = report.violations.len();
    let possible = dataset.catalog.len() * dataset.geography.len() * dataset.time.len();
    if possible == 0 {
        report.finish_check("density", 0, before, true);
        return;
    }

    let fraction = totals.rows as f64 / possible as f64;
    if !config.density_band.contains(fraction) {
        report.violations.push(ConstraintViolation {
            period: None,
            subject: "populated cells".to_string(),
            constraint: Constraint::Sparsity,
            observed: fraction,
            bound: (config.density_band.lo, config.density_band.hi),
        });
    }

    report.finish_check("density", possible, before, false);
}

fn check_out_of_window(
    totals: &SeriesTotals,
    dataset: &Dataset,
    config: &ValidationConfig,
    report: &mut ValidationReport,
) {
    let before = report.violations.len();
    let mut evaluated = 0;

    for event in SeasonalEvent::ALL {
        let slot = event_slot(event);
        let out_periods = totals
            .weeks
            .iter()
            .filter(|&&week| event_multiplier(event, week) < config.event_floor_gate)
            .count();
        let possible = totals.event_products[slot] * dataset.geography.len() * out_periods;
        if possible == 0 {
            continue;
        }
        evaluated += possible;
        let fraction = totals.event_out_cells[slot] as f64 / possible as f64;
        if fraction > config.out_of_window_max {
            report.violations.push(ConstraintViolation {
                period: None,
                subject: format!("{event} off-season cells"),
                constraint: Constraint::Sparsity,
                observed: fraction,
                bound: (0.0, config.out_of_window_max),
            });
        }
    }

    report.finish_check("out_of_window", evaluated, before, evaluated == 0);
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeneratorConfig;
    use crate::executor::GeneratorRuntime;
    use crate::report::RunReport;
    use chrono::NaiveDate;
    use emporium_dimensions::{
        CatalogSpec, GeographyDim, ProductCatalog, ProductRecord, TimeDim,
    };
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn fixtures(periods: usize) -> (ProductCatalog, GeographyDim, TimeDim) {
        let spec = CatalogSpec {
            product_count: 400,
            house_product_count: 20,
            brand_target: 120,
        };
        let catalog = ProductCatalog::build(&spec, &mut StdRng::seed_from_u64(11)).unwrap();
        let geo = GeographyDim::build();
        let start = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
        let time = TimeDim::build(start, periods).unwrap();
        (catalog, geo, time)
    }

    fn fact(product: &ProductRecord, geo_key: GeographyKey, time_key: TimeKey, value: f64) -> FactRecord {
        let price = product.base_price;
        let volume = value / price;
        FactRecord {
            product_key: product.key,
            geography_key: geo_key,
            time_key,
            value_sales: value,
            volume_sales: volume,
            unit_sales: volume * product.multipack_count as f64,
            price_per_unit: price,
            base_value_sales: value,
            promo_value_sales: 0.0,
            base_volume_sales: volume,
            promo_volume_sales: 0.0,
            store_count: 100,
            stores_selling: 80,
            weighted_distribution: 80.0,
            out_of_stock: false,
            size_code: product.size_code.clone(),
        }
    }

    fn dataset(periods: usize, facts: Vec<FactRecord>) -> Dataset {
        let (catalog, geography, time) = fixtures(periods);
        Dataset {
            catalog,
            geography,
            time,
            facts,
            report: RunReport::default(),
        }
    }

    /// Rows at the market node plus every retailer, sized so the
    /// coverage ratio lands exactly on target.
    fn balanced_period(
        catalog: &ProductCatalog,
        geo: &GeographyDim,
        time_key: TimeKey,
        scale: f64,
    ) -> Vec<FactRecord> {
        let product = catalog.product(0);
        let retailers = geo.retailers();
        let per_retailer = scale / retailers.len() as f64;
        let mut rows = vec![fact(product, geo.node(geo.root()).key, time_key, 2.5 * scale)];
        for &idx in retailers {
            rows.push(fact(product, geo.node(idx).key, time_key, per_retailer));
        }
        rows
    }

    #[test]
    fn test_clean_rows_pass_accounting_checks() {
        let (catalog, geo, time) = fixtures(2);
        let mut facts = Vec::new();
        for period in time.periods() {
            facts.extend(balanced_period(&catalog, &geo, period.time_key, 1000.0));
        }
        let data = dataset(2, facts);

        let report = validate_dataset(&data, &ValidationConfig::default()).unwrap();

        assert_eq!(report.count_of(Constraint::NonNegative), 0);
        assert_eq!(report.count_of(Constraint::PromoWithinTotal), 0);
        assert_eq!(report.count_of(Constraint::ValueIdentity), 0);
        assert_eq!(report.count_of(Constraint::CoverageRatio), 0);
        assert!(report.checks.iter().any(|c| c.name == "row_identities"));
    }

    #[test]
    fn test_broken_value_identity_is_flagged() {
        let (catalog, geo, time) = fixtures(1);
        let mut facts = balanced_period(&catalog, &geo, time.periods()[0].time_key, 1000.0);
        facts[0].value_sales += 1.0;
        let data = dataset(1, facts);

        let report = validate_dataset(&data, &ValidationConfig::default()).unwrap();

        assert_eq!(report.count_of(Constraint::ValueIdentity), 1);
        assert!(!report.passed());
    }

    #[test]
    fn test_negative_measure_is_flagged() {
        let (catalog, geo, time) = fixtures(1);
        let mut facts = balanced_period(&catalog, &geo, time.periods()[0].time_key, 1000.0);
        facts[1].promo_volume_sales = -5.0;
        let data = dataset(1, facts);

        let report = validate_dataset(&data, &ValidationConfig::default()).unwrap();

        assert_eq!(report.count_of(Constraint::NonNegative), 1);
    }

    #[test]
    fn test_promo_exceeding_total_is_flagged() {
        let (catalog, geo, time) = fixtures(1);
        let mut facts = balanced_period(&catalog, &geo, time.periods()[0].time_key, 1000.0);
        facts[0].promo_value_sales = facts[0].value_sales * 1.5;
        facts[0].base_value_sales = 0.0;
        let data = dataset(1, facts);

        let report = validate_dataset(&data, &ValidationConfig::default()).unwrap();

        assert_eq!(report.count_of(Constraint::PromoWithinTotal), 1);
        assert_eq!(report.count_of(Constraint::ValueIdentity), 1);
    }

    #[test]
    fn test_coverage_breach_is_flagged_per_period() {
        let (catalog, geo, time) = fixtures(2);
        let keys: Vec<TimeKey> = time.periods().iter().map(|p| p.time_key).collect();
        let mut facts = balanced_period(&catalog, &geo, keys[0], 1000.0);
        // Second period: market node at four times the retailer sum.
        let mut skewed = balanced_period(&catalog, &geo, keys[1], 1000.0);
        skewed[0].value_sales *= 1.6;
        skewed[0].volume_sales *= 1.6;
        skewed[0].unit_sales *= 1.6;
        skewed[0].base_value_sales *= 1.6;
        skewed[0].base_volume_sales *= 1.6;
        facts.extend(skewed);
        let data = dataset(2, facts);

        let report = validate_dataset(&data, &ValidationConfig::default()).unwrap();

        assert_eq!(report.count_of(Constraint::CoverageRatio), 1);
        assert_eq!(report.violations[0].period, Some(keys[1]));
    }

    #[test]
    fn test_oversized_children_are_flagged() {
        let (catalog, geo, time) = fixtures(1);
        let time_key = time.periods()[0].time_key;
        let product = catalog.product(0);
        let parent = geo.retailers()[0];
        let mut facts = vec![fact(product, geo.node(parent).key, time_key, 100.0)];
        for &child in geo.children_of(parent) {
            facts.push(fact(product, geo.node(child).key, time_key, 40.0));
        }
        let data = dataset(1, facts);

        let report = validate_dataset(&data, &ValidationConfig::default()).unwrap();

        assert_eq!(report.count_of(Constraint::ParentChildSum), 1);
        assert_eq!(
            report.violations[0].subject,
            geo.node(parent).description
        );
    }

    #[test]
    fn test_smooth_root_series_passes_mom() {
        let (catalog, geo, time) = fixtures(12);
        let staple = catalog
            .products()
            .iter()
            .find(|p| p.seasonal_event.is_none())
            .unwrap();
        let root_key = geo.node(geo.root()).key;
        let facts: Vec<FactRecord> = time
            .periods()
            .iter()
            .map(|p| {
                let drift = 1.0 + 0.01 * (p.index % 2) as f64;
                fact(staple, root_key, p.time_key, 1000.0 * drift)
            })
            .collect();
        let data = dataset(12, facts);

        let report = validate_dataset(&data, &ValidationConfig::default()).unwrap();

        assert_eq!(report.count_of(Constraint::MomBand), 0);
    }

    #[test]
    fn test_choppy_root_series_fails_mom() {
        let (catalog, geo, time) = fixtures(12);
        let staple = catalog
            .products()
            .iter()
            .find(|p| p.seasonal_event.is_none())
            .unwrap();
        let root_key = geo.node(geo.root()).key;
        let facts: Vec<FactRecord> = time
            .periods()
            .iter()
            .map(|p| {
                let level = if p.index % 2 == 0 { 1000.0 } else { 1600.0 };
                fact(staple, root_key, p.time_key, level)
            })
            .collect();
        let data = dataset(12, facts);

        let report = validate_dataset(&data, &ValidationConfig::default()).unwrap();

        // Every pair jumps 60%: both the leaf and the brand series fail.
        assert_eq!(report.count_of(Constraint::MomBand), 2);
    }

    #[test]
    fn test_house_share_corridor_is_period_scoped() {
        let (catalog, geo, time) = fixtures(2);
        let keys: Vec<TimeKey> = time.periods().iter().map(|p| p.time_key).collect();
        let house = &catalog.products()[catalog.house_indices()[0]];
        let other = catalog
            .products()
            .iter()
            .find(|p| !p.owner_class.is_house())
            .unwrap();
        let root_key = geo.node(geo.root()).key;

        let facts = vec![
            fact(house, root_key, keys[0], 70.0),
            fact(other, root_key, keys[0], 930.0),
            fact(house, root_key, keys[1], 200.0),
            fact(other, root_key, keys[1], 800.0),
        ];
        let data = dataset(2, facts);

        let report = validate_dataset(&data, &ValidationConfig::default()).unwrap();

        assert_eq!(report.count_of(Constraint::BrandShareBand), 1);
        let breach = report
            .violations
            .iter()
            .find(|v| v.constraint == Constraint::BrandShareBand)
            .unwrap();
        assert_eq!(breach.period, Some(keys[1]));
        assert!((breach.observed - 0.2).abs() < 1e-12);
    }

    /// Some seasonal line plus the event it sells into.
    fn event_line(catalog: &ProductCatalog) -> (&ProductRecord, SeasonalEvent) {
        let product = catalog
            .products()
            .iter()
            .find(|p| p.seasonal_event.is_some())
            .unwrap();
        (product, product.seasonal_event.unwrap())
    }

    #[test]
    fn test_flat_event_series_fails_peak_check() {
        let (catalog, geo, time) = fixtures(52);
        let (line, event) = event_line(&catalog);
        let root_key = geo.node(geo.root()).key;
        let facts: Vec<FactRecord> = time
            .periods()
            .iter()
            .map(|p| fact(line, root_key, p.time_key, 100.0))
            .collect();
        let data = dataset(52, facts);

        let report = validate_dataset(&data, &ValidationConfig::default()).unwrap();

        assert!(
            report
                .violations
                .iter()
                .any(|v| v.constraint == Constraint::SeasonalPeak
                    && v.subject.starts_with(&event.to_string()))
        );
    }

    #[test]
    fn test_peaked_event_series_passes_peak_check() {
        let (catalog, geo, time) = fixtures(52);
        let (line, event) = event_line(&catalog);
        let root_key = geo.node(geo.root()).key;
        let facts: Vec<FactRecord> = time
            .periods()
            .iter()
            .map(|p| {
                let level = if event_multiplier(event, p.week_of_year) >= 0.2 {
                    500.0
                } else {
                    10.0
                };
                fact(line, root_key, p.time_key, level)
            })
            .collect();
        let data = dataset(52, facts);

        let report = validate_dataset(&data, &ValidationConfig::default()).unwrap();

        assert!(
            !report
                .violations
                .iter()
                .any(|v| v.constraint == Constraint::SeasonalPeak)
        );
    }

    #[test]
    fn test_sparse_dataset_fails_density_band() {
        let (catalog, geo, time) = fixtures(4);
        let facts = balanced_period(&catalog, &geo, time.periods()[0].time_key, 1000.0);
        let data = dataset(4, facts);

        let report = validate_dataset(&data, &ValidationConfig::default()).unwrap();

        assert!(
            report
                .violations
                .iter()
                .any(|v| v.constraint == Constraint::Sparsity && v.subject == "populated cells")
        );
    }

    #[test]
    fn test_unknown_geography_key_is_fatal() {
        let (catalog, _, time) = fixtures(1);
        let product = catalog.product(0);
        let row = fact(product, GeographyKey(999), time.periods()[0].time_key, 10.0);
        let data = dataset(1, vec![row]);

        assert!(validate_dataset(&data, &ValidationConfig::default()).is_err());
    }

    #[test]
    fn test_generated_dataset_passes_structural_checks() {
        let config = GeneratorConfig {
            periods: 8,
            catalog: CatalogSpec {
                product_count: 300,
                house_product_count: 20,
                brand_target: 120,
            },
            ..GeneratorConfig::default()
        };
        let data = GeneratorRuntime::new(config).unwrap().run().unwrap();

        let report = validate_dataset(&data, &ValidationConfig::default()).unwrap();

        for constraint in [
            Constraint::NonNegative,
            Constraint::PromoWithinTotal,
            Constraint::ValueIdentity,
            Constraint::CoverageRatio,
            Constraint::ParentChildSum,
            Constraint::BrandShareBand,
        ] {
            assert_eq!(
                report.count_of(constraint),
                0,
                "unexpected {constraint} breaches"
            );
        }
        let rows = report
            .checks
            .iter()
            .find(|c| c.name == "row_identities")
            .unwrap();
        assert_eq!(rows.evaluated, data.facts.len());
    }
}
