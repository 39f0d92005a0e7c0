//! Integration tests for end-to-end dataset generation.
//!
//! These tests verify the full pipeline:
//! Configure → Generate → Write → Validate

use emporium_dimensions::TimeKey;
use emporium_engine::scenario::{
    AttributeFilter, ShrinkflationConfig, SupplyDisruptionConfig, ViralSpikeConfig,
};
use emporium_engine::{
    Constraint, GeneratorConfig, ScenarioConfig, ValidationConfig, validate_dataset,
};
use emporium_output::{
    RunManifest, read_facts, read_geographies, read_periods, read_products, write_dataset,
};
use emporium_tests::{TestRun, small_config};

/// Test that a year-long run satisfies the hard statistical contracts.
///
/// Verifies: row identities, coverage ratio, parent dominance, the
/// house share corridor, seasonal peak separation, and cell density.
/// The week-over-week pass-rate checks need a longer horizon to settle
/// and are covered by the validator's own unit tests.
#[test]
fn test_year_long_run_passes_structural_checks() {
    let run = TestRun::generate(small_config(400, 52, 1901));
    let report = validate_dataset(&run.dataset, &ValidationConfig::default()).unwrap();

    for constraint in [
        Constraint::NonNegative,
        Constraint::PromoWithinTotal,
        Constraint::ValueIdentity,
        Constraint::CoverageRatio,
        Constraint::ParentChildSum,
        Constraint::BrandShareBand,
        Constraint::SeasonalPeak,
    ] {
        assert_eq!(report.count_of(constraint), 0, "{constraint} violations");
    }

    let density = report
        .checks
        .iter()
        .find(|c| c.name == "density")
        .expect("density check ran");
    assert!(!density.skipped);
    assert_eq!(density.violations, 0);

    // A year of weekly data runs every check at least once.
    assert_eq!(report.checks.len(), 9);
    assert!(report.checks.iter().all(|c| !c.skipped));
}

/// Test that generation is deterministic.
///
/// Same config, same seed: bit-identical facts and the same report.
#[test]
fn test_rerun_is_deterministic() {
    let a = TestRun::generate(small_config(250, 10, 7));
    let b = TestRun::generate(small_config(250, 10, 7));

    assert_eq!(a.dataset.facts, b.dataset.facts);
    assert_eq!(
        a.dataset.report.violations.len(),
        b.dataset.report.violations.len()
    );
    assert_eq!(a.dataset.report.degeneracies, b.dataset.report.degeneracies);
}

/// Test that the seed actually drives the draws.
#[test]
fn test_seed_changes_the_data() {
    let a = TestRun::generate(small_config(250, 10, 7));
    let b = TestRun::generate(small_config(250, 10, 8));
    assert_ne!(a.dataset.facts, b.dataset.facts);
}

/// Test that writing a dataset and reading it back loses nothing.
///
/// Dimension row counts survive, fact rows compare equal bit for bit,
/// and the manifest describes the run it sits next to.
#[test]
fn test_dataset_round_trips_through_files() {
    let config = small_config(200, 12, 31);
    let run = TestRun::generate(config.clone());
    let dir = tempfile::tempdir().unwrap();

    let paths = write_dataset(&run.dataset, dir.path()).unwrap();
    RunManifest::new(&config, &run.dataset)
        .write(dir.path())
        .unwrap();

    assert_eq!(
        read_products(&paths.products).unwrap().len(),
        run.dataset.catalog.len()
    );
    assert_eq!(
        read_geographies(&paths.geographies).unwrap().len(),
        run.dataset.geography.len()
    );
    assert_eq!(
        read_periods(&paths.periods).unwrap().len(),
        run.dataset.time.len()
    );

    let mut rows = Vec::new();
    for path in &paths.facts {
        rows.extend(read_facts(path).unwrap());
    }
    assert_eq!(rows, run.dataset.facts);

    let manifest = RunManifest::load(dir.path()).unwrap();
    assert_eq!(manifest.seed, config.seed);
    assert_eq!(manifest.fact_rows, run.dataset.facts.len());
    assert_eq!(manifest.periods, run.dataset.time.len());
}

/// Test that a viral spike multiplies its targets from the onset week.
///
/// Periods before the onset must be bit-identical to an undisturbed
/// run: effects are a pure function of (product, period) and the base
/// streams never see the scenario list.
#[test]
fn test_viral_spike_lifts_target_demand() {
    let onset = 6;
    let base_config = small_config(300, 12, 55);
    let baseline = TestRun::generate(base_config.clone());

    let sample = baseline.dataset.catalog.product(0);
    let target = AttributeFilter {
        subsegment: Some(sample.subsegment.clone()),
        price_class: Some(sample.price_class),
        ..AttributeFilter::default()
    };

    let mut config = base_config;
    config
        .scenarios
        .push(ScenarioConfig::ViralSpike(ViralSpikeConfig {
            name: "press_feature".to_string(),
            target: target.clone(),
            onset_period: onset,
            magnitude: 4.0,
            cap_volume: 1e9,
            cap_weeks: 1,
            decay: 0.5,
        }));
    let spiked = TestRun::generate(config);

    let onset_key = baseline.time_key(onset);
    assert_eq!(
        baseline.facts_where(|f| f.time_key < onset_key),
        spiked.facts_where(|f| f.time_key < onset_key)
    );

    let base_vol = baseline.root_volume_where(onset_key, |p| target.matches(p));
    let spike_vol = spiked.root_volume_where(onset_key, |p| target.matches(p));
    assert!(base_vol > 0.0);
    assert!(
        spike_vol > base_vol * 1.5,
        "expected a clear onset lift, got {base_vol} -> {spike_vol}"
    );
}

/// Test that a supply outage marks its window out of stock and
/// depresses volume, and that availability recovers when it closes.
#[test]
fn test_supply_disruption_marks_out_of_stock() {
    let base_config = small_config(300, 10, 23);
    let baseline = TestRun::generate(base_config.clone());

    let sample = baseline.dataset.catalog.product(0);
    let target = AttributeFilter {
        subsegment: Some(sample.subsegment.clone()),
        price_class: Some(sample.price_class),
        ..AttributeFilter::default()
    };

    let mut config = base_config;
    config
        .scenarios
        .push(ScenarioConfig::SupplyDisruption(SupplyDisruptionConfig {
            name: "recall".to_string(),
            target: target.clone(),
            competitors: None,
            start_period: 4,
            end_period: 6,
            availability: 0.3,
            competitor_uplift: 0.25,
        }));
    let run = TestRun::generate(config);

    let window: Vec<TimeKey> = (4..=6).map(|p| run.time_key(p)).collect();
    let mut window_rows = 0;
    for fact in &run.dataset.facts {
        if !target.matches(run.product_of(fact)) {
            continue;
        }
        if window.contains(&fact.time_key) {
            assert!(fact.out_of_stock, "window row not flagged");
            window_rows += 1;
        } else {
            assert!(!fact.out_of_stock, "flag leaked outside the window");
        }
    }
    assert!(window_rows > 0);

    let disrupted: f64 = window
        .iter()
        .map(|&k| run.root_volume_where(k, |p| target.matches(p)))
        .sum();
    let normal: f64 = window
        .iter()
        .map(|&k| baseline.root_volume_where(k, |p| target.matches(p)))
        .sum();
    assert!(
        disrupted < normal * 0.7,
        "expected a volume drop, got {normal} -> {disrupted}"
    );
}

/// Test that shrinkflation rewrites the size code from the switch on.
#[test]
fn test_shrinkflation_rewrites_size_code() {
    let target = AttributeFilter {
        private_label: Some(true),
        ..AttributeFilter::default()
    };

    let mut config = small_config(250, 8, 77);
    config
        .scenarios
        .push(ScenarioConfig::Shrinkflation(ShrinkflationConfig {
            name: "quiet_cut".to_string(),
            target: target.clone(),
            switch_period: 4,
            size_factor: 0.8,
            volume_penalty: 0.05,
        }));
    let run = TestRun::generate(config);

    let switch_key = run.time_key(4);
    let mut switched = 0;
    for fact in &run.dataset.facts {
        let product = run.product_of(fact);
        if !target.matches(product) {
            continue;
        }
        if fact.time_key < switch_key {
            assert_eq!(fact.size_code, product.size_code);
        } else {
            assert_ne!(fact.size_code, product.size_code);
            switched += 1;
        }
    }
    assert!(switched > 0);
}

/// Test that a YAML config with a scenario drives a complete run.
#[test]
fn test_yaml_config_drives_full_run() {
    let yaml = r#"
seed: 99
periods: 8
catalog:
  product_count: 150
  house_product_count: 10
  brand_target: 60
scenarios:
  - type: shrinkflation
    name: quiet_cut
    switch_period: 5
    target:
      private_label: true
"#;
    let config = GeneratorConfig::from_yaml(yaml).unwrap();
    let run = TestRun::generate(config);

    assert_eq!(run.dataset.time.len(), 8);
    assert_eq!(run.dataset.catalog.len(), 150);
    assert!(!run.dataset.facts.is_empty());
}
