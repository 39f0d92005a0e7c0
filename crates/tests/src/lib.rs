//! Integration test harness for emporium.
//!
//! This crate provides utilities for end-to-end testing of the full
//! generation pipeline: Configure → Generate → Write → Validate.

use emporium_dimensions::{CatalogSpec, GeographyKey, ProductRecord, TimeKey};
use emporium_engine::{Dataset, FactRecord, GeneratorConfig, GeneratorRuntime};

/// A config small enough for tests that still exercises every phase:
/// seasonality, elasticity, smoothing, both corrections, and assembly.
pub fn small_config(products: usize, periods: usize, seed: u64) -> GeneratorConfig {
    GeneratorConfig {
        seed,
        periods,
        catalog: CatalogSpec {
            product_count: products,
            house_product_count: products / 15,
            brand_target: 120,
        },
        ..GeneratorConfig::default()
    }
}

/// One completed generation run.
pub struct TestRun {
    pub dataset: Dataset,
}

impl TestRun {
    /// Run the full pipeline for `config`.
    ///
    /// # Panics
    ///
    /// Panics if the config is rejected or generation fails.
    pub fn generate(config: GeneratorConfig) -> Self {
        let runtime = GeneratorRuntime::new(config).expect("config rejected");
        let dataset = runtime.run().expect("generation failed");
        TestRun { dataset }
    }

    /// Key of the total-market node.
    pub fn root_key(&self) -> GeographyKey {
        let geo = &self.dataset.geography;
        geo.node(geo.root()).key
    }

    /// Time key of a 0-based period index.
    pub fn time_key(&self, period: usize) -> TimeKey {
        self.dataset.time.period(period).time_key
    }

    /// Catalog record behind a fact row.
    pub fn product_of(&self, fact: &FactRecord) -> &ProductRecord {
        let idx = self
            .dataset
            .catalog
            .index_of(fact.product_key)
            .expect("fact references unknown product");
        self.dataset.catalog.product(idx)
    }

    /// Facts selected by `pred`, in emission order.
    pub fn facts_where(&self, pred: impl Fn(&FactRecord) -> bool) -> Vec<&FactRecord> {
        self.dataset.facts.iter().filter(|f| pred(f)).collect()
    }

    /// Market-node volume in one week, over products selected by `pred`.
    pub fn root_volume_where(&self, key: TimeKey, pred: impl Fn(&ProductRecord) -> bool) -> f64 {
        let root = self.root_key();
        self.dataset
            .facts
            .iter()
            .filter(|f| f.geography_key == root && f.time_key == key)
            .filter(|f| pred(self.product_of(f)))
            .map(|f| f.volume_sales)
            .sum()
    }
}
