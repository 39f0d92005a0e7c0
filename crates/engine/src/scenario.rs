//! Scenario injection.
//!
//! Scenarios are declarative market events layered onto the base
//! series: a launch cannibalizing its neighbors, a product going
//! viral into a supply cap, a supplier outage, a quiet pack-size cut.
//! Each one names its participants with an attribute filter that is
//! resolved against the catalog once, up front; effect lookup during
//! generation is a pure function of (product, period) with no state.
//!
//! Effects are applied in declared scenario order, each one seeing the
//! output of the previous, so two scenarios touching the same product
//! compose the way they are listed.

use serde::{Deserialize, Serialize};
use tracing::info;

use emporium_dimensions::{
    ManufacturerClass, OwnerClass, PackFormat, PriceClass, ProductCatalog, ProductRecord,
    SeasonalEvent, StoreClass,
};

use crate::error::{Error, Result};

// ============================================================================
// Attribute filters
// ============================================================================

/// Conjunctive product filter: every populated field must match.
///
/// Filters select on catalog attributes, never on display text, so a
/// renamed product keeps its scenario membership.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeFilter {
    pub owner_class: Option<OwnerClass>,
    pub manufacturer_class: Option<ManufacturerClass>,
    pub price_class: Option<PriceClass>,
    pub segment: Option<String>,
    pub subsegment: Option<String>,
    pub seasonal_event: Option<SeasonalEvent>,
    pub pack_format: Option<PackFormat>,
    pub private_label: Option<bool>,
}

impl AttributeFilter {
    pub fn matches(&self, product: &ProductRecord) -> bool {
        self.owner_class.is_none_or(|v| v == product.owner_class)
            && self
                .manufacturer_class
                .is_none_or(|v| v == product.manufacturer_class)
            && self.price_class.is_none_or(|v| v == product.price_class)
            && self.segment.as_ref().is_none_or(|v| *v == product.segment)
            && self
                .subsegment
                .as_ref()
                .is_none_or(|v| *v == product.subsegment)
            && self
                .seasonal_event
                .is_none_or(|v| Some(v) == product.seasonal_event)
            && self.pack_format.is_none_or(|v| v == product.pack_format)
            && self.private_label.is_none_or(|v| v == product.private_label)
    }
}

// ============================================================================
// Effects
// ============================================================================

/// Per-store-class multipliers for a scale effect. The market total is
/// not scaled directly; the runtime re-derives it from the retailer
/// movement so the coverage ratio survives class-skewed shocks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassFactors {
    pub supermarket: f64,
    pub convenience: f64,
    pub online: f64,
}

impl ClassFactors {
    pub fn uniform(factor: f64) -> Self {
        ClassFactors {
            supermarket: factor,
            convenience: factor,
            online: factor,
        }
    }

    pub fn factor(&self, class: StoreClass) -> f64 {
        match class {
            StoreClass::TotalMarket => 1.0,
            StoreClass::Major | StoreClass::Premium | StoreClass::Discount => self.supermarket,
            StoreClass::Convenience => self.convenience,
            StoreClass::Online => self.online,
        }
    }
}

/// One scenario's contribution to one (product, period) cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScenarioEffect {
    /// Multiply the cell by class-dependent factors.
    Scale(ClassFactors),
    /// Hard ceiling on the cell's weekly volume units. Models a
    /// stock-out: demand stays high while almost nothing ships.
    CapVolume(f64),
    /// Fraction of normal availability; scales the cell and marks it
    /// out of stock.
    Availability(f64),
    /// The pack shrank to this fraction of its catalog size.
    SizeSwitch(f64),
}

// ============================================================================
// Scenario configs
// ============================================================================

fn default_supermarket_impact() -> f64 {
    0.15
}

fn default_convenience_impact() -> f64 {
    0.20
}

/// A launch pulling persistent volume out of its competitive set.
///
/// `victims` should exclude the launching portfolio itself, normally
/// by pinning `owner_class`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CannibalizationConfig {
    pub name: String,
    pub onset_period: usize,
    pub victims: AttributeFilter,
    #[serde(default = "default_supermarket_impact")]
    pub supermarket_impact: f64,
    #[serde(default = "default_convenience_impact")]
    pub convenience_impact: f64,
}

fn default_magnitude() -> f64 {
    5.0
}

fn default_cap_volume() -> f64 {
    50.0
}

fn default_cap_weeks() -> usize {
    3
}

fn default_decay() -> f64 {
    0.8
}

/// Excess below this fraction of baseline ends a spike's tail.
const SPIKE_EXCESS_FLOOR: f64 = 0.05;

/// A demand spike that outruns supply: one full-demand week, a
/// stock-out plateau, then geometric recovery of the excess.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViralSpikeConfig {
    pub name: String,
    pub target: AttributeFilter,
    pub onset_period: usize,
    /// Demand multiple in the onset week.
    #[serde(default = "default_magnitude")]
    pub magnitude: f64,
    /// Absolute weekly volume ceiling during the stock-out weeks.
    #[serde(default = "default_cap_volume")]
    pub cap_volume: f64,
    /// Stock-out weeks following the onset.
    #[serde(default = "default_cap_weeks")]
    pub cap_weeks: usize,
    /// Weekly geometric decay of the excess demand.
    #[serde(default = "default_decay")]
    pub decay: f64,
}

impl ViralSpikeConfig {
    /// Demand multiple for one period, 1.0 once the spike has faded.
    fn demand_multiple(&self, period: usize) -> f64 {
        if period < self.onset_period {
            return 1.0;
        }
        let since = period - self.onset_period;
        if since <= self.cap_weeks {
            self.magnitude
        } else {
            let steps = (since - self.cap_weeks) as i32;
            1.0 + (self.magnitude - 1.0) * self.decay.powi(steps)
        }
    }
}

fn default_availability() -> f64 {
    0.3
}

fn default_competitor_uplift() -> f64 {
    0.25
}

/// A supplier outage: targets lose availability, declared competitors
/// absorb part of the displaced demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplyDisruptionConfig {
    pub name: String,
    pub target: AttributeFilter,
    /// Products that pick up the displaced demand. Absent means none.
    #[serde(default)]
    pub competitors: Option<AttributeFilter>,
    pub start_period: usize,
    pub end_period: usize,
    #[serde(default = "default_availability")]
    pub availability: f64,
    #[serde(default = "default_competitor_uplift")]
    pub competitor_uplift: f64,
}

fn default_size_factor() -> f64 {
    0.9
}

fn default_volume_penalty() -> f64 {
    0.05
}

/// A pack-size cut at held price, with a consumer backlash penalty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShrinkflationConfig {
    pub name: String,
    pub target: AttributeFilter,
    pub switch_period: usize,
    #[serde(default = "default_size_factor")]
    pub size_factor: f64,
    #[serde(default = "default_volume_penalty")]
    pub volume_penalty: f64,
}

/// One declared scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScenarioConfig {
    Cannibalization(CannibalizationConfig),
    ViralSpike(ViralSpikeConfig),
    SupplyDisruption(SupplyDisruptionConfig),
    Shrinkflation(ShrinkflationConfig),
}

impl ScenarioConfig {
    pub fn name(&self) -> &str {
        match self {
            ScenarioConfig::Cannibalization(c) => &c.name,
            ScenarioConfig::ViralSpike(c) => &c.name,
            ScenarioConfig::SupplyDisruption(c) => &c.name,
            ScenarioConfig::Shrinkflation(c) => &c.name,
        }
    }

    /// Eager validation; `idx` only feeds error messages.
    pub fn validate(&self, idx: usize, periods: usize) -> Result<()> {
        let fail = |field: &str, reason: String| {
            Err(Error::InvalidConfig {
                field: format!("scenarios[{idx}].{field}"),
                reason,
            })
        };
        if self.name().is_empty() {
            return fail("name", "scenario name must not be empty".to_string());
        }
        match self {
            ScenarioConfig::Cannibalization(c) => {
                if c.onset_period >= periods {
                    return fail("onset_period", format!("{} past horizon {periods}", c.onset_period));
                }
                for (field, v) in [
                    ("supermarket_impact", c.supermarket_impact),
                    ("convenience_impact", c.convenience_impact),
                ] {
                    if !(0.0..1.0).contains(&v) {
                        return fail(field, format!("{v} outside [0, 1)"));
                    }
                }
            }
            ScenarioConfig::ViralSpike(c) => {
                if c.onset_period >= periods {
                    return fail("onset_period", format!("{} past horizon {periods}", c.onset_period));
                }
                if c.magnitude <= 1.0 || !c.magnitude.is_finite() {
                    return fail("magnitude", format!("{} must exceed 1.0", c.magnitude));
                }
                if c.cap_volume <= 0.0 || !c.cap_volume.is_finite() {
                    return fail("cap_volume", format!("{} must be positive", c.cap_volume));
                }
                if !(0.0..1.0).contains(&c.decay) || c.decay == 0.0 {
                    return fail("decay", format!("{} outside (0, 1)", c.decay));
                }
            }
            ScenarioConfig::SupplyDisruption(c) => {
                if c.start_period > c.end_period {
                    return fail(
                        "start_period",
                        format!("window {}..{} is inverted", c.start_period, c.end_period),
                    );
                }
                if c.start_period >= periods {
                    return fail("start_period", format!("{} past horizon {periods}", c.start_period));
                }
                if !(0.0..=1.0).contains(&c.availability) {
                    return fail("availability", format!("{} outside [0, 1]", c.availability));
                }
                if c.competitor_uplift < 0.0 || !c.competitor_uplift.is_finite() {
                    return fail(
                        "competitor_uplift",
                        format!("{} must be non-negative", c.competitor_uplift),
                    );
                }
            }
            ScenarioConfig::Shrinkflation(c) => {
                if c.switch_period >= periods {
                    return fail("switch_period", format!("{} past horizon {periods}", c.switch_period));
                }
                if !(0.0..1.0).contains(&c.size_factor) || c.size_factor == 0.0 {
                    return fail("size_factor", format!("{} outside (0, 1)", c.size_factor));
                }
                if !(0.0..1.0).contains(&c.volume_penalty) {
                    return fail("volume_penalty", format!("{} outside [0, 1)", c.volume_penalty));
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Injector
// ============================================================================

struct CompiledScenario {
    config: ScenarioConfig,
    /// Per catalog index: product is a primary participant.
    targets: Vec<bool>,
    /// Per catalog index: product absorbs displaced demand.
    competitors: Vec<bool>,
}

/// Resolved scenarios ready for effect lookup.
pub struct ScenarioInjector {
    programs: Vec<CompiledScenario>,
}

impl ScenarioInjector {
    /// Resolve every scenario's filters against the catalog.
    pub fn new(configs: &[ScenarioConfig], catalog: &ProductCatalog) -> Self {
        let programs = configs
            .iter()
            .map(|config| {
                let target_filter = match config {
                    ScenarioConfig::Cannibalization(c) => &c.victims,
                    ScenarioConfig::ViralSpike(c) => &c.target,
                    ScenarioConfig::SupplyDisruption(c) => &c.target,
                    ScenarioConfig::Shrinkflation(c) => &c.target,
                };
                let targets: Vec<bool> = catalog
                    .products()
                    .iter()
                    .map(|p| target_filter.matches(p))
                    .collect();
                let competitors: Vec<bool> = match config {
                    ScenarioConfig::SupplyDisruption(c) => match &c.competitors {
                        Some(filter) => catalog
                            .products()
                            .iter()
                            .enumerate()
                            .map(|(i, p)| !targets[i] && filter.matches(p))
                            .collect(),
                        None => vec![false; catalog.len()],
                    },
                    _ => vec![false; catalog.len()],
                };
                info!(
                    scenario = config.name(),
                    targets = targets.iter().filter(|t| **t).count(),
                    competitors = competitors.iter().filter(|c| **c).count(),
                    "resolved scenario participants"
                );
                CompiledScenario {
                    config: config.clone(),
                    targets,
                    competitors,
                }
            })
            .collect();
        ScenarioInjector { programs }
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Effects for one (product, period) cell, in declared order.
    ///
    /// Pure: no draw, no state. The same arguments always produce the
    /// same effect list.
    pub fn effects_for(&self, product_idx: usize, period: usize, out: &mut Vec<ScenarioEffect>) {
        out.clear();
        for program in &self.programs {
            match &program.config {
                ScenarioConfig::Cannibalization(c) => {
                    if program.targets[product_idx] && period >= c.onset_period {
                        out.push(ScenarioEffect::Scale(ClassFactors {
                            supermarket: 1.0 - c.supermarket_impact,
                            convenience: 1.0 - c.convenience_impact,
                            online: 1.0 - c.supermarket_impact,
                        }));
                    }
                }
                ScenarioConfig::ViralSpike(c) => {
                    if !program.targets[product_idx] || period < c.onset_period {
                        continue;
                    }
                    let multiple = c.demand_multiple(period);
                    if multiple - 1.0 > SPIKE_EXCESS_FLOOR {
                        out.push(ScenarioEffect::Scale(ClassFactors::uniform(multiple)));
                        let since = period - c.onset_period;
                        if (1..=c.cap_weeks).contains(&since) {
                            out.push(ScenarioEffect::CapVolume(c.cap_volume));
                        }
                    }
                }
                ScenarioConfig::SupplyDisruption(c) => {
                    if period < c.start_period || period > c.end_period {
                        continue;
                    }
                    if program.targets[product_idx] {
                        out.push(ScenarioEffect::Availability(c.availability));
                    } else if program.competitors[product_idx] {
                        out.push(ScenarioEffect::Scale(ClassFactors::uniform(
                            1.0 + c.competitor_uplift,
                        )));
                    }
                }
                ScenarioConfig::Shrinkflation(c) => {
                    if program.targets[product_idx] && period >= c.switch_period {
                        if c.volume_penalty > 0.0 {
                            out.push(ScenarioEffect::Scale(ClassFactors::uniform(
                                1.0 - c.volume_penalty,
                            )));
                        }
                        out.push(ScenarioEffect::SizeSwitch(c.size_factor));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emporium_dimensions::CatalogSpec;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn catalog() -> ProductCatalog {
        let spec = CatalogSpec {
            product_count: 2_000,
            house_product_count: 40,
            brand_target: 120,
        };
        ProductCatalog::build(&spec, &mut StdRng::seed_from_u64(21)).unwrap()
    }

    fn effects(
        injector: &ScenarioInjector,
        product_idx: usize,
        period: usize,
    ) -> Vec<ScenarioEffect> {
        let mut out = Vec::new();
        injector.effects_for(product_idx, period, &mut out);
        out
    }

    #[test]
    fn test_filter_conjunction() {
        let catalog = catalog();
        let product = catalog.product(0);

        let mut filter = AttributeFilter::default();
        assert!(filter.matches(product));

        filter.segment = Some(product.segment.clone());
        filter.price_class = Some(product.price_class);
        assert!(filter.matches(product));

        filter.subsegment = Some("NO SUCH SUBSEGMENT".to_string());
        assert!(!filter.matches(product));
    }

    #[test]
    fn test_cannibalization_excludes_house_via_filter() {
        let catalog = catalog();
        let config = ScenarioConfig::Cannibalization(CannibalizationConfig {
            name: "launch".to_string(),
            onset_period: 30,
            victims: AttributeFilter {
                owner_class: Some(OwnerClass::ThirdParty),
                ..AttributeFilter::default()
            },
            supermarket_impact: 0.15,
            convenience_impact: 0.20,
        });
        let injector = ScenarioInjector::new(std::slice::from_ref(&config), &catalog);

        let house_idx = catalog.house_indices()[0];
        assert!(effects(&injector, house_idx, 40).is_empty());

        let victim_idx = (0..catalog.len())
            .find(|&i| !catalog.product(i).owner_class.is_house())
            .unwrap();
        assert!(effects(&injector, victim_idx, 29).is_empty());
        let hit = effects(&injector, victim_idx, 30);
        match hit.as_slice() {
            [ScenarioEffect::Scale(f)] => {
                assert!((f.supermarket - 0.85).abs() < 1e-12);
                assert!((f.convenience - 0.80).abs() < 1e-12);
            }
            other => panic!("unexpected effects {other:?}"),
        }
        // Persistent: still in force much later.
        assert_eq!(effects(&injector, victim_idx, 150), hit);
    }

    #[test]
    fn test_viral_spike_shape() {
        let config = ViralSpikeConfig {
            name: "tiktok".to_string(),
            target: AttributeFilter::default(),
            onset_period: 45,
            magnitude: 5.0,
            cap_volume: 50.0,
            cap_weeks: 3,
            decay: 0.8,
        };

        assert_eq!(config.demand_multiple(44), 1.0);
        assert_eq!(config.demand_multiple(45), 5.0);
        assert_eq!(config.demand_multiple(48), 5.0);
        assert!((config.demand_multiple(49) - 4.2).abs() < 1e-12);
        assert!((config.demand_multiple(51) - 3.048).abs() < 1e-12);

        let catalog = catalog();
        let injector = ScenarioInjector::new(
            std::slice::from_ref(&ScenarioConfig::ViralSpike(config)),
            &catalog,
        );

        // Onset week: full demand, nothing has sold out yet.
        let onset = effects(&injector, 0, 45);
        assert_eq!(
            onset,
            vec![ScenarioEffect::Scale(ClassFactors::uniform(5.0))]
        );

        // Stock-out weeks carry the absolute volume ceiling.
        let plateau = effects(&injector, 0, 46);
        assert_eq!(
            plateau,
            vec![
                ScenarioEffect::Scale(ClassFactors::uniform(5.0)),
                ScenarioEffect::CapVolume(50.0),
            ]
        );

        // Recovery: scaled excess, cap lifted.
        let tail = effects(&injector, 0, 49);
        assert_eq!(
            tail,
            vec![ScenarioEffect::Scale(ClassFactors::uniform(4.2))]
        );

        // Tail fades once the excess drops under 5%: 4.0 * 0.8^20.
        assert!(!effects(&injector, 0, 45 + 3 + 19).is_empty());
        assert!(effects(&injector, 0, 45 + 3 + 20).is_empty());
    }

    #[test]
    fn test_disruption_roles() {
        let catalog = catalog();
        let target_segment = catalog.product(0).segment.clone();
        let config = ScenarioConfig::SupplyDisruption(SupplyDisruptionConfig {
            name: "outage".to_string(),
            target: AttributeFilter {
                segment: Some(target_segment.clone()),
                price_class: Some(catalog.product(0).price_class),
                ..AttributeFilter::default()
            },
            competitors: Some(AttributeFilter {
                segment: Some(target_segment),
                ..AttributeFilter::default()
            }),
            start_period: 60,
            end_period: 70,
            availability: 0.3,
            competitor_uplift: 0.25,
        });
        let injector = ScenarioInjector::new(std::slice::from_ref(&config), &catalog);

        let hit = effects(&injector, 0, 65);
        assert_eq!(hit, vec![ScenarioEffect::Availability(0.3)]);
        assert!(effects(&injector, 0, 59).is_empty());
        assert!(effects(&injector, 0, 71).is_empty());

        // A same-segment product of a different price class gets the
        // uplift, never both roles.
        let competitor = (0..catalog.len()).find(|&i| {
            let p = catalog.product(i);
            p.segment == catalog.product(0).segment && p.price_class != catalog.product(0).price_class
        });
        if let Some(idx) = competitor {
            assert_eq!(
                effects(&injector, idx, 65),
                vec![ScenarioEffect::Scale(ClassFactors::uniform(1.25))]
            );
        }
    }

    #[test]
    fn test_shrinkflation_switch() {
        let catalog = catalog();
        let config = ScenarioConfig::Shrinkflation(ShrinkflationConfig {
            name: "quiet_cut".to_string(),
            target: AttributeFilter::default(),
            switch_period: 80,
            size_factor: 0.9,
            volume_penalty: 0.05,
        });
        let injector = ScenarioInjector::new(std::slice::from_ref(&config), &catalog);

        assert!(effects(&injector, 5, 79).is_empty());
        let hit = effects(&injector, 5, 80);
        assert_eq!(
            hit,
            vec![
                ScenarioEffect::Scale(ClassFactors::uniform(0.95)),
                ScenarioEffect::SizeSwitch(0.9),
            ]
        );
        assert_eq!(effects(&injector, 5, 155), hit);
    }

    #[test]
    fn test_declared_order_is_preserved() {
        let catalog = catalog();
        let spike = ScenarioConfig::ViralSpike(ViralSpikeConfig {
            name: "spike".to_string(),
            target: AttributeFilter::default(),
            onset_period: 10,
            magnitude: 5.0,
            cap_volume: 50.0,
            cap_weeks: 3,
            decay: 0.8,
        });
        let shrink = ScenarioConfig::Shrinkflation(ShrinkflationConfig {
            name: "shrink".to_string(),
            target: AttributeFilter::default(),
            switch_period: 5,
            size_factor: 0.9,
            volume_penalty: 0.05,
        });
        let injector = ScenarioInjector::new(&[spike, shrink], &catalog);

        let hit = effects(&injector, 0, 10);
        assert_eq!(
            hit,
            vec![
                ScenarioEffect::Scale(ClassFactors::uniform(5.0)),
                ScenarioEffect::Scale(ClassFactors::uniform(0.95)),
                ScenarioEffect::SizeSwitch(0.9),
            ]
        );
    }

    #[test]
    fn test_yaml_round_trip() {
        let yaml = r#"
- type: cannibalization
  name: launch
  onset_period: 30
  victims:
    subsegment: FILLED
    owner_class: third_party
- type: viral_spike
  name: tiktok
  onset_period: 45
  target:
    subsegment: PROTEIN
"#;
        let configs: Vec<ScenarioConfig> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(configs.len(), 2);
        for (idx, c) in configs.iter().enumerate() {
            c.validate(idx, 156).unwrap();
        }
        match &configs[1] {
            ScenarioConfig::ViralSpike(c) => {
                assert_eq!(c.magnitude, 5.0);
                assert_eq!(c.cap_weeks, 3);
            }
            other => panic!("unexpected variant {other:?}"),
        }
    }

    #[test]
    fn test_validation_rejects_bad_windows() {
        let config = ScenarioConfig::ViralSpike(ViralSpikeConfig {
            name: "late".to_string(),
            target: AttributeFilter::default(),
            onset_period: 200,
            magnitude: 5.0,
            cap_volume: 50.0,
            cap_weeks: 3,
            decay: 0.8,
        });
        assert!(config.validate(0, 156).is_err());

        let inverted = ScenarioConfig::SupplyDisruption(SupplyDisruptionConfig {
            name: "bad".to_string(),
            target: AttributeFilter::default(),
            competitors: None,
            start_period: 50,
            end_period: 40,
            availability: 0.3,
            competitor_uplift: 0.25,
        });
        assert!(inverted.validate(1, 156).is_err());
    }
}
