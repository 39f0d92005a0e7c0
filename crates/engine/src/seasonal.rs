//! Seasonal curve model.
//!
//! Event-tied products (Easter eggs, advent calendars, Valentine
//! hearts) follow a Gaussian bump centered on their event week and sit
//! at a small floor outside the trading window. Catalog staples follow
//! the milder trading-period modifiers: a winter uplift and a summer
//! dip. Which behavior a product gets is decided by its
//! `seasonal_event` attribute alone.
//!
//! The floor is load-bearing: presence logic treats a multiplier below
//! its gate as out-of-window and suppresses most of those cells, which
//! is where the seasonal ranging pattern in the output comes from.

use rand::Rng;
use std::ops::RangeInclusive;

use emporium_dimensions::{ProductRecord, SeasonalEvent};

use crate::sampling::{site, stream};

/// Width (in weeks) of the event bump.
const EVENT_WIDTH: f64 = 2.0;

/// Final multiplier clamp.
const MULTIPLIER_FLOOR: f64 = 0.05;
const MULTIPLIER_CEIL: f64 = 8.0;

const WINTER_WEEKS: RangeInclusive<u32> = 48..=52;
const WINTER_UPLIFT: (f64, f64) = (1.1, 1.3);
const SUMMER_WEEKS: RangeInclusive<u32> = 26..=35;
const SUMMER_DIP: (f64, f64) = (0.7, 0.8);

struct EventCurve {
    peak_week: u32,
    amplitude: f64,
    window: RangeInclusive<u32>,
    floor: f64,
}

fn event_curve(event: SeasonalEvent) -> EventCurve {
    match event {
        SeasonalEvent::Christmas => EventCurve {
            peak_week: 51,
            amplitude: 5.0,
            window: 44..=52,
            floor: 0.1,
        },
        SeasonalEvent::Easter => EventCurve {
            peak_week: 14,
            amplitude: 4.0,
            window: 10..=16,
            floor: 0.05,
        },
        SeasonalEvent::Valentine => EventCurve {
            peak_week: 6,
            amplitude: 2.5,
            window: 5..=7,
            floor: 0.1,
        },
    }
}

/// Event curve value for one week of year.
pub fn event_multiplier(event: SeasonalEvent, week_of_year: u32) -> f64 {
    let curve = event_curve(event);
    if !curve.window.contains(&week_of_year) {
        return curve.floor;
    }
    let distance = (week_of_year as f64 - curve.peak_week as f64) / EVENT_WIDTH;
    let bump = curve.amplitude * (-0.5 * distance * distance).exp();
    bump.max(curve.floor)
}

/// Weekly demand multipliers driven by the trading calendar.
#[derive(Debug, Clone)]
pub struct SeasonalCurveModel {
    seed: u64,
}

impl SeasonalCurveModel {
    pub fn new(seed: u64) -> Self {
        SeasonalCurveModel { seed }
    }

    /// Demand multiplier for one product in one week of year.
    pub fn multiplier(&self, product: &ProductRecord, week_of_year: u32) -> f64 {
        let raw = match product.seasonal_event {
            Some(event) => event_multiplier(event, week_of_year),
            None => self.staple_multiplier(product, week_of_year),
        };
        raw.clamp(MULTIPLIER_FLOOR, MULTIPLIER_CEIL)
    }

    /// Trading-period modifier for products without an event tie. When
    /// a week falls into more than one modifier window the larger
    /// modifier wins; outside every window the multiplier is 1.
    fn staple_multiplier(&self, product: &ProductRecord, week_of_year: u32) -> f64 {
        let mut rng = stream(
            self.seed,
            site::SEASONAL,
            &[product.key.0, week_of_year as u64],
        );
        let mut modifier: Option<f64> = None;
        if WINTER_WEEKS.contains(&week_of_year) {
            let draw = rng.gen_range(WINTER_UPLIFT.0..=WINTER_UPLIFT.1);
            modifier = Some(modifier.map_or(draw, |m: f64| m.max(draw)));
        }
        if SUMMER_WEEKS.contains(&week_of_year) {
            let draw = rng.gen_range(SUMMER_DIP.0..=SUMMER_DIP.1);
            modifier = Some(modifier.map_or(draw, |m: f64| m.max(draw)));
        }
        modifier.unwrap_or(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emporium_dimensions::{CatalogSpec, ProductCatalog};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn catalog() -> ProductCatalog {
        let spec = CatalogSpec {
            product_count: 2_000,
            house_product_count: 20,
            brand_target: 120,
        };
        ProductCatalog::build(&spec, &mut StdRng::seed_from_u64(3)).unwrap()
    }

    #[test]
    fn test_christmas_curve_peaks_at_week_51() {
        assert!((event_multiplier(SeasonalEvent::Christmas, 51) - 5.0).abs() < 1e-12);
        let w49 = event_multiplier(SeasonalEvent::Christmas, 49);
        let expected = 5.0 * (-0.5f64).exp();
        assert!((w49 - expected).abs() < 1e-12);
        assert!(w49 < 5.0);
    }

    #[test]
    fn test_out_of_window_sits_at_floor() {
        assert_eq!(event_multiplier(SeasonalEvent::Christmas, 20), 0.1);
        assert_eq!(event_multiplier(SeasonalEvent::Easter, 40), 0.05);
        assert_eq!(event_multiplier(SeasonalEvent::Valentine, 8), 0.1);
    }

    #[test]
    fn test_window_edge_falls_back_to_floor() {
        // Week 44 is inside the Christmas window but seven weeks from
        // the peak, far below the floor on the Gaussian tail.
        assert_eq!(event_multiplier(SeasonalEvent::Christmas, 44), 0.1);
    }

    #[test]
    fn test_peak_to_trough_spread() {
        for event in SeasonalEvent::ALL {
            let peak = (1..=52)
                .map(|w| event_multiplier(event, w))
                .fold(f64::MIN, f64::max);
            let trough = (1..=52)
                .map(|w| event_multiplier(event, w))
                .fold(f64::MAX, f64::min);
            assert!(peak / trough >= 10.0, "{event}: {peak} / {trough}");
        }
    }

    #[test]
    fn test_staple_modifiers() {
        let catalog = catalog();
        let model = SeasonalCurveModel::new(42);
        let staple = catalog
            .products()
            .iter()
            .find(|p| p.seasonal_event.is_none())
            .unwrap();

        let winter = model.multiplier(staple, 50);
        assert!((1.1..=1.3).contains(&winter), "{winter}");
        let summer = model.multiplier(staple, 30);
        assert!((0.7..=0.8).contains(&summer), "{summer}");
        assert_eq!(model.multiplier(staple, 20), 1.0);
    }

    #[test]
    fn test_event_products_ignore_staple_windows() {
        let catalog = catalog();
        let model = SeasonalCurveModel::new(42);
        let easter = catalog
            .products()
            .iter()
            .find(|p| p.seasonal_event == Some(SeasonalEvent::Easter))
            .unwrap();

        // Summer dip weeks still read the event floor, not 0.7..0.8.
        assert_eq!(model.multiplier(easter, 30), 0.05);
    }

    #[test]
    fn test_multiplier_is_deterministic() {
        let catalog = catalog();
        let a = SeasonalCurveModel::new(42);
        let b = SeasonalCurveModel::new(42);
        for p in catalog.products().iter().take(50) {
            for week in [1, 14, 30, 51] {
                assert_eq!(
                    a.multiplier(p, week).to_bits(),
                    b.multiplier(p, week).to_bits()
                );
            }
        }
    }
}
