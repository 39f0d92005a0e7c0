//! Core identifier and attribute types shared across the workspace.
//!
//! Keys are newtypes over the raw integer identifiers that appear in the
//! emitted CSVs. Attribute enums carry the classification facts that the
//! generation pipeline keys its behavior on; nothing downstream is allowed
//! to re-derive these from display strings.

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Keys
// ============================================================================

/// Product dimension key.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct ProductKey(pub u64);

impl fmt::Display for ProductKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ProductKey {
    fn from(k: u64) -> Self {
        ProductKey(k)
    }
}

/// Geography dimension key.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct GeographyKey(pub u32);

impl fmt::Display for GeographyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for GeographyKey {
    fn from(k: u32) -> Self {
        GeographyKey(k)
    }
}

/// Time dimension key in `YYWW` form (e.g. `2237` = 2022, week 37).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct TimeKey(pub u32);

impl TimeKey {
    /// Build a key from a calendar year and a 1-based week number.
    pub fn new(year: i32, week: u32) -> Self {
        TimeKey((year as u32 % 100) * 100 + week)
    }

    /// Two-digit year component.
    pub fn year_part(&self) -> u32 {
        self.0 / 100
    }

    /// Week-of-year component (1..=52).
    pub fn week_part(&self) -> u32 {
        self.0 % 100
    }
}

impl fmt::Display for TimeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Product attributes
// ============================================================================

/// Pricing tier of a product, derived from its manufacturer class.
///
/// Drives base price ranges and the elasticity draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceClass {
    Premium,
    Standard,
    Value,
}

impl PriceClass {
    /// Base unit price range (currency units) for this class.
    pub fn price_range(&self) -> (f64, f64) {
        match self {
            PriceClass::Premium => (15.0, 50.0),
            PriceClass::Standard => (2.0, 15.0),
            PriceClass::Value => (1.0, 5.0),
        }
    }

    /// Price elasticity range for this class (always negative: demand
    /// falls when price rises).
    pub fn elasticity_range(&self) -> (f64, f64) {
        match self {
            PriceClass::Premium => (-0.6, -0.4),
            PriceClass::Standard => (-1.2, -0.8),
            PriceClass::Value => (-1.5, -1.2),
        }
    }
}

impl fmt::Display for PriceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PriceClass::Premium => "premium",
            PriceClass::Standard => "standard",
            PriceClass::Value => "value",
        };
        write!(f, "{s}")
    }
}

/// Portfolio ownership marker.
///
/// Exactly one manufacturer family is `House`: the portfolio whose market
/// share the generator actively manages. Share control keys on this
/// attribute, never on the manufacturer name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OwnerClass {
    House,
    #[default]
    ThirdParty,
}

impl OwnerClass {
    pub fn is_house(&self) -> bool {
        matches!(self, OwnerClass::House)
    }
}

/// Manufacturer market positioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManufacturerClass {
    Major,
    Premium,
    Value,
    Ethical,
    Niche,
}

impl ManufacturerClass {
    /// Price class implied by the manufacturer's positioning.
    pub fn price_class(&self) -> PriceClass {
        match self {
            ManufacturerClass::Premium => PriceClass::Premium,
            ManufacturerClass::Value => PriceClass::Value,
            ManufacturerClass::Major | ManufacturerClass::Ethical | ManufacturerClass::Niche => {
                PriceClass::Standard
            }
        }
    }

    /// Multipack share of the portfolio for this positioning.
    pub fn multipack_share(&self) -> f64 {
        match self {
            ManufacturerClass::Value => 0.30,
            ManufacturerClass::Premium => 0.05,
            _ => 0.15,
        }
    }
}

/// Calendar event a seasonal product is tied to.
///
/// Set at catalog build time from the product's subsegment; the seasonal
/// curve model reads only this attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonalEvent {
    Christmas,
    Easter,
    Valentine,
}

impl SeasonalEvent {
    pub const ALL: [SeasonalEvent; 3] = [
        SeasonalEvent::Christmas,
        SeasonalEvent::Easter,
        SeasonalEvent::Valentine,
    ];
}

impl fmt::Display for SeasonalEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SeasonalEvent::Christmas => "christmas",
            SeasonalEvent::Easter => "easter",
            SeasonalEvent::Valentine => "valentine",
        };
        write!(f, "{s}")
    }
}

/// Top-level need state of the category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Needstate {
    ChocolateConfectionery,
    SugarConfectionery,
    ChewingGum,
}

impl fmt::Display for Needstate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Needstate::ChocolateConfectionery => "CHOCOLATE CONFECTIONERY",
            Needstate::SugarConfectionery => "SUGAR CONFECTIONERY",
            Needstate::ChewingGum => "CHEWING GUM",
        };
        write!(f, "{s}")
    }
}

/// Pack format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackFormat {
    Standard,
    Multipack,
}

impl fmt::Display for PackFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PackFormat::Standard => "STANDARD",
            PackFormat::Multipack => "MULTIPACK",
        };
        write!(f, "{s}")
    }
}

/// Size band a product falls into, derived from its gram weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeGroup {
    SingleServe,
    SharePack,
    FamilyPack,
    GiftSeasonal,
    Multipack,
}

impl SizeGroup {
    /// Classify a single-unit gram weight.
    pub fn from_grams(grams: f64) -> Self {
        if grams < 60.0 {
            SizeGroup::SingleServe
        } else if grams <= 150.0 {
            SizeGroup::SharePack
        } else if grams <= 300.0 {
            SizeGroup::FamilyPack
        } else {
            SizeGroup::GiftSeasonal
        }
    }
}

impl fmt::Display for SizeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SizeGroup::SingleServe => "SINGLE-SERVE (<60G)",
            SizeGroup::SharePack => "SHARE PACK (60-150G)",
            SizeGroup::FamilyPack => "FAMILY PACK (150-300G)",
            SizeGroup::GiftSeasonal => "GIFT/SEASONAL (>300G)",
            SizeGroup::Multipack => "MULTIPACK (4-12 UNITS)",
        };
        write!(f, "{s}")
    }
}

// ============================================================================
// Geography attributes
// ============================================================================

/// Store classification of a geography node.
///
/// Selects the sales prior and the scenario severity tier for everything
/// sold through that node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreClass {
    /// Level-0 total market aggregate.
    TotalMarket,
    Premium,
    Major,
    Discount,
    Convenience,
    Online,
}

impl StoreClass {
    /// Log-normal prior of weekly base value sales: (mu, sigma, min, max).
    pub fn sales_prior(&self) -> (f64, f64, f64, f64) {
        match self {
            StoreClass::TotalMarket => (6.0, 2.5, 10.0, 100_000.0),
            StoreClass::Premium => (5.5, 2.0, 5.0, 50_000.0),
            StoreClass::Major => (5.0, 2.2, 2.0, 40_000.0),
            StoreClass::Discount => (4.5, 2.3, 1.0, 30_000.0),
            StoreClass::Convenience => (3.5, 1.8, 0.5, 10_000.0),
            StoreClass::Online => (4.0, 2.0, 1.0, 20_000.0),
        }
    }

    /// Allocation weight when splitting the market total across retailers.
    pub fn allocation_weight(&self) -> f64 {
        match self {
            StoreClass::Premium => 1.5,
            StoreClass::Discount => 0.7,
            _ => 1.0,
        }
    }
}

impl fmt::Display for StoreClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StoreClass::TotalMarket => "total_market",
            StoreClass::Premium => "premium",
            StoreClass::Major => "major",
            StoreClass::Discount => "discount",
            StoreClass::Convenience => "convenience",
            StoreClass::Online => "online",
        };
        write!(f, "{s}")
    }
}

/// Seasonal trading period a calendar week falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonalPeriod {
    Christmas,
    Easter,
    Summer,
    BackToSchool,
    Halloween,
    Regular,
}

impl SeasonalPeriod {
    /// Classify an ISO week number the way the trading calendar does.
    pub fn from_week(week: u32) -> Self {
        if week >= 50 || week <= 2 {
            SeasonalPeriod::Christmas
        } else if (13..=16).contains(&week) {
            SeasonalPeriod::Easter
        } else if (33..=36).contains(&week) {
            // Back-to-school overlaps the summer tail and wins there.
            SeasonalPeriod::BackToSchool
        } else if (26..=35).contains(&week) {
            SeasonalPeriod::Summer
        } else if (43..=44).contains(&week) {
            SeasonalPeriod::Halloween
        } else {
            SeasonalPeriod::Regular
        }
    }
}

impl fmt::Display for SeasonalPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SeasonalPeriod::Christmas => "Christmas Period",
            SeasonalPeriod::Easter => "Easter Period",
            SeasonalPeriod::Summer => "Summer Period",
            SeasonalPeriod::BackToSchool => "Back to School",
            SeasonalPeriod::Halloween => "Halloween Period",
            SeasonalPeriod::Regular => "Regular Period",
        };
        write!(f, "{s}")
    }
}
