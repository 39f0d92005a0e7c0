//! Product dimension: manufacturers, brands, and the product catalog.
//!
//! The catalog is built once per run from a seeded RNG. Every behavioral
//! attribute the pipeline needs later (price class, elasticity, seasonal
//! event, restriction flag) is decided here and stored on the record, so
//! generation never has to parse display strings.

use indexmap::IndexMap;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{DimensionError, Result};
use crate::types::{
    ManufacturerClass, Needstate, OwnerClass, PackFormat, PriceClass, ProductKey, SeasonalEvent,
    SizeGroup,
};

// ============================================================================
// Manufacturer and brand tables
// ============================================================================

/// (name, portfolio share, positioning). Shares of the named head of the
/// table sum to 0.97; the niche tail splits the remainder equally.
#[rustfmt::skip]
const MANUFACTURER_TABLE: &[(&str, f64, ManufacturerClass)] = &[
    ("PRIVATE LABEL",       0.240, ManufacturerClass::Value),
    ("NESTLE",              0.150, ManufacturerClass::Major),
    ("MARS",                0.120, ManufacturerClass::Major),
    ("LINDT",               0.065, ManufacturerClass::Premium),
    ("FERRERO",             0.043, ManufacturerClass::Major),
    ("CLOETTA",             0.043, ManufacturerClass::Major),
    ("HERSHEY",             0.032, ManufacturerClass::Major),
    ("MONDELEZ",            0.022, ManufacturerClass::Major),
    ("FAZER",               0.022, ManufacturerClass::Major),
    ("THORNTONS",           0.011, ManufacturerClass::Premium),
    ("HOTEL CHOCOLAT",      0.011, ManufacturerClass::Premium),
    ("GODIVA",              0.011, ManufacturerClass::Premium),
    ("GREEN & BLACKS",      0.011, ManufacturerClass::Premium),
    ("DIVINE",              0.011, ManufacturerClass::Ethical),
    ("TONY CHOCOLONELY",    0.011, ManufacturerClass::Ethical),
    ("WONKA",               0.011, ManufacturerClass::Major),
    ("WALKERS",             0.011, ManufacturerClass::Major),
    ("VALRHONA",            0.011, ManufacturerClass::Premium),
    ("TOBLERONE",           0.011, ManufacturerClass::Major),
    ("TERRYS",              0.011, ManufacturerClass::Major),
    ("ROCOCO",              0.011, ManufacturerClass::Premium),
    ("PURDYS",              0.011, ManufacturerClass::Premium),
    ("PRESTAT",             0.011, ManufacturerClass::Premium),
    ("MONTEZUMA",           0.011, ManufacturerClass::Ethical),
    ("LOTUS",               0.011, ManufacturerClass::Major),
    ("KOPPERS",             0.011, ManufacturerClass::Major),
    ("KINDER",              0.011, ManufacturerClass::Major),
    ("HAMLET",              0.011, ManufacturerClass::Major),
    ("GUYLIAN",             0.011, ManufacturerClass::Premium),
    ("FREY",                0.011, ManufacturerClass::Major),
    ("BIG BITE CHOCOLATES", 0.002, ManufacturerClass::Niche),
];

/// Tail of the table: small names sharing the residual 5% equally.
const NICHE_TAIL: &[&str] = &[
    "BAHLSEN", "BARRATTS", "BASSETTS", "BEACON", "BENDICKS", "BONDS", "BOURNVILLE", "BUTTERKIST",
    "MAYNARDS", "MILKA", "PERFETTI", "RITTER SPORT", "SWIZZELS", "TREBOR", "TUNNOCKS", "WHITAKERS",
    "YORKIE", "STORCK", "HARIBO",
];

/// The one portfolio the generator manages as its own.
const HOUSE_MANUFACTURER: &str = "BIG BITE CHOCOLATES";

const PRIVATE_LABEL_MANUFACTURER: &str = "PRIVATE LABEL";

const HOUSE_BRANDS: &[&str] = &[
    "BIG BITE ORIGINALS",
    "BIG BITE DARK",
    "BIG BITE KIDS",
    "BIG BITE LUXE",
];

const PRIVATE_LABEL_BRANDS: &[&str] = &[
    "Tesco Finest",
    "Tesco",
    "Sainsburys Taste the Difference",
    "Sainsburys",
    "Asda Extra Special",
    "Asda",
    "Morrisons The Best",
    "Morrisons",
    "Aldi Moser Roth",
    "Aldi Choceur",
    "Lidl Fin Carre",
    "Lidl J.D. Gross",
    "Co-op Irresistible",
    "Co-op",
    "Waitrose 1",
    "Waitrose Essentials",
    "M&S Collection",
    "M&S",
    "Iceland Luxury",
    "Boots Shapers",
];

const BRAND_SUFFIXES: &[&str] = &[
    "GOLD", "CLASSIC", "DELUXE", "ORIGINALS", "SELECTION", "RESERVE", "HERITAGE", "VELVET",
    "NOIR", "SIGNATURE", "DUO", "BLISS",
];

// ============================================================================
// Attribute tables
// ============================================================================

const CHOCOLATE_SEGMENTS: &[(&str, u32)] = &[
    ("BARS / COUNTLINES", 40),
    ("BLOCKS & TABLETS", 25),
    ("SHARING BAGS & POUCHES", 20),
    ("BOXED & ASSORTMENTS", 10),
    ("SEASONAL & GIFTING", 5),
];

const SUGAR_SEGMENTS: &[(&str, u32)] = &[
    ("HARD CANDY", 30),
    ("GUMMIES", 30),
    ("LOLLIPOPS", 20),
    ("MARSHMALLOWS", 10),
    ("OTHER SUGAR", 10),
];

const GUM_SEGMENTS: &[(&str, u32)] = &[
    ("STICK GUM", 50),
    ("PELLET GUM", 30),
    ("BUBBLE GUM", 20),
];

fn subsegments(segment: &str) -> &'static [(&'static str, u32)] {
    match segment {
        "BARS / COUNTLINES" => &[
            ("SOLID", 40),
            ("FILLED", 30),
            ("WAFER", 20),
            ("PROTEIN", 5),
            ("LOW/NO-SUGAR", 5),
        ],
        "BLOCKS & TABLETS" => &[
            ("MILK", 40),
            ("DARK", 25),
            ("WHITE", 15),
            ("FLAVOURED", 15),
            ("PREMIUM ORIGIN", 5),
        ],
        "SHARING BAGS & POUCHES" => &[
            ("BUTTONS", 30),
            ("MINIS", 30),
            ("CHUNKS", 25),
            ("MIXED BITES", 15),
        ],
        "BOXED & ASSORTMENTS" => &[
            ("EVERYDAY ASSORTMENTS", 50),
            ("PREMIUM PRALINES", 30),
            ("LUXURY GIFT BOXES", 20),
        ],
        "SEASONAL & GIFTING" => &[
            ("EASTER EGGS", 35),
            ("ADVENT CALENDARS", 25),
            ("CHRISTMAS NOVELTIES", 25),
            ("VALENTINE HEARTS", 15),
        ],
        _ => &[("STANDARD", 1)],
    }
}

/// Event a seasonal subsegment sells into. This is the only place the
/// mapping exists; everything downstream reads the resulting attribute.
fn seasonal_event_of(subsegment: &str) -> Option<SeasonalEvent> {
    match subsegment {
        "EASTER EGGS" => Some(SeasonalEvent::Easter),
        "ADVENT CALENDARS" | "CHRISTMAS NOVELTIES" => Some(SeasonalEvent::Christmas),
        "VALENTINE HEARTS" => Some(SeasonalEvent::Valentine),
        _ => None,
    }
}

fn flavors(segment: &str, subsegment: &str) -> &'static [(&'static str, u32)] {
    if subsegment.contains("DARK") {
        &[
            ("DARK CHOCOLATE 70%", 30),
            ("DARK CHOCOLATE 85%", 20),
            ("DARK CHOCOLATE 90%", 10),
            ("DARK MINT", 20),
            ("DARK ORANGE", 20),
        ]
    } else if subsegment.contains("WHITE") {
        &[
            ("WHITE CHOCOLATE", 60),
            ("WHITE STRAWBERRY", 20),
            ("WHITE COOKIES", 20),
        ]
    } else if subsegment.contains("FLAVOURED") {
        &[
            ("MINT", 20),
            ("ORANGE", 20),
            ("CARAMEL", 25),
            ("HAZELNUT", 15),
            ("COFFEE", 10),
            ("RASPBERRY", 10),
        ]
    } else if segment == "BOXED & ASSORTMENTS" {
        &[
            ("MIXED/ASSORTED", 80),
            ("MILK SELECTION", 10),
            ("DARK SELECTION", 10),
        ]
    } else {
        &[
            ("MILK CHOCOLATE", 45),
            ("DARK CHOCOLATE", 20),
            ("WHITE CHOCOLATE", 10),
            ("CARAMEL", 10),
            ("MINT", 5),
            ("ORANGE", 5),
            ("MIXED", 5),
        ]
    }
}

/// Segment gram-weight menus: (low, high inclusive, step).
fn size_menu(segment: &str) -> (u32, u32, u32) {
    match segment {
        "BARS / COUNTLINES" => (25, 85, 5),
        "BLOCKS & TABLETS" => (90, 200, 10),
        "SHARING BAGS & POUCHES" => (100, 350, 25),
        "BOXED & ASSORTMENTS" => (150, 500, 50),
        "SEASONAL & GIFTING" => (50, 500, 50),
        _ => (100, 100, 1),
    }
}

const MULTIPACK_COUNTS: &[u32] = &[4, 5, 6, 8, 10, 12];
const MULTIPACK_UNIT_GRAMS: &[u32] = &[25, 30, 35, 40, 45, 50];

const PRODUCT_KEY_RANGE: std::ops::Range<u64> = 56_627_300..2_063_367_030;

// ============================================================================
// Records
// ============================================================================

/// A manufacturer row of the brand hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manufacturer {
    pub name: String,
    pub share: f64,
    pub class: ManufacturerClass,
    pub owner_class: OwnerClass,
}

/// One catalog product with every attribute the pipeline keys on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRecord {
    pub key: ProductKey,
    pub description: String,
    pub manufacturer: String,
    pub manufacturer_class: ManufacturerClass,
    pub owner_class: OwnerClass,
    pub brand: String,
    pub needstate: Needstate,
    pub segment: String,
    pub subsegment: String,
    pub flavor: String,
    pub pack_format: PackFormat,
    /// Units per pack (1 for standard packs).
    pub multipack_count: u32,
    /// Total gram weight of the pack.
    pub size_grams: f64,
    /// Display size, e.g. `100G` or `6 X 30G`.
    pub size_code: String,
    pub size_group: SizeGroup,
    pub seasonal_event: Option<SeasonalEvent>,
    pub price_class: PriceClass,
    /// Standing shelf price per unit pack.
    pub base_price: f64,
    /// Drawn once here; never re-drawn during generation.
    pub elasticity: f64,
    pub barcode: Option<u64>,
    /// Private-label lines trade only through their own banner's stores.
    pub private_label: bool,
    /// Restricted products trade in a stable subset of geographies.
    pub restricted: bool,
}

/// Shape parameters for a catalog build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSpec {
    pub product_count: usize,
    /// Exact product count for the house portfolio.
    pub house_product_count: usize,
    /// Sizing target for the distinct-brand list.
    pub brand_target: usize,
}

impl Default for CatalogSpec {
    fn default() -> Self {
        CatalogSpec {
            product_count: 100_000,
            house_product_count: 200,
            brand_target: 400,
        }
    }
}

impl CatalogSpec {
    pub fn validate(&self) -> Result<()> {
        if self.product_count == 0 {
            return Err(DimensionError::InvalidCatalogSize {
                reason: "product_count must be > 0".to_string(),
            });
        }
        if self.house_product_count * 5 > self.product_count {
            return Err(DimensionError::InvalidCatalogSize {
                reason: format!(
                    "house_product_count {} is too large for a {}-product catalog",
                    self.house_product_count, self.product_count
                ),
            });
        }
        if self.brand_target < HOUSE_BRANDS.len() + 1 {
            return Err(DimensionError::InvalidCatalogSize {
                reason: format!("brand_target must be at least {}", HOUSE_BRANDS.len() + 1),
            });
        }
        Ok(())
    }
}

/// Built product catalog.
#[derive(Debug, Clone)]
pub struct ProductCatalog {
    manufacturers: Vec<Manufacturer>,
    products: Vec<ProductRecord>,
    by_key: IndexMap<ProductKey, usize>,
}

impl ProductCatalog {
    /// Build a catalog from a dedicated RNG stream.
    pub fn build(spec: &CatalogSpec, rng: &mut StdRng) -> Result<Self> {
        spec.validate()?;

        let manufacturers = build_manufacturers();
        let brands = build_brands(&manufacturers, spec.brand_target, rng);
        let counts = allocate_product_counts(&manufacturers, spec);

        let mut products = Vec::with_capacity(spec.product_count);
        let mut by_key = IndexMap::with_capacity(spec.product_count);
        let mut seen_keys = std::collections::HashSet::with_capacity(spec.product_count);

        for (mfr, count) in manufacturers.iter().zip(counts.iter()) {
            let mfr_brands: Vec<&String> = brands
                .iter()
                .filter(|(m, _)| m == &mfr.name)
                .map(|(_, b)| b)
                .collect();
            debug!(
                manufacturer = %mfr.name,
                products = count,
                brands = mfr_brands.len(),
                "allocating catalog slice"
            );

            for i in 0..*count {
                let key = draw_unique_key(rng, &mut seen_keys);
                let brand = mfr_brands[i % mfr_brands.len()].clone();
                let record = draw_product(key, mfr, brand, rng);
                by_key.insert(record.key, products.len());
                products.push(record);
            }
        }

        info!(
            products = products.len(),
            manufacturers = manufacturers.len(),
            "product catalog built"
        );

        Ok(ProductCatalog {
            manufacturers,
            products,
            by_key,
        })
    }

    pub fn products(&self) -> &[ProductRecord] {
        &self.products
    }

    pub fn manufacturers(&self) -> &[Manufacturer] {
        &self.manufacturers
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn product(&self, idx: usize) -> &ProductRecord {
        &self.products[idx]
    }

    pub fn index_of(&self, key: ProductKey) -> Result<usize> {
        self.by_key
            .get(&key)
            .copied()
            .ok_or_else(|| DimensionError::UnknownKey {
                key: key.to_string(),
            })
    }

    /// Indices of house-portfolio products.
    pub fn house_indices(&self) -> Vec<usize> {
        self.products
            .iter()
            .enumerate()
            .filter(|(_, p)| p.owner_class.is_house())
            .map(|(i, _)| i)
            .collect()
    }
}

// ============================================================================
// Build steps
// ============================================================================

fn build_manufacturers() -> Vec<Manufacturer> {
    let named_share: f64 = MANUFACTURER_TABLE.iter().map(|(_, s, _)| s).sum();
    let tail_share = (1.0 - named_share) / NICHE_TAIL.len() as f64;

    let mut out: Vec<Manufacturer> = MANUFACTURER_TABLE
        .iter()
        .map(|(name, share, class)| Manufacturer {
            name: name.to_string(),
            share: *share,
            class: *class,
            owner_class: if *name == HOUSE_MANUFACTURER {
                OwnerClass::House
            } else {
                OwnerClass::ThirdParty
            },
        })
        .collect();

    out.extend(NICHE_TAIL.iter().map(|name| Manufacturer {
        name: name.to_string(),
        share: tail_share,
        class: ManufacturerClass::Niche,
        owner_class: OwnerClass::ThirdParty,
    }));

    out
}

/// (manufacturer name, brand name) pairs, sized from `target`. Small
/// manufacturers keep at least one brand, so the final count can land a
/// little over the target.
fn build_brands(
    manufacturers: &[Manufacturer],
    target: usize,
    rng: &mut StdRng,
) -> Vec<(String, String)> {
    let mut brands = Vec::with_capacity(target);
    let mut taken = std::collections::HashSet::new();

    for mfr in manufacturers {
        let brand_count = if mfr.owner_class.is_house() {
            HOUSE_BRANDS.len()
        } else if mfr.name == PRIVATE_LABEL_MANUFACTURER {
            PRIVATE_LABEL_BRANDS.len()
        } else {
            ((mfr.share * target as f64).round() as usize).max(1)
        };

        for i in 0..brand_count {
            let name = if mfr.owner_class.is_house() {
                HOUSE_BRANDS[i].to_string()
            } else if mfr.name == PRIVATE_LABEL_MANUFACTURER {
                PRIVATE_LABEL_BRANDS[i].to_string()
            } else if i == 0 {
                mfr.name.clone()
            } else {
                let suffix = BRAND_SUFFIXES[rng.gen_range(0..BRAND_SUFFIXES.len())];
                format!("{} {}", mfr.name, suffix)
            };
            if taken.insert(name.clone()) {
                brands.push((mfr.name.clone(), name));
            }
        }
    }

    brands
}

/// Largest-remainder split of the catalog across manufacturers, with the
/// house count pinned exactly.
fn allocate_product_counts(manufacturers: &[Manufacturer], spec: &CatalogSpec) -> Vec<usize> {
    let open_slots = spec.product_count - spec.house_product_count;
    let open_share: f64 = manufacturers
        .iter()
        .filter(|m| !m.owner_class.is_house())
        .map(|m| m.share)
        .sum();

    let mut counts = Vec::with_capacity(manufacturers.len());
    let mut remainders: Vec<(usize, f64)> = Vec::new();
    let mut assigned = 0usize;

    for (i, mfr) in manufacturers.iter().enumerate() {
        if mfr.owner_class.is_house() {
            counts.push(spec.house_product_count);
            continue;
        }
        let exact = open_slots as f64 * mfr.share / open_share;
        let floor = exact.floor() as usize;
        counts.push(floor);
        assigned += floor;
        remainders.push((i, exact - floor as f64));
    }

    // Hand leftover slots to the largest remainders, index as tiebreak.
    remainders.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    let mut leftover = open_slots - assigned;
    for (i, _) in remainders {
        if leftover == 0 {
            break;
        }
        counts[i] += 1;
        leftover -= 1;
    }

    counts
}

fn draw_unique_key(rng: &mut StdRng, seen: &mut std::collections::HashSet<u64>) -> ProductKey {
    loop {
        let k = rng.gen_range(PRODUCT_KEY_RANGE);
        if seen.insert(k) {
            return ProductKey(k);
        }
    }
}

fn pick_weighted<'a>(rng: &mut StdRng, table: &[(&'a str, u32)]) -> &'a str {
    let total: u32 = table.iter().map(|(_, w)| w).sum();
    let mut roll = rng.gen_range(0..total);
    for (item, w) in table {
        if roll < *w {
            return item;
        }
        roll -= w;
    }
    table[table.len() - 1].0
}

fn draw_needstate(rng: &mut StdRng) -> Needstate {
    let roll = rng.gen_range(0u32..100);
    if roll < 75 {
        Needstate::ChocolateConfectionery
    } else if roll < 95 {
        Needstate::SugarConfectionery
    } else {
        Needstate::ChewingGum
    }
}

fn draw_barcode(rng: &mut StdRng) -> u64 {
    if rng.gen_bool(0.7) {
        // UK prefixed EAN-13.
        rng.gen_range(5_000_000_000_000u64..6_000_000_000_000u64)
    } else {
        rng.gen_range(1_000_000_000_000u64..5_000_000_000_000u64)
    }
}

fn draw_product(
    key: ProductKey,
    mfr: &Manufacturer,
    brand: String,
    rng: &mut StdRng,
) -> ProductRecord {
    let needstate = draw_needstate(rng);
    let segment = match needstate {
        Needstate::ChocolateConfectionery => pick_weighted(rng, CHOCOLATE_SEGMENTS),
        Needstate::SugarConfectionery => pick_weighted(rng, SUGAR_SEGMENTS),
        Needstate::ChewingGum => pick_weighted(rng, GUM_SEGMENTS),
    };
    let subsegment = pick_weighted(rng, subsegments(segment));
    let flavor = pick_weighted(rng, flavors(segment, subsegment));
    let seasonal_event = seasonal_event_of(subsegment);

    let multipack = rng.gen_bool(mfr.class.multipack_share());
    let (pack_format, multipack_count, size_grams, size_code, size_group) = if multipack {
        let count = MULTIPACK_COUNTS[rng.gen_range(0..MULTIPACK_COUNTS.len())];
        let unit = MULTIPACK_UNIT_GRAMS[rng.gen_range(0..MULTIPACK_UNIT_GRAMS.len())];
        (
            PackFormat::Multipack,
            count,
            (count * unit) as f64,
            format!("{count} X {unit}G"),
            SizeGroup::Multipack,
        )
    } else {
        let (lo, hi, step) = size_menu(segment);
        let steps = (hi - lo) / step;
        let grams = lo + step * rng.gen_range(0..=steps);
        (
            PackFormat::Standard,
            1,
            grams as f64,
            format!("{grams}G"),
            SizeGroup::from_grams(grams as f64),
        )
    };

    let price_class = mfr.class.price_class();
    let (price_lo, price_hi) = price_class.price_range();
    let base_price = rng.gen_range(price_lo..price_hi);
    let (e_lo, e_hi) = price_class.elasticity_range();
    let elasticity = rng.gen_range(e_lo..e_hi);

    let mut description = format!("{} {} {}", brand.to_uppercase(), flavor, size_code);
    let mut barcode = Some(draw_barcode(rng));

    // A slice of the catalog carries feed-style data quality quirks.
    if rng.gen_bool(0.05) {
        if rng.gen_bool(0.5) {
            barcode = None;
        } else {
            description = description.to_lowercase();
        }
    }

    ProductRecord {
        key,
        description,
        manufacturer: mfr.name.clone(),
        manufacturer_class: mfr.class,
        owner_class: mfr.owner_class,
        brand,
        needstate,
        segment: segment.to_string(),
        subsegment: subsegment.to_string(),
        flavor: flavor.to_string(),
        pack_format,
        multipack_count,
        size_grams,
        size_code,
        size_group,
        seasonal_event,
        price_class,
        base_price,
        elasticity,
        barcode,
        private_label: mfr.name == PRIVATE_LABEL_MANUFACTURER,
        restricted: rng.gen_bool(0.05),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn small_spec() -> CatalogSpec {
        CatalogSpec {
            product_count: 1_000,
            house_product_count: 20,
            brand_target: 120,
        }
    }

    #[test]
    fn test_manufacturer_table_shape() {
        let mfrs = build_manufacturers();
        assert_eq!(mfrs.len(), 50);
        let total: f64 = mfrs.iter().map(|m| m.share).sum();
        assert!((total - 1.0).abs() < 1e-9);
        let house: Vec<_> = mfrs.iter().filter(|m| m.owner_class.is_house()).collect();
        assert_eq!(house.len(), 1);
        assert_eq!(house[0].name, HOUSE_MANUFACTURER);
    }

    #[test]
    fn test_house_count_is_exact() {
        let mut rng = StdRng::seed_from_u64(7);
        let catalog = ProductCatalog::build(&small_spec(), &mut rng).unwrap();
        assert_eq!(catalog.len(), 1_000);
        assert_eq!(catalog.house_indices().len(), 20);

        let house_brands: std::collections::HashSet<_> = catalog
            .house_indices()
            .iter()
            .map(|&i| catalog.product(i).brand.clone())
            .collect();
        assert!(house_brands.len() >= 4);
    }

    #[test]
    fn test_keys_are_unique_and_in_range() {
        let mut rng = StdRng::seed_from_u64(11);
        let catalog = ProductCatalog::build(&small_spec(), &mut rng).unwrap();
        let mut seen = std::collections::HashSet::new();
        for p in catalog.products() {
            assert!(PRODUCT_KEY_RANGE.contains(&p.key.0));
            assert!(seen.insert(p.key));
        }
    }

    #[test]
    fn test_seasonal_events_follow_subsegment() {
        let mut rng = StdRng::seed_from_u64(13);
        let catalog = ProductCatalog::build(&small_spec(), &mut rng).unwrap();
        for p in catalog.products() {
            match p.subsegment.as_str() {
                "EASTER EGGS" => assert_eq!(p.seasonal_event, Some(SeasonalEvent::Easter)),
                "ADVENT CALENDARS" | "CHRISTMAS NOVELTIES" => {
                    assert_eq!(p.seasonal_event, Some(SeasonalEvent::Christmas))
                }
                "VALENTINE HEARTS" => {
                    assert_eq!(p.seasonal_event, Some(SeasonalEvent::Valentine))
                }
                _ => assert_eq!(p.seasonal_event, None),
            }
        }
    }

    #[test]
    fn test_elasticity_respects_price_class() {
        let mut rng = StdRng::seed_from_u64(17);
        let catalog = ProductCatalog::build(&small_spec(), &mut rng).unwrap();
        for p in catalog.products() {
            let (lo, hi) = p.price_class.elasticity_range();
            assert!(p.elasticity >= lo && p.elasticity <= hi, "{:?}", p.key);
            let (plo, phi) = p.price_class.price_range();
            assert!(p.base_price >= plo && p.base_price <= phi);
        }
    }

    #[test]
    fn test_build_is_deterministic() {
        let a = ProductCatalog::build(&small_spec(), &mut StdRng::seed_from_u64(42)).unwrap();
        let b = ProductCatalog::build(&small_spec(), &mut StdRng::seed_from_u64(42)).unwrap();
        for (x, y) in a.products().iter().zip(b.products().iter()) {
            assert_eq!(x.key, y.key);
            assert_eq!(x.description, y.description);
            assert_eq!(x.base_price.to_bits(), y.base_price.to_bits());
            assert_eq!(x.elasticity.to_bits(), y.elasticity.to_bits());
        }
    }

    #[test]
    fn test_oversized_house_portfolio_rejected() {
        let spec = CatalogSpec {
            product_count: 100,
            house_product_count: 50,
            brand_target: 40,
        };
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_private_label_flag_follows_manufacturer() {
        let mut rng = StdRng::seed_from_u64(29);
        let catalog = ProductCatalog::build(&small_spec(), &mut rng).unwrap();
        let mut flagged = 0;
        for p in catalog.products() {
            assert_eq!(p.private_label, p.manufacturer == PRIVATE_LABEL_MANUFACTURER);
            if p.private_label {
                flagged += 1;
            }
        }
        // Private label is the largest single share of the catalog.
        assert!(flagged > 100, "{flagged}");
    }

    #[test]
    fn test_multipack_products_carry_pack_counts() {
        let mut rng = StdRng::seed_from_u64(23);
        let catalog = ProductCatalog::build(&small_spec(), &mut rng).unwrap();
        let multis: Vec<_> = catalog
            .products()
            .iter()
            .filter(|p| p.pack_format == PackFormat::Multipack)
            .collect();
        assert!(!multis.is_empty());
        for p in multis {
            assert!(p.multipack_count >= 4);
            assert!(p.size_code.contains(" X "));
            assert_eq!(p.size_group, SizeGroup::Multipack);
        }
    }
}
