//! Core execution types for the generation pipeline.

use std::fmt;

use emporium_dimensions::{SeasonalPeriod, TimeKey};

/// Pipeline phases executed for every weekly period, in this order.
///
/// BASE is independent per product and may run in parallel; the two
/// correction phases and assembly are sequential so corrections observe
/// a consistent arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Per-series targets: priors, seasonality, pricing, scenarios.
    Base,
    /// Coverage-ratio pull and parent/child reconciliation.
    HierarchyCorrect,
    /// House family share banding per geography node.
    BrandCorrect,
    /// Fact emission into the period buffer.
    Assemble,
}

impl Phase {
    pub const ALL: [Phase; 4] = [
        Phase::Base,
        Phase::HierarchyCorrect,
        Phase::BrandCorrect,
        Phase::Assemble,
    ];
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Base => "base",
            Phase::HierarchyCorrect => "hierarchy_correct",
            Phase::BrandCorrect => "brand_correct",
            Phase::Assemble => "assemble",
        };
        write!(f, "{s}")
    }
}

/// Immutable facts about the period currently being generated.
///
/// Handed to every model so draws can be derived from (entity, period)
/// without touching global state.
#[derive(Debug, Clone, Copy)]
pub struct PeriodContext {
    /// 0-based position in the run.
    pub index: usize,
    pub time_key: TimeKey,
    /// 1..=52 within the series year.
    pub week_of_year: u32,
    pub seasonal_period: SeasonalPeriod,
    /// Total periods in the run.
    pub periods_total: usize,
}

impl PeriodContext {
    pub fn is_first(&self) -> bool {
        self.index == 0
    }
}
