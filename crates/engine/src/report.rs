//! Run report: constraint violations and degeneracy accounting.
//!
//! Failures split three ways: fatal configuration errors (see
//! [`crate::error`]), constraint violations (structured records,
//! generation continues), and numeric degeneracies (values clamped in
//! place and counted here).

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use emporium_dimensions::TimeKey;

/// The constraint a violation record refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    CoverageRatio,
    ParentChildSum,
    MomBand,
    BrandShareBand,
    SeasonalPeak,
    NonNegative,
    PromoWithinTotal,
    Sparsity,
    ValueIdentity,
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Constraint::CoverageRatio => "coverage_ratio",
            Constraint::ParentChildSum => "parent_child_sum",
            Constraint::MomBand => "mom_band",
            Constraint::BrandShareBand => "brand_share_band",
            Constraint::SeasonalPeak => "seasonal_peak",
            Constraint::NonNegative => "non_negative",
            Constraint::PromoWithinTotal => "promo_within_total",
            Constraint::Sparsity => "sparsity",
            Constraint::ValueIdentity => "value_identity",
        };
        write!(f, "{s}")
    }
}

/// One observed constraint breach.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintViolation {
    /// Period the breach was observed in, if period-scoped.
    pub period: Option<TimeKey>,
    /// What the record is about (a node, a brand, a product key).
    pub subject: String,
    pub constraint: Constraint,
    pub observed: f64,
    /// Acceptable (lower, upper) band.
    pub bound: (f64, f64),
}

impl fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} breached for {}: observed {:.4}, bound [{:.4}, {:.4}]",
            self.constraint, self.subject, self.observed, self.bound.0, self.bound.1
        )?;
        if let Some(p) = self.period {
            write!(f, " (period {p})")?;
        }
        Ok(())
    }
}

/// Accumulated outcome of one generation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub violations: Vec<ConstraintViolation>,
    /// Clamp site → number of clamps applied.
    pub degeneracies: IndexMap<String, u64>,
    pub periods_run: usize,
    pub facts_emitted: usize,
}

impl RunReport {
    /// Record a violation and surface it as a structured warning.
    pub fn record_violation(&mut self, violation: ConstraintViolation) {
        warn!(
            constraint = %violation.constraint,
            subject = %violation.subject,
            observed = violation.observed,
            "constraint violation"
        );
        self.violations.push(violation);
    }

    /// Count a clamped degeneracy at the named site.
    pub fn count_degeneracy(&mut self, site: &str) {
        *self.degeneracies.entry(site.to_string()).or_insert(0) += 1;
    }

    /// Merge a batch of degeneracies counted off-thread.
    pub fn count_degeneracies(&mut self, site: &str, n: u64) {
        if n > 0 {
            *self.degeneracies.entry(site.to_string()).or_insert(0) += n;
        }
    }

    pub fn violation_count(&self) -> usize {
        self.violations.len()
    }

    pub fn degeneracy_total(&self) -> u64 {
        self.degeneracies.values().sum()
    }

    /// Clamp a possibly degenerate intermediate into `lo..=hi`.
    ///
    /// Non-finite inputs collapse to `lo`. Every correction is counted
    /// under `site`.
    pub fn sanitize(&mut self, value: f64, lo: f64, hi: f64, site: &str) -> f64 {
        if !value.is_finite() {
            self.count_degeneracy(site);
            return lo;
        }
        if value < lo || value > hi {
            self.count_degeneracy(site);
            return value.clamp(lo, hi);
        }
        value
    }
}
