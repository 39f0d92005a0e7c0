//! Brand share controller.
//!
//! The house portfolio's share of value sales is managed into a
//! corridor at every geography node. Two mechanisms:
//!
//! - At warmup, one global factor scales every house product so the
//!   portfolio starts at the corridor midpoint. Without this the AR
//!   anchors would sit far below the floor and the per-period
//!   correction would fight the temporal pull forever.
//! - Each period, any node whose share drifted outside the corridor is
//!   recorded and then corrected onto the nearest edge of the narrower
//!   target band. The correction trades volume between the house
//!   family and everyone else; the node's total is preserved exactly.
//!
//! Membership is decided by the owner-class attribute, never by
//! matching manufacturer or brand names.

use emporium_dimensions::{GeographyDim, TimeKey};

use crate::config::BrandShareConfig;
use crate::report::{Constraint, ConstraintViolation, RunReport};

/// Per-node multipliers produced by one correction pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShareCorrection {
    pub house_factor: f64,
    pub other_factor: f64,
}

impl Default for ShareCorrection {
    fn default() -> Self {
        ShareCorrection {
            house_factor: 1.0,
            other_factor: 1.0,
        }
    }
}

impl ShareCorrection {
    pub fn is_identity(&self) -> bool {
        self.house_factor == 1.0 && self.other_factor == 1.0
    }
}

/// Keeps the house family inside its share corridor.
#[derive(Debug, Clone)]
pub struct BrandShareController {
    config: BrandShareConfig,
}

impl BrandShareController {
    pub fn new(config: BrandShareConfig) -> Self {
        BrandShareController { config }
    }

    /// Midpoint of the target band, used as the warmup aim.
    pub fn target_midpoint(&self) -> f64 {
        (self.config.target_floor + self.config.target_ceiling) / 2.0
    }

    /// Factor to apply to every house product's warmup levels so the
    /// portfolio's market share lands on the target midpoint.
    pub fn warmup_factor(&self, house_total: f64, all_total: f64) -> f64 {
        let other_total = all_total - house_total;
        if house_total <= 0.0 || other_total <= 0.0 {
            return 1.0;
        }
        let mid = self.target_midpoint();
        mid * other_total / ((1.0 - mid) * house_total)
    }

    /// One correction pass over a period's values.
    ///
    /// `values` holds one row per catalog product (node-indexed);
    /// `house` marks the house rows. Returns one correction per node;
    /// nodes inside the corridor get the identity.
    pub fn corrections(
        &self,
        values: &[Vec<f64>],
        house: &[bool],
        geo: &GeographyDim,
        time_key: TimeKey,
        report: &mut RunReport,
    ) -> Vec<ShareCorrection> {
        let mut out = vec![ShareCorrection::default(); geo.len()];

        for node_idx in 0..geo.len() {
            let mut family = 0.0;
            let mut total = 0.0;
            for (row, is_house) in values.iter().zip(house.iter()) {
                let v = row[node_idx];
                total += v;
                if *is_house {
                    family += v;
                }
            }
            if family <= 0.0 || total <= family {
                continue;
            }

            let share = family / total;
            if share >= self.config.floor && share <= self.config.ceiling {
                continue;
            }

            report.record_violation(ConstraintViolation {
                period: Some(time_key),
                subject: geo.node(node_idx).description.clone(),
                constraint: Constraint::BrandShareBand,
                observed: share,
                bound: (self.config.floor, self.config.ceiling),
            });

            let target = share.clamp(self.config.target_floor, self.config.target_ceiling);
            out[node_idx] = ShareCorrection {
                house_factor: target * total / family,
                other_factor: (1.0 - target) * total / (total - family),
            };
        }

        out
    }
}
