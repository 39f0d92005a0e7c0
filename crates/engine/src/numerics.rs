//! Order-stable numeric primitives shared by the generation models.
//!
//! Every reduction and rescale in the pipeline routes through these
//! helpers so that results depend only on input order, never on how the
//! surrounding loop was chunked or parallelized.
//!
//! All helpers:
//! - Are deterministic (same inputs → same outputs)
//! - Tolerate empty and zero-sum inputs without dividing by zero
//! - Never return non-finite values for finite inputs

/// Sum a slice by fixed halving.
///
/// Split points depend only on the slice length, so the result is
/// identical no matter how the caller produced the slice. Pairwise
/// summation also loses less precision than a running sum on the long,
/// similarly-sized addend lists the rollups produce.
pub fn pairwise_sum(values: &[f64]) -> f64 {
    const LEAF: usize = 32;
    if values.len() <= LEAF {
        values.iter().sum()
    } else {
        let mid = values.len() / 2;
        pairwise_sum(&values[..mid]) + pairwise_sum(&values[mid..])
    }
}

/// Split a total across weights, proportionally.
///
/// Zero or negative total weight yields all zeros rather than NaN.
///
/// # Example
/// ```
/// use emporium_engine::numerics::weighted_split;
///
/// let parts = weighted_split(100.0, &[1.0, 3.0]);
/// assert!((parts[0] - 25.0).abs() < 1e-12);
/// assert!((parts[1] - 75.0).abs() < 1e-12);
/// ```
pub fn weighted_split(total: f64, weights: &[f64]) -> Vec<f64> {
    let weight_sum = pairwise_sum(weights);
    if weight_sum <= 0.0 || !weight_sum.is_finite() {
        return vec![0.0; weights.len()];
    }
    weights.iter().map(|w| total * w / weight_sum).collect()
}

/// Rescale a slice in place so it sums to `target`.
///
/// A zero-sum slice is left untouched; there is no distribution to
/// preserve in that case.
pub fn rescale_to_sum(values: &mut [f64], target: f64) {
    let current = pairwise_sum(values);
    if current <= 0.0 || !current.is_finite() || target < 0.0 {
        return;
    }
    let factor = target / current;
    for v in values.iter_mut() {
        *v *= factor;
    }
}

/// Move `current` a fraction of the way toward `target`.
///
/// `weight` = 0 keeps `current`, 1 jumps to `target`.
///
/// # Example
/// ```
/// use emporium_engine::numerics::blend;
///
/// assert_eq!(blend(10.0, 20.0, 0.5), 15.0);
/// assert_eq!(blend(10.0, 20.0, 1.0), 20.0);
/// ```
#[inline]
pub fn blend(current: f64, target: f64, weight: f64) -> f64 {
    current + weight * (target - current)
}

/// Clamp `next` into a relative band around `prev`.
///
/// With `max_rel` = 0.02 the result stays within ±2% of `prev`. A
/// non-positive `prev` passes `next` through: there is no meaningful
/// relative band around zero.
///
/// # Example
/// ```
/// use emporium_engine::numerics::clamp_step;
///
/// assert_eq!(clamp_step(100.0, 150.0, 0.02), 102.0);
/// assert_eq!(clamp_step(100.0, 101.0, 0.02), 101.0);
/// assert_eq!(clamp_step(100.0, 50.0, 0.02), 98.0);
/// ```
#[inline]
pub fn clamp_step(prev: f64, next: f64, max_rel: f64) -> f64 {
    if prev <= 0.0 {
        return next;
    }
    next.clamp(prev * (1.0 - max_rel), prev * (1.0 + max_rel))
}

/// `part / total`, or 0 when there is nothing to take a share of.
#[inline]
pub fn share_of(part: f64, total: f64) -> f64 {
    if total <= 0.0 { 0.0 } else { part / total }
}

/// Relative change from `prev` to `next`, or 0 when `prev` is not a
/// usable base.
#[inline]
pub fn rel_change(prev: f64, next: f64) -> f64 {
    if prev <= 0.0 { 0.0 } else { (next - prev) / prev }
}

/// Round to `decimals` places.
#[inline]
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}
