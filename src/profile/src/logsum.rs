//! Fast log-space sum and difference.
//!
//! `ln(e^a + e^b)` is the inner loop of every Forward/Backward pass, so the
//! correction term `ln(1 + e^{-d})` comes from a lookup table indexed on the
//! score difference `d`, exactly like the scalar kernels do everywhere else
//! in this workspace: compute once, reuse forever.

use once_cell::sync::Lazy;

/// Table resolution: one entry per 1/[`LOGSUM_SCALE`] nat of difference.
const LOGSUM_SCALE: f32 = 1000.0;
/// Differences beyond `LOGSUM_TBL / LOGSUM_SCALE` nats contribute less than
/// single-precision epsilon; the larger operand wins outright.
const LOGSUM_TBL: usize = 16000;

static TABLE: Lazy<Vec<f32>> = Lazy::new(|| {
    (0..LOGSUM_TBL)
        .map(|i| (1.0 + f64::exp(-(i as f64) / f64::from(LOGSUM_SCALE))).ln() as f32)
        .collect()
});

/// `ln(e^a + e^b)`, table-driven. `-inf` operands behave as true zeros.
#[inline]
pub fn logsum(a: f32, b: f32) -> f32 {
    let (hi, lo) = if a >= b { (a, b) } else { (b, a) };
    if lo == f32::NEG_INFINITY {
        return hi;
    }
    let idx = ((hi - lo) * LOGSUM_SCALE) as usize;
    if idx >= LOGSUM_TBL {
        hi
    } else {
        hi + TABLE[idx]
    }
}

/// Exact (slow) reference for [`logsum`]; test oracle.
#[inline]
pub fn logsum_exact(a: f32, b: f32) -> f32 {
    if a == f32::NEG_INFINITY && b == f32::NEG_INFINITY {
        return f32::NEG_INFINITY;
    }
    let (hi, lo) = if a >= b { (a, b) } else { (b, a) };
    hi + (1.0 + f64::exp(f64::from(lo) - f64::from(hi))).ln() as f32
}

/// `ln(e^a − e^b)` for `a ≥ b`. Returns `-inf` when the operands cancel.
#[inline]
pub fn logdiff(a: f32, b: f32) -> f32 {
    debug_assert!(a >= b, "logdiff requires a >= b (got {a} < {b})");
    if b == f32::NEG_INFINITY {
        return a;
    }
    let d = f64::from(b) - f64::from(a);
    let inner = -f64::exp_m1(d); // 1 - e^{b-a}, accurate near cancellation
    if inner <= 0.0 {
        f32::NEG_INFINITY
    } else {
        a + inner.ln() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn matches_exact_within_table_resolution() {
        let mut rng = fastrand::Rng::with_seed(42);
        for _ in 0..10_000 {
            let a = rng.f32() * 40.0 - 20.0;
            let b = rng.f32() * 40.0 - 20.0;
            let got = logsum(a, b);
            let want = logsum_exact(a, b);
            assert!((got - want).abs() < 1e-3, "logsum({a},{b}) = {got}, want {want}");
        }
    }

    #[test]
    fn neg_infinity_is_identity() {
        assert_eq!(logsum(f32::NEG_INFINITY, f32::NEG_INFINITY), f32::NEG_INFINITY);
        assert_approx_eq!(f32, logsum(1.5, f32::NEG_INFINITY), 1.5);
        assert_approx_eq!(f32, logsum(f32::NEG_INFINITY, -3.0), -3.0);
    }

    #[test]
    fn dominant_operand_wins_past_table_range() {
        assert_eq!(logsum(0.0, -20.0), 0.0);
    }

    #[test]
    fn logdiff_inverts_logsum() {
        let a = 2.0_f32;
        let b = 0.5_f32;
        let sum = logsum_exact(a, b);
        assert!((logdiff(sum, b) - a).abs() < 1e-4);
        assert_eq!(logdiff(1.25, 1.25), f32::NEG_INFINITY);
        assert_eq!(logdiff(0.75, f32::NEG_INFINITY), 0.75);
    }
}
