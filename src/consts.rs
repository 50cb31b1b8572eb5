/// Sentinel for an infinite bound. Any bound at or beyond this magnitude is
/// treated as unbounded and is never rescaled.
pub const INF: f64 = 1e30;

/// Default primal feasibility tolerance.
pub const PRIMAL_FEASIBILITY_TOLERANCE: f64 = 1e-7;

/// Default dual feasibility tolerance.
pub const DUAL_FEASIBILITY_TOLERANCE: f64 = 1e-7;

/// Bounds at or beyond this magnitude are ignored by bound tightening.
pub const BIG_BOUND: f64 = 1e10;

/// Threshold pivoting coefficient for the LU refactorization.
pub const STABILITY_COEFF: f64 = 0.9;

/// A pivot candidate below this magnitude marks the column as singular.
pub const SINGULARITY_TOLERANCE: f64 = 1e-8;

/// Fuzzy infinity test: true for either sign of an effectively infinite value.
pub fn is_infinity(value: f64) -> bool {
    value.abs() >= INF
}

/// Round a positive value to the nearest integer power of two.
pub fn pow2_round(value: f64) -> f64 {
    2f64.powi((value.ln() / std::f64::consts::LN_2 + 0.5).floor() as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infinity_is_two_sided() {
        assert!(is_infinity(INF));
        assert!(is_infinity(-INF));
        assert!(is_infinity(1e31));
        assert!(!is_infinity(1e29));
        assert!(!is_infinity(0.0));
    }

    #[test]
    fn pow2_round_picks_nearest_power() {
        assert_eq!(pow2_round(1.0), 1.0);
        assert_eq!(pow2_round(3.0), 4.0);
        assert_eq!(pow2_round(0.3), 0.25);
        assert_eq!(pow2_round(1000.0), 1024.0);
        assert_eq!(pow2_round(0.75), 1.0);
    }
}
