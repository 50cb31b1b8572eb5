use thiserror::Error;

/// Failure modes of the simplex core. Only the first is fatal to the solve;
/// rank deficiency and dual-feasibility breakdown are reported upward for the
/// caller to recover from, and budget exhaustion leaves the work arrays
/// internally consistent.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Error {
    #[error("structural invariant violated: {0}")]
    StructuralInvariantViolation(String),
    #[error("basis factorization is rank deficient in {0} columns")]
    NumericRankDeficiency(usize),
    #[error("iteration or run-time budget exhausted")]
    BudgetExhausted,
    #[error("{0} free variables remain dual infeasible")]
    DualFeasibilityBreakdown(usize),
}
