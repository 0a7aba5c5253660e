use crate::variable::Value;

/// Errors raised while constructing variables or building the circuit.
///
/// These are contract violations in the program under evaluation; none of
/// them is recoverable, the driver reports the message and exits.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("probability must lie in [0, 1], got {0}")]
    ProbabilityOutOfRange(f64),
    #[error("odds must be non-negative, got {0}")]
    NegativeOdds(f64),
    #[error("distribution for `{0}` has no mass: all odds are zero")]
    ZeroTotalOdds(String),
    #[error("expected a numeric value, found {0}")]
    NonNumericValue(Value),
    #[error("discrete numeric values must be numbers, found {0}")]
    ExpectedNumericValue(Value),
    #[error("discrete qualitative values must be strings, found {0}")]
    ExpectedTextValue(Value),
    #[error("uniform bounds are inverted: a={a} > b={b}")]
    InvertedUniformBounds { a: f64, b: f64 },
    #[error("pareto parameters must be positive: x_m={x_m}, alpha={alpha}")]
    NonPositivePareto { x_m: f64, alpha: f64 },
    #[error("split point {value} lies outside the support [{lower}, {upper}]")]
    SplitOutOfRange {
        value: f64,
        lower: f64,
        upper: f64,
    },
    #[error("interval count must be positive, got {0}")]
    NonPositiveCount(f64),
    #[error("cannot raise negative base {base} to non-integer exponent {exponent}")]
    NegativeBasePower { base: f64, exponent: f64 },
    #[error("arithmetic requires numeric variables, `{0}` is qualitative")]
    QualitativeArithmetic(String),
    #[error("invalid distribution parameters: {0}")]
    Distribution(#[from] statrs::StatsError),
}
