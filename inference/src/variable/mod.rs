//! The random-variable algebra.
//!
//! Every value flowing through a program is a [Variable]: a distribution
//! fragment carrying its expectation, variance, support bounds and the
//! probability mass of this particular fragment within its parent
//! distribution. Qualitative variables carry strings in the expectation and
//! bound fields; everything else is numeric.
//!
//! Arithmetic operates on 50 cached "inner points" sampled from the
//! variable's support; comparisons operate on support-interval overlap and
//! collapse to fixed TRUE/FALSE variables.

pub mod continuous;
pub mod discrete;

use std::{cell::RefCell, cmp::Ordering, fmt, rc::Rc};

use rand_chacha::ChaCha8Rng;

use crate::ModelError;

pub use self::continuous::{discretize, discretize_n, NUM_INNER_POINTS};
pub use self::discrete::{bernoulli, discrete};

/// A scalar carried by a variable: numeric, or qualitative text.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Num(f64),
    Text(String),
}

impl Value {
    pub fn as_num(&self) -> Option<f64> {
        match self {
            Self::Num(n) => Some(*n),
            Self::Text(_) => None,
        }
    }

    /// A value is logically true unless it is 0 or the empty string.
    pub fn is_true(&self) -> bool {
        match self {
            Self::Num(n) => *n != 0.0,
            Self::Text(s) => !s.is_empty(),
        }
    }

    fn le(&self, other: &Self) -> bool {
        matches!(
            self.partial_cmp(other),
            Some(Ordering::Less | Ordering::Equal)
        )
    }

    fn lt(&self, other: &Self) -> bool {
        matches!(self.partial_cmp(other), Some(Ordering::Less))
    }
}

impl PartialOrd for Value {
    /// Numbers order numerically and text orders lexicographically; values
    /// of different kinds are incomparable.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Num(a), Self::Num(b)) => a.partial_cmp(b),
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "\"{s}\""),
        }
    }
}

/// The distribution class a variable was produced from.
#[derive(Debug, Clone, PartialEq)]
pub enum Class {
    Fixed,
    DiscreteNumeric,
    DiscreteQualitative,
    Uniform { a: f64, b: f64 },
    Normal { mu: f64, sigma: f64 },
    Beta { alpha: f64, beta: f64 },
    Pareto { x_m: f64, alpha: f64 },
    OpResult(OpKind),
}

/// The operator that produced an [Class::OpResult] variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed => write!(f, "fixed"),
            Self::DiscreteNumeric => write!(f, "discrete numeric"),
            Self::DiscreteQualitative => write!(f, "discrete qualitative"),
            Self::Uniform { a, b } => write!(f, "Uniform(a={a:.4}, b={b:.4})"),
            Self::Normal { mu, sigma } => write!(f, "Normal(μ={mu:.4}, σ={sigma:.4})"),
            Self::Beta { alpha, beta } => write!(f, "Beta(α={alpha:.4}, β={beta:.4})"),
            Self::Pareto { x_m, alpha } => write!(f, "Pareto(x_m={x_m:.4}, α={alpha:.4})"),
            Self::OpResult(_) => write!(f, "operation result"),
        }
    }
}

/// A random-variable fragment.
#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub class: Class,
    pub expectation: Value,
    pub variance: f64,
    pub lower: Value,
    pub upper: Value,
    pub probability: f64,
    /// Lazily sampled inner points, shared across clones of the cache.
    inner: RefCell<Option<Rc<Vec<f64>>>>,
}

/// Validates a probability, tolerating float drift just past the ends.
pub(crate) fn checked_probability(p: f64) -> Result<f64, ModelError> {
    if (-1e-9..=1.0 + 1e-9).contains(&p) {
        Ok(p.clamp(0.0, 1.0))
    } else {
        Err(ModelError::ProbabilityOutOfRange(p))
    }
}

impl Variable {
    pub fn new(
        name: impl Into<String>,
        class: Class,
        expectation: Value,
        variance: f64,
        lower: Value,
        upper: Value,
        probability: f64,
    ) -> Result<Self, ModelError> {
        Ok(Self {
            name: name.into(),
            class,
            expectation,
            variance,
            lower,
            upper,
            probability: checked_probability(probability)?,
            inner: RefCell::new(None),
        })
    }

    /// A point-mass variable: zero variance, degenerate support, mass 1.
    pub fn fixed(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            class: Class::Fixed,
            expectation: value.clone(),
            variance: 0.0,
            lower: value.clone(),
            upper: value,
            probability: 1.0,
            inner: RefCell::new(None),
        }
    }

    pub fn fixed_true() -> Self {
        Self::fixed("TRUE", Value::Num(1.0))
    }

    pub fn fixed_false() -> Self {
        Self::fixed("FALSE", Value::Num(0.0))
    }

    pub fn fixed_bool(truth: bool) -> Self {
        if truth {
            Self::fixed_true()
        } else {
            Self::fixed_false()
        }
    }

    /// A variable is logically true unless its expectation is 0 or the
    /// empty string.
    pub fn is_true(&self) -> bool {
        self.expectation.is_true()
    }

    /// The expectation, wrapped as a fixed variable.
    pub fn get_expectation(&self) -> Self {
        Self::fixed(format!("E[{}]", self.name), self.expectation.clone())
    }

    /// The variance, wrapped as a fixed variable.
    pub fn get_variance(&self) -> Self {
        Self::fixed(format!("Var[{}]", self.name), Value::Num(self.variance))
    }

    fn num_expectation(&self) -> Result<f64, ModelError> {
        self.expectation
            .as_num()
            .ok_or_else(|| ModelError::QualitativeArithmetic(self.name.clone()))
    }

    fn num_bounds(&self) -> Result<(f64, f64), ModelError> {
        match (self.lower.as_num(), self.upper.as_num()) {
            (Some(l), Some(u)) => Ok((l, u)),
            _ => Err(ModelError::QualitativeArithmetic(self.name.clone())),
        }
    }

    /// The cached inner points, sampling them on first use.
    pub fn inner_points(&self, rng: &mut ChaCha8Rng) -> Result<Rc<Vec<f64>>, ModelError> {
        if let Some(points) = self.inner.borrow().as_ref() {
            return Ok(points.clone());
        }
        let points = Rc::new(self.calculate_inner_points(rng)?);
        *self.inner.borrow_mut() = Some(points.clone());
        Ok(points)
    }

    fn calculate_inner_points(&self, rng: &mut ChaCha8Rng) -> Result<Vec<f64>, ModelError> {
        match &self.class {
            Class::Fixed | Class::DiscreteNumeric | Class::OpResult(_) => {
                let value = self.num_expectation()?;
                Ok(vec![value; NUM_INNER_POINTS])
            }
            Class::DiscreteQualitative => {
                Err(ModelError::QualitativeArithmetic(self.name.clone()))
            }
            class => {
                let (l, u) = self.num_bounds()?;
                continuous::interval_inner_points(class, l, u, rng)
            }
        }
    }

    fn op_result(
        kind: OpKind,
        name: &str,
        points: Vec<f64>,
        expectation: f64,
        lower: f64,
        upper: f64,
    ) -> Self {
        let variance = sample_variance(&points, expectation);
        Self {
            name: name.into(),
            class: Class::OpResult(kind),
            expectation: Value::Num(expectation),
            variance,
            lower: Value::Num(lower),
            upper: Value::Num(upper),
            probability: 1.0,
            inner: RefCell::new(Some(Rc::new(points))),
        }
    }

    /// Pointwise sum; the expectation is exact, the variance is sampled.
    pub fn add(&self, other: &Self, rng: &mut ChaCha8Rng) -> Result<Self, ModelError> {
        let points: Vec<f64> = self
            .inner_points(rng)?
            .iter()
            .zip(other.inner_points(rng)?.iter())
            .map(|(x, y)| x + y)
            .collect();
        let expectation = self.num_expectation()? + other.num_expectation()?;
        let (la, ua) = self.num_bounds()?;
        let (lb, ub) = other.num_bounds()?;
        Ok(Self::op_result(
            OpKind::Add,
            "ADD",
            points,
            expectation,
            la + lb,
            ua + ub,
        ))
    }

    /// Pointwise difference. The upper bound is `u_A + l_B`, not
    /// `u_A - l_B`.
    pub fn sub(&self, other: &Self, rng: &mut ChaCha8Rng) -> Result<Self, ModelError> {
        let points: Vec<f64> = self
            .inner_points(rng)?
            .iter()
            .zip(other.inner_points(rng)?.iter())
            .map(|(x, y)| x - y)
            .collect();
        let expectation = self.num_expectation()? - other.num_expectation()?;
        let (la, ua) = self.num_bounds()?;
        let (lb, ub) = other.num_bounds()?;
        Ok(Self::op_result(
            OpKind::Sub,
            "SUBTRACT",
            points,
            expectation,
            la - ub,
            ua + lb,
        ))
    }

    /// Pointwise product; the expectation is the mean of the sampled
    /// products, the support the extrema of the endpoint products.
    pub fn mul(&self, other: &Self, rng: &mut ChaCha8Rng) -> Result<Self, ModelError> {
        let points: Vec<f64> = self
            .inner_points(rng)?
            .iter()
            .zip(other.inner_points(rng)?.iter())
            .map(|(x, y)| x * y)
            .collect();
        let expectation = mean(&points);
        let (la, ua) = self.num_bounds()?;
        let (lb, ub) = other.num_bounds()?;
        let corners = [la * lb, la * ub, ua * lb, ua * ub];
        Ok(Self::op_result(
            OpKind::Mul,
            "PRODUCT",
            points,
            expectation,
            min_of(&corners),
            max_of(&corners),
        ))
    }

    /// Pointwise quotient. `0/0` collapses to 0; a denominator pinned to
    /// zero yields a signed infinity; other zero denominators drop the
    /// point.
    pub fn div(&self, other: &Self, rng: &mut ChaCha8Rng) -> Result<Self, ModelError> {
        let (la, ua) = self.num_bounds()?;
        let (lb, ub) = other.num_bounds()?;
        let mut points = Vec::with_capacity(NUM_INNER_POINTS);
        for (&x, &y) in self
            .inner_points(rng)?
            .iter()
            .zip(other.inner_points(rng)?.iter())
        {
            if y == 0.0 {
                if x == 0.0 {
                    points.push(0.0);
                } else if lb == 0.0 && ub == 0.0 {
                    points.push(x.signum() * f64::INFINITY);
                }
            } else {
                points.push(x / y);
            }
        }
        let expectation = mean(&points);
        let mut corners = vec![
            safe_division(la, lb),
            safe_division(la, ub),
            safe_division(ua, lb),
            safe_division(ua, ub),
        ];
        if lb <= 0.0 && 0.0 <= ub {
            corners.push(f64::INFINITY);
        }
        Ok(Self::op_result(
            OpKind::Div,
            "DIVISION",
            points,
            expectation,
            min_of(&corners),
            max_of(&corners),
        ))
    }

    /// Pointwise exponentiation; raising a negative base to a non-integer
    /// exponent is a contract violation.
    pub fn pow(&self, other: &Self, rng: &mut ChaCha8Rng) -> Result<Self, ModelError> {
        let mut points = Vec::with_capacity(NUM_INNER_POINTS);
        for (&x, &y) in self
            .inner_points(rng)?
            .iter()
            .zip(other.inner_points(rng)?.iter())
        {
            points.push(safe_exponentiation(x, y)?);
        }
        let expectation = mean(&points);
        let (la, ua) = self.num_bounds()?;
        let (lb, ub) = other.num_bounds()?;
        let corners = [
            safe_exponentiation(la, lb)?,
            safe_exponentiation(la, ub)?,
            safe_exponentiation(ua, lb)?,
            safe_exponentiation(ua, ub)?,
        ];
        Ok(Self::op_result(
            OpKind::Pow,
            "EXPONENTIATION",
            points,
            expectation,
            min_of(&corners),
            max_of(&corners),
        ))
    }

    /// True when either of this variable's endpoints lands inside the
    /// other's support.
    fn reached_within(&self, other: &Self) -> bool {
        element_is_within(&self.lower, &other.lower, &other.upper)
            || element_is_within(&self.upper, &other.lower, &other.upper)
    }

    /// Support overlap, edges included.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.reached_within(other) || other.reached_within(self)
    }

    /// `self < other`: strictly left of the other support, no overlap.
    pub fn less(&self, other: &Self) -> Self {
        Self::fixed_bool(self.upper.lt(&other.lower) && !self.overlaps(other))
    }

    /// `self <= other`
    pub fn less_equal(&self, other: &Self) -> Self {
        Self::fixed_bool((self.upper.lt(&other.lower) && !self.overlaps(other)) || self.overlaps(other))
    }

    /// `self > other`
    pub fn greater(&self, other: &Self) -> Self {
        Self::fixed_bool(other.upper.lt(&self.lower) && !self.overlaps(other))
    }

    /// `self >= other`
    pub fn greater_equal(&self, other: &Self) -> Self {
        Self::fixed_bool((other.upper.lt(&self.lower) && !self.overlaps(other)) || self.overlaps(other))
    }

    /// `self == other`: the supports overlap.
    pub fn equal(&self, other: &Self) -> Self {
        Self::fixed_bool(self.overlaps(other))
    }

    /// `self != other`
    pub fn not_equal(&self, other: &Self) -> Self {
        Self::fixed_bool(!self.overlaps(other))
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Variable(name=\"{}\", class=\"{}\", E = {}, Var={:.4}, range = [{}, {}], Pr = {:.4})",
            self.name,
            self.class,
            DisplayScalar(&self.expectation),
            self.variance,
            DisplayScalar(&self.lower),
            DisplayScalar(&self.upper),
            self.probability,
        )
    }
}

/// Formats a [Value] with 4-decimal numbers and quoted text, matching the
/// variable display form used for elimination grouping.
struct DisplayScalar<'a>(&'a Value);

impl fmt::Display for DisplayScalar<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Value::Num(n) => write!(f, "{n:.4}"),
            Value::Text(s) => write!(f, "\"{s}\""),
        }
    }
}

/// `lo <= x <= hi`, edges included; false when the kinds are mixed.
fn element_is_within(x: &Value, lo: &Value, hi: &Value) -> bool {
    lo.le(x) && x.le(hi)
}

/// Population variance of the points around a known expectation.
pub(crate) fn sample_variance(points: &[f64], expectation: f64) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    points
        .iter()
        .map(|z| (z - expectation) * (z - expectation))
        .sum::<f64>()
        / points.len() as f64
}

fn mean(points: &[f64]) -> f64 {
    points.iter().sum::<f64>() / points.len() as f64
}

fn min_of(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

fn max_of(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

fn safe_division(x: f64, y: f64) -> f64 {
    if y == 0.0 {
        if x == 0.0 {
            0.0
        } else {
            x.signum() * f64::INFINITY
        }
    } else {
        x / y
    }
}

fn safe_exponentiation(x: f64, y: f64) -> Result<f64, ModelError> {
    if x < 0.0 && y.trunc() != y {
        Err(ModelError::NegativeBasePower {
            base: x,
            exponent: y,
        })
    } else {
        Ok(x.powf(y))
    }
}
