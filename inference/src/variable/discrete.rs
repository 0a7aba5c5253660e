//! Discrete variable constructors.

use sppl_parser::ast::DiscreteKind;

use super::{checked_probability, Class, Value, Variable};
use crate::ModelError;

/// Creates one variable per support value, with odds normalised into
/// probabilities. The odds need not sum to one, but must be non-negative
/// and not all zero.
pub fn discrete(
    kind: DiscreteKind,
    name: &str,
    values: Vec<Value>,
    odds: Vec<f64>,
) -> Result<Vec<Variable>, ModelError> {
    for &w in &odds {
        if w < 0.0 {
            return Err(ModelError::NegativeOdds(w));
        }
    }
    let total: f64 = odds.iter().sum();
    if total == 0.0 {
        return Err(ModelError::ZeroTotalOdds(name.into()));
    }

    let class = match kind {
        DiscreteKind::Numeric => Class::DiscreteNumeric,
        DiscreteKind::Qualitative => Class::DiscreteQualitative,
    };
    let mut variables = Vec::with_capacity(values.len());
    for (value, w) in values.into_iter().zip(odds) {
        match (kind, &value) {
            (DiscreteKind::Numeric, Value::Text(_)) => {
                return Err(ModelError::ExpectedNumericValue(value))
            }
            (DiscreteKind::Qualitative, Value::Num(_)) => {
                return Err(ModelError::ExpectedTextValue(value))
            }
            _ => {}
        }
        variables.push(Variable {
            name: name.into(),
            class: class.clone(),
            expectation: value.clone(),
            variance: 0.0,
            lower: value.clone(),
            upper: value,
            probability: checked_probability(w / total)?,
            inner: Default::default(),
        });
    }
    Ok(variables)
}

/// Creates the `[FALSE, TRUE]` pair of a Bernoulli draw with `Pr(TRUE) = p`.
pub fn bernoulli(name: &str, p: f64) -> Result<[Variable; 2], ModelError> {
    if !(0.0..=1.0).contains(&p) {
        return Err(ModelError::ProbabilityOutOfRange(p));
    }
    let mut pair = discrete(
        DiscreteKind::Numeric,
        name,
        vec![Value::Num(0.0), Value::Num(1.0)],
        vec![1.0 - p, p],
    )?
    .into_iter();
    match (pair.next(), pair.next()) {
        (Some(v0), Some(v1)) => Ok([v0, v1]),
        // discrete() returns exactly one variable per value
        _ => unreachable!("bernoulli always yields two variables"),
    }
}
