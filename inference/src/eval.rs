//! Expression evaluation against a chain environment.
//!
//! Every expression evaluates to a [Variable]; the truth and numeric entry
//! points collapse that variable according to the truth convention
//! (expectation is neither 0 nor the empty string) or to its raw
//! expectation. Unresolved names evaluate to fixed FALSE rather than
//! raising, which keeps every branch condition and observation total.

use std::{collections::BTreeMap, rc::Rc};

use rand_chacha::ChaCha8Rng;

use sppl_parser::ast::{BinaryOp, Expr};

use crate::{
    variable::{Value, Variable},
    ModelError,
};

/// A chain environment: the variable visible under each name at some node.
pub type Env = BTreeMap<String, Rc<Variable>>;

/// Evaluates `expr` to a variable.
pub fn evaluate(expr: &Expr, env: &Env, rng: &mut ChaCha8Rng) -> Result<Rc<Variable>, ModelError> {
    let result = match expr {
        Expr::Name(name) => {
            return Ok(env
                .get(name)
                .cloned()
                .unwrap_or_else(|| Rc::new(Variable::fixed_false())))
        }
        Expr::Bool(truth) => Variable::fixed_bool(*truth),
        Expr::Num(n) => Variable::fixed(n.to_string(), Value::Num(*n)),
        Expr::Text(s) => Variable::fixed(s.clone(), Value::Text(s.clone())),
        Expr::Not(inner) => Variable::fixed_bool(!evaluate(inner, env, rng)?.is_true()),
        Expr::Expectation(inner) => evaluate(inner, env, rng)?.get_expectation(),
        Expr::Variance(inner) => evaluate(inner, env, rng)?.get_variance(),
        Expr::Binary { op, lhs, rhs } => {
            let lhs = evaluate(lhs, env, rng)?;
            let rhs = evaluate(rhs, env, rng)?;
            match op {
                BinaryOp::And => Variable::fixed_bool(lhs.is_true() && rhs.is_true()),
                BinaryOp::Or => Variable::fixed_bool(lhs.is_true() || rhs.is_true()),
                BinaryOp::Eq => lhs.equal(&rhs),
                BinaryOp::NotEq => lhs.not_equal(&rhs),
                BinaryOp::Less => lhs.less(&rhs),
                BinaryOp::LessEq => lhs.less_equal(&rhs),
                BinaryOp::Greater => lhs.greater(&rhs),
                BinaryOp::GreaterEq => lhs.greater_equal(&rhs),
                BinaryOp::Add => lhs.add(&rhs, rng)?,
                BinaryOp::Sub => lhs.sub(&rhs, rng)?,
                BinaryOp::Mul => lhs.mul(&rhs, rng)?,
                BinaryOp::Div => lhs.div(&rhs, rng)?,
                BinaryOp::Pow => lhs.pow(&rhs, rng)?,
            }
        }
    };
    Ok(Rc::new(result))
}

/// Evaluates `expr` and collapses it to its logical truth.
pub fn evaluate_truth(expr: &Expr, env: &Env, rng: &mut ChaCha8Rng) -> Result<bool, ModelError> {
    Ok(evaluate(expr, env, rng)?.is_true())
}

/// Evaluates `expr` to its raw expectation (numeric or text).
pub fn evaluate_value(expr: &Expr, env: &Env, rng: &mut ChaCha8Rng) -> Result<Value, ModelError> {
    Ok(evaluate(expr, env, rng)?.expectation.clone())
}

/// Evaluates `expr` to a number; qualitative results are a contract
/// violation here (hyperparameters and odds must be numeric).
pub fn evaluate_number(expr: &Expr, env: &Env, rng: &mut ChaCha8Rng) -> Result<f64, ModelError> {
    match evaluate_value(expr, env, rng)? {
        Value::Num(n) => Ok(n),
        other => Err(ModelError::NonNumericValue(other)),
    }
}
