//! Discretisation of continuous distributions.
//!
//! A continuous draw is split into intervals, one [Variable] per interval,
//! holding that interval's cdf-mass as its probability and Simpson-rule
//! estimates of its conditional expectation and variance. Interval
//! endpoints come either from explicit split points (split form) or from an
//! equal partition of the family's outer bounds (count form).

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use statrs::distribution::{Beta, Continuous, ContinuousCDF, Normal, Pareto, Uniform};

use sppl_parser::ast::Family;

use super::{Class, Value, Variable};
use crate::ModelError;

/// Number of inner points sampled per variable.
pub const NUM_INNER_POINTS: usize = 50;

/// Simpson-rule subintervals per interval-moment computation.
const INTEGRAL_RESOLUTION: usize = 20;

/// A family instance exposing `pdf`/`cdf` for the integrator and the
/// inner-point sampler.
pub(crate) enum Density {
    Uniform(Uniform),
    Normal(Normal),
    Beta(Beta),
    Pareto(Pareto),
}

impl Density {
    fn for_class(class: &Class) -> Result<Self, ModelError> {
        match *class {
            Class::Uniform { a, b } => Ok(Self::Uniform(Uniform::new(a, b)?)),
            Class::Normal { mu, sigma } => Ok(Self::Normal(Normal::new(mu, sigma)?)),
            Class::Beta { alpha, beta } => Ok(Self::Beta(Beta::new(alpha, beta)?)),
            Class::Pareto { x_m, alpha } => Ok(Self::Pareto(Pareto::new(x_m, alpha)?)),
            _ => unreachable!("density requested for a non-continuous class"),
        }
    }

    fn pdf(&self, x: f64) -> f64 {
        match self {
            Self::Uniform(d) => d.pdf(x),
            Self::Normal(d) => d.pdf(x),
            Self::Beta(d) => d.pdf(x),
            Self::Pareto(d) => d.pdf(x),
        }
    }

    fn cdf(&self, x: f64) -> f64 {
        match self {
            Self::Uniform(d) => d.cdf(x),
            Self::Normal(d) => d.cdf(x),
            Self::Beta(d) => d.cdf(x),
            Self::Pareto(d) => d.cdf(x),
        }
    }
}

/// Discretises `family` at explicit split points. `params` are the two
/// family hyperparameters in declaration order; `splits` partition the
/// support together with the family-specific outer bounds.
pub fn discretize(
    name: &str,
    family: Family,
    params: (f64, f64),
    splits: &[f64],
) -> Result<Vec<Variable>, ModelError> {
    let mut splits = splits.to_vec();
    splits.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let points = match family {
        Family::Uniform => {
            let (a, b) = params;
            if a > b {
                return Err(ModelError::InvertedUniformBounds { a, b });
            }
            enforce_within(&splits, a, b)?;
            edged(splits, a, b)
        }
        Family::Normal => {
            let (mu, sigma) = params;
            let five_sigma = 5.0 * sigma;
            if splits.is_empty() {
                vec![mu - five_sigma, mu + five_sigma]
            } else {
                let furthest_left = splits[0];
                let furthest_right = splits[splits.len() - 1];
                // The ends extend five sigma past the outermost splits, or
                // past the peak when it falls outside the split range.
                if furthest_left < mu && mu < furthest_right {
                    edged(splits, furthest_left - five_sigma, furthest_right + five_sigma)
                } else if mu < furthest_left - five_sigma {
                    edged(splits, mu - five_sigma, furthest_right + five_sigma)
                } else {
                    edged(splits, furthest_left - five_sigma, mu + five_sigma)
                }
            }
        }
        Family::Beta => {
            enforce_within(&splits, 0.0, 1.0)?;
            edged(splits, 0.0, 1.0)
        }
        Family::Pareto => {
            let (x_m, alpha) = params;
            if x_m <= 0.0 || alpha <= 0.0 {
                return Err(ModelError::NonPositivePareto { x_m, alpha });
            }
            enforce_within(&splits, x_m, f64::INFINITY)?;
            // The end point sits where the cdf reaches 0.999999, shifted
            // past the outermost split when splits are present.
            let reach = x_m / 1e-6_f64.powf(1.0 / alpha);
            let end = match splits.last() {
                Some(last) => last + reach,
                None => reach,
            };
            edged(splits, x_m, end)
        }
    };
    intervals(name, family, params, &points)
}

/// Discretises `family` into `count` equal intervals over its outer bounds.
pub fn discretize_n(
    name: &str,
    family: Family,
    params: (f64, f64),
    count: f64,
) -> Result<Vec<Variable>, ModelError> {
    let blocks = count.trunc();
    if blocks <= 0.0 {
        return Err(ModelError::NonPositiveCount(count));
    }
    let num_points = blocks as usize + 1;
    let points = match family {
        Family::Uniform => {
            let (a, b) = params;
            if a > b {
                return Err(ModelError::InvertedUniformBounds { a, b });
            }
            linspace(a, b, num_points)
        }
        Family::Normal => {
            let (mu, sigma) = params;
            linspace(mu - 5.0 * sigma, mu + 5.0 * sigma, num_points)
        }
        Family::Beta => linspace(0.0, 1.0, num_points),
        Family::Pareto => {
            let (x_m, alpha) = params;
            if x_m <= 0.0 || alpha <= 0.0 {
                return Err(ModelError::NonPositivePareto { x_m, alpha });
            }
            linspace(x_m, x_m / 1e-6_f64.powf(1.0 / alpha), num_points)
        }
    };
    intervals(name, family, params, &points)
}

fn class_for(family: Family, params: (f64, f64)) -> Class {
    match family {
        Family::Uniform => Class::Uniform {
            a: params.0,
            b: params.1,
        },
        Family::Normal => Class::Normal {
            mu: params.0,
            sigma: params.1,
        },
        Family::Beta => Class::Beta {
            alpha: params.0,
            beta: params.1,
        },
        Family::Pareto => Class::Pareto {
            x_m: params.0,
            alpha: params.1,
        },
    }
}

/// One variable per adjacent pair of partition points.
fn intervals(
    name: &str,
    family: Family,
    params: (f64, f64),
    points: &[f64],
) -> Result<Vec<Variable>, ModelError> {
    let class = class_for(family, params);
    let density = Density::for_class(&class)?;
    let mut variables = Vec::with_capacity(points.len().saturating_sub(1));
    for pair in points.windows(2) {
        let (l, u) = (pair[0], pair[1]);
        let (probability, expectation, variance) = interval_moments(&density, l, u);
        variables.push(Variable::new(
            name,
            class.clone(),
            Value::Num(expectation),
            variance,
            Value::Num(l),
            Value::Num(u),
            probability,
        )?);
    }
    Ok(variables)
}

/// Probability mass, conditional expectation and conditional variance of
/// the interval `[l, u]`, by Simpson's 1/3 rule on 21 equispaced points.
fn interval_moments(density: &Density, l: f64, u: f64) -> (f64, f64, f64) {
    let probability = density.cdf(u) - density.cdf(l);
    let points = linspace(l, u, INTEGRAL_RESOLUTION + 1);

    let mut e = 0.0;
    let mut var = 0.0;
    for pair in points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let m = 0.5 * (a + b);
        let weight = (b - a) / 6.0;
        e += weight * (a * density.pdf(a) + 4.0 * m * density.pdf(m) + b * density.pdf(b));
        var += weight
            * (a * a * density.pdf(a) + 4.0 * m * m * density.pdf(m) + b * b * density.pdf(b));
    }
    var -= e * e;

    (probability, e / probability, var / (probability * probability))
}

/// Inner points for a continuous-interval variable.
pub(crate) fn interval_inner_points(
    class: &Class,
    l: f64,
    u: f64,
    rng: &mut ChaCha8Rng,
) -> Result<Vec<f64>, ModelError> {
    match *class {
        Class::Uniform { a, b } => {
            if !(within(l, a, b) || within(u, a, b)) {
                Ok(uniform_points(l, u, rng))
            } else {
                let (rl, ru) = overlapped_range((l, u), (a, b));
                Ok(uniform_points(rl, ru, rng))
            }
        }
        Class::Normal { .. } => {
            let density = Density::for_class(class)?;
            Ok(rejection_points(&density, l, u, rng))
        }
        Class::Beta { .. } => {
            if !(within(l, 0.0, 1.0) || within(u, 0.0, 1.0)) {
                Ok(uniform_points(l, u, rng))
            } else {
                let density = Density::for_class(class)?;
                Ok(rejection_points(&density, l, u, rng))
            }
        }
        Class::Pareto { x_m, .. } => {
            if u < x_m {
                Ok(uniform_points(l, u, rng))
            } else {
                let density = Density::for_class(class)?;
                Ok(rejection_points(&density, l, u, rng))
            }
        }
        _ => unreachable!("interval inner points requested for a non-continuous class"),
    }
}

/// Rejection sampling under the pdf within `[l, u]`; the envelope height is
/// the largest finite pdf value on a coarse grid.
fn rejection_points(density: &Density, l: f64, u: f64, rng: &mut ChaCha8Rng) -> Vec<f64> {
    let mut envelope: f64 = 0.0;
    for x in linspace(l, u, NUM_INNER_POINTS) {
        let y = density.pdf(x);
        if y.is_finite() {
            envelope = envelope.max(y);
        }
    }

    let mut points = Vec::with_capacity(NUM_INNER_POINTS);
    while points.len() < NUM_INNER_POINTS {
        let xn = rng.gen_range(l..=u);
        let yn = rng.gen_range(0.0..=envelope);
        if yn <= density.pdf(xn) {
            points.push(xn);
        }
    }
    points
}

fn uniform_points(l: f64, u: f64, rng: &mut ChaCha8Rng) -> Vec<f64> {
    (0..NUM_INNER_POINTS).map(|_| rng.gen_range(l..=u)).collect()
}

/// `linspace(a, b, n)`: `n` equispaced points from `a` to `b` inclusive.
fn linspace(a: f64, b: f64, n: usize) -> Vec<f64> {
    if n < 2 {
        return vec![a];
    }
    let step = (b - a) / (n - 1) as f64;
    let mut points: Vec<f64> = (0..n).map(|i| a + step * i as f64).collect();
    points[n - 1] = b;
    points
}

fn within(x: f64, l: f64, u: f64) -> bool {
    l <= x && x <= u
}

fn enforce_within(splits: &[f64], lower: f64, upper: f64) -> Result<(), ModelError> {
    for &value in splits {
        if !within(value, lower, upper) {
            return Err(ModelError::SplitOutOfRange {
                value,
                lower,
                upper,
            });
        }
    }
    Ok(())
}

/// Prepends and appends the outer bounds to the split points.
fn edged(mut splits: Vec<f64>, lower: f64, upper: f64) -> Vec<f64> {
    splits.insert(0, lower);
    splits.push(upper);
    splits
}

/// The overlap of the searched range `r1` with the distribution range `r2`
/// (an overlap is assumed).
fn overlapped_range(r1: (f64, f64), r2: (f64, f64)) -> (f64, f64) {
    let (a1, b1) = r1;
    let (a2, b2) = r2;
    if a1 < a2 {
        if b1 < b2 {
            (a2, b1)
        } else {
            (a2, b2)
        }
    } else if b1 < b2 {
        (a1, b1)
    } else {
        (a1, b2)
    }
}
