//! The two inference drivers over a built circuit.
//!
//! Enumeration sums chain probabilities over every live leaf; rejection
//! performs weighted random walks from the ground and discards walks that
//! terminate at a deadend. Both report the same [Posterior] and agree up
//! to sampling error.

use std::fmt;

use log::debug;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::{
    circuit::{Circuit, NodeId},
    ModelError,
};

/// Default number of rejection-sampling walks.
pub const DEFAULT_SAMPLES: usize = 5000;

/// The posterior quantity `Pr[return is TRUE | observations hold]`,
/// kept as a fraction so that the undefined case (no path satisfies the
/// observations) stays representable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Posterior {
    pub numerator: f64,
    pub denominator: f64,
}

impl Posterior {
    /// The posterior as a number, or `None` when it is undefined.
    pub fn value(&self) -> Option<f64> {
        if self.numerator == 0.0 && self.denominator == 0.0 {
            None
        } else {
            Some(self.numerator / self.denominator)
        }
    }
}

impl fmt::Display for Posterior {
    /// Four decimals, or the literal `0` when the posterior is undefined.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value() {
            Some(p) => write!(f, "{p:.4}"),
            None => write!(f, "0"),
        }
    }
}

/// Exact inference: aggregates the chain probability of every live leaf,
/// splitting it by whether the leaf satisfies the `return` expression.
pub fn infer_by_enumeration(
    circuit: &Circuit,
    rng: &mut ChaCha8Rng,
) -> Result<Posterior, ModelError> {
    let mut meets_output_and_observes = 0.0;
    let mut meets_observes = 0.0;

    // Every leaf on the final frontier met all observations; the failed
    // paths ended in deadends and are not here.
    for &leaf in circuit.bottom_nodes() {
        let (probability, meets_output) = circuit.evaluate_chain(leaf, rng)?;
        meets_observes += probability;
        if meets_output {
            meets_output_and_observes += probability;
        }
    }

    Ok(Posterior {
        numerator: meets_output_and_observes,
        denominator: meets_observes,
    })
}

/// Approximate inference by direct ancestral sampling: random walks from
/// the ground, rejecting those that end at a deadend.
pub fn infer_by_rejection(
    circuit: &Circuit,
    num_samples: usize,
    rng: &mut ChaCha8Rng,
) -> Result<Posterior, ModelError> {
    let mut valid_output_observes = 0u64;
    let mut valid_observes = 0u64;

    for _ in 0..num_samples {
        if let Some(meets_output) = single_direct_search(circuit, rng)? {
            valid_observes += 1;
            if meets_output {
                valid_output_observes += 1;
            }
        }
    }
    debug!("rejection sampling: {valid_observes}/{num_samples} walks met the observations");

    Ok(Posterior {
        numerator: valid_output_observes as f64,
        denominator: valid_observes as f64,
    })
}

/// One walk from the ground to a leaf. Returns `None` when the walk ends
/// at a deadend (the observations were not met), otherwise whether the
/// reached leaf satisfies the `return` expression.
fn single_direct_search(
    circuit: &Circuit,
    rng: &mut ChaCha8Rng,
) -> Result<Option<bool>, ModelError> {
    let mut current = circuit.ground();
    loop {
        let node = circuit.node(current);
        current = match node.children.as_slice() {
            [] => break,
            // A single child is an observation step or a merge point
            [only] => *only,
            children => {
                let weighted: Vec<(NodeId, f64)> = children
                    .iter()
                    .map(|&child| (child, circuit.node(child).probability))
                    .collect();
                select_random_by_weight(&weighted, rng)
            }
        };
    }

    let node = circuit.node(current);
    if node.is_deadend() {
        return Ok(None);
    }
    let (_probability, meets_output) = circuit.evaluate_chain(current, rng)?;
    Ok(Some(meets_output))
}

/// Selects an item with probability proportional to its weight, by a
/// uniform draw over the cumulative weights. Zero-weight items are
/// skipped; if every weight is zero the first item is returned.
fn select_random_by_weight(weighted: &[(NodeId, f64)], rng: &mut ChaCha8Rng) -> NodeId {
    let mut positions = vec![0.0];
    let mut candidates = Vec::with_capacity(weighted.len());
    for &(item, weight) in weighted {
        if weight != 0.0 {
            candidates.push(item);
            positions.push(positions[positions.len() - 1] + weight);
        }
    }
    if candidates.is_empty() {
        return weighted[0].0;
    }

    let total = positions[positions.len() - 1];
    let location = rng.gen_range(0.0..=total);
    let selected = positions.partition_point(|&w| w < location).saturating_sub(1);
    candidates[selected.min(candidates.len() - 1)]
}
