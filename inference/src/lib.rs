//! Inference engine for SPPL programs.
//!
//! A parsed program is lowered into a [Circuit]: a DAG materializing every
//! branch the generative process can take, one node per probabilistic
//! choice, observation step or merge operator. Two interchangeable drivers
//! consume the circuit — exact enumeration over all leaf paths, and
//! rejection sampling by weighted random walks — and both report the
//! posterior probability that the program's `return` expression holds
//! given its observations.
//!
//! All randomness is drawn from an explicit, caller-seeded
//! [`rand_chacha::ChaCha8Rng`] so that results are reproducible.

pub mod circuit;
mod error;
pub mod eval;
pub mod infer;
pub mod variable;

#[cfg(test)]
mod tests;

pub use self::{
    circuit::{Circuit, Node, NodeId, NodeToken},
    error::ModelError,
    infer::{infer_by_enumeration, infer_by_rejection, Posterior, DEFAULT_SAMPLES},
};
