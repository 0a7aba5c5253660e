mod circuit;
mod posterior;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::Circuit;

/// The reproducibility seed used across the test suite.
fn rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(0)
}

/// Parses `source` and builds its circuit.
fn build(source: &str) -> Circuit {
    let program = sppl_parser::parse(source).expect("source parses");
    Circuit::build(&program, &mut rng()).expect("circuit builds")
}

/// Enumeration posterior of `source`, formatted for output.
fn enumerate(source: &str) -> String {
    let circuit = build(source);
    crate::infer_by_enumeration(&circuit, &mut rng())
        .expect("enumeration succeeds")
        .to_string()
}
