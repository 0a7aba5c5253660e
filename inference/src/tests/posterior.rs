use approx::assert_relative_eq;

use super::{build, enumerate, rng};
use crate::{infer_by_enumeration, infer_by_rejection, DEFAULT_SAMPLES};

#[test]
fn single_flip() {
    assert_eq!(enumerate("a ~ flip(0.3); return a;"), "0.3000");
}

#[test]
fn disjunction_observation() {
    assert_eq!(
        enumerate("a ~ flip(0.5); b ~ flip(0.5); observe (a || b); return a;"),
        "0.6667"
    );
}

#[test]
fn branch_assignment() {
    assert_eq!(
        enumerate("a ~ flip(0.5); if a { b = true } else { b = false }; return b;"),
        "0.5000"
    );
}

#[test]
fn rejecting_the_returned_variable() {
    // Every surviving path has `a` false, so the numerator is zero while
    // the paths themselves keep 0.8 of the mass
    assert_eq!(enumerate("a ~ flip(0.2); reject a; return a;"), "0.0000");
}

#[test]
fn three_way_disjunction_with_conjunction_output() {
    assert_eq!(
        enumerate(
            "a ~ flip(0.5); b ~ flip(0.5); c ~ flip(0.5); \
             observe ((a || b) || c); return (a && b);"
        ),
        "0.2857"
    );
}

#[test]
fn discrete_equality_output() {
    assert_eq!(
        enumerate("a ~ discrete_numeric(1=0.2, 2=0.3, 3=0.5); return (a == 2);"),
        "0.3000"
    );
}

#[test]
fn observe_true_is_a_noop() {
    assert_eq!(enumerate("a ~ flip(0.3); observe true; return a;"), "0.3000");
}

#[test]
fn reject_false_is_a_noop() {
    assert_eq!(enumerate("a ~ flip(0.3); reject false; return a;"), "0.3000");
}

#[test]
fn observe_false_makes_the_posterior_undefined() {
    assert_eq!(enumerate("a ~ flip(0.3); observe false; return a;"), "0");
}

#[test]
fn denominator_is_one_without_observations() {
    let circuit = build("a ~ flip(0.3); b ~ discrete_numeric(1=1, 2=1); return a;");
    let posterior = infer_by_enumeration(&circuit, &mut rng()).expect("enumeration succeeds");
    assert_relative_eq!(posterior.denominator, 1.0, epsilon = 1e-9);
}

#[test]
fn single_valued_discrete_is_deterministic() {
    assert_eq!(
        enumerate("a ~ discrete_numeric(5=1); return (a == 5);"),
        "1.0000"
    );
    assert_eq!(
        enumerate("a ~ discrete_numeric(5=1); return (a == 4);"),
        "0.0000"
    );
}

#[test]
fn qualitative_observation() {
    assert_eq!(
        enumerate(
            "pet ~ discrete_qualitative(\"cat\"=1, \"dog\"=1, \"fish\"=2); \
             observe (! (pet == \"fish\")); return (pet == \"cat\");"
        ),
        "0.5000"
    );
}

#[test]
fn bernoulli_with_computed_probability() {
    assert_eq!(enumerate("p = 0.2; a ~ bernoulli(p); return a;"), "0.2000");
}

#[test]
fn arithmetic_in_the_output() {
    assert_eq!(
        enumerate("a = 2; b = 3; return ((a + b) == 5);"),
        "1.0000"
    );
    assert_eq!(
        enumerate("a = 2; b = 3; return ((a * b) == 7);"),
        "0.0000"
    );
}

#[test]
fn expectation_operator_in_conditions() {
    // Each uniform fragment carries its conditional expectation
    assert_eq!(
        enumerate("u ~ uniform(a=0, b=1, 0.25); return (E(u) < 0.5);"),
        "0.2500"
    );
}

#[test]
fn discretised_normal_splits_mass_at_the_peak() {
    assert_eq!(
        enumerate("x ~ normal(mu=0, sigma=1, 0); return (x < 3);"),
        "0.5000"
    );
}

#[test]
fn rejection_converges_to_enumeration() {
    let programs = [
        "a ~ flip(0.3); return a;",
        "a ~ flip(0.5); b ~ flip(0.5); observe (a || b); return a;",
        "a ~ flip(0.5); if a { b = true } else { b = false }; return b;",
        "a ~ flip(0.5); b ~ flip(0.5); c ~ flip(0.5); observe ((a || b) || c); return (a && b);",
        "a ~ discrete_numeric(1=0.2, 2=0.3, 3=0.5); return (a == 2);",
    ];
    for source in programs {
        let circuit = build(source);
        let exact = infer_by_enumeration(&circuit, &mut rng())
            .expect("enumeration succeeds")
            .value()
            .expect("posterior is defined");
        let sampled = infer_by_rejection(&circuit, DEFAULT_SAMPLES, &mut rng())
            .expect("sampling succeeds")
            .value()
            .expect("posterior is defined");
        assert!(
            (exact - sampled).abs() < 0.05,
            "{source}: exact {exact} vs sampled {sampled}"
        );
    }
}

#[test]
fn rejection_discards_deadend_walks() {
    let circuit = build("a ~ flip(0.5); observe a; return a;");
    let posterior =
        infer_by_rejection(&circuit, DEFAULT_SAMPLES, &mut rng()).expect("sampling succeeds");
    // Roughly half of the walks end at the deadend
    assert!(posterior.denominator < 0.65 * DEFAULT_SAMPLES as f64);
    assert!(posterior.denominator > 0.35 * DEFAULT_SAMPLES as f64);
    assert_relative_eq!(
        posterior.value().expect("posterior is defined"),
        1.0
    );
}

#[test]
fn rejection_of_everything_is_undefined() {
    let circuit = build("a ~ flip(0.3); observe false; return a;");
    let posterior =
        infer_by_rejection(&circuit, DEFAULT_SAMPLES, &mut rng()).expect("sampling succeeds");
    assert_eq!(posterior.to_string(), "0");
}
