use approx::assert_relative_eq;
use pretty_assertions::assert_eq;

use super::{build, enumerate};
use crate::{infer_by_enumeration, Circuit, NodeToken};

#[test]
fn flip_chain_leaf_counts() {
    let circuit = build("a ~ flip(0.5); b ~ flip(0.5); c ~ flip(0.5); return a;");
    // ground + 2 + 4 + 8 nodes, 8 live leaves
    assert_eq!(circuit.num_nodes(), 15);
    assert_eq!(circuit.bottom_nodes().len(), 8);
}

#[test]
fn sibling_masses_sum_to_one_at_every_fork() {
    let circuit = build("a ~ flip(0.3); b ~ discrete_numeric(1=1, 2=2, 3=3); return a;");
    for id in (0..circuit.num_nodes()).map(Into::into) {
        let node = circuit.node(id);
        if node.children.len() > 1 {
            let total: f64 = node
                .children
                .iter()
                .map(|&child| circuit.node(child).probability)
                .sum();
            assert_relative_eq!(total, 1.0, epsilon = 1e-9);
        }
    }
}

#[test]
fn rebuilding_is_idempotent() {
    let source = "a ~ flip(0.3); b ~ flip(0.6); observe (a || b); return a;";
    let first = build(source);
    let second = build(source);
    assert_eq!(first.num_nodes(), second.num_nodes());
    assert_eq!(first.bottom_nodes().len(), second.bottom_nodes().len());
    let probabilities = |circuit: &Circuit| {
        let mut all: Vec<f64> = circuit
            .bottom_nodes()
            .iter()
            .map(|&leaf| circuit.chain_probability(leaf))
            .collect();
        all.sort_by(|a, b| a.total_cmp(b));
        all
    };
    assert_eq!(probabilities(&first), probabilities(&second));
}

#[test]
fn chain_environment_binds_leafmost_values() {
    let circuit = build("a = 1; a = 2; return a;");
    let leaf = circuit.bottom_nodes()[0];
    let env = circuit.chain_environment(leaf);
    assert_eq!(
        env["a"].expectation,
        crate::variable::Value::Num(2.0)
    );
}

#[test]
fn observation_failures_become_deadends() {
    let circuit = build("a ~ flip(0.5); observe a; return a;");
    assert_eq!(circuit.bottom_nodes().len(), 1);
    let deadends = (0..circuit.num_nodes())
        .map(Into::into)
        .filter(|&id| circuit.node(id).is_deadend())
        .count();
    assert_eq!(deadends, 1);
    // The deadend hangs off the failed branch but stays out of the frontier
    for &leaf in circuit.bottom_nodes() {
        assert!(!circuit.node(leaf).is_deadend());
    }
}

#[test]
fn observation_steps_carry_probability_one() {
    let circuit = build("a ~ flip(0.5); observe a; return a;");
    for id in (0..circuit.num_nodes()).map(Into::into) {
        let node = circuit.node(id);
        if matches!(
            node.token,
            NodeToken::Observation | NodeToken::Rejection | NodeToken::Deadend
        ) {
            assert_eq!(node.probability, 1.0);
        }
    }
}

#[test]
fn assignment_does_not_multiply_into_the_chain() {
    // `c` is bound to the drawn fragment of `a`, whose own mass is 0.3 or
    // 0.7, but the assignment node itself contributes probability 1
    assert_eq!(enumerate("a ~ flip(0.3); c = a; return c;"), "0.3000");
}

#[test]
fn if_branches_are_routed_per_path() {
    let circuit = build("a ~ flip(0.5); if a { b = true } else { b = false }; return b;");
    assert_eq!(circuit.bottom_nodes().len(), 2);
    for &leaf in circuit.bottom_nodes() {
        let env = circuit.chain_environment(leaf);
        assert_eq!(env["a"].is_true(), env["b"].is_true());
    }
}

#[test]
fn unmatched_if_without_else_passes_through() {
    let circuit = build("a ~ flip(0.5); if a { b = true }; return b;");
    // The false branch keeps its draw node on the frontier
    assert_eq!(circuit.bottom_nodes().len(), 2);
    let tokens: Vec<_> = circuit
        .bottom_nodes()
        .iter()
        .map(|&leaf| circuit.node(leaf).token.clone())
        .collect();
    assert!(tokens.contains(&NodeToken::Variable("b".into())));
    assert!(tokens.contains(&NodeToken::Variable("a".into())));
}

#[test]
fn elseif_takes_the_first_matching_branch() {
    let source = "d ~ discrete_numeric(1=1, 2=1, 3=2); \
                  if (d == 1) { r = 10 } elseif (d == 2) { r = 20 } else { r = 30 }; \
                  return (r == 30);";
    assert_eq!(enumerate(source), "0.5000");
}

#[test]
fn marginalize_merges_matching_paths() {
    let source = "a ~ flip(0.3); b ~ flip(0.5); marginalize(a); return a;";
    let circuit = build(source);
    // Four paths collapse into two MARG nodes, keyed by the value of `a`
    assert_eq!(circuit.bottom_nodes().len(), 2);
    for &leaf in circuit.bottom_nodes() {
        assert!(matches!(circuit.node(leaf).token, NodeToken::Marg));
        assert!(circuit.node(leaf).is_compressed());
        assert_eq!(circuit.node(leaf).parents.len(), 2);
    }
    let mut masses: Vec<f64> = circuit
        .bottom_nodes()
        .iter()
        .map(|&leaf| circuit.chain_probability(leaf))
        .collect();
    masses.sort_by(|a, b| a.total_cmp(b));
    assert_relative_eq!(masses[0], 0.3, epsilon = 1e-9);
    assert_relative_eq!(masses[1], 0.7, epsilon = 1e-9);
}

#[test]
fn marginalizing_the_returned_variable_preserves_the_posterior() {
    let plain = enumerate("a ~ flip(0.3); b ~ flip(0.5); return a;");
    let merged = enumerate("a ~ flip(0.3); b ~ flip(0.5); marginalize(a); return a;");
    assert_eq!(plain, merged);
}

#[test]
fn eliminate_variable_drops_names_from_the_stored_environment() {
    let source = "a ~ flip(0.3); b ~ flip(0.5); eliminate_variable(b); return a;";
    let circuit = build(source);
    assert_eq!(circuit.bottom_nodes().len(), 2);
    for &leaf in circuit.bottom_nodes() {
        let node = circuit.node(leaf);
        assert!(matches!(node.token, NodeToken::Elim));
        let stored = node.compressed_env.as_ref().unwrap();
        assert!(stored.contains_key("a"));
        assert!(!stored.contains_key("b"));
    }
    assert_eq!(enumerate(source), "0.3000");
}

#[test]
fn flip_boundaries_yield_degenerate_posteriors() {
    assert_eq!(enumerate("a ~ flip(0); return a;"), "0.0000");
    assert_eq!(enumerate("a ~ flip(1); return a;"), "1.0000");
}

#[test]
fn enumeration_is_independent_of_the_seed() {
    use rand::SeedableRng;
    let program = sppl_parser::parse("a ~ flip(0.5); b ~ flip(0.5); observe (a || b); return a;")
        .expect("source parses");
    let mut outputs = Vec::new();
    for seed in [0u64, 1, 42] {
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(seed);
        let circuit = Circuit::build(&program, &mut rng).expect("circuit builds");
        let posterior = infer_by_enumeration(&circuit, &mut rng).expect("enumeration succeeds");
        outputs.push(posterior.to_string());
    }
    assert!(outputs.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn dot_rendering_lists_every_node() {
    let circuit = build("a ~ flip(0.5); observe a; return a;");
    let dot = circuit.to_dot().expect("rendering succeeds");
    assert!(dot.starts_with("digraph circuit {"));
    assert!(dot.contains("GROUND"));
    assert!(dot.contains("OBSERVATION"));
    assert!(dot.contains("DEADEND"));
    assert_eq!(dot.matches(" -> ").count(), circuit.num_nodes() - 1);
}

#[test]
fn ground_is_the_only_parentless_node() {
    let circuit = build("a ~ flip(0.5); b ~ flip(0.5); marginalize(a); return a;");
    for id in (0..circuit.num_nodes()).map(Into::into) {
        let node = circuit.node(id);
        if id == circuit.ground() {
            assert!(node.parents.is_empty());
            assert!(matches!(node.token, NodeToken::Ground));
        } else {
            assert!(!node.parents.is_empty());
        }
    }
}
