//! Circuit construction: a single pass over the statement list that
//! maintains the frontier of live parent nodes.
//!
//! Each statement transforms the frontier: draws fork it (one child per
//! distribution fragment), observation steps filter it (failed paths get a
//! deadend child and drop out), branches route each node independently, and
//! the merge operators group and compress it.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use log::debug;
use rand_chacha::ChaCha8Rng;

use sppl_parser::ast::{Expr, Program, Stmt};

use super::{Circuit, Node, NodeId, NodeToken};
use crate::{
    eval,
    variable::{self, checked_probability, Variable},
    ModelError,
};

pub(super) fn build(program: &Program, rng: &mut ChaCha8Rng) -> Result<Circuit, ModelError> {
    let mut circuit = Circuit {
        nodes: Vec::new(),
        output: program.output.clone(),
        bottom: Vec::new(),
    };
    circuit.push(Node {
        token: NodeToken::Ground,
        parents: Vec::new(),
        children: Vec::new(),
        variable: Rc::new(Variable::fixed_true()),
        probability: 1.0,
        predicate: None,
        compressed_env: None,
    });
    let ground = circuit.ground();
    let bottom = build_block(&mut circuit, vec![ground], &program.body, rng)?;
    debug!(
        "circuit built: {} nodes, {} leaves",
        circuit.num_nodes(),
        bottom.len()
    );
    circuit.bottom = bottom;
    Ok(circuit)
}

fn build_block(
    circuit: &mut Circuit,
    mut frontier: Vec<NodeId>,
    stmts: &[Stmt],
    rng: &mut ChaCha8Rng,
) -> Result<Vec<NodeId>, ModelError> {
    for stmt in stmts {
        frontier = apply_stmt(circuit, frontier, stmt, rng)?;
    }
    Ok(frontier)
}

fn apply_stmt(
    circuit: &mut Circuit,
    frontier: Vec<NodeId>,
    stmt: &Stmt,
    rng: &mut ChaCha8Rng,
) -> Result<Vec<NodeId>, ModelError> {
    match stmt {
        Stmt::Observe(predicate) => {
            let mut next = Vec::new();
            for parent in frontier {
                let env = circuit.chain_environment(parent);
                if eval::evaluate_truth(predicate, &env, rng)? {
                    next.push(step_node(
                        circuit,
                        NodeToken::Observation,
                        parent,
                        predicate.clone(),
                    ));
                } else {
                    // Linked into the DAG so that sampling walks can still
                    // end here, but never part of the frontier.
                    deadend_node(circuit, parent);
                }
            }
            Ok(next)
        }
        Stmt::Reject(predicate) => {
            let mut next = Vec::new();
            for parent in frontier {
                let env = circuit.chain_environment(parent);
                if !eval::evaluate_truth(predicate, &env, rng)? {
                    next.push(step_node(
                        circuit,
                        NodeToken::Rejection,
                        parent,
                        predicate.clone(),
                    ));
                } else {
                    deadend_node(circuit, parent);
                }
            }
            Ok(next)
        }
        Stmt::Assign { name, value } => {
            let mut next = Vec::new();
            for parent in frontier {
                let env = circuit.chain_environment(parent);
                let variable = eval::evaluate(value, &env, rng)?;
                // Assignment never multiplies into the chain: the bound
                // variable may carry the mass of the fragment it was
                // derived from, but this path's probability is unchanged.
                next.push(variable_node(circuit, name, parent, variable, 1.0)?);
            }
            Ok(next)
        }
        Stmt::Flip { name, p } => {
            let [v0, v1] = variable::bernoulli(name, *p)?;
            let (v0, v1) = (Rc::new(v0), Rc::new(v1));
            let mut next = Vec::new();
            for parent in frontier {
                let p0 = v0.probability;
                let p1 = v1.probability;
                next.push(variable_node(circuit, name, parent, v0.clone(), p0)?);
                next.push(variable_node(circuit, name, parent, v1.clone(), p1)?);
            }
            Ok(next)
        }
        Stmt::Bernoulli { name, p } => {
            let mut next = Vec::new();
            for parent in frontier {
                let env = circuit.chain_environment(parent);
                let p = eval::evaluate_number(p, &env, rng)?;
                let pair = variable::bernoulli(name, p)?;
                for variable in pair {
                    let mass = variable.probability;
                    next.push(variable_node(circuit, name, parent, Rc::new(variable), mass)?);
                }
            }
            Ok(next)
        }
        Stmt::Discrete { name, kind, arms } => {
            let mut next = Vec::new();
            for parent in frontier {
                let env = circuit.chain_environment(parent);
                let mut values = Vec::with_capacity(arms.len());
                let mut odds = Vec::with_capacity(arms.len());
                for (value, weight) in arms {
                    values.push(eval::evaluate_value(value, &env, rng)?);
                    odds.push(eval::evaluate_number(weight, &env, rng)?);
                }
                for variable in variable::discrete(*kind, name, values, odds)? {
                    let mass = variable.probability;
                    next.push(variable_node(circuit, name, parent, Rc::new(variable), mass)?);
                }
            }
            Ok(next)
        }
        Stmt::Sample {
            name,
            family,
            params,
            splits,
        } => {
            let mut next = Vec::new();
            for parent in frontier {
                let env = circuit.chain_environment(parent);
                let params = (
                    eval::evaluate_number(&params[0], &env, rng)?,
                    eval::evaluate_number(&params[1], &env, rng)?,
                );
                let mut split_values = Vec::with_capacity(splits.len());
                for split in splits {
                    split_values.push(eval::evaluate_number(split, &env, rng)?);
                }
                for variable in variable::discretize(name, *family, params, &split_values)? {
                    let mass = variable.probability;
                    next.push(variable_node(circuit, name, parent, Rc::new(variable), mass)?);
                }
            }
            Ok(next)
        }
        Stmt::SampleN {
            name,
            family,
            params,
            count,
        } => {
            let mut next = Vec::new();
            for parent in frontier {
                let env = circuit.chain_environment(parent);
                let params = (
                    eval::evaluate_number(&params[0], &env, rng)?,
                    eval::evaluate_number(&params[1], &env, rng)?,
                );
                let count = eval::evaluate_number(count, &env, rng)?;
                for variable in variable::discretize_n(name, *family, params, count)? {
                    let mass = variable.probability;
                    next.push(variable_node(circuit, name, parent, Rc::new(variable), mass)?);
                }
            }
            Ok(next)
        }
        Stmt::If { arms, otherwise } => {
            let mut next = Vec::new();
            for parent in frontier {
                let env = circuit.chain_environment(parent);
                let mut taken = false;
                for arm in arms {
                    if eval::evaluate_truth(&arm.condition, &env, rng)? {
                        next.extend(build_block(circuit, vec![parent], &arm.body, rng)?);
                        taken = true;
                        break;
                    }
                }
                if !taken {
                    match otherwise {
                        Some(body) => next.extend(build_block(circuit, vec![parent], body, rng)?),
                        // No branch matched: the path continues unchanged.
                        None => next.push(parent),
                    }
                }
            }
            Ok(next)
        }
        Stmt::Marginalize(exprs) => {
            let mut groups: Vec<(String, Vec<NodeId>)> = Vec::new();
            let mut index: HashMap<String, usize> = HashMap::new();
            for parent in frontier {
                let env = circuit.chain_environment(parent);
                let mut parts = Vec::with_capacity(exprs.len());
                for expr in exprs {
                    parts.push(eval::evaluate_value(expr, &env, rng)?.to_string());
                }
                let key = parts.join(", ");
                match index.get(&key) {
                    Some(&at) => groups[at].1.push(parent),
                    None => {
                        index.insert(key.clone(), groups.len());
                        groups.push((key, vec![parent]));
                    }
                }
            }
            let mut next = Vec::with_capacity(groups.len());
            for (_, members) in groups {
                next.push(compressed_node(
                    circuit,
                    NodeToken::Marg,
                    members,
                    &HashSet::new(),
                )?);
            }
            Ok(next)
        }
        Stmt::Eliminate(names) => {
            let excluded: HashSet<String> = names.iter().cloned().collect();
            let mut groups: Vec<(String, Vec<NodeId>)> = Vec::new();
            let mut index: HashMap<String, usize> = HashMap::new();
            for parent in frontier {
                let env = circuit.chain_environment(parent);
                let mut parts: Vec<String> = env
                    .iter()
                    .filter(|(name, _)| !excluded.contains(*name))
                    .map(|(_, variable)| variable.to_string())
                    .collect();
                parts.sort();
                let key = parts.join("; ");
                match index.get(&key) {
                    Some(&at) => groups[at].1.push(parent),
                    None => {
                        index.insert(key.clone(), groups.len());
                        groups.push((key, vec![parent]));
                    }
                }
            }
            let mut next = Vec::with_capacity(groups.len());
            for (_, members) in groups {
                next.push(compressed_node(circuit, NodeToken::Elim, members, &excluded)?);
            }
            Ok(next)
        }
        Stmt::Print(expr) => {
            for (counter, &parent) in frontier.iter().enumerate() {
                println!("-> Leaf node {counter}:");
                let env = circuit.chain_environment(parent);
                let variable = eval::evaluate(expr, &env, rng)?;
                println!("    {variable}\n");
            }
            Ok(frontier)
        }
        Stmt::ShowCircuit => {
            if let Ok(dot) = circuit.to_dot() {
                println!("{dot}");
            }
            Ok(frontier)
        }
    }
}

/// A draw or assignment node binding `name` under `parent`.
fn variable_node(
    circuit: &mut Circuit,
    name: &str,
    parent: NodeId,
    variable: Rc<Variable>,
    probability: f64,
) -> Result<NodeId, ModelError> {
    let probability = checked_probability(probability)?;
    Ok(circuit.push(Node {
        token: NodeToken::Variable(name.into()),
        parents: vec![parent],
        children: Vec::new(),
        variable,
        probability,
        predicate: None,
        compressed_env: None,
    }))
}

/// A satisfied observation or rejection step.
fn step_node(circuit: &mut Circuit, token: NodeToken, parent: NodeId, predicate: Expr) -> NodeId {
    circuit.push(Node {
        token,
        parents: vec![parent],
        children: Vec::new(),
        variable: Rc::new(Variable::fixed_true()),
        probability: 1.0,
        predicate: Some(predicate),
        compressed_env: None,
    })
}

/// A deadend marking a failed observation under `parent`.
fn deadend_node(circuit: &mut Circuit, parent: NodeId) -> NodeId {
    circuit.push(Node {
        token: NodeToken::Deadend,
        parents: vec![parent],
        children: Vec::new(),
        variable: Rc::new(Variable::fixed_true()),
        probability: 1.0,
        predicate: None,
        compressed_env: None,
    })
}

/// A MARG/ELIM merge point: its probability is the pre-summed chain
/// probability of the merged members, and its environment is the first
/// member's chain environment minus the excluded names.
fn compressed_node(
    circuit: &mut Circuit,
    token: NodeToken,
    members: Vec<NodeId>,
    excluded: &HashSet<String>,
) -> Result<NodeId, ModelError> {
    let combined: f64 = members
        .iter()
        .map(|&member| circuit.chain_probability(member))
        .sum();
    let probability = checked_probability(combined)?;
    let mut env = circuit.chain_environment(members[0]);
    env.retain(|name, _| !excluded.contains(name));
    Ok(circuit.push(Node {
        token,
        parents: members,
        children: Vec::new(),
        variable: Rc::new(Variable::fixed_true()),
        probability,
        predicate: None,
        compressed_env: Some(env),
    }))
}
