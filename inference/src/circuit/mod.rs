//! The execution circuit: a DAG with one node per probabilistic choice,
//! observation step or merge operator a program can take.
//!
//! The circuit is stored as an arena: a vector of nodes referencing each
//! other by index. Construction is purely feed-forward from the statement
//! list, so cycles cannot arise, and the whole structure is freed in one
//! step when the circuit is dropped.

mod builder;

use std::{fmt, fmt::Write, rc::Rc};

use rand_chacha::ChaCha8Rng;

use sppl_parser::ast::{Expr, Program};

use crate::{
    eval::{self, Env},
    variable::Variable,
    ModelError,
};

/// A unique identifier for a node in a [Circuit].
///
/// The raw value is an index into the `nodes` vector of the [Circuit]
/// struct.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct NodeId(usize);

impl From<usize> for NodeId {
    fn from(u: usize) -> Self {
        Self(u)
    }
}

impl From<NodeId> for usize {
    fn from(val: NodeId) -> usize {
        val.0
    }
}

/// The token a node carries: a program variable name, or one of the
/// reserved circuit markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeToken {
    /// The single always-true root of the circuit
    Ground,
    /// A draw or assignment binding this name
    Variable(String),
    /// A satisfied `observe` step
    Observation,
    /// A satisfied `reject` step
    Rejection,
    /// A marginalization merge point
    Marg,
    /// A variable-elimination merge point
    Elim,
    /// A failed observation; excluded from the live frontier
    Deadend,
}

impl fmt::Display for NodeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ground => write!(f, "GROUND"),
            Self::Variable(name) => write!(f, "{name}"),
            Self::Observation => write!(f, "OBSERVATION"),
            Self::Rejection => write!(f, "REJECTION"),
            Self::Marg => write!(f, "MARG"),
            Self::Elim => write!(f, "ELIM"),
            Self::Deadend => write!(f, "DEADEND"),
        }
    }
}

/// A node in the circuit DAG.
#[derive(Debug)]
pub struct Node {
    pub token: NodeToken,
    /// Parent nodes; empty only for the ground node. Compressed nodes have
    /// one parent per merged frontier node.
    pub parents: Vec<NodeId>,
    /// Child nodes, appended as descendants are linked in.
    pub children: Vec<NodeId>,
    /// The variable bound at this node (a fixed TRUE for non-variable
    /// nodes).
    pub variable: Rc<Variable>,
    /// The node's local probability: the variable's mass for draw nodes, 1
    /// for observation and deadend nodes, the pre-summed incoming chain
    /// probability for compressed nodes.
    pub probability: f64,
    /// The observed or rejected predicate, for observation-step nodes.
    pub predicate: Option<Expr>,
    /// The precomputed environment carried by compressed (MARG/ELIM)
    /// nodes.
    pub compressed_env: Option<Env>,
}

impl Node {
    pub fn is_compressed(&self) -> bool {
        self.compressed_env.is_some()
    }

    pub fn is_deadend(&self) -> bool {
        matches!(self.token, NodeToken::Deadend)
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// The materialized execution circuit of a program.
pub struct Circuit {
    nodes: Vec<Node>,
    /// The `return` expression the posterior is computed over.
    output: Expr,
    /// The final frontier: every live leaf, in construction order.
    bottom: Vec<NodeId>,
}

impl Circuit {
    /// Builds the circuit for `program`, materializing every branch the
    /// program can take.
    pub fn build(program: &Program, rng: &mut ChaCha8Rng) -> Result<Self, ModelError> {
        builder::build(program, rng)
    }

    /// The ground node at the top of the circuit.
    pub fn ground(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// The cached final frontier (deadends excluded).
    pub fn bottom_nodes(&self) -> &[NodeId] {
        &self.bottom
    }

    pub fn output(&self) -> &Expr {
        &self.output
    }

    /// Appends a node, linking it as a child of each of its parents.
    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        for &parent in &node.parents {
            self.nodes[parent.0].children.push(id);
        }
        self.nodes.push(node);
        id
    }

    /// The product of local probabilities from `id` up to the ground,
    /// always following the first-linked parent. Compressed nodes carry a
    /// pre-summed probability, so the walk stops there.
    pub fn chain_probability(&self, id: NodeId) -> f64 {
        let mut probability = 1.0;
        let mut current = id;
        loop {
            let node = &self.nodes[current.0];
            probability *= node.probability;
            if node.is_compressed() {
                return probability;
            }
            match node.parents.first() {
                Some(&parent) => current = parent,
                None => return probability,
            }
        }
    }

    /// The environment visible at `id`: walking toward the ground along
    /// the first-linked parent, each name binds on first sight (the
    /// leaf-most binding wins), observation-step tokens are skipped, and a
    /// compressed node supplies its whole stored environment wholesale.
    pub fn chain_environment(&self, id: NodeId) -> Env {
        let mut env = Env::new();
        let mut current = id;
        loop {
            let node = &self.nodes[current.0];
            if let NodeToken::Variable(name) = &node.token {
                if !env.contains_key(name) {
                    env.insert(name.clone(), node.variable.clone());
                }
            }
            if let Some(compressed) = &node.compressed_env {
                for (name, variable) in compressed {
                    env.insert(name.clone(), variable.clone());
                }
            }
            match node.parents.first() {
                Some(&parent) => current = parent,
                None => return env,
            }
        }
    }

    /// Chain probability plus whether the chain satisfies the `return`
    /// expression.
    pub fn evaluate_chain(
        &self,
        id: NodeId,
        rng: &mut ChaCha8Rng,
    ) -> Result<(f64, bool), ModelError> {
        let probability = self.chain_probability(id);
        let env = self.chain_environment(id);
        let meets_output = eval::evaluate_truth(&self.output, &env, rng)?;
        Ok((probability, meets_output))
    }

    /// Serialization to Graphviz Dot format for debugging purposes.
    /// Display on <https://dreampuf.github.io/GraphvizOnline> or using
    /// `dot -Tsvg circuit.dot > circuit.svg`.
    pub fn to_dot(&self) -> Result<String, fmt::Error> {
        let mut f = String::new();
        writeln!(f, "digraph circuit {{")?;
        for (i, node) in self.nodes.iter().enumerate() {
            writeln!(
                f,
                "n{i} [label=\"{}\\nPr = {:.4}\"]",
                node.token, node.probability
            )?;
        }
        for (i, node) in self.nodes.iter().enumerate() {
            for child in &node.children {
                writeln!(f, "n{i} -> n{}", usize::from(*child))?;
            }
        }
        writeln!(f, "}}")?;
        Ok(f)
    }
}
