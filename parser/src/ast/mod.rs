//! This module provides the AST structures produced by the parser.
//!
//! A program is a flat list of [Stmt]s followed by a single `return`
//! expression. Statements and expressions are plain sum types; the parser
//! resolves all surface-level aliases (`gaussian` vs `normal`, Greek vs
//! ASCII parameter names, `elseif` vs `else if`) before constructing them,
//! so downstream consumers never see spelling variants.

use std::fmt;

/// A complete SPPL program: the statement body plus the `return` expression
/// the posterior is computed over.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub body: Vec<Stmt>,
    pub output: Expr,
}

/// A single statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `x = e`
    Assign { name: String, value: Expr },
    /// `x ~ flip(p)` with a literal probability
    Flip { name: String, p: f64 },
    /// `x ~ bernoulli(e)` with a per-path probability expression
    Bernoulli { name: String, p: Expr },
    /// `x ~ discrete_numeric(v = w, ...)` / `x ~ discrete_qualitative(...)`
    Discrete {
        name: String,
        kind: DiscreteKind,
        arms: Vec<(Expr, Expr)>,
    },
    /// `x ~ uniform(a=.., b=.., s1, s2, ...)` and the other continuous
    /// families, discretised at the listed split points
    Sample {
        name: String,
        family: Family,
        params: Vec<Expr>,
        splits: Vec<Expr>,
    },
    /// `x ~ uniform_num(a=.., b=.., n=..)`: discretised into `n` equal
    /// intervals over the family's outer bounds
    SampleN {
        name: String,
        family: Family,
        params: Vec<Expr>,
        count: Expr,
    },
    /// `observe e`: keep only the paths where `e` holds
    Observe(Expr),
    /// `reject e`: keep only the paths where `e` does not hold
    Reject(Expr),
    /// `if e { .. } elseif e { .. } else { .. }`; `otherwise` is `None`
    /// when no final `else` block is present
    If {
        arms: Vec<IfArm>,
        otherwise: Option<Vec<Stmt>>,
    },
    /// `marginalize(e1, ..., ek)`
    Marginalize(Vec<Expr>),
    /// `eliminate_variable(x1, ..., xk)`
    Eliminate(Vec<String>),
    /// `print(e)`: diagnostic, evaluated per live path
    Print(Expr),
    /// `show_circuit()`: diagnostic rendering of the DAG built so far
    ShowCircuit,
}

/// One `if`/`elseif` branch: a condition and the guarded statements.
#[derive(Debug, Clone, PartialEq)]
pub struct IfArm {
    pub condition: Expr,
    pub body: Vec<Stmt>,
}

/// Discrete distributions carry either numeric or qualitative (string)
/// support values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscreteKind {
    Numeric,
    Qualitative,
}

/// The continuous distribution families that can be discretised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Uniform,
    Normal,
    Beta,
    Pareto,
}

impl Family {
    /// Canonical parameter names, in declaration order.
    pub fn param_names(&self) -> [&'static str; 2] {
        match self {
            Self::Uniform => ["a", "b"],
            Self::Normal => ["mu", "sigma"],
            Self::Beta => ["alpha", "beta"],
            Self::Pareto => ["x_m", "alpha"],
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uniform => write!(f, "uniform"),
            Self::Normal => write!(f, "normal"),
            Self::Beta => write!(f, "beta"),
            Self::Pareto => write!(f, "pareto"),
        }
    }
}

/// An expression.
///
/// All compound forms are fully parenthesized in the surface syntax, so the
/// tree carries no precedence information.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A variable reference
    Name(String),
    /// A numeric literal
    Num(f64),
    /// A double-quoted string literal
    Text(String),
    /// `true` / `false`
    Bool(bool),
    /// `(! e)`
    Not(Box<Expr>),
    /// `(e op e)` or `(op e e)`
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `E(e)`
    Expectation(Box<Expr>),
    /// `Var(e)`
    Variance(Box<Expr>),
}

impl Expr {
    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Self::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }
}

/// Binary operators over expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    And,
    Or,
    Eq,
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::And => "&&",
            Self::Or => "||",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Less => "<",
            Self::LessEq => "<=",
            Self::Greater => ">",
            Self::GreaterEq => ">=",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Pow => "^",
        };
        write!(f, "{s}")
    }
}
