use pretty_assertions::assert_eq;

use super::{parse, parse_err};
use crate::ast::{DiscreteKind, Expr, Family, Stmt};
use crate::parser::ParseError;

#[test]
fn bernoulli_takes_an_expression() {
    let program = parse("p = 0.4; a ~ bernoulli(p); return a;");
    assert_eq!(
        program.body[1],
        Stmt::Bernoulli {
            name: "a".into(),
            p: Expr::Name("p".into())
        }
    );
}

#[test]
fn discrete_numeric() {
    let program = parse("a ~ discrete_numeric(1=0.2, 2=0.3, 3=0.5); return (a == 2);");
    assert_eq!(
        program.body[0],
        Stmt::Discrete {
            name: "a".into(),
            kind: DiscreteKind::Numeric,
            arms: vec![
                (Expr::Num(1.0), Expr::Num(0.2)),
                (Expr::Num(2.0), Expr::Num(0.3)),
                (Expr::Num(3.0), Expr::Num(0.5)),
            ],
        }
    );
}

#[test]
fn discrete_qualitative() {
    let program = parse("pet ~ discrete_qualitative(\"cat\"=1, \"dog\"=3); return (pet == \"cat\");");
    assert_eq!(
        program.body[0],
        Stmt::Discrete {
            name: "pet".into(),
            kind: DiscreteKind::Qualitative,
            arms: vec![
                (Expr::Text("cat".into()), Expr::Num(1.0)),
                (Expr::Text("dog".into()), Expr::Num(3.0)),
            ],
        }
    );
}

#[test]
fn uniform_with_split_points() {
    let program = parse("u ~ uniform(a=0, b=1, 0.25, 0.75); return u;");
    assert_eq!(
        program.body[0],
        Stmt::Sample {
            name: "u".into(),
            family: Family::Uniform,
            params: vec![Expr::Num(0.0), Expr::Num(1.0)],
            splits: vec![Expr::Num(0.25), Expr::Num(0.75)],
        }
    );
}

#[test]
fn gaussian_is_an_alias_for_normal() {
    let normal = parse("x ~ normal(mu=0, sigma=1); return x;");
    let gaussian = parse("x ~ gaussian(mu=0, sigma=1); return x;");
    assert_eq!(normal, gaussian);
}

#[test]
fn greek_parameters_accepted() {
    let ascii = parse("x ~ beta(alpha=2, beta=5); return x;");
    let greek = parse("x ~ beta(α=2, β=5); return x;");
    assert_eq!(ascii, greek);
}

#[test]
fn pareto_parameters() {
    let program = parse("w ~ pareto(x_m=1, alpha=2.5, 3, 10); return w;");
    assert_eq!(
        program.body[0],
        Stmt::Sample {
            name: "w".into(),
            family: Family::Pareto,
            params: vec![Expr::Num(1.0), Expr::Num(2.5)],
            splits: vec![Expr::Num(3.0), Expr::Num(10.0)],
        }
    );
}

#[test]
fn count_form_distributions() {
    let program = parse("x ~ normal_num(mu=5, sigma=2, n=10); return x;");
    assert_eq!(
        program.body[0],
        Stmt::SampleN {
            name: "x".into(),
            family: Family::Normal,
            params: vec![Expr::Num(5.0), Expr::Num(2.0)],
            count: Expr::Num(10.0),
        }
    );
}

#[test]
fn negative_flip_parameter_parses() {
    // Range validation happens at circuit-construction time, not here
    let program = parse("a ~ flip(-0.5); return a;");
    assert_eq!(
        program.body[0],
        Stmt::Flip {
            name: "a".into(),
            p: -0.5
        }
    );
}

#[test]
fn err_unknown_distribution() {
    let err = parse_err("a ~ binomial(3, 0.5); return a;");
    assert!(matches!(err, ParseError::UnknownDistribution { .. }));
}

#[test]
fn err_wrong_parameter_name() {
    let err = parse_err("x ~ uniform(lo=0, hi=1); return x;");
    assert!(matches!(err, ParseError::WrongParameter { .. }));
}
