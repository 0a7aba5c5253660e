//! Recursive-descent parser for SPPL.
//!
//! The grammar is fully parenthesized at the expression level (compound
//! expressions are written `(e op e)` or `(op e e)`), so no precedence
//! climbing is needed; statements are dispatched on their leading token.

#[cfg(test)]
mod tests;

use crate::{
    ast::{BinaryOp, DiscreteKind, Expr, Family, IfArm, Program, Stmt},
    lexer::{Lexer, LexicalError, SpannedToken, Token},
};

/// Errors raised while parsing a program.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error(transparent)]
    Lexical(#[from] LexicalError),
    #[error("{line}:{column}: unexpected token `{found}`, expected {expected}")]
    UnexpectedToken {
        line: u32,
        column: u32,
        found: String,
        expected: String,
    },
    #[error("unexpected end of program, expected {expected}")]
    UnexpectedEof { expected: String },
    #[error("{line}:{column}: unknown distribution `{name}`")]
    UnknownDistribution {
        line: u32,
        column: u32,
        name: String,
    },
    #[error("{line}:{column}: expected parameter `{expected}`, found `{found}`")]
    WrongParameter {
        line: u32,
        column: u32,
        expected: String,
        found: String,
    },
}

/// Parser over a scanned token stream.
pub struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
}

impl Parser {
    pub fn new(source: &str) -> Result<Self, ParseError> {
        let tokens = Lexer::new(source).tokenize()?;
        Ok(Self { tokens, pos: 0 })
    }

    /// Parses `stmt ; ... ; return expr ;?` and requires the whole input to
    /// be consumed.
    pub fn parse_program(mut self) -> Result<Program, ParseError> {
        let mut body = Vec::new();
        while !self.check(&Token::Return) {
            body.push(self.parse_stmt()?);
            self.expect(Token::Semicolon, "`;`")?;
        }
        self.expect(Token::Return, "`return`")?;
        let output = self.parse_expr()?;
        self.eat(&Token::Semicolon);
        if let Some(t) = self.peek() {
            return Err(self.unexpected(t.clone(), "end of program"));
        }
        Ok(Program { body, output })
    }

    fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        match self.peek() {
            Some(SpannedToken {
                token: Token::Observe,
                ..
            }) => {
                self.bump();
                Ok(Stmt::Observe(self.parse_expr()?))
            }
            Some(SpannedToken {
                token: Token::Reject,
                ..
            }) => {
                self.bump();
                Ok(Stmt::Reject(self.parse_expr()?))
            }
            Some(SpannedToken {
                token: Token::Print,
                ..
            }) => {
                self.bump();
                self.expect(Token::LParen, "`(`")?;
                let expr = self.parse_expr()?;
                self.expect(Token::RParen, "`)`")?;
                Ok(Stmt::Print(expr))
            }
            Some(SpannedToken {
                token: Token::ShowCircuit,
                ..
            }) => {
                self.bump();
                self.expect(Token::LParen, "`(`")?;
                self.expect(Token::RParen, "`)`")?;
                Ok(Stmt::ShowCircuit)
            }
            Some(SpannedToken {
                token: Token::Marginalize,
                ..
            }) => {
                self.bump();
                self.expect(Token::LParen, "`(`")?;
                let mut exprs = vec![self.parse_expr()?];
                while self.eat(&Token::Comma) {
                    exprs.push(self.parse_expr()?);
                }
                self.expect(Token::RParen, "`)`")?;
                Ok(Stmt::Marginalize(exprs))
            }
            Some(SpannedToken {
                token: Token::EliminateVariable,
                ..
            }) => {
                self.bump();
                self.expect(Token::LParen, "`(`")?;
                let mut names = vec![self.expect_ident("a variable name")?];
                while self.eat(&Token::Comma) {
                    names.push(self.expect_ident("a variable name")?);
                }
                self.expect(Token::RParen, "`)`")?;
                Ok(Stmt::Eliminate(names))
            }
            Some(SpannedToken {
                token: Token::If, ..
            }) => self.parse_if(),
            Some(SpannedToken {
                token: Token::Ident(_),
                ..
            }) => self.parse_binding(),
            Some(t) => Err(self.unexpected(t.clone(), "a statement")),
            None => Err(ParseError::UnexpectedEof {
                expected: "a statement".into(),
            }),
        }
    }

    /// `if e { .. }` with any number of `elseif`/`else if` arms and an
    /// optional trailing `else { .. }`.
    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        self.expect(Token::If, "`if`")?;
        let mut arms = vec![IfArm {
            condition: self.parse_expr()?,
            body: self.parse_block()?,
        }];
        let mut otherwise = None;
        loop {
            if self.eat(&Token::ElseIf) {
                arms.push(IfArm {
                    condition: self.parse_expr()?,
                    body: self.parse_block()?,
                });
            } else if self.check(&Token::Else) {
                self.bump();
                if self.eat(&Token::If) {
                    arms.push(IfArm {
                        condition: self.parse_expr()?,
                        body: self.parse_block()?,
                    });
                } else {
                    otherwise = Some(self.parse_block()?);
                    break;
                }
            } else {
                break;
            }
        }
        Ok(Stmt::If { arms, otherwise })
    }

    /// `{ stmt ; stmt ;? }` — semicolons between statements, the last one
    /// optional.
    fn parse_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect(Token::LBrace, "`{`")?;
        let mut body = Vec::new();
        while !self.check(&Token::RBrace) {
            body.push(self.parse_stmt()?);
            if !self.eat(&Token::Semicolon) {
                break;
            }
            while self.eat(&Token::Semicolon) {}
        }
        self.expect(Token::RBrace, "`}`")?;
        Ok(body)
    }

    /// `name = e` or `name ~ <distribution>(...)`.
    fn parse_binding(&mut self) -> Result<Stmt, ParseError> {
        let name = self.expect_ident("a variable name")?;
        if self.eat(&Token::Equal) {
            let value = self.parse_expr()?;
            return Ok(Stmt::Assign { name, value });
        }
        self.expect(Token::Tilde, "`=` or `~`")?;
        let (dist_line, dist_column) = self.position();
        let dist = self.expect_ident("a distribution name")?;
        self.expect(Token::LParen, "`(`")?;
        let stmt = match dist.as_str() {
            "flip" => {
                let p = self.parse_signed_number()?;
                Stmt::Flip { name, p }
            }
            "bernoulli" => {
                let p = self.parse_expr()?;
                Stmt::Bernoulli { name, p }
            }
            "discrete_numeric" => {
                let arms = self.parse_discrete_arms()?;
                Stmt::Discrete {
                    name,
                    kind: DiscreteKind::Numeric,
                    arms,
                }
            }
            "discrete_qualitative" => {
                let arms = self.parse_discrete_arms()?;
                Stmt::Discrete {
                    name,
                    kind: DiscreteKind::Qualitative,
                    arms,
                }
            }
            "uniform" => self.parse_continuous(name, Family::Uniform, false)?,
            "normal" | "gaussian" => self.parse_continuous(name, Family::Normal, false)?,
            "beta" => self.parse_continuous(name, Family::Beta, false)?,
            "pareto" => self.parse_continuous(name, Family::Pareto, false)?,
            "uniform_num" => self.parse_continuous(name, Family::Uniform, true)?,
            "normal_num" | "gaussian_num" => self.parse_continuous(name, Family::Normal, true)?,
            "beta_num" => self.parse_continuous(name, Family::Beta, true)?,
            "pareto_num" => self.parse_continuous(name, Family::Pareto, true)?,
            _ => {
                return Err(ParseError::UnknownDistribution {
                    line: dist_line,
                    column: dist_column,
                    name: dist.clone(),
                })
            }
        };
        self.expect(Token::RParen, "`)`")?;
        Ok(stmt)
    }

    /// `v1 = w1, v2 = w2, ...`
    fn parse_discrete_arms(&mut self) -> Result<Vec<(Expr, Expr)>, ParseError> {
        let mut arms = Vec::new();
        loop {
            let value = self.parse_expr()?;
            self.expect(Token::Equal, "`=`")?;
            let odds = self.parse_expr()?;
            arms.push((value, odds));
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        Ok(arms)
    }

    /// The two named hyperparameters of `family`, then either the trailing
    /// split points (split form) or a final `n = <count>` (count form).
    fn parse_continuous(
        &mut self,
        name: String,
        family: Family,
        counted: bool,
    ) -> Result<Stmt, ParseError> {
        let mut params = Vec::with_capacity(2);
        for (i, canonical) in family.param_names().into_iter().enumerate() {
            if i > 0 {
                self.expect(Token::Comma, "`,`")?;
            }
            self.expect_param_name(canonical)?;
            self.expect(Token::Equal, "`=`")?;
            params.push(self.parse_expr()?);
        }
        if counted {
            self.expect(Token::Comma, "`,`")?;
            self.expect_param_name("n")?;
            self.expect(Token::Equal, "`=`")?;
            let count = self.parse_expr()?;
            Ok(Stmt::SampleN {
                name,
                family,
                params,
                count,
            })
        } else {
            let mut splits = Vec::new();
            while self.eat(&Token::Comma) {
                splits.push(self.parse_expr()?);
            }
            Ok(Stmt::Sample {
                name,
                family,
                params,
                splits,
            })
        }
    }

    /// Consumes a parameter name, accepting the Greek spellings as aliases
    /// for `mu`, `sigma`, `alpha` and `beta`.
    fn expect_param_name(&mut self, canonical: &str) -> Result<(), ParseError> {
        let (line, column) = self.position();
        let found = self.expect_ident("a parameter name")?;
        let matches = match canonical {
            "mu" => found == "mu" || found == "μ",
            "sigma" => found == "sigma" || found == "σ",
            "alpha" => found == "alpha" || found == "α",
            "beta" => found == "beta" || found == "β",
            other => found == other,
        };
        if matches {
            Ok(())
        } else {
            Err(ParseError::WrongParameter {
                line,
                column,
                expected: canonical.into(),
                found,
            })
        }
    }

    fn parse_signed_number(&mut self) -> Result<f64, ParseError> {
        let negative = self.eat(&Token::Minus);
        match self.bump() {
            Some(SpannedToken {
                token: Token::Num(n),
                ..
            }) => Ok(if negative { -n } else { n }),
            Some(t) => Err(self.unexpected(t, "a number")),
            None => Err(ParseError::UnexpectedEof {
                expected: "a number".into(),
            }),
        }
    }

    /// Parses a leaf or a parenthesized compound expression.
    pub fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        match self.peek().cloned() {
            Some(SpannedToken {
                token: Token::True, ..
            }) => {
                self.bump();
                Ok(Expr::Bool(true))
            }
            Some(SpannedToken {
                token: Token::False,
                ..
            }) => {
                self.bump();
                Ok(Expr::Bool(false))
            }
            Some(SpannedToken {
                token: Token::Num(n),
                ..
            }) => {
                self.bump();
                Ok(Expr::Num(n))
            }
            Some(SpannedToken {
                token: Token::Minus,
                ..
            }) => {
                self.bump();
                match self.bump() {
                    Some(SpannedToken {
                        token: Token::Num(n),
                        ..
                    }) => Ok(Expr::Num(-n)),
                    Some(t) => Err(self.unexpected(t, "a number after `-`")),
                    None => Err(ParseError::UnexpectedEof {
                        expected: "a number after `-`".into(),
                    }),
                }
            }
            Some(SpannedToken {
                token: Token::Text(s),
                ..
            }) => {
                self.bump();
                Ok(Expr::Text(s))
            }
            Some(SpannedToken {
                token: Token::Ident(name),
                ..
            }) => {
                self.bump();
                // `E(..)` and `Var(..)` are operators only when applied;
                // bare `E` stays an ordinary variable reference.
                if name == "E" && self.check(&Token::LParen) {
                    self.bump();
                    let inner = self.parse_expr()?;
                    self.expect(Token::RParen, "`)`")?;
                    Ok(Expr::Expectation(Box::new(inner)))
                } else if name == "Var" && self.check(&Token::LParen) {
                    self.bump();
                    let inner = self.parse_expr()?;
                    self.expect(Token::RParen, "`)`")?;
                    Ok(Expr::Variance(Box::new(inner)))
                } else {
                    Ok(Expr::Name(name))
                }
            }
            Some(SpannedToken {
                token: Token::LParen,
                ..
            }) => {
                self.bump();
                self.parse_paren_form()
            }
            Some(t) => Err(self.unexpected(t, "an expression")),
            None => Err(ParseError::UnexpectedEof {
                expected: "an expression".into(),
            }),
        }
    }

    /// The interior of a parenthesized form: `(! e)`, `(op e e)` prefix, or
    /// `(e op e)` infix. The opening paren is already consumed.
    fn parse_paren_form(&mut self) -> Result<Expr, ParseError> {
        if self.eat(&Token::Bang) {
            let inner = self.parse_expr()?;
            self.expect(Token::RParen, "`)`")?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        if let Some(op) = self.peek_operator() {
            // `(- 5 x)` is prefix subtraction, but `(-5 < x)` is an infix
            // comparison on a negative literal; disambiguate by whether an
            // operator follows the number.
            let prefix_minus_literal = self.check(&Token::Minus)
                && matches!(
                    self.peek_token_at(1),
                    Some(Token::Num(_)) if self.operator_at(2).is_some()
                );
            if !prefix_minus_literal {
                self.bump();
                let lhs = self.parse_expr()?;
                let rhs = self.parse_expr()?;
                self.expect(Token::RParen, "`)`")?;
                return Ok(Expr::binary(op, lhs, rhs));
            }
        }
        let lhs = self.parse_expr()?;
        let op = match self.peek_operator() {
            Some(op) => {
                self.bump();
                op
            }
            None => match self.peek() {
                Some(t) => return Err(self.unexpected(t.clone(), "a binary operator")),
                None => {
                    return Err(ParseError::UnexpectedEof {
                        expected: "a binary operator".into(),
                    })
                }
            },
        };
        let rhs = self.parse_expr()?;
        self.expect(Token::RParen, "`)`")?;
        Ok(Expr::binary(op, lhs, rhs))
    }

    fn peek_operator(&self) -> Option<BinaryOp> {
        self.operator_at(0)
    }

    fn operator_at(&self, offset: usize) -> Option<BinaryOp> {
        match self.peek_token_at(offset)? {
            Token::AmpAmp => Some(BinaryOp::And),
            Token::PipePipe => Some(BinaryOp::Or),
            Token::EqualEqual => Some(BinaryOp::Eq),
            Token::NotEqual => Some(BinaryOp::NotEq),
            Token::Less => Some(BinaryOp::Less),
            Token::LessEqual => Some(BinaryOp::LessEq),
            Token::Greater => Some(BinaryOp::Greater),
            Token::GreaterEqual => Some(BinaryOp::GreaterEq),
            Token::Plus => Some(BinaryOp::Add),
            Token::Minus => Some(BinaryOp::Sub),
            Token::Star => Some(BinaryOp::Mul),
            Token::Slash => Some(BinaryOp::Div),
            Token::Caret => Some(BinaryOp::Pow),
            _ => None,
        }
    }

    // Token-stream plumbing

    fn peek(&self) -> Option<&SpannedToken> {
        self.tokens.get(self.pos)
    }

    fn peek_token_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|t| &t.token)
    }

    fn position(&self) -> (u32, u32) {
        self.peek().map_or((0, 0), |t| (t.line, t.column))
    }

    fn bump(&mut self) -> Option<SpannedToken> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn check(&self, token: &Token) -> bool {
        self.peek().is_some_and(|t| t.token == *token)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token, expected: &str) -> Result<(), ParseError> {
        match self.bump() {
            Some(t) if t.token == token => Ok(()),
            Some(t) => Err(self.unexpected(t, expected)),
            None => Err(ParseError::UnexpectedEof {
                expected: expected.into(),
            }),
        }
    }

    fn expect_ident(&mut self, expected: &str) -> Result<String, ParseError> {
        match self.bump() {
            Some(SpannedToken {
                token: Token::Ident(name),
                ..
            }) => Ok(name),
            Some(t) => Err(self.unexpected(t, expected)),
            None => Err(ParseError::UnexpectedEof {
                expected: expected.into(),
            }),
        }
    }

    fn unexpected(&self, found: SpannedToken, expected: &str) -> ParseError {
        ParseError::UnexpectedToken {
            line: found.line,
            column: found.column,
            found: found.token.to_string(),
            expected: expected.into(),
        }
    }
}
