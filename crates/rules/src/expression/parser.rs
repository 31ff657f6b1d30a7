//! Recursive-descent parser producing the condition AST.
//!
//! `&&` and `||` share one precedence level and associate to the left, so
//! `a || b && c` is `(a || b) && c`. Parentheses group explicitly.

use stormwatch_core::{Field, Unit};

use super::error::ParseError;
use super::lexer::{tokenize, CmpOp, Token, TokenKind};

/// A field as written in the condition.
///
/// Unknown names are kept so the rule still loads; evaluating them fails.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldRef {
    Known(Field),
    Unknown(String),
}

impl FieldRef {
    fn resolve(name: &str) -> Self {
        Field::resolve(name)
            .map(FieldRef::Known)
            .unwrap_or_else(|| FieldRef::Unknown(name.to_string()))
    }
}

/// Right-hand side of a comparison, already converted to native units.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Value(f64),
    Invalid { text: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOp {
    /// `*field`
    Any,
    /// `>field`
    Increase,
    /// `<field`
    Decrease,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Compare {
        field: FieldRef,
        op: CmpOp,
        literal: Literal,
    },
    Change {
        op: ChangeOp,
        field: FieldRef,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Visit every comparison and change term, left to right.
    pub fn for_each_term<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        match self {
            Expr::And(lhs, rhs) | Expr::Or(lhs, rhs) => {
                lhs.for_each_term(f);
                rhs.for_each_term(f);
            }
            term => f(term),
        }
    }
}

pub fn parse(input: &str) -> Result<Expr, ParseError> {
    if input.trim().is_empty() {
        return Err(ParseError::Empty);
    }
    let mut parser = Parser {
        tokens: tokenize(input)?,
        idx: 0,
    };
    let expr = parser.expr()?;
    match parser.peek() {
        None => Ok(expr),
        Some(Token {
            kind: TokenKind::RParen,
            ..
        }) => Err(ParseError::Unbalanced),
        Some(token) => Err(unexpected(token, "'&&' or '||'")),
    }
}

fn unexpected(token: &Token, expected: &'static str) -> ParseError {
    ParseError::UnexpectedToken {
        found: token.kind.to_string(),
        expected,
        pos: token.pos,
    }
}

struct Parser {
    tokens: Vec<Token>,
    idx: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.idx)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.idx).cloned();
        if token.is_some() {
            self.idx += 1;
        }
        token
    }

    fn expr(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.term()?;
        loop {
            let combine: fn(Box<Expr>, Box<Expr>) -> Expr = match self.peek().map(|t| &t.kind) {
                Some(TokenKind::And) => Expr::And,
                Some(TokenKind::Or) => Expr::Or,
                _ => return Ok(lhs),
            };
            self.idx += 1;
            let rhs = self.term()?;
            lhs = combine(Box::new(lhs), Box::new(rhs));
        }
    }

    fn term(&mut self) -> Result<Expr, ParseError> {
        let token = self.next().ok_or(ParseError::UnexpectedEnd {
            expected: "a condition",
        })?;
        match token.kind {
            TokenKind::LParen => {
                let inner = self.expr()?;
                match self.next() {
                    Some(Token {
                        kind: TokenKind::RParen,
                        ..
                    }) => Ok(inner),
                    Some(other) => Err(unexpected(&other, "')'")),
                    None => Err(ParseError::Unbalanced),
                }
            }
            TokenKind::Star => self.change(ChangeOp::Any),
            TokenKind::Cmp(CmpOp::Gt) => self.change(ChangeOp::Increase),
            TokenKind::Cmp(CmpOp::Lt) => self.change(ChangeOp::Decrease),
            TokenKind::Word(_) => {
                self.idx -= 1;
                self.compare()
            }
            _ => Err(unexpected(&token, "a field name or '('")),
        }
    }

    fn change(&mut self, op: ChangeOp) -> Result<Expr, ParseError> {
        let name = self.words("a field name")?;
        Ok(Expr::Change {
            op,
            field: FieldRef::resolve(&name),
        })
    }

    fn compare(&mut self) -> Result<Expr, ParseError> {
        let name = self.words("a field name")?;
        let field = FieldRef::resolve(&name);
        let op = match self.next() {
            Some(Token {
                kind: TokenKind::Cmp(op),
                ..
            }) => op,
            Some(other) => return Err(unexpected(&other, "a comparison operator")),
            None => {
                return Err(ParseError::UnexpectedEnd {
                    expected: "a comparison operator",
                })
            }
        };
        let text = self.words("a value")?;
        let literal = parse_literal(&text, &field);
        Ok(Expr::Compare { field, op, literal })
    }

    /// Consume consecutive words, joined by single spaces.
    fn words(&mut self, expected: &'static str) -> Result<String, ParseError> {
        let mut parts = Vec::new();
        while let Some(Token {
            kind: TokenKind::Word(w),
            ..
        }) = self.peek()
        {
            parts.push(w.clone());
            self.idx += 1;
        }
        if parts.is_empty() {
            return Err(match self.peek() {
                Some(token) => unexpected(token, expected),
                None => ParseError::UnexpectedEnd { expected },
            });
        }
        Ok(parts.join(" "))
    }
}

/// Split `text` into the longest numeric prefix and a unit suffix, then
/// convert to the field's native unit.
pub fn parse_literal(text: &str, field: &FieldRef) -> Literal {
    let text = text.trim();
    let invalid = |reason: String| Literal::Invalid {
        text: text.to_string(),
        reason,
    };

    let split = (1..=text.len())
        .rev()
        .filter(|&i| text.is_char_boundary(i))
        .find_map(|i| text[..i].trim_end().parse::<f64>().ok().map(|n| (n, i)));

    let Some((number, idx)) = split else {
        return invalid("not a number".to_string());
    };
    if !number.is_finite() {
        return invalid("not a finite number".to_string());
    }

    let suffix = text[idx..].trim();
    if suffix.is_empty() {
        return Literal::Value(number);
    }
    let Some(unit) = Unit::parse(suffix) else {
        return invalid(format!("unknown unit '{suffix}'"));
    };
    match field {
        FieldRef::Known(f) if f.unit_family() == unit.family() => {
            Literal::Value(unit.to_native(number))
        }
        FieldRef::Known(f) => invalid(format!("unit '{suffix}' does not apply to {f}")),
        FieldRef::Unknown(_) => Literal::Value(unit.to_native(number)),
    }
}
