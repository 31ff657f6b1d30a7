//! Alarm condition expressions.
//!
//! ```text
//! expr    := term ( ("&&" | "||") term )*
//! term    := "(" expr ")" | change | compare
//! change  := ("*" | ">" | "<") field
//! compare := field (">" | "<" | ">=" | "<=" | "==" | "!=") number [unit]
//! ```
//!
//! Field names are resolved once at parse time. Unit suffixes (`F`, `C`,
//! `mph`, `m/s`, `ms`) convert literals to the field's native unit.
//! Change terms compare the current value with the rule's previous value
//! and are false until a previous value exists.

mod error;
mod eval;
mod lexer;
mod parser;


use std::fmt;
use std::str::FromStr;

use stormwatch_core::{Field, FieldLookup};

pub use self::error::{EvalError, ParseError};
pub use self::lexer::CmpOp;
pub use self::parser::{ChangeOp, Expr, FieldRef, Literal};

use crate::state::RuleStateView;

/// Problems found in a condition that still compiled.
///
/// Reported as validation warnings; the condition fails at evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    UnknownField(String),
    InvalidLiteral { literal: String, reason: String },
}

/// A parsed, field-resolved condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    source: String,
    expr: Expr,
    fields: Vec<Field>,
}

impl Condition {
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        let expr = parser::parse(source)?;
        let mut fields = Vec::new();
        expr.for_each_term(&mut |term| {
            let field = match term {
                Expr::Compare { field, .. } | Expr::Change { field, .. } => field,
                _ => return,
            };
            if let FieldRef::Known(f) = field {
                if !fields.contains(f) {
                    fields.push(*f);
                }
            }
        });
        Ok(Self {
            source: source.trim().to_string(),
            expr,
            fields,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Evaluate against `lookup`, using `state` for change terms.
    ///
    /// Never mutates state.
    pub fn evaluate<L, S>(&self, lookup: &L, state: &S) -> Result<bool, EvalError>
    where
        L: FieldLookup + ?Sized,
        S: RuleStateView + ?Sized,
    {
        eval::eval(&self.expr, lookup, state)
    }

    /// Resolved fields mentioned anywhere in the condition, in order of
    /// first appearance.
    pub fn referenced_fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn uses_change_detection(&self) -> bool {
        let mut found = false;
        self.expr.for_each_term(&mut |term| {
            found |= matches!(term, Expr::Change { .. });
        });
        found
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        self.expr.for_each_term(&mut |term| {
            let field = match term {
                Expr::Compare { field, literal, .. } => {
                    if let Literal::Invalid { text, reason } = literal {
                        out.push(Diagnostic::InvalidLiteral {
                            literal: text.clone(),
                            reason: reason.clone(),
                        });
                    }
                    field
                }
                Expr::Change { field, .. } => field,
                _ => return,
            };
            if let FieldRef::Unknown(name) = field {
                out.push(Diagnostic::UnknownField(name.clone()));
            }
        });
        out
    }
}

impl FromStr for Condition {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Condition::parse(s)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Parse and evaluate `condition` in one step.
pub fn evaluate<L, S>(condition: &str, lookup: &L, state: &S) -> Result<bool, EvalError>
where
    L: FieldLookup + ?Sized,
    S: RuleStateView + ?Sized,
{
    Condition::parse(condition)?.evaluate(lookup, state)
}
