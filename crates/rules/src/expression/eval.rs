//! Evaluation of a compiled condition against one observation.

use stormwatch_core::{Field, FieldLookup};

use super::error::EvalError;
use super::parser::{ChangeOp, Expr, FieldRef, Literal};
use crate::state::RuleStateView;

fn current<L: FieldLookup + ?Sized>(field: &FieldRef, lookup: &L) -> Result<(Field, f64), EvalError> {
    match field {
        FieldRef::Known(f) => lookup
            .value(*f)
            .map(|v| (*f, v))
            .ok_or(EvalError::MissingValue(*f)),
        FieldRef::Unknown(name) => Err(EvalError::UnknownField(name.clone())),
    }
}

/// `&&` and `||` short-circuit; a term that is never reached cannot fail.
pub(super) fn eval<L, S>(expr: &Expr, lookup: &L, state: &S) -> Result<bool, EvalError>
where
    L: FieldLookup + ?Sized,
    S: RuleStateView + ?Sized,
{
    match expr {
        Expr::And(lhs, rhs) => Ok(eval(lhs, lookup, state)? && eval(rhs, lookup, state)?),
        Expr::Or(lhs, rhs) => Ok(eval(lhs, lookup, state)? || eval(rhs, lookup, state)?),
        Expr::Compare { field, op, literal } => {
            let (_, value) = current(field, lookup)?;
            match literal {
                Literal::Value(threshold) => Ok(op.apply(value, *threshold)),
                Literal::Invalid { text, reason } => Err(EvalError::InvalidLiteral {
                    literal: text.clone(),
                    reason: reason.clone(),
                }),
            }
        }
        Expr::Change { op, field } => {
            let (field, value) = current(field, lookup)?;
            let Some(previous) = state.previous(field) else {
                tracing::trace!(%field, value, "no previous value, establishing baseline");
                return Ok(false);
            };
            Ok(match op {
                ChangeOp::Any => value != previous,
                ChangeOp::Increase => value > previous,
                ChangeOp::Decrease => value < previous,
            })
        }
    }
}
