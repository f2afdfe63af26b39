//! Structured (JSON) interchange form of expressions and path conditions.
//!
//! The tree layout is the serde form of [`Expr`]: every node carries a
//! `kind` tag (`literal`, `variable`, `operator`, `uninterpreted_call`).

use serde_json::Value;
use thiserror::Error;

use crate::terms::{Expr, StructuralError};

#[derive(Debug, Error)]
pub enum InterchangeError {
    #[error("malformed interchange document: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Structural(#[from] StructuralError),
}

/// Serialize a validated expression tree.
pub fn to_interchange(expr: &Expr) -> Result<Value, InterchangeError> {
    expr.validate()?;
    Ok(serde_json::to_value(expr)?)
}

/// Parse and validate an expression tree.
pub fn from_interchange(value: Value) -> Result<Expr, InterchangeError> {
    let expr: Expr = serde_json::from_value(value)?;
    expr.validate()?;
    Ok(expr)
}

/// Interchange document of a path condition; an absent one is the literal `true`.
pub fn path_condition_document(pc: Option<&Expr>) -> Result<Value, InterchangeError> {
    match pc {
        Some(expr) => to_interchange(expr),
        None => to_interchange(&Expr::bool(true)),
    }
}

/// Pretty-printed path condition document, as written to `JSON-PC` artifacts.
pub fn path_condition_json(pc: Option<&Expr>) -> Result<String, InterchangeError> {
    Ok(serde_json::to_string_pretty(&path_condition_document(pc)?)?)
}
