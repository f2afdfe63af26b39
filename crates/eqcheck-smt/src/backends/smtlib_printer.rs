use crate::sorts::SmtSort;
use crate::terms::{uif_symbol, Expr, Opcode};

/// Print an expression as SMT-LIB2 prefix notation.
///
/// The tree is assumed valid (see [`Expr::validate`]).
pub fn to_smtlib(expr: &Expr) -> String {
    match expr {
        Expr::Literal { value, sort } => literal_to_smtlib(value, *sort),
        Expr::Variable { name, .. } => name.clone(),
        Expr::Operator { op, operands } => match (op, operands.len()) {
            (Opcode::And, 0) => "true".to_string(),
            (Opcode::Or, 0) => "false".to_string(),
            (Opcode::And | Opcode::Or, 1) => to_smtlib(&operands[0]),
            _ => application(op.symbol(), operands),
        },
        Expr::UninterpretedCall {
            function, operands, ..
        } => {
            let symbol = uif_symbol(function);
            if operands.is_empty() {
                symbol
            } else {
                application(&symbol, operands)
            }
        }
    }
}

/// Print an optional path condition; an absent one is trivially true.
pub fn path_condition_to_smtlib(pc: Option<&Expr>) -> String {
    pc.map(to_smtlib).unwrap_or_else(|| "true".to_string())
}

/// Print a sort as SMT-LIB2 format.
pub fn sort_to_smtlib(sort: SmtSort) -> &'static str {
    sort.smtlib_name()
}

fn application(symbol: &str, operands: &[Expr]) -> String {
    let inner: Vec<String> = operands.iter().map(to_smtlib).collect();
    format!("({symbol} {})", inner.join(" "))
}

fn literal_to_smtlib(value: &str, sort: SmtSort) -> String {
    match sort {
        SmtSort::Integer => negate_if_needed(value, |magnitude| magnitude.to_string()),
        SmtSort::Real => negate_if_needed(value, |magnitude| {
            if magnitude.contains('.') {
                magnitude.to_string()
            } else {
                format!("{magnitude}.0")
            }
        }),
        SmtSort::Boolean => value.to_string(),
        SmtSort::String => format!("\"{}\"", value.replace('"', "\"\"")),
    }
}

fn negate_if_needed(value: &str, render: impl Fn(&str) -> String) -> String {
    match value.strip_prefix('-') {
        Some(magnitude) => format!("(- {})", render(magnitude)),
        None => render(value),
    }
}
