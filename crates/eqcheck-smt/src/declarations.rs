//! Free-symbol declarations for synthesized queries.
//!
//! Two inference paths exist. The typed path walks expression trees and takes
//! each symbol's sort from the tree itself. The textual path only sees
//! serialized SMT-LIB and relies on the naming convention of the exploration
//! engine: `INT<n>` is an integer, `REAL_<n>` is a real. If the engine ever
//! reuses a name across sorts the textual path silently produces an ill-typed
//! query; the typed path reports [`SynthesisError::ConflictingSort`] instead.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use regex::Regex;

use crate::query::SynthesisError;
use crate::sorts::SmtSort;
use crate::terms::{uif_symbol, Expr};

/// Helper functions every query may rely on.
pub const DEFAULT_HELPER_LIBRARY: &[&str] = &["(define-fun pow ((a Real) (b Real)) Real (^ a b))"];

/// One `declare-fun` line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Declaration {
    pub name: String,
    pub arg_sorts: Vec<SmtSort>,
    pub sort: SmtSort,
}

impl Declaration {
    pub fn constant(name: impl Into<String>, sort: SmtSort) -> Self {
        Self {
            name: name.into(),
            arg_sorts: Vec::new(),
            sort,
        }
    }

    pub fn to_smtlib(&self) -> String {
        let args: Vec<&str> = self.arg_sorts.iter().map(|s| s.smtlib_name()).collect();
        format!(
            "(declare-fun {} ({}) {})",
            self.name,
            args.join(" "),
            self.sort.smtlib_name()
        )
    }
}

/// Declarations the caller already provides (globally fixed symbols).
///
/// The text is emitted verbatim at the top of every query; the symbols it
/// declares or defines are never declared again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnownDeclarations {
    text: String,
    symbols: BTreeSet<String>,
}

impl KnownDeclarations {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Collect the symbols introduced by `declare-fun`, `declare-const` and
    /// `define-fun` commands in `text`.
    pub fn parse(text: &str) -> Self {
        let symbols = known_symbol_pattern()
            .captures_iter(text)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
            .collect();
        Self {
            text: text.trim().to_string(),
            symbols,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.contains(symbol)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.symbols.iter().map(String::as_str)
    }
}

/// Symbol introduced by the first declaration or definition in `text`.
pub fn introduced_symbol(text: &str) -> Option<&str> {
    known_symbol_pattern()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn known_symbol_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\((?:declare-fun|declare-const|define-fun)\s+([^\s()]+)")
            .expect("static regex is valid")
    })
}

fn int_convention() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\bINT\d+\b").expect("static regex is valid"))
}

fn real_convention() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\bREAL_\d+\b").expect("static regex is valid"))
}

/// Sort implied by the naming convention, if the name follows it.
pub fn convention_sort(name: &str) -> Option<SmtSort> {
    let whole = |re: &Regex| re.find(name).is_some_and(|m| m.as_str() == name);
    if whole(int_convention()) {
        Some(SmtSort::Integer)
    } else if whole(real_convention()) {
        Some(SmtSort::Real)
    } else {
        None
    }
}

/// Numeric-suffix-aware order: `INT2` before `INT10`.
fn symbol_order(a: &String, b: &String) -> std::cmp::Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn matches_in(re: &Regex, text: &str, known: &KnownDeclarations) -> Vec<String> {
    let distinct: BTreeSet<String> = re
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .filter(|name| !known.contains(name))
        .collect();
    let mut names: Vec<String> = distinct.into_iter().collect();
    names.sort_by(symbol_order);
    names
}

/// Textual inference: integers first, then reals, each in suffix order.
pub fn infer_from_text(text: &str, known: &KnownDeclarations) -> Vec<Declaration> {
    let ints = matches_in(int_convention(), text, known)
        .into_iter()
        .map(|name| Declaration::constant(name, SmtSort::Integer));
    let reals = matches_in(real_convention(), text, known)
        .into_iter()
        .map(|name| Declaration::constant(name, SmtSort::Real));
    ints.chain(reals).collect()
}

/// Typed inference over expression trees.
///
/// Constants are grouped by sort (integer, real, boolean, string), followed by
/// uninterpreted functions; each group is in suffix order. For trees whose
/// variables follow the naming convention and carry no calls, this yields the
/// same list as [`infer_from_text`] on their serialization.
pub fn infer_from_exprs<'a>(
    exprs: impl IntoIterator<Item = &'a Expr>,
    known: &KnownDeclarations,
) -> Result<Vec<Declaration>, SynthesisError> {
    let mut table: BTreeMap<String, Declaration> = BTreeMap::new();
    for expr in exprs {
        collect(expr, &mut table)?;
    }

    let mut constants: Vec<Declaration> = Vec::new();
    let mut functions: Vec<Declaration> = Vec::new();
    for decl in table.into_values() {
        if known.contains(&decl.name) {
            continue;
        }
        if decl.arg_sorts.is_empty() && !decl.name.starts_with(crate::terms::UIF_MARKER) {
            constants.push(decl);
        } else {
            functions.push(decl);
        }
    }
    constants.sort_by(|a, b| a.sort.cmp(&b.sort).then_with(|| symbol_order(&a.name, &b.name)));
    functions.sort_by(|a, b| symbol_order(&a.name, &b.name));
    constants.extend(functions);
    Ok(constants)
}

fn collect(expr: &Expr, table: &mut BTreeMap<String, Declaration>) -> Result<(), SynthesisError> {
    match expr {
        Expr::Literal { .. } => Ok(()),
        Expr::Variable { name, sort } => record(table, Declaration::constant(name.clone(), *sort)),
        Expr::Operator { operands, .. } => operands.iter().try_for_each(|e| collect(e, table)),
        Expr::UninterpretedCall {
            function,
            sort,
            operands,
        } => {
            record(
                table,
                Declaration {
                    name: uif_symbol(function),
                    arg_sorts: operands.iter().map(Expr::sort).collect(),
                    sort: *sort,
                },
            )?;
            operands.iter().try_for_each(|e| collect(e, table))
        }
    }
}

fn record(
    table: &mut BTreeMap<String, Declaration>,
    decl: Declaration,
) -> Result<(), SynthesisError> {
    match table.get(&decl.name) {
        Some(existing) if *existing != decl => {
            let first = existing.to_smtlib();
            let second = decl.to_smtlib();
            Err(SynthesisError::ConflictingSort {
                name: decl.name,
                first,
                second,
            })
        }
        Some(_) => Ok(()),
        None => {
            table.insert(decl.name.clone(), decl);
            Ok(())
        }
    }
}
