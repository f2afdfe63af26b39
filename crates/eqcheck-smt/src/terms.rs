use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backends::smtlib_printer::to_smtlib;
use crate::interchange::InterchangeError;
use crate::sorts::SmtSort;

/// Marker that every serialized uninterpreted-function application carries.
pub const UIF_MARKER: &str = "UF_";

/// Operators the exploration engine may place in a symbolic expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    /// Real division.
    #[serde(rename = "/")]
    Div,
    /// Integer division.
    #[serde(rename = "div")]
    IntDiv,
    #[serde(rename = "mod")]
    Mod,
    #[serde(rename = "neg")]
    Neg,
    /// Real exponentiation, backed by the `pow` helper definition.
    #[serde(rename = "pow")]
    Pow,
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "distinct")]
    Distinct,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "and")]
    And,
    #[serde(rename = "or")]
    Or,
    #[serde(rename = "not")]
    Not,
    #[serde(rename = "=>")]
    Implies,
    #[serde(rename = "ite")]
    Ite,
    #[serde(rename = "str.++")]
    Concat,
    #[serde(rename = "str.len")]
    StrLen,
}

/// Number of operands an opcode accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(self, n: usize) -> bool {
        match self {
            Arity::Exactly(k) => n == k,
            Arity::AtLeast(k) => n >= k,
        }
    }
}

impl std::fmt::Display for Arity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Arity::Exactly(k) => write!(f, "exactly {k}"),
            Arity::AtLeast(k) => write!(f, "at least {k}"),
        }
    }
}

impl Opcode {
    /// SMT-LIB function symbol.
    pub fn symbol(self) -> &'static str {
        match self {
            Opcode::Add => "+",
            Opcode::Sub | Opcode::Neg => "-",
            Opcode::Mul => "*",
            Opcode::Div => "/",
            Opcode::IntDiv => "div",
            Opcode::Mod => "mod",
            Opcode::Pow => "pow",
            Opcode::Eq => "=",
            Opcode::Distinct => "distinct",
            Opcode::Lt => "<",
            Opcode::Le => "<=",
            Opcode::Gt => ">",
            Opcode::Ge => ">=",
            Opcode::And => "and",
            Opcode::Or => "or",
            Opcode::Not => "not",
            Opcode::Implies => "=>",
            Opcode::Ite => "ite",
            Opcode::Concat => "str.++",
            Opcode::StrLen => "str.len",
        }
    }

    pub fn arity(self) -> Arity {
        match self {
            Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Distinct | Opcode::Concat => {
                Arity::AtLeast(2)
            }
            Opcode::Div
            | Opcode::IntDiv
            | Opcode::Mod
            | Opcode::Pow
            | Opcode::Eq
            | Opcode::Lt
            | Opcode::Le
            | Opcode::Gt
            | Opcode::Ge
            | Opcode::Implies => Arity::Exactly(2),
            Opcode::Neg | Opcode::Not | Opcode::StrLen => Arity::Exactly(1),
            Opcode::Ite => Arity::Exactly(3),
            Opcode::And | Opcode::Or => Arity::AtLeast(0),
        }
    }
}

/// Structural defects in an expression tree. These are bugs in whatever
/// produced the tree and abort the partition that carries it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error("operator `{op}` expects {expected} operands, found {found}")]
    Arity {
        op: &'static str,
        expected: Arity,
        found: usize,
    },
    #[error("empty {what} name")]
    EmptySymbol { what: &'static str },
    #[error("symbol `{name}` contains characters that cannot appear in an SMT-LIB simple symbol")]
    InvalidSymbol { name: String },
    #[error("literal `{value}` is not a valid {sort} constant")]
    InvalidLiteral { value: String, sort: SmtSort },
}

/// Symbolic value reported by the exploration engine.
///
/// Trees are immutable once built; every operation here is a pure function
/// over the tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expr {
    /// Constant; `value` is the textual form (`42`, `-3`, `1.5`, `true`, `abc`).
    Literal { value: String, sort: SmtSort },
    Variable { name: String, sort: SmtSort },
    Operator { op: Opcode, operands: Vec<Expr> },
    /// Application of a function symbol without defining axioms.
    UninterpretedCall {
        function: String,
        sort: SmtSort,
        operands: Vec<Expr>,
    },
}

#[allow(clippy::should_implement_trait)]
impl Expr {
    pub fn var(name: impl Into<String>, sort: SmtSort) -> Self {
        Expr::Variable {
            name: name.into(),
            sort,
        }
    }

    pub fn int_var(name: impl Into<String>) -> Self {
        Expr::var(name, SmtSort::Integer)
    }

    pub fn real_var(name: impl Into<String>) -> Self {
        Expr::var(name, SmtSort::Real)
    }

    pub fn int(n: i64) -> Self {
        Expr::Literal {
            value: n.to_string(),
            sort: SmtSort::Integer,
        }
    }

    pub fn real(value: impl Into<String>) -> Self {
        Expr::Literal {
            value: value.into(),
            sort: SmtSort::Real,
        }
    }

    pub fn bool(b: bool) -> Self {
        Expr::Literal {
            value: b.to_string(),
            sort: SmtSort::Boolean,
        }
    }

    pub fn string(s: impl Into<String>) -> Self {
        Expr::Literal {
            value: s.into(),
            sort: SmtSort::String,
        }
    }

    pub fn op(op: Opcode, operands: Vec<Expr>) -> Self {
        Expr::Operator { op, operands }
    }

    pub fn uif(function: impl Into<String>, sort: SmtSort, operands: Vec<Expr>) -> Self {
        Expr::UninterpretedCall {
            function: function.into(),
            sort,
            operands,
        }
    }

    fn binary(op: Opcode, lhs: Expr, rhs: Expr) -> Self {
        Expr::op(op, vec![lhs, rhs])
    }

    pub fn add(self, other: Expr) -> Self {
        Expr::binary(Opcode::Add, self, other)
    }

    pub fn sub(self, other: Expr) -> Self {
        Expr::binary(Opcode::Sub, self, other)
    }

    pub fn mul(self, other: Expr) -> Self {
        Expr::binary(Opcode::Mul, self, other)
    }

    pub fn div(self, other: Expr) -> Self {
        Expr::binary(Opcode::Div, self, other)
    }

    pub fn pow(self, other: Expr) -> Self {
        Expr::binary(Opcode::Pow, self, other)
    }

    pub fn neg(self) -> Self {
        Expr::op(Opcode::Neg, vec![self])
    }

    pub fn eq(self, other: Expr) -> Self {
        Expr::binary(Opcode::Eq, self, other)
    }

    pub fn lt(self, other: Expr) -> Self {
        Expr::binary(Opcode::Lt, self, other)
    }

    pub fn le(self, other: Expr) -> Self {
        Expr::binary(Opcode::Le, self, other)
    }

    pub fn gt(self, other: Expr) -> Self {
        Expr::binary(Opcode::Gt, self, other)
    }

    pub fn ge(self, other: Expr) -> Self {
        Expr::binary(Opcode::Ge, self, other)
    }

    pub fn and(terms: Vec<Expr>) -> Self {
        Expr::op(Opcode::And, terms)
    }

    pub fn or(terms: Vec<Expr>) -> Self {
        Expr::op(Opcode::Or, terms)
    }

    pub fn not(self) -> Self {
        Expr::op(Opcode::Not, vec![self])
    }

    pub fn implies(self, other: Expr) -> Self {
        Expr::binary(Opcode::Implies, self, other)
    }

    pub fn ite(cond: Expr, then: Expr, els: Expr) -> Self {
        Expr::op(Opcode::Ite, vec![cond, then, els])
    }

    /// Sort of the value this expression denotes.
    pub fn sort(&self) -> SmtSort {
        match self {
            Expr::Literal { sort, .. }
            | Expr::Variable { sort, .. }
            | Expr::UninterpretedCall { sort, .. } => *sort,
            Expr::Operator { op, operands } => match op {
                Opcode::Eq
                | Opcode::Distinct
                | Opcode::Lt
                | Opcode::Le
                | Opcode::Gt
                | Opcode::Ge
                | Opcode::And
                | Opcode::Or
                | Opcode::Not
                | Opcode::Implies => SmtSort::Boolean,
                Opcode::Div | Opcode::Pow => SmtSort::Real,
                Opcode::IntDiv | Opcode::Mod | Opcode::StrLen => SmtSort::Integer,
                Opcode::Concat => SmtSort::String,
                Opcode::Ite => operands
                    .get(1)
                    .map(Expr::sort)
                    .unwrap_or(SmtSort::Boolean),
                Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Neg => operands
                    .first()
                    .map(Expr::sort)
                    .unwrap_or(SmtSort::Integer),
            },
        }
    }

    /// Direct children of this node.
    pub fn operands(&self) -> &[Expr] {
        match self {
            Expr::Operator { operands, .. } | Expr::UninterpretedCall { operands, .. } => operands,
            Expr::Literal { .. } | Expr::Variable { .. } => &[],
        }
    }

    /// Structural scan for uninterpreted-function applications.
    pub fn contains_uninterpreted_function(&self) -> bool {
        match self {
            Expr::UninterpretedCall { .. } => true,
            Expr::Literal { .. } | Expr::Variable { .. } => false,
            Expr::Operator { operands, .. } => {
                operands.iter().any(Expr::contains_uninterpreted_function)
            }
        }
    }

    /// Check operator arities, symbol names and literal spellings.
    pub fn validate(&self) -> Result<(), StructuralError> {
        match self {
            Expr::Literal { value, sort } => validate_literal(value, *sort),
            Expr::Variable { name, .. } => validate_symbol(name, "variable"),
            Expr::Operator { op, operands } => {
                let arity = op.arity();
                if !arity.accepts(operands.len()) {
                    return Err(StructuralError::Arity {
                        op: op.symbol(),
                        expected: arity,
                        found: operands.len(),
                    });
                }
                operands.iter().try_for_each(Expr::validate)
            }
            Expr::UninterpretedCall {
                function, operands, ..
            } => {
                validate_symbol(function, "function")?;
                operands.iter().try_for_each(Expr::validate)
            }
        }
    }

    /// Prefix-notation SMT-LIB text.
    pub fn to_smtlib(&self) -> Result<String, StructuralError> {
        self.validate()?;
        Ok(to_smtlib(self))
    }

    /// Structured tree document for the interchange format.
    pub fn to_interchange(&self) -> Result<serde_json::Value, InterchangeError> {
        crate::interchange::to_interchange(self)
    }
}

/// Function symbol as it appears in SMT-LIB text, always carrying [`UIF_MARKER`].
pub fn uif_symbol(function: &str) -> String {
    if function.starts_with(UIF_MARKER) {
        function.to_string()
    } else {
        format!("{UIF_MARKER}{function}")
    }
}

fn validate_symbol(name: &str, what: &'static str) -> Result<(), StructuralError> {
    if name.is_empty() {
        return Err(StructuralError::EmptySymbol { what });
    }
    let simple = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "~!@$%^&*_-+=<>.?/".contains(c));
    if !simple || name.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(StructuralError::InvalidSymbol {
            name: name.to_string(),
        });
    }
    Ok(())
}

fn validate_literal(value: &str, sort: SmtSort) -> Result<(), StructuralError> {
    let digits = value.strip_prefix('-').unwrap_or(value);
    let ok = match sort {
        SmtSort::Integer => !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()),
        SmtSort::Real => {
            let mut parts = digits.splitn(2, '.');
            let whole = parts.next().unwrap_or("");
            let frac = parts.next().unwrap_or("0");
            !whole.is_empty()
                && !frac.is_empty()
                && whole.chars().all(|c| c.is_ascii_digit())
                && frac.chars().all(|c| c.is_ascii_digit())
        }
        SmtSort::Boolean => value == "true" || value == "false",
        SmtSort::String => true,
    };
    if ok {
        Ok(())
    } else {
        Err(StructuralError::InvalidLiteral {
            value: value.to_string(),
            sort,
        })
    }
}
