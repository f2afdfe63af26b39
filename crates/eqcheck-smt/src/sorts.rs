use serde::{Deserialize, Serialize};

/// SMT sorts of symbolic values produced by the exploration engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmtSort {
    Integer,
    Real,
    Boolean,
    String,
}

impl SmtSort {
    /// SMT-LIB name of the sort.
    pub fn smtlib_name(self) -> &'static str {
        match self {
            SmtSort::Integer => "Int",
            SmtSort::Real => "Real",
            SmtSort::Boolean => "Bool",
            SmtSort::String => "String",
        }
    }
}

impl std::fmt::Display for SmtSort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.smtlib_name())
    }
}
