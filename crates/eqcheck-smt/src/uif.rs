//! Textual detection of uninterpreted-function applications.
//!
//! Works on already-serialized SMT-LIB text so foreign serializations need no
//! re-parsing. Relies on the printer emitting [`UIF_MARKER`] for every call.

use serde::Serialize;

use crate::terms::{Expr, UIF_MARKER};

/// Whether serialized text contains an uninterpreted-function application.
pub fn contains_uif_text(text: &str) -> bool {
    text.contains(UIF_MARKER)
}

/// UIF presence per input of one comparison site.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UifFlags {
    pub pc: bool,
    pub old: bool,
    pub new: bool,
}

impl UifFlags {
    /// Textual detection for inputs that only exist in serialized form.
    pub fn detect(pc_text: &str, old_text: &str, new_text: &str) -> Self {
        Self {
            pc: contains_uif_text(pc_text),
            old: contains_uif_text(old_text),
            new: contains_uif_text(new_text),
        }
    }

    /// Structural detection over expression trees. Symbol names that merely
    /// contain [`UIF_MARKER`] do not count.
    pub fn from_exprs(path_condition: Option<&Expr>, old: &Expr, new: &Expr) -> Self {
        Self {
            old: old.contains_uninterpreted_function(),
            new: new.contains_uninterpreted_function(),
            ..Self::from_path_condition(path_condition)
        }
    }

    pub fn from_path_condition(path_condition: Option<&Expr>) -> Self {
        Self {
            pc: path_condition.is_some_and(Expr::contains_uninterpreted_function),
            ..Self::default()
        }
    }

    pub fn any(&self) -> bool {
        self.pc || self.old || self.new
    }
}
