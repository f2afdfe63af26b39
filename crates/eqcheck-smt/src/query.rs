//! Synthesis of the three per-partition solver queries.
//!
//! Output is a pure function of the inputs; identical inputs give
//! byte-identical documents.

use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::backends::smtlib_printer::{path_condition_to_smtlib, to_smtlib};
use crate::declarations::{
    infer_from_exprs, infer_from_text, introduced_symbol, Declaration, KnownDeclarations,
    DEFAULT_HELPER_LIBRARY,
};
use crate::terms::{Expr, StructuralError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynthesisError {
    #[error(transparent)]
    Structural(#[from] StructuralError),
    #[error("symbol `{name}` is used with two signatures: `{first}` and `{second}`")]
    ConflictingSort {
        name: String,
        first: String,
        second: String,
    },
}

/// Which question a query asks the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    /// Is the path condition satisfiable at all?
    Reachability,
    /// Can the two results differ under the path condition?
    Neq,
    /// Can the two results coincide under the path condition?
    Eq,
}

impl QueryKind {
    pub const ALL: [QueryKind; 3] = [QueryKind::Reachability, QueryKind::Neq, QueryKind::Eq];

    /// Suffix appended to artifact kinds (`ToSolve`, `Answer`, `Errors`).
    /// The NEQ query owns the unsuffixed names.
    pub fn artifact_suffix(self) -> &'static str {
        match self {
            QueryKind::Reachability => "-PC",
            QueryKind::Neq => "",
            QueryKind::Eq => "-EQ",
        }
    }

    pub fn requests_model(self) -> bool {
        matches!(self, QueryKind::Neq)
    }
}

impl std::fmt::Display for QueryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            QueryKind::Reachability => "pc",
            QueryKind::Neq => "neq",
            QueryKind::Eq => "eq",
        })
    }
}

/// A solver-ready SMT-LIB document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverQuery {
    pub kind: QueryKind,
    pub text: String,
    pub declarations: Vec<Declaration>,
}

impl SolverQuery {
    /// Hex SHA-256 of the query text.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.text.as_bytes());
        digest.iter().map(|b| format!("{b:02x}")).collect()
    }
}

/// The three queries of one comparison site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySet {
    pub reachability: SolverQuery,
    pub neq: SolverQuery,
    pub eq: SolverQuery,
}

impl QuerySet {
    pub fn get(&self, kind: QueryKind) -> &SolverQuery {
        match kind {
            QueryKind::Reachability => &self.reachability,
            QueryKind::Neq => &self.neq,
            QueryKind::Eq => &self.eq,
        }
    }
}

/// Builds queries from a path condition and two result expressions.
#[derive(Debug, Clone)]
pub struct QuerySynthesizer {
    known: KnownDeclarations,
    helpers: Vec<String>,
}

impl Default for QuerySynthesizer {
    fn default() -> Self {
        Self::new(KnownDeclarations::empty())
    }
}

impl QuerySynthesizer {
    pub fn new(known: KnownDeclarations) -> Self {
        Self {
            known,
            helpers: DEFAULT_HELPER_LIBRARY.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Replace the helper-function library.
    pub fn with_helpers(mut self, helpers: Vec<String>) -> Self {
        self.helpers = helpers;
        self
    }

    pub fn known(&self) -> &KnownDeclarations {
        &self.known
    }

    /// Synthesize from expression trees, taking sorts from the trees.
    pub fn synthesize(
        &self,
        pc: Option<&Expr>,
        old: &Expr,
        new: &Expr,
    ) -> Result<QuerySet, SynthesisError> {
        if let Some(pc) = pc {
            pc.validate()?;
        }
        old.validate()?;
        new.validate()?;

        let declarations = infer_from_exprs(pc.into_iter().chain([old, new]), &self.known)?;
        Ok(self.assemble(
            &path_condition_to_smtlib(pc),
            &to_smtlib(old),
            &to_smtlib(new),
            declarations,
        ))
    }

    /// Synthesize from already-serialized text, typing free symbols by the
    /// naming convention.
    pub fn synthesize_text(&self, pc_text: &str, old_text: &str, new_text: &str) -> QuerySet {
        let combined = format!("{pc_text}\n{old_text}\n{new_text}");
        let declarations = infer_from_text(&combined, &self.known);
        self.assemble(pc_text, old_text, new_text, declarations)
    }

    /// Reachability query alone, for partitions without result expressions.
    pub fn reachability(&self, pc: Option<&Expr>) -> Result<SolverQuery, SynthesisError> {
        if let Some(pc) = pc {
            pc.validate()?;
        }
        let declarations = infer_from_exprs(pc, &self.known)?;
        let preamble = self.preamble(&declarations, &path_condition_to_smtlib(pc));
        Ok(SolverQuery {
            kind: QueryKind::Reachability,
            text: format!("{preamble}(check-sat)\n"),
            declarations,
        })
    }

    fn assemble(
        &self,
        pc_text: &str,
        old_text: &str,
        new_text: &str,
        declarations: Vec<Declaration>,
    ) -> QuerySet {
        let preamble = self.preamble(&declarations, pc_text);
        let query = |kind: QueryKind, text: String| SolverQuery {
            kind,
            text,
            declarations: declarations.clone(),
        };

        QuerySet {
            reachability: query(QueryKind::Reachability, format!("{preamble}(check-sat)\n")),
            neq: query(
                QueryKind::Neq,
                format!(
                    "{preamble}; Equivalence Check:\n(assert (not (= {old_text} {new_text})))\n\n(check-sat)\n(get-model)\n"
                ),
            ),
            eq: query(
                QueryKind::Eq,
                format!(
                    "{preamble}; Equivalence Check:\n(assert (= {old_text} {new_text}))\n\n(check-sat)\n"
                ),
            ),
        }
    }

    fn preamble(&self, declarations: &[Declaration], pc_text: &str) -> String {
        let inferred: Vec<String> = declarations.iter().map(Declaration::to_smtlib).collect();
        // Helpers already defined by the known declarations are omitted.
        let helpers: Vec<&str> = self
            .helpers
            .iter()
            .map(String::as_str)
            .filter(|helper| {
                !matches!(introduced_symbol(helper), Some(sym) if self.known.contains(sym))
            })
            .collect();
        let blocks: Vec<String> = [
            self.known.text().to_string(),
            inferred.join("\n"),
            helpers.join("\n"),
        ]
        .into_iter()
        .filter(|block| !block.is_empty())
        .collect();

        let mut out = String::new();
        if !blocks.is_empty() {
            out.push_str(&blocks.join("\n"));
            out.push_str("\n\n");
        }
        out.push_str("; Path Condition:\n");
        out.push_str(&format!("(assert {pc_text})\n\n"));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sorts::SmtSort;

    #[test]
    fn neq_query_layout() {
        let synth = QuerySynthesizer::default();
        let x = Expr::int_var("INT0");
        let pc = x.clone().gt(Expr::int(0));
        let set = synth.synthesize(Some(&pc), &x, &x.clone().neg()).unwrap();
        assert_eq!(
            set.neq.text,
            "(declare-fun INT0 () Int)\n\
             (define-fun pow ((a Real) (b Real)) Real (^ a b))\n\
             \n\
             ; Path Condition:\n\
             (assert (> INT0 0))\n\
             \n\
             ; Equivalence Check:\n\
             (assert (not (= INT0 (- INT0))))\n\
             \n\
             (check-sat)\n\
             (get-model)\n"
        );
    }

    #[test]
    fn eq_and_reachability_queries_share_preamble() {
        let synth = QuerySynthesizer::default();
        let set = synth
            .synthesize(None, &Expr::int_var("INT1"), &Expr::int(3))
            .unwrap();
        assert!(set.reachability.text.ends_with("(assert true)\n\n(check-sat)\n"));
        assert!(set
            .eq
            .text
            .ends_with("; Equivalence Check:\n(assert (= INT1 3))\n\n(check-sat)\n"));
        assert!(!set.eq.text.contains("get-model"));
        assert!(!set.reachability.text.contains("Equivalence Check"));
    }

    #[test]
    fn known_declarations_lead_and_are_not_repeated() {
        let known = KnownDeclarations::parse("(declare-fun INT1 () Int)");
        let synth = QuerySynthesizer::new(known);
        let set = synth
            .synthesize(None, &Expr::int_var("INT1"), &Expr::int_var("INT2"))
            .unwrap();
        assert!(set.neq.text.starts_with(
            "(declare-fun INT1 () Int)\n(declare-fun INT2 () Int)\n(define-fun pow"
        ));
        assert_eq!(set.neq.text.matches("(declare-fun INT1 () Int)").count(), 1);
    }

    #[test]
    fn helpers_already_known_are_not_redefined() {
        let known = KnownDeclarations::parse("(define-fun pow ((a Real) (b Real)) Real (^ a b))");
        let synth = QuerySynthesizer::new(known);
        let set = synth
            .synthesize(None, &Expr::int_var("INT1"), &Expr::int(3))
            .unwrap();
        for query in [&set.reachability, &set.neq, &set.eq] {
            assert_eq!(query.text.matches("(define-fun pow").count(), 1);
        }
    }

    #[test]
    fn empty_preamble_is_skipped() {
        let synth = QuerySynthesizer::default().with_helpers(Vec::new());
        let query = synth.reachability(None).unwrap();
        assert_eq!(query.text, "; Path Condition:\n(assert true)\n\n(check-sat)\n");
    }

    #[test]
    fn structural_defects_abort_synthesis() {
        let synth = QuerySynthesizer::default();
        let bad = Expr::op(crate::terms::Opcode::Not, vec![]);
        assert!(matches!(
            synth.synthesize(Some(&bad), &Expr::int(1), &Expr::int(1)),
            Err(SynthesisError::Structural(_))
        ));
    }

    #[test]
    fn text_and_tree_synthesis_match_for_conventional_inputs() {
        let synth = QuerySynthesizer::default();
        let pc = Expr::real_var("REAL_1").ge(Expr::real("0.5"));
        let old = Expr::int_var("INT4").add(Expr::int(1));
        let new = Expr::int(1).add(Expr::int_var("INT4"));
        let typed = synth.synthesize(Some(&pc), &old, &new).unwrap();
        let textual = synth.synthesize_text(
            &pc.to_smtlib().unwrap(),
            &old.to_smtlib().unwrap(),
            &new.to_smtlib().unwrap(),
        );
        assert_eq!(typed, textual);
    }

    #[test]
    fn uninterpreted_functions_are_declared_for_tree_input() {
        let synth = QuerySynthesizer::default();
        let call = Expr::uif("f", SmtSort::Integer, vec![Expr::int_var("INT0")]);
        let set = synth.synthesize(None, &call, &call).unwrap();
        assert!(set.neq.text.contains("(declare-fun UF_f (Int) Int)"));
    }

    #[test]
    fn fingerprint_tracks_text() {
        let synth = QuerySynthesizer::default();
        let a = synth.synthesize(None, &Expr::int(1), &Expr::int(1)).unwrap();
        let b = synth.synthesize(None, &Expr::int(1), &Expr::int(2)).unwrap();
        assert_eq!(a.neq.fingerprint().len(), 64);
        assert_eq!(a.neq.fingerprint(), a.clone().neq.fingerprint());
        assert_ne!(a.neq.fingerprint(), b.neq.fingerprint());
    }
}
