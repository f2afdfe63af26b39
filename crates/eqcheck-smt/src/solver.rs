use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::query::SolverQuery;

/// Verdict of one solver invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolverStatus {
    Sat,
    Unsat,
    Unknown,
    Error,
}

impl SolverStatus {
    /// Token written to `Answer` artifacts.
    pub fn as_token(self) -> &'static str {
        match self {
            SolverStatus::Sat => "sat",
            SolverStatus::Unsat => "unsat",
            SolverStatus::Unknown => "unknown",
            SolverStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for SolverStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SolverStatus::Sat => "SAT",
            SolverStatus::Unsat => "UNSAT",
            SolverStatus::Unknown => "UNKNOWN",
            SolverStatus::Error => "ERROR",
        })
    }
}

/// Raw facts about one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SolverStatistics {
    pub elapsed_ms: u128,
    pub exit_code: Option<i32>,
    /// The process outlived its hard deadline and was killed.
    pub killed: bool,
}

/// Outcome of solving one query. Produced once per query per partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SolverResult {
    pub status: SolverStatus,
    /// Remainder of stdout after the status line; present only when SAT.
    pub model: Option<String>,
    pub diagnostics: String,
    pub statistics: SolverStatistics,
}

impl SolverResult {
    /// Build a result from captured solver streams.
    ///
    /// The first stdout line is the status token; the rest is the model,
    /// kept only for SAT. An `(error ...)` status line is surfaced at the top
    /// of the diagnostics.
    pub fn from_output(stdout: &str, stderr: &str, statistics: SolverStatistics) -> Self {
        let mut lines = stdout.lines();
        let first = lines.next().unwrap_or("").trim();
        let status = parse_status_token(first);

        let model = if status == SolverStatus::Sat {
            let rest: Vec<&str> = lines.collect();
            let text = rest.join("\n");
            (!text.trim().is_empty()).then(|| format!("{}\n", text.trim_end()))
        } else {
            None
        };

        let mut diagnostics = String::new();
        if status == SolverStatus::Error {
            diagnostics.push_str(first);
            diagnostics.push('\n');
        }
        diagnostics.push_str(stderr);

        Self {
            status,
            model,
            diagnostics,
            statistics,
        }
    }

    /// Result for a solver that never produced a status.
    pub fn unknown(diagnostics: impl Into<String>, statistics: SolverStatistics) -> Self {
        Self {
            status: SolverStatus::Unknown,
            model: None,
            diagnostics: diagnostics.into(),
            statistics,
        }
    }

    /// Typed witness bindings parsed from the model text.
    pub fn witness(&self) -> Option<Model> {
        self.model.as_deref().map(Model::parse)
    }
}

/// Map a status line onto a [`SolverStatus`].
pub fn parse_status_token(line: &str) -> SolverStatus {
    let token = line.trim();
    if token.starts_with("(error") {
        SolverStatus::Error
    } else if token == "sat" {
        SolverStatus::Sat
    } else if token == "unsat" {
        SolverStatus::Unsat
    } else {
        SolverStatus::Unknown
    }
}

/// A model (variable assignments) extracted from a SAT result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Model {
    pub values: BTreeMap<String, ModelValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModelValue {
    Int(i64),
    /// Real value in SMT-LIB spelling, e.g. `1.5` or `(/ 1.0 3.0)`.
    Real(String),
    Bool(bool),
    /// Anything else, verbatim.
    Other(String),
}

impl Model {
    /// Collect constant `(define-fun NAME () Sort VALUE)` bindings.
    /// Function definitions with parameters are skipped.
    pub fn parse(text: &str) -> Self {
        let mut values = BTreeMap::new();
        for sexp in parse_sexps(text) {
            visit_define_funs(&sexp, &mut values);
        }
        Self { values }
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(ModelValue::Int(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.values.get(name) {
            Some(ModelValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn get_real(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(ModelValue::Real(r)) => Some(r),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Sexp {
    Atom(String),
    List(Vec<Sexp>),
}

impl Sexp {
    fn render(&self) -> String {
        match self {
            Sexp::Atom(a) => a.clone(),
            Sexp::List(items) => {
                let inner: Vec<String> = items.iter().map(Sexp::render).collect();
                format!("({})", inner.join(" "))
            }
        }
    }
}

fn parse_sexps(text: &str) -> Vec<Sexp> {
    let mut stack: Vec<Vec<Sexp>> = vec![Vec::new()];
    let mut atom = String::new();
    let mut in_string = false;

    let flush = |atom: &mut String, stack: &mut Vec<Vec<Sexp>>| {
        if !atom.is_empty() {
            if let Some(top) = stack.last_mut() {
                top.push(Sexp::Atom(std::mem::take(atom)));
            }
        }
    };

    for ch in text.chars() {
        if in_string {
            atom.push(ch);
            if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => {
                atom.push(ch);
                in_string = true;
            }
            '(' => {
                flush(&mut atom, &mut stack);
                stack.push(Vec::new());
            }
            ')' => {
                flush(&mut atom, &mut stack);
                if stack.len() > 1 {
                    let list = stack.pop().unwrap_or_default();
                    if let Some(top) = stack.last_mut() {
                        top.push(Sexp::List(list));
                    }
                }
            }
            c if c.is_whitespace() => flush(&mut atom, &mut stack),
            c => atom.push(c),
        }
    }
    flush(&mut atom, &mut stack);
    stack.into_iter().next().unwrap_or_default()
}

fn visit_define_funs(sexp: &Sexp, values: &mut BTreeMap<String, ModelValue>) {
    let Sexp::List(items) = sexp else {
        return;
    };
    if let [Sexp::Atom(head), Sexp::Atom(name), Sexp::List(params), Sexp::Atom(sort), value] =
        items.as_slice()
    {
        if head == "define-fun" && params.is_empty() {
            values.insert(name.clone(), model_value(sort, value));
            return;
        }
    }
    for item in items {
        visit_define_funs(item, values);
    }
}

fn model_value(sort: &str, value: &Sexp) -> ModelValue {
    let rendered = value.render();
    match sort {
        "Int" => parse_int(value).map(ModelValue::Int).unwrap_or(ModelValue::Other(rendered)),
        "Real" => ModelValue::Real(rendered),
        "Bool" => match rendered.as_str() {
            "true" => ModelValue::Bool(true),
            "false" => ModelValue::Bool(false),
            _ => ModelValue::Other(rendered),
        },
        _ => ModelValue::Other(rendered),
    }
}

fn parse_int(value: &Sexp) -> Option<i64> {
    match value {
        Sexp::Atom(a) => a.parse().ok(),
        Sexp::List(items) => match items.as_slice() {
            [Sexp::Atom(minus), Sexp::Atom(n)] if minus == "-" => n.parse::<i64>().ok().map(|n| -n),
            _ => None,
        },
    }
}

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("failed to launch solver `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("solver I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to capture solver {0}")]
    StreamCapture(&'static str),
}

/// Abstract solver interface. One call per query per partition; no retries.
pub trait SolverBackend {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Solve `query`, whose text has already been written to `query_path`.
    fn solve(&self, query: &SolverQuery, query_path: &Path) -> Result<SolverResult, SolverError>;
}

impl<T: SolverBackend + ?Sized> SolverBackend for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn solve(&self, query: &SolverQuery, query_path: &Path) -> Result<SolverResult, SolverError> {
        (**self).solve(query, query_path)
    }
}

/// Convert a duration to whole seconds, rounding up, never below one.
pub fn budget_secs(budget: Duration) -> u64 {
    let secs = budget.as_secs() + u64::from(budget.subsec_nanos() > 0);
    secs.max(1)
}
