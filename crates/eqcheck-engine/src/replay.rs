//! Replays a recorded exploration trace through an [`EquivalenceOracle`].
//!
//! A trace is the ordered list of callbacks an exploration engine made:
//! comparison sites, depth-limit hits and choice points.

use serde::{Deserialize, Serialize};
use tracing::warn;

use eqcheck_smt::Expr;

use crate::error::EngineError;
use crate::oracle::{ComparisonSite, EquivalenceOracle};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ExplorationEvent {
    Comparison(ComparisonSite),
    DepthLimit {
        #[serde(default)]
        path_condition: Option<Expr>,
    },
    Choice {
        state: u64,
        choice: u64,
        #[serde(default)]
        path_condition: Option<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Trace {
    pub events: Vec<ExplorationEvent>,
}

impl Trace {
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EventOutcome {
    Compared { equivalent: bool },
    DepthLimited,
    ChoiceCaptured,
    /// The event was rejected; the run went on.
    Skipped { error: String },
}

/// Feed every event to `oracle` in order.
///
/// Non-fatal errors skip the offending event. Fatal errors stop the replay.
pub fn replay<O: EquivalenceOracle>(
    oracle: &mut O,
    events: Vec<ExplorationEvent>,
) -> Result<Vec<EventOutcome>, EngineError> {
    let mut outcomes = Vec::with_capacity(events.len());
    for (index, event) in events.into_iter().enumerate() {
        let outcome = match event {
            ExplorationEvent::Comparison(site) => oracle
                .are_equivalent(site)
                .map(|equivalent| EventOutcome::Compared { equivalent }),
            ExplorationEvent::DepthLimit { path_condition } => oracle
                .depth_limit_reached(path_condition)
                .map(|()| EventOutcome::DepthLimited),
            ExplorationEvent::Choice {
                state,
                choice,
                path_condition,
            } => oracle
                .choice_path_condition(state, choice, path_condition.as_ref())
                .map(|()| EventOutcome::ChoiceCaptured),
        };
        match outcome {
            Ok(outcome) => outcomes.push(outcome),
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                warn!(event = index, error = %err, "Event skipped");
                outcomes.push(EventOutcome::Skipped {
                    error: err.to_string(),
                });
            }
        }
    }
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_json_shape() {
        let trace = Trace::from_json_str(
            r#"{"events": [
                {"event": "comparison",
                 "old": {"kind": "variable", "name": "INT0", "sort": "integer"},
                 "new": {"kind": "literal", "value": "1", "sort": "integer"}},
                {"event": "depth_limit"},
                {"event": "choice", "state": 2, "choice": 1,
                 "path_condition": {"kind": "literal", "value": "true", "sort": "boolean"}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(trace.events.len(), 3);
        assert!(matches!(
            &trace.events[0],
            ExplorationEvent::Comparison(site) if site.path_condition.is_none()
        ));
        assert_eq!(
            trace.events[1],
            ExplorationEvent::DepthLimit {
                path_condition: None
            }
        );
        assert!(matches!(
            trace.events[2],
            ExplorationEvent::Choice {
                state: 2,
                choice: 1,
                ..
            }
        ));
    }

    #[test]
    fn unknown_event_is_rejected() {
        assert!(Trace::from_json_str(r#"{"events": [{"event": "restart"}]}"#).is_err());
    }
}
