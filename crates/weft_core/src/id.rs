//! Identifiers for workflow runs and their history events.
//!
//! Event ids are the log's total order: strictly increasing within one run.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Event identifier - position of an event in a run's history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(i64);

impl EventId {
    /// Create from raw value
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Get raw value
    #[must_use]
    pub const fn as_i64(&self) -> i64 {
        self.0
    }

    /// Whether this id precedes `other` in log order
    #[must_use]
    pub const fn precedes(&self, other: EventId) -> bool {
        self.0 < other.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for EventId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl FromStr for EventId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(Self)
            .map_err(|e| CoreError::InvalidId {
                reason: format!("{s:?}: {e}"),
            })
    }
}

/// Workflow identifier - user-chosen, stable across runs
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowId(String);

impl WorkflowId {
    /// Create a new workflow id
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as str
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Run identifier - one execution of a workflow
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    /// Create a new run id
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as str
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of one workflow run whose history is fetched
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkflowExecution {
    /// Workflow id
    pub workflow_id: WorkflowId,
    /// Run id; `None` means the latest run
    pub run_id: Option<RunId>,
}

impl WorkflowExecution {
    /// Create an execution identity for the latest run of a workflow
    #[must_use]
    pub fn latest(workflow_id: impl Into<String>) -> Self {
        Self {
            workflow_id: WorkflowId::new(workflow_id),
            run_id: None,
        }
    }

    /// Pin a specific run
    #[must_use]
    pub fn with_run(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(RunId::new(run_id));
        self
    }
}

impl std::fmt::Display for WorkflowExecution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.run_id {
            Some(run) => write!(f, "{}/{}", self.workflow_id, run),
            None => write!(f, "{}", self.workflow_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_id_order() {
        let a = EventId::new(3);
        let b = EventId::new(7);
        assert!(a < b);
        assert!(a.precedes(b));
        assert!(!b.precedes(a));
        assert!(!a.precedes(a));
    }

    #[test]
    fn test_event_id_from_str() {
        assert_eq!(" 42 ".parse::<EventId>().unwrap(), EventId::new(42));
        assert!("x1".parse::<EventId>().is_err());
    }

    #[test]
    fn test_event_id_serde_transparent() {
        let json = serde_json::to_string(&EventId::new(5)).unwrap();
        assert_eq!(json, "5");
    }

    #[test]
    fn test_execution_display() {
        let exec = WorkflowExecution::latest("order-17");
        assert_eq!(exec.to_string(), "order-17");
        let exec = exec.with_run("r1");
        assert_eq!(exec.to_string(), "order-17/r1");
    }
}
