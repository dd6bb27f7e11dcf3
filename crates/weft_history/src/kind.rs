//! Event kind classification.
//!
//! History kinds arrive as open-ended strings. They are classified once at
//! ingestion into a closed [`EventKind`]; nothing downstream matches on the
//! raw string again.

use serde::{Deserialize, Serialize};

/// Kind of logical unit an event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnitKind {
    /// The workflow run itself
    Workflow,
    /// One workflow task (decision) cycle
    WorkflowTask,
    /// An activity, across all its attempts
    Activity,
    /// A durable timer
    Timer,
    /// A child workflow, across all its attempts
    ChildWorkflow,
    /// A received or sent signal
    Signal,
}

impl UnitKind {
    /// Whether units of this kind can collapse retries
    #[must_use]
    pub const fn supports_retry(self) -> bool {
        matches!(self, Self::Activity | Self::ChildWorkflow)
    }

    /// Whether units of this kind are structural rather than schedulable work
    #[must_use]
    pub const fn is_structural(self) -> bool {
        matches!(self, Self::Workflow | Self::WorkflowTask)
    }

    /// Short label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Workflow => "Workflow",
            Self::WorkflowTask => "Workflow Task",
            Self::Activity => "Activity",
            Self::Timer => "Timer",
            Self::ChildWorkflow => "Child Workflow",
            Self::Signal => "Signal",
        }
    }
}

impl std::fmt::Display for UnitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// How a unit of work ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// Completed successfully
    Completed,
    /// Failed
    Failed,
    /// Timed out
    TimedOut,
    /// Canceled
    Canceled,
    /// Terminated
    Terminated,
    /// Timer fired
    Fired,
    /// Workflow continued as a new run
    ContinuedAsNew,
    /// Signal delivered
    Signaled,
}

impl Outcome {
    /// Whether a later attempt may follow this outcome
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Failed | Self::TimedOut)
    }

    /// Whether this outcome is an error
    #[must_use]
    pub const fn is_error(self) -> bool {
        matches!(self, Self::Failed | Self::TimedOut | Self::Terminated)
    }

    /// Status label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Completed => "Completed",
            Self::Failed => "Failed",
            Self::TimedOut => "TimedOut",
            Self::Canceled => "Canceled",
            Self::Terminated => "Terminated",
            Self::Fired => "Fired",
            Self::ContinuedAsNew => "ContinuedAsNew",
            Self::Signaled => "Signaled",
        }
    }
}

/// Lifecycle phase of an event within its unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Scheduling or initiating event; opens a unit
    Scheduled,
    /// Progress event
    Started,
    /// Informational, neither opens nor closes (cancel requested etc.)
    Requested,
    /// Closes the unit
    Terminal(Outcome),
    /// Opens and closes a unit in one event
    Point(Outcome),
}

impl Phase {
    /// Outcome if this phase ends a unit
    #[must_use]
    pub const fn outcome(self) -> Option<Outcome> {
        match self {
            Self::Terminal(o) | Self::Point(o) => Some(o),
            _ => None,
        }
    }

    /// Whether this phase begins a (new) attempt
    #[must_use]
    pub const fn begins_attempt(self) -> bool {
        matches!(self, Self::Scheduled | Self::Started)
    }
}

/// Closed, classified event kind with kind-specific identity fields
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// Workflow lifecycle event
    Workflow {
        /// Phase within the run
        phase: Phase,
        /// Workflow type name
        workflow_type: Option<String>,
    },
    /// Workflow task event
    WorkflowTask {
        /// Phase within the task
        phase: Phase,
    },
    /// Activity event
    Activity {
        /// Phase within the attempt
        phase: Phase,
        /// Activity id
        activity_id: Option<String>,
        /// Activity type name
        activity_type: Option<String>,
    },
    /// Timer event
    Timer {
        /// Phase within the timer
        phase: Phase,
        /// Timer id
        timer_id: Option<String>,
    },
    /// Child workflow event
    ChildWorkflow {
        /// Phase within the attempt
        phase: Phase,
        /// Child workflow id
        workflow_id: Option<String>,
        /// Child workflow type name
        workflow_type: Option<String>,
    },
    /// Signal event
    Signal {
        /// Phase within the signal
        phase: Phase,
        /// Signal name
        signal_name: Option<String>,
    },
    /// Anything else (markers, search attributes, updates...)
    Other,
}

impl EventKind {
    /// Unit kind this event belongs to, `None` for [`EventKind::Other`]
    #[must_use]
    pub const fn unit_kind(&self) -> Option<UnitKind> {
        match self {
            Self::Workflow { .. } => Some(UnitKind::Workflow),
            Self::WorkflowTask { .. } => Some(UnitKind::WorkflowTask),
            Self::Activity { .. } => Some(UnitKind::Activity),
            Self::Timer { .. } => Some(UnitKind::Timer),
            Self::ChildWorkflow { .. } => Some(UnitKind::ChildWorkflow),
            Self::Signal { .. } => Some(UnitKind::Signal),
            Self::Other => None,
        }
    }

    /// Lifecycle phase, `None` for [`EventKind::Other`]
    #[must_use]
    pub const fn phase(&self) -> Option<Phase> {
        match self {
            Self::Workflow { phase, .. }
            | Self::WorkflowTask { phase }
            | Self::Activity { phase, .. }
            | Self::Timer { phase, .. }
            | Self::ChildWorkflow { phase, .. }
            | Self::Signal { phase, .. } => Some(*phase),
            Self::Other => None,
        }
    }

    /// Identity of the unit of work (activity id, timer id, child id, signal name)
    #[must_use]
    pub fn identity(&self) -> Option<&str> {
        match self {
            Self::Activity { activity_id, .. } => activity_id.as_deref(),
            Self::Timer { timer_id, .. } => timer_id.as_deref(),
            Self::ChildWorkflow { workflow_id, .. } => workflow_id.as_deref(),
            Self::Signal { signal_name, .. } => signal_name.as_deref(),
            _ => None,
        }
    }

    /// Type name of the unit of work (activity type, workflow type)
    #[must_use]
    pub fn type_name(&self) -> Option<&str> {
        match self {
            Self::Workflow { workflow_type, .. } => workflow_type.as_deref(),
            Self::Activity { activity_type, .. } => activity_type.as_deref(),
            Self::ChildWorkflow { workflow_type, .. } => workflow_type.as_deref(),
            _ => None,
        }
    }

    /// Whether this event ends its unit
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.phase().and_then(Phase::outcome).is_some()
    }
}

/// Normalize `EVENT_TYPE_ACTIVITY_TASK_SCHEDULED` to `ActivityTaskScheduled`.
///
/// CamelCase names pass through unchanged.
#[must_use]
pub fn normalize_kind_name(name: &str) -> String {
    let name = name.trim();
    let Some(rest) = name.strip_prefix("EVENT_TYPE_") else {
        return name.to_string();
    };
    rest.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let lower = part.to_ascii_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// Classify a normalized kind name into its unit kind and phase
#[must_use]
pub fn classify(name: &str) -> Option<(UnitKind, Phase)> {
    use Outcome::*;
    use Phase::*;
    use UnitKind::*;

    // Legacy decision task spelling
    if let Some(rest) = name.strip_prefix("DecisionTask") {
        return classify(&format!("WorkflowTask{rest}"));
    }

    let classified = match name {
        "WorkflowExecutionStarted" => (Workflow, Scheduled),
        "WorkflowExecutionCompleted" => (Workflow, Terminal(Completed)),
        "WorkflowExecutionFailed" => (Workflow, Terminal(Failed)),
        "WorkflowExecutionTimedOut" => (Workflow, Terminal(TimedOut)),
        "WorkflowExecutionCanceled" => (Workflow, Terminal(Canceled)),
        "WorkflowExecutionTerminated" => (Workflow, Terminal(Terminated)),
        "WorkflowExecutionContinuedAsNew" => (Workflow, Terminal(ContinuedAsNew)),
        "WorkflowExecutionCancelRequested" => (Workflow, Requested),

        "WorkflowTaskScheduled" => (WorkflowTask, Scheduled),
        "WorkflowTaskStarted" => (WorkflowTask, Started),
        "WorkflowTaskCompleted" => (WorkflowTask, Terminal(Completed)),
        "WorkflowTaskFailed" => (WorkflowTask, Terminal(Failed)),
        "WorkflowTaskTimedOut" => (WorkflowTask, Terminal(TimedOut)),

        "ActivityTaskScheduled" => (Activity, Scheduled),
        "ActivityTaskStarted" => (Activity, Started),
        "ActivityTaskCompleted" => (Activity, Terminal(Completed)),
        "ActivityTaskFailed" => (Activity, Terminal(Failed)),
        "ActivityTaskTimedOut" => (Activity, Terminal(TimedOut)),
        "ActivityTaskCanceled" => (Activity, Terminal(Canceled)),
        "ActivityTaskCancelRequested" | "RequestCancelActivityTaskFailed" => (Activity, Requested),

        "TimerStarted" => (Timer, Scheduled),
        "TimerFired" => (Timer, Terminal(Fired)),
        "TimerCanceled" => (Timer, Terminal(Canceled)),
        "CancelTimerFailed" => (Timer, Requested),

        "StartChildWorkflowExecutionInitiated" => (ChildWorkflow, Scheduled),
        "StartChildWorkflowExecutionFailed" => (ChildWorkflow, Terminal(Failed)),
        "ChildWorkflowExecutionStarted" => (ChildWorkflow, Started),
        "ChildWorkflowExecutionCompleted" => (ChildWorkflow, Terminal(Completed)),
        "ChildWorkflowExecutionFailed" => (ChildWorkflow, Terminal(Failed)),
        "ChildWorkflowExecutionTimedOut" => (ChildWorkflow, Terminal(TimedOut)),
        "ChildWorkflowExecutionCanceled" => (ChildWorkflow, Terminal(Canceled)),
        "ChildWorkflowExecutionTerminated" => (ChildWorkflow, Terminal(Terminated)),

        "WorkflowExecutionSignaled" => (Signal, Point(Signaled)),
        "SignalExternalWorkflowExecutionInitiated" => (Signal, Scheduled),
        "ExternalWorkflowExecutionSignaled" => (Signal, Terminal(Signaled)),
        "SignalExternalWorkflowExecutionFailed" => (Signal, Terminal(Failed)),

        _ => return None,
    };
    Some(classified)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_proto_names() {
        assert_eq!(
            normalize_kind_name("EVENT_TYPE_ACTIVITY_TASK_SCHEDULED"),
            "ActivityTaskScheduled"
        );
        assert_eq!(normalize_kind_name("EVENT_TYPE_TIMER_FIRED"), "TimerFired");
        assert_eq!(normalize_kind_name("TimerFired"), "TimerFired");
    }

    #[test]
    fn test_classify_activity_lifecycle() {
        assert_eq!(
            classify("ActivityTaskScheduled"),
            Some((UnitKind::Activity, Phase::Scheduled))
        );
        assert_eq!(
            classify("ActivityTaskTimedOut"),
            Some((UnitKind::Activity, Phase::Terminal(Outcome::TimedOut)))
        );
        assert_eq!(
            classify("ActivityTaskCancelRequested"),
            Some((UnitKind::Activity, Phase::Requested))
        );
    }

    #[test]
    fn test_classify_legacy_decision_task() {
        assert_eq!(
            classify("DecisionTaskCompleted"),
            Some((UnitKind::WorkflowTask, Phase::Terminal(Outcome::Completed)))
        );
    }

    #[test]
    fn test_classify_signal_point() {
        let (kind, phase) = classify("WorkflowExecutionSignaled").unwrap();
        assert_eq!(kind, UnitKind::Signal);
        assert_eq!(phase.outcome(), Some(Outcome::Signaled));
        assert!(!phase.begins_attempt());
    }

    #[test]
    fn test_classify_unknown_is_none() {
        assert_eq!(classify("MarkerRecorded"), None);
        assert_eq!(classify(""), None);
    }

    #[test]
    fn test_unit_kind_flags() {
        assert!(UnitKind::Activity.supports_retry());
        assert!(UnitKind::ChildWorkflow.supports_retry());
        assert!(!UnitKind::Timer.supports_retry());
        assert!(UnitKind::WorkflowTask.is_structural());
        assert!(!UnitKind::Signal.is_structural());
    }

    #[test]
    fn test_event_kind_accessors() {
        let kind = EventKind::Activity {
            phase: Phase::Terminal(Outcome::Failed),
            activity_id: Some("a1".into()),
            activity_type: Some("Charge".into()),
        };
        assert_eq!(kind.unit_kind(), Some(UnitKind::Activity));
        assert_eq!(kind.identity(), Some("a1"));
        assert_eq!(kind.type_name(), Some("Charge"));
        assert!(kind.is_terminal());
        assert!(!EventKind::Other.is_terminal());
    }
}
