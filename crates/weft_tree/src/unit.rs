//! Logical units: the nodes of the rebuilt forest.

use serde::Serialize;
use weft_core::{Duration, EventId, Timestamp};
use weft_history::{CorrelatedEvent, Outcome, UnitKind};

/// Stable identity of a unit across rebuilds of the same log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct UnitKey {
    /// Unit kind
    pub kind: UnitKind,
    /// Id of the event that opened the unit
    pub anchor: EventId,
}

impl UnitKey {
    /// Create a key
    #[must_use]
    pub const fn new(kind: UnitKind, anchor: EventId) -> Self {
        Self { kind, anchor }
    }
}

impl std::fmt::Display for UnitKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.kind, self.anchor)
    }
}

/// Derived status of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum UnitStatus {
    /// No terminal event yet, or a new attempt followed the last one
    Running,
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
    /// Continued as a new run
    ContinuedAsNew,
    /// Signal delivered
    Signaled,
}

impl UnitStatus {
    /// Whether the unit is still in flight
    #[must_use]
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }

    /// Whether the status is an error outcome
    #[must_use]
    pub const fn is_error(self) -> bool {
        matches!(self, Self::Failed | Self::TimedOut | Self::Terminated)
    }

    /// Status label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Running => "Running",
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

impl From<Outcome> for UnitStatus {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Completed => Self::Completed,
            Outcome::Failed => Self::Failed,
            Outcome::TimedOut => Self::TimedOut,
            Outcome::Canceled => Self::Canceled,
            Outcome::Terminated => Self::Terminated,
            Outcome::Fired => Self::Fired,
            Outcome::ContinuedAsNew => Self::ContinuedAsNew,
            Outcome::Signaled => Self::Signaled,
        }
    }
}

impl std::fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Duration of a unit: closed span or still open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnitDuration {
    /// No end yet
    Running,
    /// Closed span, never negative
    Finished(Duration),
}

impl UnitDuration {
    /// Closed span, if any
    #[must_use]
    pub const fn finished(self) -> Option<Duration> {
        match self {
            Self::Running => None,
            Self::Finished(d) => Some(d),
        }
    }
}

impl std::fmt::Display for UnitDuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => f.write_str("running"),
            Self::Finished(d) => write!(f, "{d}"),
        }
    }
}

/// A group of causally related events, with its nested children
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogicalUnit {
    /// Identity across rebuilds
    pub key: UnitKey,
    /// Unit kind
    pub kind: UnitKind,
    /// Human name
    pub display_name: String,
    /// Activity id, timer id, child workflow id or signal name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    /// Derived status
    pub status: UnitStatus,
    /// Earliest scheduling event in the group
    pub start_time: Timestamp,
    /// Terminal event time; absent while running
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<Timestamp>,
    /// Number of attempts, at least one
    pub attempts: u32,
    /// Member events, ordered by id
    pub member_events: Vec<CorrelatedEvent>,
    /// Nested units, chronological
    pub children: Vec<LogicalUnit>,
    /// Presentation flag, toggled by the consumer
    pub collapsed: bool,
}

impl LogicalUnit {
    /// Span from start to end, or open-ended
    #[must_use]
    pub fn duration(&self) -> UnitDuration {
        match self.end_time {
            Some(end) => UnitDuration::Finished(end.duration_since(&self.start_time)),
            None => UnitDuration::Running,
        }
    }

    /// Time elapsed so far, measured against `now` while still running
    #[must_use]
    pub fn elapsed(&self, now: Timestamp) -> Duration {
        self.end_time.unwrap_or(now).duration_since(&self.start_time)
    }

    /// Whether the unit is still in flight
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.end_time.is_none()
    }

    /// Whether the unit has nested units
    #[must_use]
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Number of events in this unit and all descendants
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.member_events.len()
            + self
                .children
                .iter()
                .map(LogicalUnit::event_count)
                .sum::<usize>()
    }

    /// The event that opened the unit
    #[must_use]
    pub fn anchor_event(&self) -> Option<&CorrelatedEvent> {
        self.member_events.iter().find(|e| e.id() == self.key.anchor)
    }
}
