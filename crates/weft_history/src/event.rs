//! History event types.
//!
//! [`EventRecord`] is the flat wire/export shape. It converts into a
//! [`CorrelatedEvent`], which is what the grouping pipeline consumes.

use crate::kind::{EventKind, Phase, UnitKind, classify, normalize_kind_name};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use weft_core::{EventId, Timestamp};

/// One immutable, timestamped record of a run's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Position in the log, strictly increasing within a run
    pub id: EventId,
    /// Kind tag as recorded by the service
    pub kind: String,
    /// When the event was recorded
    pub timestamp: Timestamp,
    /// Free-form attributes
    #[serde(default)]
    pub details: IndexMap<String, serde_json::Value>,
}

/// Back-references to earlier events this one continues
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRefs {
    /// The scheduling event (activities, workflow tasks)
    pub scheduled: Option<EventId>,
    /// The start event (terminal events, timer fired)
    pub started: Option<EventId>,
    /// The initiating event (child workflows, external signals)
    pub initiated: Option<EventId>,
    /// The workflow-task completion that emitted this command
    pub task_completed: Option<EventId>,
}

impl EventRefs {
    /// All present references, in resolution priority order
    pub fn iter(&self) -> impl Iterator<Item = EventId> + '_ {
        [self.scheduled, self.initiated, self.started]
            .into_iter()
            .flatten()
    }

    /// Whether no reference is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scheduled.is_none()
            && self.started.is_none()
            && self.initiated.is_none()
            && self.task_completed.is_none()
    }

    /// Drop references that do not point strictly backwards
    fn retain_causal(&mut self, own: EventId) -> usize {
        let mut dropped = 0;
        for slot in [
            &mut self.scheduled,
            &mut self.started,
            &mut self.initiated,
            &mut self.task_completed,
        ] {
            if slot.is_some_and(|r| !r.precedes(own)) {
                *slot = None;
                dropped += 1;
            }
        }
        dropped
    }
}

/// A history event with its back-references and classified kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "EventRecord", into = "EventRecord")]
pub struct CorrelatedEvent {
    /// The raw event
    pub raw: RawEvent,
    /// Kind, classified at ingestion
    pub kind: EventKind,
    /// Back-references
    pub refs: EventRefs,
    /// Attempt number reported by the service
    pub attempt: Option<u32>,
    /// Result payload
    pub result: Option<String>,
    /// Failure payload
    pub failure: Option<String>,
}

impl CorrelatedEvent {
    /// Event id
    #[must_use]
    pub fn id(&self) -> EventId {
        self.raw.id
    }

    /// Event timestamp
    #[must_use]
    pub fn timestamp(&self) -> Timestamp {
        self.raw.timestamp
    }

    /// Kind tag as recorded
    #[must_use]
    pub fn kind_name(&self) -> &str {
        &self.raw.kind
    }

    /// Unit kind, `None` for unclassified events
    #[must_use]
    pub fn unit_kind(&self) -> Option<UnitKind> {
        self.kind.unit_kind()
    }

    /// Lifecycle phase, `None` for unclassified events
    #[must_use]
    pub fn phase(&self) -> Option<Phase> {
        self.kind.phase()
    }
}

/// Event id as number or numeric string
#[derive(Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Num(i64),
    Text(String),
}

fn de_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<EventId, D::Error> {
    match IdRepr::deserialize(deserializer)? {
        IdRepr::Num(n) => Ok(EventId::new(n)),
        IdRepr::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

fn de_opt_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<EventId>, D::Error> {
    match Option::<IdRepr>::deserialize(deserializer)? {
        None => Ok(None),
        // Zero is the service's "unset" value
        Some(IdRepr::Num(0)) => Ok(None),
        Some(IdRepr::Num(n)) => Ok(Some(EventId::new(n))),
        Some(IdRepr::Text(s)) if s.trim().is_empty() || s.trim() == "0" => Ok(None),
        Some(IdRepr::Text(s)) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Flat wire shape of one history event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    /// Event id
    #[serde(alias = "eventId", deserialize_with = "de_id")]
    pub id: EventId,
    /// Kind tag
    #[serde(alias = "eventType")]
    pub kind: String,
    /// Timestamp
    #[serde(alias = "eventTime")]
    pub timestamp: Timestamp,
    /// Scheduling back-reference
    #[serde(default, alias = "scheduledEventId", deserialize_with = "de_opt_id", skip_serializing_if = "Option::is_none")]
    pub scheduled_ref: Option<EventId>,
    /// Start back-reference
    #[serde(default, alias = "startedEventId", deserialize_with = "de_opt_id", skip_serializing_if = "Option::is_none")]
    pub started_ref: Option<EventId>,
    /// Initiation back-reference
    #[serde(default, alias = "initiatedEventId", deserialize_with = "de_opt_id", skip_serializing_if = "Option::is_none")]
    pub initiated_ref: Option<EventId>,
    /// Emitting workflow-task completion
    #[serde(default, alias = "workflowTaskCompletedEventId", deserialize_with = "de_opt_id", skip_serializing_if = "Option::is_none")]
    pub task_completed_ref: Option<EventId>,
    /// Activity id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_id: Option<String>,
    /// Activity type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_type: Option<String>,
    /// Timer id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timer_id: Option<String>,
    /// Child workflow id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_workflow_id: Option<String>,
    /// Child workflow type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_workflow_type: Option<String>,
    /// Workflow type of the run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_type: Option<String>,
    /// Signal name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal_name: Option<String>,
    /// Attempt number
    #[serde(default, alias = "attempt", skip_serializing_if = "Option::is_none")]
    pub attempt_number: Option<u32>,
    /// Result payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    /// Failure payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    /// Free-form attributes
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub details: IndexMap<String, serde_json::Value>,
}

impl EventRecord {
    /// Create a record with no references or attributes
    #[must_use]
    pub fn new(id: i64, kind: impl Into<String>, timestamp: Timestamp) -> Self {
        Self {
            id: EventId::new(id),
            kind: kind.into(),
            timestamp,
            scheduled_ref: None,
            started_ref: None,
            initiated_ref: None,
            task_completed_ref: None,
            activity_id: None,
            activity_type: None,
            timer_id: None,
            child_workflow_id: None,
            child_workflow_type: None,
            workflow_type: None,
            signal_name: None,
            attempt_number: None,
            result: None,
            failure: None,
            details: IndexMap::new(),
        }
    }

    /// Set the scheduling back-reference
    #[must_use]
    pub fn scheduled(mut self, id: i64) -> Self {
        self.scheduled_ref = Some(EventId::new(id));
        self
    }

    /// Set the start back-reference
    #[must_use]
    pub fn started(mut self, id: i64) -> Self {
        self.started_ref = Some(EventId::new(id));
        self
    }

    /// Set the initiation back-reference
    #[must_use]
    pub fn initiated(mut self, id: i64) -> Self {
        self.initiated_ref = Some(EventId::new(id));
        self
    }

    /// Set the emitting workflow-task completion
    #[must_use]
    pub fn task_completed(mut self, id: i64) -> Self {
        self.task_completed_ref = Some(EventId::new(id));
        self
    }

    /// Set workflow type
    #[must_use]
    pub fn workflow(mut self, workflow_type: &str) -> Self {
        self.workflow_type = Some(workflow_type.to_string());
        self
    }

    /// Set activity identity
    #[must_use]
    pub fn activity(mut self, activity_id: &str, activity_type: &str) -> Self {
        self.activity_id = Some(activity_id.to_string());
        self.activity_type = Some(activity_type.to_string());
        self
    }

    /// Set timer identity
    #[must_use]
    pub fn timer(mut self, timer_id: &str) -> Self {
        self.timer_id = Some(timer_id.to_string());
        self
    }

    /// Set child workflow identity
    #[must_use]
    pub fn child(mut self, workflow_id: &str, workflow_type: &str) -> Self {
        self.child_workflow_id = Some(workflow_id.to_string());
        self.child_workflow_type = Some(workflow_type.to_string());
        self
    }

    /// Set signal name
    #[must_use]
    pub fn signal(mut self, name: &str) -> Self {
        self.signal_name = Some(name.to_string());
        self
    }

    /// Set attempt number
    #[must_use]
    pub fn attempt(mut self, attempt: u32) -> Self {
        self.attempt_number = Some(attempt);
        self
    }

    /// Set failure payload
    #[must_use]
    pub fn failure(mut self, failure: &str) -> Self {
        self.failure = Some(failure.to_string());
        self
    }

    /// Set result payload
    #[must_use]
    pub fn result(mut self, result: &str) -> Self {
        self.result = Some(result.to_string());
        self
    }

    /// Classify and convert
    #[must_use]
    pub fn into_event(self) -> CorrelatedEvent {
        self.into()
    }
}

impl From<EventRecord> for CorrelatedEvent {
    fn from(record: EventRecord) -> Self {
        let normalized = normalize_kind_name(&record.kind);
        let kind = match classify(&normalized) {
            None => EventKind::Other,
            Some((UnitKind::Workflow, phase)) => EventKind::Workflow {
                phase,
                workflow_type: record.workflow_type.clone(),
            },
            Some((UnitKind::WorkflowTask, phase)) => EventKind::WorkflowTask { phase },
            Some((UnitKind::Activity, phase)) => EventKind::Activity {
                phase,
                activity_id: record.activity_id.clone(),
                activity_type: record.activity_type.clone(),
            },
            Some((UnitKind::Timer, phase)) => EventKind::Timer {
                phase,
                timer_id: record.timer_id.clone(),
            },
            Some((UnitKind::ChildWorkflow, phase)) => EventKind::ChildWorkflow {
                phase,
                workflow_id: record.child_workflow_id.clone(),
                workflow_type: record.child_workflow_type.clone(),
            },
            Some((UnitKind::Signal, phase)) => EventKind::Signal {
                phase,
                signal_name: record.signal_name.clone(),
            },
        };

        let mut refs = EventRefs {
            scheduled: record.scheduled_ref,
            started: record.started_ref,
            initiated: record.initiated_ref,
            task_completed: record.task_completed_ref,
        };
        let dropped = refs.retain_causal(record.id);
        if dropped > 0 {
            tracing::debug!(event = %record.id, dropped, "dropped non-causal back-references");
        }

        Self {
            raw: RawEvent {
                id: record.id,
                kind: normalized,
                timestamp: record.timestamp,
                details: record.details,
            },
            kind,
            refs,
            attempt: record.attempt_number,
            result: record.result,
            failure: record.failure,
        }
    }
}

impl From<CorrelatedEvent> for EventRecord {
    fn from(event: CorrelatedEvent) -> Self {
        let mut record = EventRecord::new(event.raw.id.as_i64(), event.raw.kind, event.raw.timestamp);
        record.scheduled_ref = event.refs.scheduled;
        record.started_ref = event.refs.started;
        record.initiated_ref = event.refs.initiated;
        record.task_completed_ref = event.refs.task_completed;
        record.attempt_number = event.attempt;
        record.result = event.result;
        record.failure = event.failure;
        record.details = event.raw.details;
        match event.kind {
            EventKind::Workflow { workflow_type, .. } => record.workflow_type = workflow_type,
            EventKind::Activity {
                activity_id,
                activity_type,
                ..
            } => {
                record.activity_id = activity_id;
                record.activity_type = activity_type;
            }
            EventKind::Timer { timer_id, .. } => record.timer_id = timer_id,
            EventKind::ChildWorkflow {
                workflow_id,
                workflow_type,
                ..
            } => {
                record.child_workflow_id = workflow_id;
                record.child_workflow_type = workflow_type;
            }
            EventKind::Signal { signal_name, .. } => record.signal_name = signal_name,
            EventKind::WorkflowTask { .. } | EventKind::Other => {}
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::Outcome;

    fn ts(ms: i64) -> Timestamp {
        Timestamp::from_unix_millis(ms)
    }

    #[test]
    fn test_record_classifies_activity() {
        let event = EventRecord::new(5, "ActivityTaskScheduled", ts(0))
            .activity("a1", "Charge")
            .task_completed(4)
            .into_event();
        assert_eq!(event.unit_kind(), Some(UnitKind::Activity));
        assert_eq!(event.phase(), Some(Phase::Scheduled));
        assert_eq!(event.kind.identity(), Some("a1"));
        assert_eq!(event.refs.task_completed, Some(EventId::new(4)));
    }

    #[test]
    fn test_record_normalizes_proto_kind() {
        let event = EventRecord::new(7, "EVENT_TYPE_TIMER_FIRED", ts(0))
            .started(6)
            .into_event();
        assert_eq!(event.kind_name(), "TimerFired");
        assert_eq!(event.phase(), Some(Phase::Terminal(Outcome::Fired)));
    }

    #[test]
    fn test_unknown_kind_is_other() {
        let event = EventRecord::new(3, "MarkerRecorded", ts(0)).into_event();
        assert_eq!(event.kind, EventKind::Other);
        assert_eq!(event.unit_kind(), None);
    }

    #[test]
    fn test_forward_refs_are_dropped() {
        let event = EventRecord::new(5, "ActivityTaskStarted", ts(0))
            .scheduled(5)
            .started(9)
            .into_event();
        assert!(event.refs.is_empty());
    }

    #[test]
    fn test_refs_iter_priority() {
        let refs = EventRefs {
            scheduled: Some(EventId::new(2)),
            started: Some(EventId::new(3)),
            initiated: None,
            task_completed: Some(EventId::new(1)),
        };
        let ids: Vec<_> = refs.iter().collect();
        assert_eq!(ids, vec![EventId::new(2), EventId::new(3)]);
    }

    #[test]
    fn test_deserialize_service_export_shape() {
        let json = r#"{
            "eventId": "12",
            "eventType": "EVENT_TYPE_ACTIVITY_TASK_COMPLETED",
            "eventTime": "2024-03-01T10:00:03Z",
            "scheduledEventId": "10",
            "startedEventId": 11,
            "initiatedEventId": "0",
            "result": "ok"
        }"#;
        let event: CorrelatedEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.id(), EventId::new(12));
        assert_eq!(event.refs.scheduled, Some(EventId::new(10)));
        assert_eq!(event.refs.started, Some(EventId::new(11)));
        assert_eq!(event.refs.initiated, None);
        assert_eq!(event.result.as_deref(), Some("ok"));
        assert_eq!(event.phase(), Some(Phase::Terminal(Outcome::Completed)));
    }

    #[test]
    fn test_serialize_keeps_identity() {
        let event = EventRecord::new(2, "StartChildWorkflowExecutionInitiated", ts(0))
            .child("child-1", "Shipping")
            .into_event();
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["childWorkflowId"], "child-1");
        assert_eq!(value["childWorkflowType"], "Shipping");
        assert_eq!(value["kind"], "StartChildWorkflowExecutionInitiated");
    }
}
