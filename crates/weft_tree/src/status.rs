//! Status, timing, attempts and naming derived from a unit's member events.

use crate::unit::UnitStatus;
use std::collections::BTreeSet;
use weft_core::Timestamp;
use weft_history::{CorrelatedEvent, Outcome, Phase, UnitKind};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Derived {
    pub status: UnitStatus,
    pub start_time: Timestamp,
    pub end_time: Option<Timestamp>,
    pub attempts: u32,
    pub display_name: String,
    pub identity: Option<String>,
}

/// Outcome of the last attempt, or `None` if a new attempt began after it.
/// `members` must be in log order.
pub(crate) fn last_outcome<'a>(
    members: impl IntoIterator<Item = &'a CorrelatedEvent>,
) -> Option<(Outcome, Timestamp)> {
    let mut last = None;
    for event in members {
        match event.phase() {
            Some(phase) if phase.begins_attempt() => last = None,
            Some(phase) => {
                if let Some(outcome) = phase.outcome() {
                    last = Some((outcome, event.timestamp()));
                }
            }
            None => {}
        }
    }
    last
}

fn opens_unit(event: &CorrelatedEvent) -> bool {
    matches!(event.phase(), Some(Phase::Scheduled | Phase::Point(_)))
}

/// Distinct attempt numbers on Started events; an unnumbered Started event
/// counts as its ordinal among them.
pub(crate) fn count_attempts(members: &[&CorrelatedEvent]) -> u32 {
    let attempts: BTreeSet<u32> = members
        .iter()
        .filter(|e| e.phase() == Some(Phase::Started))
        .zip(1u32..)
        .map(|(event, ordinal)| event.attempt.unwrap_or(ordinal))
        .collect();
    u32::try_from(attempts.len()).unwrap_or(u32::MAX).max(1)
}

fn display_name(kind: UnitKind, identity: Option<&str>, type_name: Option<&str>) -> String {
    match kind {
        UnitKind::Workflow => type_name.unwrap_or("Workflow").to_string(),
        UnitKind::WorkflowTask => kind.label().to_string(),
        UnitKind::Activity | UnitKind::ChildWorkflow => type_name
            .or(identity)
            .unwrap_or(kind.label())
            .to_string(),
        UnitKind::Timer | UnitKind::Signal => match identity {
            Some(id) => format!("{} {id}", kind.label()),
            None => kind.label().to_string(),
        },
    }
}

/// Derive everything about a unit from its members, given in log order.
/// `fallback_start` is used only when `members` is empty.
pub(crate) fn derive(kind: UnitKind, members: &[&CorrelatedEvent], fallback_start: Timestamp) -> Derived {
    let start_time = members
        .iter()
        .filter(|e| opens_unit(e))
        .map(|e| e.timestamp())
        .min()
        .or_else(|| members.iter().map(|e| e.timestamp()).min())
        .unwrap_or(fallback_start);

    let (status, end_time) = match last_outcome(members.iter().copied()) {
        Some((outcome, at)) => (UnitStatus::from(outcome), Some(at)),
        None => (UnitStatus::Running, None),
    };

    let attempts = if kind.supports_retry() {
        count_attempts(members)
    } else {
        1
    };

    let identity = members.iter().find_map(|e| e.kind.identity());
    let type_name = members.iter().find_map(|e| e.kind.type_name());

    Derived {
        status,
        start_time,
        end_time,
        attempts,
        display_name: display_name(kind, identity, type_name),
        identity: identity.map(str::to_string),
    }
}
