//! Correlator: resolves back-references against an arena of events.
//!
//! Events are stored once, in log order, and addressed by arena index. A
//! reference that names an id missing from the log (truncated fetch) or an
//! event that does not precede the referrer is a correlation miss; the event
//! is kept and the grouper opens a standalone unit for it.

use std::collections::HashMap;
use weft_core::EventId;
use weft_history::CorrelatedEvent;

/// Events of one run, in log order, indexed by id
#[derive(Debug, Clone, Default)]
pub struct EventArena {
    events: Vec<CorrelatedEvent>,
    by_id: HashMap<EventId, usize>,
}

impl EventArena {
    /// Build the arena; duplicate ids keep their first occurrence in the index
    #[must_use]
    pub fn new(events: Vec<CorrelatedEvent>) -> Self {
        let mut by_id = HashMap::with_capacity(events.len());
        for (index, event) in events.iter().enumerate() {
            by_id.entry(event.id()).or_insert(index);
        }
        Self { events, by_id }
    }

    /// Number of events
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the log is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Event at an arena index
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&CorrelatedEvent> {
        self.events.get(index)
    }

    /// Arena index of an event id
    #[must_use]
    pub fn index_of(&self, id: EventId) -> Option<usize> {
        self.by_id.get(&id).copied()
    }

    /// All events in log order
    #[must_use]
    pub fn events(&self) -> &[CorrelatedEvent] {
        &self.events
    }

    /// Give back the events, in log order
    #[must_use]
    pub fn into_events(self) -> Vec<CorrelatedEvent> {
        self.events
    }

    /// Resolve `id` as a reference made by the event at `from`
    fn resolve_from(&self, from: usize, id: EventId) -> Option<usize> {
        self.index_of(id).filter(|&target| target < from)
    }
}

/// How an event's back-references resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The event carries no back-reference
    Unreferenced,
    /// Every reference resolved to an earlier event
    Resolved(Vec<EventId>),
    /// At least one reference names an id absent from the log
    Dangling(Vec<EventId>),
}

/// What an event continues
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Correlation {
    /// Earlier events continued through scheduled/initiated/started refs, in that priority order
    pub continues: Vec<usize>,
    /// The workflow-task completion that emitted this event, if resolvable
    pub context: Option<usize>,
    /// References that could not be resolved
    pub dangling: Vec<EventId>,
}

impl Correlation {
    /// Whether the event carried references and none of them resolved
    #[must_use]
    pub fn is_miss(&self) -> bool {
        self.continues.is_empty() && !self.dangling.is_empty()
    }

    /// Summarize against the arena the correlation was computed from
    #[must_use]
    pub fn resolution(&self, arena: &EventArena) -> Resolution {
        if !self.dangling.is_empty() {
            return Resolution::Dangling(self.dangling.clone());
        }
        let resolved: Vec<EventId> = self
            .continues
            .iter()
            .chain(self.context.iter())
            .filter_map(|&index| arena.get(index).map(CorrelatedEvent::id))
            .collect();
        if resolved.is_empty() {
            Resolution::Unreferenced
        } else {
            Resolution::Resolved(resolved)
        }
    }
}

/// Resolve every event's back-references; one entry per arena index
#[must_use]
pub fn correlate(arena: &EventArena) -> Vec<Correlation> {
    let mut dangling_total = 0usize;
    let correlations: Vec<Correlation> = arena
        .events()
        .iter()
        .enumerate()
        .map(|(index, event)| {
            let mut correlation = Correlation::default();
            for id in event.refs.iter() {
                match arena.resolve_from(index, id) {
                    Some(target) if !correlation.continues.contains(&target) => {
                        correlation.continues.push(target);
                    }
                    Some(_) => {}
                    None => correlation.dangling.push(id),
                }
            }
            if let Some(id) = event.refs.task_completed {
                correlation.context = arena.resolve_from(index, id);
                if correlation.context.is_none() {
                    correlation.dangling.push(id);
                }
            }
            dangling_total += correlation.dangling.len();
            correlation
        })
        .collect();

    if dangling_total > 0 {
        tracing::debug!(dangling = dangling_total, events = arena.len(), "unresolved back-references");
    }
    correlations
}
