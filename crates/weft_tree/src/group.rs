//! Grouper: one forward pass assigning every event to a unit under construction.

use crate::correlate::{Correlation, EventArena};
use weft_history::{Phase, UnitKind};

/// A unit under construction, addressed by its index in [`Grouping::units`]
#[derive(Debug, Clone)]
pub(crate) struct UnitBuilder {
    pub kind: UnitKind,
    /// Arena index of the opening event
    pub anchor: usize,
    /// Arena indices of member events
    pub members: Vec<usize>,
    /// Always a lower index than this unit's
    pub parent: Option<usize>,
    /// Opened by a correlation miss
    pub standalone: bool,
    /// Folded into an earlier unit
    pub absorbed: bool,
}

impl UnitBuilder {
    pub fn is_live(&self) -> bool {
        !self.absorbed
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Grouping {
    pub units: Vec<UnitBuilder>,
    pub misses: usize,
}

impl Grouping {
    fn open(&mut self, kind: UnitKind, anchor: usize, parent: Option<usize>, standalone: bool) -> usize {
        self.units.push(UnitBuilder {
            kind,
            anchor,
            members: vec![anchor],
            parent,
            standalone,
            absorbed: false,
        });
        self.units.len() - 1
    }

    fn join(&mut self, unit: usize, event: usize) {
        self.units[unit].members.push(event);
    }
}

/// Group events into units. `correlations` has one entry per arena index.
pub(crate) fn group(arena: &EventArena, correlations: &[Correlation]) -> Grouping {
    let mut grouping = Grouping::default();
    // arena index -> unit index
    let mut owner: Vec<Option<usize>> = vec![None; arena.len()];
    let mut workflow: Option<usize> = None;
    let mut in_flight_task: Option<usize> = None;
    let unresolved = Correlation::default();

    for (index, event) in arena.events().iter().enumerate() {
        let correlation = correlations.get(index).unwrap_or(&unresolved);
        let context = correlation.context.and_then(|target| owner[target]);

        let unit = match (event.unit_kind(), event.phase()) {
            (Some(kind), Some(phase)) if kind != UnitKind::Workflow => match phase {
                Phase::Scheduled => grouping.open(kind, index, context, false),
                Phase::Point(_) => grouping.open(kind, index, context.or(in_flight_task), false),
                Phase::Started | Phase::Requested | Phase::Terminal(_) => {
                    let target = correlation
                        .continues
                        .iter()
                        .filter_map(|&target| owner[target])
                        .find(|&unit| grouping.units[unit].kind == kind);
                    match target {
                        Some(unit) => {
                            grouping.join(unit, index);
                            unit
                        }
                        None => {
                            tracing::debug!(
                                event = %event.id(),
                                kind = event.kind_name(),
                                "no correlation found, opening standalone unit"
                            );
                            grouping.misses += 1;
                            grouping.open(kind, index, None, true)
                        }
                    }
                }
            },
            _ => match workflow {
                Some(unit) => {
                    grouping.join(unit, index);
                    unit
                }
                None => {
                    let unit = grouping.open(UnitKind::Workflow, index, None, false);
                    workflow = Some(unit);
                    unit
                }
            },
        };
        owner[index] = Some(unit);

        if event.unit_kind() == Some(UnitKind::WorkflowTask) {
            match event.phase() {
                Some(Phase::Scheduled | Phase::Started) => in_flight_task = Some(unit),
                Some(Phase::Terminal(_)) if in_flight_task == Some(unit) => in_flight_task = None,
                _ => {}
            }
        }
    }

    grouping
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlate::correlate;
    use weft_core::Timestamp;
    use weft_history::{CorrelatedEvent, EventRecord};

    fn ev(id: i64, kind: &str) -> EventRecord {
        EventRecord::new(id, kind, Timestamp::from_unix_millis(id * 10))
    }

    fn run(events: Vec<CorrelatedEvent>) -> Grouping {
        let arena = EventArena::new(events);
        let correlations = correlate(&arena);
        group(&arena, &correlations)
    }

    #[test]
    fn test_workflow_unit_is_lazy_and_shared() {
        let grouping = run(vec![
            ev(1, "WorkflowExecutionStarted").into_event(),
            ev(2, "MarkerRecorded").into_event(),
            ev(3, "WorkflowExecutionCompleted").into_event(),
        ]);
        assert_eq!(grouping.units.len(), 1);
        assert_eq!(grouping.units[0].kind, UnitKind::Workflow);
        assert_eq!(grouping.units[0].members, vec![0, 1, 2]);
    }

    #[test]
    fn test_command_nests_under_emitting_task() {
        let grouping = run(vec![
            ev(2, "WorkflowTaskScheduled").into_event(),
            ev(3, "WorkflowTaskStarted").scheduled(2).into_event(),
            ev(4, "WorkflowTaskCompleted").scheduled(2).started(3).into_event(),
            ev(5, "ActivityTaskScheduled").activity("a", "Charge").task_completed(4).into_event(),
            ev(6, "ActivityTaskStarted").scheduled(5).into_event(),
        ]);
        assert_eq!(grouping.units.len(), 2);
        assert_eq!(grouping.units[0].members, vec![0, 1, 2]);
        assert_eq!(grouping.units[1].parent, Some(0));
        assert_eq!(grouping.units[1].members, vec![3, 4]);
    }

    #[test]
    fn test_received_signal_attaches_to_in_flight_task() {
        let grouping = run(vec![
            ev(2, "WorkflowTaskScheduled").into_event(),
            ev(3, "WorkflowTaskStarted").scheduled(2).into_event(),
            ev(4, "WorkflowExecutionSignaled").signal("approve").into_event(),
            ev(5, "WorkflowTaskCompleted").scheduled(2).started(3).into_event(),
            ev(6, "WorkflowExecutionSignaled").signal("late").into_event(),
        ]);
        assert_eq!(grouping.units[1].kind, UnitKind::Signal);
        assert_eq!(grouping.units[1].parent, Some(0));
        assert_eq!(grouping.units[2].parent, None);
    }

    #[test]
    fn test_miss_opens_standalone_unit() {
        let grouping = run(vec![
            ev(7, "ActivityTaskStarted").scheduled(5).into_event(),
            ev(8, "ActivityTaskCompleted").scheduled(5).started(7).into_event(),
        ]);
        assert_eq!(grouping.misses, 1);
        assert_eq!(grouping.units.len(), 1);
        assert!(grouping.units[0].standalone);
        assert_eq!(grouping.units[0].members, vec![0, 1]);
    }

    #[test]
    fn test_reference_to_other_kind_is_a_miss() {
        let grouping = run(vec![
            ev(1, "TimerStarted").timer("t").into_event(),
            ev(2, "ActivityTaskStarted").scheduled(1).into_event(),
        ]);
        assert_eq!(grouping.units.len(), 2);
        assert_eq!(grouping.units[1].kind, UnitKind::Activity);
        assert!(grouping.units[1].standalone);
    }
}
