//! The grouping pipeline and the forest it produces.

use crate::correlate::{EventArena, correlate};
use crate::group::group;
use crate::retry::fold_retries;
use crate::status::{Derived, derive};
use crate::unit::{LogicalUnit, UnitKey};
use serde::{Deserialize, Serialize};
use weft_history::CorrelatedEvent;

/// Pipeline options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestOptions {
    /// Units with children at this depth or deeper start collapsed
    pub expand_depth: usize,
}

impl Default for ForestOptions {
    fn default() -> Self {
        Self { expand_depth: 2 }
    }
}

/// Ordered root units of one rebuilt history
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Forest {
    roots: Vec<LogicalUnit>,
}

impl Forest {
    /// Root units, chronological
    #[must_use]
    pub fn roots(&self) -> &[LogicalUnit] {
        &self.roots
    }

    /// Take the root units
    #[must_use]
    pub fn into_roots(self) -> Vec<LogicalUnit> {
        self.roots
    }

    /// Whether the forest has no units
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Number of units at every depth
    #[must_use]
    pub fn unit_count(&self) -> usize {
        self.walk().count()
    }

    /// Number of member events across all units
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.roots.iter().map(LogicalUnit::event_count).sum()
    }

    /// Pre-order traversal of every unit with its depth
    #[must_use]
    pub fn walk(&self) -> Walk<'_> {
        Walk::new(&self.roots, false)
    }

    /// Pre-order traversal that does not descend into collapsed units
    #[must_use]
    pub fn visible(&self) -> Walk<'_> {
        Walk::new(&self.roots, true)
    }

    /// Find a unit by key
    #[must_use]
    pub fn find(&self, key: &UnitKey) -> Option<&LogicalUnit> {
        self.walk().map(|(_, unit)| unit).find(|unit| unit.key == *key)
    }

    /// Find a unit by key, mutably
    pub fn find_mut(&mut self, key: &UnitKey) -> Option<&mut LogicalUnit> {
        fn search<'a>(units: &'a mut [LogicalUnit], key: &UnitKey) -> Option<&'a mut LogicalUnit> {
            for unit in units {
                if unit.key == *key {
                    return Some(unit);
                }
                if let Some(found) = search(&mut unit.children, key) {
                    return Some(found);
                }
            }
            None
        }
        search(&mut self.roots, key)
    }

    /// Flip the collapsed flag of a unit that has children
    pub fn toggle_collapsed(&mut self, key: &UnitKey) -> bool {
        match self.find_mut(key) {
            Some(unit) if unit.has_children() => {
                unit.collapsed = !unit.collapsed;
                true
            }
            _ => false,
        }
    }
}

/// Pre-order iterator over a forest, yielding `(depth, unit)`
#[derive(Debug, Clone)]
pub struct Walk<'a> {
    stack: Vec<(usize, &'a LogicalUnit)>,
    skip_collapsed: bool,
}

impl<'a> Walk<'a> {
    fn new(roots: &'a [LogicalUnit], skip_collapsed: bool) -> Self {
        Self {
            stack: roots.iter().rev().map(|unit| (0, unit)).collect(),
            skip_collapsed,
        }
    }
}

impl<'a> Iterator for Walk<'a> {
    type Item = (usize, &'a LogicalUnit);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, unit) = self.stack.pop()?;
        if !(self.skip_collapsed && unit.collapsed) {
            self.stack
                .extend(unit.children.iter().rev().map(|child| (depth + 1, child)));
        }
        Some((depth, unit))
    }
}

/// Rebuild the forest of logical units from a run's ordered events.
///
/// Every event lands in exactly one unit. Correlation misses open standalone
/// units instead of failing, so this never errors.
#[must_use]
pub fn build_forest(events: Vec<CorrelatedEvent>, options: &ForestOptions) -> Forest {
    let arena = EventArena::new(events);
    let correlations = correlate(&arena);
    let mut grouping = group(&arena, &correlations);
    let folded = fold_retries(&mut grouping, arena.events());

    let derived: Vec<Option<Derived>> = grouping
        .units
        .iter()
        .map(|builder| {
            let anchor = arena.get(builder.anchor).filter(|_| builder.is_live())?;
            let members: Vec<&CorrelatedEvent> = builder
                .members
                .iter()
                .filter_map(|&m| arena.get(m))
                .collect();
            Some(derive(builder.kind, &members, anchor.timestamp()))
        })
        .collect();

    // A parent that starts after its child (clock skew) loses the child to the root
    let mut parents: Vec<Option<usize>> = grouping.units.iter().map(|b| b.parent).collect();
    let mut reparented = 0usize;
    for (unit, parent) in parents.iter_mut().enumerate() {
        let (Some(p), Some(child)) = (*parent, derived[unit].as_ref()) else {
            continue;
        };
        let skewed = derived[p]
            .as_ref()
            .is_none_or(|pd| pd.start_time > child.start_time);
        if skewed {
            *parent = None;
            reparented += 1;
        }
    }

    // Parents always have lower indices than their children
    let mut depth = vec![0usize; parents.len()];
    for unit in 0..parents.len() {
        if let Some(p) = parents[unit] {
            depth[unit] = depth[p] + 1;
        }
    }

    let anchors: Vec<_> = grouping
        .units
        .iter()
        .map(|b| arena.get(b.anchor).map(CorrelatedEvent::id))
        .collect();
    let mut slots: Vec<Option<CorrelatedEvent>> = arena.into_events().into_iter().map(Some).collect();
    let mut pending: Vec<Vec<LogicalUnit>> = vec![Vec::new(); grouping.units.len()];
    let mut roots = Vec::new();

    for (unit, builder) in grouping.units.iter().enumerate().rev() {
        let (Some(d), Some(anchor)) = (derived[unit].clone(), anchors[unit]) else {
            continue;
        };
        let mut member_events: Vec<CorrelatedEvent> = builder
            .members
            .iter()
            .filter_map(|&m| slots.get_mut(m).and_then(Option::take))
            .collect();
        member_events.sort_by_key(CorrelatedEvent::id);

        let mut children = std::mem::take(&mut pending[unit]);
        sort_chronological(&mut children);
        let collapsed = !children.is_empty() && depth[unit] >= options.expand_depth;

        let logical = LogicalUnit {
            key: UnitKey::new(builder.kind, anchor),
            kind: builder.kind,
            display_name: d.display_name,
            identity: d.identity,
            status: d.status,
            start_time: d.start_time,
            end_time: d.end_time,
            attempts: d.attempts,
            member_events,
            children,
            collapsed,
        };
        match parents[unit] {
            Some(p) => pending[p].push(logical),
            None => roots.push(logical),
        }
    }
    sort_chronological(&mut roots);

    let forest = Forest { roots };
    tracing::debug!(
        roots = forest.roots.len(),
        units = forest.unit_count(),
        events = forest.event_count(),
        misses = grouping.misses,
        folded,
        reparented,
        "forest built"
    );
    forest
}

fn sort_chronological(units: &mut [LogicalUnit]) {
    units.sort_by_key(|unit| (unit.start_time, unit.key.anchor));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::{UnitDuration, UnitStatus};
    use proptest::prelude::*;
    use weft_core::{Duration, EventId, Timestamp};
    use weft_history::{EventRecord, UnitKind};

    const T0: i64 = 1_700_000_000_000;

    fn at(id: i64, offset_ms: i64, kind: &str) -> EventRecord {
        EventRecord::new(id, kind, Timestamp::from_unix_millis(T0 + offset_ms))
    }

    fn build(records: Vec<EventRecord>) -> Forest {
        let events = records.into_iter().map(EventRecord::into_event).collect();
        build_forest(events, &ForestOptions::default())
    }

    fn only_kind(forest: &Forest, kind: UnitKind) -> Vec<&LogicalUnit> {
        forest
            .walk()
            .map(|(_, unit)| unit)
            .filter(|unit| unit.kind == kind)
            .collect()
    }

    #[test]
    fn test_retried_activity_becomes_one_unit() {
        let forest = build(vec![
            at(1, 0, "WorkflowExecutionStarted"),
            at(5, 1_000, "ActivityTaskScheduled").activity("a1", "Charge"),
            at(6, 1_000, "ActivityTaskStarted").scheduled(5),
            at(7, 2_000, "ActivityTaskFailed").scheduled(5).started(6),
            at(8, 2_000, "ActivityTaskScheduled").activity("a1", "Charge"),
            at(9, 2_000, "ActivityTaskStarted").scheduled(8),
            at(10, 3_000, "ActivityTaskCompleted").scheduled(8).started(9),
        ]);
        let activities = only_kind(&forest, UnitKind::Activity);
        assert_eq!(activities.len(), 1);
        let activity = activities[0];
        assert_eq!(activity.attempts, 2);
        assert_eq!(activity.status, UnitStatus::Completed);
        assert_eq!(activity.start_time, Timestamp::from_unix_millis(T0 + 1_000));
        assert_eq!(activity.end_time, Some(Timestamp::from_unix_millis(T0 + 3_000)));
        assert_eq!(activity.member_events.len(), 6);
        assert_eq!(
            activity.duration(),
            UnitDuration::Finished(Duration::from_secs(2))
        );
    }

    #[test]
    fn test_four_cycles_collapse() {
        let mut records = vec![at(1, 0, "WorkflowExecutionStarted")];
        let mut id = 2;
        for cycle in 0..4u32 {
            let base = i64::from(cycle) * 1_000;
            let terminal = if cycle == 3 {
                "ActivityTaskCompleted"
            } else {
                "ActivityTaskFailed"
            };
            records.push(at(id, base, "ActivityTaskScheduled").activity("pay", "Pay"));
            records.push(at(id + 1, base + 10, "ActivityTaskStarted").scheduled(id).attempt(cycle + 1));
            records.push(at(id + 2, base + 500, terminal).scheduled(id).started(id + 1));
            id += 3;
        }
        let forest = build(records);
        let activities = only_kind(&forest, UnitKind::Activity);
        assert_eq!(activities.len(), 1);
        assert_eq!(activities[0].attempts, 4);
        assert_eq!(activities[0].status, UnitStatus::Completed);
        assert_eq!(activities[0].member_events.len(), 12);
        assert_eq!(activities[0].key.anchor, EventId::new(2));
    }

    #[test]
    fn test_open_activity_has_no_end() {
        let forest = build(vec![
            at(5, 0, "ActivityTaskScheduled").activity("a1", "Charge"),
            at(6, 50, "ActivityTaskStarted").scheduled(5),
        ]);
        let unit = &forest.roots()[0];
        assert_eq!(unit.status, UnitStatus::Running);
        assert_eq!(unit.end_time, None);
        assert_eq!(unit.duration(), UnitDuration::Running);
        assert!(unit.is_running());
    }

    #[test]
    fn test_timed_out_activity_retry_in_flight() {
        let forest = build(vec![
            at(5, 0, "ActivityTaskScheduled").activity("a1", "Charge"),
            at(6, 10, "ActivityTaskStarted").scheduled(5),
            at(7, 5_000, "ActivityTaskTimedOut").scheduled(5).started(6),
            at(8, 5_000, "ActivityTaskScheduled").activity("a1", "Charge"),
            at(9, 5_010, "ActivityTaskStarted").scheduled(8),
        ]);
        let activities = only_kind(&forest, UnitKind::Activity);
        assert_eq!(activities.len(), 1);
        let activity = activities[0];
        assert_eq!(activity.status, UnitStatus::Running);
        assert_eq!(activity.end_time, None);
        assert_eq!(activity.attempts, 2);
        assert_eq!(activity.member_events.len(), 5);
        assert_eq!(activity.key.anchor, EventId::new(5));
        assert_eq!(activity.duration(), UnitDuration::Running);
        assert!(activity.is_running());
    }

    #[test]
    fn test_empty_log_gives_empty_forest() {
        let forest = build_forest(Vec::new(), &ForestOptions::default());
        assert!(forest.is_empty());
        assert_eq!(forest.unit_count(), 0);
        assert_eq!(forest.event_count(), 0);
    }

    #[test]
    fn test_dangling_reference_keeps_event() {
        let forest = build(vec![
            at(40, 0, "ActivityTaskStarted").scheduled(12),
            at(41, 100, "ActivityTaskCompleted").scheduled(12).started(40),
        ]);
        assert_eq!(forest.roots().len(), 1);
        let unit = &forest.roots()[0];
        assert_eq!(unit.kind, UnitKind::Activity);
        assert_eq!(unit.member_events.len(), 2);
        assert_eq!(unit.status, UnitStatus::Completed);
    }

    #[test]
    fn test_commands_nest_under_workflow_task() {
        let forest = build(vec![
            at(1, 0, "WorkflowExecutionStarted").workflow("Order"),
            at(2, 0, "WorkflowTaskScheduled"),
            at(3, 10, "WorkflowTaskStarted").scheduled(2),
            at(4, 20, "WorkflowTaskCompleted").scheduled(2).started(3),
            at(5, 20, "TimerStarted").timer("wait").task_completed(4),
            at(6, 20, "ActivityTaskScheduled").activity("a1", "Charge").task_completed(4),
            at(7, 1_020, "TimerFired").started(5),
        ]);
        let roots = forest.roots();
        assert_eq!(roots.len(), 2);
        assert_eq!(roots[0].kind, UnitKind::Workflow);
        assert_eq!(roots[0].display_name, "Order");
        assert_eq!(roots[1].kind, UnitKind::WorkflowTask);
        let children = &roots[1].children;
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].display_name, "Timer wait");
        assert_eq!(children[0].status, UnitStatus::Fired);
        assert_eq!(children[1].display_name, "Charge");
        assert_eq!(children[1].status, UnitStatus::Running);
    }

    #[test]
    fn test_clock_skew_moves_child_to_root() {
        let forest = build(vec![
            at(2, 5_000, "WorkflowTaskScheduled"),
            at(3, 5_010, "WorkflowTaskStarted").scheduled(2),
            at(4, 5_020, "WorkflowTaskCompleted").scheduled(2).started(3),
            at(5, 1_000, "TimerStarted").timer("t").task_completed(4),
        ]);
        assert_eq!(forest.roots().len(), 2);
        assert_eq!(forest.roots()[0].kind, UnitKind::Timer);
        assert!(forest.roots()[1].children.is_empty());
    }

    #[test]
    fn test_collapsed_at_expand_depth() {
        let records = vec![
            at(2, 0, "WorkflowTaskScheduled"),
            at(3, 1, "WorkflowTaskStarted").scheduled(2),
            at(4, 2, "WorkflowTaskCompleted").scheduled(2).started(3),
            at(5, 3, "TimerStarted").timer("t").task_completed(4),
        ];
        let events: Vec<CorrelatedEvent> = records.into_iter().map(EventRecord::into_event).collect();
        let expanded = build_forest(events.clone(), &ForestOptions::default());
        assert!(!expanded.roots()[0].collapsed);
        assert_eq!(expanded.visible().count(), 2);

        let collapsed = build_forest(events, &ForestOptions { expand_depth: 0 });
        assert!(collapsed.roots()[0].collapsed);
        assert_eq!(collapsed.visible().count(), 1);
        assert_eq!(collapsed.walk().count(), 2);
    }

    #[test]
    fn test_toggle_and_find() {
        let mut forest = build(vec![
            at(2, 0, "WorkflowTaskScheduled"),
            at(3, 1, "WorkflowTaskStarted").scheduled(2),
            at(4, 2, "WorkflowTaskCompleted").scheduled(2).started(3),
            at(5, 3, "TimerStarted").timer("t").task_completed(4),
        ]);
        let task = UnitKey::new(UnitKind::WorkflowTask, EventId::new(2));
        let timer = UnitKey::new(UnitKind::Timer, EventId::new(5));
        assert!(forest.find(&timer).is_some());
        assert!(forest.toggle_collapsed(&task));
        assert!(forest.find(&task).is_some_and(|u| u.collapsed));
        assert!(!forest.toggle_collapsed(&timer));
        assert_eq!(forest.visible().count(), 1);
    }

    #[test]
    fn test_continued_as_new_status() {
        let forest = build(vec![
            at(1, 0, "WorkflowExecutionStarted"),
            at(2, 100, "WorkflowExecutionContinuedAsNew"),
        ]);
        assert_eq!(forest.roots()[0].status, UnitStatus::ContinuedAsNew);
    }

    #[test]
    fn test_outgoing_signal_is_terminated_by_outcome() {
        let forest = build(vec![
            at(5, 0, "SignalExternalWorkflowExecutionInitiated").signal("nudge"),
            at(6, 40, "ExternalWorkflowExecutionSignaled").initiated(5),
        ]);
        let unit = &forest.roots()[0];
        assert_eq!(unit.kind, UnitKind::Signal);
        assert_eq!(unit.status, UnitStatus::Signaled);
        assert_eq!(unit.display_name, "Signal nudge");
        assert_eq!(unit.end_time, Some(Timestamp::from_unix_millis(T0 + 40)));
    }

    #[test]
    fn test_serializes_as_array() {
        let forest = build(vec![at(1, 0, "WorkflowExecutionStarted")]);
        let value = serde_json::to_value(&forest).unwrap();
        assert!(value.is_array());
        assert_eq!(value[0]["status"], "Running");
    }

    // Generated logs mixing well-formed lifecycles with dangling and foreign refs
    const KINDS: &[&str] = &[
        "WorkflowExecutionStarted",
        "WorkflowTaskScheduled",
        "WorkflowTaskStarted",
        "WorkflowTaskCompleted",
        "ActivityTaskScheduled",
        "ActivityTaskStarted",
        "ActivityTaskFailed",
        "ActivityTaskCompleted",
        "TimerStarted",
        "TimerFired",
        "StartChildWorkflowExecutionInitiated",
        "ChildWorkflowExecutionStarted",
        "ChildWorkflowExecutionTimedOut",
        "WorkflowExecutionSignaled",
        "MarkerRecorded",
    ];

    fn arb_log() -> impl Strategy<Value = Vec<CorrelatedEvent>> {
        prop::collection::vec(
            (
                0..KINDS.len(),
                prop::option::of(1i64..8),
                prop::option::of(1i64..8),
                prop::option::of(1i64..8),
                -200i64..2_000,
                0u8..3,
                prop::option::of(1u32..4),
            ),
            0..60,
        )
        .prop_map(|steps| {
            let mut offset = 0i64;
            steps
                .into_iter()
                .enumerate()
                .map(|(i, (kind, sched, started, context, delta, ident, attempt))| {
                    let id = i as i64 + 1;
                    offset += delta;
                    let name = format!("id{ident}");
                    let mut record = at(id, offset, KINDS[kind])
                        .activity(&name, "Work")
                        .timer(&name)
                        .child(&name, "Child")
                        .signal(&name);
                    if let Some(back) = sched {
                        record = record.scheduled(id - back).initiated(id - back);
                    }
                    if let Some(back) = started {
                        record = record.started(id - back);
                    }
                    if let Some(back) = context {
                        record = record.task_completed(id - back);
                    }
                    if let Some(n) = attempt {
                        record = record.attempt(n);
                    }
                    record.into_event()
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_every_event_in_exactly_one_unit(events in arb_log()) {
            let mut expected: Vec<EventId> = events.iter().map(CorrelatedEvent::id).collect();
            let forest = build_forest(events, &ForestOptions::default());
            let mut seen: Vec<EventId> = forest
                .walk()
                .flat_map(|(_, unit)| unit.member_events.iter().map(CorrelatedEvent::id))
                .collect();
            expected.sort();
            seen.sort();
            prop_assert_eq!(seen, expected);
        }

        #[test]
        fn prop_children_start_after_parent(events in arb_log()) {
            let forest = build_forest(events, &ForestOptions::default());
            for (_, unit) in forest.walk() {
                prop_assert!(!unit.member_events.is_empty());
                prop_assert!(unit.attempts >= 1);
                prop_assert!(unit.attempts == 1 || unit.kind.supports_retry());
                prop_assert!(unit.member_events.windows(2).all(|w| w[0].id() <= w[1].id()));
                prop_assert_eq!(unit.end_time.is_none(), unit.status.is_running());
                for child in &unit.children {
                    prop_assert!(unit.start_time <= child.start_time);
                }
            }
        }

        #[test]
        fn prop_rebuild_is_identical(events in arb_log()) {
            let first = build_forest(events.clone(), &ForestOptions::default());
            let second = build_forest(events, &ForestOptions::default());
            prop_assert_eq!(first, second);
        }
    }
}
