//! Retry aggregation: fold re-scheduled attempts of the same work into one unit.

use crate::group::Grouping;
use crate::status::last_outcome;
use std::collections::HashMap;
use weft_history::{CorrelatedEvent, UnitKind};

/// Fold every later unit whose identity matches an earlier unit of the same
/// kind whose last attempt failed or timed out before the later one was
/// scheduled. Returns the number of folded units.
pub(crate) fn fold_retries(grouping: &mut Grouping, events: &[CorrelatedEvent]) -> usize {
    let mut latest: HashMap<(UnitKind, &str), usize> = HashMap::new();
    let mut folded = 0;

    for unit in 0..grouping.units.len() {
        let builder = &grouping.units[unit];
        if !builder.kind.supports_retry() || builder.standalone || !builder.is_live() {
            continue;
        }
        let Some(identity) = events.get(builder.anchor).and_then(|e| e.kind.identity()) else {
            continue;
        };
        let key = (builder.kind, identity);
        let bound = builder.anchor;

        let target = latest.get(&key).copied().filter(|&earlier| {
            let before = grouping.units[earlier]
                .members
                .iter()
                .filter(|&&m| m < bound)
                .filter_map(|&m| events.get(m));
            last_outcome(before).is_some_and(|(outcome, _)| outcome.is_retryable())
        });

        match target {
            Some(earlier) => {
                absorb(grouping, earlier, unit);
                folded += 1;
            }
            None => {
                latest.insert(key, unit);
            }
        }
    }

    if folded > 0 {
        tracing::debug!(folded, "folded retried attempts");
    }
    folded
}

fn absorb(grouping: &mut Grouping, into: usize, from: usize) {
    let moved = std::mem::take(&mut grouping.units[from].members);
    grouping.units[from].absorbed = true;

    let members = &mut grouping.units[into].members;
    members.extend(moved);
    members.sort_unstable();

    for builder in &mut grouping.units {
        if builder.parent == Some(from) {
            builder.parent = Some(into);
        }
    }
}
