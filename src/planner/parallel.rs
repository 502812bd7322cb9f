use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::{
    instrument::Instrument,
    performance::{Fragment, Snapshot, SnapshotId},
    planner::{error::PlannerError, imagine::imagine, realize::candidate_parts},
    registry::PartId,
    score::ScoreNode,
};

/// Every part a node could touch, or `None` when some element admits no
/// change and the node has to be explored on its own.
pub(crate) fn footprint(instrument: &Instrument, node: &ScoreNode) -> Option<BTreeSet<PartId>> {
    let mut parts = BTreeSet::new();
    for instance in node.instances() {
        for demanded in imagine(instrument, instance) {
            if demanded.changes.is_empty() {
                return None;
            }
            for change in &demanded.changes {
                let masculine = candidate_parts(
                    instrument,
                    change,
                    true,
                    demanded.element.performer.as_ref(),
                );
                let feminine =
                    candidate_parts(instrument, change, false, demanded.element.target.as_ref());
                parts.extend(masculine.into_iter().chain(feminine).map(|part| part.id));
            }
        }
    }
    Some(parts)
}

/// Splits units starting at `from` into the next batch: consecutive units with
/// pairwise disjoint footprints, at most `workers` of them.
pub(crate) fn next_batch(
    instrument: &Instrument,
    units: &[&ScoreNode],
    from: usize,
    workers: usize,
) -> usize {
    let mut taken = BTreeSet::new();
    let mut end = from;
    while end < units.len() && end - from < workers.max(1) {
        let Some(parts) = footprint(instrument, units[end]) else {
            return if end == from { end + 1 } else { end };
        };
        if !taken.is_disjoint(&parts) {
            break;
        }
        taken.extend(parts);
        end += 1;
    }
    end
}

/// Replays `fragment`, explored from an older frontier, on top of `targets`.
///
/// A target continues from the entry that agrees with it on every part the
/// fragment touched; parts outside the fragment's footprint keep the target's
/// conditions. Returns `None` when no exit is reachable from any target.
pub(crate) fn rebase(
    fragment: &Fragment,
    targets: &[(Snapshot, f64)],
    beam: usize,
) -> Result<Option<Fragment>, PlannerError> {
    let footprint = fragment.footprint();
    let mut rebased = Fragment::begin(fragment.label.clone(), targets.to_vec())?;
    let target_ids = rebased.entries().to_vec();

    let mut mapped: BTreeMap<(SnapshotId, SnapshotId), SnapshotId> = BTreeMap::new();
    let mut pending: BTreeMap<SnapshotId, f64> = BTreeMap::new();
    let mut adjusted = BTreeSet::new();
    let mut queue = VecDeque::new();
    for target in target_ids {
        let target_states = rebased.snapshot(target)?.states.clone();
        let entry = fragment.entries().iter().copied().find(|entry| {
            fragment.snapshot(*entry).is_ok_and(|snapshot| {
                footprint
                    .iter()
                    .all(|part| snapshot.states.get(part) == target_states.get(part))
            })
        });
        if let Some(entry) = entry {
            mapped.insert((entry, target), target);
            carry_bonus(&mut pending, target, fragment.bonus(entry));
            queue.push_back((entry, target));
        }
    }

    // Edges advance one instance, so a vertex is popped only after every
    // edge into it was replayed.
    while let Some((source, target)) = queue.pop_front() {
        let Some(from) = mapped.get(&(source, target)).copied() else {
            continue;
        };
        if adjusted.insert(from)
            && let Some(bonus) = pending.remove(&from)
        {
            rebased.adjust_score(from, bonus);
        }
        let base_states = rebased.snapshot(from)?.states.clone();
        for edge in fragment.graph().outgoing(source) {
            let next = fragment.snapshot(edge.to)?;
            let mut states = base_states.clone();
            for part in footprint {
                if let Some(condition) = next.states.get(part) {
                    states.insert(*part, condition.clone());
                }
            }
            let id = rebased.extend(
                from,
                Snapshot::new(next.instance, next.start, states),
                edge.instruction.clone(),
                edge.score,
            )?;
            if mapped.insert((edge.to, target), id).is_none() {
                carry_bonus(&mut pending, id, fragment.bonus(edge.to));
                queue.push_back((edge.to, target));
            }
        }
    }

    let mut frontier = Vec::new();
    for exit in fragment.frontier() {
        for ((source, _), id) in &mapped {
            if source == exit && !frontier.contains(id) {
                frontier.push(*id);
            }
        }
    }
    if frontier.is_empty() {
        return Ok(None);
    }

    rebased.set_frontier(frontier);
    rebased.trim_frontier(beam);
    Ok(Some(rebased))
}

/// Several source vertices may land on one rebased vertex; the largest
/// adjustment wins.
fn carry_bonus(pending: &mut BTreeMap<SnapshotId, f64>, id: SnapshotId, bonus: f64) {
    if bonus == 0.0 {
        return;
    }
    pending
        .entry(id)
        .and_modify(|current| *current = current.max(bonus))
        .or_insert(bonus);
}
