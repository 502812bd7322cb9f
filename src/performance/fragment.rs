use std::collections::{BTreeMap, BTreeSet};

use crate::{
    performance::{
        error::{PerformanceError, not_found},
        graph::PerformanceGraph,
        types::{Snapshot, SnapshotId},
    },
    registry::PartId,
    types::Instruction,
};

/// Private graph grown by one score node before it is committed.
///
/// Entry snapshots are copies of vertices the node starts from; committing
/// interns them back onto those vertices, so only new work is added.
#[derive(Debug, Clone)]
pub struct Fragment {
    pub label: String,
    graph: PerformanceGraph,
    entries: Vec<SnapshotId>,
    frontier: Vec<SnapshotId>,
    scores: BTreeMap<SnapshotId, f64>,
    bonus: BTreeMap<SnapshotId, f64>,
    origin: BTreeMap<SnapshotId, SnapshotId>,
    paths: BTreeMap<SnapshotId, Vec<Instruction>>,
    footprint: BTreeSet<PartId>,
}

/// Outcome of committing a fragment into the shared graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Committed {
    pub frontier: Vec<(SnapshotId, f64)>,
    pub new_snapshots: usize,
    pub new_edges: usize,
}

impl Fragment {
    /// Starts a fragment at `entries`, each carrying its cumulative score.
    pub fn begin(
        label: impl Into<String>,
        entries: Vec<(Snapshot, f64)>,
    ) -> Result<Self, PerformanceError> {
        let mut fragment = Self {
            label: label.into(),
            graph: PerformanceGraph::new(),
            entries: Vec::new(),
            frontier: Vec::new(),
            scores: BTreeMap::new(),
            bonus: BTreeMap::new(),
            origin: BTreeMap::new(),
            paths: BTreeMap::new(),
            footprint: BTreeSet::new(),
        };
        for (snapshot, score) in entries {
            let interned = fragment.graph.intern(snapshot)?;
            fragment.graph.add_root(interned.id)?;
            if !fragment.entries.contains(&interned.id) {
                fragment.entries.push(interned.id);
                fragment.origin.insert(interned.id, interned.id);
                fragment.paths.insert(interned.id, Vec::new());
            }
            let best = fragment.scores.entry(interned.id).or_insert(score);
            *best = best.max(score);
        }
        fragment.frontier = fragment.entries.clone();
        Ok(fragment)
    }

    pub fn graph(&self) -> &PerformanceGraph {
        &self.graph
    }

    pub fn entries(&self) -> &[SnapshotId] {
        &self.entries
    }

    pub fn frontier(&self) -> &[SnapshotId] {
        &self.frontier
    }

    /// Parts touched by any instruction in the fragment.
    pub fn footprint(&self) -> &BTreeSet<PartId> {
        &self.footprint
    }

    pub fn snapshot(&self, id: SnapshotId) -> Result<&Snapshot, PerformanceError> {
        self.graph.require(id)
    }

    pub fn score(&self, id: SnapshotId) -> f64 {
        self.scores.get(&id).copied().unwrap_or(f64::NEG_INFINITY)
    }

    /// Review adjustment applied to `id` on top of its path score, including
    /// adjustments carried in from absorbed children.
    pub fn bonus(&self, id: SnapshotId) -> f64 {
        self.bonus.get(&id).copied().unwrap_or_default()
    }

    /// Instructions along the best path from an entry to `id`.
    pub fn path(&self, id: SnapshotId) -> &[Instruction] {
        self.paths.get(&id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn frontier_entries(&self) -> Result<Vec<(Snapshot, f64)>, PerformanceError> {
        self.frontier
            .iter()
            .map(|id| Ok((self.snapshot(*id)?.clone(), self.score(*id))))
            .collect()
    }

    /// Records a step from `from` to `snapshot`; a vertex reached twice keeps
    /// its best cumulative score and path.
    pub fn extend(
        &mut self,
        from: SnapshotId,
        snapshot: Snapshot,
        instruction: Instruction,
        step_score: f64,
    ) -> Result<SnapshotId, PerformanceError> {
        let base = *self
            .scores
            .get(&from)
            .ok_or_else(|| not_found(format!("{} is not in fragment '{}'", from, self.label)))?;
        let interned = self.graph.intern(snapshot)?;
        self.footprint.extend(instruction.parts());
        self.graph
            .connect(from, interned.id, instruction.clone(), step_score)?;

        let total = base + step_score;
        if self
            .scores
            .get(&interned.id)
            .is_none_or(|existing| total > *existing)
        {
            let mut path = self.path(from).to_vec();
            path.push(instruction);
            self.paths.insert(interned.id, path);
            self.scores.insert(interned.id, total);
            let origin = self.origin.get(&from).copied().unwrap_or(from);
            self.origin.insert(interned.id, origin);
        }
        Ok(interned.id)
    }

    /// Folds a successfully explored child fragment into this one. The
    /// child's entries must be snapshots of this fragment.
    pub fn absorb(&mut self, child: &Fragment) -> Result<Vec<SnapshotId>, PerformanceError> {
        let mut mapping = BTreeMap::new();
        for (id, snapshot) in child.graph.snapshots() {
            mapping.insert(id, self.graph.intern(snapshot.clone())?.id);
        }
        let mapped = |id: SnapshotId| {
            mapping
                .get(&id)
                .copied()
                .ok_or_else(|| not_found(format!("{} missing from child '{}'", id, child.label)))
        };

        for entry in &child.entries {
            if !self.scores.contains_key(&mapped(*entry)?) {
                return Err(not_found(format!(
                    "child '{}' starts outside fragment '{}'",
                    child.label, self.label
                )));
            }
        }
        for edge in child.graph.edges() {
            self.graph.connect(
                mapped(edge.from)?,
                mapped(edge.to)?,
                edge.instruction.clone(),
                edge.score,
            )?;
        }
        self.footprint.extend(child.footprint.iter().copied());

        for (id, score) in &child.scores {
            let target = mapped(*id)?;
            if child.entries.contains(id) {
                continue;
            }
            if self
                .scores
                .get(&target)
                .is_some_and(|existing| *existing >= *score)
            {
                continue;
            }
            let child_origin = child.origin.get(id).copied().unwrap_or(*id);
            let parent_entry = mapped(child_origin)?;
            let mut path = self.path(parent_entry).to_vec();
            path.extend(child.path(*id).iter().cloned());
            let origin = self.origin.get(&parent_entry).copied().unwrap_or(parent_entry);
            self.paths.insert(target, path);
            self.scores.insert(target, *score);
            self.origin.insert(target, origin);
            match child.bonus.get(id) {
                Some(bonus) => self.bonus.insert(target, *bonus),
                None => self.bonus.remove(&target),
            };
        }

        let mut frontier = Vec::with_capacity(child.frontier.len());
        for id in &child.frontier {
            let target = mapped(*id)?;
            if !frontier.contains(&target) {
                frontier.push(target);
            }
        }
        self.frontier = frontier.clone();
        Ok(frontier)
    }

    pub fn set_frontier(&mut self, frontier: Vec<SnapshotId>) {
        self.frontier = frontier;
    }

    pub fn adjust_score(&mut self, id: SnapshotId, delta: f64) {
        if let Some(score) = self.scores.get_mut(&id) {
            *score += delta;
            *self.bonus.entry(id).or_default() += delta;
        }
    }

    /// Keeps the best `beam` frontier vertices; ties keep the lower id.
    pub fn trim_frontier(&mut self, beam: usize) {
        let mut ranked = self.frontier.clone();
        ranked.sort_by(|lhs, rhs| {
            self.score(*rhs)
                .total_cmp(&self.score(*lhs))
                .then(lhs.cmp(rhs))
        });
        ranked.truncate(beam.max(1));
        self.frontier = ranked;
    }

    /// Single-writer commit into the shared graph.
    pub fn commit_into(&self, shared: &mut PerformanceGraph) -> Result<Committed, PerformanceError> {
        let mut mapping = BTreeMap::new();
        let mut new_snapshots = 0;
        for (id, snapshot) in self.graph.snapshots() {
            let interned = shared.intern(snapshot.clone())?;
            if interned.inserted {
                new_snapshots += 1;
            }
            mapping.insert(id, interned.id);
        }

        let mut new_edges = 0;
        for edge in self.graph.edges() {
            let (Some(from), Some(to)) = (mapping.get(&edge.from), mapping.get(&edge.to)) else {
                return Err(not_found(format!(
                    "fragment '{}' edge leaves its own vertices",
                    self.label
                )));
            };
            if shared.connect(*from, *to, edge.instruction.clone(), edge.score)? {
                new_edges += 1;
            }
        }

        let frontier = self
            .frontier
            .iter()
            .filter_map(|id| mapping.get(id).map(|shared_id| (*shared_id, self.score(*id))))
            .collect();
        Ok(Committed {
            frontier,
            new_snapshots,
            new_edges,
        })
    }
}
