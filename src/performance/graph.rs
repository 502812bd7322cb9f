use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{
    performance::{
        error::{PerformanceError, invariant_violation, not_found},
        fingerprint::fingerprint,
        fragment::{Committed, Fragment},
        types::{PerformanceEdge, Snapshot, SnapshotId},
    },
    types::{InstanceIndex, Instruction},
};

type SnapshotKey = (Option<InstanceIndex>, String);

/// Dynamic graph of snapshots joined by instructions.
///
/// Snapshots are interned: a snapshot whose instance and aggregate state
/// already exist resolves to the existing vertex.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "GraphDocument", into = "GraphDocument")]
pub struct PerformanceGraph {
    snapshots: Vec<Snapshot>,
    edges: Vec<PerformanceEdge>,
    roots: Vec<SnapshotId>,
    index: BTreeMap<SnapshotKey, Vec<SnapshotId>>,
    outgoing: BTreeMap<SnapshotId, Vec<usize>>,
    incoming: BTreeMap<SnapshotId, Vec<usize>>,
}

/// Result of interning one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interned {
    pub id: SnapshotId,
    pub inserted: bool,
}

/// Where another graph's vertices and edges landed after `absorb`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Absorbed {
    pub snapshots: BTreeMap<SnapshotId, SnapshotId>,
    pub new_snapshots: usize,
    pub new_edges: usize,
}

impl PerformanceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, snapshot: Snapshot) -> Result<Interned, PerformanceError> {
        let key = (snapshot.instance, fingerprint(&snapshot)?);
        if let Some(candidates) = self.index.get(&key)
            && let Some(existing) = candidates.iter().find(|id| {
                self.snapshots[id.0].states == snapshot.states
            })
        {
            return Ok(Interned {
                id: *existing,
                inserted: false,
            });
        }

        let id = SnapshotId(self.snapshots.len());
        self.snapshots.push(snapshot);
        self.index.entry(key).or_default().push(id);
        Ok(Interned { id, inserted: true })
    }

    pub fn add_root(&mut self, id: SnapshotId) -> Result<(), PerformanceError> {
        self.require(id)?;
        if !self.roots.contains(&id) {
            self.roots.push(id);
        }
        Ok(())
    }

    /// Adds an instruction edge; an identical edge already present is kept
    /// with the better score.
    pub fn connect(
        &mut self,
        from: SnapshotId,
        to: SnapshotId,
        instruction: Instruction,
        score: f64,
    ) -> Result<bool, PerformanceError> {
        self.require(from)?;
        self.require(to)?;

        if let Some(position) = self.outgoing.get(&from).and_then(|positions| {
            positions.iter().copied().find(|position| {
                let edge = &self.edges[*position];
                edge.to == to && edge.instruction == instruction
            })
        }) {
            let edge = &mut self.edges[position];
            if score > edge.score {
                edge.score = score;
            }
            return Ok(false);
        }

        let position = self.edges.len();
        self.edges.push(PerformanceEdge {
            from,
            to,
            instruction,
            score,
        });
        self.outgoing.entry(from).or_default().push(position);
        self.incoming.entry(to).or_default().push(position);
        Ok(true)
    }

    pub fn snapshot(&self, id: SnapshotId) -> Option<&Snapshot> {
        self.snapshots.get(id.0)
    }

    pub fn require(&self, id: SnapshotId) -> Result<&Snapshot, PerformanceError> {
        self.snapshot(id)
            .ok_or_else(|| not_found(format!("{} is not in the performance graph", id)))
    }

    pub fn snapshots(&self) -> impl Iterator<Item = (SnapshotId, &Snapshot)> {
        self.snapshots
            .iter()
            .enumerate()
            .map(|(position, snapshot)| (SnapshotId(position), snapshot))
    }

    pub fn snapshots_at(&self, instance: Option<InstanceIndex>) -> Vec<SnapshotId> {
        self.snapshots()
            .filter(|(_, snapshot)| snapshot.instance == instance)
            .map(|(id, _)| id)
            .collect()
    }

    pub fn roots(&self) -> &[SnapshotId] {
        &self.roots
    }

    pub fn edges(&self) -> &[PerformanceEdge] {
        &self.edges
    }

    pub fn outgoing(&self, id: SnapshotId) -> impl Iterator<Item = &PerformanceEdge> {
        self.outgoing
            .get(&id)
            .into_iter()
            .flatten()
            .map(|position| &self.edges[*position])
    }

    pub fn incoming(&self, id: SnapshotId) -> impl Iterator<Item = &PerformanceEdge> {
        self.incoming
            .get(&id)
            .into_iter()
            .flatten()
            .map(|position| &self.edges[*position])
    }

    /// Interns every vertex of `other` and replays its edges and roots.
    pub fn absorb(&mut self, other: &PerformanceGraph) -> Result<Absorbed, PerformanceError> {
        let mut absorbed = Absorbed::default();
        for (id, snapshot) in other.snapshots() {
            let interned = self.intern(snapshot.clone())?;
            if interned.inserted {
                absorbed.new_snapshots += 1;
            }
            absorbed.snapshots.insert(id, interned.id);
        }
        for edge in other.edges() {
            let from = mapped(&absorbed.snapshots, edge.from)?;
            let to = mapped(&absorbed.snapshots, edge.to)?;
            if self.connect(from, to, edge.instruction.clone(), edge.score)? {
                absorbed.new_edges += 1;
            }
        }
        for root in other.roots() {
            self.add_root(mapped(&absorbed.snapshots, *root)?)?;
        }
        Ok(absorbed)
    }

    /// Commits a phrase fragment; its snapshots merge into existing vertices.
    pub fn merge_fragment(&mut self, fragment: &Fragment) -> Result<Committed, PerformanceError> {
        fragment.commit_into(self)
    }

    /// Checks the merge invariant and edge consistency.
    pub fn assert_invariants(&self) -> Result<(), PerformanceError> {
        let mut seen: BTreeMap<Option<InstanceIndex>, Vec<SnapshotId>> = BTreeMap::new();
        for (id, snapshot) in self.snapshots() {
            let peers = seen.entry(snapshot.instance).or_default();
            if let Some(twin) = peers
                .iter()
                .find(|peer| self.snapshots[peer.0].states == snapshot.states)
            {
                return Err(invariant_violation(format!(
                    "{} and {} hold equal state at instance {:?}",
                    twin, id, snapshot.instance
                )));
            }
            peers.push(id);
        }

        let mut edges = BTreeSet::new();
        for edge in &self.edges {
            self.require(edge.from)?;
            self.require(edge.to)?;
            if !edges.insert((edge.from, edge.to, &edge.instruction)) {
                return Err(invariant_violation(format!(
                    "duplicate edge {} -> {}",
                    edge.from, edge.to
                )));
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

fn mapped(
    mapping: &BTreeMap<SnapshotId, SnapshotId>,
    id: SnapshotId,
) -> Result<SnapshotId, PerformanceError> {
    mapping
        .get(&id)
        .copied()
        .ok_or_else(|| not_found(format!("{} has no mapping", id)))
}

/// Serialized form; the lookup indexes are rebuilt on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct GraphDocument {
    snapshots: Vec<Snapshot>,
    edges: Vec<PerformanceEdge>,
    #[serde(default)]
    roots: Vec<SnapshotId>,
}

impl From<PerformanceGraph> for GraphDocument {
    fn from(graph: PerformanceGraph) -> Self {
        Self {
            snapshots: graph.snapshots,
            edges: graph.edges,
            roots: graph.roots,
        }
    }
}

impl TryFrom<GraphDocument> for PerformanceGraph {
    type Error = PerformanceError;

    fn try_from(document: GraphDocument) -> Result<Self, Self::Error> {
        let mut graph = PerformanceGraph::new();
        for (position, snapshot) in document.snapshots.into_iter().enumerate() {
            let interned = graph.intern(snapshot)?;
            if !interned.inserted || interned.id.0 != position {
                return Err(invariant_violation(format!(
                    "stored snapshot {} duplicates {}",
                    position, interned.id
                )));
            }
        }
        for edge in document.edges {
            graph.connect(edge.from, edge.to, edge.instruction, edge.score)?;
        }
        for root in document.roots {
            graph.add_root(root)?;
        }
        Ok(graph)
    }
}
