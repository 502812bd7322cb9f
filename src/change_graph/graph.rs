use std::{
    collections::{BTreeMap, BTreeSet, VecDeque},
    sync::Arc,
};

use crate::{
    change_graph::{
        error::{ChangeGraphError, configuration_error},
        production::ProductionTable,
        types::{ChangeEdge, EdgeKind, EdgeSpec, Vertex, VertexId},
    },
    registry::{KindTable, PartKind},
    state::{InteractionKind, PartCondition, StateMachineSet},
    taxonomy::{Change, ChangeCatalog},
};

/// Static feasibility graph over one instrument's changes. Read-only once built.
#[derive(Debug, Clone)]
pub struct ChangeGraph {
    vertices: Vec<Vertex>,
    index: BTreeMap<String, VertexId>,
    edges: Vec<ChangeEdge>,
    outgoing: BTreeMap<VertexId, Vec<usize>>,
    incoming: BTreeMap<VertexId, Vec<usize>>,
    reachable: BTreeSet<VertexId>,
}

impl ChangeGraph {
    pub fn build(
        catalog: &ChangeCatalog,
        wiring: &[EdgeSpec],
        productions: &ProductionTable,
        machines: &StateMachineSet,
        kinds: &KindTable,
    ) -> Result<Self, ChangeGraphError> {
        let mut vertices = vec![Vertex::Null];
        let mut index = BTreeMap::new();
        for change in catalog.iter() {
            index.insert(change.name.clone(), VertexId(vertices.len()));
            vertices.push(Vertex::Change(Arc::clone(change)));
        }

        let resolve = |name: &str| {
            index.get(name).copied().ok_or_else(|| {
                configuration_error(format!("wiring references unknown change '{}'", name))
            })
        };

        let mut edges = Vec::with_capacity(wiring.len());
        let mut outgoing: BTreeMap<VertexId, Vec<usize>> = BTreeMap::new();
        let mut incoming: BTreeMap<VertexId, Vec<usize>> = BTreeMap::new();
        for spec in wiring {
            let from = match spec.from.as_deref() {
                Some(name) => resolve(name)?,
                None => VertexId::NULL,
            };
            let to = resolve(&spec.to)?;
            if let EdgeKind::Conditional { after: Some(after) } = &spec.kind {
                resolve(after)?;
            }
            let production = productions.instantiate(&spec.production, &spec.params)?;

            let position = edges.len();
            edges.push(ChangeEdge {
                from,
                to,
                kind: spec.kind.clone(),
                production_name: spec.production.clone(),
                production,
            });
            outgoing.entry(from).or_default().push(position);
            incoming.entry(to).or_default().push(position);
        }

        let mut graph = Self {
            vertices,
            index,
            edges,
            outgoing,
            incoming,
            reachable: BTreeSet::new(),
        };
        graph.reachable = graph.walk_reachable();
        graph.verify_state_machines(machines, kinds)?;

        tracing::debug!(
            target: "change_graph",
            vertices = graph.vertices.len(),
            edges = graph.edges.len(),
            reachable = graph.reachable.len(),
            "change_graph_built"
        );
        Ok(graph)
    }

    fn walk_reachable(&self) -> BTreeSet<VertexId> {
        let mut reachable = BTreeSet::from([VertexId::NULL]);
        let mut queue = VecDeque::from([VertexId::NULL]);
        while let Some(vertex) = queue.pop_front() {
            for edge in self.outgoing(vertex) {
                if reachable.insert(edge.to) {
                    queue.push_back(edge.to);
                }
            }
        }
        reachable
    }

    /// Every kind a reachable change can touch must have a machine that is
    /// total over the changes applied to that kind.
    fn verify_state_machines(
        &self,
        machines: &StateMachineSet,
        kinds: &KindTable,
    ) -> Result<(), ChangeGraphError> {
        let mut applied: BTreeMap<PartKind, BTreeSet<InteractionKind>> = BTreeMap::new();
        for change in self.reachable_changes() {
            for side in [&change.masculine, &change.feminine] {
                for kind in kinds.descendants(side) {
                    applied
                        .entry(kind)
                        .or_default()
                        .insert(change.name.clone());
                }
            }
        }

        for (kind, interactions) in &applied {
            machines
                .verify_totality(kinds, kind, interactions)
                .map_err(|err| configuration_error(err.message))?;
        }
        Ok(())
    }

    pub fn vertex(&self, name: &str) -> Option<VertexId> {
        self.index.get(name).copied()
    }

    pub fn vertex_data(&self, id: VertexId) -> Option<&Vertex> {
        self.vertices.get(id.0)
    }

    pub fn change(&self, id: VertexId) -> Option<&Arc<Change>> {
        match self.vertices.get(id.0) {
            Some(Vertex::Change(change)) => Some(change),
            _ => None,
        }
    }

    pub fn edges(&self) -> &[ChangeEdge] {
        &self.edges
    }

    pub fn outgoing(&self, from: VertexId) -> impl Iterator<Item = &ChangeEdge> {
        self.outgoing
            .get(&from)
            .into_iter()
            .flatten()
            .map(|position| &self.edges[*position])
    }

    pub fn incoming(&self, to: VertexId) -> impl Iterator<Item = &ChangeEdge> {
        self.incoming
            .get(&to)
            .into_iter()
            .flatten()
            .map(|position| &self.edges[*position])
    }

    pub fn is_reachable(&self, name: &str) -> bool {
        self.vertex(name)
            .is_some_and(|vertex| self.reachable.contains(&vertex))
    }

    pub fn reachable_changes(&self) -> impl Iterator<Item = &Arc<Change>> {
        self.reachable
            .iter()
            .filter_map(|vertex| self.change(*vertex))
    }

    /// Edges leading into `change` that are admissible for a feminine part in
    /// `condition`, PossibleNext and Conditional edges before Fallback.
    pub fn edges_into(&self, change: &str, condition: &PartCondition) -> Vec<&ChangeEdge> {
        let Some(target) = self.vertex(change) else {
            return Vec::new();
        };
        let from = match condition.last_change.as_deref() {
            Some(last) => match self.vertex(last) {
                Some(vertex) => vertex,
                None => return Vec::new(),
            },
            None => VertexId::NULL,
        };

        let mut admissible: Vec<&ChangeEdge> = self
            .outgoing(from)
            .filter(|edge| edge.to == target)
            .filter(|edge| match &edge.kind {
                EdgeKind::Conditional { after } => after == &condition.previous_change,
                EdgeKind::PossibleNext | EdgeKind::Fallback => true,
            })
            .collect();
        admissible.sort_by_key(|edge| edge.kind.precedence());
        admissible
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.len() <= 1
    }
}
