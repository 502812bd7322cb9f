use std::collections::{BTreeMap, BTreeSet};

use crate::{
    change_graph::{ChangeGraph, ProductionTable},
    instrument::{
        error::{InstrumentError, configuration_error},
        spec::InstrumentSpec,
    },
    performance::Snapshot,
    registry::{KindEntry, KindTable, PartId, PartRegistry, RegistryError},
    state::{PartCondition, StateMachine, StateMachineSet},
    taxonomy::{ChangeCatalog, TagLattice},
};

/// Everything built once per instrument and shared read-only by planning
/// sessions.
#[derive(Debug)]
pub struct Instrument {
    name: String,
    registry: PartRegistry,
    lattice: TagLattice,
    catalog: ChangeCatalog,
    machines: StateMachineSet,
    graph: ChangeGraph,
    initial: BTreeMap<PartId, PartCondition>,
}

impl Instrument {
    pub fn bootstrap(spec: InstrumentSpec) -> Result<Self, InstrumentError> {
        Self::bootstrap_with(spec, &ProductionTable::with_builtins(), |_| Ok(()))
    }

    /// Bootstraps with custom productions; `configure` runs on the registry
    /// before any part exists, e.g. to register part factories.
    pub fn bootstrap_with<F>(
        spec: InstrumentSpec,
        productions: &ProductionTable,
        configure: F,
    ) -> Result<Self, InstrumentError>
    where
        F: FnOnce(&mut PartRegistry) -> Result<(), RegistryError>,
    {
        if spec.name.trim().is_empty() {
            return Err(configuration_error("bootstrap", "instrument name cannot be empty"));
        }

        let mut kinds = KindTable::new();
        for kind in &spec.kinds {
            kinds.declare(KindEntry {
                kind: kind.kind.clone(),
                parent: kind.parent.clone(),
                cardinality: kind.cardinality,
            })?;
        }

        let mut registry = PartRegistry::new(spec.name.clone(), kinds);
        for substitution in &spec.substitutions {
            registry.substitute(
                substitution.abstract_kind.clone(),
                substitution.concrete.clone(),
            )?;
        }
        configure(&mut registry)?;

        let mut machines = StateMachineSet::new();
        for machine in spec.state_machines {
            machines.register(StateMachine::from_spec(machine)?)?;
        }
        for kind in &spec.kinds {
            if let Some(machine) = kind.state_machine.as_deref() {
                machines.bind(kind.kind.clone(), machine)?;
            }
        }

        let mut initial = BTreeMap::new();
        for part in &spec.parts {
            let concrete = registry.resolve_concrete_kind(&part.kind)?;
            let signature = spec
                .kinds
                .iter()
                .find(|kind| kind.kind == concrete || kind.kind == part.kind)
                .and_then(|kind| kind.signature.clone());
            let id = registry.create_part(part.kind.clone(), signature, part.values.clone())?;

            let Some(machine) = machines.machine_for(registry.kinds(), &concrete) else {
                if part.initial_state.is_some() {
                    return Err(configuration_error(
                        "bootstrap",
                        format!("part of kind '{}' has a state but no state machine", part.kind),
                    ));
                }
                continue;
            };
            let state = part
                .initial_state
                .clone()
                .unwrap_or_else(|| machine.initial().clone());
            if !machine.has_state(&state) {
                return Err(configuration_error(
                    "bootstrap",
                    format!(
                        "state '{}' is unknown to machine '{}' of kind '{}'",
                        state,
                        machine.name(),
                        part.kind
                    ),
                ));
            }
            machines.add_start(concrete.clone(), state.clone());
            initial.insert(id, PartCondition::at_rest(state));
        }

        let mut lattice = if spec.standard_tags {
            TagLattice::standard()?
        } else {
            TagLattice::new()
        };
        lattice.extend(spec.tags)?;

        let mut catalog = ChangeCatalog::new();
        for change in spec.changes {
            catalog.register(&lattice, registry.kinds(), change)?;
        }

        let graph = ChangeGraph::build(
            &catalog,
            &spec.wiring,
            productions,
            &machines,
            registry.kinds(),
        )?;

        registry.freeze();
        let unreachable: BTreeSet<&str> = catalog
            .iter()
            .map(|change| change.name.as_str())
            .filter(|name| !graph.is_reachable(name))
            .collect();
        if !unreachable.is_empty() {
            tracing::warn!(
                target: "instrument",
                instrument = %spec.name,
                changes = ?unreachable,
                "unreachable_changes"
            );
        }
        tracing::info!(
            target: "instrument",
            instrument = %spec.name,
            parts = registry.parts().len(),
            changes = catalog.len(),
            machines = machines.len(),
            edges = graph.edges().len(),
            "instrument_bootstrapped"
        );

        Ok(Self {
            name: spec.name,
            registry,
            lattice,
            catalog,
            machines,
            graph,
            initial,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn registry(&self) -> &PartRegistry {
        &self.registry
    }

    pub fn lattice(&self) -> &TagLattice {
        &self.lattice
    }

    pub fn catalog(&self) -> &ChangeCatalog {
        &self.catalog
    }

    pub fn machines(&self) -> &StateMachineSet {
        &self.machines
    }

    pub fn graph(&self) -> &ChangeGraph {
        &self.graph
    }

    pub fn initial_states(&self) -> &BTreeMap<PartId, PartCondition> {
        &self.initial
    }

    /// Rest snapshot every session starts from.
    pub fn rest_snapshot(&self) -> Snapshot {
        Snapshot::new(None, 0, self.initial.clone())
    }
}
