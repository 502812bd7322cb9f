use std::sync::Arc;

use crate::{
    instrument::Instrument,
    score::{Demand, Instance, ScoreElement},
    taxonomy::Change,
};

/// One score element with the changes that could answer it.
pub(crate) struct Demanded<'a> {
    pub element: &'a ScoreElement,
    pub changes: Vec<Arc<Change>>,
}

/// Maps each element of `instance` to the reachable changes it admits. An
/// unknown change or tag admits nothing.
pub(crate) fn imagine<'a>(instrument: &Instrument, instance: &'a Instance) -> Vec<Demanded<'a>> {
    instance
        .elements
        .iter()
        .map(|element| Demanded {
            element,
            changes: admissible_changes(instrument, &element.demand),
        })
        .collect()
}

fn admissible_changes(instrument: &Instrument, demand: &Demand) -> Vec<Arc<Change>> {
    let graph = instrument.graph();
    let candidates: Vec<Arc<Change>> = match demand {
        Demand::Change { name } => instrument.catalog().get(name).cloned().into_iter().collect(),
        Demand::Tags {
            actions,
            effects,
            reactions,
        } => {
            let lattice = instrument.lattice();
            let required: Option<Vec<_>> = actions
                .iter()
                .chain(effects)
                .chain(reactions)
                .map(|name| lattice.id(name))
                .collect();
            match required {
                Some(required) => instrument.catalog().matching(lattice, &required),
                None => Vec::new(),
            }
        }
    };

    candidates
        .into_iter()
        .filter(|change| graph.is_reachable(&change.name))
        .collect()
}
