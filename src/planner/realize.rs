use std::collections::BTreeSet;

use crate::{
    change_graph::{PartBinding, ProductionContext},
    instrument::Instrument,
    planner::imagine::Demanded,
    registry::{Part, PartId},
    score::PartSelector,
    state::StateView,
    taxonomy::Change,
    types::Interaction,
};

/// Candidate interaction sets for one snapshot, at most `limit` of them.
///
/// Each set answers every demanded element once; no part is bound twice in
/// the same role within a set.
pub(crate) fn realize(
    instrument: &Instrument,
    states: &StateView,
    demanded: &[Demanded<'_>],
    limit: usize,
) -> Vec<Vec<Interaction>> {
    let options: Vec<Vec<Interaction>> = demanded
        .iter()
        .map(|demand| element_options(instrument, states, demand))
        .collect();
    if options.iter().any(Vec::is_empty) {
        return Vec::new();
    }

    let mut combinations = Vec::new();
    let mut current = Vec::with_capacity(options.len());
    combine(
        &options,
        &mut current,
        &mut BTreeSet::new(),
        &mut BTreeSet::new(),
        limit,
        &mut combinations,
    );
    combinations
}

fn element_options(
    instrument: &Instrument,
    states: &StateView,
    demand: &Demanded<'_>,
) -> Vec<Interaction> {
    let mut options = Vec::new();
    for change in &demand.changes {
        let masculine = candidate_parts(instrument, change, true, demand.element.performer.as_ref());
        let feminine = candidate_parts(instrument, change, false, demand.element.target.as_ref());
        let context = ProductionContext {
            registry: instrument.registry(),
            states,
            change,
        };

        for feminine_part in &feminine {
            let Some(condition) = states.get(feminine_part.id) else {
                continue;
            };
            let edges = instrument.graph().edges_into(&change.name, condition);
            if edges.is_empty() {
                continue;
            }
            for masculine_part in &masculine {
                if masculine_part.id == feminine_part.id || states.get(masculine_part.id).is_none() {
                    continue;
                }
                let binding = PartBinding {
                    masculine: masculine_part.id,
                    feminine: feminine_part.id,
                };
                if let Some(mut interaction) = edges
                    .iter()
                    .find_map(|edge| edge.production.produce(&context, &binding))
                {
                    interaction.element = Some(demand.element.id.clone());
                    options.push(interaction);
                }
            }
        }
    }
    options
}

/// Parts that may fill one role of `change`, narrowed by `selector`.
pub(crate) fn candidate_parts<'a>(
    instrument: &'a Instrument,
    change: &Change,
    masculine: bool,
    selector: Option<&PartSelector>,
) -> Vec<&'a Part> {
    let registry = instrument.registry();
    let kind = if masculine {
        &change.masculine
    } else {
        &change.feminine
    };
    registry
        .parts_of_kind(kind)
        .into_iter()
        .filter(|part| selector.is_none_or(|selector| selector.matches(registry, part)))
        .collect()
}

fn combine(
    options: &[Vec<Interaction>],
    current: &mut Vec<Interaction>,
    masculine: &mut BTreeSet<PartId>,
    feminine: &mut BTreeSet<PartId>,
    limit: usize,
    out: &mut Vec<Vec<Interaction>>,
) {
    if out.len() >= limit {
        return;
    }
    let Some((first, rest)) = options.split_first() else {
        out.push(current.clone());
        return;
    };

    for option in first {
        if masculine.contains(&option.masculine) || feminine.contains(&option.feminine) {
            continue;
        }
        masculine.insert(option.masculine);
        feminine.insert(option.feminine);
        current.push(option.clone());
        combine(rest, current, masculine, feminine, limit, out);
        current.pop();
        masculine.remove(&option.masculine);
        feminine.remove(&option.feminine);
        if out.len() >= limit {
            return;
        }
    }
}
