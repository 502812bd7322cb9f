use crate::{
    instrument::Instrument,
    planner::error::{PlannerError, internal_error},
    registry::PartId,
    state::StateView,
    types::Interaction,
};

/// Applies every interaction to its parts, folding instantaneous fallbacks,
/// and returns the resulting view. Fallbacks taken by the feminine part are
/// recorded on the interaction.
pub(crate) fn adjust(
    instrument: &Instrument,
    before: &StateView,
    interactions: &mut [Interaction],
) -> Result<StateView, PlannerError> {
    let mut after = before.fork();
    for interaction in interactions.iter_mut() {
        let fallbacks = settle_part(instrument, &mut after, interaction.feminine, &interaction.change)?;
        interaction.fallbacks = fallbacks;
        if interaction.masculine != interaction.feminine {
            settle_part(instrument, &mut after, interaction.masculine, &interaction.change)?;
        }
    }
    Ok(after)
}

fn settle_part(
    instrument: &Instrument,
    view: &mut StateView,
    part: PartId,
    change: &str,
) -> Result<Vec<String>, PlannerError> {
    let registry = instrument.registry();
    let kind = &registry
        .part(part)
        .ok_or_else(|| internal_error(format!("{} is not registered", part)))?
        .concrete_kind;
    let machine = instrument.machines().require(registry.kinds(), kind)?;
    let condition = view
        .get(part)
        .ok_or_else(|| internal_error(format!("{} has no recorded state", part)))?
        .clone();

    let settled = machine.settle(&condition.state, change)?;
    let mut next = condition;
    for applied in &settled.applied {
        if instrument.graph().vertex(applied).is_some() {
            next = next.after(applied, settled.state.clone());
        }
    }
    next.state = settled.state;
    view.set(part, next);

    Ok(settled.applied.into_iter().skip(1).collect())
}
