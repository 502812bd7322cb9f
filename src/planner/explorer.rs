use std::time::{Duration, Instant};

use crate::{
    performance::{Fragment, Snapshot},
    planner::{
        adjust::adjust,
        context::PlanningContext,
        error::{PlannerError, PlannerErrorKind, cancelled, timeout, unperformable},
        imagine::imagine,
        phase::{PlannerPhase, enter},
        realize::realize,
    },
    preference::{AsConnective, Connective, PhrasePath, PreferenceStack, Ranked},
    registry::PartRegistry,
    score::{Instance, NodeBody, ScoreLevel, ScoreNode},
    state::StateView,
    types::{InstanceIndex, Instruction},
};

struct Candidate<'a> {
    registry: &'a PartRegistry,
    instance: InstanceIndex,
    instruction: Instruction,
    before: &'a StateView,
    after: StateView,
}

impl AsConnective for Candidate<'_> {
    fn connective(&self) -> Connective<'_> {
        Connective {
            registry: self.registry,
            instance: self.instance,
            instruction: &self.instruction,
            before: self.before,
            after: &self.after,
        }
    }
}

/// Recursive imagine/realize/adjust/filter search over one score subtree.
pub(crate) struct Explorer<'a> {
    context: &'a PlanningContext,
}

impl<'a> Explorer<'a> {
    pub(crate) fn new(context: &'a PlanningContext) -> Self {
        Self { context }
    }

    /// Explores `node` from `entries` into a private fragment.
    ///
    /// A timed-out attempt is retried up to `phrase_retries` times; a node
    /// that cannot be performed under its own preferences is retried once
    /// with only the inherited ones. Anything else fails the node.
    pub(crate) fn explore_unit(
        &self,
        node: &ScoreNode,
        parent: &PreferenceStack,
        entries: Vec<(Snapshot, f64)>,
    ) -> Result<Fragment, PlannerError> {
        let stack = parent.child(node.level.scope(), &node.preferences)?;
        let mut active = stack.clone();
        let mut relaxed = false;
        let mut timeouts = 0;

        loop {
            self.ensure_live()?;
            let err = match self.explore_node(node, &active, entries.clone()) {
                Ok(fragment) => return Ok(fragment),
                Err(err) => err,
            };

            match err.kind {
                PlannerErrorKind::Timeout => {
                    timeouts += 1;
                    if timeouts > self.context.config().phrase_retries {
                        tracing::warn!(
                            target: "planner",
                            phrase = %node.label,
                            attempts = timeouts,
                            "phrase_timeout_escalated"
                        );
                        return Err(unperformable(
                            err.instance,
                            &node.label,
                            format!("exploration timed out {} times", timeouts),
                        ));
                    }
                    tracing::warn!(
                        target: "planner",
                        phrase = %node.label,
                        attempt = timeouts,
                        "phrase_timeout_retry"
                    );
                }
                PlannerErrorKind::Unperformable if !relaxed && stack.has_own() => {
                    relaxed = true;
                    active = stack.without_own();
                    tracing::info!(
                        target: "planner",
                        phrase = %node.label,
                        instance = ?err.instance,
                        reason = %err.message,
                        "phrase_preferences_relaxed"
                    );
                }
                _ => return Err(err.scoped_to(&node.label)),
            }
        }
    }

    fn explore_node(
        &self,
        node: &ScoreNode,
        stack: &PreferenceStack,
        entries: Vec<(Snapshot, f64)>,
    ) -> Result<Fragment, PlannerError> {
        let config = self.context.config();
        let deadline = (node.level == ScoreLevel::Phrase)
            .then(|| Instant::now() + Duration::from_millis(config.phrase_timeout_ms));
        let mut fragment = Fragment::begin(node.label.clone(), entries)?;

        match &node.body {
            NodeBody::Instances(instances) => {
                for instance in instances {
                    self.ensure_live()?;
                    if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                        return Err(timeout(instance.index, &node.label));
                    }
                    self.step(&mut fragment, instance, stack, &node.label)?;
                }
            }
            NodeBody::Children(children) => {
                for child in children {
                    self.ensure_live()?;
                    let child_fragment =
                        self.explore_unit(child, stack, fragment.frontier_entries()?)?;
                    fragment.absorb(&child_fragment)?;
                }
            }
        }

        if stack.has_review() {
            let registry = self.context.instrument().registry();
            for id in fragment.frontier().to_vec() {
                let delta = stack.review(&PhrasePath {
                    registry,
                    instructions: fragment.path(id),
                });
                fragment.adjust_score(id, delta);
            }
        }
        fragment.trim_frontier(config.beam_width);

        tracing::debug!(
            target: "planner",
            phrase = %node.label,
            snapshots = fragment.graph().len(),
            frontier = fragment.frontier().len(),
            "phrase_explored"
        );
        Ok(fragment)
    }

    /// One planning iteration: every frontier snapshot against one instance.
    fn step(
        &self,
        fragment: &mut Fragment,
        instance: &Instance,
        stack: &PreferenceStack,
        label: &str,
    ) -> Result<(), PlannerError> {
        let instrument = self.context.instrument();
        let config = self.context.config();
        let at = Some(instance.index);

        enter(label, at, PlannerPhase::Imagining);
        let demanded = imagine(instrument, instance);
        if let Some(missing) = demanded.iter().find(|demand| demand.changes.is_empty()) {
            enter(label, at, PlannerPhase::Failed);
            return Err(unperformable(
                at,
                label,
                format!("no admissible change for element '{}'", missing.element.id),
            ));
        }

        let mut next_frontier = Vec::new();
        for from in fragment.frontier().to_vec() {
            let before = StateView::new(fragment.snapshot(from)?.states.clone());

            enter(label, at, PlannerPhase::Realizing);
            let options = realize(
                instrument,
                &before,
                &demanded,
                config.max_candidates_per_instance,
            );

            enter(label, at, PlannerPhase::Adjusting);
            let mut candidates = Vec::with_capacity(options.len());
            for mut interactions in options {
                let after = adjust(instrument, &before, &mut interactions)?;
                candidates.push(Candidate {
                    registry: instrument.registry(),
                    instance: instance.index,
                    instruction: Instruction::new(instance.index, interactions),
                    before: &before,
                    after,
                });
            }

            enter(label, at, PlannerPhase::Filtering);
            for Ranked { item, score } in stack.rank(candidates, config.beam_width) {
                let Candidate {
                    instruction, after, ..
                } = item;
                let snapshot = Snapshot::new(at, instance.start, after.into_states());
                let id = fragment.extend(from, snapshot, instruction, score)?;
                if !next_frontier.contains(&id) {
                    next_frontier.push(id);
                }
            }
        }

        if next_frontier.is_empty() {
            enter(label, at, PlannerPhase::Failed);
            return Err(unperformable(
                at,
                label,
                "no admissible instruction from any frontier snapshot",
            ));
        }
        fragment.set_frontier(next_frontier);
        fragment.trim_frontier(config.beam_width);
        Ok(())
    }

    fn ensure_live(&self) -> Result<(), PlannerError> {
        if self.context.is_cancelled() {
            return Err(cancelled("planning session was cancelled"));
        }
        Ok(())
    }
}
