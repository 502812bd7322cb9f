use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::{
    performance::{Fragment, PerformanceGraph, Snapshot},
    planner::{
        checkpoint::{FrontierEntry, PlanningCheckpoint, PlanningCursor},
        context::PlanningContext,
        error::{PlannerError, cancelled, configuration_error, internal_error},
        explorer::Explorer,
        parallel::{next_batch, rebase},
        phase::{PlannerPhase, enter},
    },
    preference::PreferenceStack,
    score::{NodeBody, Score, ScoreNode},
};

/// Conductor-facing planner: grows one performance graph across a score,
/// committing each top-level unit as it completes.
pub struct Planner {
    context: Arc<PlanningContext>,
    graph: PerformanceGraph,
    cursor: PlanningCursor,
}

impl Planner {
    /// Starts from the instrument's rest snapshot.
    pub fn new(context: Arc<PlanningContext>) -> Result<Self, PlannerError> {
        let mut graph = PerformanceGraph::new();
        let rest = graph.intern(context.instrument().rest_snapshot())?;
        graph.add_root(rest.id)?;
        Ok(Self {
            context,
            graph,
            cursor: PlanningCursor {
                next_unit: 0,
                frontier: vec![FrontierEntry {
                    snapshot: rest.id,
                    score: 0.0,
                }],
            },
        })
    }

    pub fn from_checkpoint(
        context: Arc<PlanningContext>,
        checkpoint: PlanningCheckpoint,
    ) -> Result<Self, PlannerError> {
        if checkpoint.instrument != context.instrument().name() {
            return Err(configuration_error(format!(
                "checkpoint was planned for instrument '{}', not '{}'",
                checkpoint.instrument,
                context.instrument().name()
            )));
        }
        if checkpoint.cursor.frontier.is_empty() {
            return Err(configuration_error("checkpoint has an empty frontier"));
        }
        for entry in &checkpoint.cursor.frontier {
            checkpoint.graph.require(entry.snapshot)?;
        }
        checkpoint.graph.assert_invariants()?;

        tracing::info!(
            target: "planner",
            session_id = %context.session_id(),
            restored_session_id = %checkpoint.session_id,
            next_unit = checkpoint.cursor.next_unit,
            snapshots = checkpoint.graph.len(),
            "checkpoint_restored"
        );
        Ok(Self {
            context,
            graph: checkpoint.graph,
            cursor: checkpoint.cursor,
        })
    }

    /// Restores `checkpoint` and plans the rest of `score`.
    pub async fn resume(
        context: Arc<PlanningContext>,
        checkpoint: PlanningCheckpoint,
        score: &Score,
    ) -> Result<PerformanceGraph, PlannerError> {
        let mut planner = Self::from_checkpoint(context, checkpoint)?;
        planner.plan(score).await
    }

    pub fn context(&self) -> &Arc<PlanningContext> {
        &self.context
    }

    pub fn graph(&self) -> &PerformanceGraph {
        &self.graph
    }

    pub fn cursor(&self) -> &PlanningCursor {
        &self.cursor
    }

    pub fn checkpoint(&self) -> PlanningCheckpoint {
        PlanningCheckpoint::new(
            self.context.session_id(),
            self.context.instrument().name(),
            self.cursor.clone(),
            self.graph.clone(),
        )
    }

    /// Plans every remaining unit of `score`. Units with disjoint part
    /// footprints are explored on blocking workers and committed in score
    /// order.
    pub async fn plan(&mut self, score: &Score) -> Result<PerformanceGraph, PlannerError> {
        let units = score.units();
        let stack = self.unit_stack(score)?;
        self.check_cursor(units.len())?;
        let workers = self.context.config().workers;
        let beam = self.context.config().beam_width;

        while self.cursor.next_unit < units.len() {
            self.ensure_live()?;
            let start = self.cursor.next_unit;
            let end = next_batch(self.context.instrument(), &units, start, workers);
            let entries = self.frontier_entries()?;
            tracing::debug!(
                target: "planner",
                first_unit = start,
                units = end - start,
                "batch_started"
            );

            let handles: Vec<JoinHandle<Result<_, PlannerError>>> = units[start..end]
                .iter()
                .map(|node| self.spawn_unit(node, &stack, entries.clone()))
                .collect();

            for (offset, handle) in handles.into_iter().enumerate() {
                let node = units[start + offset];
                let explored = match self.join_unit(node, handle).await {
                    Ok(fragment) => fragment,
                    Err(err) => return Err(self.fail(err)),
                };
                let fragment = if offset == 0 {
                    explored
                } else {
                    let targets = self.frontier_entries()?;
                    match rebase(&explored, &targets, beam)? {
                        Some(rebased) => rebased,
                        None => {
                            tracing::debug!(
                                target: "planner",
                                phrase = %node.label,
                                "phrase_rebase_reexplored"
                            );
                            let handle = self.spawn_unit(node, &stack, targets);
                            match self.join_unit(node, handle).await {
                                Ok(fragment) => fragment,
                                Err(err) => return Err(self.fail(err)),
                            }
                        }
                    }
                };
                self.commit(&fragment)?;
            }
        }

        self.finish(score)
    }

    /// Sequential equivalent of [`Planner::plan`] for callers without a
    /// runtime.
    pub fn plan_blocking(&mut self, score: &Score) -> Result<PerformanceGraph, PlannerError> {
        let units = score.units();
        let stack = self.unit_stack(score)?;
        self.check_cursor(units.len())?;
        let context = Arc::clone(&self.context);
        let explorer = Explorer::new(&context);

        while self.cursor.next_unit < units.len() {
            self.ensure_live()?;
            let node = units[self.cursor.next_unit];
            let fragment = match explorer.explore_unit(node, &stack, self.frontier_entries()?) {
                Ok(fragment) => fragment,
                Err(err) => return Err(self.fail(err)),
            };
            self.commit(&fragment)?;
        }

        self.finish(score)
    }

    fn unit_stack(&self, score: &Score) -> Result<PreferenceStack, PlannerError> {
        let root = score.root();
        let stack = PreferenceStack::root(Arc::clone(self.context.preferences()));
        match &root.body {
            NodeBody::Children(_) => Ok(stack.child(root.level.scope(), &root.preferences)?),
            NodeBody::Instances(_) => Ok(stack),
        }
    }

    fn check_cursor(&self, units: usize) -> Result<(), PlannerError> {
        if self.cursor.next_unit > units {
            return Err(configuration_error(format!(
                "cursor points at unit {} but the score has {}",
                self.cursor.next_unit, units
            )));
        }
        Ok(())
    }

    fn ensure_live(&self) -> Result<(), PlannerError> {
        if self.context.is_cancelled() {
            return Err(cancelled("planning session was cancelled"));
        }
        Ok(())
    }

    fn frontier_entries(&self) -> Result<Vec<(Snapshot, f64)>, PlannerError> {
        self.cursor
            .frontier
            .iter()
            .map(|entry| Ok((self.graph.require(entry.snapshot)?.clone(), entry.score)))
            .collect()
    }

    fn spawn_unit(
        &self,
        node: &ScoreNode,
        stack: &PreferenceStack,
        entries: Vec<(Snapshot, f64)>,
    ) -> JoinHandle<Result<Fragment, PlannerError>> {
        let context = Arc::clone(&self.context);
        let node = node.clone();
        let stack = stack.clone();
        tokio::task::spawn_blocking(move || {
            Explorer::new(&context).explore_unit(&node, &stack, entries)
        })
    }

    async fn join_unit(
        &self,
        node: &ScoreNode,
        handle: JoinHandle<Result<Fragment, PlannerError>>,
    ) -> Result<Fragment, PlannerError> {
        handle.await.map_err(|err| {
            internal_error(format!("worker for '{}' did not finish: {err}", node.label))
        })?
    }

    fn commit(&mut self, fragment: &Fragment) -> Result<(), PlannerError> {
        let committed = self.graph.merge_fragment(fragment)?;
        self.cursor.frontier = committed
            .frontier
            .iter()
            .map(|(snapshot, score)| FrontierEntry {
                snapshot: *snapshot,
                score: *score,
            })
            .collect();
        self.cursor.next_unit += 1;

        tracing::info!(
            target: "planner",
            session_id = %self.context.session_id(),
            phrase = %fragment.label,
            new_snapshots = committed.new_snapshots,
            new_edges = committed.new_edges,
            frontier = self.cursor.frontier.len(),
            "phrase_committed"
        );
        Ok(())
    }

    fn fail(&self, err: PlannerError) -> PlannerError {
        let phrase = err.phrase.clone().unwrap_or_default();
        enter(&phrase, err.instance, PlannerPhase::Failed);
        tracing::warn!(
            target: "planner",
            session_id = %self.context.session_id(),
            kind = ?err.kind,
            phrase = %phrase,
            instance = ?err.instance,
            error = %err,
            "planning_failed"
        );
        err
    }

    fn finish(&self, score: &Score) -> Result<PerformanceGraph, PlannerError> {
        enter(&score.root().label, None, PlannerPhase::Done);
        self.graph.assert_invariants()?;
        tracing::info!(
            target: "planner",
            session_id = %self.context.session_id(),
            instances = score.instance_count(),
            snapshots = self.graph.len(),
            edges = self.graph.edge_count(),
            "planning_completed"
        );
        Ok(self.graph.clone())
    }
}
