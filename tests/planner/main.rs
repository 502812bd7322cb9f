#[path = "../support/mod.rs"]
mod support;

use std::collections::BTreeSet;

use performer::{
    PerformerError,
    config::PlannerConfig,
    performance::{PerformanceGraph, SnapshotId},
    planner::{CheckpointStore, Planner, PlannerErrorKind},
    preference::{PreferenceSpec, Scope},
    registry::ParamValue,
    score::{Demand, Instance, PartSelector, Score, ScoreElement, ScoreNode},
    state::StateTag,
};
use serde_json::json;

fn riff() -> Score {
    Score::new(ScoreNode::phrase(
        "riff",
        vec![
            support::play(0, "press", support::string(1), support::finger("left", 2)),
            support::play(10, "pluck", support::string(1), support::finger("right", 2)),
        ],
    ))
    .expect("riff should validate")
}

/// Two phrases touching disjoint fingers and strings.
fn duet() -> Score {
    Score::new(ScoreNode::score(
        "duet",
        vec![
            ScoreNode::phrase(
                "low",
                vec![support::play(
                    0,
                    "press",
                    support::string(1),
                    support::finger("left", 2),
                )],
            ),
            ScoreNode::phrase(
                "high",
                vec![support::play(
                    10,
                    "pluck",
                    support::string(2),
                    support::finger("right", 2),
                )],
            ),
        ],
    ))
    .expect("duet should validate")
}

fn open_pluck(start: u64) -> Instance {
    Instance::new(
        start,
        vec![ScoreElement::new("open", Demand::change("pluck")).on(support::string(1))],
    )
}

fn config_with(update: impl FnOnce(&mut PlannerConfig)) -> PlannerConfig {
    let mut config = support::planner_config();
    update(&mut config);
    config
}

fn plan_blocking(config: PlannerConfig, score: &Score) -> Result<PerformanceGraph, PerformerError> {
    let context = support::context(support::guitar(), config);
    let mut planner = Planner::new(context)?;
    Ok(planner.plan_blocking(score)?)
}

/// Snapshots and edges by content, independent of vertex numbering.
fn canonical(graph: &PerformanceGraph) -> (BTreeSet<String>, BTreeSet<String>) {
    let encode = |id: SnapshotId| {
        let snapshot = graph.require(id).expect("edge endpoint exists");
        serde_json::to_string(&(snapshot.instance, &snapshot.states)).expect("snapshot encodes")
    };
    let snapshots = graph.snapshots().map(|(id, _)| encode(id)).collect();
    let edges = graph
        .edges()
        .iter()
        .map(|edge| {
            format!(
                "{} -> {} via {}",
                encode(edge.from),
                encode(edge.to),
                serde_json::to_string(&edge.instruction).expect("instruction encodes")
            )
        })
        .collect();
    (snapshots, edges)
}

fn only_edge_changes(graph: &PerformanceGraph) -> BTreeSet<String> {
    graph
        .edges()
        .iter()
        .flat_map(|edge| edge.instruction.changes().map(str::to_string))
        .collect()
}

#[test]
fn given_press_then_pluck_when_planning_then_string_stays_pressed() {
    let instrument = support::guitar();
    let string = support::part_id(&instrument, &support::string(1));
    let context = support::context(instrument, support::planner_config());
    let mut planner = Planner::new(context).expect("planner should start");

    let graph = planner.plan_blocking(&riff()).expect("riff is playable");

    assert_eq!(graph.len(), 3);
    assert_eq!(graph.edge_count(), 2);
    assert_eq!(graph.roots().len(), 1);
    let pressed = graph.snapshots_at(Some(0));
    assert_eq!(pressed.len(), 1);
    let condition = graph
        .require(pressed[0])
        .expect("snapshot exists")
        .condition(string)
        .expect("string has a condition");
    assert_eq!(condition.state, StateTag::new("pressed"));
    assert_eq!(condition.last_change.as_deref(), Some("press"));

    let plucked = graph.snapshots_at(Some(1));
    let after = graph
        .require(plucked[0])
        .expect("snapshot exists")
        .condition(string)
        .expect("string has a condition");
    assert_eq!(after.state, StateTag::new("pressed"));
    assert_eq!(after.previous_change.as_deref(), Some("press"));
    assert_eq!(planner.cursor().next_unit, 1);
}

#[test]
fn given_unknown_change_when_planning_then_unperformable_names_phrase() {
    let score = Score::new(ScoreNode::phrase(
        "riff",
        vec![support::play(
            0,
            "slide",
            support::string(1),
            support::finger("left", 2),
        )],
    ))
    .expect("score should validate");

    let err = plan_blocking(support::planner_config(), &score).expect_err("slide is unknown");
    assert!(err.is_unperformable());
    let PerformerError::Planner(err) = err else {
        panic!("expected a planner error");
    };
    assert_eq!(err.phrase.as_deref(), Some("riff"));
    assert_eq!(err.instance, Some(0));
    assert!(err.message.contains("slide"));
}

#[test]
fn given_hammer_on_from_rest_when_planning_then_press_fallback_is_recorded() {
    let instrument = support::guitar();
    let string = support::part_id(&instrument, &support::string(1));
    let score = Score::new(ScoreNode::phrase(
        "legato",
        vec![
            support::play(0, "hammer_on", support::string(1), support::finger("left", 2)),
            support::play(10, "pluck", support::string(1), support::finger("right", 2)),
        ],
    ))
    .expect("score should validate");

    let context = support::context(instrument, support::planner_config());
    let graph = Planner::new(context)
        .expect("planner should start")
        .plan_blocking(&score)
        .expect("hammer-on settles into a press");

    let hammer = graph
        .edges()
        .iter()
        .find(|edge| edge.instruction.instance == 0)
        .expect("first instance has an edge");
    assert_eq!(hammer.instruction.interactions[0].fallbacks, vec!["press".to_string()]);
    assert_eq!(
        hammer.instruction.interactions[0].element.as_deref(),
        Some("hammer_on")
    );

    let settled = graph
        .require(hammer.to)
        .expect("snapshot exists")
        .condition(string)
        .expect("string has a condition");
    assert_eq!(settled.state, StateTag::new("pressed"));
    assert_eq!(settled.last_change.as_deref(), Some("press"));
    assert_eq!(settled.previous_change.as_deref(), Some("hammer_on"));
}

#[test]
fn given_press_and_pluck_history_when_hammering_then_conditional_edge_applies() {
    let score = Score::new(ScoreNode::phrase(
        "lick",
        vec![
            support::play(0, "press", support::string(1), support::finger("left", 2)),
            support::play(10, "pluck", support::string(1), support::finger("right", 2)),
            support::play(20, "hammer_on", support::string(1), support::finger("left", 3)),
        ],
    ))
    .expect("score should validate");

    let graph = plan_blocking(support::planner_config(), &score).expect("lick is playable");
    assert_eq!(graph.edge_count(), 3);
    assert_eq!(graph.snapshots_at(Some(2)).len(), 1);
}

#[test]
fn given_pluck_without_press_when_hammering_then_unperformable() {
    let score = Score::new(ScoreNode::phrase(
        "lick",
        vec![
            support::play(0, "pluck", support::string(1), support::finger("right", 2)),
            support::play(10, "hammer_on", support::string(1), support::finger("left", 3)),
        ],
    ))
    .expect("score should validate");

    let err = plan_blocking(support::planner_config(), &score)
        .expect_err("hammer-on after a bare pluck has no edge");
    assert!(err.is_unperformable());
}

#[test]
fn given_tag_demand_when_planning_then_every_matching_change_branches() {
    let instrument = support::guitar();
    let string = support::part_id(&instrument, &support::string(1));
    let element = ScoreElement::new(
        "any_pitch",
        Demand::Tags {
            actions: Vec::new(),
            effects: vec!["pitched".to_string()],
            reactions: Vec::new(),
        },
    )
    .on(support::string(1))
    .by(support::finger("left", 2));
    let score = Score::new(ScoreNode::phrase("tags", vec![Instance::new(0, vec![element])]))
        .expect("score should validate");

    let context = support::context(instrument, support::planner_config());
    let graph = Planner::new(context)
        .expect("planner should start")
        .plan_blocking(&score)
        .expect("pitched changes exist");

    assert_eq!(graph.snapshots_at(Some(0)).len(), 2);
    assert_eq!(
        only_edge_changes(&graph),
        BTreeSet::from(["hammer_on".to_string(), "pluck".to_string()])
    );
    let states: BTreeSet<String> = graph
        .snapshots_at(Some(0))
        .into_iter()
        .filter_map(|id| graph.require(id).ok()?.condition(string).cloned())
        .map(|condition| condition.state.to_string())
        .collect();
    assert_eq!(
        states,
        BTreeSet::from(["idle".to_string(), "pressed".to_string()])
    );
}

#[test]
fn given_unknown_tag_when_planning_then_unperformable() {
    let element = ScoreElement::new(
        "mystery",
        Demand::Tags {
            actions: vec!["bow".to_string()],
            effects: Vec::new(),
            reactions: Vec::new(),
        },
    );
    let score = Score::new(ScoreNode::phrase("tags", vec![Instance::new(0, vec![element])]))
        .expect("score should validate");

    let err = plan_blocking(support::planner_config(), &score).expect_err("bow is not a tag");
    assert!(err.is_unperformable());
}

#[test]
fn given_section_preference_when_planning_then_nested_phrase_inherits_it() {
    let instrument = support::guitar();
    let right = support::part_id(&instrument, &support::finger("right", 2));
    let left = support::part_id(&instrument, &support::finger("left", 2));
    let prefer_right = PreferenceSpec::new("right_hand", "prefer_part", Scope::Note)
        .with_params(json!({ "kind": "finger", "at": 0, "value": "right" }));
    let narrow = config_with(|config| config.beam_width = 1);

    let preferred = Score::new(ScoreNode::score(
        "piece",
        vec![
            ScoreNode::section("verse", vec![ScoreNode::phrase("open", vec![open_pluck(0)])])
                .with_preferences(vec![prefer_right]),
        ],
    ))
    .expect("score should validate");
    let graph = Planner::new(support::context(instrument.clone(), narrow.clone()))
        .expect("planner should start")
        .plan_blocking(&preferred)
        .expect("open string is playable");
    assert_eq!(graph.edge_count(), 1);
    assert_eq!(graph.edges()[0].instruction.interactions[0].masculine, right);

    let plain = Score::new(ScoreNode::phrase("open", vec![open_pluck(0)]))
        .expect("score should validate");
    let graph = Planner::new(support::context(instrument, narrow))
        .expect("planner should start")
        .plan_blocking(&plain)
        .expect("open string is playable");
    assert_eq!(graph.edges()[0].instruction.interactions[0].masculine, left);
}

#[test]
fn given_unsatisfiable_phrase_preference_when_planning_then_it_is_relaxed() {
    let forbid_all = PreferenceSpec::new("silence", "max_interactions", Scope::Note)
        .with_params(json!({ "max": 0 }));
    let score = Score::new(
        ScoreNode::phrase(
            "open",
            vec![support::play(
                0,
                "pluck",
                support::string(1),
                support::finger("right", 2),
            )],
        )
        .with_preferences(vec![forbid_all]),
    )
    .expect("score should validate");

    let graph = plan_blocking(support::planner_config(), &score)
        .expect("own preferences are dropped on failure");
    assert_eq!(graph.edge_count(), 1);
}

#[test]
fn given_preference_coarser_than_phrase_when_planning_then_configuration_error() {
    let whole = PreferenceSpec::new("whole", "fewest_parts", Scope::Score);
    let score = Score::new(
        ScoreNode::phrase("open", vec![open_pluck(0)]).with_preferences(vec![whole]),
    )
    .expect("score should validate");

    let err = plan_blocking(support::planner_config(), &score).expect_err("scope is too coarse");
    let PerformerError::Planner(err) = err else {
        panic!("expected a planner error");
    };
    assert_eq!(err.kind, PlannerErrorKind::Configuration);
}

#[test]
fn given_zero_phrase_deadline_when_planning_then_timeouts_escalate() {
    let config = config_with(|config| {
        config.phrase_timeout_ms = 0;
        config.phrase_retries = 1;
    });

    let err = plan_blocking(config, &riff()).expect_err("no phrase fits a zero deadline");
    assert!(err.is_unperformable());
    let PerformerError::Planner(err) = err else {
        panic!("expected a planner error");
    };
    assert_eq!(err.phrase.as_deref(), Some("riff"));
    assert!(err.message.contains("timed out 2 times"));
}

#[test]
fn given_cancelled_session_when_planning_then_cancelled() {
    let context = support::context(support::guitar(), support::planner_config());
    context.shutdown();
    let mut planner = Planner::new(context).expect("planner should start");

    let err = planner
        .plan_blocking(&riff())
        .expect_err("session is cancelled");
    assert_eq!(err.kind, PlannerErrorKind::Cancelled);
    assert_eq!(planner.cursor().next_unit, 0);
    assert_eq!(planner.graph().len(), 1);
}

#[tokio::test]
async fn given_disjoint_phrases_when_planning_in_parallel_then_result_matches_sequential() {
    let parallel = config_with(|config| config.workers = 2);

    let mut first = Planner::new(support::context(support::guitar(), parallel.clone()))
        .expect("planner should start");
    let first = first.plan(&duet()).await.expect("duet is playable");
    let mut second = Planner::new(support::context(support::guitar(), parallel))
        .expect("planner should start");
    let second = second.plan(&duet()).await.expect("duet is playable");

    assert_eq!(
        serde_json::to_value(&first).expect("graph encodes"),
        serde_json::to_value(&second).expect("graph encodes")
    );

    let sequential = plan_blocking(support::planner_config(), &duet()).expect("duet is playable");
    assert_eq!(canonical(&first), canonical(&sequential));
    assert_eq!(first.edge_count(), 2);
    assert_eq!(first.snapshots_at(Some(1)).len(), 1);
}

#[tokio::test]
async fn given_shared_part_when_planning_in_parallel_then_units_still_chain() {
    let score = Score::new(ScoreNode::score(
        "chain",
        vec![
            ScoreNode::phrase(
                "press",
                vec![support::play(
                    0,
                    "press",
                    support::string(1),
                    support::finger("left", 2),
                )],
            ),
            ScoreNode::phrase(
                "release",
                vec![support::play(
                    10,
                    "release",
                    support::string(1),
                    support::finger("left", 2),
                )],
            ),
        ],
    ))
    .expect("score should validate");

    let mut planner = Planner::new(support::context(
        support::guitar(),
        config_with(|config| config.workers = 4),
    ))
    .expect("planner should start");
    let graph = planner
        .plan(&score)
        .await
        .expect("release follows the press");

    assert_eq!(graph.edge_count(), 2);
    assert_eq!(
        only_edge_changes(&graph),
        BTreeSet::from(["press".to_string(), "release".to_string()])
    );
}

#[tokio::test]
async fn given_saved_checkpoint_when_resuming_then_remaining_units_are_planned() {
    let dir = support::scratch_dir("resume");
    let store = CheckpointStore::new(dir.join("checkpoint.json"));
    assert!(store.load().expect("missing file is not an error").is_none());

    let prefix = Score::new(ScoreNode::score(
        "duet",
        vec![ScoreNode::phrase(
            "low",
            vec![support::play(
                0,
                "press",
                support::string(1),
                support::finger("left", 2),
            )],
        )],
    ))
    .expect("prefix should validate");
    let mut planner = Planner::new(support::context(support::guitar(), support::planner_config()))
        .expect("planner should start");
    planner.plan(&prefix).await.expect("prefix is playable");
    store
        .save(&planner.checkpoint())
        .expect("checkpoint should save");

    let checkpoint = store
        .load()
        .expect("checkpoint should load")
        .expect("checkpoint exists");
    assert_eq!(checkpoint.cursor.next_unit, 1);
    assert_eq!(checkpoint.instrument, "guitar");

    let resumed = Planner::resume(
        support::context(support::guitar(), support::planner_config()),
        checkpoint,
        &duet(),
    )
    .await
    .expect("resume should finish the duet");
    let sequential = plan_blocking(support::planner_config(), &duet()).expect("duet is playable");
    assert_eq!(canonical(&resumed), canonical(&sequential));

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn given_checkpoint_from_future_version_when_loading_then_persistence_error() {
    let dir = support::scratch_dir("version");
    let path = dir.join("checkpoint.json");
    let store = CheckpointStore::new(path.clone());
    let planner = Planner::new(support::context(support::guitar(), support::planner_config()))
        .expect("planner should start");
    store
        .save(&planner.checkpoint())
        .expect("checkpoint should save");

    let mut document: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(&path).expect("checkpoint should be readable"),
    )
    .expect("checkpoint is json");
    document["version"] = json!(99);
    std::fs::write(&path, document.to_string()).expect("checkpoint should be writable");

    let err = store.load().expect_err("version 99 is unsupported");
    assert_eq!(err.kind, PlannerErrorKind::Persistence);
    assert!(err.message.contains("99"));

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn given_checkpoint_for_other_instrument_when_restoring_then_configuration_error() {
    let planner = Planner::new(support::context(support::guitar(), support::planner_config()))
        .expect("planner should start");
    let mut checkpoint = planner.checkpoint();
    checkpoint.instrument = "lute".to_string();

    let err = Planner::from_checkpoint(
        support::context(support::guitar(), support::planner_config()),
        checkpoint,
    )
    .err()
    .expect("instrument names differ");
    assert_eq!(err.kind, PlannerErrorKind::Configuration);
    assert!(err.message.contains("lute"));
}

/// Phrase `lead` on string 1, then a section whose phrase plucks string 2
/// twice with either left finger and reviews finger switches.
fn lead_and_reviewed_verse() -> Score {
    let left_hand = PartSelector::kind("finger").with_values([ParamValue::symbol("left")]);
    let steady = PreferenceSpec::new("steady", "consistent_binding", Scope::Phrase);
    Score::new(ScoreNode::score(
        "piece",
        vec![
            ScoreNode::phrase(
                "lead",
                vec![support::play(
                    0,
                    "pluck",
                    support::string(1),
                    support::finger("right", 2),
                )],
            ),
            ScoreNode::section(
                "verse",
                vec![
                    ScoreNode::phrase(
                        "strum",
                        vec![
                            support::play(10, "pluck", support::string(2), left_hand.clone()),
                            support::play(20, "pluck", support::string(2), left_hand),
                        ],
                    )
                    .with_preferences(vec![steady]),
                ],
            ),
        ],
    ))
    .expect("score should validate")
}

fn frontier_scores(planner: &Planner) -> Vec<f64> {
    let mut scores: Vec<f64> = planner
        .cursor()
        .frontier
        .iter()
        .map(|entry| entry.score)
        .collect();
    scores.sort_by(f64::total_cmp);
    scores
}

#[tokio::test]
async fn given_nested_phrase_review_when_planning_in_parallel_then_frontier_scores_match_sequential()
{
    let score = lead_and_reviewed_verse();

    let mut sequential = Planner::new(support::context(support::guitar(), support::planner_config()))
        .expect("planner should start");
    let sequential_graph = sequential
        .plan_blocking(&score)
        .expect("verse is playable");

    let mut parallel = Planner::new(support::context(
        support::guitar(),
        config_with(|config| config.workers = 2),
    ))
    .expect("planner should start");
    let parallel_graph = parallel.plan(&score).await.expect("verse is playable");

    assert_eq!(frontier_scores(&sequential), vec![-1.0, 0.0, 0.0]);
    assert_eq!(frontier_scores(&parallel), frontier_scores(&sequential));
    assert_eq!(canonical(&parallel_graph), canonical(&sequential_graph));
}
