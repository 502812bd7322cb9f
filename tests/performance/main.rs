use std::collections::BTreeMap;

use performer::{
    performance::{Fragment, PerformanceErrorKind, PerformanceGraph, Snapshot, SnapshotId},
    registry::PartId,
    state::{PartCondition, StateTag},
    types::{Instruction, Interaction},
};

/// Finger 0 on string 1; `string` is the string's state tag.
fn snapshot(instance: Option<usize>, start: u64, string: &str) -> Snapshot {
    Snapshot::new(
        instance,
        start,
        BTreeMap::from([
            (PartId(0), PartCondition::at_rest(StateTag::new("free"))),
            (PartId(1), PartCondition::at_rest(StateTag::new(string))),
        ]),
    )
}

fn instruction(instance: usize, change: &str) -> Instruction {
    Instruction::new(instance, vec![Interaction::new(change, PartId(0), PartId(1))])
}

#[test]
fn given_equal_state_at_same_instance_when_interning_then_vertex_is_shared() {
    let mut graph = PerformanceGraph::new();
    let first = graph
        .intern(snapshot(Some(0), 0, "pressed"))
        .expect("intern should succeed");
    let again = graph
        .intern(snapshot(Some(0), 240, "pressed"))
        .expect("intern should succeed");
    let other_instance = graph
        .intern(snapshot(Some(1), 240, "pressed"))
        .expect("intern should succeed");

    assert!(first.inserted);
    assert!(!again.inserted);
    assert_eq!(first.id, again.id);
    assert!(other_instance.inserted);
    assert_ne!(first.id, other_instance.id);
    assert_eq!(graph.len(), 2);
    assert_eq!(graph.snapshots_at(Some(0)), vec![first.id]);
    graph.assert_invariants().expect("graph stays merged");
}

#[test]
fn given_repeated_edge_when_connecting_then_best_score_is_kept() {
    let mut graph = PerformanceGraph::new();
    let rest = graph.intern(snapshot(None, 0, "idle")).expect("intern").id;
    let pressed = graph
        .intern(snapshot(Some(0), 0, "pressed"))
        .expect("intern")
        .id;

    assert!(
        graph
            .connect(rest, pressed, instruction(0, "press"), 1.0)
            .expect("connect")
    );
    assert!(
        !graph
            .connect(rest, pressed, instruction(0, "press"), 3.0)
            .expect("connect")
    );
    assert!(
        !graph
            .connect(rest, pressed, instruction(0, "press"), -2.0)
            .expect("connect")
    );
    assert!(
        graph
            .connect(rest, pressed, instruction(0, "hammer_on"), 0.5)
            .expect("connect")
    );

    assert_eq!(graph.edge_count(), 2);
    assert_eq!(graph.edges()[0].score, 3.0);
    assert_eq!(graph.outgoing(rest).count(), 2);
    assert_eq!(graph.incoming(pressed).count(), 2);
}

#[test]
fn given_unknown_vertex_when_connecting_then_not_found() {
    let mut graph = PerformanceGraph::new();
    let rest = graph.intern(snapshot(None, 0, "idle")).expect("intern").id;

    let err = graph
        .connect(rest, SnapshotId(7), instruction(0, "press"), 0.0)
        .expect_err("target does not exist");
    assert_eq!(err.kind, PerformanceErrorKind::NotFound);
}

#[test]
fn given_two_paths_to_one_vertex_when_extending_then_best_path_wins() {
    let mut fragment =
        Fragment::begin("phrase", vec![(snapshot(None, 0, "idle"), 0.0)]).expect("begin");
    let entry = fragment.entries()[0];

    let weak = fragment
        .extend(entry, snapshot(Some(0), 0, "pressed"), instruction(0, "press"), 1.0)
        .expect("extend");
    let strong = fragment
        .extend(
            entry,
            snapshot(Some(0), 0, "pressed"),
            instruction(0, "hammer_on"),
            2.0,
        )
        .expect("extend");

    assert_eq!(weak, strong);
    assert_eq!(fragment.score(strong), 2.0);
    assert_eq!(fragment.path(strong), &[instruction(0, "hammer_on")]);
    assert_eq!(fragment.graph().edge_count(), 2);
    assert!(fragment.footprint().contains(&PartId(1)));
}

#[test]
fn given_wide_frontier_when_trimming_then_best_scores_remain() {
    let mut fragment =
        Fragment::begin("phrase", vec![(snapshot(None, 0, "idle"), 0.0)]).expect("begin");
    let entry = fragment.entries()[0];
    let idle = fragment
        .extend(entry, snapshot(Some(0), 0, "idle"), instruction(0, "pluck"), -1.0)
        .expect("extend");
    let pressed = fragment
        .extend(entry, snapshot(Some(0), 0, "pressed"), instruction(0, "press"), 0.5)
        .expect("extend");

    fragment.set_frontier(vec![idle, pressed]);
    fragment.adjust_score(idle, 4.0);
    assert_eq!(fragment.bonus(idle), 4.0);
    assert_eq!(fragment.score(idle), 3.0);

    fragment.trim_frontier(1);
    assert_eq!(fragment.frontier(), &[idle]);
}

#[test]
fn given_child_fragment_when_absorbing_then_paths_and_scores_chain() {
    let mut phrase =
        Fragment::begin("section", vec![(snapshot(None, 0, "idle"), 0.0)]).expect("begin");
    let entry = phrase.entries()[0];
    let pressed = phrase
        .extend(entry, snapshot(Some(0), 0, "pressed"), instruction(0, "press"), 1.0)
        .expect("extend");
    phrase.set_frontier(vec![pressed]);

    let mut child =
        Fragment::begin("bar", phrase.frontier_entries().expect("entries")).expect("begin");
    let child_entry = child.entries()[0];
    let plucked = child
        .extend(
            child_entry,
            snapshot(Some(1), 10, "pressed"),
            instruction(1, "pluck"),
            0.5,
        )
        .expect("extend");
    child.set_frontier(vec![plucked]);

    let frontier = phrase.absorb(&child).expect("absorb");
    assert_eq!(frontier.len(), 1);
    let exit = frontier[0];
    assert_eq!(phrase.score(exit), 1.5);
    assert_eq!(
        phrase.path(exit),
        &[instruction(0, "press"), instruction(1, "pluck")]
    );
    assert_eq!(phrase.graph().len(), 3);
}

#[test]
fn given_child_from_elsewhere_when_absorbing_then_not_found() {
    let mut phrase =
        Fragment::begin("section", vec![(snapshot(None, 0, "idle"), 0.0)]).expect("begin");
    let stranger = Fragment::begin("bar", vec![(snapshot(Some(4), 0, "pressed"), 0.0)])
        .expect("begin");

    let err = phrase
        .absorb(&stranger)
        .expect_err("child starts outside the phrase");
    assert_eq!(err.kind, PerformanceErrorKind::NotFound);
}

#[test]
fn given_committed_fragment_when_merging_then_only_new_work_is_counted() {
    let mut shared = PerformanceGraph::new();
    let rest = shared.intern(snapshot(None, 0, "idle")).expect("intern").id;
    shared.add_root(rest).expect("root");

    let mut fragment = Fragment::begin(
        "phrase",
        vec![(shared.require(rest).expect("rest").clone(), 0.0)],
    )
    .expect("begin");
    let entry = fragment.entries()[0];
    let pressed = fragment
        .extend(entry, snapshot(Some(0), 0, "pressed"), instruction(0, "press"), 1.0)
        .expect("extend");
    fragment.set_frontier(vec![pressed]);

    let committed = shared.merge_fragment(&fragment).expect("merge");
    assert_eq!(committed.new_snapshots, 1);
    assert_eq!(committed.new_edges, 1);
    assert_eq!(committed.frontier.len(), 1);
    assert_eq!(committed.frontier[0].1, 1.0);

    let again = shared.merge_fragment(&fragment).expect("merge is idempotent");
    assert_eq!(again.new_snapshots, 0);
    assert_eq!(again.new_edges, 0);
    assert_eq!(shared.len(), 2);
    assert_eq!(shared.roots(), &[rest]);
    shared.assert_invariants().expect("graph stays merged");
}

#[test]
fn given_serialized_graph_when_loading_then_index_is_rebuilt() {
    let mut graph = PerformanceGraph::new();
    let rest = graph.intern(snapshot(None, 0, "idle")).expect("intern").id;
    let pressed = graph
        .intern(snapshot(Some(0), 0, "pressed"))
        .expect("intern")
        .id;
    graph.add_root(rest).expect("root");
    graph
        .connect(rest, pressed, instruction(0, "press"), 1.0)
        .expect("connect");

    let json = serde_json::to_string(&graph).expect("graph should serialize");
    let mut loaded: PerformanceGraph = serde_json::from_str(&json).expect("graph should load");
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded.edge_count(), 1);
    assert_eq!(loaded.roots(), &[rest]);

    let interned = loaded
        .intern(snapshot(Some(0), 99, "pressed"))
        .expect("intern");
    assert!(!interned.inserted);
    assert_eq!(interned.id, pressed);
}

#[test]
fn given_document_with_duplicate_snapshot_when_loading_then_it_is_rejected() {
    let mut graph = PerformanceGraph::new();
    graph.intern(snapshot(Some(0), 0, "pressed")).expect("intern");

    let mut document = serde_json::to_value(&graph).expect("graph should serialize");
    let snapshots = document["snapshots"]
        .as_array_mut()
        .expect("snapshots are a list");
    let duplicate = snapshots[0].clone();
    snapshots.push(duplicate);

    let err = serde_json::from_value::<PerformanceGraph>(document)
        .expect_err("duplicate snapshot must fail");
    assert!(err.to_string().contains("duplicates"));
}

#[test]
fn given_snapshot_map_when_interning_many_then_ids_follow_insertion() {
    let mut graph = PerformanceGraph::new();
    let ids: BTreeMap<&str, SnapshotId> = ["idle", "pressed", "hammered"]
        .into_iter()
        .map(|state| {
            let id = graph
                .intern(snapshot(Some(0), 0, state))
                .expect("intern")
                .id;
            (state, id)
        })
        .collect();

    assert_eq!(ids["idle"], SnapshotId(0));
    assert_eq!(ids["hammered"], SnapshotId(2));
}

#[test]
fn given_reviewed_child_when_absorbing_then_adjustment_is_carried() {
    let mut section =
        Fragment::begin("section", vec![(snapshot(None, 0, "idle"), 0.0)]).expect("begin");
    let mut phrase =
        Fragment::begin("phrase", section.frontier_entries().expect("entries")).expect("begin");
    let entry = phrase.entries()[0];
    let pressed = phrase
        .extend(entry, snapshot(Some(0), 0, "pressed"), instruction(0, "press"), 0.5)
        .expect("extend");
    phrase.set_frontier(vec![pressed]);
    phrase.adjust_score(pressed, -1.0);

    let exit = section.absorb(&phrase).expect("absorb")[0];
    assert_eq!(section.score(exit), -0.5);
    assert_eq!(section.bonus(exit), -1.0);

    section.adjust_score(exit, 2.0);
    assert_eq!(section.bonus(exit), 1.0);
    assert_eq!(section.score(exit), 1.5);
}
