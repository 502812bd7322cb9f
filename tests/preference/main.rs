#[path = "../support/mod.rs"]
mod support;

use std::sync::Arc;

use performer::{
    instrument::Instrument,
    preference::{
        AsConnective, Behavior, Connective, PhrasePath, PreferenceErrorKind, PreferenceSpec,
        PreferenceStack, PreferenceTable, Scope,
    },
    registry::PartRegistry,
    state::{StateTag, StateView},
    types::{Instruction, Interaction},
};
use serde_json::json;

struct Choice {
    name: &'static str,
    instrument: Arc<Instrument>,
    instruction: Instruction,
    before: StateView,
    after: StateView,
}

impl AsConnective for Choice {
    fn connective(&self) -> Connective<'_> {
        Connective {
            registry: self.instrument.registry(),
            instance: self.instruction.instance,
            instruction: &self.instruction,
            before: &self.before,
            after: &self.after,
        }
    }
}

fn pluck_by(instrument: &Arc<Instrument>, name: &'static str, hand: &str) -> Choice {
    let finger = support::part_id(instrument, &support::finger(hand, 2));
    let string = support::part_id(instrument, &support::string(1));
    let before = StateView::new(instrument.initial_states().clone());
    Choice {
        name,
        instrument: Arc::clone(instrument),
        instruction: Instruction::new(0, vec![Interaction::new("pluck", finger, string)]),
        after: before.fork(),
        before,
    }
}

fn root() -> PreferenceStack {
    PreferenceStack::root(Arc::new(PreferenceTable::with_builtins()))
}

fn prefer_right_hand() -> PreferenceSpec {
    PreferenceSpec::new("right_hand", "prefer_part", Scope::Note)
        .with_params(json!({ "kind": "finger", "at": 0, "value": "right" }))
}

#[test]
fn given_prefer_part_when_ranking_then_matching_finger_ranks_first() {
    let instrument = support::guitar();
    let stack = root()
        .child(Scope::Phrase, &[prefer_right_hand()])
        .expect("note preference may sit at phrase level");

    let ranked = stack.rank(
        vec![
            pluck_by(&instrument, "left", "left"),
            pluck_by(&instrument, "right", "right"),
        ],
        8,
    );

    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0].item.name, "right");
    assert_eq!(ranked[0].score, 1.0);
    assert_eq!(ranked[1].score, 0.0);
}

#[test]
fn given_beam_of_one_when_ranking_then_ties_keep_input_order() {
    let instrument = support::guitar();
    let ranked = root().rank(
        vec![
            pluck_by(&instrument, "first", "left"),
            pluck_by(&instrument, "second", "right"),
        ],
        1,
    );
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].item.name, "first");
}

#[test]
fn given_max_interactions_when_instruction_is_larger_then_candidate_is_dropped() {
    let instrument = support::guitar();
    let limit = PreferenceSpec::new("single", "max_interactions", Scope::Note)
        .with_params(json!({ "max": 1 }));
    let stack = root()
        .child(Scope::Note, &[limit])
        .expect("note level accepts note preferences");

    let single = pluck_by(&instrument, "single", "left");
    let mut double = pluck_by(&instrument, "double", "right");
    let left = support::part_id(&instrument, &support::finger("left", 3));
    let other = support::part_id(&instrument, &support::string(2));
    double
        .instruction
        .interactions
        .push(Interaction::new("pluck", left, other));

    assert!(stack.admits(&single));
    assert!(!stack.admits(&double));
    let ranked = stack.rank(vec![double, single], 8);
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].item.name, "single");
}

#[test]
fn given_weighted_state_change_penalty_when_scoring_then_weight_scales_it() {
    let instrument = support::guitar();
    let penalty = PreferenceSpec::new("still", "avoid_state_change", Scope::Note).with_weight(2.5);
    let stack = root()
        .child(Scope::Note, &[penalty])
        .expect("note level accepts note preferences");

    let mut press = pluck_by(&instrument, "press", "left");
    let string = support::part_id(&instrument, &support::string(1));
    let finger = support::part_id(&instrument, &support::finger("left", 2));
    let idle = press
        .before
        .get(string)
        .cloned()
        .expect("string has a rest condition");
    let free = press
        .before
        .get(finger)
        .cloned()
        .expect("finger has a rest condition");
    press
        .after
        .set(string, idle.after("press", StateTag::new("pressed")));
    press
        .after
        .set(finger, free.after("press", StateTag::new("holding")));

    assert_eq!(stack.score(&press), -5.0);
    assert_eq!(stack.score(&pluck_by(&instrument, "pluck", "left")), 0.0);
}

#[test]
fn given_coarse_preference_at_fine_level_when_nesting_then_configuration_error() {
    let whole = PreferenceSpec::new("whole", "fewest_parts", Scope::Score);
    let err = root()
        .child(Scope::Phrase, &[whole])
        .err()
        .expect("score preference cannot be declared by a phrase");
    assert_eq!(err.kind, PreferenceErrorKind::Configuration);
    assert!(err.message.contains("whole"));
}

#[test]
fn given_finer_stack_when_nesting_coarser_level_then_configuration_error() {
    let note = root()
        .child(Scope::Note, &[])
        .expect("note level nests under score");
    assert!(note.child(Scope::Phrase, &[]).is_err());
}

#[test]
fn given_unknown_preference_kind_when_nesting_then_configuration_error() {
    let err = root()
        .child(
            Scope::Phrase,
            &[PreferenceSpec::new("mystery", "telepathy", Scope::Phrase)],
        )
        .err()
        .expect("telepathy is not registered");
    assert!(err.message.contains("telepathy"));
}

#[test]
fn given_own_preferences_when_relaxing_then_only_inherited_remain() {
    let outer = root()
        .child(
            Scope::Phrase,
            &[PreferenceSpec::new("compact", "fewest_parts", Scope::Note)],
        )
        .expect("phrase level accepts note preferences");
    let inner = outer
        .child(Scope::Note, &[prefer_right_hand()])
        .expect("note level accepts note preferences");

    assert!(inner.has_own());
    let relaxed = inner.without_own();
    assert!(!relaxed.has_own());
    assert_eq!(relaxed.names().collect::<Vec<_>>(), vec!["compact"]);
    assert_eq!(relaxed.level(), Scope::Note);
}

#[test]
fn given_consistent_binding_when_reviewing_then_switching_fingers_is_penalized() {
    let instrument = support::guitar();
    let registry: &PartRegistry = instrument.registry();
    let left = support::part_id(&instrument, &support::finger("left", 2));
    let right = support::part_id(&instrument, &support::finger("right", 2));
    let string = support::part_id(&instrument, &support::string(1));
    let stack = root()
        .child(
            Scope::Phrase,
            &[PreferenceSpec::new("steady", "consistent_binding", Scope::Phrase)],
        )
        .expect("phrase level accepts phrase preferences");
    assert!(stack.has_review());

    let steady = vec![
        Instruction::new(0, vec![Interaction::new("pluck", left, string)]),
        Instruction::new(1, vec![Interaction::new("pluck", left, string)]),
    ];
    let switching = vec![
        Instruction::new(0, vec![Interaction::new("pluck", left, string)]),
        Instruction::new(1, vec![Interaction::new("pluck", right, string)]),
    ];

    let review = |instructions: &[Instruction]| {
        stack.review(&PhrasePath {
            registry,
            instructions,
        })
    };
    assert_eq!(review(&steady), 0.0);
    assert_eq!(review(&switching), -1.0);

    let nested = stack
        .child(Scope::Note, &[])
        .expect("note nests under phrase");
    assert!(!nested.has_review());
}

#[test]
fn given_custom_behavior_when_registered_then_stack_uses_it() {
    let instrument = support::guitar();
    let mut table = PreferenceTable::with_builtins();
    table.register(
        "no_left_hand",
        Behavior::Admit(Arc::new(
            |_spec: &PreferenceSpec, connective: &Connective<'_>| {
                connective.instruction.interactions.iter().all(|interaction| {
                    connective
                        .registry
                        .part(interaction.masculine)
                        .and_then(|part| part.value(0))
                        .is_none_or(|hand| hand.to_string() != "left")
                })
            },
        )),
    );
    let stack = PreferenceStack::root(Arc::new(table))
        .child(
            Scope::Phrase,
            &[PreferenceSpec::new("right_only", "no_left_hand", Scope::Phrase)],
        )
        .expect("custom kind is registered");

    assert!(!stack.admits(&pluck_by(&instrument, "left", "left")));
    assert!(stack.admits(&pluck_by(&instrument, "right", "right")));
}
