use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::state::{
    error::{StateError, configuration_error},
    types::{InteractionKind, Settled, StateMachineSpec, StateTag, Transition},
};

const MAX_FALLBACK_CHAIN: usize = 8;

/// Pure transition function `(state, interaction) -> next state`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateMachine {
    name: String,
    initial: StateTag,
    states: BTreeSet<StateTag>,
    transitions: BTreeMap<(StateTag, InteractionKind), Transition>,
}

impl StateMachine {
    pub fn from_spec(spec: StateMachineSpec) -> Result<Self, StateError> {
        if spec.name.trim().is_empty() {
            return Err(configuration_error("state machine name cannot be empty"));
        }

        let mut transitions = BTreeMap::new();
        let mut states = BTreeSet::from([spec.initial.clone()]);
        for transition in spec.transitions {
            states.insert(transition.from.clone());
            states.insert(transition.to.clone());
            let key = (transition.from.clone(), transition.on.clone());
            if transitions.contains_key(&key) {
                return Err(configuration_error(format!(
                    "state machine '{}' defines ({}, {}) twice",
                    spec.name, transition.from, transition.on
                )));
            }
            transitions.insert(
                key,
                Transition {
                    next: transition.to,
                    fallback: transition.fallback,
                },
            );
        }

        Ok(Self {
            name: spec.name,
            initial: spec.initial,
            states,
            transitions,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn initial(&self) -> &StateTag {
        &self.initial
    }

    pub fn has_state(&self, state: &StateTag) -> bool {
        self.states.contains(state)
    }

    pub fn transition(&self, state: &StateTag, kind: &str) -> Result<&Transition, StateError> {
        self.transitions
            .get(&(state.clone(), kind.to_string()))
            .ok_or_else(|| {
                configuration_error(format!(
                    "state machine '{}' has no transition for ({}, {})",
                    self.name, state, kind
                ))
            })
    }

    pub fn next(&self, state: &StateTag, kind: &str) -> Result<StateTag, StateError> {
        self.transition(state, kind)
            .map(|transition| transition.next.clone())
    }

    /// Applies `kind` and folds every instantaneous fallback it triggers.
    pub fn settle(&self, state: &StateTag, kind: &str) -> Result<Settled, StateError> {
        let mut applied = vec![kind.to_string()];
        let mut transition = self.transition(state, kind)?;
        let mut current = transition.next.clone();

        while let Some(fallback) = transition.fallback.as_ref() {
            if applied.len() > MAX_FALLBACK_CHAIN {
                return Err(configuration_error(format!(
                    "state machine '{}' fallback chain from ({}, {}) does not settle",
                    self.name, state, kind
                )));
            }
            transition = self.transition(&current, fallback)?;
            applied.push(fallback.clone());
            current = transition.next.clone();
        }

        Ok(Settled {
            state: current,
            applied,
        })
    }

    /// Walks every settled state reachable from the initial state under
    /// `kinds` and fails on the first undefined pair.
    pub fn verify_totality<'a, I>(&self, kinds: I) -> Result<BTreeSet<StateTag>, StateError>
    where
        I: IntoIterator<Item = &'a InteractionKind>,
    {
        self.verify_totality_from(std::iter::empty::<&StateTag>(), kinds)
    }

    /// Like [`StateMachine::verify_totality`], also walking from `starts`.
    pub fn verify_totality_from<'a, 'b, S, I>(
        &self,
        starts: S,
        kinds: I,
    ) -> Result<BTreeSet<StateTag>, StateError>
    where
        S: IntoIterator<Item = &'b StateTag>,
        I: IntoIterator<Item = &'a InteractionKind>,
    {
        let kinds: BTreeSet<&InteractionKind> = kinds.into_iter().collect();
        let mut reachable = BTreeSet::from([self.initial.clone()]);
        for start in starts {
            if !self.has_state(start) {
                return Err(configuration_error(format!(
                    "state machine '{}' has no state '{}'",
                    self.name, start
                )));
            }
            reachable.insert(start.clone());
        }
        let mut queue: VecDeque<StateTag> = reachable.iter().cloned().collect();

        while let Some(state) = queue.pop_front() {
            for kind in &kinds {
                let settled = self.settle(&state, kind)?;
                if reachable.insert(settled.state.clone()) {
                    queue.push_back(settled.state);
                }
            }
        }

        Ok(reachable)
    }
}
