use std::{collections::BTreeMap, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{
    registry::{KindTable, PartKind},
    taxonomy::{
        error::{TaxonomyError, configuration_error},
        tags::{TagCategory, TagId, TagLattice, TagSet},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Coordination {
    #[default]
    Independent,
    Simultaneous,
    Sequential,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub masculine: PartKind,
    pub feminine: PartKind,
    #[serde(default)]
    pub effects: Vec<String>,
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default)]
    pub reactions: Vec<String>,
    #[serde(default)]
    pub snapshot_kinds: Vec<String>,
    #[serde(default)]
    pub coordination: Coordination,
}

/// Declarative interaction template. Tag sets are closed at registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub name: String,
    pub description: String,
    pub masculine: PartKind,
    pub feminine: PartKind,
    pub effects: TagSet,
    pub actions: TagSet,
    pub reactions: TagSet,
    pub snapshot_kinds: Vec<String>,
    pub coordination: Coordination,
}

impl Change {
    pub fn tags(&self) -> impl Iterator<Item = TagId> + '_ {
        self.effects
            .iter()
            .chain(self.actions.iter())
            .chain(self.reactions.iter())
    }

    /// Classification by ancestry, not identity.
    pub fn is(&self, lattice: &TagLattice, tag: TagId) -> bool {
        self.tags().any(|declared| lattice.is(declared, tag))
    }

    pub fn is_named(&self, lattice: &TagLattice, tag: &str) -> bool {
        lattice.id(tag).is_some_and(|id| self.is(lattice, id))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChangeCatalog {
    changes: BTreeMap<String, Arc<Change>>,
}

impl ChangeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        lattice: &TagLattice,
        kinds: &KindTable,
        spec: ChangeSpec,
    ) -> Result<Arc<Change>, TaxonomyError> {
        if spec.name.trim().is_empty() {
            return Err(configuration_error("change name cannot be empty"));
        }
        if self.changes.contains_key(&spec.name) {
            return Err(configuration_error(format!(
                "change '{}' registered twice",
                spec.name
            )));
        }
        for kind in [&spec.masculine, &spec.feminine] {
            if !kinds.contains(kind) {
                return Err(configuration_error(format!(
                    "change '{}' references unknown part kind '{}'",
                    spec.name, kind
                )));
            }
        }

        let change = Arc::new(Change {
            effects: lattice.close(&spec.effects, TagCategory::Effect)?,
            actions: lattice.close(&spec.actions, TagCategory::Action)?,
            reactions: lattice.close(&spec.reactions, TagCategory::Reaction)?,
            name: spec.name,
            description: spec.description,
            masculine: spec.masculine,
            feminine: spec.feminine,
            snapshot_kinds: spec.snapshot_kinds,
            coordination: spec.coordination,
        });
        self.changes
            .insert(change.name.clone(), Arc::clone(&change));
        Ok(change)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Change>> {
        self.changes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.changes.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Change>> {
        self.changes.values()
    }

    /// Changes classified under every tag in `required`.
    pub fn matching(&self, lattice: &TagLattice, required: &[TagId]) -> Vec<Arc<Change>> {
        self.changes
            .values()
            .filter(|change| required.iter().all(|tag| change.is(lattice, *tag)))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}
