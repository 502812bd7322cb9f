use std::collections::BTreeMap;

use crate::registry::{
    error::{RegistryError, configuration_error},
    types::{KindEntry, PartKind},
};

/// Static part-kind hierarchy. Parents must be declared before their children,
/// which keeps the hierarchy acyclic by construction.
#[derive(Debug, Clone, Default)]
pub struct KindTable {
    entries: BTreeMap<PartKind, KindEntry>,
    order: Vec<PartKind>,
}

impl KindTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, entry: KindEntry) -> Result<(), RegistryError> {
        if entry.kind.as_str().trim().is_empty() {
            return Err(configuration_error("part kind cannot be empty"));
        }
        if self.entries.contains_key(&entry.kind) {
            return Err(configuration_error(format!(
                "part kind '{}' declared twice",
                entry.kind
            )));
        }
        if let Some(parent) = entry.parent.as_ref()
            && !self.entries.contains_key(parent)
        {
            return Err(configuration_error(format!(
                "part kind '{}' references undeclared parent '{}'",
                entry.kind, parent
            )));
        }
        if entry.cardinality == Some(0) {
            return Err(configuration_error(format!(
                "part kind '{}' declares zero cardinality",
                entry.kind
            )));
        }

        self.order.push(entry.kind.clone());
        self.entries.insert(entry.kind.clone(), entry);
        Ok(())
    }

    pub fn contains(&self, kind: &PartKind) -> bool {
        self.entries.contains_key(kind)
    }

    pub fn get(&self, kind: &PartKind) -> Option<&KindEntry> {
        self.entries.get(kind)
    }

    pub fn require(&self, kind: &PartKind) -> Result<&KindEntry, RegistryError> {
        self.entries
            .get(kind)
            .ok_or_else(|| configuration_error(format!("unknown part kind '{}'", kind)))
    }

    /// Kind itself followed by its ancestors, nearest first.
    pub fn lineage<'a>(&'a self, kind: &'a PartKind) -> impl Iterator<Item = &'a PartKind> + 'a {
        let mut next = self.entries.get(kind).map(|entry| &entry.kind);
        std::iter::from_fn(move || {
            let current = next?;
            next = self
                .entries
                .get(current)
                .and_then(|entry| entry.parent.as_ref());
            Some(current)
        })
    }

    pub fn is_kind_of(&self, kind: &PartKind, ancestor: &PartKind) -> bool {
        self.lineage(kind).any(|candidate| candidate == ancestor)
    }

    /// Kind and every declared descendant, in declaration order.
    pub fn descendants(&self, kind: &PartKind) -> Vec<PartKind> {
        self.order
            .iter()
            .filter(|candidate| self.is_kind_of(candidate, kind))
            .cloned()
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &KindEntry> {
        self.order.iter().filter_map(|kind| self.entries.get(kind))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
