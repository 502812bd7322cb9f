use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::taxonomy::error::{TaxonomyError, configuration_error};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagCategory {
    Action,
    Effect,
    Reaction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TagId(u32);

impl TagId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub category: TagCategory,
    pub parent: Option<TagId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSpec {
    pub name: String,
    pub category: TagCategory,
    #[serde(default)]
    pub parent: Option<String>,
}

impl TagSpec {
    pub fn new(name: &str, category: TagCategory, parent: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            category,
            parent: parent.map(str::to_string),
        }
    }
}

/// Set of tags closed under the lattice: every member's ancestors are members.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet(BTreeSet<TagId>);

impl TagSet {
    pub fn contains(&self, tag: TagId) -> bool {
        self.0.contains(&tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = TagId> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Immutable is-a lattice of classification tags with one parent per tag.
#[derive(Debug, Clone, Default)]
pub struct TagLattice {
    tags: Vec<Tag>,
    by_name: BTreeMap<String, TagId>,
}

impl TagLattice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Baseline vocabulary shared by instruments; instruments extend it.
    pub fn standard() -> Result<Self, TaxonomyError> {
        use TagCategory::{Action, Effect, Reaction};

        let specs = [
            TagSpec::new("excite", Action, None),
            TagSpec::new("pluck", Action, Some("excite")),
            TagSpec::new("strike", Action, Some("excite")),
            TagSpec::new("bow", Action, Some("excite")),
            TagSpec::new("stop", Action, None),
            TagSpec::new("press", Action, Some("stop")),
            TagSpec::new("hammer", Action, Some("press")),
            TagSpec::new("release", Action, None),
            TagSpec::new("melodic", Effect, None),
            TagSpec::new("pitched", Effect, Some("melodic")),
            TagSpec::new("continuous", Effect, None),
            TagSpec::new("sustained", Effect, Some("continuous")),
            TagSpec::new("repetitive", Effect, Some("continuous")),
            TagSpec::new("percussive", Effect, None),
            TagSpec::new("silent", Effect, None),
            TagSpec::new("resonance", Reaction, None),
            TagSpec::new("ring", Reaction, Some("resonance")),
            TagSpec::new("damping", Reaction, None),
        ];

        let mut lattice = Self::new();
        lattice.extend(Vec::from(specs))?;
        Ok(lattice)
    }

    pub fn declare(&mut self, spec: TagSpec) -> Result<TagId, TaxonomyError> {
        if spec.name.trim().is_empty() {
            return Err(configuration_error("tag name cannot be empty"));
        }
        if self.by_name.contains_key(&spec.name) {
            return Err(configuration_error(format!(
                "tag '{}' declared twice",
                spec.name
            )));
        }

        let parent = match spec.parent.as_deref() {
            Some(parent_name) => {
                let parent_id = self.resolve(parent_name)?;
                let parent = &self.tags[parent_id.index()];
                if parent.category != spec.category {
                    return Err(configuration_error(format!(
                        "tag '{}' ({:?}) cannot descend from '{}' ({:?})",
                        spec.name, spec.category, parent.name, parent.category
                    )));
                }
                Some(parent_id)
            }
            None => None,
        };

        let id = TagId(self.tags.len() as u32);
        self.tags.push(Tag {
            name: spec.name.clone(),
            category: spec.category,
            parent,
        });
        self.by_name.insert(spec.name, id);
        Ok(id)
    }

    /// Declares specs in any order; a spec whose parent never resolves is an
    /// unknown parent or part of a cycle.
    pub fn extend(&mut self, specs: Vec<TagSpec>) -> Result<(), TaxonomyError> {
        let mut pending = specs;
        while !pending.is_empty() {
            let before = pending.len();
            let mut deferred = Vec::new();
            for spec in pending {
                let ready = spec
                    .parent
                    .as_ref()
                    .is_none_or(|parent| self.by_name.contains_key(parent));
                if ready {
                    self.declare(spec)?;
                } else {
                    deferred.push(spec);
                }
            }
            if deferred.len() == before {
                let names: Vec<String> = deferred
                    .iter()
                    .map(|spec| {
                        format!(
                            "{} -> {}",
                            spec.name,
                            spec.parent.as_deref().unwrap_or("<none>")
                        )
                    })
                    .collect();
                return Err(configuration_error(format!(
                    "unresolvable tag parents (unknown or cyclic): {}",
                    names.join(", ")
                )));
            }
            pending = deferred;
        }
        Ok(())
    }

    pub fn id(&self, name: &str) -> Option<TagId> {
        self.by_name.get(name).copied()
    }

    pub fn resolve(&self, name: &str) -> Result<TagId, TaxonomyError> {
        self.id(name)
            .ok_or_else(|| configuration_error(format!("unknown tag '{}'", name)))
    }

    pub fn tag(&self, id: TagId) -> Option<&Tag> {
        self.tags.get(id.index())
    }

    pub fn name(&self, id: TagId) -> Option<&str> {
        self.tag(id).map(|tag| tag.name.as_str())
    }

    /// Strict ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: TagId) -> impl Iterator<Item = TagId> + '_ {
        let mut next = self.tags.get(id.index()).and_then(|tag| tag.parent);
        std::iter::from_fn(move || {
            let current = next?;
            next = self.tags.get(current.index()).and_then(|tag| tag.parent);
            Some(current)
        })
    }

    /// True when `tag` is `ancestor` or descends from it.
    pub fn is(&self, tag: TagId, ancestor: TagId) -> bool {
        tag == ancestor || self.ancestors(tag).any(|candidate| candidate == ancestor)
    }

    /// Resolves names of one category and closes them upward.
    pub fn close(&self, names: &[String], category: TagCategory) -> Result<TagSet, TaxonomyError> {
        let mut closed = BTreeSet::new();
        for name in names {
            let id = self.resolve(name)?;
            let tag = self
                .tag(id)
                .ok_or_else(|| configuration_error(format!("unknown tag '{}'", name)))?;
            if tag.category != category {
                return Err(configuration_error(format!(
                    "tag '{}' is {:?}, expected {:?}",
                    name, tag.category, category
                )));
            }
            closed.insert(id);
            closed.extend(self.ancestors(id));
        }
        Ok(TagSet(closed))
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}
