use serde::{Deserialize, Serialize};

use crate::{
    preference::{PreferenceSpec, Scope},
    registry::{ParamValue, Part, PartKind, PartRegistry},
    types::{InstanceIndex, Ticks},
};

/// What a score element asks of the performer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Demand {
    /// A specific change, by name.
    Change { name: String },
    /// Any change classified under every listed tag.
    Tags {
        #[serde(default)]
        actions: Vec<String>,
        #[serde(default)]
        effects: Vec<String>,
        #[serde(default)]
        reactions: Vec<String>,
    },
}

impl Demand {
    pub fn change(name: &str) -> Self {
        Self::Change {
            name: name.to_string(),
        }
    }
}

/// Positional part filter: `values[i] = None` accepts any value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartSelector {
    pub kind: PartKind,
    #[serde(default)]
    pub values: Vec<Option<ParamValue>>,
}

impl PartSelector {
    pub fn kind(kind: &str) -> Self {
        Self {
            kind: PartKind::new(kind),
            values: Vec::new(),
        }
    }

    pub fn with_values<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ParamValue>,
    {
        self.values = values.into_iter().map(|value| Some(value.into())).collect();
        self
    }

    pub fn matches(&self, registry: &PartRegistry, part: &Part) -> bool {
        let kinds = registry.kinds();
        let kind_matches = kinds.is_kind_of(&part.concrete_kind, &self.kind)
            || registry
                .resolve_concrete_kind(&self.kind)
                .is_ok_and(|concrete| kinds.is_kind_of(&part.concrete_kind, &concrete));
        kind_matches
            && self
                .values
                .iter()
                .enumerate()
                .all(|(position, expected)| match expected {
                    Some(expected) => part.value(position) == Some(expected),
                    None => true,
                })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreElement {
    pub id: String,
    pub demand: Demand,
    /// Restricts the feminine part.
    #[serde(default)]
    pub target: Option<PartSelector>,
    /// Restricts the masculine part.
    #[serde(default)]
    pub performer: Option<PartSelector>,
}

impl ScoreElement {
    pub fn new(id: &str, demand: Demand) -> Self {
        Self {
            id: id.to_string(),
            demand,
            target: None,
            performer: None,
        }
    }

    pub fn on(mut self, target: PartSelector) -> Self {
        self.target = Some(target);
        self
    }

    pub fn by(mut self, performer: PartSelector) -> Self {
        self.performer = Some(performer);
        self
    }
}

/// A point in score time with the elements demanding attention there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    /// Assigned by `Score::new`; any stored value is overwritten.
    #[serde(default)]
    pub index: InstanceIndex,
    pub start: Ticks,
    #[serde(default)]
    pub elements: Vec<ScoreElement>,
}

impl Instance {
    pub fn new(start: Ticks, elements: Vec<ScoreElement>) -> Self {
        Self {
            index: 0,
            start,
            elements,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreLevel {
    Score,
    Section,
    Phrase,
}

impl ScoreLevel {
    /// Coarsest preference scope a node of this level may declare.
    pub fn scope(self) -> Scope {
        match self {
            Self::Score => Scope::Score,
            Self::Section | Self::Phrase => Scope::Phrase,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeBody {
    Instances(Vec<Instance>),
    Children(Vec<ScoreNode>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreNode {
    pub label: String,
    pub level: ScoreLevel,
    #[serde(default)]
    pub preferences: Vec<PreferenceSpec>,
    pub body: NodeBody,
}

impl ScoreNode {
    pub fn phrase(label: &str, instances: Vec<Instance>) -> Self {
        Self {
            label: label.to_string(),
            level: ScoreLevel::Phrase,
            preferences: Vec::new(),
            body: NodeBody::Instances(instances),
        }
    }

    pub fn section(label: &str, children: Vec<ScoreNode>) -> Self {
        Self {
            label: label.to_string(),
            level: ScoreLevel::Section,
            preferences: Vec::new(),
            body: NodeBody::Children(children),
        }
    }

    pub fn score(label: &str, children: Vec<ScoreNode>) -> Self {
        Self {
            label: label.to_string(),
            level: ScoreLevel::Score,
            preferences: Vec::new(),
            body: NodeBody::Children(children),
        }
    }

    pub fn with_preferences(mut self, preferences: Vec<PreferenceSpec>) -> Self {
        self.preferences = preferences;
        self
    }

    /// Instances of this subtree in score order.
    pub fn instances(&self) -> Vec<&Instance> {
        match &self.body {
            NodeBody::Instances(instances) => instances.iter().collect(),
            NodeBody::Children(children) => {
                children.iter().flat_map(ScoreNode::instances).collect()
            }
        }
    }

    pub fn first_instance(&self) -> Option<InstanceIndex> {
        self.instances().first().map(|instance| instance.index)
    }
}
