use std::{fs, path::Path};

use serde::Deserialize;

use crate::{
    score::{
        error::{ScoreError, configuration_error},
        interpreter::Interpreter,
        types::{Instance, NodeBody, ScoreLevel, ScoreNode},
    },
    types::{InstanceIndex, Ticks},
};

/// Validated score tree with global instance indices.
#[derive(Debug, Clone, PartialEq)]
pub struct Score {
    root: ScoreNode,
    instance_count: usize,
}

impl Score {
    pub fn new(mut root: ScoreNode) -> Result<Self, ScoreError> {
        let mut next_index = 0;
        let mut last_start = None;
        assign(&mut root, None, &mut next_index, &mut last_start)?;
        Ok(Self {
            root,
            instance_count: next_index,
        })
    }

    /// Drains an interpreter into a single-phrase score.
    pub fn from_interpreter(
        label: &str,
        interpreter: &mut dyn Interpreter,
    ) -> Result<Self, ScoreError> {
        let mut instances = Vec::new();
        while let Some(instance) = interpreter.next_instance() {
            instances.push(instance);
        }
        Self::new(ScoreNode::phrase(label, instances))
    }

    pub fn root(&self) -> &ScoreNode {
        &self.root
    }

    pub fn instance_count(&self) -> usize {
        self.instance_count
    }

    /// Top-level planning units: the root's children, or the root itself
    /// when it holds instances directly.
    pub fn units(&self) -> Vec<&ScoreNode> {
        match &self.root.body {
            NodeBody::Children(children) => children.iter().collect(),
            NodeBody::Instances(_) => vec![&self.root],
        }
    }

    pub fn instance(&self, index: InstanceIndex) -> Option<&Instance> {
        self.root
            .instances()
            .into_iter()
            .find(|instance| instance.index == index)
    }
}

fn assign(
    node: &mut ScoreNode,
    parent: Option<ScoreLevel>,
    next_index: &mut InstanceIndex,
    last_start: &mut Option<Ticks>,
) -> Result<(), ScoreError> {
    if node.label.trim().is_empty() {
        return Err(configuration_error("score node label cannot be empty"));
    }
    if let Some(parent) = parent
        && node.level < parent
    {
        return Err(configuration_error(format!(
            "{:?} '{}' cannot nest inside a {:?}",
            node.level, node.label, parent
        )));
    }

    match &mut node.body {
        NodeBody::Instances(instances) => {
            for instance in instances {
                if last_start.is_some_and(|last| instance.start < last) {
                    return Err(configuration_error(format!(
                        "instance at {} in '{}' starts before its predecessor",
                        instance.start, node.label
                    )));
                }
                instance.index = *next_index;
                *next_index += 1;
                *last_start = Some(instance.start);
            }
        }
        NodeBody::Children(children) => {
            let level = node.level;
            for child in children {
                assign(child, Some(level), next_index, last_start)?;
            }
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct ScoreDocument {
    root: ScoreNode,
}

/// JSON5 score document on disk: `{ root: <ScoreNode> }`.
pub struct JsonScoreFile;

impl JsonScoreFile {
    pub fn load(path: &Path) -> Result<Score, ScoreError> {
        let content = fs::read_to_string(path).map_err(|err| {
            configuration_error(format!("failed to read score '{}': {err}", path.display()))
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Score, ScoreError> {
        let document: ScoreDocument = json5::from_str(content)
            .map_err(|err| configuration_error(format!("failed to parse score: {err}")))?;
        Score::new(document.root)
    }
}
