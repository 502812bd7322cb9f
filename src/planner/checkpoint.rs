use std::{
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use uuid::Uuid;

use crate::{
    performance::{PerformanceGraph, SnapshotId},
    planner::error::{PlannerError, persistence_error},
};

pub const PERSISTENCE_VERSION: u64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrontierEntry {
    pub snapshot: SnapshotId,
    pub score: f64,
}

/// Position in the demand stream: the next top-level unit to plan and the
/// snapshots it starts from.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlanningCursor {
    pub next_unit: usize,
    pub frontier: Vec<FrontierEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanningCheckpoint {
    pub version: u64,
    pub session_id: Uuid,
    pub saved_at: String,
    pub instrument: String,
    pub cursor: PlanningCursor,
    pub graph: PerformanceGraph,
}

impl PlanningCheckpoint {
    pub fn new(
        session_id: Uuid,
        instrument: impl Into<String>,
        cursor: PlanningCursor,
        graph: PerformanceGraph,
    ) -> Self {
        let saved_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "unknown".to_string());
        Self {
            version: PERSISTENCE_VERSION,
            session_id,
            saved_at,
            instrument: instrument.into(),
            cursor,
            graph,
        }
    }
}

/// Atomic JSON file holding one planning checkpoint.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<PlanningCheckpoint>, PlannerError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(persistence_error(format!(
                    "failed to read checkpoint '{}': {err}",
                    self.path.display()
                )));
            }
        };

        let checkpoint: PlanningCheckpoint = serde_json::from_str(&content).map_err(|err| {
            persistence_error(format!(
                "failed to parse checkpoint '{}': {err}",
                self.path.display()
            ))
        })?;
        if checkpoint.version != PERSISTENCE_VERSION {
            return Err(persistence_error(format!(
                "unsupported checkpoint version {} at '{}'",
                checkpoint.version,
                self.path.display()
            )));
        }

        Ok(Some(checkpoint))
    }

    pub fn save(&self, checkpoint: &PlanningCheckpoint) -> Result<(), PlannerError> {
        let parent = self.path.parent().ok_or_else(|| {
            persistence_error(format!(
                "checkpoint path '{}' has no parent",
                self.path.display()
            ))
        })?;
        fs::create_dir_all(parent).map_err(|err| {
            persistence_error(format!(
                "failed to create checkpoint directory '{}': {err}",
                parent.display()
            ))
        })?;

        let tmp_path = self.path.with_extension("tmp");
        let file = fs::File::create(&tmp_path).map_err(|err| {
            persistence_error(format!(
                "failed to create checkpoint temp file '{}': {err}",
                tmp_path.display()
            ))
        })?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, checkpoint).map_err(|err| {
            persistence_error(format!(
                "failed to serialize checkpoint '{}': {err}",
                tmp_path.display()
            ))
        })?;
        writer
            .write_all(b"\n")
            .and_then(|_| writer.flush())
            .map_err(|err| {
                persistence_error(format!(
                    "failed to write checkpoint '{}': {err}",
                    tmp_path.display()
                ))
            })?;
        drop(writer);

        fs::File::open(&tmp_path)
            .and_then(|file| file.sync_all())
            .map_err(|err| {
                persistence_error(format!(
                    "failed to sync checkpoint temp file '{}': {err}",
                    tmp_path.display()
                ))
            })?;
        fs::rename(&tmp_path, &self.path).map_err(|err| {
            persistence_error(format!(
                "failed to replace checkpoint '{}': {err}",
                self.path.display()
            ))
        })?;
        if let Ok(parent_file) = fs::File::open(parent) {
            let _ = parent_file.sync_all();
        }

        tracing::info!(
            target: "planner",
            path = %self.path.display(),
            session_id = %checkpoint.session_id,
            next_unit = checkpoint.cursor.next_unit,
            snapshots = checkpoint.graph.len(),
            "checkpoint_saved"
        );
        Ok(())
    }
}
