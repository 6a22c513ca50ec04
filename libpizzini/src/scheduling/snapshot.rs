//! Scheduler state snapshots
//!
//! A snapshot is a pretty-printed JSON document holding the job
//! descriptors with their pending trigger times, the posted-set and the
//! time it was taken.

use std::fs;
use std::path::Path;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::job::JobDescriptor;
use crate::error::SnapshotError;
use crate::types::EntryId;

/// A job descriptor plus the next firing of each of its triggers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedJob {
    #[serde(flatten)]
    pub descriptor: JobDescriptor,
    /// One per trigger, in trigger order. Missing entries start fresh.
    #[serde(default)]
    pub next_runs: Vec<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSnapshot {
    #[serde(default)]
    pub scheduled_jobs: Vec<SavedJob>,
    /// Sorted ascending so snapshots diff cleanly
    #[serde(default)]
    pub posted_content_ids: Vec<EntryId>,
    pub timestamp: NaiveDateTime,
}

impl ScheduleSnapshot {
    pub fn write_to(&self, path: &Path) -> Result<(), SnapshotError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn read_from(path: &Path) -> Result<Self, SnapshotError> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}
