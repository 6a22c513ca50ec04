//! Job descriptors and execution
//!
//! A job is the unit a caller schedules and cancels: a serializable
//! [`JobDescriptor`] describing it, one or more triggers deciding when it
//! fires, and a [`JobRunner`] holding the per-job selection state (the
//! rotation cursor for recurring jobs) plus the in-flight flag.

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Weekday;
use futures::FutureExt;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tokio::task::AbortHandle;
use tracing::{debug, error, info, warn};

use super::trigger::{Cadence, Trigger};
use super::PostCallback;
use crate::types::EntryId;

/// Handle of a job inside one scheduler
pub type JobId = u64;

const SECONDS_PER_DAY: u64 = 86_400;

/// One chosen weekly slot of a random schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomSlot {
    pub weekday: Weekday,
    /// `HH:MM`
    pub time: String,
}

/// Serializable description of a scheduled job
///
/// This is what snapshots persist and what `load_schedule_config` re-arms
/// from. Random jobs keep their chosen slots so a reload restores the same
/// weekly pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobDescriptor {
    Single {
        entry_id: EntryId,
        time: String,
        platforms: Vec<String>,
        job_tag: String,
    },
    Recurring {
        entry_ids: Vec<EntryId>,
        interval_days: u32,
        start_time: String,
        platforms: Vec<String>,
        randomize: bool,
        job_tag: String,
    },
    Random {
        entry_ids: Vec<EntryId>,
        posts_per_week: u32,
        time_windows: Vec<(String, String)>,
        platforms: Vec<String>,
        selected_slots: Vec<RandomSlot>,
        job_tag: String,
    },
}

impl JobDescriptor {
    pub fn tag(&self) -> &str {
        match self {
            JobDescriptor::Single { job_tag, .. }
            | JobDescriptor::Recurring { job_tag, .. }
            | JobDescriptor::Random { job_tag, .. } => job_tag,
        }
    }

    pub fn platforms(&self) -> &[String] {
        match self {
            JobDescriptor::Single { platforms, .. }
            | JobDescriptor::Recurring { platforms, .. }
            | JobDescriptor::Random { platforms, .. } => platforms,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            JobDescriptor::Single { .. } => "single",
            JobDescriptor::Recurring { .. } => "recurring",
            JobDescriptor::Random { .. } => "random",
        }
    }
}

/// Result of one job execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "entry_id", rename_all = "snake_case")]
pub enum JobOutcome {
    /// Callback reported success for this entry
    Posted(EntryId),
    /// Callback failed, errored or panicked for this entry
    Failed(EntryId),
    /// Nothing to do, e.g. a single post that already went out
    Skipped,
    /// A previous execution of the same job is still running
    InFlight,
}

/// State shared between the scheduler, its jobs and removal timers
pub(crate) struct Shared {
    pub posted: Mutex<HashSet<EntryId>>,
    pub removals: Mutex<Vec<AbortHandle>>,
    pub callback: Arc<dyn PostCallback>,
}

impl Shared {
    pub fn new(callback: Arc<dyn PostCallback>) -> Self {
        Self {
            posted: Mutex::new(HashSet::new()),
            removals: Mutex::new(Vec::new()),
            callback,
        }
    }

    /// Lock the posted-set, recovering from a poisoned lock
    pub fn posted(&self) -> MutexGuard<'_, HashSet<EntryId>> {
        self.posted.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn abort_removals(&self) {
        let mut removals = self.removals.lock().unwrap_or_else(|e| e.into_inner());
        for handle in removals.drain(..) {
            handle.abort();
        }
    }

    /// Drop `entry_id` from the posted-set once `after` has elapsed
    fn schedule_removal(self: &Arc<Self>, entry_id: EntryId, after: Duration) {
        let shared = Arc::clone(self);
        let task = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            shared.posted().remove(&entry_id);
            debug!(entry_id, "Entry eligible for reposting");
        });

        let mut removals = self.removals.lock().unwrap_or_else(|e| e.into_inner());
        removals.retain(|h| !h.is_finished());
        removals.push(task.abort_handle());
    }
}

/// How a job picks the entry to publish
#[derive(Debug)]
enum Selection {
    Single(EntryId),
    Rotation {
        entry_ids: Vec<EntryId>,
        cursor: AtomicUsize,
        interval_days: u32,
    },
    Random(Vec<EntryId>),
}

/// Executable side of a job
#[derive(Debug)]
pub(crate) struct JobRunner {
    tag: String,
    platforms: Vec<String>,
    selection: Selection,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag when an execution ends, however it ends
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl JobRunner {
    pub fn from_descriptor(descriptor: &JobDescriptor) -> Self {
        let selection = match descriptor {
            JobDescriptor::Single { entry_id, .. } => Selection::Single(*entry_id),
            JobDescriptor::Recurring {
                entry_ids,
                interval_days,
                ..
            } => Selection::Rotation {
                entry_ids: entry_ids.clone(),
                cursor: AtomicUsize::new(0),
                interval_days: *interval_days,
            },
            JobDescriptor::Random { entry_ids, .. } => Selection::Random(entry_ids.clone()),
        };

        Self {
            tag: descriptor.tag().to_string(),
            platforms: descriptor.platforms().to_vec(),
            selection,
            in_flight: AtomicBool::new(false),
        }
    }

    fn try_begin(&self) -> Option<InFlightGuard<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard(&self.in_flight))
    }

    /// Pick the entry for this firing, or `None` when there is nothing to do
    fn select(&self, shared: &Shared) -> Option<EntryId> {
        match &self.selection {
            Selection::Single(entry_id) => {
                if shared.posted().contains(entry_id) {
                    None
                } else {
                    Some(*entry_id)
                }
            }
            Selection::Rotation {
                entry_ids, cursor, ..
            } => {
                if entry_ids.is_empty() {
                    return None;
                }
                let posted = shared.posted();
                let mut index = cursor.load(Ordering::Acquire);
                // One step of skip-ahead only; not an exhaustive search
                if posted.contains(&entry_ids[index % entry_ids.len()]) {
                    index += 1;
                }
                cursor.store(index + 1, Ordering::Release);
                Some(entry_ids[index % entry_ids.len()])
            }
            Selection::Random(entry_ids) => {
                let mut posted = shared.posted();
                let mut available: Vec<EntryId> = entry_ids
                    .iter()
                    .copied()
                    .filter(|id| !posted.contains(id))
                    .collect();
                if available.is_empty() {
                    debug!(tag = %self.tag, "Every entry recently posted, resetting posted set");
                    posted.clear();
                    available = entry_ids.clone();
                }
                available.choose(&mut rand::thread_rng()).copied()
            }
        }
    }

    fn record_success(&self, shared: &Arc<Shared>, entry_id: EntryId) {
        shared.posted().insert(entry_id);

        if let Selection::Rotation {
            entry_ids,
            interval_days,
            ..
        } = &self.selection
        {
            let cooldown = u64::from(*interval_days)
                .saturating_mul(SECONDS_PER_DAY)
                .saturating_mul(entry_ids.len() as u64);
            shared.schedule_removal(entry_id, Duration::from_secs(cooldown));
        }
    }

    /// Run one firing of this job to completion
    pub async fn execute(self: Arc<Self>, shared: Arc<Shared>) -> JobOutcome {
        let Some(_guard) = self.try_begin() else {
            debug!(tag = %self.tag, "Previous execution still running, skipping");
            return JobOutcome::InFlight;
        };

        let Some(entry_id) = self.select(&shared) else {
            debug!(tag = %self.tag, "Nothing to post for this trigger");
            return JobOutcome::Skipped;
        };

        info!(tag = %self.tag, entry_id, platforms = ?self.platforms, "Executing scheduled post");

        let attempt = AssertUnwindSafe(shared.callback.post(entry_id, &self.platforms))
            .catch_unwind()
            .await;

        match attempt {
            Ok(Ok(true)) => {
                self.record_success(&shared, entry_id);
                info!(tag = %self.tag, entry_id, "Scheduled post succeeded");
                JobOutcome::Posted(entry_id)
            }
            Ok(Ok(false)) => {
                warn!(tag = %self.tag, entry_id, "Post callback reported failure");
                JobOutcome::Failed(entry_id)
            }
            Ok(Err(e)) => {
                error!(tag = %self.tag, entry_id, error = %e, "Post callback returned an error");
                JobOutcome::Failed(entry_id)
            }
            Err(_) => {
                error!(tag = %self.tag, entry_id, "Post callback panicked");
                JobOutcome::Failed(entry_id)
            }
        }
    }
}

/// A registered job: description, triggers and runner
pub(crate) struct Job {
    pub descriptor: JobDescriptor,
    pub triggers: Vec<Trigger>,
    pub runner: Arc<JobRunner>,
}

impl Job {
    /// Build a job, re-arming trigger `i` at `saved[i]` when one was saved
    pub fn new(
        descriptor: JobDescriptor,
        cadences: Vec<Cadence>,
        saved: &[chrono::NaiveDateTime],
        now: chrono::NaiveDateTime,
    ) -> Self {
        let runner = Arc::new(JobRunner::from_descriptor(&descriptor));
        let triggers = cadences
            .into_iter()
            .enumerate()
            .map(|(i, c)| Trigger::resume(c, saved.get(i).copied(), now))
            .collect();
        Self {
            descriptor,
            triggers,
            runner,
        }
    }

    pub fn tag(&self) -> &str {
        self.descriptor.tag()
    }
}
