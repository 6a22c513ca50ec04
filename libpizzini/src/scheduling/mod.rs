//! Post scheduling
//!
//! [`PostScheduler`] owns timing and deduplication: which entry goes out
//! when, and which entries were published recently enough to be held back.
//! What "posting" means is left to an injected [`PostCallback`].
//!
//! The polling loop runs as a tokio task. Each tick computes which triggers
//! are due while holding the job table lock, then hands every execution to
//! its own task, so a slow callback never delays other jobs. A job whose
//! previous execution is still running is skipped rather than run twice.
//!
//! The `schedule_*`, `save_schedule_config` and `load_schedule_config`
//! operations report success as a `bool` and log failures instead of
//! returning errors.

pub mod job;
pub mod mock;
pub mod optimizer;
pub mod snapshot;
pub mod trigger;

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime, Weekday};
use futures::future::join_all;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{Result, ScheduleError};
use crate::types::EntryId;
use job::{Job, JobDescriptor, JobId, RandomSlot, Shared};
use snapshot::{SavedJob, ScheduleSnapshot};
use trigger::{format_time_of_day, parse_time_of_day, weekday_name, Cadence};

pub use job::JobOutcome;

/// How long `stop_scheduler` waits for the polling loop to exit
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Upcoming posts reported by `get_scheduler_status`
const STATUS_NEXT_POSTS: usize = 3;

pub const RANDOM_POSTS_TAG: &str = "random_posts";

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Publishes one entry to a set of platforms
///
/// Returns `Ok(true)` on success. `Ok(false)`, an error, or a panic all
/// count as a failed attempt: the entry is not marked as posted and the job
/// stays registered for its next trigger. May be called again for an entry
/// that was posted recently; the scheduler's deduplication is advisory.
#[async_trait]
pub trait PostCallback: Send + Sync {
    async fn post(&self, entry_id: EntryId, platforms: &[String]) -> Result<bool>;
}

/// Scheduler tuning
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// How often the polling loop checks for due triggers
    pub poll_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
        }
    }
}

/// One upcoming trigger
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpcomingPost {
    pub next_run: NaiveDateTime,
    pub tags: Vec<String>,
    pub job_info: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchedulerStatus {
    pub running: bool,
    /// Live triggers across all jobs
    pub total_jobs: usize,
    /// Registered job descriptors
    pub scheduled_jobs: usize,
    pub posted_content_count: usize,
    pub next_posts: Vec<UpcomingPost>,
}

struct SchedulerInner {
    jobs: Mutex<BTreeMap<JobId, Job>>,
    next_job_id: AtomicU64,
    shared: Arc<Shared>,
    running: AtomicBool,
}

impl SchedulerInner {
    fn jobs(&self) -> MutexGuard<'_, BTreeMap<JobId, Job>> {
        self.jobs.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn register(
        &self,
        descriptor: JobDescriptor,
        cadences: Vec<Cadence>,
        saved: &[NaiveDateTime],
    ) -> JobId {
        let id = self.next_job_id.fetch_add(1, Ordering::Relaxed);
        let job = Job::new(descriptor, cadences, saved, now());
        self.jobs().insert(id, job);
        id
    }

    /// Collect every execution due at `now` and re-arm the triggers
    fn take_due(&self, now: NaiveDateTime) -> Vec<Arc<job::JobRunner>> {
        let mut jobs = self.jobs();
        let mut due = Vec::new();
        for job in jobs.values_mut() {
            for trigger in job.triggers.iter_mut() {
                if trigger.is_due(now) {
                    trigger.advance(now);
                    due.push(Arc::clone(&job.runner));
                }
            }
        }
        due
    }

    fn dispatch_due(&self, now: NaiveDateTime) {
        for runner in self.take_due(now) {
            tokio::spawn(runner.execute(Arc::clone(&self.shared)));
        }
    }
}

/// Schedules entries for publication through a [`PostCallback`]
///
/// Each scheduler has its own job table and posted-set; independent
/// instances never interfere.
pub struct PostScheduler {
    inner: Arc<SchedulerInner>,
    config: SchedulerConfig,
    worker: Mutex<Option<JoinHandle<()>>>,
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

impl PostScheduler {
    pub fn new(callback: Arc<dyn PostCallback>) -> Self {
        Self::with_config(callback, SchedulerConfig::default())
    }

    pub fn with_config(callback: Arc<dyn PostCallback>, config: SchedulerConfig) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                jobs: Mutex::new(BTreeMap::new()),
                next_job_id: AtomicU64::new(1),
                shared: Arc::new(Shared::new(callback)),
                running: AtomicBool::new(false),
            }),
            config,
            worker: Mutex::new(None),
        }
    }

    // SCHEDULING

    /// Post `entry_id` at `post_time` (`HH:MM`) unless it already went out
    ///
    /// The trigger repeats daily but each firing is skipped while the entry
    /// is in the posted-set, so in practice it publishes once.
    pub fn schedule_single_post(&self, entry_id: EntryId, post_time: &str, platforms: &[String]) -> bool {
        match self.try_schedule_single_post(entry_id, post_time, platforms) {
            Ok(()) => {
                info!(entry_id, post_time, "Scheduled single post");
                true
            }
            Err(e) => {
                error!(entry_id, post_time, error = %e, "Failed to schedule single post");
                false
            }
        }
    }

    fn try_schedule_single_post(
        &self,
        entry_id: EntryId,
        post_time: &str,
        platforms: &[String],
    ) -> std::result::Result<(), ScheduleError> {
        let at = parse_time_of_day(post_time)?;
        let descriptor = JobDescriptor::Single {
            entry_id,
            time: format_time_of_day(at),
            platforms: platforms.to_vec(),
            job_tag: format!("single_post_{}", entry_id),
        };
        self.arm(descriptor, &[])
    }

    /// Rotate through `entry_ids`, one post every `interval_days` at `start_time`
    ///
    /// `randomize` is recorded in the job descriptor only.
    pub fn schedule_recurring_posts(
        &self,
        entry_ids: &[EntryId],
        interval_days: u32,
        start_time: &str,
        platforms: &[String],
        randomize: bool,
    ) -> bool {
        match self.try_schedule_recurring_posts(entry_ids, interval_days, start_time, platforms, randomize) {
            Ok(()) => {
                info!(interval_days, start_time, entries = entry_ids.len(), "Scheduled recurring posts");
                true
            }
            Err(e) => {
                error!(interval_days, start_time, error = %e, "Failed to schedule recurring posts");
                false
            }
        }
    }

    fn try_schedule_recurring_posts(
        &self,
        entry_ids: &[EntryId],
        interval_days: u32,
        start_time: &str,
        platforms: &[String],
        randomize: bool,
    ) -> std::result::Result<(), ScheduleError> {
        if entry_ids.is_empty() {
            return Err(ScheduleError::EmptyEntries);
        }
        if interval_days == 0 {
            return Err(ScheduleError::InvalidInterval);
        }
        let at = parse_time_of_day(start_time)?;

        let descriptor = JobDescriptor::Recurring {
            entry_ids: entry_ids.to_vec(),
            interval_days,
            start_time: format_time_of_day(at),
            platforms: platforms.to_vec(),
            randomize,
            job_tag: format!("recurring_{}d", interval_days),
        };
        self.arm(descriptor, &[])
    }

    /// Post random entries `posts_per_week` times a week inside `time_windows`
    ///
    /// Weekdays and times are drawn once, here; the weekly pattern stays
    /// fixed until this is called again.
    pub fn schedule_random_posts(
        &self,
        entry_ids: &[EntryId],
        posts_per_week: u32,
        time_windows: &[(String, String)],
        platforms: &[String],
    ) -> bool {
        match self.try_schedule_random_posts(entry_ids, posts_per_week, time_windows, platforms) {
            Ok(slots) => {
                let summary: Vec<String> = slots
                    .iter()
                    .map(|s| format!("{} {}", weekday_name(s.weekday), s.time))
                    .collect();
                info!(posts_per_week, slots = ?summary, "Scheduled random posts");
                true
            }
            Err(e) => {
                error!(posts_per_week, error = %e, "Failed to schedule random posts");
                false
            }
        }
    }

    fn try_schedule_random_posts(
        &self,
        entry_ids: &[EntryId],
        posts_per_week: u32,
        time_windows: &[(String, String)],
        platforms: &[String],
    ) -> std::result::Result<Vec<RandomSlot>, ScheduleError> {
        if entry_ids.is_empty() {
            return Err(ScheduleError::EmptyEntries);
        }
        if posts_per_week == 0 {
            return Err(ScheduleError::InvalidFrequency);
        }
        if time_windows.is_empty() {
            return Err(ScheduleError::NoTimeWindows);
        }
        let windows = time_windows
            .iter()
            .map(|(start, end)| parse_window(start, end))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let slots = pick_random_slots(posts_per_week, &windows);
        let descriptor = JobDescriptor::Random {
            entry_ids: entry_ids.to_vec(),
            posts_per_week,
            time_windows: time_windows.to_vec(),
            platforms: platforms.to_vec(),
            selected_slots: slots.clone(),
            job_tag: RANDOM_POSTS_TAG.to_string(),
        };
        self.arm(descriptor, &[])?;
        Ok(slots)
    }

    /// Register a descriptor with the triggers it describes
    fn arm(
        &self,
        descriptor: JobDescriptor,
        saved: &[NaiveDateTime],
    ) -> std::result::Result<(), ScheduleError> {
        let cadences = cadences_for(&descriptor)?;
        let tag = descriptor.tag().to_string();
        let id = self.inner.register(descriptor, cadences, saved);
        debug!(job_id = id, tag = %tag, "Registered job");
        Ok(())
    }

    // LIFECYCLE

    /// Start the polling loop on the current tokio runtime
    ///
    /// Returns `false` when already running or when called outside a
    /// runtime.
    pub fn start_scheduler(&self) -> bool {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                error!(error = %ScheduleError::NoRuntime, "Cannot start scheduler");
                return false;
            }
        };

        if self
            .inner
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Scheduler is already running");
            return false;
        }

        let inner = Arc::clone(&self.inner);
        let poll_interval = self.config.poll_interval;
        let worker = handle.spawn(async move {
            info!(poll_interval = ?poll_interval, "Scheduler loop started");
            while inner.running.load(Ordering::Acquire) {
                inner.dispatch_due(now());
                sleep_while_running(&inner.running, poll_interval).await;
            }
            info!("Scheduler loop exited");
        });

        *self.worker.lock().unwrap_or_else(|e| e.into_inner()) = Some(worker);
        info!("Scheduler started");
        true
    }

    /// Signal the loop to exit and wait for it, bounded by a timeout
    ///
    /// Executions already handed off keep running to completion.
    pub async fn stop_scheduler(&self) {
        if !self.inner.running.swap(false, Ordering::AcqRel) {
            warn!("Scheduler is not running");
            return;
        }

        let worker = self.worker.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(worker) = worker {
            match tokio::time::timeout(STOP_TIMEOUT, worker).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(error = %e, "Scheduler loop ended abnormally"),
                Err(_) => warn!("Scheduler loop did not stop within {:?}", STOP_TIMEOUT),
            }
        }
        info!("Scheduler stopped");
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    /// Run everything due at `now` and wait for the executions to finish
    pub async fn run_pending_at(&self, now: NaiveDateTime) -> Vec<JobOutcome> {
        let due = self.inner.take_due(now);
        let shared = &self.inner.shared;
        join_all(due.into_iter().map(|runner| runner.execute(Arc::clone(shared)))).await
    }

    /// Fire every job tagged `tag` once, ignoring trigger times
    pub async fn trigger_now(&self, tag: &str) -> Vec<JobOutcome> {
        let runners: Vec<_> = self
            .inner
            .jobs()
            .values()
            .filter(|job| job.tag() == tag)
            .map(|job| Arc::clone(&job.runner))
            .collect();
        let shared = &self.inner.shared;
        join_all(runners.into_iter().map(|runner| runner.execute(Arc::clone(shared)))).await
    }

    // CANCELLATION

    /// Remove every job, cancel pending reposting timers and forget what
    /// was posted
    pub fn clear_all_jobs(&self) {
        self.inner.jobs().clear();
        self.inner.shared.abort_removals();
        self.inner.shared.posted().clear();
        info!("All scheduled jobs cleared");
    }

    /// Remove jobs tagged `tag`, returning how many were removed
    pub fn clear_jobs_by_tag(&self, tag: &str) -> usize {
        let mut jobs = self.inner.jobs();
        let before = jobs.len();
        jobs.retain(|_, job| job.tag() != tag);
        let removed = before - jobs.len();
        info!(tag, removed, "Cleared jobs by tag");
        removed
    }

    // INSPECTION

    /// Up to `count` upcoming triggers, soonest first
    pub fn get_next_posts(&self, count: usize) -> Vec<UpcomingPost> {
        let jobs = self.inner.jobs();
        let mut upcoming: Vec<UpcomingPost> = jobs
            .values()
            .flat_map(|job| {
                job.triggers.iter().map(move |trigger| UpcomingPost {
                    next_run: trigger.next_run,
                    tags: vec![job.tag().to_string()],
                    job_info: format!("{} job, {}", job.descriptor.kind(), trigger.cadence.describe()),
                })
            })
            .collect();
        upcoming.sort_by(|a, b| a.next_run.cmp(&b.next_run));
        upcoming.truncate(count);
        upcoming
    }

    pub fn get_scheduler_status(&self) -> SchedulerStatus {
        let (total_jobs, scheduled_jobs) = {
            let jobs = self.inner.jobs();
            let triggers = jobs.values().map(|job| job.triggers.len()).sum();
            (triggers, jobs.len())
        };

        SchedulerStatus {
            running: self.is_running(),
            total_jobs,
            scheduled_jobs,
            posted_content_count: self.inner.shared.posted().len(),
            next_posts: self.get_next_posts(STATUS_NEXT_POSTS),
        }
    }

    /// Snapshot of the posted-set
    pub fn posted_ids(&self) -> HashSet<EntryId> {
        self.inner.shared.posted().clone()
    }

    /// Mark an entry as recently posted without publishing it
    pub fn mark_posted(&self, entry_id: EntryId) {
        self.inner.shared.posted().insert(entry_id);
    }

    /// Descriptors of every registered job, in registration order
    pub fn job_descriptors(&self) -> Vec<JobDescriptor> {
        self.inner
            .jobs()
            .values()
            .map(|job| job.descriptor.clone())
            .collect()
    }

    // PERSISTENCE

    pub fn save_schedule_config(&self, path: &Path) -> bool {
        match self.snapshot().write_to(path) {
            Ok(()) => {
                info!(path = %path.display(), "Schedule configuration saved");
                true
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to save schedule config");
                false
            }
        }
    }

    pub fn snapshot(&self) -> ScheduleSnapshot {
        let mut posted: Vec<EntryId> = self.posted_ids().into_iter().collect();
        posted.sort_unstable();
        let scheduled_jobs = self
            .inner
            .jobs()
            .values()
            .map(|job| SavedJob {
                descriptor: job.descriptor.clone(),
                next_runs: job.triggers.iter().map(|t| t.next_run).collect(),
            })
            .collect();
        ScheduleSnapshot {
            scheduled_jobs,
            posted_content_ids: posted,
            timestamp: now(),
        }
    }

    /// Replace jobs and posted-set with a saved snapshot
    ///
    /// Every restored descriptor is re-armed at its saved trigger times.
    /// A saved time that has already passed stays due and fires once on
    /// the next check; triggers without a saved time start fresh. Random
    /// jobs keep their saved weekly slots. Descriptors that no longer
    /// validate are dropped with a warning.
    pub fn load_schedule_config(&self, path: &Path) -> bool {
        let snapshot = match ScheduleSnapshot::read_from(path) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to load schedule config");
                return false;
            }
        };

        self.inner.jobs().clear();
        self.inner.shared.abort_removals();
        {
            let mut posted = self.inner.shared.posted();
            posted.clear();
            posted.extend(snapshot.posted_content_ids.iter().copied());
        }

        let loaded_at = now();
        for saved in snapshot.scheduled_jobs {
            let tag = saved.descriptor.tag().to_string();
            let overdue = saved.next_runs.iter().filter(|t| **t <= loaded_at).count();
            match self.arm(saved.descriptor, &saved.next_runs) {
                Ok(()) if overdue > 0 => {
                    info!(tag = %tag, overdue, "Restored job has missed runs, firing on next check")
                }
                Ok(()) => {}
                Err(e) => warn!(tag = %tag, error = %e, "Dropping unrestorable job"),
            }
        }

        info!(path = %path.display(), "Schedule configuration loaded");
        true
    }
}

impl Drop for PostScheduler {
    fn drop(&mut self) {
        self.inner.running.store(false, Ordering::Release);
    }
}

/// Sleep for `total`, waking every second to check the running flag
async fn sleep_while_running(running: &AtomicBool, total: Duration) {
    let slice = Duration::from_secs(1);
    let mut remaining = total;
    while !remaining.is_zero() && running.load(Ordering::Acquire) {
        let step = remaining.min(slice);
        tokio::time::sleep(step).await;
        remaining = remaining.saturating_sub(step);
    }
}

fn parse_window(start: &str, end: &str) -> std::result::Result<(u32, u32), ScheduleError> {
    let start_time = parse_time_of_day(start)?;
    let end_time = parse_time_of_day(end)?;
    if start_time > end_time {
        return Err(ScheduleError::InvalidWindow {
            start: start.to_string(),
            end: end.to_string(),
        });
    }
    Ok((minute_of_day(start_time), minute_of_day(end_time)))
}

fn minute_of_day(time: chrono::NaiveTime) -> u32 {
    use chrono::Timelike;
    time.hour() * 60 + time.minute()
}

/// Pick distinct weekdays and one minute inside a random window for each
fn pick_random_slots(posts_per_week: u32, windows: &[(u32, u32)]) -> Vec<RandomSlot> {
    let mut rng = rand::thread_rng();
    let count = (posts_per_week as usize).min(WEEKDAYS.len());
    let days: Vec<Weekday> = WEEKDAYS.choose_multiple(&mut rng, count).copied().collect();

    days.into_iter()
        .filter_map(|weekday| {
            let (start, end) = *windows.choose(&mut rng)?;
            let minute = rng.gen_range(start..=end);
            let time = chrono::NaiveTime::from_hms_opt(minute / 60, minute % 60, 0)?;
            Some(RandomSlot {
                weekday,
                time: format_time_of_day(time),
            })
        })
        .collect()
}

fn cadences_for(descriptor: &JobDescriptor) -> std::result::Result<Vec<Cadence>, ScheduleError> {
    match descriptor {
        JobDescriptor::Single { time, .. } => Ok(vec![Cadence::Daily {
            at: parse_time_of_day(time)?,
        }]),
        JobDescriptor::Recurring {
            entry_ids,
            interval_days,
            start_time,
            ..
        } => {
            if entry_ids.is_empty() {
                return Err(ScheduleError::EmptyEntries);
            }
            if *interval_days == 0 {
                return Err(ScheduleError::InvalidInterval);
            }
            Ok(vec![Cadence::for_interval(*interval_days, parse_time_of_day(start_time)?)])
        }
        JobDescriptor::Random {
            entry_ids,
            selected_slots,
            ..
        } => {
            if entry_ids.is_empty() {
                return Err(ScheduleError::EmptyEntries);
            }
            selected_slots
                .iter()
                .map(|slot| {
                    Ok(Cadence::Weekday {
                        weekday: slot.weekday,
                        at: parse_time_of_day(&slot.time)?,
                    })
                })
                .collect()
        }
    }
}
