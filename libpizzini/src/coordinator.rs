//! Glue between the entry catalog, the formatter and the scheduler
//!
//! [`Automation`] is the [`PostCallback`] the daemon hands to the
//! scheduler: it looks the entry up, renders it per platform and passes the
//! text to a [`Publisher`]. Real platform clients plug in as publishers;
//! the only one shipped here is [`LogPublisher`], which just logs.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::config::{Config, ScheduleMode};
use crate::entries::EntryCatalog;
use crate::error::{PizziniError, Result};
use crate::formatter::{sanitize_content, ContentFormatter, Platform};
use crate::scheduling::{PostCallback, PostScheduler};
use crate::types::{ContentEntry, EntryId};

/// Delivers rendered text to one platform
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, platform: &str, text: &str) -> Result<()>;
}

/// Dry-run publisher: logs what would have been posted
#[derive(Debug, Clone, Default)]
pub struct LogPublisher;

#[async_trait]
impl Publisher for LogPublisher {
    async fn publish(&self, platform: &str, text: &str) -> Result<()> {
        info!(platform, chars = text.chars().count(), "DRY RUN - would post:\n{}", text);
        Ok(())
    }
}

/// Publishes catalog entries on behalf of the scheduler
pub struct Automation {
    catalog: EntryCatalog,
    formatter: Mutex<ContentFormatter>,
    publisher: Arc<dyn Publisher>,
    include_hashtags: bool,
}

impl Automation {
    pub fn new(catalog: EntryCatalog, publisher: Arc<dyn Publisher>, include_hashtags: bool) -> Self {
        Self {
            catalog,
            formatter: Mutex::new(ContentFormatter::new()),
            publisher,
            include_hashtags,
        }
    }

    pub fn catalog(&self) -> &EntryCatalog {
        &self.catalog
    }

    /// Texts to post for `entry` on `platform`, in order
    ///
    /// Twitter and X get a thread when a single post would truncate the
    /// body; everything else gets one post. Hashtags are only selected for
    /// the text that is actually posted, so threads leave the rotation
    /// untouched.
    pub fn render(&self, entry: &ContentEntry, platform: &str) -> Vec<String> {
        let mut formatter = self.formatter.lock().unwrap_or_else(|e| e.into_inner());

        let microblog = Platform::from_name(platform).is_some_and(|p| p.is_microblog());
        if microblog {
            let untagged =
                formatter.format_for_platform(&entry.title, &entry.content, platform, &entry.date, false);
            if !untagged.text.contains(&sanitize_content(&entry.content)) {
                return formatter.create_thread(&entry.title, &entry.content, platform);
            }
        }

        let post = formatter.format_for_platform(
            &entry.title,
            &entry.content,
            platform,
            &entry.date,
            self.include_hashtags,
        );
        vec![post.text]
    }

    /// Publish one entry everywhere; true if at least one platform took it
    pub async fn publish_entry(&self, entry_id: EntryId, platforms: &[String]) -> Result<bool> {
        let entry = self
            .catalog
            .get(entry_id)
            .ok_or_else(|| PizziniError::InvalidInput(format!("Entry {} not found", entry_id)))?;

        info!(entry_id, title = %entry.title, "Posting entry");

        let mut succeeded = 0;
        for platform in platforms {
            let texts = self.render(entry, platform);
            match self.publish_all(platform, &texts).await {
                Ok(()) => succeeded += 1,
                Err(e) => warn!(entry_id, platform = %platform, error = %e, "Platform post failed"),
            }
        }

        info!(entry_id, "Posted to {}/{} platforms", succeeded, platforms.len());
        Ok(succeeded > 0)
    }

    async fn publish_all(&self, platform: &str, texts: &[String]) -> Result<()> {
        for text in texts {
            self.publisher.publish(platform, text).await?;
        }
        Ok(())
    }

    /// Register the configured schedule over `entry_ids`
    ///
    /// Returns `false` when there is nothing to schedule or the scheduler
    /// rejected the settings.
    pub fn schedule_from_config(scheduler: &PostScheduler, config: &Config, entry_ids: &[EntryId]) -> bool {
        if entry_ids.is_empty() {
            error!("No entries available for posting");
            return false;
        }

        let platforms = &config.posting.default_platforms;
        let scheduling = &config.scheduling;
        info!(entries = entry_ids.len(), mode = ?scheduling.mode, "Setting up schedule");

        match scheduling.mode {
            ScheduleMode::Recurring => scheduler.schedule_recurring_posts(
                entry_ids,
                scheduling.recurring.interval_days,
                &scheduling.recurring.start_time,
                platforms,
                scheduling.recurring.randomize_time,
            ),
            ScheduleMode::Random => scheduler.schedule_random_posts(
                entry_ids,
                scheduling.random.posts_per_week,
                &scheduling.random.time_windows,
                platforms,
            ),
        }
    }
}

#[async_trait]
impl PostCallback for Automation {
    async fn post(&self, entry_id: EntryId, platforms: &[String]) -> Result<bool> {
        self.publish_entry(entry_id, platforms).await
    }
}
