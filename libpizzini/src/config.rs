//! Configuration management for Pizzini

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};
use crate::formatter::Platform;
use crate::scheduling::trigger::parse_time_of_day;
use crate::types::EntryId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub posting: PostingConfig,
    #[serde(default)]
    pub scheduling: SchedulingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentConfig {
    /// JSON array of entries
    #[serde(default = "default_entries_file")]
    pub entries_file: String,
    /// Entries to publish; empty means all
    #[serde(default)]
    pub entry_ids_to_post: Vec<EntryId>,
    #[serde(default)]
    pub exclude_entry_ids: Vec<EntryId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostingConfig {
    #[serde(default = "default_platforms")]
    pub default_platforms: Vec<String>,
    #[serde(default = "default_true")]
    pub include_hashtags: bool,
    /// Log formatted posts instead of publishing them
    #[serde(default = "default_true")]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleMode {
    Recurring,
    Random,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulingConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_mode")]
    pub mode: ScheduleMode,
    /// Seconds between scheduler polls
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,
    /// Where the daemon snapshots scheduler state; defaults to the data dir
    #[serde(default)]
    pub snapshot_file: Option<String>,
    #[serde(default)]
    pub recurring: RecurringConfig,
    #[serde(default)]
    pub random: RandomConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringConfig {
    #[serde(default = "default_interval_days")]
    pub interval_days: u32,
    #[serde(default = "default_start_time")]
    pub start_time: String,
    #[serde(default)]
    pub randomize_time: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomConfig {
    #[serde(default = "default_posts_per_week")]
    pub posts_per_week: u32,
    #[serde(default = "default_time_windows")]
    pub time_windows: Vec<(String, String)>,
}

fn default_entries_file() -> String {
    "~/.local/share/pizzini/entries.json".to_string()
}

fn default_platforms() -> Vec<String> {
    vec!["twitter".to_string(), "instagram".to_string()]
}

fn default_true() -> bool {
    true
}

fn default_mode() -> ScheduleMode {
    ScheduleMode::Recurring
}

fn default_poll_interval() -> u64 {
    60
}

fn default_interval_days() -> u32 {
    7
}

fn default_start_time() -> String {
    "09:00".to_string()
}

fn default_posts_per_week() -> u32 {
    3
}

fn default_time_windows() -> Vec<(String, String)> {
    vec![
        ("09:00".to_string(), "12:00".to_string()),
        ("15:00".to_string(), "18:00".to_string()),
    ]
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            entries_file: default_entries_file(),
            entry_ids_to_post: Vec::new(),
            exclude_entry_ids: Vec::new(),
        }
    }
}

impl Default for PostingConfig {
    fn default() -> Self {
        Self {
            default_platforms: default_platforms(),
            include_hashtags: true,
            dry_run: true,
        }
    }
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: default_mode(),
            poll_interval: default_poll_interval(),
            snapshot_file: None,
            recurring: RecurringConfig::default(),
            random: RandomConfig::default(),
        }
    }
}

impl Default for RecurringConfig {
    fn default() -> Self {
        Self {
            interval_days: default_interval_days(),
            start_time: default_start_time(),
            randomize_time: false,
        }
    }
}

impl Default for RandomConfig {
    fn default() -> Self {
        Self {
            posts_per_week: default_posts_per_week(),
            time_windows: default_time_windows(),
        }
    }
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load and validate configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            content: ContentConfig::default(),
            posting: PostingConfig::default(),
            scheduling: SchedulingConfig::default(),
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self).map_err(ConfigError::SerializeError)?)
    }

    /// Check values serde cannot check on its own
    pub fn validate(&self) -> Result<()> {
        if self.posting.default_platforms.is_empty() {
            return Err(invalid("posting.default_platforms", "at least one platform is required"));
        }
        for platform in &self.posting.default_platforms {
            if Platform::from_name(platform).is_none() {
                return Err(invalid(
                    "posting.default_platforms",
                    &format!("unknown platform '{}'", platform),
                ));
            }
        }

        let scheduling = &self.scheduling;
        if scheduling.poll_interval == 0 {
            return Err(invalid("scheduling.poll_interval", "must be at least one second"));
        }
        if scheduling.recurring.interval_days == 0 {
            return Err(invalid("scheduling.recurring.interval_days", "must be at least one day"));
        }
        if parse_time_of_day(&scheduling.recurring.start_time).is_err() {
            return Err(invalid(
                "scheduling.recurring.start_time",
                &format!("'{}' is not HH:MM", scheduling.recurring.start_time),
            ));
        }
        if scheduling.random.posts_per_week == 0 {
            return Err(invalid("scheduling.random.posts_per_week", "must be at least one"));
        }
        if scheduling.random.time_windows.is_empty() {
            return Err(invalid("scheduling.random.time_windows", "at least one window is required"));
        }
        for (start, end) in &scheduling.random.time_windows {
            match (parse_time_of_day(start), parse_time_of_day(end)) {
                (Ok(s), Ok(e)) if s <= e => {}
                _ => {
                    return Err(invalid(
                        "scheduling.random.time_windows",
                        &format!("'{}'-'{}' is not a valid HH:MM window", start, end),
                    ))
                }
            }
        }

        Ok(())
    }

    /// Apply the include and exclude lists to the available ids
    ///
    /// Order follows `all_ids`. Included ids that do not exist are ignored.
    pub fn eligible_entry_ids(&self, all_ids: &[EntryId]) -> Vec<EntryId> {
        let include = &self.content.entry_ids_to_post;
        let exclude = &self.content.exclude_entry_ids;
        all_ids
            .iter()
            .copied()
            .filter(|id| include.is_empty() || include.contains(id))
            .filter(|id| !exclude.contains(id))
            .collect()
    }

    /// Expanded path of the entries file
    pub fn entries_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.content.entries_file).to_string())
    }

    /// Expanded snapshot path, defaulting to `<data dir>/schedule.json`
    pub fn snapshot_path(&self) -> Result<PathBuf> {
        match &self.scheduling.snapshot_file {
            Some(path) => Ok(PathBuf::from(shellexpand::tilde(path).to_string())),
            None => Ok(resolve_data_path()?.join("schedule.json")),
        }
    }
}

fn invalid(field: &str, reason: &str) -> crate::error::PizziniError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

/// Resolve the configuration file path following XDG Base Directory spec
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("PIZZINI_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("pizzini").join("config.toml"))
}

/// Resolve the data directory path following XDG Base Directory spec
pub fn resolve_data_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
        .ok_or_else(|| ConfigError::MissingField("data directory".to_string()))?;

    Ok(data_dir.join("pizzini"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PizziniError;
    use serial_test::serial;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    fn invalid_field(result: Result<()>) -> String {
        match result {
            Err(PizziniError::Config(ConfigError::InvalidValue { field, .. })) => field,
            other => panic!("expected invalid value, got {:?}", other),
        }
    }

    #[test]
    fn test_minimal_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "");
        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config, Config::default_config());
        assert_eq!(config.scheduling.poll_interval, 60);
        assert_eq!(config.scheduling.random.time_windows.len(), 2);
    }

    #[test]
    fn test_full_file() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"
[content]
entries_file = "/tmp/entries.json"
entry_ids_to_post = [1, 2, 3]
exclude_entry_ids = [2]

[posting]
default_platforms = ["linkedin"]
include_hashtags = false
dry_run = false

[scheduling]
enabled = true
mode = "random"
poll_interval = 30

[scheduling.random]
posts_per_week = 5
time_windows = [["08:00", "10:00"]]
"#,
        );
        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.scheduling.mode, ScheduleMode::Random);
        assert_eq!(config.scheduling.random.posts_per_week, 5);
        assert_eq!(
            config.scheduling.random.time_windows,
            vec![("08:00".to_string(), "10:00".to_string())]
        );
        assert_eq!(config.scheduling.recurring.interval_days, 7);
        assert!(!config.posting.include_hashtags);
        assert_eq!(config.entries_path(), PathBuf::from("/tmp/entries.json"));
    }

    #[test]
    fn test_unknown_mode_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[scheduling]\nmode = \"hourly\"\n");
        let err = Config::load_from_path(&path).unwrap_err();
        assert!(matches!(err, PizziniError::Config(ConfigError::ParseError(_))));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = TempDir::new().unwrap();
        let err = Config::load_from_path(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, PizziniError::Config(ConfigError::ReadError(_))));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default_config();
        config.posting.default_platforms.clear();
        assert_eq!(invalid_field(config.validate()), "posting.default_platforms");

        let mut config = Config::default_config();
        config.posting.default_platforms = vec!["myspace".to_string()];
        assert_eq!(invalid_field(config.validate()), "posting.default_platforms");

        let mut config = Config::default_config();
        config.scheduling.recurring.start_time = "9am".to_string();
        assert_eq!(invalid_field(config.validate()), "scheduling.recurring.start_time");

        let mut config = Config::default_config();
        config.scheduling.recurring.interval_days = 0;
        assert_eq!(invalid_field(config.validate()), "scheduling.recurring.interval_days");

        let mut config = Config::default_config();
        config.scheduling.random.time_windows = vec![("18:00".to_string(), "09:00".to_string())];
        assert_eq!(invalid_field(config.validate()), "scheduling.random.time_windows");

        let mut config = Config::default_config();
        config.scheduling.random.posts_per_week = 0;
        assert_eq!(invalid_field(config.validate()), "scheduling.random.posts_per_week");
    }

    #[test]
    fn test_to_toml_reloads() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default_config();
        config.scheduling.snapshot_file = Some("/tmp/snap.json".to_string());
        let path = write_config(&dir, &config.to_toml().unwrap());
        assert_eq!(Config::load_from_path(&path).unwrap(), config);
    }

    #[test]
    fn test_eligible_entry_ids() {
        let mut config = Config::default_config();
        assert_eq!(config.eligible_entry_ids(&[1, 2, 3]), vec![1, 2, 3]);

        config.content.exclude_entry_ids = vec![2];
        assert_eq!(config.eligible_entry_ids(&[1, 2, 3]), vec![1, 3]);

        config.content.entry_ids_to_post = vec![3, 2, 9];
        assert_eq!(config.eligible_entry_ids(&[1, 2, 3]), vec![3]);
    }

    #[test]
    fn test_snapshot_path_explicit() {
        let mut config = Config::default_config();
        config.scheduling.snapshot_file = Some("/var/tmp/pizzini.json".to_string());
        assert_eq!(config.snapshot_path().unwrap(), PathBuf::from("/var/tmp/pizzini.json"));
    }

    #[test]
    #[serial]
    fn test_resolve_config_path_env_override() {
        std::env::set_var("PIZZINI_CONFIG", "/custom/pizzini.toml");
        let path = resolve_config_path().unwrap();
        std::env::remove_var("PIZZINI_CONFIG");
        assert_eq!(path, PathBuf::from("/custom/pizzini.toml"));
    }

    #[test]
    #[serial]
    fn test_resolve_config_path_default() {
        std::env::remove_var("PIZZINI_CONFIG");
        if let Ok(path) = resolve_config_path() {
            assert!(path.ends_with("pizzini/config.toml"));
        }
    }
}
