//! Advisory posting times
//!
//! A static table of good posting times per platform. Nothing in the
//! scheduler consults it; the CLI uses it to suggest a schedule.

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Time returned for platforms with no curated table
pub const DEFAULT_TIME: &str = "12:00";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayType {
    Weekdays,
    Weekends,
}

impl std::str::FromStr for DayType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "weekdays" | "weekday" => Ok(DayType::Weekdays),
            "weekends" | "weekend" => Ok(DayType::Weekends),
            _ => Err(format!(
                "Unknown day type: '{}'. Valid options: weekdays, weekends",
                s
            )),
        }
    }
}

struct OptimalTimes {
    platform: &'static str,
    weekdays: &'static [&'static str],
    weekends: &'static [&'static str],
}

const OPTIMAL_TIMES: [OptimalTimes; 4] = [
    OptimalTimes {
        platform: "twitter",
        weekdays: &["09:00", "12:00", "15:00", "18:00"],
        weekends: &["10:00", "14:00", "19:00"],
    },
    OptimalTimes {
        platform: "instagram",
        weekdays: &["11:00", "13:00", "17:00", "19:00"],
        weekends: &["10:00", "12:00", "16:00", "20:00"],
    },
    OptimalTimes {
        platform: "facebook",
        weekdays: &["09:00", "13:00", "15:00"],
        weekends: &["12:00", "14:00", "16:00"],
    },
    // Professional audience, nothing on weekends
    OptimalTimes {
        platform: "linkedin",
        weekdays: &["08:00", "10:00", "12:00", "14:00", "17:00"],
        weekends: &[],
    },
];

/// Curated `HH:MM` times for `platform` on `day_type`
///
/// Unknown platforms get `["12:00"]`. A known platform with an empty slot
/// list (linkedin weekends) gets an empty list.
pub fn get_optimal_times(platform: &str, day_type: DayType) -> Vec<String> {
    let name = platform.trim().to_lowercase();
    match OPTIMAL_TIMES.iter().find(|t| t.platform == name) {
        Some(times) => {
            let slots = match day_type {
                DayType::Weekdays => times.weekdays,
                DayType::Weekends => times.weekends,
            };
            slots.iter().map(|s| s.to_string()).collect()
        }
        None => vec![DEFAULT_TIME.to_string()],
    }
}

/// Randomly sample up to `posts_per_week` times per platform
///
/// Up to three posts a week stay on weekday slots; more than that draws
/// from weekday and weekend slots combined. Sampling is without
/// replacement, so a platform never gets the same time twice.
pub fn suggest_posting_schedule(
    platforms: &[String],
    posts_per_week: usize,
) -> BTreeMap<String, Vec<String>> {
    let mut rng = rand::thread_rng();

    platforms
        .iter()
        .map(|platform| {
            let mut pool = get_optimal_times(platform, DayType::Weekdays);
            if posts_per_week > 3 {
                pool.extend(get_optimal_times(platform, DayType::Weekends));
            }
            let picked = pool
                .choose_multiple(&mut rng, posts_per_week.min(pool.len()))
                .cloned()
                .collect();
            (platform.clone(), picked)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_known_platform_times() {
        assert_eq!(
            get_optimal_times("twitter", DayType::Weekends),
            vec!["10:00", "14:00", "19:00"]
        );
        assert_eq!(get_optimal_times("Facebook", DayType::Weekdays).len(), 3);
    }

    #[test]
    fn test_linkedin_has_no_weekend_slots() {
        assert!(get_optimal_times("linkedin", DayType::Weekends).is_empty());
    }

    #[test]
    fn test_unknown_platform_default() {
        assert_eq!(get_optimal_times("mastodon", DayType::Weekdays), vec!["12:00"]);
    }

    #[test]
    fn test_day_type_from_str() {
        assert_eq!("Weekend".parse::<DayType>(), Ok(DayType::Weekends));
        assert!("holiday".parse::<DayType>().is_err());
    }

    #[test]
    fn test_suggest_few_posts_uses_weekday_slots() {
        let platforms = vec!["twitter".to_string()];
        let suggestion = suggest_posting_schedule(&platforms, 3);
        let weekday: HashSet<String> = get_optimal_times("twitter", DayType::Weekdays)
            .into_iter()
            .collect();
        let picked = &suggestion["twitter"];
        assert_eq!(picked.len(), 3);
        assert!(picked.iter().all(|t| weekday.contains(t)));
    }

    #[test]
    fn test_suggest_many_posts_without_replacement() {
        let platforms = vec!["instagram".to_string(), "linkedin".to_string()];
        let suggestion = suggest_posting_schedule(&platforms, 20);

        // 4 weekday + 4 weekend slots
        assert_eq!(suggestion["instagram"].len(), 8);
        // linkedin has no weekend slots to add
        assert_eq!(suggestion["linkedin"].len(), 5);

        let unique: HashSet<_> = suggestion["linkedin"].iter().collect();
        assert_eq!(unique.len(), 5);
    }

    #[test]
    fn test_suggest_zero_posts() {
        let suggestion = suggest_posting_schedule(&["twitter".to_string()], 0);
        assert!(suggestion["twitter"].is_empty());
    }
}
