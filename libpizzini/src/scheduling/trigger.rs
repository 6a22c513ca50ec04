//! Trigger cadences and wall-clock arithmetic
//!
//! All times are local wall-clock `NaiveDateTime`s: a pizzini scheduled for
//! "09:00" goes out at nine in the morning wherever the daemon runs.

use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;

/// Time-of-day format accepted everywhere in scheduling
pub const TIME_FORMAT: &str = "%H:%M";

/// Parse an `HH:MM` string
pub fn parse_time_of_day(input: &str) -> Result<NaiveTime, ScheduleError> {
    NaiveTime::parse_from_str(input.trim(), TIME_FORMAT)
        .map_err(|_| ScheduleError::InvalidTime(input.to_string()))
}

/// Render a time of day as `HH:MM`
pub fn format_time_of_day(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// How often a trigger repeats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "every", rename_all = "snake_case")]
pub enum Cadence {
    /// Every day at `at`
    Daily { at: NaiveTime },
    /// Every seven days at `at`, starting at the next occurrence
    Weekly { at: NaiveTime },
    /// Every `days` days at `at`, first run `days` days from today
    EveryNDays { days: u32, at: NaiveTime },
    /// A fixed day of the week at `at`
    Weekday { weekday: Weekday, at: NaiveTime },
}

impl Cadence {
    /// Cadence for a recurring rotation with the given interval
    pub fn for_interval(days: u32, at: NaiveTime) -> Self {
        match days {
            1 => Cadence::Daily { at },
            7 => Cadence::Weekly { at },
            n => Cadence::EveryNDays { days: n, at },
        }
    }

    fn period(&self) -> Duration {
        match self {
            Cadence::Daily { .. } => Duration::days(1),
            Cadence::Weekly { .. } | Cadence::Weekday { .. } => Duration::days(7),
            Cadence::EveryNDays { days, .. } => Duration::days(i64::from((*days).max(1))),
        }
    }

    fn time(&self) -> NaiveTime {
        match self {
            Cadence::Daily { at }
            | Cadence::Weekly { at }
            | Cadence::EveryNDays { at, .. }
            | Cadence::Weekday { at, .. } => *at,
        }
    }

    /// First firing strictly after `now`
    pub fn first_run(&self, now: NaiveDateTime) -> NaiveDateTime {
        match self {
            Cadence::Daily { at } | Cadence::Weekly { at } => next_occurrence(now, *at),
            Cadence::EveryNDays { days, at } => {
                now.date().and_time(*at) + Duration::days(i64::from((*days).max(1)))
            }
            Cadence::Weekday { weekday, at } => next_weekday_occurrence(now, *weekday, *at),
        }
    }

    /// Next firing after `previous`, skipping any slots already behind `now`
    pub fn next_after(&self, previous: NaiveDateTime, now: NaiveDateTime) -> NaiveDateTime {
        let period = self.period();
        let mut next = previous + period;
        while next <= now {
            next += period;
        }
        next
    }

    /// Short human description, e.g. `every day at 09:00`
    pub fn describe(&self) -> String {
        let at = format_time_of_day(self.time());
        match self {
            Cadence::Daily { .. } => format!("every day at {}", at),
            Cadence::Weekly { .. } => format!("every week at {}", at),
            Cadence::EveryNDays { days, .. } => format!("every {} days at {}", days, at),
            Cadence::Weekday { weekday, .. } => format!("every {} at {}", weekday_name(*weekday), at),
        }
    }
}

/// Today at `at` if still ahead of `now`, otherwise tomorrow
fn next_occurrence(now: NaiveDateTime, at: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(at);
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

fn next_weekday_occurrence(now: NaiveDateTime, weekday: Weekday, at: NaiveTime) -> NaiveDateTime {
    let today = now.date();
    let ahead = (7 + weekday.num_days_from_monday() as i64
        - today.weekday().num_days_from_monday() as i64)
        % 7;
    let candidate = (today + Duration::days(ahead)).and_time(at);
    if candidate > now {
        candidate
    } else {
        candidate + Duration::days(7)
    }
}

pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

/// A cadence plus the next time it is due
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub cadence: Cadence,
    pub next_run: NaiveDateTime,
}

impl Trigger {
    pub fn new(cadence: Cadence, now: NaiveDateTime) -> Self {
        Self {
            cadence,
            next_run: cadence.first_run(now),
        }
    }

    /// Re-arm a trigger from a saved `next_run`
    ///
    /// A saved time already behind `now` is kept, so the missed run is due
    /// on the next check and fires once. Without a saved time the trigger
    /// starts fresh from `now`.
    pub fn resume(cadence: Cadence, saved: Option<NaiveDateTime>, now: NaiveDateTime) -> Self {
        match saved {
            Some(next_run) => Self { cadence, next_run },
            None => Self::new(cadence, now),
        }
    }

    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        self.next_run <= now
    }

    /// Re-arm after firing at `now`
    pub fn advance(&mut self, now: NaiveDateTime) {
        self.next_run = self.cadence.next_after(self.next_run, now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn monday_morning() -> NaiveDateTime {
        // 2024-01-01 was a Monday
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_time(time("08:30"))
    }

    fn time(s: &str) -> NaiveTime {
        parse_time_of_day(s).unwrap()
    }

    // TIME PARSING TESTS

    #[test]
    fn test_parse_time_of_day() {
        assert_eq!(time("09:00"), NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(time(" 18:45 "), NaiveTime::from_hms_opt(18, 45, 0).unwrap());
    }

    #[test]
    fn test_parse_time_of_day_rejects_garbage() {
        for bad in ["25:00", "9", "nine", "", "12:60"] {
            assert_eq!(
                parse_time_of_day(bad),
                Err(ScheduleError::InvalidTime(bad.to_string())),
                "{}",
                bad
            );
        }
    }

    // CADENCE TESTS

    #[test]
    fn test_daily_first_run_today_when_ahead() {
        let now = monday_morning();
        let cadence = Cadence::Daily { at: time("09:00") };
        assert_eq!(cadence.first_run(now), now.date().and_time(time("09:00")));
    }

    #[test]
    fn test_daily_first_run_tomorrow_when_passed() {
        let now = monday_morning();
        let cadence = Cadence::Daily { at: time("08:00") };
        assert_eq!(
            cadence.first_run(now),
            (now.date() + Duration::days(1)).and_time(time("08:00"))
        );
    }

    #[test]
    fn test_weekly_anchored_like_daily() {
        let now = monday_morning();
        let cadence = Cadence::for_interval(7, time("09:00"));
        assert_eq!(cadence, Cadence::Weekly { at: time("09:00") });
        let first = cadence.first_run(now);
        assert_eq!(first, now.date().and_time(time("09:00")));
        assert_eq!(cadence.next_after(first, first), first + Duration::days(7));
    }

    #[test]
    fn test_every_n_days_first_run() {
        let now = monday_morning();
        let cadence = Cadence::for_interval(3, time("09:00"));
        assert_eq!(
            cadence.first_run(now),
            (now.date() + Duration::days(3)).and_time(time("09:00"))
        );
    }

    #[test]
    fn test_weekday_occurrence() {
        let now = monday_morning();
        let wednesday = Cadence::Weekday {
            weekday: Weekday::Wed,
            at: time("10:00"),
        };
        let first = wednesday.first_run(now);
        assert_eq!(first.weekday(), Weekday::Wed);
        assert_eq!(first.date(), now.date() + Duration::days(2));

        // Same weekday but the time has already passed
        let monday_early = Cadence::Weekday {
            weekday: Weekday::Mon,
            at: time("07:00"),
        };
        assert_eq!(
            monday_early.first_run(now).date(),
            now.date() + Duration::days(7)
        );
    }

    #[test]
    fn test_next_after_skips_missed_slots() {
        let now = monday_morning();
        let cadence = Cadence::Daily { at: time("09:00") };
        let stale = now.date().and_time(time("09:00")) - Duration::days(5);
        let next = cadence.next_after(stale, now);
        assert_eq!(next, now.date().and_time(time("09:00")));
    }

    #[test]
    fn test_describe() {
        assert_eq!(Cadence::Daily { at: time("09:00") }.describe(), "every day at 09:00");
        assert_eq!(
            Cadence::Weekday {
                weekday: Weekday::Fri,
                at: time("16:05")
            }
            .describe(),
            "every friday at 16:05"
        );
    }

    // TRIGGER TESTS

    #[test]
    fn test_trigger_due_and_advance() {
        let now = monday_morning();
        let mut trigger = Trigger::new(Cadence::Daily { at: time("09:00") }, now);
        assert!(!trigger.is_due(now));

        let later = now + Duration::hours(1);
        assert!(trigger.is_due(later));
        trigger.advance(later);
        assert!(!trigger.is_due(later));
        assert_eq!(trigger.next_run, (now.date() + Duration::days(1)).and_time(time("09:00")));
    }

    #[test]
    fn test_resume_keeps_saved_next_run() {
        let now = monday_morning();
        let cadence = Cadence::for_interval(3, time("09:00"));
        let saved = now.date().and_time(time("09:00")) + Duration::days(1);

        let trigger = Trigger::resume(cadence, Some(saved), now + Duration::hours(2));
        assert_eq!(trigger.next_run, saved);
        assert_eq!(Trigger::resume(cadence, None, now), Trigger::new(cadence, now));
    }

    #[test]
    fn test_resume_missed_run_fires_once() {
        let now = monday_morning();
        let cadence = Cadence::Daily { at: time("09:00") };
        let missed = now.date().and_time(time("09:00")) - Duration::days(3);

        let mut trigger = Trigger::resume(cadence, Some(missed), now);
        assert!(trigger.is_due(now));
        trigger.advance(now);
        assert!(!trigger.is_due(now));
        assert_eq!(trigger.next_run, now.date().and_time(time("09:00")));
    }
}
