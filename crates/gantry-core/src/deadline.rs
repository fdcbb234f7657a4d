use chrono::{NaiveDateTime, TimeDelta};
use serde::Serialize;

/// Days ahead of a deadline at which it starts counting as approaching.
pub const DEFAULT_WARNING_DAYS: i64 = 3;

const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct TimeRemaining {
    /// Whole days left; negative once overdue.
    pub days: i64,
    /// Whole hours left over after `days`.
    pub hours: i64,
    pub is_overdue: bool,
    pub is_approaching: bool,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum DeadlineClass {
    #[serde(rename = "deadline-overdue")]
    Overdue,
    #[serde(rename = "deadline-warning")]
    Warning,
    #[serde(rename = "deadline-normal")]
    Normal,
}

impl DeadlineClass {
    pub fn as_str(self) -> &'static str {
        match self {
            DeadlineClass::Overdue => "deadline-overdue",
            DeadlineClass::Warning => "deadline-warning",
            DeadlineClass::Normal => "deadline-normal",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DeadlineStatus {
    pub display: String,
    pub css_class: DeadlineClass,
    pub date_formatted: String,
    pub date_short: String,
    pub is_overdue: bool,
    pub is_approaching: bool,
}

pub fn time_remaining(deadline: NaiveDateTime, now: NaiveDateTime) -> TimeRemaining {
    let delta = deadline - now;
    let is_overdue = delta < TimeDelta::zero();
    let magnitude = delta.abs();
    let days = magnitude.num_days();
    let hours = (magnitude.num_seconds() % SECONDS_PER_DAY) / 3_600;

    TimeRemaining {
        days: if is_overdue { -days } else { days },
        hours,
        is_overdue,
        is_approaching: !is_overdue && days <= DEFAULT_WARNING_DAYS,
    }
}

pub fn format_time_remaining(deadline: NaiveDateTime, now: NaiveDateTime) -> String {
    let remaining = time_remaining(deadline, now);

    if remaining.is_overdue {
        return match remaining.days.abs() {
            0 => "Overdue".to_string(),
            1 => "Overdue by 1 day".to_string(),
            days => format!("Overdue by {days} days"),
        };
    }

    match (remaining.days, remaining.hours) {
        (days, _) if days >= 730 => match days / 365 {
            1 => "Due in 1 year".to_string(),
            years => format!("Due in {years} years"),
        },
        (0, 0) => "Due now".to_string(),
        (0, 1) => "Due in 1 hour".to_string(),
        (0, hours) => format!("Due in {hours} hours"),
        (1, _) => "Due tomorrow".to_string(),
        (days, _) => format!("Due in {days} days"),
    }
}

pub fn is_overdue(deadline: Option<NaiveDateTime>, now: NaiveDateTime) -> bool {
    deadline.is_some_and(|deadline| now > deadline)
}

/// True when the deadline falls inside the next `window_days`.
pub fn is_approaching(deadline: Option<NaiveDateTime>, now: NaiveDateTime, window_days: i64) -> bool {
    let Some(deadline) = deadline else {
        return false;
    };
    let threshold = TimeDelta::try_days(window_days)
        .and_then(|window| now.checked_add_signed(window))
        .unwrap_or(NaiveDateTime::MAX);
    now < deadline && deadline <= threshold
}

pub fn deadline_status(deadline: Option<NaiveDateTime>, now: NaiveDateTime) -> Option<DeadlineStatus> {
    let deadline = deadline?;
    let remaining = time_remaining(deadline, now);

    let css_class = if remaining.is_overdue {
        DeadlineClass::Overdue
    } else if remaining.is_approaching {
        DeadlineClass::Warning
    } else {
        DeadlineClass::Normal
    };

    Some(DeadlineStatus {
        display: format_time_remaining(deadline, now),
        css_class,
        date_formatted: deadline.format("%b %d, %Y").to_string(),
        date_short: deadline.format("%y-%m-%d").to_string(),
        is_overdue: remaining.is_overdue,
        is_approaching: remaining.is_approaching,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

    use super::*;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 10)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .expect("valid now")
    }

    fn in_hours(hours: i64) -> NaiveDateTime {
        now() + TimeDelta::hours(hours)
    }

    #[test]
    fn remaining_splits_days_and_hours() {
        let remaining = time_remaining(in_hours(2 * 24 + 5), now());
        assert_eq!(remaining.days, 2);
        assert_eq!(remaining.hours, 5);
        assert!(!remaining.is_overdue);
        assert!(remaining.is_approaching);

        let late = time_remaining(in_hours(-(3 * 24 + 1)), now());
        assert_eq!(late.days, -3);
        assert_eq!(late.hours, 1);
        assert!(late.is_overdue);
        assert!(!late.is_approaching);
    }

    #[test]
    fn formats_future_deadlines() {
        assert_eq!(format_time_remaining(now(), now()), "Due now");
        assert_eq!(format_time_remaining(in_hours(1), now()), "Due in 1 hour");
        assert_eq!(format_time_remaining(in_hours(7), now()), "Due in 7 hours");
        assert_eq!(format_time_remaining(in_hours(30), now()), "Due tomorrow");
        assert_eq!(format_time_remaining(in_hours(5 * 24), now()), "Due in 5 days");
        assert_eq!(format_time_remaining(in_hours(800 * 24), now()), "Due in 2 years");
    }

    #[test]
    fn formats_overdue_deadlines() {
        assert_eq!(format_time_remaining(in_hours(-2), now()), "Overdue");
        assert_eq!(format_time_remaining(in_hours(-30), now()), "Overdue by 1 day");
        assert_eq!(format_time_remaining(in_hours(-4 * 24), now()), "Overdue by 4 days");
    }

    #[test]
    fn overdue_and_approaching_checks() {
        assert!(!is_overdue(None, now()));
        assert!(is_overdue(Some(in_hours(-1)), now()));
        assert!(!is_overdue(Some(now()), now()));

        assert!(!is_approaching(None, now(), 3));
        assert!(is_approaching(Some(in_hours(72)), now(), 3));
        assert!(!is_approaching(Some(in_hours(73)), now(), 3));
        assert!(!is_approaching(Some(now()), now(), 3));
    }

    #[test]
    fn status_picks_css_class() {
        assert_eq!(deadline_status(None, now()), None);

        let overdue = deadline_status(Some(in_hours(-48)), now()).expect("status");
        assert_eq!(overdue.css_class, DeadlineClass::Overdue);
        assert_eq!(overdue.display, "Overdue by 2 days");

        let soon = deadline_status(Some(in_hours(24)), now()).expect("status");
        assert_eq!(soon.css_class, DeadlineClass::Warning);
        assert_eq!(soon.date_formatted, "Mar 11, 2025");
        assert_eq!(soon.date_short, "25-03-11");

        let later = deadline_status(Some(in_hours(10 * 24)), now()).expect("status");
        assert_eq!(later.css_class, DeadlineClass::Normal);
        assert_eq!(later.css_class.as_str(), "deadline-normal");
    }
}
