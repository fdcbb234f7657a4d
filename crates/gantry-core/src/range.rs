use chrono::{NaiveDateTime, TimeDelta};
use tracing::debug;

use crate::timeline::TimelineItem;

pub const DEFAULT_PADDING_DAYS: u32 = 7;

/// Half-width of the window shown when no item carries a date.
pub const EMPTY_WINDOW_DAYS: i64 = 30;

/// Inclusive timeline window; `min <= max` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    min: NaiveDateTime,
    max: NaiveDateTime,
}

impl DateRange {
    /// Builds a range from two bounds in either order.
    pub fn new(a: NaiveDateTime, b: NaiveDateTime) -> Self {
        if a <= b {
            Self { min: a, max: b }
        } else {
            Self { min: b, max: a }
        }
    }

    pub fn min(&self) -> NaiveDateTime {
        self.min
    }

    pub fn max(&self) -> NaiveDateTime {
        self.max
    }

    pub fn total_days(&self) -> i64 {
        (self.max - self.min).num_days()
    }

    fn around(now: NaiveDateTime) -> Self {
        let half = TimeDelta::days(EMPTY_WINDOW_DAYS);
        Self::new(
            now.checked_sub_signed(half).unwrap_or(now),
            now.checked_add_signed(half).unwrap_or(now),
        )
    }

    fn padded(self, days: u32) -> Self {
        let pad = TimeDelta::days(i64::from(days));
        Self::new(
            self.min.checked_sub_signed(pad).unwrap_or(self.min),
            self.max.checked_add_signed(pad).unwrap_or(self.max),
        )
    }
}

/// Picks the visible window for `items`. An explicit range wins verbatim;
/// otherwise the item dates are scanned and widened by `padding_days` on
/// both sides. With nothing dated to scan, the window is `now ± 30 days`.
#[tracing::instrument(skip(items, now), fields(items = items.len()))]
pub fn compute_date_range(
    items: &[TimelineItem],
    padding_days: u32,
    explicit: Option<DateRange>,
    now: NaiveDateTime,
) -> DateRange {
    if let Some(range) = explicit {
        debug!(min = %range.min, max = %range.max, "using explicit date range");
        return range;
    }

    let mut min: Option<NaiveDateTime> = None;
    let mut max: Option<NaiveDateTime> = None;

    for item in items {
        if let Some(start) = item.start_date {
            min = Some(min.map_or(start, |m| m.min(start)));
        }
        if let Some(last) = item.end_date.or(item.start_date) {
            max = Some(max.map_or(last, |m| m.max(last)));
        }
    }

    let range = match (min, max) {
        (Some(min), Some(max)) => DateRange::new(min, max).padded(padding_days),
        (Some(only), None) | (None, Some(only)) => DateRange::new(only, only).padded(padding_days),
        (None, None) => {
            debug!("no dated items; using default window around now");
            DateRange::around(now)
        }
    };

    debug!(min = %range.min, max = %range.max, "computed date range");
    range
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

    use super::*;
    use crate::model::{Goal, Project};
    use crate::timeline::{TimelineSource, project_items};

    fn ts(month: u32, day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, month, day)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("valid date")
    }

    #[test]
    fn explicit_range_is_returned_verbatim() {
        let explicit = DateRange::new(ts(3, 1), ts(3, 10));
        let items = project_items(&Project::new(1, "p", ts(1, 1)), ts(6, 1));
        assert_eq!(compute_date_range(&items, 7, Some(explicit), ts(6, 1)), explicit);
    }

    #[test]
    fn scanned_range_is_padded_on_both_sides() {
        let now = ts(2, 1);
        let mut project = Project::new(1, "p", ts(1, 10));
        project.completed_at = Some(ts(1, 20));
        // open goal: its start counts toward the maximum
        project.goals = vec![Goal::new(2, 1, "late", ts(1, 25))];

        let range = compute_date_range(&project_items(&project, now), 7, None, now);
        assert_eq!(range.min(), ts(1, 3));
        assert_eq!(range.max(), ts(2, 1));
    }

    #[test]
    fn no_items_default_to_symmetric_window() {
        let now = ts(6, 15);
        let range = compute_date_range(&[], 7, None, now);
        assert_eq!(range.min(), now - TimeDelta::days(30));
        assert_eq!(range.max(), now + TimeDelta::days(30));
    }

    #[test]
    fn dateless_items_use_the_same_default_window() {
        let now = ts(6, 15);
        let mut project = Project::new(1, "p", ts(1, 1));
        project.created_at = None;
        let mut goal = Goal::new(2, 1, "g", ts(1, 1));
        goal.created_at = None;
        let items = vec![TimelineSource::Goal {
            goal: &goal,
            project: &project,
        }
        .project(now)];

        assert_eq!(compute_date_range(&items, 7, None, now), compute_date_range(&[], 7, None, now));
    }

    #[test]
    fn zero_duration_item_keeps_min_not_after_max() {
        let now = ts(1, 1);
        let mut project = Project::new(1, "p", now);
        project.completed_at = Some(now);

        let unpadded = compute_date_range(&project_items(&project, now), 0, None, now);
        assert_eq!(unpadded.min(), unpadded.max());

        let padded = compute_date_range(&project_items(&project, now), 7, None, now);
        assert!(padded.min() <= padded.max());
        assert_eq!(padded.total_days(), 14);
    }

    #[test]
    fn constructor_orders_bounds() {
        let range = DateRange::new(ts(5, 1), ts(4, 1));
        assert_eq!(range.min(), ts(4, 1));
        assert_eq!(range.max(), ts(5, 1));
    }
}
