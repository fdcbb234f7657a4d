use std::fmt;

use chrono::{NaiveDateTime, TimeDelta};
use serde::Serialize;
use tracing::debug;

use crate::datetime::format_iso;
use crate::range::DateRange;
use crate::timeline::TimelineItem;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ZoomLevel {
    Day,
    Week,
    Month,
}

impl ZoomLevel {
    /// Coarsest granularity that still gives a readable axis for a span.
    pub fn for_span(total_days: i64) -> Self {
        if total_days <= 14 {
            ZoomLevel::Day
        } else if total_days <= 90 {
            ZoomLevel::Week
        } else {
            ZoomLevel::Month
        }
    }

    /// Fixed tick spacing. Months are 30 days, not calendar months.
    pub fn step_days(self) -> i64 {
        match self {
            ZoomLevel::Day => 1,
            ZoomLevel::Week => 7,
            ZoomLevel::Month => 30,
        }
    }

    pub fn label(self, at: &NaiveDateTime) -> String {
        match self {
            ZoomLevel::Day | ZoomLevel::Week => at.format("%b %d").to_string(),
            ZoomLevel::Month => at.format("%b %Y").to_string(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ZoomLevel::Day => "day",
            ZoomLevel::Week => "week",
            ZoomLevel::Month => "month",
        }
    }
}

impl fmt::Display for ZoomLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AxisTick {
    pub date: String,
    pub label: String,
    pub position: usize,
}

/// Everything a Gantt view needs, ready for JSON encoding.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GanttPayload {
    pub items: Vec<TimelineItem>,
    pub date_axis: Vec<AxisTick>,
    pub min_date: String,
    pub max_date: String,
    pub zoom_level: ZoomLevel,
}

/// Ticks from `range.min()` every `zoom.step_days()` while still within
/// `range.max()`.
pub fn build_axis(range: &DateRange, zoom: ZoomLevel) -> Vec<AxisTick> {
    let step = TimeDelta::days(zoom.step_days());
    let expected = range.total_days() / zoom.step_days() + 1;
    let mut axis = Vec::with_capacity(usize::try_from(expected).unwrap_or(0));

    let mut current = Some(range.min());
    while let Some(at) = current.filter(|at| *at <= range.max()) {
        axis.push(AxisTick {
            date: format_iso(&at),
            label: zoom.label(&at),
            position: axis.len(),
        });
        current = at.checked_add_signed(step);
    }

    axis
}

#[tracing::instrument(skip(items), fields(items = items.len()))]
pub fn build_gantt(items: Vec<TimelineItem>, range: DateRange) -> GanttPayload {
    let total_days = range.total_days();
    let zoom = ZoomLevel::for_span(total_days);
    let date_axis = build_axis(&range, zoom);

    debug!(total_days, zoom = %zoom, ticks = date_axis.len(), "built gantt axis");

    GanttPayload {
        items,
        date_axis,
        min_date: format_iso(&range.min()),
        max_date: format_iso(&range.max()),
        zoom_level: zoom,
    }
}
