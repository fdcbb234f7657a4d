use chrono::NaiveDateTime;
use tracing::info;

use crate::filter::{ItemFilter, TimelineQuery};
use crate::gantt::{GanttPayload, build_gantt};
use crate::model::Project;
use crate::range::{DEFAULT_PADDING_DAYS, compute_date_range};
use crate::timeline::{TimelineItem, dashboard_items, project_items};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineOptions {
    pub padding_days: u32,
}

impl Default for TimelineOptions {
    fn default() -> Self {
        Self {
            padding_days: DEFAULT_PADDING_DAYS,
        }
    }
}

/// Gantt payload for the whole board.
#[tracing::instrument(skip(projects, query, now), fields(projects = projects.len()))]
pub fn dashboard_gantt(
    projects: &[Project],
    query: &TimelineQuery,
    options: TimelineOptions,
    now: NaiveDateTime,
) -> GanttPayload {
    finish(dashboard_items(projects, now), query, options, now)
}

/// Gantt payload for one project: its reference bar plus its goals.
#[tracing::instrument(skip(project, query, now), fields(project = project.id))]
pub fn project_gantt(
    project: &Project,
    query: &TimelineQuery,
    options: TimelineOptions,
    now: NaiveDateTime,
) -> GanttPayload {
    finish(project_items(project, now), query, options, now)
}

fn finish(
    items: Vec<TimelineItem>,
    query: &TimelineQuery,
    options: TimelineOptions,
    now: NaiveDateTime,
) -> GanttPayload {
    let filter = ItemFilter::from_query(query, now);
    let items = filter.apply(items);
    let range = compute_date_range(&items, options.padding_days, filter.explicit_range(), now);
    let payload = build_gantt(items, range);

    info!(
        items = payload.items.len(),
        ticks = payload.date_axis.len(),
        zoom = %payload.zoom_level,
        "prepared gantt payload"
    );
    payload
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::*;
    use crate::gantt::ZoomLevel;
    use crate::model::Goal;
    use crate::timeline::ItemKind;

    fn ts(month: u32, day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, month, day)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("valid date")
    }

    fn board() -> Vec<Project> {
        let mut first = Project::new(1, "Website", ts(1, 1));
        first.completed_at = Some(ts(1, 20));
        first.goals = vec![Goal::new(10, 1, "Wireframes", ts(1, 2))];
        let mut second = Project::new(2, "Marketing", ts(1, 5));
        second.completed_at = Some(ts(1, 6));
        vec![first, second]
    }

    #[test]
    fn dashboard_pads_scanned_range() {
        let payload = dashboard_gantt(&board(), &TimelineQuery::default(), TimelineOptions::default(), ts(3, 1));
        assert_eq!(payload.items.len(), 3);
        assert_eq!(payload.min_date, "2023-12-25T00:00:00");
        assert_eq!(payload.max_date, "2024-01-27T00:00:00");
        assert_eq!(payload.zoom_level, ZoomLevel::Week);
    }

    #[test]
    fn explicit_query_window_is_not_padded() {
        let query = TimelineQuery {
            start_date: Some("2024-01-01".to_string()),
            end_date: Some("2024-01-10".to_string()),
            ..TimelineQuery::default()
        };
        let payload = dashboard_gantt(&board(), &query, TimelineOptions::default(), ts(3, 1));
        assert_eq!(payload.min_date, "2024-01-01T00:00:00");
        assert_eq!(payload.max_date, "2024-01-10T00:00:00");
        assert_eq!(payload.zoom_level, ZoomLevel::Day);
        assert_eq!(payload.date_axis.len(), 10);
    }

    #[test]
    fn project_view_filters_by_kind() {
        let projects = board();
        let query = TimelineQuery {
            kind: Some("goal".to_string()),
            ..TimelineQuery::default()
        };
        let payload = project_gantt(&projects[0], &query, TimelineOptions { padding_days: 0 }, ts(3, 1));
        assert_eq!(payload.items.len(), 1);
        assert_eq!(payload.items[0].kind, ItemKind::Goal);
        // open goal: start doubles as the end of the scan
        assert_eq!(payload.min_date, payload.max_date);
        assert_eq!(payload.date_axis.len(), 1);
    }
}
