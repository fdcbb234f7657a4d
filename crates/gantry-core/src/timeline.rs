use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::debug;

use crate::datetime::iso_date_serde;
use crate::model::{Goal, Project, Status};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Project,
    Goal,
}

impl ItemKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemKind::Project => "project",
            ItemKind::Goal => "goal",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "project" => Ok(ItemKind::Project),
            "goal" => Ok(ItemKind::Goal),
            other => Err(anyhow!("unknown item type: {other}")),
        }
    }
}

/// One bar on the Gantt chart, either a project or one of its goals.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TimelineItem {
    pub id: u64,

    pub name: String,

    #[serde(rename = "type")]
    pub kind: ItemKind,

    #[serde(with = "iso_date_serde")]
    pub start_date: Option<NaiveDateTime>,

    #[serde(with = "iso_date_serde")]
    pub end_date: Option<NaiveDateTime>,

    pub status: Status,

    pub category_color: String,

    /// Owning project; `None` on project bars.
    pub project_id: Option<u64>,

    pub duration_days: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal_count: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,

    #[serde(skip_serializing_if = "Option::is_none", with = "iso_date_serde")]
    pub deadline: Option<NaiveDateTime>,
}

/// The entity a timeline item is projected from.
#[derive(Debug, Clone, Copy)]
pub enum TimelineSource<'a> {
    Project(&'a Project),
    Goal { goal: &'a Goal, project: &'a Project },
}

impl TimelineSource<'_> {
    /// Open projects run until `now`; open goals stay open-ended.
    pub fn project(&self, now: NaiveDateTime) -> TimelineItem {
        match *self {
            TimelineSource::Project(project) => {
                let start_date = project.created_at;
                let end_date = Some(project.completed_at.unwrap_or(now));
                TimelineItem {
                    id: project.id,
                    name: project.title.clone(),
                    kind: ItemKind::Project,
                    start_date,
                    end_date,
                    status: project.status,
                    category_color: project.category_color().to_string(),
                    project_id: None,
                    duration_days: duration_days(start_date, end_date, now),
                    goal_count: Some(project.goals.len()),
                    progress: Some(project.progress()),
                    deadline: project.deadline,
                }
            }
            TimelineSource::Goal { goal, project } => {
                let start_date = goal.created_at;
                let end_date = goal.completed_at;
                TimelineItem {
                    id: goal.id,
                    name: goal.title.clone(),
                    kind: ItemKind::Goal,
                    start_date,
                    end_date,
                    status: goal.status,
                    category_color: project.category_color().to_string(),
                    project_id: Some(goal.project_id),
                    duration_days: duration_days(start_date, end_date, now),
                    goal_count: None,
                    progress: None,
                    deadline: goal.deadline,
                }
            }
        }
    }
}

fn duration_days(start: Option<NaiveDateTime>, end: Option<NaiveDateTime>, now: NaiveDateTime) -> u64 {
    let Some(start) = start else {
        return 0;
    };
    let end = end.unwrap_or(now);
    u64::try_from((end - start).num_days()).unwrap_or(0)
}

fn push_project(items: &mut Vec<TimelineItem>, project: &Project, now: NaiveDateTime) {
    items.push(TimelineSource::Project(project).project(now));
    items.extend(
        project
            .goals
            .iter()
            .map(|goal| TimelineSource::Goal { goal, project }.project(now)),
    );
}

/// Every project followed immediately by its goals, in caller order.
#[tracing::instrument(skip_all, fields(projects = projects.len()))]
pub fn dashboard_items(projects: &[Project], now: NaiveDateTime) -> Vec<TimelineItem> {
    let mut items = Vec::with_capacity(projects.iter().map(|p| 1 + p.goals.len()).sum());
    for project in projects {
        push_project(&mut items, project, now);
    }
    debug!(count = items.len(), "projected dashboard timeline items");
    items
}

/// A single project's reference bar followed by its goals.
#[tracing::instrument(skip_all, fields(project = project.id))]
pub fn project_items(project: &Project, now: NaiveDateTime) -> Vec<TimelineItem> {
    let mut items = Vec::with_capacity(1 + project.goals.len());
    push_project(&mut items, project, now);
    debug!(count = items.len(), "projected project timeline items");
    items
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

    use super::*;
    use crate::model::Category;

    fn ts(month: u32, day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, month, day)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .expect("valid date")
    }

    fn project_with_goals(id: u64, goals: usize) -> Project {
        let mut project = Project::new(id, format!("project {id}"), ts(1, 1));
        project.goals = (0..goals as u64)
            .map(|n| Goal::new(id * 100 + n, id, format!("goal {n}"), ts(1, 2)))
            .collect();
        project
    }

    #[test]
    fn project_without_goals_yields_single_bar() {
        let now = ts(2, 1);
        let items = project_items(&project_with_goals(4, 0), now);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].kind, ItemKind::Project);
        assert_eq!(items[0].project_id, None);
        assert_eq!(items[0].goal_count, Some(0));
    }

    #[test]
    fn project_with_goals_puts_project_first() {
        let now = ts(2, 1);
        let items = project_items(&project_with_goals(4, 3), now);
        assert_eq!(items.len(), 4);
        assert_eq!(items[0].kind, ItemKind::Project);
        assert!(items[1..].iter().all(|item| item.kind == ItemKind::Goal && item.project_id == Some(4)));
    }

    #[test]
    fn dashboard_interleaves_goals_after_their_project() {
        let now = ts(2, 1);
        let projects = vec![project_with_goals(1, 2), project_with_goals(2, 0), project_with_goals(3, 1)];
        let order: Vec<(ItemKind, u64)> = dashboard_items(&projects, now)
            .into_iter()
            .map(|item| (item.kind, item.id))
            .collect();
        assert_eq!(
            order,
            vec![
                (ItemKind::Project, 1),
                (ItemKind::Goal, 100),
                (ItemKind::Goal, 101),
                (ItemKind::Project, 2),
                (ItemKind::Project, 3),
                (ItemKind::Goal, 300),
            ]
        );
    }

    #[test]
    fn open_project_runs_until_now_but_open_goal_stays_open() {
        let now = ts(1, 11) + TimeDelta::hours(5);
        let items = project_items(&project_with_goals(1, 1), now);
        assert_eq!(items[0].end_date, Some(now));
        assert_eq!(items[0].duration_days, 10);
        assert_eq!(items[1].end_date, None);
        assert_eq!(items[1].duration_days, 9);
    }

    #[test]
    fn completed_entities_end_at_completion() {
        let now = ts(6, 1);
        let mut project = project_with_goals(1, 1);
        project.completed_at = Some(ts(1, 20));
        project.goals[0].completed_at = Some(ts(1, 5));
        project.goals[0].status = Status::Completed;

        let items = project_items(&project, now);
        assert_eq!(items[0].end_date, Some(ts(1, 20)));
        assert_eq!(items[0].duration_days, 19);
        assert_eq!(items[0].progress, Some(100));
        assert_eq!(items[1].end_date, Some(ts(1, 5)));
        assert_eq!(items[1].duration_days, 3);
    }

    #[test]
    fn goals_inherit_category_color() {
        let now = ts(2, 1);
        let mut project = project_with_goals(1, 1);
        assert!(project_items(&project, now).iter().all(|item| item.category_color == "blue"));

        project.category = Some(Category {
            id: 1,
            name: "Health".to_string(),
            color: "green".to_string(),
        });
        assert!(project_items(&project, now).iter().all(|item| item.category_color == "green"));
    }

    #[test]
    fn missing_start_means_zero_duration() {
        let now = ts(2, 1);
        let mut project = project_with_goals(1, 1);
        project.created_at = None;
        project.goals[0].completed_at = Some(ts(1, 1));

        let items = project_items(&project, now);
        assert_eq!(items[0].start_date, None);
        assert_eq!(items[0].duration_days, 0);
        // completion before creation clamps instead of going negative
        assert_eq!(items[1].duration_days, 0);
    }

    #[test]
    fn serializes_with_type_tag_and_iso_dates() {
        let now = ts(2, 1);
        let items = project_items(&project_with_goals(1, 1), now);
        let json = serde_json::to_value(&items).expect("serialize items");
        assert_eq!(json[0]["type"], "project");
        assert_eq!(json[0]["start_date"], "2024-01-01T12:00:00");
        assert_eq!(json[0]["project_id"], serde_json::Value::Null);
        assert_eq!(json[1]["type"], "goal");
        assert_eq!(json[1]["end_date"], serde_json::Value::Null);
        assert_eq!(json[1]["status"], "Pending");
        assert!(json[1].get("goal_count").is_none());
    }
}
