use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::datetime::iso_date_serde;

pub const DEFAULT_CATEGORY_COLOR: &str = "blue";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Status {
    Active,
    Completed,
    #[serde(rename = "On-Hold")]
    OnHold,
    Abandoned,
    Pending,
}

impl Status {
    pub const ALL: [Status; 5] = [
        Status::Active,
        Status::Completed,
        Status::OnHold,
        Status::Abandoned,
        Status::Pending,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Active => "Active",
            Status::Completed => "Completed",
            Status::OnHold => "On-Hold",
            Status::Abandoned => "Abandoned",
            Status::Pending => "Pending",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Status::ALL
            .into_iter()
            .find(|status| {
                status.as_str().eq_ignore_ascii_case(wanted)
                    || (*status == Status::OnHold && wanted.eq_ignore_ascii_case("onhold"))
            })
            .ok_or_else(|| anyhow!("unknown status: {s}"))
    }
}

fn default_project_status() -> Status {
    Status::Active
}

fn default_goal_status() -> Status {
    Status::Pending
}

fn default_color() -> String {
    DEFAULT_CATEGORY_COLOR.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub id: u64,
    pub name: String,
    /// Display tag, e.g. `blue` or `green`.
    #[serde(default = "default_color")]
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: u64,

    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default = "default_project_status")]
    pub status: Status,

    #[serde(default)]
    pub category_id: Option<u64>,

    #[serde(default)]
    pub order_index: i64,

    #[serde(default, with = "iso_date_serde")]
    pub created_at: Option<NaiveDateTime>,

    #[serde(default, with = "iso_date_serde")]
    pub completed_at: Option<NaiveDateTime>,

    #[serde(default, with = "iso_date_serde")]
    pub on_hold_at: Option<NaiveDateTime>,

    #[serde(default, with = "iso_date_serde")]
    pub abandoned_at: Option<NaiveDateTime>,

    #[serde(default, with = "iso_date_serde")]
    pub deadline: Option<NaiveDateTime>,

    /// Resolved from `category_id` by [`assemble_board`].
    #[serde(skip)]
    pub category: Option<Category>,

    /// Attached by [`assemble_board`].
    #[serde(skip)]
    pub goals: Vec<Goal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub id: u64,

    pub project_id: u64,

    pub title: String,

    #[serde(default = "default_goal_status")]
    pub status: Status,

    #[serde(default, with = "iso_date_serde")]
    pub created_at: Option<NaiveDateTime>,

    #[serde(default, with = "iso_date_serde")]
    pub completed_at: Option<NaiveDateTime>,

    #[serde(default, with = "iso_date_serde")]
    pub deadline: Option<NaiveDateTime>,
}

impl Project {
    pub fn new(id: u64, title: impl Into<String>, created_at: NaiveDateTime) -> Self {
        Self {
            id,
            title: title.into(),
            description: None,
            status: Status::Active,
            category_id: None,
            order_index: 0,
            created_at: Some(created_at),
            completed_at: None,
            on_hold_at: None,
            abandoned_at: None,
            deadline: None,
            category: None,
            goals: vec![],
        }
    }

    pub fn category_color(&self) -> &str {
        self.category
            .as_ref()
            .map(|category| category.color.as_str())
            .filter(|color| !color.trim().is_empty())
            .unwrap_or(DEFAULT_CATEGORY_COLOR)
    }

    /// Share of completed goals, floored to a whole percent.
    pub fn progress(&self) -> u8 {
        if self.goals.is_empty() {
            return 0;
        }
        let completed = self
            .goals
            .iter()
            .filter(|goal| goal.status == Status::Completed)
            .count();
        // completed <= len, so the quotient fits in 0..=100
        (completed * 100 / self.goals.len()) as u8
    }
}

impl Goal {
    pub fn new(id: u64, project_id: u64, title: impl Into<String>, created_at: NaiveDateTime) -> Self {
        Self {
            id,
            project_id,
            title: title.into(),
            status: Status::Pending,
            created_at: Some(created_at),
            completed_at: None,
            deadline: None,
        }
    }
}

/// Flat, storage-shaped view of a whole board.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoardDocument {
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub goals: Vec<Goal>,
}

/// Resolves categories and attaches goals to their projects. Projects are
/// stable-sorted by `order_index`; goals keep their input order.
#[tracing::instrument(skip_all, fields(projects = projects.len(), goals = goals.len()))]
pub fn assemble_board(categories: &[Category], mut projects: Vec<Project>, goals: Vec<Goal>) -> Vec<Project> {
    let by_id: HashMap<u64, &Category> = categories.iter().map(|c| (c.id, c)).collect();

    for project in &mut projects {
        project.goals.clear();
        project.category = project.category_id.and_then(|id| {
            let found = by_id.get(&id).map(|c| (*c).clone());
            if found.is_none() {
                warn!(project = project.id, category = id, "project references unknown category");
            }
            found
        });
    }

    let index: HashMap<u64, usize> = projects.iter().enumerate().map(|(idx, p)| (p.id, idx)).collect();
    for goal in goals {
        match index.get(&goal.project_id) {
            Some(&idx) => projects[idx].goals.push(goal),
            None => warn!(goal = goal.id, project = goal.project_id, "dropping goal of unknown project"),
        }
    }

    projects.sort_by_key(|project| project.order_index);
    projects
}
