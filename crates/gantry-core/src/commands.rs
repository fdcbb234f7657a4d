use std::fs;
use std::path::Path;

use anyhow::{Context, anyhow};
use chrono::NaiveDateTime;
use tracing::{debug, info, instrument};

use crate::cli::{Command, ViewArgs, resolve_now};
use crate::config::Config;
use crate::datastore::DataStore;
use crate::deadline::{DEFAULT_WARNING_DAYS, deadline_status, is_approaching, is_overdue};
use crate::filter::TimelineQuery;
use crate::model::{BoardDocument, Project};
use crate::render::{DeadlineRow, Renderer};
use crate::timeline::ItemKind;
use crate::view::{TimelineOptions, dashboard_gantt, project_gantt};

#[instrument(skip(store, cfg, renderer, command))]
pub fn dispatch(
    store: &DataStore,
    cfg: &Config,
    renderer: &mut Renderer,
    command: Command,
    pinned_now: Option<&str>,
) -> anyhow::Result<()> {
    let now = resolve_now(pinned_now)?;
    debug!(%now, ?command, "dispatching");

    match command {
        Command::Timeline(view) => cmd_timeline(store, cfg, renderer, view, now),
        Command::Project { id, view } => cmd_project(store, cfg, renderer, id, view, now),
        Command::Deadlines { json } => cmd_deadlines(store, cfg, renderer, json, now),
        Command::Projects => cmd_projects(store, renderer),
        Command::Import { file } => cmd_import(store, &file),
        Command::Export => cmd_export(store, renderer),
        Command::Config => cmd_show(cfg),
    }
}

fn wants_json(cfg: &Config, flag: bool) -> bool {
    flag || cfg
        .get("output.format")
        .is_some_and(|format| format.eq_ignore_ascii_case("json"))
}

fn timeline_options(cfg: &Config, view: &ViewArgs) -> anyhow::Result<TimelineOptions> {
    let mut options = TimelineOptions::default();
    let padding = match view.padding {
        Some(days) => Some(days),
        None => cfg.get_u32("timeline.padding_days")?,
    };
    if let Some(padding_days) = padding {
        options.padding_days = padding_days;
    }
    Ok(options)
}

#[instrument(skip(store, cfg, renderer, view, now))]
fn cmd_timeline(
    store: &DataStore,
    cfg: &Config,
    renderer: &mut Renderer,
    view: ViewArgs,
    now: NaiveDateTime,
) -> anyhow::Result<()> {
    info!("command timeline");

    let options = timeline_options(cfg, &view)?;
    let json = wants_json(cfg, view.json);
    let query = TimelineQuery::from(view.query);

    let projects = store.load_board()?;
    let payload = dashboard_gantt(&projects, &query, options, now);

    if json {
        renderer.print_json(&payload)
    } else {
        renderer.print_gantt(&payload)
    }
}

#[instrument(skip(store, cfg, renderer, view, now))]
fn cmd_project(
    store: &DataStore,
    cfg: &Config,
    renderer: &mut Renderer,
    id: u64,
    view: ViewArgs,
    now: NaiveDateTime,
) -> anyhow::Result<()> {
    info!(id, "command project");

    let options = timeline_options(cfg, &view)?;
    let json = wants_json(cfg, view.json);
    let query = TimelineQuery::from(view.query);

    let projects = store.load_board()?;
    let project = projects
        .iter()
        .find(|project| project.id == id)
        .ok_or_else(|| anyhow!("project not found: {id}"))?;
    let payload = project_gantt(project, &query, options, now);

    if json {
        renderer.print_json(&payload)
    } else {
        renderer.print_gantt(&payload)
    }
}

#[instrument(skip(store, cfg, renderer, now))]
fn cmd_deadlines(
    store: &DataStore,
    cfg: &Config,
    renderer: &mut Renderer,
    json: bool,
    now: NaiveDateTime,
) -> anyhow::Result<()> {
    info!("command deadlines");

    let window_days = cfg
        .get_u32("deadline.warning_days")?
        .map_or(DEFAULT_WARNING_DAYS, i64::from);
    let projects = store.load_board()?;
    let rows = deadline_rows(&projects, now, window_days);
    debug!(rows = rows.len(), window_days, "collected deadlines");

    if wants_json(cfg, json) {
        renderer.print_json(&rows)
    } else {
        renderer.print_deadlines(&rows)
    }
}

/// Every dated deadline on the board, soonest first.
fn deadline_rows(projects: &[Project], now: NaiveDateTime, window_days: i64) -> Vec<DeadlineRow> {
    let mut rows = Vec::new();

    for project in projects {
        if let Some(status) = deadline_status(project.deadline, now) {
            rows.push(DeadlineRow {
                kind: ItemKind::Project,
                id: project.id,
                name: project.title.clone(),
                project: project.title.clone(),
                deadline: project.deadline,
                in_window: is_overdue(project.deadline, now) || is_approaching(project.deadline, now, window_days),
                status,
            });
        }

        for goal in &project.goals {
            if let Some(status) = deadline_status(goal.deadline, now) {
                rows.push(DeadlineRow {
                    kind: ItemKind::Goal,
                    id: goal.id,
                    name: goal.title.clone(),
                    project: project.title.clone(),
                    deadline: goal.deadline,
                    in_window: is_overdue(goal.deadline, now) || is_approaching(goal.deadline, now, window_days),
                    status,
                });
            }
        }
    }

    rows.sort_by_key(|row| row.deadline);
    rows
}

#[instrument(skip(store, renderer))]
fn cmd_projects(store: &DataStore, renderer: &mut Renderer) -> anyhow::Result<()> {
    info!("command projects");
    let projects = store.load_board()?;
    renderer.print_projects(&projects)
}

#[instrument(skip(store))]
fn cmd_import(store: &DataStore, file: &Path) -> anyhow::Result<()> {
    info!(file = %file.display(), "command import");

    let text = fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))?;
    if text.trim().is_empty() {
        return Err(anyhow!("import: empty input"));
    }

    let doc: BoardDocument =
        serde_json::from_str(&text).with_context(|| format!("failed to parse {}", file.display()))?;
    store.save_document(&doc)?;

    println!(
        "Imported {} categories, {} projects, {} goals.",
        doc.categories.len(),
        doc.projects.len(),
        doc.goals.len()
    );
    Ok(())
}

#[instrument(skip(store, renderer))]
fn cmd_export(store: &DataStore, renderer: &mut Renderer) -> anyhow::Result<()> {
    info!("command export");
    let doc = store.load_document()?;
    renderer.print_json(&doc)
}

fn cmd_show(cfg: &Config) -> anyhow::Result<()> {
    let mut entries: Vec<_> = cfg.iter().collect();
    entries.sort();
    for (k, v) in entries {
        println!("{k}={v}");
    }
    for path in &cfg.loaded_files {
        println!("# loaded {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::*;
    use crate::model::Goal;

    fn ts(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .and_then(|d| d.and_hms_opt(hour, 0, 0))
            .expect("valid date")
    }

    #[test]
    fn deadline_rows_sort_soonest_first_and_flag_window() {
        let now = ts(10, 12);
        let mut project = Project::new(1, "Launch", ts(1, 0));
        project.deadline = Some(ts(25, 0));
        let mut late = Goal::new(2, 1, "Copy", ts(2, 0));
        late.deadline = Some(ts(8, 0));
        let mut soon = Goal::new(3, 1, "Budget", ts(2, 0));
        soon.deadline = Some(ts(12, 0));
        project.goals = vec![late, soon, Goal::new(4, 1, "No deadline", ts(2, 0))];

        let rows = deadline_rows(&[project], now, 3);
        let ids: Vec<u64> = rows.iter().map(|row| row.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
        assert!(rows[0].in_window);
        assert!(rows[0].status.is_overdue);
        assert!(rows[1].in_window);
        assert!(!rows[2].in_window);
        assert_eq!(rows[1].project, "Launch");
    }

    #[test]
    fn json_output_follows_flag_or_config() {
        let mut cfg = Config::default();
        assert!(!wants_json(&cfg, false));
        assert!(wants_json(&cfg, true));
        cfg.apply_overrides([("output.format".to_string(), "JSON".to_string())]);
        assert!(wants_json(&cfg, false));
    }

    #[test]
    fn padding_flag_beats_config() {
        let mut cfg = Config::default();
        cfg.apply_overrides([("timeline.padding_days".to_string(), "2".to_string())]);
        let mut view = ViewArgs::default();
        assert_eq!(timeline_options(&cfg, &view).expect("options").padding_days, 2);
        view.padding = Some(0);
        assert_eq!(timeline_options(&cfg, &view).expect("options").padding_days, 0);

        cfg.apply_overrides([("timeline.padding_days".to_string(), "-1".to_string())]);
        view.padding = None;
        assert!(timeline_options(&cfg, &view).is_err());
    }
}
