use std::io::{self, IsTerminal, Write};

use chrono::{NaiveDateTime, TimeDelta};
use serde::Serialize;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::datetime::parse_timestamp;
use crate::deadline::{DeadlineClass, DeadlineStatus};
use crate::gantt::GanttPayload;
use crate::model::Project;
use crate::timeline::{ItemKind, TimelineItem};

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

/// One line of the deadlines report.
#[derive(Debug, Clone, Serialize)]
pub struct DeadlineRow {
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub id: u64,
    pub name: String,
    pub project: String,
    #[serde(with = "crate::datetime::iso_date_serde")]
    pub deadline: Option<NaiveDateTime>,
    pub status: DeadlineStatus,
    /// Within the configured warning window.
    pub in_window: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> Self {
        Self {
            color: cfg.get_bool("color").unwrap_or(true),
        }
    }

    pub fn print_json<T: Serialize>(&mut self, value: &T) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        serde_json::to_writer_pretty(&mut out, value)?;
        writeln!(out)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, payload), fields(items = payload.items.len()))]
    pub fn print_gantt(&mut self, payload: &GanttPayload) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(
            out,
            "{} .. {}  zoom: {}  ticks: {}",
            payload.min_date,
            payload.max_date,
            payload.zoom_level,
            payload.date_axis.len()
        )?;
        if let (Some(first), Some(last)) = (payload.date_axis.first(), payload.date_axis.last()) {
            writeln!(out, "axis {} .. {}", first.label, last.label)?;
        }
        writeln!(out)?;

        let ticks: Vec<NaiveDateTime> = payload
            .date_axis
            .iter()
            .filter_map(|tick| parse_timestamp(&tick.date))
            .collect();
        let step = TimeDelta::days(payload.zoom_level.step_days());
        let axis_end = parse_timestamp(&payload.max_date);

        let headers = vec![
            "ID".to_string(),
            "Type".to_string(),
            "Name".to_string(),
            "Status".to_string(),
            "Start".to_string(),
            "End".to_string(),
            "Days".to_string(),
            "Timeline".to_string(),
        ];

        let rows = payload
            .items
            .iter()
            .map(|item| {
                let name = match item.kind {
                    ItemKind::Project => item.name.clone(),
                    ItemKind::Goal => format!("  {}", item.name),
                };
                vec![
                    self.paint(&item.id.to_string(), "33"),
                    item.kind.to_string(),
                    name,
                    item.status.to_string(),
                    short_date(item.start_date),
                    short_date(item.end_date),
                    item.duration_days.to_string(),
                    self.paint(&bar(item, &ticks, step, axis_end), color_code(&item.category_color)),
                ]
            })
            .collect();

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, projects))]
    pub fn print_projects(&mut self, projects: &[Project]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let headers = vec![
            "ID".to_string(),
            "Title".to_string(),
            "Category".to_string(),
            "Status".to_string(),
            "Progress".to_string(),
            "Goals".to_string(),
            "Created".to_string(),
        ];

        let rows = projects
            .iter()
            .map(|project| {
                vec![
                    self.paint(&project.id.to_string(), "33"),
                    project.title.clone(),
                    project
                        .category
                        .as_ref()
                        .map(|category| self.paint(&category.name, color_code(&category.color)))
                        .unwrap_or_default(),
                    project.status.to_string(),
                    format!("{}%", project.progress()),
                    project.goals.len().to_string(),
                    short_date(project.created_at),
                ]
            })
            .collect();

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, rows))]
    pub fn print_deadlines(&mut self, rows: &[DeadlineRow]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let headers = vec![
            "Type".to_string(),
            "ID".to_string(),
            "Name".to_string(),
            "Project".to_string(),
            "Deadline".to_string(),
            "Remaining".to_string(),
        ];

        let table = rows
            .iter()
            .map(|row| {
                let remaining = match row.status.css_class {
                    DeadlineClass::Overdue => self.paint(&row.status.display, "31"),
                    _ if row.in_window => self.paint(&row.status.display, "33"),
                    _ => row.status.display.clone(),
                };
                vec![
                    row.kind.to_string(),
                    row.id.to_string(),
                    row.name.clone(),
                    row.project.clone(),
                    row.status.date_formatted.clone(),
                    remaining,
                ]
            })
            .collect();

        write_table(&mut out, headers, table)?;
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || code.is_empty() || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn short_date(date: Option<NaiveDateTime>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
}

fn color_code(tag: &str) -> &'static str {
    match tag.to_ascii_lowercase().as_str() {
        "red" => "31",
        "green" => "32",
        "yellow" | "orange" => "33",
        "blue" => "34",
        "purple" | "magenta" => "35",
        "cyan" | "teal" => "36",
        _ => "",
    }
}

/// One cell per axis tick; filled where the item overlaps the tick's span.
/// Open-ended items run to the end of the axis.
fn bar(item: &TimelineItem, ticks: &[NaiveDateTime], step: TimeDelta, axis_end: Option<NaiveDateTime>) -> String {
    let Some(start) = item.start_date else {
        return " ".repeat(ticks.len());
    };
    let end = item.end_date.or(axis_end).unwrap_or(start);

    ticks
        .iter()
        .map(|tick| {
            let cell_end = tick.checked_add_signed(step).unwrap_or(*tick);
            if start < cell_end && end >= *tick { '█' } else { '·' }
        })
        .collect()
}

fn write_table<W: Write>(mut writer: W, headers: Vec<String>, rows: Vec<Vec<String>>) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

    use super::*;
    use crate::model::{Goal, Project};
    use crate::timeline::project_items;

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("valid date")
    }

    #[test]
    fn table_pads_by_visible_width() {
        let mut buf = Vec::new();
        write_table(
            &mut buf,
            vec!["A".to_string(), "B".to_string()],
            vec![vec!["\x1b[33m12\x1b[0m".to_string(), "█·".to_string()]],
        )
        .expect("write table");
        let text = String::from_utf8(buf).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "A  B  ");
        assert_eq!(lines[1], "-- -- ");
        assert_eq!(strip_ansi(lines[2]), "12 █· ");
    }

    #[test]
    fn color_follows_config_switch() {
        let mut cfg = Config::default();
        assert!(Renderer::new(&cfg).color);
        cfg.apply_overrides([("color".to_string(), "off".to_string())]);
        assert!(!Renderer::new(&cfg).color);
        cfg.apply_overrides([("color".to_string(), "Yes".to_string())]);
        assert!(Renderer::new(&cfg).color);
    }

    #[test]
    fn bar_marks_overlapping_ticks() {
        let ticks: Vec<NaiveDateTime> = (1..=6).map(ts).collect();
        let mut project = Project::new(1, "p", ts(2));
        project.completed_at = Some(ts(4));
        project.goals = vec![Goal::new(2, 1, "open", ts(5))];
        let items = project_items(&project, ts(10));

        let step = TimeDelta::days(1);
        assert_eq!(bar(&items[0], &ticks, step, Some(ts(6))), "·███··");
        assert_eq!(bar(&items[1], &ticks, step, Some(ts(6))), "····██");

        let mut dateless = items[1].clone();
        dateless.start_date = None;
        assert_eq!(bar(&dateless, &ticks, step, Some(ts(6))), "      ");
    }
}
