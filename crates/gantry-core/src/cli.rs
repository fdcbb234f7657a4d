use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use chrono::{NaiveDateTime, Utc};
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::datetime::parse_timestamp;
use crate::filter::TimelineQuery;

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "gantry",
    version,
    about = "Gantry: project and goal board with a Gantt timeline",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    #[arg(long = "data")]
    pub data: Option<PathBuf>,

    /// Pin the current time (ISO-8601), e.g. for reproducible output.
    #[arg(long = "now")]
    pub now: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Gantt timeline of every project and goal.
    Timeline(ViewArgs),
    /// Gantt timeline of one project and its goals.
    Project {
        id: u64,
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Projects and goals that carry a deadline.
    Deadlines {
        #[arg(long)]
        json: bool,
    },
    /// List projects with category, status and progress.
    Projects,
    /// Replace the board with a JSON document of categories, projects and goals.
    Import { file: PathBuf },
    /// Print the board as a JSON document.
    Export,
    /// Show the effective configuration.
    Config,
}

impl Default for Command {
    fn default() -> Self {
        Command::Timeline(ViewArgs::default())
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct ViewArgs {
    #[command(flatten)]
    pub query: QueryArgs,

    /// Days of padding around the scanned date range.
    #[arg(long)]
    pub padding: Option<u32>,

    #[arg(long)]
    pub json: bool,
}

/// Query parameters, passed through as plain strings.
#[derive(Args, Debug, Clone, Default)]
pub struct QueryArgs {
    /// Comma-separated statuses, e.g. `Active,On-Hold`.
    #[arg(long)]
    pub status: Option<String>,

    /// `project` or `goal`.
    #[arg(long = "type")]
    pub kind: Option<String>,

    #[arg(long)]
    pub project_id: Option<String>,

    /// Keep items ending on or after this date.
    #[arg(long)]
    pub start_date: Option<String>,

    /// Keep items starting on or before this date.
    #[arg(long)]
    pub end_date: Option<String>,
}

impl From<QueryArgs> for TimelineQuery {
    fn from(args: QueryArgs) -> Self {
        Self {
            status: args.status,
            kind: args.kind,
            project_id: args.project_id,
            start_date: args.start_date,
            end_date: args.end_date,
        }
    }
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

/// The single "now" for this invocation: `--now` when given, else the clock.
pub fn resolve_now(pinned: Option<&str>) -> anyhow::Result<NaiveDateTime> {
    match pinned {
        Some(raw) => parse_timestamp(raw).ok_or_else(|| anyhow!("invalid --now timestamp: {raw}")),
        None => Ok(Utc::now().naive_utc()),
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn parses_timeline_query_flags_as_strings() {
        let cli = GlobalCli::parse_from([
            "gantry",
            "--rc",
            "timeline.padding_days=3",
            "timeline",
            "--status",
            "Active,Completed",
            "--type",
            "goal",
            "--project-id",
            "not-a-number",
            "--json",
        ]);
        assert_eq!(cli.rc_overrides.len(), 1);
        assert_eq!(cli.rc_overrides[0].key, "timeline.padding_days");

        let Some(Command::Timeline(view)) = cli.command else {
            panic!("expected timeline command");
        };
        assert!(view.json);
        let query = TimelineQuery::from(view.query);
        assert_eq!(query.kind.as_deref(), Some("goal"));
        assert_eq!(query.project_id.as_deref(), Some("not-a-number"));
        assert_eq!(query.status.as_deref(), Some("Active,Completed"));
    }

    #[test]
    fn parses_project_subcommand() {
        let cli = GlobalCli::parse_from(["gantry", "-vv", "project", "5", "--padding", "0"]);
        assert_eq!(cli.verbose, 2);
        let Some(Command::Project { id, view }) = cli.command else {
            panic!("expected project command");
        };
        assert_eq!(id, 5);
        assert_eq!(view.padding, Some(0));
    }

    #[test]
    fn negative_padding_is_rejected_by_the_parser() {
        assert!(GlobalCli::try_parse_from(["gantry", "timeline", "--padding", "-1"]).is_err());
    }

    #[test]
    fn pinned_now_must_parse() {
        let now = resolve_now(Some("2025-01-02T03:04:05Z")).expect("valid now");
        assert_eq!(now.to_string(), "2025-01-02 03:04:05");
        assert!(resolve_now(Some("whenever")).is_err());
    }
}
