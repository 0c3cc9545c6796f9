use clap::{Parser, Subcommand};
use planner_core::calendar::CalendarView;
use planner_core::model::TaskId;
use time::macros::format_description;
use time::{Date, Time};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Plan a new task
    ///
    /// Example: planner add "Math 101" --date 2026-10-20 --start 10:00 --end 11:00
    Add {
        title: Option<String>,
        #[arg(long, value_name = "YYYY-MM-DD", value_parser = parse_date)]
        date: Date,
        #[arg(long, value_name = "HH:MM", value_parser = parse_clock)]
        start: Time,
        #[arg(long, value_name = "HH:MM", value_parser = parse_clock)]
        end: Time,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Edit a task; only the given fields change
    ///
    /// Example: planner edit 1 --title "Math 102" --end 11:30
    Edit {
        id: TaskId,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, value_name = "YYYY-MM-DD", value_parser = parse_date)]
        date: Option<Date>,
        #[arg(long, value_name = "HH:MM", value_parser = parse_clock)]
        start: Option<Time>,
        #[arg(long, value_name = "HH:MM", value_parser = parse_clock)]
        end: Option<Time>,
    },
    /// Delete a task
    ///
    /// Example: planner delete 1
    Delete { id: TaskId },
    /// Show details of a task
    ///
    /// Example: planner show 1
    Show { id: TaskId },
    /// List upcoming tasks, soonest due first
    ///
    /// Example: planner list
    List,
    /// Fuzzy search task titles
    ///
    /// Example: planner search math
    Search { query: String },
    /// Show the tasks visible in a calendar view
    ///
    /// Example: planner calendar --view month
    /// Example: planner calendar --date 2026-10-20 --shift -1
    Calendar {
        #[arg(long, value_name = "week|day|month", value_parser = parse_view)]
        view: Option<CalendarView>,
        #[arg(long, value_name = "YYYY-MM-DD", value_parser = parse_date)]
        date: Option<Date>,
        /// Move this many views forward (negative goes back)
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        shift: i32,
    },
}

pub fn parse_date(raw: &str) -> Result<Date, String> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]"))
        .map_err(|_| format!("invalid date '{raw}', expected YYYY-MM-DD"))
}

pub fn parse_clock(raw: &str) -> Result<Time, String> {
    Time::parse(raw.trim(), format_description!("[hour]:[minute]"))
        .map_err(|_| format!("invalid time '{raw}', expected HH:MM"))
}

pub fn parse_view(raw: &str) -> Result<CalendarView, String> {
    CalendarView::parse(raw).ok_or_else(|| format!("unknown view '{raw}'"))
}

/// Flag name used to identify config override arguments by the runtime.
pub const CONFIG_OVERRIDE_FLAG: &str = "--config-override";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOverrideTarget {
    Theme,
    DefaultColor,
    DefaultStatus,
    CalendarView,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConfigOverride {
    pub target: ConfigOverrideTarget,
    pub value: String,
}

/// Parse a raw `KEY=VALUE` override string into a structured target.
pub fn parse_config_override(raw: &str) -> Result<ParsedConfigOverride, String> {
    let trimmed = raw.trim();
    let (key_raw, value_raw) = trimmed
        .split_once('=')
        .ok_or_else(|| "override must be in KEY=VALUE format".to_string())?;

    let value = value_raw.trim().to_string();
    let field =
        canonicalize_flag_name(key_raw).ok_or_else(|| "override key cannot be empty".to_string())?;

    let target = match field.as_str() {
        "theme" => ConfigOverrideTarget::Theme,
        "default_color" | "color" => ConfigOverrideTarget::DefaultColor,
        "default_status" | "status" => ConfigOverrideTarget::DefaultStatus,
        "calendar_view" | "view" => {
            parse_view(&value)?;
            ConfigOverrideTarget::CalendarView
        }
        other => return Err(format!("unknown config field '{other}'")),
    };

    Ok(ParsedConfigOverride { target, value })
}

fn canonicalize_flag_name(name: &str) -> Option<String> {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
