use clap::{CommandFactory, Parser};
use planner_cli::cli::{CONFIG_OVERRIDE_FLAG, Cli, Command, ConfigOverrideTarget, parse_config_override};
use planner_core::calendar::{CalendarEvent, CalendarView, Navigate, Toolbar};
use planner_core::config::{
    Config, ConfigOverrides, Palette, load_config_with_fallback, merge_overrides, palette_for_theme,
};
use planner_core::error::AppError;
use planner_core::logging;
use planner_core::model::{Task, TaskId, format_timestamp};
use planner_core::notify::{Notice, NoticeKind, Notifier};
use planner_core::session::{InteractionState, SaveOutcome, TaskForm};
use planner_core::task_api::{self, TaskEdits};
use std::io::{self, BufRead};
use std::time::Instant;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use time::OffsetDateTime;
use time::macros::format_description;

/// Prints notices as they arrive. Success lines are skipped in JSON mode so
/// stdout stays parseable.
struct ConsoleNotifier<'a> {
    json: bool,
    palette: &'a Palette,
}

impl Notifier for ConsoleNotifier<'_> {
    fn notify(&self, notice: &Notice) -> Result<(), AppError> {
        match notice.kind {
            NoticeKind::Success if !self.json => {
                println!("{}", self.palette.accentize(&notice_line(notice)));
            }
            NoticeKind::Success => {}
            NoticeKind::Error => eprintln!("{}", notice_line(notice)),
        }
        Ok(())
    }
}

fn notice_line(notice: &Notice) -> String {
    match &notice.detail {
        Some(detail) => format!("{}: {}", notice.title, detail),
        None => notice.title.clone(),
    }
}

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "ID")]
    id: TaskId,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Start")]
    start: String,
    #[tabled(rename = "Due")]
    due: String,
}

fn display_time(value: OffsetDateTime) -> Result<String, AppError> {
    value
        .to_offset(task_api::local_offset())
        .format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
        .map_err(|err| AppError::invalid_data(err.to_string()))
}

fn or_dash(value: &str) -> String {
    if value.trim().is_empty() {
        "-".to_string()
    } else {
        value.to_string()
    }
}

fn print_tasks_table(tasks: &[Task], empty_message: &str) -> Result<(), AppError> {
    if tasks.is_empty() {
        println!("{empty_message}");
        return Ok(());
    }

    let mut rows = Vec::with_capacity(tasks.len());
    for task in tasks {
        rows.push(TaskRow {
            id: task.id,
            title: task.title.clone(),
            status: or_dash(&task.status),
            start: display_time(task.start_date)?,
            due: display_time(task.due_date)?,
        });
    }

    let mut table = Table::new(rows);
    table.with(Style::psql());
    println!("{table}");
    Ok(())
}

fn task_json(task: &Task) -> Result<serde_json::Value, AppError> {
    Ok(serde_json::json!({
        "id": task.id,
        "title": task.title,
        "description": task.description,
        "status": task.status,
        "color": task.color,
        "start_date": format_timestamp(task.start_date)?,
        "due_date": format_timestamp(task.due_date)?,
    }))
}

fn print_task_json(task: &Task) -> Result<(), AppError> {
    println!("{}", task_json(task)?);
    Ok(())
}

fn print_tasks_json(tasks: &[Task]) -> Result<(), AppError> {
    let payload = tasks.iter().map(task_json).collect::<Result<Vec<_>, _>>()?;
    println!("{}", serde_json::Value::Array(payload));
    Ok(())
}

fn print_task_plain(task: &Task) -> Result<(), AppError> {
    println!("ID: {}", task.id);
    println!("Title: {}", task.title);
    println!("Status: {}", or_dash(&task.status));
    println!("Color: {}", task.color);
    println!("Start: {}", display_time(task.start_date)?);
    println!("Due: {}", display_time(task.due_date)?);
    if !task.description.is_empty() {
        println!("Description: {}", task.description);
    }
    Ok(())
}

fn event_json(event: &CalendarEvent) -> Result<serde_json::Value, AppError> {
    Ok(serde_json::json!({
        "id": event.id,
        "title": event.title,
        "status": event.status,
        "color": event.color,
        "start": format_timestamp(event.start)?,
        "end": format_timestamp(event.end)?,
        "start_label": event.start_label,
        "end_label": event.end_label,
    }))
}

fn print_calendar(
    toolbar: &Toolbar,
    events: &[CalendarEvent],
    json: bool,
    palette: &Palette,
) -> Result<(), AppError> {
    if json {
        let payload = events.iter().map(event_json).collect::<Result<Vec<_>, _>>()?;
        println!(
            "{}",
            serde_json::json!({
                "view": toolbar.view.name(),
                "label": toolbar.label(),
                "events": payload,
            })
        );
        return Ok(());
    }

    println!(
        "{} {}",
        palette.accentize(&toolbar.label()),
        palette.mutedize(&format!("({} view)", toolbar.view.name()))
    );
    if events.is_empty() {
        println!("No tasks in this view");
    }
    for event in events {
        println!(
            "{} {} - {}  {} ({})",
            event.start.date(),
            event.start_label,
            event.end_label,
            event.title,
            event.id
        );
    }
    Ok(())
}

fn apply_overrides(base: &Config, raw: &[String]) -> Result<Config, AppError> {
    let mut overrides = ConfigOverrides::default();
    for entry in raw {
        let parsed = parse_config_override(entry)
            .map_err(|err| AppError::invalid_input(format!("{CONFIG_OVERRIDE_FLAG}: {err}")))?;
        match parsed.target {
            ConfigOverrideTarget::Theme => overrides.theme = Some(parsed.value),
            ConfigOverrideTarget::DefaultColor => overrides.default_color = Some(parsed.value),
            ConfigOverrideTarget::DefaultStatus => overrides.default_status = Some(parsed.value),
            ConfigOverrideTarget::CalendarView => {
                overrides.calendar_view = CalendarView::parse(&parsed.value);
            }
        }
    }
    Ok(merge_overrides(base, &overrides))
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::invalid_input(message)
}

fn split_command_line(line: &str) -> Result<Vec<String>, AppError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escape = false;

    for ch in line.chars() {
        if escape {
            if ch != '"' && ch != '\\' {
                current.push('\\');
            }
            current.push(ch);
            escape = false;
            continue;
        }

        if in_quotes && ch == '\\' {
            escape = true;
            continue;
        }

        if ch == '"' {
            in_quotes = !in_quotes;
            continue;
        }

        if ch.is_whitespace() && !in_quotes {
            if !current.is_empty() {
                args.push(std::mem::take(&mut current));
            }
            continue;
        }

        current.push(ch);
    }

    if in_quotes {
        return Err(AppError::invalid_input("unterminated quote in command"));
    }

    if !current.is_empty() {
        args.push(current);
    }

    Ok(args)
}

/// The session state behind `search` and `calendar`, created on first use
/// from the effective config.
fn interaction_for<'a>(
    slot: &'a mut Option<InteractionState>,
    config: &Config,
) -> &'a mut InteractionState {
    slot.get_or_insert_with(|| {
        InteractionState::new(
            Toolbar::new(config.view(), task_api::now().date()),
            config.search_debounce(),
        )
    })
}

/// Feeds `query` through the search box and waits out its debounce.
fn debounced_search(
    interaction: &mut InteractionState,
    query: &str,
) -> Result<Vec<Task>, AppError> {
    let typed_at = Instant::now();
    interaction.on_input_change(query, typed_at);

    let due = interaction.lookup_deadline().unwrap_or(typed_at);
    std::thread::sleep(due.saturating_duration_since(Instant::now()));

    let tasks = task_api::all_tasks()?;
    Ok(interaction.poll_search(&tasks, due).unwrap_or_default())
}

fn print_help() {
    let mut cmd = Cli::command();
    let help = cmd.render_help();
    println!("{help}");
}

/// Runs one parsed command. `interaction` carries the search box and the
/// calendar position between commands of an interactive session.
fn run_command(
    cli: Cli,
    base: &Config,
    interaction: &mut Option<InteractionState>,
) -> Result<(), AppError> {
    let config = apply_overrides(base, &cli.config_override)?;
    let palette = palette_for_theme(config.theme.as_deref());
    let notifier = ConsoleNotifier {
        json: cli.json,
        palette: &palette,
    };

    match cli.command {
        Command::Add {
            title,
            date,
            start,
            end,
            status,
            color,
            description,
        } => {
            let title = match title {
                Some(value) if !value.trim().is_empty() => value,
                _ => return Err(AppError::invalid_input("title is required")),
            };

            let mut form = TaskForm::new(title, date, start, end);
            form.status = status.unwrap_or_else(|| config.status().to_string());
            form.color = color.unwrap_or_else(|| config.color().to_string());
            form.description = description.unwrap_or_default();

            let draft = form.to_draft(task_api::local_offset())?;
            let task = task_api::add_task(&draft)?;
            if cli.json {
                print_task_json(&task)?;
            } else {
                println!("Added task: {} ({})", task.title, task.id);
            }
        }
        Command::Edit {
            id,
            title,
            status,
            color,
            description,
            date,
            start,
            end,
        } => {
            let edits = TaskEdits {
                title,
                description,
                status,
                color,
                date,
                start_time: start,
                end_time: end,
            };

            match task_api::edit_task(id, &edits, &notifier)? {
                SaveOutcome::Saved(task) if cli.json => print_task_json(&task)?,
                SaveOutcome::Saved(task) => {
                    println!("Updated task: {} ({})", task.title, task.id);
                }
                SaveOutcome::Unchanged if cli.json => {
                    println!("{}", serde_json::json!({ "id": id, "changed": false }));
                }
                SaveOutcome::Unchanged => println!("No changes to save"),
            }
        }
        Command::Delete { id } => {
            task_api::delete_task(id, &notifier)?;
            if cli.json {
                println!("{}", serde_json::json!({ "id": id, "deleted": true }));
            }
        }
        Command::Show { id } => {
            let task = task_api::get_task(id)?;
            if cli.json {
                print_task_json(&task)?;
            } else {
                print_task_plain(&task)?;
            }
        }
        Command::List => {
            let tasks = task_api::list_upcoming()?;
            if cli.json {
                print_tasks_json(&tasks)?;
            } else {
                print_tasks_table(&tasks, "No upcoming tasks")?;
            }
        }
        Command::Search { query } => {
            let tasks = debounced_search(interaction_for(interaction, &config), &query)?;
            if cli.json {
                print_tasks_json(&tasks)?;
            } else {
                print_tasks_table(&tasks, "No matching tasks")?;
            }
        }
        Command::Calendar { view, date, shift } => {
            let toolbar = &mut interaction_for(interaction, &config).toolbar;
            if let Some(view) = view {
                toolbar.set_view(view);
            }
            if let Some(date) = date {
                toolbar.date = date;
            }

            let step = if shift < 0 {
                Navigate::Previous
            } else {
                Navigate::Next
            };
            for _ in 0..shift.unsigned_abs() {
                toolbar.navigate(step)?;
            }

            let current = *toolbar;
            let events = task_api::calendar_events(&current)?;
            print_calendar(&current, &events, cli.json, &palette)?;
        }
    }

    Ok(())
}

fn run_interactive(config: &Config) -> Result<(), AppError> {
    let mut input = String::new();
    let stdin = io::stdin();
    let mut stdin_lock = stdin.lock();
    let mut interaction = None;

    loop {
        input.clear();
        let bytes = stdin_lock
            .read_line(&mut input)
            .map_err(|err| AppError::io(err.to_string()))?;

        if bytes == 0 {
            break;
        }

        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        if line == "help" || line == "?" {
            print_help();
            continue;
        }

        let args = match split_command_line(line) {
            Ok(args) => args,
            Err(err) => {
                eprintln!("ERROR: {}", err);
                continue;
            }
        };

        if args.is_empty() {
            continue;
        }

        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push("planner".to_string());
        argv.extend(args);

        let cli = match Cli::try_parse_from(argv) {
            Ok(cli) => cli,
            Err(err) => {
                eprintln!("ERROR: {}", normalize_parse_error(err));
                continue;
            }
        };

        if let Err(err) = run_command(cli, config, &mut interaction) {
            eprintln!("ERROR: {}", err);
        }
    }

    Ok(())
}

fn main() {
    if let Err(err) = logging::init_logging(&logging::level_from_env()) {
        eprintln!("WARN: {err}");
    }

    let loaded = load_config_with_fallback();
    if let Some(err) = &loaded.error {
        log::warn!(
            "event=config_load module=cli status=fallback error={}",
            err
        );
    }
    let config = loaded.config;

    let mut args = std::env::args_os();
    args.next();
    if args.next().is_none() {
        if let Err(err) = run_interactive(&config) {
            eprintln!("ERROR: {}", err);
            std::process::exit(1);
        }
        return;
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            if matches!(
                err.kind(),
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
            ) {
                let _ = err.print();
                return;
            }
            eprintln!("ERROR: {}", normalize_parse_error(err));
            std::process::exit(1);
        }
    };

    if let Err(err) = run_command(cli, &config, &mut None) {
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}
