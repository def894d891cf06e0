use std::io::Write;

use anyhow::{Context, anyhow};
use chrono::NaiveDate;
use tracing::{debug, info, instrument};

use crate::cli::Command;
use crate::config::Config;
use crate::datetime::{format_date, parse_due_expr};
use crate::render::{Renderer, short_id};
use crate::session::Session;
use crate::storage::KeyValueStore;
use crate::theme::Theme;

/// Runs one front-end command against `session`, writing user-facing output
/// to `out`. `today` is the local calendar date.
#[instrument(skip(session, cfg, renderer, out, command), fields(category = %session.category()))]
pub fn dispatch<S: KeyValueStore, W: Write>(
    session: &mut Session<S>,
    cfg: &Config,
    renderer: &Renderer,
    out: &mut W,
    today: NaiveDate,
    command: Command,
) -> anyhow::Result<()> {
    let today_str = format_date(today);

    match command {
        Command::Add {
            title,
            due,
            priority,
        } => {
            let due = parse_due_expr(&due, today)?;
            let task = session
                .add(&title.join(" "), &due, priority)
                .context("task not added")?;
            info!(id = %task.id, "task added");
            writeln!(out, "Added {} {} ({})", short_id(&task.id), task.title, task.due_date)?;
        }
        Command::Edit {
            id,
            title,
            due,
            priority,
        } => {
            let Some(id) = resolve_id(session, &id)? else {
                return not_found(out, &id);
            };
            let Some(draft) = session.open_edit(&id) else {
                return not_found(out, &id);
            };

            let due = match due {
                Some(expr) => parse_due_expr(&expr, today)?,
                None => draft.due_date,
            };
            let title = title.unwrap_or(draft.title);
            let priority = priority.unwrap_or(draft.priority);

            let result = session.save_edit(&title, &due, priority);
            session.cancel_edit();
            match result.context("task not updated")? {
                Some(task) => writeln!(
                    out,
                    "Updated {} {} ({}, {})",
                    short_id(&task.id),
                    task.title,
                    task.due_date,
                    task.priority
                )?,
                None => return not_found(out, &id),
            }
        }
        Command::Done { id } => set_done(session, out, &id, true)?,
        Command::Undo { id } => set_done(session, out, &id, false)?,
        Command::Delete { id } => {
            let Some(full) = resolve_id(session, &id)? else {
                return not_found(out, &id);
            };
            if session.remove(&full) {
                writeln!(out, "Deleted {}", short_id(&full))?;
            } else {
                not_found(out, &id)?;
            }
        }
        Command::List => {
            let board = session.board(&today_str);
            renderer.print_board(out, session.category(), &board)?;
        }
        Command::Suggest { filter } => {
            let suggestions = session.suggestions(&filter.join(" "));
            debug!(count = suggestions.len(), "title suggestions");
            renderer.print_suggestions(out, &suggestions)?;
        }
        Command::Tabs => {
            renderer.print_tabs(out, &cfg.tabs(), session.category())?;
        }
        Command::Theme { value } => {
            let theme = match value.as_deref().map(str::trim) {
                None | Some("") => session.theme(),
                Some(v) if v.eq_ignore_ascii_case("toggle") => session.toggle_theme(),
                Some(v) => {
                    let theme: Theme = v.parse()?;
                    session.set_theme(theme);
                    theme
                }
            };
            writeln!(out, "{theme}")?;
        }
    }

    Ok(())
}

fn set_done<S: KeyValueStore, W: Write>(
    session: &mut Session<S>,
    out: &mut W,
    id: &str,
    done: bool,
) -> anyhow::Result<()> {
    let Some(full) = resolve_id(session, id)? else {
        return not_found(out, id);
    };
    if session.set_done(&full, done) {
        let verb = if done { "Completed" } else { "Reopened" };
        writeln!(out, "{verb} {}", short_id(&full))?;
        Ok(())
    } else {
        not_found(out, id)
    }
}

fn not_found<W: Write>(out: &mut W, id: &str) -> anyhow::Result<()> {
    writeln!(out, "No task matches {id}")?;
    Ok(())
}

/// Exact id, or a prefix shared by exactly one task.
pub fn resolve_id<S: KeyValueStore>(
    session: &Session<S>,
    needle: &str,
) -> anyhow::Result<Option<String>> {
    let needle = needle.trim();
    if needle.is_empty() {
        return Ok(None);
    }
    if let Some(task) = session.task(needle) {
        return Ok(Some(task.id.clone()));
    }

    let matches: Vec<&str> = session
        .tasks()
        .iter()
        .filter(|t| t.id.starts_with(needle))
        .map(|t| t.id.as_str())
        .collect();

    match matches.as_slice() {
        [] => Ok(None),
        [only] => Ok(Some((*only).to_string())),
        many => Err(anyhow!(
            "id prefix {needle} is ambiguous ({} tasks match)",
            many.len()
        )),
    }
}
