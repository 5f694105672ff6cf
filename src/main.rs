mod app;
mod cli;
mod domain;
mod infra;
mod ui;

use crate::app::{AppCommand, AppData, AppEvent, AppModel};
use crate::cli::CliInvocation;
use crate::domain::find_record;
use crate::infra::{
    ArchiveLoad, LOG_FILTER_ENV, WatchSignal, init_file_logging, load_archive,
    resolve_archive_path, resolve_state_dir, watch_archive,
};
use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind};
use crossterm::terminal::size as terminal_size;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use crossterm::{ExecutableCommand, execute};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io::{self, Stdout, Write};
use std::path::PathBuf;
use std::sync::mpsc::channel;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Debug, Error)]
enum MainError {
    #[error(transparent)]
    App(#[from] crate::app::AppError),

    #[error(transparent)]
    Cli(#[from] crate::cli::CliRunError),
}

#[derive(Debug)]
enum ArchiveReloadSignal {
    Loaded {
        archive_path: PathBuf,
        result: Result<ArchiveLoad, String>,
    },
}

fn main() {
    if let Err(error) = run_main() {
        let mut err = io::stderr().lock();
        let _ = writeln!(err, "{error}");
        std::process::exit(1);
    }
}

fn run_main() -> Result<(), MainError> {
    let args = std::env::args().collect::<Vec<_>>();
    let invocation = match crate::cli::parse_invocation(&args) {
        Ok(invocation) => invocation,
        Err(error) => {
            let mut err = io::stderr().lock();
            let _ = writeln!(err, "{error}");
            let _ = writeln!(err);
            print_help();
            std::process::exit(2);
        }
    };

    match invocation {
        CliInvocation::PrintHelp => {
            print_help();
            Ok(())
        }
        CliInvocation::PrintVersion => {
            let mut out = io::stdout().lock();
            let _ = writeln!(out, "{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        CliInvocation::Tui { archive, open } => Ok(run_tui(archive, open)?),
        CliInvocation::Command(command) => {
            crate::cli::run(command)?;
            Ok(())
        }
    }
}

fn print_help() {
    let text = format!(
        "{name} - browse archived chat sessions\n\nUSAGE:\n  {name} [--archive PATH] [--open ID]   Start the TUI (optionally on one session)\n  {name} list [--archive PATH]          List archived sessions\n  {name} show ID [--archive PATH]       Print one session as plain text\n  {name} --help | --version\n\nARCHIVE:\n  A .json file (array of records), a .jsonl file (one record per line),\n  or a directory containing such files. Current: {archive}\n\nOUTPUT:\n  list: id<TAB>file_name<TAB>size<TAB>timestamp<TAB>username\n\nENV:\n  CHATLOGS_ARCHIVE     Override the archive location (default: ~/.chatlogs/archive)\n  CHATLOGS_STATE_DIR   Override the state dir used for logs (default: ~/.chatlogs/state)\n  {log_env}         Log filter, e.g. debug or chatlogs=trace (default: info)\n",
        name = env!("CARGO_PKG_NAME"),
        archive = crate::cli::describe_archive(None),
        log_env = LOG_FILTER_ENV,
    );
    let mut out = io::stdout().lock();
    let _ = write!(out, "{text}");
}

fn run_tui(archive: Option<PathBuf>, open: Option<String>) -> Result<(), crate::app::AppError> {
    let archive_path = match archive {
        Some(path) => path,
        None => resolve_archive_path()?,
    };

    let (_log_guard, log_notice) = start_logging();
    tracing::info!(archive = %archive_path.display(), "starting");

    let load = load_archive(&archive_path)?;
    let notice = log_notice.or(load.notice.clone());
    let mut model = AppModel::new(AppData::from_load(archive_path, load)).with_notice(notice);

    if let Some(raw_id) = open {
        let record = find_record(&model.data.records, &raw_id).cloned();
        if record.is_none() {
            tracing::warn!(id = %raw_id, "requested session not in archive");
        }
        model = model
            .navigate(crate::app::Screen::ArchiveList)
            .open_session_detail(record);
    }

    let mut terminal = setup_terminal()?;
    if let Ok((width, height)) = terminal_size() {
        model = model.with_terminal_size(width, height);
    }
    let result = run(&mut terminal, &mut model);
    restore_terminal(&mut terminal)?;
    result
}

/// Logging failures never block the UI; they surface as a footer notice instead.
fn start_logging() -> (Option<WorkerGuard>, Option<String>) {
    let state_dir = match resolve_state_dir() {
        Ok(dir) => dir,
        Err(error) => return (None, Some(format!("Logging disabled: {error}"))),
    };
    match init_file_logging(&state_dir) {
        Ok(guard) => (Some(guard), None),
        Err(error) => (None, Some(format!("Logging disabled: {error}"))),
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>, app::AppError> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    let _ = stdout.execute(EnableMouseCapture);
    let backend = CrosstermBackend::new(stdout);
    Ok(Terminal::new(backend)?)
}

fn restore_terminal(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
) -> Result<(), app::AppError> {
    disable_raw_mode()?;
    let _ = execute!(terminal.backend_mut(), DisableMouseCapture);
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn run(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    model: &mut AppModel,
) -> Result<(), app::AppError> {
    let archive_watcher = match watch_archive(&model.data.archive_path) {
        Ok(watcher) => Some(watcher),
        Err(error) => {
            tracing::warn!(%error, "archive watcher unavailable");
            *model = model.with_appended_notice(format!(
                "Auto-reload disabled: {error} (Ctrl+R to reload)"
            ));
            None
        }
    };

    let (reload_tx, reload_rx) = channel::<ArchiveReloadSignal>();
    let mut reload_in_flight = false;
    let debounce = Duration::from_millis(900);
    let max_delay = Duration::from_secs(5);
    let mut pending_reload = false;
    let mut first_change_at: Option<Instant> = None;
    let mut reload_deadline: Option<Instant> = None;

    loop {
        while let Ok(signal) = reload_rx.try_recv() {
            match signal {
                ArchiveReloadSignal::Loaded {
                    archive_path,
                    result,
                } => {
                    reload_in_flight = false;
                    if archive_path != model.data.archive_path {
                        continue;
                    }
                    *model = apply_reload(model, archive_path, result);
                }
            }
        }

        if let Some(watcher) = &archive_watcher {
            while let Some(signal) = watcher.try_recv() {
                match signal {
                    WatchSignal::Changed => {
                        let now = Instant::now();
                        pending_reload = true;
                        reload_deadline = Some(now + debounce);
                        if first_change_at.is_none() {
                            first_change_at = Some(now);
                        }
                    }
                    WatchSignal::Error(message) => {
                        *model = model.with_notice(Some(format!("Watcher error: {message}")));
                    }
                }
            }
        }

        if pending_reload && !reload_in_flight {
            let now = Instant::now();
            let due_by_debounce = reload_deadline.is_some_and(|due| now >= due);
            let due_by_max_delay =
                first_change_at.is_some_and(|first| now.duration_since(first) >= max_delay);
            if due_by_debounce || due_by_max_delay {
                pending_reload = false;
                first_change_at = None;
                reload_deadline = None;
                reload_in_flight = true;
                let archive_path = model.data.archive_path.clone();
                let tx = reload_tx.clone();
                std::thread::spawn(move || {
                    let result = load_archive(&archive_path).map_err(|error| error.to_string());
                    let _ = tx.send(ArchiveReloadSignal::Loaded {
                        archive_path,
                        result,
                    });
                });
            }
        }

        ui::clamp_scroll_state(model);
        terminal.draw(|frame| ui::render(frame, model))?;

        if event::poll(Duration::from_millis(200))? {
            match event::read()? {
                Event::Key(key) => {
                    if key.kind == KeyEventKind::Release {
                        continue;
                    }
                    let (next, command) = app::update(model.clone(), AppEvent::Key(key));
                    if !dispatch(model, next, command) {
                        return Ok(());
                    }
                }
                Event::Mouse(mouse) => {
                    let (next, command) = app::update(model.clone(), AppEvent::Mouse(mouse));
                    if !dispatch(model, next, command) {
                        return Ok(());
                    }
                }
                Event::Resize(width, height) => {
                    *model = model.with_terminal_size(width, height);
                }
                _ => {}
            }
        }
    }
}

/// Stores the updated model and carries out its command. Returns `false` on quit.
fn dispatch(model: &mut AppModel, next: AppModel, command: AppCommand) -> bool {
    match command {
        AppCommand::Quit => {
            tracing::info!("quit");
            false
        }
        AppCommand::Reload => {
            let archive_path = next.data.archive_path.clone();
            let result = load_archive(&archive_path).map_err(|error| error.to_string());
            *model = apply_reload(&next, archive_path, result);
            true
        }
        other => {
            *model = app::apply_command(next, &other);
            true
        }
    }
}

fn apply_reload(
    model: &AppModel,
    archive_path: PathBuf,
    result: Result<ArchiveLoad, String>,
) -> AppModel {
    match result {
        Ok(load) => {
            tracing::info!(records = load.records.len(), "archive reloaded");
            let notice = load.notice.clone();
            model
                .with_data(AppData::from_load(archive_path, load))
                .with_notice(notice)
        }
        Err(error) => {
            tracing::warn!(%error, "archive reload failed");
            model.with_notice(Some(format!("Reload failed: {error}")))
        }
    }
}
