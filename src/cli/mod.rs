use crate::domain::{SessionRecord, find_record};
use crate::infra::{LoadArchiveError, ResolveArchivePathError, load_archive, resolve_archive_path};
use crate::ui::{line_to_plain, session_detail_lines};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

const SHOW_WIDTH: usize = 60;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CliInvocation {
    PrintHelp,
    PrintVersion,
    Tui {
        archive: Option<PathBuf>,
        open: Option<String>,
    },
    Command(CliCommand),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CliCommand {
    List {
        archive: Option<PathBuf>,
    },
    Show {
        archive: Option<PathBuf>,
        id: String,
    },
}

#[derive(Debug, Error)]
pub enum CliParseError {
    #[error("unknown subcommand: {0}")]
    UnknownSubcommand(String),

    #[error("unknown flag: {0}")]
    UnknownFlag(String),

    #[error("missing value for flag: {0}")]
    MissingFlagValue(String),

    #[error("missing session id\nHint: run `chatlogs list` and copy the id column.")]
    MissingSessionId,

    #[error("unexpected argument: {0}")]
    UnexpectedArgument(String),
}

pub fn parse_invocation(args: &[String]) -> Result<CliInvocation, CliParseError> {
    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        return Ok(CliInvocation::PrintHelp);
    }
    if args.iter().any(|arg| arg == "--version" || arg == "-V") {
        return Ok(CliInvocation::PrintVersion);
    }

    let mut iter = args.iter().skip(1).peekable();
    let mut global_archive: Option<PathBuf> = None;
    let mut open: Option<String> = None;
    while let Some(arg) = iter.peek() {
        match arg.as_str() {
            "--archive" | "-a" => {
                let _ = iter.next();
                let value = iter
                    .next()
                    .ok_or_else(|| CliParseError::MissingFlagValue("--archive".to_string()))?;
                global_archive = Some(PathBuf::from(value));
            }
            "--open" | "-o" => {
                let _ = iter.next();
                let value = iter
                    .next()
                    .ok_or_else(|| CliParseError::MissingFlagValue("--open".to_string()))?;
                open = Some(value.to_string());
            }
            "--" => {
                let _ = iter.next();
                break;
            }
            _ => break,
        }
    }

    let Some(subcommand) = iter.next() else {
        return Ok(CliInvocation::Tui {
            archive: global_archive,
            open,
        });
    };

    if subcommand.starts_with('-') {
        return Err(CliParseError::UnknownFlag(subcommand.to_string()));
    }
    if open.is_some() {
        return Err(CliParseError::UnexpectedArgument(subcommand.to_string()));
    }

    match subcommand.as_str() {
        "list" => {
            let mut archive = global_archive;

            let mut args = iter;
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--archive" | "-a" => {
                        let value = args.next().ok_or_else(|| {
                            CliParseError::MissingFlagValue("--archive".to_string())
                        })?;
                        archive = Some(PathBuf::from(value));
                    }
                    _ if arg.starts_with('-') => {
                        return Err(CliParseError::UnknownFlag(arg.to_string()));
                    }
                    _ => {
                        return Err(CliParseError::UnexpectedArgument(arg.to_string()));
                    }
                }
            }

            Ok(CliInvocation::Command(CliCommand::List { archive }))
        }
        "show" => {
            let mut archive = global_archive;
            let mut id: Option<String> = None;

            let mut args = iter;
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--archive" | "-a" => {
                        let value = args.next().ok_or_else(|| {
                            CliParseError::MissingFlagValue("--archive".to_string())
                        })?;
                        archive = Some(PathBuf::from(value));
                    }
                    _ if arg.starts_with('-') => {
                        return Err(CliParseError::UnknownFlag(arg.to_string()));
                    }
                    _ if id.is_none() => {
                        id = Some(arg.to_string());
                    }
                    _ => {
                        return Err(CliParseError::UnexpectedArgument(arg.to_string()));
                    }
                }
            }

            let id = id.ok_or(CliParseError::MissingSessionId)?;
            Ok(CliInvocation::Command(CliCommand::Show { archive, id }))
        }
        other => Err(CliParseError::UnknownSubcommand(other.to_string())),
    }
}

#[derive(Debug, Error)]
pub enum CliRunError {
    #[error(transparent)]
    ResolveArchivePath(#[from] ResolveArchivePathError),

    #[error(transparent)]
    LoadArchive(#[from] LoadArchiveError),

    #[error("session not found: {0}\nHint: run `chatlogs list` and copy the id column.")]
    SessionNotFound(String),

    #[error(transparent)]
    WriteOutput(#[from] io::Error),
}

pub fn run(command: CliCommand) -> Result<(), CliRunError> {
    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    let stderr = io::stderr();
    let mut err = io::BufWriter::new(stderr.lock());

    match command {
        CliCommand::List { archive } => {
            let archive_path = archive_path_or_default(archive)?;
            let load = load_archive(&archive_path)?;
            for record in &load.records {
                let line = format!(
                    "{}\t{}\t{}\t{}\t{}",
                    record.id,
                    record.display_name(),
                    record.size_metric(),
                    record.timestamp,
                    record.username
                );
                if !write_line(&mut out, &line)? {
                    return Ok(());
                }
            }
            write_load_diagnostics(&mut err, load.notice.as_deref(), load.warnings.get())?;
            Ok(())
        }
        CliCommand::Show { archive, id } => {
            let archive_path = archive_path_or_default(archive)?;
            let load = load_archive(&archive_path)?;
            let Some(record) = find_record(&load.records, &id) else {
                write_load_diagnostics(&mut err, load.notice.as_deref(), load.warnings.get())?;
                return Err(CliRunError::SessionNotFound(id));
            };
            for text in show_lines(record) {
                if !write_line(&mut out, &text)? {
                    return Ok(());
                }
            }
            write_load_diagnostics(&mut err, load.notice.as_deref(), load.warnings.get())?;
            Ok(())
        }
    }
}

/// Plain-text detail view. Message and code lines are written exactly as rendered.
fn show_lines(record: &SessionRecord) -> Vec<String> {
    session_detail_lines(record, SHOW_WIDTH)
        .iter()
        .map(line_to_plain)
        .collect()
}

fn archive_path_or_default(archive: Option<PathBuf>) -> Result<PathBuf, ResolveArchivePathError> {
    match archive {
        Some(path) => Ok(path),
        None => resolve_archive_path(),
    }
}

fn write_load_diagnostics(
    err: &mut impl Write,
    notice: Option<&str>,
    warnings: usize,
) -> io::Result<()> {
    if let Some(notice) = notice {
        if !write_line(err, notice)? {
            return Ok(());
        }
    }
    if warnings > 0 {
        write_line(err, &format!("warnings: {warnings}"))?;
    }
    Ok(())
}

fn write_line(out: &mut impl Write, line: &str) -> io::Result<bool> {
    match writeln!(out, "{line}") {
        Ok(()) => Ok(true),
        Err(error) if error.kind() == io::ErrorKind::BrokenPipe => Ok(false),
        Err(error) => Err(error),
    }
}

/// Path shown in help text for the default archive location.
pub fn describe_archive(archive: Option<&Path>) -> String {
    match archive {
        Some(path) => path.display().to_string(),
        None => match resolve_archive_path() {
            Ok(path) => path.display().to_string(),
            Err(_) => "~/.chatlogs/archive".to_string(),
        },
    }
}
