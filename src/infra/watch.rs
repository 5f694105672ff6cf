use notify::event::EventKind;
use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, channel};
use thiserror::Error;

#[derive(Clone, Debug)]
pub enum WatchSignal {
    Changed,
    Error(String),
}

#[derive(Debug)]
pub struct ArchiveWatcher {
    _watcher: RecommendedWatcher,
    rx: Receiver<WatchSignal>,
}

impl ArchiveWatcher {
    pub fn try_recv(&self) -> Option<WatchSignal> {
        self.rx.try_recv().ok()
    }
}

#[derive(Debug, Error)]
pub enum WatchArchiveError {
    #[error("watch error: {0}")]
    Notify(#[from] notify::Error),

    #[error("archive path has no parent directory: {0}")]
    NoParent(String),
}

/// Watches a directory archive recursively, or a single-file archive through its parent
/// directory (editors often replace the file instead of writing in place).
pub fn watch_archive(path: &Path) -> Result<ArchiveWatcher, WatchArchiveError> {
    let (tx, rx) = channel::<WatchSignal>();

    let (watch_root, mode, target) = if path.is_dir() {
        (path.to_path_buf(), RecursiveMode::Recursive, None)
    } else {
        let parent = match path.parent() {
            Some(parent) if parent.as_os_str().is_empty() => PathBuf::from("."),
            Some(parent) => parent.to_path_buf(),
            None => return Err(WatchArchiveError::NoParent(path.display().to_string())),
        };
        (
            parent,
            RecursiveMode::NonRecursive,
            Some(path.to_path_buf()),
        )
    };

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<notify::Event>| match res {
            Ok(event) => {
                if should_trigger_reload(&event, target.as_deref()) {
                    let _ = tx.send(WatchSignal::Changed);
                }
            }
            Err(error) => {
                let _ = tx.send(WatchSignal::Error(error.to_string()));
            }
        },
        Config::default(),
    )?;

    watcher.watch(&watch_root, mode)?;
    tracing::debug!(root = %watch_root.display(), "watching archive");

    Ok(ArchiveWatcher {
        _watcher: watcher,
        rx,
    })
}

fn should_trigger_reload(event: &notify::Event, target: Option<&Path>) -> bool {
    if matches!(event.kind, EventKind::Access(_)) {
        return false;
    }
    if event.paths.is_empty() {
        return true;
    }

    event.paths.iter().any(|path| match target {
        Some(target) => same_file_name(path, target),
        None => matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("json") | Some("jsonl")
        ),
    })
}

fn same_file_name(path: &Path, target: &Path) -> bool {
    let absolute = |p: &Path| -> PathBuf { p.canonicalize().unwrap_or_else(|_| p.to_path_buf()) };
    path == target
        || (path.file_name() == target.file_name()
            && path.parent().map(absolute) == target.parent().map(absolute))
}
