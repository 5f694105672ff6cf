use crate::domain::{SessionId, SessionRecord};
use dirs::home_dir;
use serde::Deserialize;
use std::collections::HashSet;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

pub const ARCHIVE_ENV: &str = "CHATLOGS_ARCHIVE";
pub const STATE_DIR_ENV: &str = "CHATLOGS_STATE_DIR";

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct LoadWarningCount(usize);

impl From<usize> for LoadWarningCount {
    fn from(value: usize) -> Self {
        Self(value)
    }
}

impl LoadWarningCount {
    pub fn get(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Error)]
pub enum ResolveArchivePathError {
    #[error("home directory not found")]
    HomeDirNotFound,
}

#[derive(Debug, Error)]
pub enum LoadArchiveError {
    #[error("failed to read archive {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse archive {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Clone, Debug, Default)]
pub struct ArchiveLoad {
    pub records: Vec<SessionRecord>,
    pub warnings: LoadWarningCount,
    pub notice: Option<String>,
}

pub fn resolve_archive_path() -> Result<PathBuf, ResolveArchivePathError> {
    resolve_archive_path_from(std::env::var_os(ARCHIVE_ENV), home_dir())
}

pub fn resolve_state_dir() -> Result<PathBuf, ResolveArchivePathError> {
    resolve_state_dir_from(std::env::var_os(STATE_DIR_ENV), home_dir())
}

fn resolve_archive_path_from(
    override_path: Option<OsString>,
    home: Option<PathBuf>,
) -> Result<PathBuf, ResolveArchivePathError> {
    if let Some(path) = override_path.filter(|path| !path.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    let Some(home) = home else {
        return Err(ResolveArchivePathError::HomeDirNotFound);
    };
    Ok(home.join(".chatlogs").join("archive"))
}

fn resolve_state_dir_from(
    override_path: Option<OsString>,
    home: Option<PathBuf>,
) -> Result<PathBuf, ResolveArchivePathError> {
    if let Some(path) = override_path.filter(|path| !path.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    let Some(home) = home else {
        return Err(ResolveArchivePathError::HomeDirNotFound);
    };
    Ok(home.join(".chatlogs").join("state"))
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ArchiveDocument {
    Many(Vec<SessionRecord>),
    One(SessionRecord),
}

impl ArchiveDocument {
    fn into_records(self) -> Vec<SessionRecord> {
        match self {
            Self::Many(records) => records,
            Self::One(record) => vec![record],
        }
    }
}

/// Loads the archive at `path`, which may be a JSON document, a JSONL file, or a directory of
/// either. Record order follows the source: file order, then file-name order for directories.
///
/// Per-line and per-file failures inside a JSONL file or a directory count as warnings; only a
/// top-level file that cannot be read or parsed is an error. A missing path is an empty archive.
pub fn load_archive(path: &Path) -> Result<ArchiveLoad, LoadArchiveError> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "archive path does not exist");
        return Ok(ArchiveLoad {
            notice: Some(format!("Archive not found: {}", path.display())),
            ..ArchiveLoad::default()
        });
    }

    let mut warnings = 0usize;
    let mut records = Vec::new();

    if path.is_dir() {
        let walker = WalkDir::new(path)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) => {
                    tracing::warn!(%error, "skipping unreadable archive entry");
                    warnings += 1;
                    continue;
                }
            };
            if !entry.file_type().is_file() || !is_archive_file(entry.path()) {
                continue;
            }
            match load_archive_file(entry.path(), &mut warnings) {
                Ok(mut loaded) => records.append(&mut loaded),
                Err(error) => {
                    tracing::warn!(%error, "skipping archive file");
                    warnings += 1;
                }
            }
        }
    } else {
        records = load_archive_file(path, &mut warnings)?;
    }

    let duplicates = count_duplicate_ids(&records);
    if duplicates > 0 {
        tracing::warn!(duplicates, "archive contains duplicate session ids");
    }
    warnings += duplicates;

    tracing::info!(
        path = %path.display(),
        records = records.len(),
        warnings,
        "archive loaded"
    );

    Ok(ArchiveLoad {
        records,
        warnings: LoadWarningCount::from(warnings),
        notice: None,
    })
}

fn is_archive_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("json") | Some("jsonl")
    )
}

fn load_archive_file(
    path: &Path,
    warnings: &mut usize,
) -> Result<Vec<SessionRecord>, LoadArchiveError> {
    let read_error = |source: io::Error| LoadArchiveError::Read {
        path: path.display().to_string(),
        source,
    };

    if path.extension().and_then(|ext| ext.to_str()) == Some("jsonl") {
        let file = File::open(path).map_err(read_error)?;
        let reader = BufReader::new(file);
        let mut records = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line.map_err(read_error)?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<SessionRecord>(&line) {
                Ok(record) => records.push(record),
                Err(error) => {
                    tracing::warn!(
                        path = %path.display(),
                        line = index + 1,
                        %error,
                        "skipping malformed archive line"
                    );
                    *warnings += 1;
                }
            }
        }
        return Ok(records);
    }

    let raw = fs::read_to_string(path).map_err(read_error)?;
    let document: ArchiveDocument =
        serde_json::from_str(&raw).map_err(|source| LoadArchiveError::Parse {
            path: path.display().to_string(),
            source,
        })?;
    Ok(document.into_records())
}

fn count_duplicate_ids(records: &[SessionRecord]) -> usize {
    let mut seen: HashSet<&SessionId> = HashSet::new();
    records
        .iter()
        .filter(|record| !seen.insert(&record.id))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record_json(id: serde_json::Value, response: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "timestamp": "2026-10-19 09:00",
            "username": "trinity",
            "aiName": "CentralGPT",
            "userMessage": "hi",
            "aiResponse": response,
        })
    }

    #[test]
    fn loads_json_array_in_file_order() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("archive.json");
        let body = serde_json::json!([
            record_json(serde_json::json!(2), "second"),
            record_json(serde_json::json!(1), "first"),
        ]);
        fs::write(&path, body.to_string()).expect("write");

        let load = load_archive(&path).expect("load");
        let ids = load
            .records
            .iter()
            .map(|record| record.id.clone())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec![SessionId::Number(2), SessionId::Number(1)]);
        assert_eq!(load.warnings.get(), 0);
        assert!(load.notice.is_none());
    }

    #[test]
    fn jsonl_skips_blank_and_counts_malformed_lines() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("archive.jsonl");
        let lines = [
            record_json(serde_json::json!("a"), "one").to_string(),
            String::new(),
            "{not json".to_string(),
            record_json(serde_json::json!("b"), "```py\nprint(1)\n```").to_string(),
        ];
        fs::write(&path, lines.join("\n")).expect("write");

        let load = load_archive(&path).expect("load");
        assert_eq!(load.records.len(), 2);
        assert_eq!(load.records[1].ai_response, "```py\nprint(1)\n```");
        assert_eq!(load.warnings.get(), 1);
    }

    #[test]
    fn directory_loads_files_by_name_and_tolerates_bad_files() {
        let dir = tempdir().expect("tempdir");
        fs::write(
            dir.path().join("b.json"),
            record_json(serde_json::json!(2), "b").to_string(),
        )
        .expect("write b");
        fs::write(
            dir.path().join("a.jsonl"),
            record_json(serde_json::json!(1), "a").to_string(),
        )
        .expect("write a");
        fs::write(dir.path().join("c.json"), "[oops").expect("write c");
        fs::write(dir.path().join("notes.txt"), "ignored").expect("write txt");

        let load = load_archive(dir.path()).expect("load");
        let ids = load
            .records
            .iter()
            .map(|record| record.id.clone())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec![SessionId::Number(1), SessionId::Number(2)]);
        assert_eq!(load.warnings.get(), 1);
    }

    #[test]
    fn duplicate_ids_are_kept_and_flagged() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("archive.json");
        let body = serde_json::json!([
            record_json(serde_json::json!(5), "x"),
            record_json(serde_json::json!(5), "y"),
        ]);
        fs::write(&path, body.to_string()).expect("write");

        let load = load_archive(&path).expect("load");
        assert_eq!(load.records.len(), 2);
        assert_eq!(load.warnings.get(), 1);
    }

    #[test]
    fn missing_path_is_an_empty_archive_with_notice() {
        let dir = tempdir().expect("tempdir");
        let load = load_archive(&dir.path().join("nope.json")).expect("load");
        assert!(load.records.is_empty());
        assert!(load.notice.is_some());
    }

    #[test]
    fn malformed_top_level_file_is_an_error() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("archive.json");
        fs::write(&path, "{\"id\":").expect("write");
        assert!(matches!(
            load_archive(&path),
            Err(LoadArchiveError::Parse { .. })
        ));
    }

    #[test]
    fn env_override_wins_over_home() {
        let resolved = resolve_archive_path_from(
            Some(OsString::from("/data/logs.json")),
            Some(PathBuf::from("/home/u")),
        )
        .expect("resolve");
        assert_eq!(resolved, PathBuf::from("/data/logs.json"));

        let resolved =
            resolve_archive_path_from(None, Some(PathBuf::from("/home/u"))).expect("resolve");
        assert_eq!(resolved, PathBuf::from("/home/u/.chatlogs/archive"));

        assert!(matches!(
            resolve_state_dir_from(Some(OsString::new()), None),
            Err(ResolveArchivePathError::HomeDirNotFound)
        ));
    }
}
