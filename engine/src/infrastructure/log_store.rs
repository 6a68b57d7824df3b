//! Log store
//!
//! Per-unit log files under `<root>/<group>/<unit>/`. The live run is
//! `current.log`; archived runs are named after the UTC second they were
//! rotated out (`YYYY-MM-DD-HH-MM-SS.log`). Rotation happens when capture
//! restarts and when the live file reaches the size limit.

use crate::domain::constants::{CURRENT_RUN, RUN_ID_FORMAT, SEARCH_CONTEXT_LINES};
use crate::domain::{
    format_log_line, DomainError, LogEntry, LogRunInfo, LogStream, SearchMatch, UnitKey,
};
use chrono::{NaiveDateTime, TimeZone, Utc};
use regex::{Regex, RegexBuilder};
use std::collections::{HashMap, VecDeque};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, LineWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

const CURRENT_FILE: &str = "current.log";

struct ActiveLog {
    writer: LineWriter<File>,
}

pub struct LogStore {
    root: PathBuf,
    retention_runs: usize,
    max_file_size: u64,
    active: Mutex<HashMap<UnitKey, ActiveLog>>,
}

impl LogStore {
    pub fn new(root: impl Into<PathBuf>, retention_runs: usize, max_file_size: u64) -> Self {
        Self {
            root: root.into(),
            retention_runs,
            max_file_size,
            active: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn active(&self) -> MutexGuard<'_, HashMap<UnitKey, ActiveLog>> {
        self.active.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn unit_dir(&self, key: &UnitKey) -> PathBuf {
        self.root.join(&key.group_id).join(&key.unit_id)
    }

    pub fn current_path(&self, key: &UnitKey) -> PathBuf {
        self.unit_dir(key).join(CURRENT_FILE)
    }

    /// Archive any non-empty live log, open a fresh one and prune old runs
    pub fn start_capture(&self, key: &UnitKey) -> Result<(), DomainError> {
        let mut active = self.active();
        active.remove(key);
        let log = self.open_fresh(key)?;
        active.insert(key.clone(), log);
        debug!(unit = %key, "Log capture started");
        Ok(())
    }

    pub fn stop_capture(&self, key: &UnitKey) {
        if let Some(mut log) = self.active().remove(key) {
            if let Err(e) = log.writer.flush() {
                warn!(unit = %key, error = %e, "Failed to flush log on close");
            }
            debug!(unit = %key, "Log capture stopped");
        }
    }

    pub fn is_capturing(&self, key: &UnitKey) -> bool {
        self.active().contains_key(key)
    }

    /// Append one line, starting capture if needed and rotating on size
    pub fn write(&self, key: &UnitKey, content: &str, stream: LogStream) -> Result<(), DomainError> {
        let mut active = self.active();
        if !active.contains_key(key) {
            let log = self.open_fresh(key)?;
            active.insert(key.clone(), log);
        }

        let size = match active.get_mut(key) {
            Some(log) => {
                let content = content.trim_end_matches(['\r', '\n']);
                let line = format_log_line(Utc::now(), stream, content);
                log.writer.write_all(line.as_bytes())?;
                log.writer.get_ref().metadata()?.len()
            }
            None => return Ok(()),
        };

        if size >= self.max_file_size {
            info!(unit = %key, size = size, "Log reached size limit, rotating");
            active.remove(key);
            let log = self.open_fresh(key)?;
            active.insert(key.clone(), log);
        }
        Ok(())
    }

    fn open_fresh(&self, key: &UnitKey) -> Result<ActiveLog, DomainError> {
        let dir = self.unit_dir(key);
        fs::create_dir_all(&dir)?;
        self.archive_current(key)?;
        let file = File::create(dir.join(CURRENT_FILE))?;
        self.prune(key)?;
        Ok(ActiveLog {
            writer: LineWriter::new(file),
        })
    }

    fn archive_current(&self, key: &UnitKey) -> Result<(), DomainError> {
        let dir = self.unit_dir(key);
        let current = dir.join(CURRENT_FILE);
        let size = match fs::metadata(&current) {
            Ok(meta) => meta.len(),
            Err(_) => return Ok(()),
        };
        if size == 0 {
            return Ok(());
        }

        // Names have one-second resolution and must sort after every existing archive
        let mut at = Utc::now();
        if let Some(latest) = self.list_runs(key)?.first() {
            let next = latest.archived_at + chrono::Duration::seconds(1);
            if at < next {
                at = next;
            }
        }
        let target = dir.join(format!("{}.log", at.format(RUN_ID_FORMAT)));

        fs::rename(&current, &target)?;
        debug!(archive = %target.display(), size = size, "Archived log run");
        Ok(())
    }

    fn prune(&self, key: &UnitKey) -> Result<(), DomainError> {
        let runs = self.list_runs(key)?;
        for run in runs.iter().skip(self.retention_runs) {
            if let Err(e) = fs::remove_file(&run.file_path) {
                warn!(path = %run.file_path.display(), error = %e, "Failed to prune log run");
            } else {
                debug!(run = %run.run_id, "Pruned log run");
            }
        }
        Ok(())
    }

    /// Archived runs, newest first
    pub fn list_runs(&self, key: &UnitKey) -> Result<Vec<LogRunInfo>, DomainError> {
        let dir = self.unit_dir(key);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut runs = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("log") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if stem == CURRENT_RUN {
                continue;
            }
            let Some(archived_at) = parse_run_id(stem) else {
                continue;
            };
            runs.push(LogRunInfo {
                run_id: stem.to_string(),
                archived_at,
                file_size: entry.metadata()?.len(),
                file_path: path,
            });
        }

        runs.sort_by(|a, b| b.archived_at.cmp(&a.archived_at));
        Ok(runs)
    }

    fn run_path(&self, key: &UnitKey, run: &str) -> Result<Option<PathBuf>, DomainError> {
        if run == CURRENT_RUN {
            let path = self.current_path(key);
            return Ok(path.exists().then_some(path));
        }
        if parse_run_id(run).is_none() {
            return Err(DomainError::RunNotFound(run.to_string()));
        }
        let path = self.unit_dir(key).join(format!("{}.log", run));
        if !path.exists() {
            return Err(DomainError::RunNotFound(run.to_string()));
        }
        Ok(Some(path))
    }

    /// Last `max_lines` parsed lines of a run
    pub fn read(&self, key: &UnitKey, run: &str, max_lines: usize) -> Result<Vec<LogEntry>, DomainError> {
        let Some(path) = self.run_path(key, run)? else {
            return Ok(Vec::new());
        };
        if max_lines == 0 {
            return Ok(Vec::new());
        }

        // Only the retained raw lines are held; parsing happens once at the end
        let mut tail: VecDeque<(usize, Vec<u8>)> = VecDeque::with_capacity(max_lines.min(4096));
        let reader = BufReader::new(File::open(&path)?);
        for (index, chunk) in reader.split(b'\n').enumerate() {
            let chunk = chunk?;
            if tail.len() == max_lines {
                tail.pop_front();
            }
            tail.push_back((index + 1, chunk));
        }
        Ok(tail
            .into_iter()
            .map(|(line_number, raw)| LogEntry::parse(&decode_line(&raw), line_number))
            .collect())
    }

    /// Regex search over a whole run; invalid patterns are matched literally
    pub fn search(
        &self,
        key: &UnitKey,
        query: &str,
        run: &str,
        max_results: usize,
        case_sensitive: bool,
    ) -> Result<Vec<SearchMatch>, DomainError> {
        let Some(path) = self.run_path(key, run)? else {
            return Ok(Vec::new());
        };
        let pattern = compile_query(query, case_sensitive)?;
        let lines = read_lines(&path)?;

        let mut matches = Vec::new();
        for (index, line) in lines.iter().enumerate() {
            if matches.len() >= max_results {
                break;
            }
            if !pattern.is_match(line) {
                continue;
            }
            let before = index.saturating_sub(SEARCH_CONTEXT_LINES);
            let after = (index + 1 + SEARCH_CONTEXT_LINES).min(lines.len());
            matches.push(SearchMatch {
                line_number: index + 1,
                timestamp: LogEntry::parse(line, index + 1).timestamp,
                content: line.clone(),
                context_before: lines[before..index].to_vec(),
                context_after: lines[index + 1..after].to_vec(),
                run_id: run.to_string(),
            });
        }
        Ok(matches)
    }

    /// Drop every log of a group
    pub fn remove_group(&self, group_id: &str) -> Result<(), DomainError> {
        self.active().retain(|key, _| key.group_id != group_id);
        let dir = self.root.join(group_id);
        if dir.is_dir() {
            fs::remove_dir_all(&dir)?;
        }
        Ok(())
    }
}

fn compile_query(query: &str, case_sensitive: bool) -> Result<Regex, DomainError> {
    let build = |pattern: &str| {
        RegexBuilder::new(pattern)
            .case_insensitive(!case_sensitive)
            .build()
    };
    match build(query) {
        Ok(regex) => Ok(regex),
        Err(e) => {
            debug!(query = %query, error = %e, "Invalid regex, falling back to literal match");
            build(&regex::escape(query))
                .map_err(|e| DomainError::InvalidConfig(format!("search pattern: {}", e)))
        }
    }
}

fn parse_run_id(run: &str) -> Option<chrono::DateTime<Utc>> {
    NaiveDateTime::parse_from_str(run, RUN_ID_FORMAT)
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Lines with invalid UTF-8 replaced rather than rejected
fn read_lines(path: &Path) -> Result<Vec<String>, DomainError> {
    let reader = BufReader::new(File::open(path)?);
    let mut lines = Vec::new();
    for chunk in reader.split(b'\n') {
        lines.push(decode_line(&chunk?));
    }
    Ok(lines)
}

fn decode_line(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).trim_end_matches('\r').to_string()
}
