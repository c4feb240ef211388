use crate::emotion::Decision;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

const LOG_TARGET: &str = "history";

#[derive(thiserror::Error, Debug)]
pub enum HistoryError {
    #[error("history io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode history: {0}")]
    Encode(#[from] serde_json::Error),
}

/// How a logged mood was obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Facial,
    /// No face was seen; the spoken sentence decided alone.
    Voice,
    FacialVoice,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Facial => "facial",
            Method::Voice => "voice",
            Method::FacialVoice => "facial+voice",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the history file.
///
/// `mood` and `method` stay free-form so files written by other tools load.
/// Timestamps are written as RFC 3339; naive local timestamps without an
/// offset (`2024-03-10T12:00:00.123456`) are read as local time.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MoodRecord {
    #[serde(deserialize_with = "local_timestamp")]
    pub timestamp: DateTime<Local>,
    pub mood: String,
    pub confidence: f32,
    pub method: String,
    #[serde(default)]
    pub notes: String,
}

impl MoodRecord {
    pub fn new(decision: &Decision, method: Method, notes: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            mood: decision.emotion().to_string(),
            confidence: decision.confidence(),
            method: method.to_string(),
            notes: notes.into(),
        }
    }
}

fn local_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Local>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Local>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Local));
    }
    let naive: NaiveDateTime = raw.parse().ok()?;
    // A wall-clock time skipped by a DST change is taken as UTC.
    Some(
        Local
            .from_local_datetime(&naive)
            .earliest()
            .unwrap_or_else(|| Local.from_utc_datetime(&naive)),
    )
}

/// Append-only mood history persisted as a JSON array.
#[derive(Debug)]
pub struct MoodLogger {
    path: PathBuf,
    history: Vec<MoodRecord>,
}

impl MoodLogger {
    /// Loads `path`. A missing file starts an empty history. A file that
    /// cannot be parsed is moved aside to `<path>.bak` and an empty history
    /// starts in its place, so the next save never overwrites it.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, HistoryError> {
        let path = path.into();
        let history = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(history) => history,
                Err(e) => {
                    let backup = backup_path(&path);
                    std::fs::rename(&path, &backup).map_err(|source| HistoryError::Io {
                        path: path.clone(),
                        source,
                    })?;
                    tracing::warn!(
                        target: LOG_TARGET,
                        path = %path.display(),
                        backup = %backup.display(),
                        error = %e,
                        "history file is unreadable, moved aside and starting fresh"
                    );
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(source) => return Err(HistoryError::Io { path, source }),
        };
        Ok(Self { path, history })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Adds `record` and rewrites the file. On a failed write the in-memory
    /// history is left as it was.
    pub fn append(&mut self, record: MoodRecord) -> Result<(), HistoryError> {
        self.history.push(record);
        if let Err(e) = self.save() {
            self.history.pop();
            return Err(e);
        }
        Ok(())
    }

    pub fn log_mood(
        &mut self,
        decision: &Decision,
        method: Method,
        notes: impl Into<String>,
    ) -> Result<(), HistoryError> {
        self.append(MoodRecord::new(decision, method, notes))?;
        tracing::info!(
            target: LOG_TARGET,
            mood = %decision.emotion(),
            confidence = decision.confidence(),
            %method,
            "mood logged"
        );
        Ok(())
    }

    fn save(&self) -> Result<(), HistoryError> {
        let encoded = serde_json::to_string_pretty(&self.history)?;
        std::fs::write(&self.path, encoded).map_err(|source| HistoryError::Io {
            path: self.path.clone(),
            source,
        })
    }

    /// The last `count` entries, oldest first.
    pub fn recent(&self, count: usize) -> &[MoodRecord] {
        let start = self.history.len().saturating_sub(count);
        &self.history[start..]
    }

    /// Entry count per mood, most frequent first.
    pub fn summary(&self) -> Vec<(String, usize)> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for entry in &self.history {
            *counts.entry(entry.mood.as_str()).or_default() += 1;
        }
        let mut summary: Vec<(String, usize)> = counts
            .into_iter()
            .map(|(mood, n)| (mood.to_owned(), n))
            .collect();
        summary.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        summary
    }

    pub fn on_day(&self, day: NaiveDate) -> Vec<&MoodRecord> {
        self.history
            .iter()
            .filter(|entry| entry.timestamp.date_naive() == day)
            .collect()
    }

    pub fn today(&self) -> Vec<&MoodRecord> {
        self.on_day(Local::now().date_naive())
    }
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".bak");
    PathBuf::from(name)
}
