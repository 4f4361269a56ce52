//! Past translations, newest first.
//!
//! Every successful translation is recorded with its languages, model and
//! skill. The list is capped at [`MAX_RECORDS`] and the whole list is
//! written to a JSON file after each change.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::paths;
use crate::translation::TranslationRequest;

/// Oldest records are dropped beyond this count.
pub const MAX_RECORDS: usize = 1000;

const HISTORY_FILE: &str = "history.json";

/// One source text and the translation it produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub source_text: String,
    pub translated_text: String,
    /// Language code, e.g. `English`.
    pub source_language: String,
    pub target_language: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub skill: String,
    /// Seconds since the Unix epoch.
    #[serde(default)]
    pub timestamp: u64,
}

impl HistoryRecord {
    /// A record for `request` whose translation and timestamp are filled in
    /// once the result arrives.
    pub fn for_request(request: &TranslationRequest, skill: &str) -> Self {
        Self {
            source_text: request.text.clone(),
            translated_text: String::new(),
            source_language: request.source_language.code.to_string(),
            target_language: request.target_language.code.to_string(),
            model: request.model.clone(),
            skill: skill.to_string(),
            timestamp: 0,
        }
    }

    pub fn recorded_at(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(self.timestamp)
    }
}

#[derive(Default, Serialize, Deserialize)]
struct HistoryFile {
    #[serde(default)]
    records: Vec<HistoryRecord>,
}

/// Translation history, optionally backed by a JSON file.
///
/// A file that is missing or unreadable on open yields an empty history.
/// Failed saves are logged and never interrupt a translation.
pub struct TranslationHistory {
    records: Mutex<VecDeque<HistoryRecord>>,
    path: Option<PathBuf>,
    clock: Arc<dyn Clock>,
}

impl TranslationHistory {
    /// Opens `history.json` in the data directory.
    pub fn new(clock: Arc<dyn Clock>) -> Result<Self> {
        Ok(Self::open(paths::data_dir()?.join(HISTORY_FILE), clock))
    }

    pub fn open(path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        let path = path.into();
        let mut records = match load(&path) {
            Ok(records) => {
                debug!(records = records.len(), path = %path.display(), "Loaded history");
                records
            }
            Err(e) => {
                warn!("Failed to load history, starting empty: {e:#}");
                VecDeque::new()
            }
        };
        records.truncate(MAX_RECORDS);

        Self {
            records: Mutex::new(records),
            path: Some(path),
            clock,
        }
    }

    pub fn in_memory(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: Mutex::new(VecDeque::new()),
            path: None,
            clock,
        }
    }

    /// Stamps `record` with the current time, puts it first and saves.
    pub fn add(&self, mut record: HistoryRecord) {
        record.timestamp = self
            .clock
            .now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |since| since.as_secs());

        let mut records = self.lock();
        info!(
            source = %record.source_language,
            target = %record.target_language,
            "Recorded translation"
        );
        records.push_front(record);
        records.truncate(MAX_RECORDS);

        if let Err(e) = self.save(&records) {
            warn!("Failed to save history: {e:#}");
        }
    }

    /// Up to `limit` records, newest first.
    pub fn records(&self, limit: usize) -> Vec<HistoryRecord> {
        self.lock().iter().take(limit).cloned().collect()
    }

    /// Records whose source or translation contains `keyword`, ignoring case.
    pub fn search(&self, keyword: &str, limit: usize) -> Vec<HistoryRecord> {
        let keyword = keyword.to_lowercase();
        self.lock()
            .iter()
            .filter(|record| {
                record.source_text.to_lowercase().contains(&keyword)
                    || record.translated_text.to_lowercase().contains(&keyword)
            })
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every record and saves the empty list.
    pub fn clear(&self) -> Result<()> {
        let mut records = self.lock();
        records.clear();
        self.save(&records)?;
        info!("History cleared");
        Ok(())
    }

    fn save(&self, records: &VecDeque<HistoryRecord>) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create history directory: {}", parent.display())
            })?;
        }

        let file = HistoryFile {
            records: records.iter().cloned().collect(),
        };
        let contents = serde_json::to_string_pretty(&file).context("Failed to serialize history")?;
        crate::fs::atomic_write(path, &contents)
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<HistoryRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn load(path: &Path) -> Result<VecDeque<HistoryRecord>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(VecDeque::new()),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read {}", path.display()));
        }
    };

    let file: HistoryFile = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(file.records.into())
}
