use std::fs;
use std::path::{Path, PathBuf};

use analyst_core::{AnalysisResult, AnalysisType};
use analyst_engine::DownloadWriter;
use analyst_logging::{analyst_error, analyst_info, analyst_warn};
use serde::{Deserialize, Serialize};

const HISTORY_FILENAME: &str = ".analyst_history.ron";
const MAX_ENTRIES: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub title: String,
    pub analysis_type: String,
    pub created_at: String,
    pub sources_count: usize,
    pub report: PathBuf,
}

impl HistoryEntry {
    pub fn new(result: &AnalysisResult, analysis_type: AnalysisType, report: PathBuf) -> Self {
        Self {
            id: result.id.clone(),
            title: result.title.clone(),
            analysis_type: analysis_type.as_tag().to_string(),
            created_at: result.created_at.clone(),
            sources_count: result.sources.len(),
            report,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PersistedHistory {
    entries: Vec<HistoryEntry>,
}

/// Reads the local history. A missing or unreadable file yields an empty list.
pub fn load_history(dir: &Path) -> Vec<HistoryEntry> {
    let path = dir.join(HISTORY_FILENAME);
    let content = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(err) => {
            analyst_warn!("Failed to read history from {:?}: {}", path, err);
            return Vec::new();
        }
    };

    match ron::from_str::<PersistedHistory>(&content) {
        Ok(history) => history.entries,
        Err(err) => {
            analyst_warn!("Failed to parse history from {:?}: {}", path, err);
            Vec::new()
        }
    }
}

/// Appends `entry`, keeping only the newest entries.
pub fn record(dir: &Path, entry: HistoryEntry) {
    let mut entries = load_history(dir);
    entries.retain(|existing| existing.id != entry.id);
    entries.push(entry);
    if entries.len() > MAX_ENTRIES {
        entries.drain(..entries.len() - MAX_ENTRIES);
    }

    let content = match ron::ser::to_string_pretty(
        &PersistedHistory { entries },
        ron::ser::PrettyConfig::new(),
    ) {
        Ok(text) => text,
        Err(err) => {
            analyst_error!("Failed to serialize history: {}", err);
            return;
        }
    };

    let writer = DownloadWriter::new(dir.to_path_buf());
    match writer.write(HISTORY_FILENAME, content.as_bytes()) {
        Ok(path) => analyst_info!("History updated at {:?}", path),
        Err(err) => analyst_error!("Failed to write history to {:?}: {}", dir, err),
    }
}

pub fn print_history(dir: &Path) {
    let entries = load_history(dir);
    if entries.is_empty() {
        println!("No reports in {}", dir.display());
        return;
    }
    for entry in entries.iter().rev() {
        println!(
            "{}  [{}] {} ({} sources)\n    {}",
            entry.created_at,
            entry.analysis_type,
            entry.title,
            entry.sources_count,
            entry.report.display()
        );
    }
}
