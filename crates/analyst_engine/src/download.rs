use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use analyst_logging::analyst_debug;
use sha2::{Digest, Sha256};
use tempfile::Builder;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("download directory unusable: {0}")]
    Directory(String),
    #[error("could not write artifact: {0}")]
    Io(#[from] io::Error),
}

/// Creates `dir` when missing and checks that it is a directory.
pub fn ensure_download_dir(dir: &Path) -> Result<(), DownloadError> {
    fs::create_dir_all(dir)
        .map_err(|err| DownloadError::Directory(format!("{}: {err}", dir.display())))?;
    if !dir.is_dir() {
        return Err(DownloadError::Directory(format!(
            "{} is not a directory",
            dir.display()
        )));
    }
    Ok(())
}

/// Stages each artifact in a hidden sibling file and renames it into place,
/// so readers only ever see complete files.
#[derive(Debug, Clone)]
pub struct DownloadWriter {
    dir: PathBuf,
}

impl DownloadWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes `content` as `filename`, replacing any earlier file of that name.
    pub fn write(&self, filename: &str, content: &[u8]) -> Result<PathBuf, DownloadError> {
        ensure_download_dir(&self.dir)?;
        let target = self.dir.join(filename);

        let mut staged = Builder::new()
            .prefix(".partial-")
            .tempfile_in(&self.dir)?;
        staged.write_all(content)?;
        staged.as_file().sync_all()?;
        staged
            .persist(&target)
            .map_err(|err| DownloadError::Io(err.error))?;

        analyst_debug!("Stored {} bytes at {:?}", content.len(), target);
        Ok(target)
    }
}

/// Deterministic, filesystem-safe name: `{sanitized_title}--{short_hash(artifact_id)}.{extension}`
pub fn export_filename(title: &str, artifact_id: &str, extension: &str) -> String {
    let sanitized = sanitize_title(title);
    let hash = short_hash(artifact_id);
    format!("{sanitized}--{hash}.{extension}")
}

fn sanitize_title(input: &str) -> String {
    let mut compacted = String::with_capacity(input.len());
    let mut prev_underscore = false;
    for c in input.chars() {
        let c = if is_forbidden(c) || c.is_whitespace() { '_' } else { c };
        if c == '_' {
            if !prev_underscore {
                compacted.push(c);
            }
            prev_underscore = true;
        } else {
            compacted.push(c);
            prev_underscore = false;
        }
    }
    let trimmed = compacted.trim_matches(&['_', '.'][..]);
    let mut name: String = trimmed.chars().take(80).collect();
    if name.is_empty() {
        name = "analysis".to_string();
    }
    if is_reserved_windows_name(&name) {
        name.push('_');
    }
    name
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    digest.iter().take(4).map(|byte| format!("{byte:02x}")).collect()
}
