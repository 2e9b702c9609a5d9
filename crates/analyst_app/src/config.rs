use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use analyst_core::SessionContext;
use analyst_engine::EngineConfig;
use analyst_logging::LogDestination;
use anyhow::{Context, Result};
use log::LevelFilter;
use serde::Deserialize;

use crate::cli::Cli;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
pub enum LogTarget {
    #[default]
    Terminal,
    File,
    Both,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub target: LogTarget,
    pub file: PathBuf,
    pub level: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            target: LogTarget::Terminal,
            file: PathBuf::from("./analyst.log"),
            level: "warn".to_string(),
        }
    }
}

/// Settings read from the optional RON config file. Every field has a default.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    pub stream_path: String,
    pub save_path: String,
    pub export_path: String,
    pub export_download_path: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: Option<u64>,
    pub secondary_timeout_secs: u64,
    /// Wall-clock limit after which the app cancels the run itself.
    pub run_timeout_secs: Option<u64>,
    pub download_dir: PathBuf,
    pub report_dir: PathBuf,
    pub user_id: String,
    pub language: String,
    pub log: LogSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        let engine = EngineConfig::default();
        let session = SessionContext::default();
        Self {
            base_url: engine.base_url,
            stream_path: engine.stream_path,
            save_path: engine.save_path,
            export_path: engine.export_path,
            export_download_path: engine.export_download_path,
            connect_timeout_secs: engine.connect_timeout.as_secs(),
            request_timeout_secs: engine.request_timeout.map(|t| t.as_secs()),
            secondary_timeout_secs: engine.secondary_timeout.as_secs(),
            run_timeout_secs: None,
            download_dir: engine.download_dir,
            report_dir: PathBuf::from("reports"),
            user_id: session.user_id,
            language: session.language,
            log: LogSettings::default(),
        }
    }
}

impl AppConfig {
    /// Reads `path` if given; without a path the defaults apply.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(ron::from_str(text)?)
    }

    /// Command-line flags win over the file.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(base_url) = &cli.base_url {
            self.base_url = base_url.clone();
        }
        if let Some(out_dir) = &cli.out_dir {
            self.report_dir = out_dir.clone();
            self.download_dir = out_dir.clone();
        }
        if let Some(language) = &cli.language {
            self.language = language.clone();
        }
        if let Some(user) = &cli.user {
            self.user_id = user.clone();
        }
        if cli.timeout.is_some() {
            self.run_timeout_secs = cli.timeout;
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            base_url: self.base_url.clone(),
            stream_path: self.stream_path.clone(),
            save_path: self.save_path.clone(),
            export_path: self.export_path.clone(),
            export_download_path: self.export_download_path.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: self.request_timeout_secs.map(Duration::from_secs),
            secondary_timeout: Duration::from_secs(self.secondary_timeout_secs),
            download_dir: self.download_dir.clone(),
        }
    }

    pub fn session_context(&self) -> SessionContext {
        SessionContext::new(self.user_id.clone(), self.language.clone())
    }

    pub fn run_timeout(&self) -> Option<Duration> {
        self.run_timeout_secs.map(Duration::from_secs)
    }

    pub fn secondary_timeout(&self) -> Duration {
        Duration::from_secs(self.secondary_timeout_secs)
    }

    pub fn log_destination(&self) -> LogDestination {
        match self.log.target {
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::File => LogDestination::File(self.log.file.clone()),
            LogTarget::Both => LogDestination::Both(self.log.file.clone()),
        }
    }

    /// `--verbose` forces debug; otherwise the configured level, falling back to warn.
    pub fn log_level(&self, verbose: bool) -> LevelFilter {
        if verbose {
            return LevelFilter::Debug;
        }
        LevelFilter::from_str(&self.log.level).unwrap_or(LevelFilter::Warn)
    }
}
