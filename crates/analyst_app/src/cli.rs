use std::path::PathBuf;

use analyst_core::AnalysisType;
use anyhow::{bail, Result};
use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    name = "analyst",
    version,
    about = "Run a streamed document analysis and write the cited report"
)]
pub struct Cli {
    /// Question or instruction for the analysis.
    pub query: Option<String>,

    /// Analysis type tag (general, legal, financial, compliance, risk).
    #[arg(short = 't', long = "type", default_value = "general")]
    pub analysis_type: String,

    /// Report title. Defaults to the query.
    #[arg(long)]
    pub title: Option<String>,

    /// Ask the service to leave out recommendations.
    #[arg(long)]
    pub no_recommendations: bool,

    /// RON config file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Directory for rendered reports and the local history.
    #[arg(short, long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Also export the finished analysis as a PDF.
    #[arg(long)]
    pub export: bool,

    #[arg(long)]
    pub language: Option<String>,

    #[arg(long, value_name = "USER_ID")]
    pub user: Option<String>,

    /// Cancel the analysis if it has not finished after this many seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// List previously written reports and exit.
    #[arg(long, conflicts_with = "query")]
    pub history: bool,

    #[arg(short, long)]
    pub verbose: bool,
}

/// What the user asked to analyze.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    pub query: String,
    pub title: Option<String>,
    pub analysis_type: AnalysisType,
    pub include_recommendations: bool,
    pub export: bool,
}

impl Cli {
    pub fn job(&self) -> Result<JobSpec> {
        let Some(query) = self.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) else {
            bail!("a query is required (or pass --history)");
        };
        Ok(JobSpec {
            query: query.to_string(),
            title: self.title.clone(),
            analysis_type: AnalysisType::from_tag(&self.analysis_type),
            include_recommendations: !self.no_recommendations,
            export: self.export,
        })
    }
}
