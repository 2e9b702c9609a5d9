use serde::{Deserialize, Serialize};

use crate::{AnalysisResult, SourceRecord};

/// Identity and language of the signed-in user.
///
/// Injected into [`crate::AppState::new`] rather than read from ambient state,
/// so the state machine can be driven without any session provider present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub user_id: String,
    pub language: String,
}

impl SessionContext {
    pub fn new(user_id: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            language: language.into(),
        }
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new("anonymous", "en")
    }
}

/// Kind of analysis requested from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    #[default]
    General,
    Legal,
    Financial,
    Compliance,
    Risk,
}

impl AnalysisType {
    /// Maps a backend tag to a variant. Unknown tags fall back to `General`.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "legal" => AnalysisType::Legal,
            "financial" | "finance" => AnalysisType::Financial,
            "compliance" => AnalysisType::Compliance,
            "risk" => AnalysisType::Risk,
            _ => AnalysisType::General,
        }
    }

    pub fn as_tag(self) -> &'static str {
        match self {
            AnalysisType::General => "general",
            AnalysisType::Legal => "legal",
            AnalysisType::Financial => "financial",
            AnalysisType::Compliance => "compliance",
            AnalysisType::Risk => "risk",
        }
    }
}

/// Body of the POST that opens an analysis stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub analysis_type: AnalysisType,
    pub query: String,
    pub title: String,
    pub include_recommendations: bool,
    pub language: String,
    pub user_id: String,
}

/// Extra fields stored alongside a saved or exported result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveMetadata {
    pub query: String,
    pub language: String,
    pub created_at: String,
    pub sources_count: usize,
}

/// Body shared by the persistence and export endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    pub user_id: String,
    pub analysis_type: AnalysisType,
    pub title: String,
    pub content: String,
    pub sources: Vec<SourceRecord>,
    pub metadata: SaveMetadata,
}

impl SaveRequest {
    pub fn from_result(request: &AnalysisRequest, result: &AnalysisResult) -> Self {
        Self {
            user_id: request.user_id.clone(),
            analysis_type: request.analysis_type,
            title: result.title.clone(),
            content: result.content_markdown.clone(),
            sources: result.sources.clone(),
            metadata: SaveMetadata {
                query: request.query.clone(),
                language: request.language.clone(),
                created_at: result.created_at.clone(),
                sources_count: result.sources.len(),
            },
        }
    }
}
