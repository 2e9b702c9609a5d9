use serde::{Deserialize, Deserializer, Serialize};

/// Maximum number of characters kept from an excerpt in previews.
pub const EXCERPT_PREVIEW_CHARS: usize = 200;

/// A retrieved document fragment backing a generated analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRecord {
    pub id: u32,
    #[serde(
        default,
        alias = "document_id",
        deserialize_with = "string_or_number"
    )]
    pub document_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub year: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub page: Option<String>,
    #[serde(default, alias = "document_type")]
    pub document_type: Option<String>,
    #[serde(
        default,
        alias = "excerpt_text",
        alias = "excerpt",
        deserialize_with = "null_as_default"
    )]
    pub excerpt_text: String,
    #[serde(default, alias = "relevance_score")]
    pub relevance_score: Option<f64>,
    #[serde(default, alias = "citation_text")]
    pub citation_text: Option<String>,
    #[serde(default, alias = "document_url")]
    pub document_url: Option<String>,
}

impl SourceRecord {
    pub fn new(id: u32, excerpt_text: impl Into<String>) -> Self {
        Self {
            id,
            document_id: None,
            title: None,
            author: None,
            year: None,
            page: None,
            document_type: None,
            excerpt_text: excerpt_text.into(),
            relevance_score: None,
            citation_text: None,
            document_url: None,
        }
    }

    pub fn relevance_tier(&self) -> RelevanceTier {
        RelevanceTier::from_score(self.relevance_score)
    }

    /// Title, falling back to a numbered placeholder.
    pub fn display_title(&self) -> String {
        match self.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => format!("Source {}", self.id),
        }
    }
}

/// Badge coloring tier derived from a relevance score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelevanceTier {
    High,
    Medium,
    Low,
}

impl RelevanceTier {
    pub const HIGH_THRESHOLD: f64 = 0.8;
    pub const MEDIUM_THRESHOLD: f64 = 0.5;

    pub fn from_score(score: Option<f64>) -> Self {
        match score {
            Some(s) if s >= Self::HIGH_THRESHOLD => RelevanceTier::High,
            Some(s) if s >= Self::MEDIUM_THRESHOLD => RelevanceTier::Medium,
            _ => RelevanceTier::Low,
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            RelevanceTier::High => "relevance-high",
            RelevanceTier::Medium => "relevance-medium",
            RelevanceTier::Low => "relevance-low",
        }
    }
}

/// The `data` object carried by a terminal frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalysisPayload {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sources: Vec<SourceRecord>,
}

/// Terminal artifact of one analysis run. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub id: String,
    pub title: String,
    pub content_markdown: String,
    pub sources: Vec<SourceRecord>,
    pub created_at: String,
}

impl AnalysisResult {
    pub fn from_payload(
        fallback_id: String,
        fallback_title: &str,
        payload: AnalysisPayload,
        created_at: String,
    ) -> Self {
        let title = if payload.title.trim().is_empty() {
            fallback_title.to_string()
        } else {
            payload.title
        };
        Self {
            id: payload.id.unwrap_or(fallback_id),
            title,
            content_markdown: payload.content,
            sources: payload.sources,
            created_at,
        }
    }
}

/// Cuts `text` to [`EXCERPT_PREVIEW_CHARS`] characters, appending `...` when shortened.
pub fn truncate_excerpt(text: &str) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(EXCERPT_PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", trimmed[..cut].trim_end()),
        None => trimmed.to_string(),
    }
}

/// Treats an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relevance_tiers_use_fixed_thresholds() {
        assert_eq!(RelevanceTier::from_score(Some(0.8)), RelevanceTier::High);
        assert_eq!(RelevanceTier::from_score(Some(0.79)), RelevanceTier::Medium);
        assert_eq!(RelevanceTier::from_score(Some(0.5)), RelevanceTier::Medium);
        assert_eq!(RelevanceTier::from_score(Some(0.49)), RelevanceTier::Low);
        assert_eq!(RelevanceTier::from_score(None), RelevanceTier::Low);
    }

    #[test]
    fn excerpt_is_cut_on_char_boundary() {
        let text = "é".repeat(EXCERPT_PREVIEW_CHARS + 10);
        let cut = truncate_excerpt(&text);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), EXCERPT_PREVIEW_CHARS + 3);
        assert_eq!(truncate_excerpt("short"), "short");
    }

    #[test]
    fn source_accepts_numeric_year_and_snake_case_fields() {
        let json = r#"{"id":2,"document_id":17,"year":2021,"excerpt_text":"x","relevanceScore":0.9,"extra":true}"#;
        let source: SourceRecord = serde_json::from_str(json).unwrap();
        assert_eq!(source.document_id.as_deref(), Some("17"));
        assert_eq!(source.year.as_deref(), Some("2021"));
        assert_eq!(source.excerpt_text, "x");
        assert_eq!(source.relevance_tier(), RelevanceTier::High);
    }

    #[test]
    fn null_fields_read_as_absent() {
        let source: SourceRecord = serde_json::from_str(
            r#"{"id":1,"title":null,"excerptText":null,"year":null,"relevanceScore":null}"#,
        )
        .unwrap();
        assert_eq!(source.excerpt_text, "");
        assert_eq!(source.title, None);
        assert_eq!(source.display_title(), "Source 1");

        let payload: AnalysisPayload =
            serde_json::from_str(r#"{"id":null,"title":null,"content":null,"sources":null}"#)
                .unwrap();
        assert_eq!(payload, AnalysisPayload::default());
    }
}
