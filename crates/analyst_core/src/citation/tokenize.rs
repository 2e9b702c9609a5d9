use once_cell::sync::Lazy;
use regex::Regex;

use analyst_logging::analyst_debug;

/// Heading the generation backend emits in front of the bibliography.
///
/// Must match the backend byte for byte; when it does not, the whole message
/// is treated as body.
pub const BIBLIOGRAPHY_HEADING: &str = "## 📚 Sources";

static CITATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[([⁰¹²³⁴⁵⁶⁷⁸⁹]+|[0-9]+)\]").expect("invalid citation regex")
});

/// One span of a tokenized message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CitationSegment {
    Text(String),
    Citation {
        source_index: u32,
        /// The bracketed marker as it appeared in the input.
        raw: String,
    },
}

impl CitationSegment {
    pub fn text(value: impl Into<String>) -> Self {
        CitationSegment::Text(value.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TokenizedMessage {
    pub segments: Vec<CitationSegment>,
    pub bibliography: String,
}

impl TokenizedMessage {
    /// Rebuilds the body, writing each citation back in its bracketed form.
    ///
    /// The line break that preceded the bibliography heading is not part of
    /// either half, so it is not restored here.
    pub fn reassemble_body(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                CitationSegment::Text(text) => out.push_str(text),
                CitationSegment::Citation { raw, .. } => out.push_str(raw),
            }
        }
        out
    }

    pub fn citation_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, CitationSegment::Citation { .. }))
            .count()
    }
}

/// Splits off the bibliography and tokenizes the body into text and citation spans.
///
/// `source_count` is only used to report out-of-range markers; they are still
/// emitted as citations and left to resolution.
pub fn tokenize(markdown: &str, source_count: usize) -> TokenizedMessage {
    let (body, bibliography) = split_bibliography(markdown);

    let mut segments = Vec::new();
    let mut pending = String::new();
    let mut cursor = 0;

    for caps in CITATION_RE.captures_iter(body) {
        let (Some(whole), Some(digits)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        pending.push_str(&body[cursor..whole.start()]);
        cursor = whole.end();

        let Some(source_index) = parse_citation_number(digits.as_str()) else {
            // Too large to be an index; keep it as prose.
            pending.push_str(whole.as_str());
            continue;
        };
        if source_index == 0 || source_index as usize > source_count {
            analyst_debug!(
                "citation [{}] outside 1..={} available sources",
                source_index,
                source_count
            );
        }
        if !pending.is_empty() {
            segments.push(CitationSegment::Text(std::mem::take(&mut pending)));
        }
        segments.push(CitationSegment::Citation {
            source_index,
            raw: whole.as_str().to_string(),
        });
    }

    pending.push_str(&body[cursor..]);
    if !pending.is_empty() {
        segments.push(CitationSegment::Text(pending));
    }

    TokenizedMessage {
        segments,
        bibliography: bibliography.to_string(),
    }
}

/// Returns `(body, bibliography)`. The single line break in front of the
/// heading separates the two and belongs to neither.
fn split_bibliography(markdown: &str) -> (&str, &str) {
    match markdown.find(BIBLIOGRAPHY_HEADING) {
        Some(idx) => {
            let body = &markdown[..idx];
            let body = body
                .strip_suffix("\r\n")
                .or_else(|| body.strip_suffix('\n'))
                .unwrap_or(body);
            (body, &markdown[idx..])
        }
        None => (markdown, ""),
    }
}

fn superscript_digit(c: char) -> Option<u32> {
    match c {
        '⁰' => Some(0),
        '¹' => Some(1),
        '²' => Some(2),
        '³' => Some(3),
        '⁴' => Some(4),
        '⁵' => Some(5),
        '⁶' => Some(6),
        '⁷' => Some(7),
        '⁸' => Some(8),
        '⁹' => Some(9),
        _ => None,
    }
}

/// Reads a run of ASCII or superscript digits as a base-10 numeral.
///
/// Returns `None` on overflow or on any other character.
pub fn parse_citation_number(digits: &str) -> Option<u32> {
    if digits.is_empty() {
        return None;
    }
    digits.chars().try_fold(0u32, |acc, c| {
        let digit = c.to_digit(10).or_else(|| superscript_digit(c))?;
        acc.checked_mul(10)?.checked_add(digit)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn superscript_runs_read_most_significant_first() {
        assert_eq!(parse_citation_number("¹"), Some(1));
        assert_eq!(parse_citation_number("¹²"), Some(12));
        assert_eq!(parse_citation_number("¹⁰⁰"), Some(100));
        assert_eq!(parse_citation_number("³⁴⁵⁶⁷"), Some(34_567));
        assert_eq!(parse_citation_number("⁹⁸⁷⁶⁵⁴³²¹⁰"), None);
        assert_eq!(parse_citation_number("42"), Some(42));
        assert_eq!(parse_citation_number("99999999999"), None);
        assert_eq!(parse_citation_number(""), None);
    }

    #[test]
    fn split_only_fires_on_exact_heading() {
        assert_eq!(split_bibliography("a\n## Sources\nb"), ("a\n## Sources\nb", ""));
        assert_eq!(
            split_bibliography("a\r\n## 📚 Sources\nb"),
            ("a", "## 📚 Sources\nb")
        );
    }
}
