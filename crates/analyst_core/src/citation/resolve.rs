use analyst_logging::analyst_debug;

use crate::citation::{CitationSegment, TokenizedMessage};
use crate::SourceRecord;

/// A tokenized segment paired with its source, ready for rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum PlannedSegment<'a> {
    Text(&'a str),
    Resolved {
        source_index: u32,
        /// The marker as written, e.g. `[¹]`.
        raw: &'a str,
        source: &'a SourceRecord,
    },
    /// No source carries this id; rendered as literal `[N]`.
    Unresolved { source_index: u32, raw: &'a str },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderPlan<'a> {
    pub segments: Vec<PlannedSegment<'a>>,
    pub bibliography: &'a str,
    pub sources: &'a [SourceRecord],
}

impl RenderPlan<'_> {
    pub fn resolved_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, PlannedSegment::Resolved { .. }))
            .count()
    }

    pub fn unresolved_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, PlannedSegment::Unresolved { .. }))
            .count()
    }
}

/// Binds every citation to the source whose `id` equals its index.
pub fn resolve<'a>(message: &'a TokenizedMessage, sources: &'a [SourceRecord]) -> RenderPlan<'a> {
    let segments = message
        .segments
        .iter()
        .map(|segment| match segment {
            CitationSegment::Text(text) => PlannedSegment::Text(text),
            CitationSegment::Citation { source_index, raw } => {
                match sources.iter().find(|s| s.id == *source_index) {
                    Some(source) => PlannedSegment::Resolved {
                        source_index: *source_index,
                        raw: raw.as_str(),
                        source,
                    },
                    None => {
                        analyst_debug!("unresolved citation [{}]", source_index);
                        PlannedSegment::Unresolved {
                            source_index: *source_index,
                            raw: raw.as_str(),
                        }
                    }
                }
            }
        })
        .collect();

    RenderPlan {
        segments,
        bibliography: &message.bibliography,
        sources,
    }
}
