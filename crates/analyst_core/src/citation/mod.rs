//! Citation markers in generated markdown: tokenizing and binding to sources.
mod resolve;
mod tokenize;

pub use resolve::{resolve, PlannedSegment, RenderPlan};
pub use tokenize::{
    parse_citation_number, tokenize, CitationSegment, TokenizedMessage, BIBLIOGRAPHY_HEADING,
};
