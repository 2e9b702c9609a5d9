use analyst_core::citation::{resolve, tokenize};
use analyst_core::{RelevanceTier, SourceRecord};
use analyst_engine::{CitationRenderer, HtmlCitationRenderer, RenderedMessage};
use pretty_assertions::assert_eq;

fn source(id: u32, score: f64) -> SourceRecord {
    SourceRecord {
        title: Some(format!("Doc {id}")),
        author: Some("Ada".to_string()),
        year: Some("2021".to_string()),
        relevance_score: Some(score),
        ..SourceRecord::new(id, "x".repeat(260))
    }
}

fn render(markdown: &str, sources: &[SourceRecord]) -> RenderedMessage {
    let tokenized = tokenize(markdown, sources.len());
    let plan = resolve(&tokenized, sources);
    HtmlCitationRenderer::default().render(&plan)
}

#[test]
fn resolved_citations_become_tiered_badges() {
    let sources = vec![source(1, 0.9), source(2, 0.6), source(3, 0.1)];
    let rendered = render("A[¹] B[2] C[³].", &sources);

    let tiers: Vec<_> = rendered.badges.iter().map(|b| b.tier).collect();
    assert_eq!(
        tiers,
        vec![
            Some(RelevanceTier::High),
            Some(RelevanceTier::Medium),
            Some(RelevanceTier::Low)
        ]
    );
    assert!(rendered.html.contains("citation-badge relevance-high"));
    assert!(rendered.html.contains("citation-badge relevance-medium"));
    assert!(rendered.html.contains("citation-badge relevance-low"));
    assert!(rendered.badges.iter().all(|b| b.is_interactive()));
}

#[test]
fn hover_preview_truncates_long_excerpts() {
    let sources = vec![source(1, 0.9)];
    let rendered = render("Claim[1].", &sources);

    let preview = rendered.badges[0].preview.as_ref().expect("preview");
    assert_eq!(preview.title, "Doc 1");
    assert_eq!(preview.byline.as_deref(), Some("Ada (2021)"));
    assert_eq!(preview.excerpt.chars().count(), 203);
    assert!(preview.excerpt.ends_with("..."));
}

#[test]
fn unresolved_citation_renders_as_plain_marker() {
    let sources = vec![source(1, 0.9)];
    let rendered = render("Known[1] unknown[7].", &sources);

    assert_eq!(rendered.badges.len(), 2);
    assert!(!rendered.badges[1].is_interactive());
    assert_eq!(rendered.badges[1].source_index, 7);
    assert!(rendered.html.contains("unknown[7]."));
    assert!(!rendered.click(1, |_| panic!("unresolved badge must not activate")));
}

#[test]
fn click_reports_the_cited_source() {
    let sources = vec![source(1, 0.9), source(2, 0.9)];
    let rendered = render("See[2].", &sources);

    let mut clicked = None;
    assert!(rendered.click(0, |s| clicked = Some(s.id)));
    assert_eq!(clicked, Some(2));
    assert!(!rendered.click(5, |_| {}));
}

#[test]
fn inline_bibliography_is_rendered_instead_of_source_list() {
    let sources = vec![source(1, 0.9)];
    let rendered = render("Body[1].\n## 📚 Sources\n1. Doc 1, Ada", &sources);

    assert!(rendered.html.contains("<section class=\"bibliography\">"));
    assert!(!rendered.html.contains("<section class=\"sources\">"));
    assert_eq!(rendered.badges.len(), 1);
}

#[test]
fn source_list_is_synthesized_when_bibliography_is_absent() {
    let sources = vec![source(1, 0.9), source(2, 0.2)];
    let rendered = render("Body[1].", &sources);

    assert!(rendered.html.contains("<section class=\"sources\">"));
    assert!(rendered.html.contains("<li id=\"source-1\">"));
    assert!(rendered.html.contains("<li id=\"source-2\">"));
    assert!(rendered.html.contains("90%"));
}

#[test]
fn markdown_structure_survives_citations() {
    let sources = vec![source(1, 0.9)];
    let markdown = "| Item | Note |\n|---|---|\n| a | **bold**[1] |\n\n- first[1]\n- second\n";
    let rendered = render(markdown, &sources);

    assert!(rendered.html.contains("<table>"));
    assert!(rendered.html.contains("<strong>bold</strong>"));
    assert!(rendered.html.contains("<li>first<span class=\"citation\">"));
    assert!(rendered.html.contains("<li>second</li>"));
    assert_eq!(rendered.badges.len(), 2);
}

#[test]
fn source_fields_are_escaped() {
    let mut hostile = source(1, 0.9);
    hostile.title = Some("<script>alert(1)</script>".to_string());
    let rendered = render("x[1]", &[hostile]);

    assert!(!rendered.html.contains("<script>"));
    assert!(rendered.html.contains("&lt;script&gt;"));
}

#[test]
fn markers_inside_code_stay_literal() {
    let sources = vec![source(1, 0.9)];
    let rendered = render("Use `arr[1]` here [1].", &sources);

    assert!(rendered.html.contains("<code>arr[1]</code>"), "{}", rendered.html);
    assert_eq!(rendered.badges.len(), 1);
    assert!(rendered.html.contains("data-badge=\"0\""));
    assert!(!rendered.html.contains('\u{E000}'));
}

#[test]
fn markers_inside_fenced_block_stay_literal() {
    let sources = vec![source(1, 0.9), source(2, 0.9)];
    let markdown = "```python\nx = items[1]\ny = items[2]\n```\n\nSee[2].";
    let rendered = render(markdown, &sources);

    assert!(rendered.html.contains("x = items[1]\ny = items[2]\n</code></pre>"));
    assert_eq!(rendered.badges.len(), 1);
    assert_eq!(rendered.badges[0].source_index, 2);
    assert_eq!(rendered.badges[0].raw, "[2]");
    assert_eq!(rendered.html.matches("citation-badge").count(), 1);
}

#[test]
fn markers_inside_link_targets_are_restored() {
    let sources = vec![source(1, 0.9)];
    let rendered = render(
        "[spec](https://example.com/a[1]) and <https://example.com/b[1]>",
        &sources,
    );

    assert!(rendered.badges.is_empty());
    assert!(!rendered.html.contains('\u{E000}'));
    assert!(rendered.html.contains("https://example.com/b[1]</a>"));
}
