use analyst_core::citation::{PlannedSegment, RenderPlan};
use analyst_core::{truncate_excerpt, RelevanceTier, SourceRecord};
use pulldown_cmark::{
    html, CodeBlockKind, CowStr, Event, LinkType, Options, Parser, Tag, TagEnd, TextMergeStream,
};

const PLACEHOLDER_OPEN: char = '\u{E000}';
const PLACEHOLDER_CLOSE: char = '\u{E001}';

/// Everything the hover card over a citation badge shows.
#[derive(Debug, Clone, PartialEq)]
pub struct HoverPreview {
    pub title: String,
    pub byline: Option<String>,
    pub document_type: Option<String>,
    pub excerpt: String,
    pub citation_text: Option<String>,
}

impl HoverPreview {
    pub fn for_source(source: &SourceRecord) -> Self {
        let byline = match (source.author.as_deref(), source.year.as_deref()) {
            (Some(author), Some(year)) => Some(format!("{author} ({year})")),
            (Some(author), None) => Some(author.to_string()),
            (None, Some(year)) => Some(format!("({year})")),
            (None, None) => None,
        };
        Self {
            title: source.display_title(),
            byline,
            document_type: source.document_type.clone(),
            excerpt: truncate_excerpt(&source.excerpt_text),
            citation_text: source.citation_text.clone(),
        }
    }
}

/// One citation occurrence in rendered output, in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct CitationBadge {
    pub source_index: u32,
    /// The marker as written in the message.
    pub raw: String,
    /// `None` when the citation did not resolve; such badges are plain text.
    pub source: Option<SourceRecord>,
    pub tier: Option<RelevanceTier>,
    pub preview: Option<HoverPreview>,
}

impl CitationBadge {
    pub fn is_interactive(&self) -> bool {
        self.source.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedMessage {
    pub html: String,
    pub badges: Vec<CitationBadge>,
}

impl RenderedMessage {
    /// Activates badge `badge`, invoking `on_view_source` when it is resolved.
    ///
    /// Returns whether the callback ran.
    pub fn click<F>(&self, badge: usize, on_view_source: F) -> bool
    where
        F: FnOnce(&SourceRecord),
    {
        match self.badges.get(badge).and_then(|b| b.source.as_ref()) {
            Some(source) => {
                on_view_source(source);
                true
            }
            None => false,
        }
    }
}

pub trait CitationRenderer: Send + Sync {
    fn render(&self, plan: &RenderPlan<'_>) -> RenderedMessage;
}

/// Renders GFM to HTML with citation badges spliced into text runs.
#[derive(Debug, Clone, Copy)]
pub struct HtmlCitationRenderer {
    options: Options,
}

impl Default for HtmlCitationRenderer {
    fn default() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_FOOTNOTES);
        Self { options }
    }
}

impl CitationRenderer for HtmlCitationRenderer {
    fn render(&self, plan: &RenderPlan<'_>) -> RenderedMessage {
        // Citations become private-use placeholders so markdown parsing sees
        // the body as one document and block structure stays intact.
        let mut markdown = String::new();
        let mut candidates = Vec::new();
        for segment in &plan.segments {
            match segment {
                PlannedSegment::Text(text) => markdown.push_str(text),
                PlannedSegment::Resolved {
                    source_index,
                    raw,
                    source,
                } => {
                    push_placeholder(&mut markdown, candidates.len());
                    candidates.push(CitationBadge {
                        source_index: *source_index,
                        raw: raw.to_string(),
                        source: Some((*source).clone()),
                        tier: Some(source.relevance_tier()),
                        preview: Some(HoverPreview::for_source(source)),
                    });
                }
                PlannedSegment::Unresolved { source_index, raw } => {
                    push_placeholder(&mut markdown, candidates.len());
                    candidates.push(CitationBadge {
                        source_index: *source_index,
                        raw: raw.to_string(),
                        source: None,
                        tier: None,
                        preview: None,
                    });
                }
            }
        }

        let mut out = String::new();
        let mut splicer = Splicer::new(&candidates);
        self.push_markdown(&mut out, &markdown, &mut splicer);
        let badges = splicer
            .shown
            .iter()
            .map(|&ordinal| candidates[ordinal].clone())
            .collect();

        if !plan.bibliography.trim().is_empty() {
            out.push_str("<section class=\"bibliography\">\n");
            self.push_markdown(&mut out, plan.bibliography, &mut Splicer::new(&[]));
            out.push_str("</section>\n");
        } else if !plan.sources.is_empty() {
            push_source_list(&mut out, plan.sources);
        }

        RenderedMessage { html: out, badges }
    }
}

impl HtmlCitationRenderer {
    fn push_markdown(&self, out: &mut String, markdown: &str, splicer: &mut Splicer<'_>) {
        let mut events = Vec::new();
        for event in TextMergeStream::new(Parser::new_ext(markdown, self.options)) {
            splicer.map_event(event, &mut events);
        }
        html::push_html(out, events.into_iter());
    }
}

/// Puts citations back into the event stream.
///
/// Inside code, raw HTML, link targets, autolinks and image alt text a
/// citation is written back as its original marker; elsewhere it becomes a
/// badge. `shown` lists the candidate ordinals that became badges, in order.
struct Splicer<'b> {
    candidates: &'b [CitationBadge],
    shown: Vec<usize>,
    literal_depth: usize,
    in_autolink: bool,
}

impl<'b> Splicer<'b> {
    fn new(candidates: &'b [CitationBadge]) -> Self {
        Self {
            candidates,
            shown: Vec::new(),
            literal_depth: 0,
            in_autolink: false,
        }
    }

    fn map_event<'a>(&mut self, event: Event<'a>, out: &mut Vec<Event<'a>>) {
        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                self.literal_depth += 1;
                let kind = match kind {
                    CodeBlockKind::Fenced(info) => CodeBlockKind::Fenced(self.restore(info)),
                    indented => indented,
                };
                out.push(Event::Start(Tag::CodeBlock(kind)));
            }
            Event::Start(Tag::Image {
                link_type,
                dest_url,
                title,
                id,
            }) => {
                self.literal_depth += 1;
                out.push(Event::Start(Tag::Image {
                    link_type,
                    dest_url: self.restore(dest_url),
                    title: self.restore(title),
                    id,
                }));
            }
            Event::Start(Tag::Link {
                link_type,
                dest_url,
                title,
                id,
            }) => {
                if matches!(link_type, LinkType::Autolink | LinkType::Email) {
                    self.in_autolink = true;
                    self.literal_depth += 1;
                }
                out.push(Event::Start(Tag::Link {
                    link_type,
                    dest_url: self.restore(dest_url),
                    title: self.restore(title),
                    id,
                }));
            }
            Event::End(end @ (TagEnd::CodeBlock | TagEnd::Image)) => {
                self.literal_depth = self.literal_depth.saturating_sub(1);
                out.push(Event::End(end));
            }
            Event::End(TagEnd::Link) => {
                if std::mem::take(&mut self.in_autolink) {
                    self.literal_depth = self.literal_depth.saturating_sub(1);
                }
                out.push(Event::End(TagEnd::Link));
            }
            Event::Text(text) if text.contains(PLACEHOLDER_OPEN) => {
                if self.literal_depth > 0 {
                    out.push(Event::Text(self.restore(text)));
                } else {
                    self.splice(&text, out);
                }
            }
            Event::Code(code) => out.push(Event::Code(self.restore(code))),
            Event::Html(raw) => out.push(Event::Html(self.restore(raw))),
            Event::InlineHtml(raw) => out.push(Event::InlineHtml(self.restore(raw))),
            other => out.push(other),
        }
    }

    /// Replaces every placeholder in `text` with the marker it stands for.
    fn restore<'a>(&self, text: CowStr<'a>) -> CowStr<'a> {
        if !text.contains(PLACEHOLDER_OPEN) {
            return text;
        }
        let mut restored = String::with_capacity(text.len());
        let mut rest: &str = &text;
        while let Some((before, ordinal, after)) = next_placeholder(rest) {
            restored.push_str(before);
            match ordinal.and_then(|ordinal| self.candidates.get(ordinal)) {
                Some(badge) => restored.push_str(&badge.raw),
                None => restored.push_str(&rest[before.len()..rest.len() - after.len()]),
            }
            rest = after;
        }
        restored.push_str(rest);
        CowStr::from(restored)
    }

    /// Splits a text run on placeholders, emitting badge HTML in their place.
    fn splice<'a>(&mut self, text: &str, out: &mut Vec<Event<'a>>) {
        let mut rest = text;
        while let Some((before, ordinal, after)) = next_placeholder(rest) {
            if !before.is_empty() {
                out.push(Event::Text(CowStr::from(before.to_string())));
            }
            match ordinal.filter(|ordinal| *ordinal < self.candidates.len()) {
                Some(ordinal) => {
                    let position = self.shown.len();
                    self.shown.push(ordinal);
                    out.push(badge_event(position, &self.candidates[ordinal]));
                }
                None => out.push(Event::Text(CowStr::from(
                    rest[before.len()..rest.len() - after.len()].to_string(),
                ))),
            }
            rest = after;
        }
        if !rest.is_empty() {
            out.push(Event::Text(CowStr::from(rest.to_string())));
        }
    }
}

/// Finds the next complete placeholder: text before it, its ordinal, text after it.
fn next_placeholder(text: &str) -> Option<(&str, Option<usize>, &str)> {
    let open = text.find(PLACEHOLDER_OPEN)?;
    let inner_start = open + PLACEHOLDER_OPEN.len_utf8();
    let close = inner_start + text[inner_start..].find(PLACEHOLDER_CLOSE)?;
    let ordinal = text[inner_start..close].parse().ok();
    Some((
        &text[..open],
        ordinal,
        &text[close + PLACEHOLDER_CLOSE.len_utf8()..],
    ))
}

fn push_placeholder(markdown: &mut String, ordinal: usize) {
    markdown.push(PLACEHOLDER_OPEN);
    markdown.push_str(&ordinal.to_string());
    markdown.push(PLACEHOLDER_CLOSE);
}

fn badge_event<'a>(ordinal: usize, badge: &CitationBadge) -> Event<'a> {
    match (&badge.source, &badge.preview) {
        (Some(source), Some(preview)) => {
            let tier = badge.tier.unwrap_or(RelevanceTier::Low);
            let mut html = format!(
                "<span class=\"citation\"><button type=\"button\" class=\"citation-badge {}\" \
                 data-badge=\"{}\" data-source-id=\"{}\" aria-label=\"Source {}\">{}</button>",
                tier.css_class(),
                ordinal,
                source.id,
                badge.source_index,
                badge.source_index
            );
            push_preview(&mut html, preview);
            html.push_str("</span>");
            Event::InlineHtml(CowStr::from(html))
        }
        _ => Event::Text(CowStr::from(format!("[{}]", badge.source_index))),
    }
}

fn push_preview(html: &mut String, preview: &HoverPreview) {
    html.push_str("<span class=\"citation-preview\" role=\"tooltip\">");
    html.push_str(&format!(
        "<strong class=\"preview-title\">{}</strong>",
        escape_html(&preview.title)
    ));
    if let Some(byline) = &preview.byline {
        html.push_str(&format!(
            "<span class=\"preview-byline\">{}</span>",
            escape_html(byline)
        ));
    }
    if let Some(document_type) = &preview.document_type {
        html.push_str(&format!(
            "<span class=\"preview-type\">{}</span>",
            escape_html(document_type)
        ));
    }
    if !preview.excerpt.is_empty() {
        html.push_str(&format!(
            "<span class=\"preview-excerpt\">{}</span>",
            escape_html(&preview.excerpt)
        ));
    }
    if let Some(citation) = &preview.citation_text {
        html.push_str(&format!(
            "<span class=\"preview-citation\">{}</span>",
            escape_html(citation)
        ));
    }
    html.push_str("</span>");
}

/// Fallback list when the message carried no bibliography of its own.
fn push_source_list(out: &mut String, sources: &[SourceRecord]) {
    out.push_str("<section class=\"sources\">\n<h2>Sources</h2>\n<ol>\n");
    for source in sources {
        out.push_str(&format!(
            "<li id=\"source-{}\"><strong>{}</strong>",
            source.id,
            escape_html(&source.display_title())
        ));
        if let Some(citation) = &source.citation_text {
            out.push_str(&format!(
                " <span class=\"citation-text\">{}</span>",
                escape_html(citation)
            ));
        }
        let excerpt = truncate_excerpt(&source.excerpt_text);
        if !excerpt.is_empty() {
            out.push_str(&format!(
                "<p class=\"excerpt\">{}</p>",
                escape_html(&excerpt)
            ));
        }
        if let Some(score) = source.relevance_score {
            out.push_str(&format!(
                "<span class=\"relevance {}\">{:.0}%</span>",
                source.relevance_tier().css_class(),
                score * 100.0
            ));
        }
        out.push_str("</li>\n");
    }
    out.push_str("</ol>\n</section>\n");
}

/// Escapes text for use in HTML element content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
