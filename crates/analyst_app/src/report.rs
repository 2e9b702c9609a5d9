use std::path::{Path, PathBuf};

use analyst_core::citation::{resolve, tokenize};
use analyst_core::{AnalysisResult, PREVIEW_FLIP_MARGIN_PX};
use analyst_engine::{
    escape_html, export_filename, CitationRenderer, DownloadWriter, HtmlCitationRenderer,
};
use analyst_logging::{analyst_debug, analyst_info};
use anyhow::{Context, Result};

/// Renders the result to a standalone HTML page and writes it under `dir`.
pub fn write_report(dir: &Path, result: &AnalysisResult) -> Result<PathBuf> {
    let html = render_report(result);
    let filename = export_filename(&result.title, &result.id, "html");
    let path = DownloadWriter::new(dir.to_path_buf())
        .write(&filename, html.as_bytes())
        .with_context(|| format!("writing report into {}", dir.display()))?;
    analyst_info!("Report for '{}' written to {:?}", result.title, path);
    Ok(path)
}

pub fn render_report(result: &AnalysisResult) -> String {
    let tokenized = tokenize(&result.content_markdown, result.sources.len());
    let plan = resolve(&tokenized, &result.sources);
    analyst_debug!(
        "Rendering {} citations ({} unresolved) over {} sources",
        plan.resolved_count() + plan.unresolved_count(),
        plan.unresolved_count(),
        result.sources.len()
    );
    let rendered = HtmlCitationRenderer::default().render(&plan);

    let title = escape_html(&result.title);
    let mut page = String::with_capacity(rendered.html.len() + 2048);
    page.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    page.push_str(&format!("<title>{title}</title>\n"));
    page.push_str("<style>\n");
    page.push_str(STYLE);
    page.push_str("</style>\n</head>\n<body>\n<article>\n");
    page.push_str(&format!(
        "<header><h1>{title}</h1><p class=\"meta\">{}</p></header>\n",
        escape_html(&result.created_at)
    ));
    page.push_str(&rendered.html);
    page.push_str("</article>\n<script>\n");
    page.push_str(&placement_script());
    page.push_str("</script>\n</body>\n</html>\n");
    page
}

const STYLE: &str = r#"body { font-family: sans-serif; max-width: 52rem; margin: 2rem auto; line-height: 1.5; }
.citation { position: relative; }
.citation-badge { border: 0; border-radius: 0.6rem; padding: 0 0.4rem; font-size: 0.75rem; cursor: pointer; }
.relevance-high { background: #10b981; color: #fff; }
.relevance-medium { background: #f59e0b; color: #fff; }
.relevance-low { background: #9ca3af; color: #fff; }
.citation-preview { display: none; position: absolute; left: 0; top: 1.4rem; width: 22rem; z-index: 10;
  background: #fff; border: 1px solid #ddd; padding: 0.6rem; box-shadow: 0 2px 8px rgba(0,0,0,.15); }
.citation-preview.above { top: auto; bottom: 1.4rem; }
.citation:hover .citation-preview, .citation:focus-within .citation-preview { display: block; }
.citation-preview > span { display: block; font-size: 0.85rem; }
table { border-collapse: collapse; }
td, th { border: 1px solid #ddd; padding: 0.25rem 0.5rem; }
"#;

/// Flips hover cards above their badge when too little viewport remains below.
fn placement_script() -> String {
    format!(
        "document.querySelectorAll('.citation').forEach(function (el) {{\n  \
         el.addEventListener('mouseenter', function () {{\n    \
         var below = window.innerHeight - el.getBoundingClientRect().bottom;\n    \
         el.querySelector('.citation-preview').classList.toggle('above', below < {PREVIEW_FLIP_MARGIN_PX});\n  \
         }});\n}});\n"
    )
}
