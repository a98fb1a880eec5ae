//! Syntax highlighting for fenced code blocks.
//!
//! Emits spans with inline `style` attributes, so the highlighted output
//! needs no stylesheet or client-side highlighter.

use std::sync::LazyLock;

use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::{IncludeBackground, append_highlighted_html_for_styled_line};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);

/// Closest bundled match for GitHub's code block palette.
static THEME: LazyLock<Theme> = LazyLock::new(|| {
    ThemeSet::load_defaults()
        .themes
        .remove("InspiredGitHub")
        .unwrap()
});

/// Highlight `code` as `lang`, returning HTML with inline color styles.
///
/// Returns `None` when no bundled syntax matches `lang`; the caller falls
/// back to plain escaped output.
pub(crate) fn highlight(lang: &str, code: &str) -> Option<String> {
    let syntax = SYNTAX_SET.find_syntax_by_token(lang)?;

    let mut highlighter = HighlightLines::new(syntax, &THEME);
    let mut html = String::with_capacity(code.len() * 2);
    for line in LinesWithEndings::from(code) {
        let regions = highlighter.highlight_line(line, &SYNTAX_SET).ok()?;
        append_highlighted_html_for_styled_line(&regions, IncludeBackground::No, &mut html)
            .ok()?;
    }

    Some(html)
}
