//! Markdown to HTML conversion.
//!
//! Event-driven renderer over pulldown-cmark producing an HTML fragment
//! with GitHub-flavored extensions: tables, strikethrough, task lists,
//! smart punctuation, and stable heading ids. Single newlines render as
//! hard breaks, raw HTML passes through unchanged, and fenced code blocks
//! are syntax highlighted with inline styles, matching the
//! preview-oriented rendering this tool is for.

use std::collections::HashMap;
use std::fmt::Write;

use pulldown_cmark::{Alignment, CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

use crate::highlight::highlight;

/// Convert a markdown document to an HTML fragment.
#[must_use]
pub fn render_markdown(markdown: &str) -> String {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_SMART_PUNCTUATION;
    HtmlWriter::new().render(Parser::new_ext(markdown, options))
}

/// Heading buffered until its end tag so the id can be injected.
struct PendingHeading {
    level: u8,
    /// Inline HTML of the heading content.
    html: String,
    /// Plain text of the heading content, for the id slug.
    text: String,
}

/// Image buffered until its end tag so the alt text can be collected.
struct PendingImage {
    src: String,
    title: String,
    alt: String,
}

/// Fenced code buffered until its end tag for syntax highlighting.
struct PendingCodeBlock {
    lang: String,
    code: String,
}

/// Streaming HTML writer over markdown events.
struct HtmlWriter {
    output: String,
    heading: Option<PendingHeading>,
    image: Option<PendingImage>,
    code_block: Option<PendingCodeBlock>,
    /// Counter per slug for unique heading ids.
    id_counts: HashMap<String, usize>,
    in_table_head: bool,
    alignments: Vec<Alignment>,
    cell_index: usize,
}

impl HtmlWriter {
    fn new() -> Self {
        Self {
            output: String::with_capacity(4096),
            heading: None,
            image: None,
            code_block: None,
            id_counts: HashMap::new(),
            in_table_head: false,
            alignments: Vec::new(),
            cell_index: 0,
        }
    }

    fn render<'a>(mut self, events: impl Iterator<Item = Event<'a>>) -> String {
        for event in events {
            self.process_event(event);
        }
        self.output
    }

    fn process_event(&mut self, event: Event<'_>) {
        // Inside an image, events only feed the alt text until the image ends.
        if self.image.is_some() {
            match event {
                Event::End(TagEnd::Image) => self.end_image(),
                Event::Text(text) | Event::Code(text) => {
                    if let Some(image) = &mut self.image {
                        image.alt.push_str(&text);
                    }
                }
                _ => {}
            }
            return;
        }

        match event {
            Event::Start(tag) => self.start_tag(tag),
            Event::End(tag) => self.end_tag(tag),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => self.inline_code(&code),
            Event::Html(html) | Event::InlineHtml(html) => self.push_inline(&html),
            Event::SoftBreak | Event::HardBreak => self.line_break(),
            Event::Rule => self.output.push_str("<hr>"),
            Event::TaskListMarker(checked) => self.task_list_marker(checked),
            Event::FootnoteReference(_) | Event::InlineMath(_) | Event::DisplayMath(_) => {}
        }
    }

    fn start_tag(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => self.output.push_str("<p>"),
            Tag::Heading { level, .. } => {
                // Opening tag is written in end_tag once the id is known.
                self.heading = Some(PendingHeading {
                    level: heading_level_to_num(level),
                    html: String::new(),
                    text: String::new(),
                });
            }
            Tag::BlockQuote(_) => self.output.push_str("<blockquote>"),
            Tag::CodeBlock(kind) => {
                let lang = match kind {
                    CodeBlockKind::Fenced(ref info) if !info.is_empty() => {
                        info.split([' ', ',']).next().unwrap_or("")
                    }
                    _ => "",
                };
                self.code_block = Some(PendingCodeBlock {
                    lang: lang.to_owned(),
                    code: String::new(),
                });
            }
            Tag::List(start) => match start {
                Some(1) => self.output.push_str("<ol>"),
                Some(n) => write!(self.output, r#"<ol start="{n}">"#).unwrap(),
                None => self.output.push_str("<ul>"),
            },
            Tag::Item => self.output.push_str("<li>"),
            Tag::Table(alignments) => {
                self.alignments = alignments;
                self.output.push_str("<table>");
            }
            Tag::TableHead => {
                self.in_table_head = true;
                self.cell_index = 0;
                self.output.push_str("<thead><tr>");
            }
            Tag::TableRow => {
                self.cell_index = 0;
                self.output.push_str("<tr>");
            }
            Tag::TableCell => {
                let cell = if self.in_table_head { "th" } else { "td" };
                write!(self.output, "<{cell}{}>", self.alignment_style()).unwrap();
            }
            Tag::Emphasis => self.push_inline("<em>"),
            Tag::Strong => self.push_inline("<strong>"),
            Tag::Strikethrough => self.push_inline("<s>"),
            Tag::Link { dest_url, title, .. } => {
                let mut open = format!(r#"<a href="{}""#, escape_html(&dest_url));
                if !title.is_empty() {
                    write!(open, r#" title="{}""#, escape_html(&title)).unwrap();
                }
                open.push('>');
                self.push_inline(&open);
            }
            Tag::Image { dest_url, title, .. } => {
                self.image = Some(PendingImage {
                    src: dest_url.into_string(),
                    title: title.into_string(),
                    alt: String::new(),
                });
            }
            Tag::FootnoteDefinition(_)
            | Tag::HtmlBlock
            | Tag::MetadataBlock(_)
            | Tag::DefinitionList
            | Tag::DefinitionListTitle
            | Tag::DefinitionListDefinition
            | Tag::Superscript
            | Tag::Subscript => {}
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.output.push_str("</p>"),
            TagEnd::Heading(_) => self.end_heading(),
            TagEnd::BlockQuote(_) => self.output.push_str("</blockquote>"),
            TagEnd::CodeBlock => self.end_code_block(),
            TagEnd::List(ordered) => {
                self.output
                    .push_str(if ordered { "</ol>" } else { "</ul>" });
            }
            TagEnd::Item => self.output.push_str("</li>"),
            TagEnd::Table => self.output.push_str("</tbody></table>"),
            TagEnd::TableHead => {
                self.in_table_head = false;
                self.output.push_str("</tr></thead><tbody>");
            }
            TagEnd::TableRow => self.output.push_str("</tr>"),
            TagEnd::TableCell => {
                self.output
                    .push_str(if self.in_table_head { "</th>" } else { "</td>" });
                self.cell_index += 1;
            }
            TagEnd::Emphasis => self.push_inline("</em>"),
            TagEnd::Strong => self.push_inline("</strong>"),
            TagEnd::Strikethrough => self.push_inline("</s>"),
            TagEnd::Link => self.push_inline("</a>"),
            TagEnd::Image => self.end_image(),
            TagEnd::FootnoteDefinition
            | TagEnd::HtmlBlock
            | TagEnd::MetadataBlock(_)
            | TagEnd::DefinitionList
            | TagEnd::DefinitionListTitle
            | TagEnd::DefinitionListDefinition
            | TagEnd::Superscript
            | TagEnd::Subscript => {}
        }
    }

    /// Push content to output or the heading buffer based on context.
    fn push_inline(&mut self, content: &str) {
        if let Some(heading) = &mut self.heading {
            heading.html.push_str(content);
        } else {
            self.output.push_str(content);
        }
    }

    fn text(&mut self, text: &str) {
        if let Some(block) = &mut self.code_block {
            block.code.push_str(text);
            return;
        }
        let escaped = escape_html(text);
        if let Some(heading) = &mut self.heading {
            heading.text.push_str(text);
            heading.html.push_str(&escaped);
        } else {
            self.output.push_str(&escaped);
        }
    }

    fn inline_code(&mut self, code: &str) {
        if let Some(heading) = &mut self.heading {
            heading.text.push_str(code);
        }
        let escaped = escape_html(code);
        self.push_inline(&format!("<code>{escaped}</code>"));
    }

    /// Soft and hard breaks both render as `<br>` so single newlines in the
    /// source are visible in the preview.
    fn line_break(&mut self) {
        if let Some(block) = &mut self.code_block {
            block.code.push('\n');
            return;
        }
        if let Some(heading) = &mut self.heading {
            heading.text.push(' ');
        }
        self.push_inline("<br>");
    }

    fn task_list_marker(&mut self, checked: bool) {
        self.output.push_str(if checked {
            r#"<input type="checkbox" checked disabled> "#
        } else {
            r#"<input type="checkbox" disabled> "#
        });
    }

    fn end_heading(&mut self) {
        let Some(heading) = self.heading.take() else {
            return;
        };
        let id = self.generate_id(&heading.text);
        let level = heading.level;
        write!(
            self.output,
            r#"<h{level} id="{id}">{}</h{level}>"#,
            heading.html.trim()
        )
        .unwrap();
    }

    fn end_image(&mut self) {
        let Some(image) = self.image.take() else {
            return;
        };
        let title_attr = if image.title.is_empty() {
            String::new()
        } else {
            format!(r#" title="{}""#, escape_html(&image.title))
        };
        let tag = format!(
            r#"<img src="{}"{title_attr} alt="{}">"#,
            escape_html(&image.src),
            escape_html(&image.alt)
        );
        self.push_inline(&tag);
    }

    fn end_code_block(&mut self) {
        let Some(block) = self.code_block.take() else {
            return;
        };
        if block.lang.is_empty() {
            write!(
                self.output,
                "<pre><code>{}</code></pre>",
                escape_html(&block.code)
            )
            .unwrap();
            return;
        }

        // Unrecognized languages fall back to plain escaped text.
        let body = highlight(&block.lang, &block.code)
            .unwrap_or_else(|| escape_html(&block.code));
        write!(
            self.output,
            r#"<pre><code class="language-{}">{body}</code></pre>"#,
            escape_html(&block.lang)
        )
        .unwrap();
    }

    /// Generate a unique id for a heading.
    fn generate_id(&mut self, text: &str) -> String {
        let base_id = slugify(text);
        let count = self.id_counts.entry(base_id.clone()).or_default();
        let id = match *count {
            0 => base_id,
            n => format!("{base_id}-{n}"),
        };
        *count += 1;
        id
    }

    /// Style attribute for the current table cell.
    fn alignment_style(&self) -> &'static str {
        match self.alignments.get(self.cell_index) {
            Some(Alignment::Left) => r#" style="text-align:left""#,
            Some(Alignment::Center) => r#" style="text-align:center""#,
            Some(Alignment::Right) => r#" style="text-align:right""#,
            Some(Alignment::None) | None => "",
        }
    }
}

fn heading_level_to_num(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Convert heading text to a URL-safe slug.
///
/// Lowercases ASCII alphanumerics; whitespace, dashes, and underscores
/// collapse to single dashes; everything else is dropped.
fn slugify(text: &str) -> String {
    let mut result = String::new();
    let mut last_was_dash = true; // Prevents leading dash

    for c in text.trim().chars() {
        if c.is_ascii_alphanumeric() {
            result.push(c.to_ascii_lowercase());
            last_was_dash = false;
        } else if !last_was_dash && (c.is_whitespace() || c == '-' || c == '_') {
            result.push('-');
            last_was_dash = true;
        }
    }

    if result.ends_with('-') {
        result.pop();
    }

    result
}

/// Escape HTML special characters.
#[must_use]
pub(crate) fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_basic_paragraph() {
        assert_eq!(render_markdown("Hello, world!"), "<p>Hello, world!</p>");
    }

    #[test]
    fn test_heading_with_id() {
        assert_eq!(
            render_markdown("## Section Title"),
            r#"<h2 id="section-title">Section Title</h2>"#
        );
    }

    #[test]
    fn test_duplicate_heading_ids() {
        let html = render_markdown("## FAQ\n\n## FAQ\n\n## FAQ");
        assert!(html.contains(r#"<h2 id="faq">"#));
        assert!(html.contains(r#"<h2 id="faq-1">"#));
        assert!(html.contains(r#"<h2 id="faq-2">"#));
    }

    #[test]
    fn test_heading_with_inline_code() {
        assert_eq!(
            render_markdown("## Install `npm`"),
            r#"<h2 id="install-npm">Install <code>npm</code></h2>"#
        );
    }

    #[test]
    fn test_emphasis() {
        assert_eq!(
            render_markdown("*italic* and **bold**"),
            "<p><em>italic</em> and <strong>bold</strong></p>"
        );
    }

    #[test]
    fn test_strikethrough() {
        assert_eq!(render_markdown("~~deleted~~"), "<p><s>deleted</s></p>");
    }

    #[test]
    fn test_unordered_list() {
        assert_eq!(
            render_markdown("- Item 1\n- Item 2"),
            "<ul><li>Item 1</li><li>Item 2</li></ul>"
        );
    }

    #[test]
    fn test_ordered_list() {
        assert_eq!(
            render_markdown("1. First\n2. Second"),
            "<ol><li>First</li><li>Second</li></ol>"
        );
    }

    #[test]
    fn test_ordered_list_custom_start() {
        assert_eq!(
            render_markdown("3. Third\n4. Fourth"),
            r#"<ol start="3"><li>Third</li><li>Fourth</li></ol>"#
        );
    }

    #[test]
    fn test_task_list() {
        let html = render_markdown("- [ ] Unchecked\n- [x] Checked");
        assert!(html.contains(r#"<input type="checkbox" disabled> Unchecked"#));
        assert!(html.contains(r#"<input type="checkbox" checked disabled> Checked"#));
    }

    #[test]
    fn test_table() {
        assert_eq!(
            render_markdown("| A | B |\n|---|---|\n| 1 | 2 |"),
            "<table><thead><tr><th>A</th><th>B</th></tr></thead>\
             <tbody><tr><td>1</td><td>2</td></tr></tbody></table>"
        );
    }

    #[test]
    fn test_table_alignment() {
        let html = render_markdown("| A | B |\n|:-:|--:|\n| 1 | 2 |");
        assert!(html.contains(r#"<th style="text-align:center">A</th>"#));
        assert!(html.contains(r#"<th style="text-align:right">B</th>"#));
        assert!(html.contains(r#"<td style="text-align:center">1</td>"#));
    }

    #[test]
    fn test_code_block_with_language_is_highlighted() {
        let html = render_markdown("```rust\nfn main() {}\n```");
        assert!(html.starts_with(r#"<pre><code class="language-rust">"#));
        assert!(html.ends_with("</code></pre>"));
        assert!(html.contains(r#"<span style="color:"#));
    }

    #[test]
    fn test_code_block_unknown_language_falls_back_to_plain() {
        assert_eq!(
            render_markdown("```mysterylang\nplain text\n```"),
            "<pre><code class=\"language-mysterylang\">plain text\n</code></pre>"
        );
    }

    #[test]
    fn test_code_block_without_language() {
        assert_eq!(
            render_markdown("```\nplain code\n```"),
            "<pre><code>plain code\n</code></pre>"
        );
    }

    #[test]
    fn test_code_block_escapes_content() {
        let html = render_markdown("```html\n<script>alert(1)</script>\n```");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;"));
    }

    #[test]
    fn test_blockquote() {
        assert_eq!(
            render_markdown("> Note"),
            "<blockquote><p>Note</p></blockquote>"
        );
    }

    #[test]
    fn test_link() {
        assert_eq!(
            render_markdown("[docs](https://example.com)"),
            r#"<p><a href="https://example.com">docs</a></p>"#
        );
    }

    #[test]
    fn test_link_with_title() {
        assert_eq!(
            render_markdown(r#"[docs](https://example.com "The Docs")"#),
            r#"<p><a href="https://example.com" title="The Docs">docs</a></p>"#
        );
    }

    #[test]
    fn test_image() {
        assert_eq!(
            render_markdown("![Alt text](image.png)"),
            r#"<p><img src="image.png" alt="Alt text"></p>"#
        );
    }

    #[test]
    fn test_image_with_title() {
        assert_eq!(
            render_markdown(r#"![Alt](img.png "Title")"#),
            r#"<p><img src="img.png" title="Title" alt="Alt"></p>"#
        );
    }

    #[test]
    fn test_soft_break_renders_hard_break() {
        assert_eq!(
            render_markdown("line one\nline two"),
            "<p>line one<br>line two</p>"
        );
    }

    #[test]
    fn test_horizontal_rule() {
        assert_eq!(render_markdown("a\n\n---\n\nb"), "<p>a</p><hr><p>b</p>");
    }

    #[test]
    fn test_raw_html_passes_through() {
        let html = render_markdown("<div class=\"note\">\nraw\n</div>");
        assert!(html.contains(r#"<div class="note">"#));
        assert!(!html.contains("&lt;div"));
    }

    #[test]
    fn test_inline_html_passes_through() {
        assert_eq!(
            render_markdown("press <kbd>K</kbd> now"),
            "<p>press <kbd>K</kbd> now</p>"
        );
    }

    #[test]
    fn test_text_is_escaped() {
        assert_eq!(render_markdown("a < b & c"), "<p>a &lt; b &amp; c</p>");
    }

    #[test]
    fn test_smart_punctuation() {
        assert_eq!(render_markdown("\"Hello\""), "<p>\u{201c}Hello\u{201d}</p>");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("What's New?"), "whats-new");
        assert_eq!(slugify("  Spaces  "), "spaces");
        assert_eq!(slugify("Multiple   Spaces"), "multiple-spaces");
        assert_eq!(slugify("kebab-case"), "kebab-case");
        assert_eq!(slugify("snake_case"), "snake-case");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<script>"), "&lt;script&gt;");
        assert_eq!(escape_html("a & b"), "a &amp; b");
        assert_eq!(escape_html(r#""quoted""#), "&quot;quoted&quot;");
        assert_eq!(escape_html("it's"), "it&#x27;s");
    }
}
