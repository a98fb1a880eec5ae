//! HTML page assembly for the preview.
//!
//! Wraps a rendered markdown body in a complete page with GitHub-style
//! CSS and the live-reload script.

use std::fmt::Write;

use crate::markdown::escape_html;

// GitHub-flavored styling for the rendered document.
const PAGE_STYLE: &str = r#"body {
  margin: 0;
  padding: 20px;
  font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Helvetica, Arial, sans-serif;
  font-size: 16px;
  line-height: 1.6;
  color: #24292e;
  background-color: #fff;
}
.markdown-body {
  max-width: 980px;
  margin: 0 auto;
  padding: 45px;
  box-sizing: border-box;
}
.markdown-body h1, .markdown-body h2, .markdown-body h3,
.markdown-body h4, .markdown-body h5, .markdown-body h6 {
  margin-top: 24px;
  margin-bottom: 16px;
  font-weight: 600;
  line-height: 1.25;
}
.markdown-body h1 {
  font-size: 2em;
  border-bottom: 1px solid #eaecef;
  padding-bottom: 0.3em;
}
.markdown-body h2 {
  font-size: 1.5em;
  border-bottom: 1px solid #eaecef;
  padding-bottom: 0.3em;
}
.markdown-body h3 { font-size: 1.25em; }
.markdown-body h4 { font-size: 1em; }
.markdown-body h5 { font-size: 0.875em; }
.markdown-body h6 { font-size: 0.85em; color: #6a737d; }
.markdown-body p {
  margin-top: 0;
  margin-bottom: 16px;
}
.markdown-body a {
  color: #0366d6;
  text-decoration: none;
}
.markdown-body a:hover {
  text-decoration: underline;
}
.markdown-body code {
  padding: 0.2em 0.4em;
  margin: 0;
  font-size: 85%;
  background-color: rgba(27,31,35,0.05);
  border-radius: 3px;
  font-family: "SFMono-Regular", Consolas, "Liberation Mono", Menlo, monospace;
}
.markdown-body pre {
  padding: 16px;
  overflow: auto;
  font-size: 85%;
  line-height: 1.45;
  background-color: #f6f8fa;
  border-radius: 3px;
  margin-bottom: 16px;
}
.markdown-body pre code {
  padding: 0;
  background-color: transparent;
  border-radius: 0;
}
.markdown-body blockquote {
  padding: 0 1em;
  color: #6a737d;
  border-left: 0.25em solid #dfe2e5;
  margin: 0 0 16px 0;
}
.markdown-body ul, .markdown-body ol {
  padding-left: 2em;
  margin-top: 0;
  margin-bottom: 16px;
}
.markdown-body li {
  margin-bottom: 0.25em;
}
.markdown-body table {
  border-collapse: collapse;
  margin-bottom: 16px;
  width: 100%;
}
.markdown-body table th, .markdown-body table td {
  padding: 6px 13px;
  border: 1px solid #dfe2e5;
}
.markdown-body table th {
  font-weight: 600;
  background-color: #f6f8fa;
}
.markdown-body table tr {
  background-color: #fff;
  border-top: 1px solid #c6cbd1;
}
.markdown-body table tr:nth-child(2n) {
  background-color: #f6f8fa;
}
.markdown-body img {
  max-width: 100%;
  box-sizing: border-box;
}
.markdown-body hr {
  height: 0.25em;
  padding: 0;
  margin: 24px 0;
  background-color: #e1e4e8;
  border: 0;
}
"#;

/// Render the complete preview page around a rendered markdown body.
///
/// The embedded script opens a WebSocket to `/ws` on the given port,
/// reloads the page when the server sends `reload`, and reconnects
/// after one second if the connection drops.
#[must_use]
pub fn render_page(file_name: &str, body_html: &str, port: u16) -> String {
    let mut html = String::with_capacity(PAGE_STYLE.len() + body_html.len() + 2048);

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    writeln!(html, "<title>{}</title>", escape_html(file_name)).unwrap();
    html.push_str("<style>\n");
    html.push_str(PAGE_STYLE);
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n");

    html.push_str("<article class=\"markdown-body\">\n");
    html.push_str(body_html);
    html.push_str("\n</article>\n");

    // Live reload: reload on server signal, reconnect while the tab stays open.
    html.push_str("<script>\n");
    html.push_str("function connect() {\n");
    writeln!(html, "  const ws = new WebSocket('ws://localhost:{port}/ws');").unwrap();
    html.push_str("  ws.onmessage = function(event) {\n");
    html.push_str("    if (event.data === 'reload') {\n");
    html.push_str("      location.reload();\n");
    html.push_str("    }\n");
    html.push_str("  };\n");
    html.push_str("  ws.onerror = function() {\n");
    html.push_str("    console.log('WebSocket error, will retry...');\n");
    html.push_str("  };\n");
    html.push_str("  ws.onclose = function() {\n");
    html.push_str("    console.log('WebSocket closed, reconnecting in 1s...');\n");
    html.push_str("    setTimeout(connect, 1000);\n");
    html.push_str("  };\n");
    html.push_str("}\n");
    html.push_str("connect();\n");
    html.push_str("</script>\n");

    html.push_str("</body>\n</html>");
    html
}
