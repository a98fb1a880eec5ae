//! Markdown rendering and HTML page assembly.
//!
//! [`render_markdown`] converts a markdown document into an HTML fragment
//! with GitHub-flavored extensions and syntax-highlighted code blocks;
//! [`render_page`] wraps a fragment in the full preview document, including
//! the live-reload client script.
//!
//! # Example
//!
//! ```
//! use mdview_renderer::{render_markdown, render_page};
//!
//! let html = render_markdown("# Hello\n\n**Bold** text");
//! let page = render_page("README.md", &html, 3000);
//! assert!(page.contains("<strong>Bold</strong>"));
//! ```

mod highlight;
mod markdown;
mod page;

pub use markdown::render_markdown;
pub use page::render_page;
