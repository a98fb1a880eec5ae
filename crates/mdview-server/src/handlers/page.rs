//! Rendered page endpoint.
//!
//! Re-reads and re-renders the file on every request, so a plain refresh
//! always shows current content even without a live reload signal.

use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use chrono::{DateTime, Utc};
use md5::{Digest, Md5};
use mdview_renderer::{render_markdown, render_page};

use crate::error::ServerError;
use crate::state::AppState;

/// Handle GET /.
pub(crate) async fn get_page(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ServerError> {
    let markdown = tokio::fs::read_to_string(&state.file_path)
        .await
        .map_err(ServerError::FileRead)?;

    let body = render_markdown(&markdown);
    let html = render_page(&state.file_name, &body, state.port);

    // Check If-None-Match header for conditional request
    let etag = compute_etag(&html);
    if let Some(if_none_match) = headers.get(header::IF_NONE_MATCH)
        && if_none_match.as_bytes() == etag.as_bytes()
    {
        return Ok(StatusCode::NOT_MODIFIED.into_response());
    }

    let last_modified: DateTime<Utc> = file_mtime(&state.file_path).await.into();

    Ok((
        [
            (header::ETAG, etag),
            (
                header::LAST_MODIFIED,
                last_modified
                    .format("%a, %d %b %Y %H:%M:%S GMT")
                    .to_string(),
            ),
            (header::CACHE_CONTROL, "no-cache".to_owned()),
        ],
        Html(html),
    )
        .into_response())
}

/// Modification time of the served file, falling back to now when the
/// file vanished between the read and the stat.
async fn file_mtime(path: &Path) -> SystemTime {
    tokio::fs::metadata(path)
        .await
        .and_then(|meta| meta.modified())
        .unwrap_or_else(|_| SystemTime::now())
}

/// Compute `ETag` from the rendered page.
///
/// Uses MD5 truncated to 64 bits (16 hex chars) - sufficient for cache
/// invalidation with negligible collision probability.
fn compute_etag(content: &str) -> String {
    let hash = Md5::digest(content.as_bytes());
    format!("\"{}\"", &hex::encode(hash)[..16])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live_reload::ReloadHub;

    fn test_state(file_path: std::path::PathBuf) -> Arc<AppState> {
        let file_name = file_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Arc::new(AppState {
            file_path,
            file_name,
            port: 3000,
            hub: ReloadHub::new(),
        })
    }

    #[test]
    fn test_compute_etag_is_quoted_and_short() {
        let etag = compute_etag("content");
        assert!(etag.starts_with('"'));
        assert!(etag.ends_with('"'));
        assert_eq!(etag.len(), 18);
    }

    #[test]
    fn test_compute_etag_changes_with_content() {
        assert_ne!(compute_etag("content1"), compute_etag("content2"));
    }

    #[tokio::test]
    async fn test_get_page_renders_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.md");
        std::fs::write(&path, "# Title\n\nBody text.").unwrap();
        let state = test_state(path);

        let response = get_page(State(Arc::clone(&state)), HeaderMap::new())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(header::ETAG));
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "no-cache"
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains(r#"<h1 id="title">Title</h1>"#));
        assert!(html.contains("<title>note.md</title>"));
        assert!(html.contains("ws://localhost:3000/ws"));
    }

    #[tokio::test]
    async fn test_get_page_not_modified_with_matching_etag() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.md");
        std::fs::write(&path, "stable content").unwrap();
        let state = test_state(path);

        let first = get_page(State(Arc::clone(&state)), HeaderMap::new())
            .await
            .unwrap();
        let etag = first.headers().get(header::ETAG).unwrap().clone();

        let mut headers = HeaderMap::new();
        headers.insert(header::IF_NONE_MATCH, etag);
        let second = get_page(State(state), headers).await.unwrap();

        assert_eq!(second.status(), StatusCode::NOT_MODIFIED);
    }

    #[tokio::test]
    async fn test_get_page_missing_file_is_internal_error() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path().join("gone.md"));

        let err = get_page(State(state), HeaderMap::new()).await.unwrap_err();
        let response = err.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.starts_with("Error rendering markdown:"));
    }
}
