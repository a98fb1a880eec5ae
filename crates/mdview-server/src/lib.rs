//! HTTP server and live reload core for mdview.
//!
//! Serves one rendered markdown file and pushes a reload signal to every
//! connected browser whenever the file changes on disk.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::path::PathBuf;
//! use mdview_server::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ServerConfig {
//!         port: 3000,
//!         file_path: PathBuf::from("README.md"),
//!     };
//!
//!     let server = Server::bind(config).await.unwrap();
//!     println!("http://localhost:{}", server.port());
//!     server.run().await.unwrap();
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! Browser ──HTTP──► Rust axum server (mdview-server)
//!                        │
//!                        ├─► GET /    rendered page (mdview-renderer)
//!                        │
//!                        └─► GET /ws  viewer session ──► ReloadHub
//!                                                           ▲
//!                        file change ──► FileWatcher ───────┘
//! ```
//!
//! The server exits on its own once every viewer has disconnected and
//! stayed away for a grace period, so closing the last browser tab ends
//! the process.

mod app;
mod error;
mod handlers;
mod listener;
mod live_reload;
mod state;

use std::future::IntoFuture;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::net::TcpListener;

use live_reload::{FileWatcher, ReloadHub};
use state::AppState;

pub use error::ServerError;

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Preferred port; the next nine are tried when it is taken.
    pub port: u16,
    /// Markdown file to serve.
    pub file_path: PathBuf,
}

/// A bound preview server, ready to run.
pub struct Server {
    listener: TcpListener,
    port: u16,
    state: Arc<AppState>,
    _watcher: FileWatcher,
}

impl Server {
    /// Bind a listening socket and start the file watcher.
    ///
    /// # Errors
    ///
    /// Returns an error if no port in the attempted range can be bound or
    /// the file watch cannot be established.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let (listener, port) = listener::acquire(config.port, listener::MAX_PORT_ATTEMPTS).await?;

        let hub = ReloadHub::new();
        let watcher_hub = hub.clone();
        let watcher = FileWatcher::start(&config.file_path, move || {
            tracing::info!("File changed, reloading...");
            watcher_hub.broadcast();
        })?;

        let file_name = config.file_path.file_name().map_or_else(
            || config.file_path.display().to_string(),
            |name| name.to_string_lossy().into_owned(),
        );

        let state = Arc::new(AppState {
            file_path: config.file_path,
            file_name,
            port,
            hub,
        });

        Ok(Self {
            listener,
            port,
            state,
            _watcher: watcher,
        })
    }

    /// Port the server bound, which differs from the requested one when
    /// that was taken.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serve until interrupted or until every viewer has disconnected.
    ///
    /// In-flight sessions are dropped on exit; a reconnecting browser
    /// finds the port closed and keeps retrying on its own.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener fails while serving.
    pub async fn run(self) -> Result<(), ServerError> {
        let hub = self.state.hub.clone();
        let router = app::create_router(Arc::clone(&self.state));

        tracing::info!(port = self.port, "Starting server");

        tokio::select! {
            result = axum::serve(self.listener, router).into_future() => {
                result.map_err(ServerError::Io)
            }
            () = shutdown_signal() => Ok(()),
            () = hub.drained() => Ok(()),
        }
    }
}

/// Wait for shutdown signal (Ctrl-C).
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
