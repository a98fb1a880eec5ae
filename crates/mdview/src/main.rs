//! mdview CLI - local markdown preview with live reload.
//!
//! Serves one markdown file over HTTP and reloads every connected tab
//! when the file changes on disk. The process exits once the last tab
//! is closed.

mod error;
mod output;

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use mdview_server::{Server, ServerConfig};
use tracing_subscriber::EnvFilter;

use error::CliError;
use output::Output;

/// Delay before opening the browser, giving the server time to accept.
const BROWSER_OPEN_DELAY: Duration = Duration::from_millis(500);

/// Local markdown file viewer with live reload.
#[derive(Debug, Parser)]
#[command(name = "mdview", version, about)]
struct Cli {
    /// Markdown file to serve.
    file: PathBuf,

    /// Port to serve on.
    #[arg(
        short,
        long,
        default_value_t = 3000,
        env = "MDVIEW_PORT",
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    port: u16,

    /// Don't open the browser automatically.
    #[arg(long)]
    no_browser: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(err) = validate_file(&cli.file) {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }

    let rt = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");
    if let Err(err) = rt.block_on(run(cli, &output)) {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}

/// Check the file exists and is readable before the server starts.
fn validate_file(path: &Path) -> Result<(), CliError> {
    if !path.is_file() {
        return Err(CliError::FileNotFound(path.to_path_buf()));
    }

    match std::fs::File::open(path) {
        Ok(_) => Ok(()),
        Err(source) => Err(CliError::FileUnreadable {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Bind the server, announce it, and serve until it stops itself.
async fn run(cli: Cli, output: &Output) -> Result<(), CliError> {
    let server = Server::bind(ServerConfig {
        port: cli.port,
        file_path: cli.file.clone(),
    })
    .await?;
    let port = server.port();
    if port != cli.port {
        output.warning(&format!(
            "Port {} is in use, using port {port} instead",
            cli.port
        ));
    }

    let file_name = cli
        .file
        .file_name()
        .map_or_else(|| cli.file.display().to_string(), |name| name.to_string_lossy().into_owned());
    output.info(&format!("Serving {file_name} at http://localhost:{port}"));
    output.info("Press Ctrl+C to stop");

    if !cli.no_browser {
        tokio::spawn(open_browser(port));
    }

    server.run().await?;
    Ok(())
}

/// Open the default browser on the served page.
async fn open_browser(port: u16) {
    let output = Output::new();
    tokio::time::sleep(BROWSER_OPEN_DELAY).await;

    let url = format!("http://localhost:{port}");
    if let Err(err) = open::that(&url) {
        output.warning(&format!("Failed to open browser: {err}"));
        output.warning(&format!("Please open {url} manually"));
    }
}
