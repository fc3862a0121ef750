//! inlinekit CLI - turn a web page into a single self-contained file

use clap::Parser;
use inlinekit::{Inliner, DEFAULT_USER_AGENT};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Fetch a page and embed its stylesheets, scripts, fonts and images
#[derive(Parser, Debug)]
#[command(name = "inlinekit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// URL or local path of the page to inline
    target: String,

    /// Write the inlined page to this file instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Custom User-Agent for HTTP requests
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    user_agent: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Print a JSON report of inlined and failed resources to stderr
    #[arg(long)]
    report: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let inliner = Inliner::builder()
        .user_agent(cli.user_agent)
        .timeout(Duration::from_secs(cli.timeout))
        .build();

    // Only the root document is fatal; broken sub-resources show up in
    // the report and the page still comes out
    let result = match inliner.run(&cli.target).await {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if cli.report {
        match serde_json::to_string_pretty(&result.report) {
            Ok(json) => eprintln!("{}", json),
            Err(e) => {
                eprintln!("Error serializing report: {}", e);
                std::process::exit(1);
            }
        }
    }

    match cli.output {
        Some(path) => {
            if let Err(e) = tokio::fs::write(&path, &result.html).await {
                eprintln!("Error writing {}: {}", path.display(), e);
                std::process::exit(1);
            }
        }
        None => writeln_safe(&result.html),
    }
}

/// Write to stdout, exit silently on broken pipe
fn writeln_safe(s: &str) {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = writeln!(handle, "{}", s) {
        if e.kind() == io::ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
        eprintln!("Error writing to stdout: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["inlinekit", "https://example.com"]);
        assert_eq!(cli.target, "https://example.com");
        assert!(cli.output.is_none());
        assert_eq!(cli.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(cli.timeout, 30);
        assert!(!cli.report);
    }

    #[test]
    fn test_cli_output_flag() {
        let cli = Cli::parse_from(["inlinekit", "page.html", "-o", "out.html", "--report"]);
        assert_eq!(cli.output, Some(PathBuf::from("out.html")));
        assert!(cli.report);
    }
}
