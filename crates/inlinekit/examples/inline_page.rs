//! Example: Inline a live page and print a summary
//!
//! Run with: cargo run -p inlinekit --example inline_page -- <URL>
//!
//! Defaults to https://example.com when no URL is given.

use inlinekit::inline;

#[tokio::main]
async fn main() {
    let target = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://example.com".to_string());

    println!("Inlining {}", target);

    match inline(&target).await {
        Ok(output) => {
            println!("Base URL:  {}", output.base_url);
            println!("Size:      {} bytes", output.html.len());
            println!("Inlined:   {} resources", output.report.inlined);

            if output.report.has_failures() {
                println!("Failed:    {} resources", output.report.failures.len());
                for failure in &output.report.failures {
                    println!("  [{}] {}: {}", failure.kind, failure.url, failure.error);
                }
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
