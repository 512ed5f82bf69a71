//! Rigger - provision machines over SSH from declarative resources

use std::process::ExitCode;

use clap::Parser;
use rigger_cli::cli::Cli;
use rigger_cli::output::json;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let as_json = cli.json;
    match cli.run().await {
        Ok(code) => code,
        Err(e) => {
            if as_json && let Ok(out) = json::format_error(&format!("{e:#}"), "ERROR") {
                println!("{out}");
            } else {
                eprintln!("Error: {e:#}");
            }
            ExitCode::FAILURE
        }
    }
}
