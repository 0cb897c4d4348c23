use clap::Parser;
use colored::Colorize;
use infrastructure::config::load_env;
use presentation::cli::{Cli, CliApp};
use shared::telemetry::init_logging;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let dotenv = load_env();
    let cli = Cli::parse();
    init_logging(cli.quiet);
    if let Some(path) = dotenv {
        tracing::debug!(path = %path.display(), "loaded environment file");
    }

    let app = CliApp::new(&cli);
    match app.run(&cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}
