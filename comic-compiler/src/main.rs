use clap::Parser;
use comic_compiler::cli::{run, Cli};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing for the CLI.
    tracing_subscriber::fmt::init();
    tracing::info!("CLI application startup: tracing initialised");

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // --help and --version are not errors.
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };
    tracing::info!("CLI arguments parsed, invoking run");

    tokio::select! {
        result = run(cli) => match result {
            Ok(summary) if summary.succeeded() => {
                tracing::info!("CLI completed successfully");
                ExitCode::SUCCESS
            }
            Ok(_) => {
                tracing::error!("CLI finished without creating any files");
                ExitCode::FAILURE
            }
            Err(e) => {
                tracing::error!(error = %e, "CLI exited with error");
                eprintln!("Error: {e:#}");
                ExitCode::FAILURE
            }
        },
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted, stopping");
            println!("Operation cancelled by user");
            // Runtime shutdown would wait for in-flight assembly. Documents
            // only appear through an atomic rename.
            std::process::exit(1)
        }
    }
}
