mod cli;
mod config;
mod engine;
mod error;
mod exit;
mod model;
mod notify;
mod orchestrator;
mod prompt;
mod system;
#[cfg(feature = "tui")]
mod tui;
mod version;

use clap::Parser;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = cli::Cli::parse();

    let default_level = if args.quiet {
        tracing::Level::ERROR
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let outcome = cli::run(args).await;
    std::process::exit(outcome.code());
}
