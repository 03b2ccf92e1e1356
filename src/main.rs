pub(crate) mod ai;
mod cli;
pub(crate) mod config;
mod confirm;
mod error;
pub(crate) mod git;
mod logging;
mod pipeline;

pub(crate) use error::{AppError, AppResult};

use clap::Parser;
use std::process::exit;
use tracing_indicatif::indicatif_eprintln;

/// The line printed for an error that ends the run.
fn fatal_message(e: &AppError) -> String {
    format!("Error: {e}")
}

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();
    logging::setup_logger(
        cli.verbosity.tracing_level_filter(),
        cli::use_color(cli.color),
    );

    // Always printed, whatever the log filter.
    if let Err(e) = cli.run().await {
        indicatif_eprintln!("{}", fatal_message(&e));
        exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_message_keeps_the_generated_commit_message() {
        let e = AppError::CommitExecution {
            message: "fix(core): handle 'quotes'\n\n- one".to_string(),
            detail: "nothing added to commit".to_string(),
        };
        let printed = fatal_message(&e);
        assert!(printed.starts_with("Error: Committing failed."), "{printed}");
        assert!(printed.contains("nothing added to commit"), "{printed}");
        assert!(printed.contains("fix(core): handle 'quotes'\n\n- one"), "{printed}");
    }

    #[test]
    fn fatal_message_names_configuration_errors() {
        let e = AppError::Configuration("config file /nope.json does not exist".to_string());
        assert_eq!(
            fatal_message(&e),
            "Error: Configuration error. config file /nope.json does not exist"
        );
    }
}
