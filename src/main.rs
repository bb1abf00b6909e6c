//! convo-tracker binary entry point.

use std::process::ExitCode;

use convo_tracker::api::serve_with_state;
use convo_tracker::cli::{self, Args};
use convo_tracker::config::Config;
use convo_tracker::logging;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("Try 'convo-tracker --help' for more information.");
            return ExitCode::from(2);
        }
    };

    if args.help {
        cli::print_help();
        return ExitCode::SUCCESS;
    }
    if args.version {
        cli::print_version();
        return ExitCode::SUCCESS;
    }

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load(args)?;
    logging::init_with_filter(config.log_filter())?;

    info!("convo-tracker v{}", env!("CARGO_PKG_VERSION"));

    let server_config = config.to_server_config()?;
    let state = config.to_app_state()?;
    info!(backend = %config.storage.backend, "document store opened");

    serve_with_state(server_config, state).await?;
    Ok(())
}
