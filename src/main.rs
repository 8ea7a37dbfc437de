mod channel;
mod cli;
mod logging;
mod model;
mod oracle;
mod orchestrator;
mod protocol;
#[cfg(feature = "tui")]
mod tui;

use anyhow::Result;
use clap::Parser;
use logging::LogTarget;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let is_headless = args.is_headless();

    let target = match (&args.log_file, is_headless) {
        (Some(path), _) => LogTarget::File(path.clone()),
        (None, true) => LogTarget::Stderr,
        (None, false) => LogTarget::File(logging::default_log_file()),
    };
    logging::init(args.log_level.as_deref(), &target)?;

    match cli::run(args).await {
        Ok(()) => {
            // The stdin reader thread may still be parked on a read; exit explicitly.
            if is_headless {
                std::process::exit(0);
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = ?e, "exiting");
            Err(e)
        }
    }
}
