mod cli;

use clap::Parser;
use feedback_themes::logging;
use tracing::error;

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();
    logging::setup_logger(cli.cmd.verbosity().tracing_level_filter());
    if let Err(e) = cli.cmd.run().await {
        error!("{e}");
        std::process::exit(1);
    }
}
