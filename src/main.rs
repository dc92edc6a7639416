use clap::Parser;
use stackctl::cli::{execute_command, get_log_level, Cli};
use stackctl::error::StackError;
use tracing::{debug, trace};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let verbose = cli.verbose;

    tracing_subscriber::fmt()
        .with_env_filter(get_log_level(verbose))
        .with_writer(std::io::stderr)
        .with_target(verbose >= 2)
        .with_thread_ids(verbose >= 3)
        .with_line_number(verbose >= 3)
        .init();

    debug!("stackctl started with verbosity level: {}", verbose);
    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());

    if let Err(e) = execute_command(cli).await {
        debug!("Fatal error: {:?}", e);
        eprintln!("Error: {e:#}");
        let code = e
            .downcast_ref::<StackError>()
            .map(StackError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}
