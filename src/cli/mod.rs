//! Command-line front end
//!
//! Parses arguments, loads configuration and hands a resolved context to
//! the orchestrator. Nothing here makes decisions about what to run.

pub mod args;
pub mod router;

pub use args::{Cli, Commands, ToolArgs};
pub use router::{execute_command, load_sections};

/// Log filter for a `-v` count
pub fn get_log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        2 => "trace",
        _ => "trace,aws_config=debug,aws_sdk_s3=debug,hyper=debug",
    }
}
