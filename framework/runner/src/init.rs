use clap::Parser;
use env_logger::Env;

use crate::cli::LauncherCli;

/// Initialise logging and parse the command line for the launcher.
///
/// Logs go to stderr at `info` unless `RUST_LOG` says otherwise, so they never mix with the bench
/// binary's stdout.
pub fn init() -> LauncherCli {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    LauncherCli::parse()
}
