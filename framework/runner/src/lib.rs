mod bench_binary;
mod cli;
mod config;
mod init;
mod launch;
mod run;
mod shutdown;
mod types;

pub mod prelude {
    pub use crate::bench_binary::{
        bench_binary_path, check_executable, BENCH_LAUNCHER_BIN_ENV, DEFAULT_BENCH_BIN,
    };
    pub use crate::cli::{LauncherCli, Preset};
    pub use crate::config::{Mode, RunConfig, RunConfigBuilder, Scenario};
    pub use crate::init::init;
    pub use crate::launch::{launch, launch_with_shutdown, LaunchOutcome};
    pub use crate::run::run;
    pub use crate::types::LauncherResult;
    pub use bench_launcher_core::prelude::{ConfigError, LaunchError, ShutdownHandle};
}
