use bench_launcher_core::prelude::{ConfigError, LaunchError};
use bench_launcher_runner::prelude::{init, run};

/// Exit code used when the launcher itself fails, before or while starting the bench binary.
const LAUNCHER_FAILURE_EXIT_CODE: i32 = 2;

fn main() {
    let cli = init();

    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            if e.is::<ConfigError>() {
                log::error!("Run configuration rejected, nothing was launched");
            } else if e.is::<LaunchError>() {
                log::error!("The bench binary could not be started");
            }
            eprintln!("Error: {e:?}");
            LAUNCHER_FAILURE_EXIT_CODE
        }
    };

    std::process::exit(exit_code);
}
