//! Runs the bench binary as a [`Child`] process for a single [`RunConfig`].

use std::ffi::OsString;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use anyhow::Context;
use bench_launcher_core::prelude::{LaunchError, ShutdownHandle};
use tokio::process::{Child, Command};

use crate::bench_binary::check_executable;
use crate::config::RunConfig;
use crate::shutdown::start_shutdown_listener;
use crate::types::LauncherResult;

/// Exit code reported when the bench binary ended without a code or a signal.
const UNKNOWN_EXIT_CODE: i32 = 1;

/// How a launch finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOutcome {
    /// The exit code of the bench binary, unchanged.
    ///
    /// If the process was terminated by a signal this is `128 + signal`, as a shell would report.
    pub exit_code: i32,
    /// Whether an interrupt was forwarded to the bench binary.
    pub interrupted: bool,
    /// How long the bench binary ran for.
    pub duration: Duration,
    /// The arguments that were passed to the bench binary.
    pub args: Vec<OsString>,
}

/// Launch the bench binary at `bench_binary` with the arguments from `config` and wait for it to
/// exit, returning its exit code.
///
/// See [`launch_with_shutdown`] for details.
pub fn launch(config: RunConfig, bench_binary: &Path) -> LauncherResult<i32> {
    launch_with_shutdown(config, bench_binary, &ShutdownHandle::new())
        .map(|outcome| outcome.exit_code)
}

/// Launch the bench binary and block until it exits.
///
/// The working directory and environment are inherited, and so are stdout and stderr, so the
/// output of the bench binary streams through untouched.
///
/// Fails with a [`bench_launcher_core::prelude::ConfigError`] if the config is missing required
/// fields, and with a [`LaunchError`] if the bench binary cannot be started. Both are detected
/// before anything is spawned where possible.
///
/// If `shutdown` is triggered while the bench binary is running then SIGINT is forwarded to it and
/// the launcher waits for it to exit. No signal handlers are installed, so Ctrl-C keeps whatever
/// meaning the calling process gave it.
///
/// This may be called from inside an async runtime. The wait then happens on a separate thread,
/// but the calling thread is still blocked until the bench binary exits.
pub fn launch_with_shutdown(
    config: RunConfig,
    bench_binary: &Path,
    shutdown: &ShutdownHandle,
) -> LauncherResult<LaunchOutcome> {
    launch_inner(config, bench_binary, shutdown, false)
}

/// As [`launch_with_shutdown`], but Ctrl-C received by this process also triggers `shutdown`.
///
/// The SIGINT handler stays installed for the rest of the process, so this is only for the
/// launcher binary.
pub(crate) fn launch_forwarding_ctrl_c(
    config: RunConfig,
    bench_binary: &Path,
    shutdown: &ShutdownHandle,
) -> LauncherResult<LaunchOutcome> {
    launch_inner(config, bench_binary, shutdown, true)
}

fn launch_inner(
    config: RunConfig,
    bench_binary: &Path,
    shutdown: &ShutdownHandle,
    listen_for_ctrl_c: bool,
) -> LauncherResult<LaunchOutcome> {
    config.validate()?;
    check_executable(bench_binary)?;

    let args = config.to_args();

    log::info!(
        "Launching {} for scenario {} in {} mode",
        bench_binary.display(),
        config.scenario(),
        config.mode()
    );
    log::debug!("Bench binary arguments: {args:?}");

    let wait = || wait_for_bench_binary(bench_binary, &args, shutdown, listen_for_ctrl_c);
    let (status, interrupted, duration) = if tokio::runtime::Handle::try_current().is_ok() {
        log::debug!("Called from inside an async runtime, waiting on a separate thread");
        std::thread::scope(|scope| scope.spawn(wait).join())
            .map_err(|_| anyhow::anyhow!("Thread waiting for the bench binary panicked"))??
    } else {
        wait()?
    };

    let code = exit_code(status);
    log::info!(
        "Bench binary finished with status: {status} after {:.1}s",
        duration.as_secs_f64()
    );

    Ok(LaunchOutcome {
        exit_code: code,
        interrupted,
        duration,
        args,
    })
}

fn wait_for_bench_binary(
    bench_binary: &Path,
    args: &[OsString],
    shutdown: &ShutdownHandle,
    listen_for_ctrl_c: bool,
) -> LauncherResult<(ExitStatus, bool, Duration)> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create Tokio runtime")?;
    if listen_for_ctrl_c {
        start_shutdown_listener(&runtime, shutdown)?;
    }

    let mut shutdown_listener = shutdown.new_listener();
    runtime.block_on(async {
        let started = Instant::now();
        let mut child = Command::new(bench_binary)
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                LaunchError::with_source(
                    format!("'{}' could not be spawned", bench_binary.display()),
                    e,
                )
            })?;

        log::debug!("Bench binary running with PID: {:?}", child.id());

        let finished = tokio::select! {
            status = child.wait() => Some(status),
            _ = shutdown_listener.wait_for_shutdown() => None,
        };

        let (status, interrupted) = match finished {
            Some(status) => (status, false),
            None => {
                interrupt(&mut child)?;
                log::trace!("Waiting for the bench binary to exit");
                (child.wait().await, true)
            }
        };

        let status = status.context("Failed to wait for the bench binary to exit")?;
        Ok::<_, anyhow::Error>((status, interrupted, started.elapsed()))
    })
}

#[cfg(unix)]
fn interrupt(child: &mut Child) -> LauncherResult<()> {
    use nix::sys::signal::{kill, SIGINT};
    use nix::unistd::Pid;

    // No id means the process has already been reaped.
    let Some(pid) = child.id() else {
        return Ok(());
    };

    log::warn!("Sending SIGINT to the bench binary (PID {pid})");
    let pid = i32::try_from(pid).context("Bench binary PID does not fit a signal target")?;
    kill(Pid::from_raw(pid), SIGINT).context("Failed to send SIGINT to the bench binary")?;

    Ok(())
}

#[cfg(not(unix))]
fn interrupt(child: &mut Child) -> LauncherResult<()> {
    log::warn!("Killing the bench binary");
    child
        .start_kill()
        .context("Failed to kill the bench binary")?;

    Ok(())
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt as _;

        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    UNKNOWN_EXIT_CODE
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::process::ExitStatusExt as _;

    use super::*;

    #[test]
    fn exit_code_passes_code_through() {
        assert_eq!(exit_code(ExitStatus::from_raw(0)), 0);
        assert_eq!(exit_code(ExitStatus::from_raw(3 << 8)), 3);
    }

    #[test]
    fn exit_code_maps_signal_like_a_shell() {
        // Raw wait status for "terminated by SIGINT"
        assert_eq!(exit_code(ExitStatus::from_raw(2)), 130);
    }
}
