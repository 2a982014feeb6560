use std::env;
use std::path::{Path, PathBuf};

use bench_launcher_core::prelude::LaunchError;

use crate::types::LauncherResult;

/// Environment variable to override the path to the bench binary.
pub const BENCH_LAUNCHER_BIN_ENV: &str = "BENCH_LAUNCHER_BIN";

/// Name of the bench binary looked up on the user's `PATH` when no path is configured.
pub const DEFAULT_BENCH_BIN: &str = "ov_mlperf";

/// Get the path to the bench binary.
///
/// An `explicit` path, from the command line or a config file, is used as is. Otherwise the
/// [`BENCH_LAUNCHER_BIN_ENV`] environment variable is used if set. If it is not set then
/// [`DEFAULT_BENCH_BIN`] is looked up in the system's `PATH`.
///
/// Returns a [`LaunchError`] if the resolved path does not exist.
pub fn bench_binary_path(explicit: Option<&Path>) -> LauncherResult<PathBuf> {
    if let Some(path) = explicit {
        return existing_path(path.to_path_buf(), "configured bench binary");
    }

    match env::var(BENCH_LAUNCHER_BIN_ENV).ok().as_deref() {
        Some("") => {
            Err(LaunchError::new(format!("'{BENCH_LAUNCHER_BIN_ENV}' set to empty string")).into())
        }
        Some(path) => existing_path(
            PathBuf::from(path),
            &format!("bench binary from '{BENCH_LAUNCHER_BIN_ENV}'"),
        ),
        None => {
            log::warn!(
                "'{BENCH_LAUNCHER_BIN_ENV}' is not set so looking for '{DEFAULT_BENCH_BIN}' in user's 'PATH'"
            );
            which::which(DEFAULT_BENCH_BIN).map_err(|e| {
                LaunchError::new(format!(
                    "'{DEFAULT_BENCH_BIN}' not found in PATH ({e}). Install it or set '{BENCH_LAUNCHER_BIN_ENV}' to the correct path."
                ))
                .into()
            })
        }
    }
}

fn existing_path(path: PathBuf, origin: &str) -> LauncherResult<PathBuf> {
    if !path.exists() {
        return Err(LaunchError::new(format!(
            "{origin} '{}' doesn't exist",
            path.display()
        ))
        .into());
    }

    Ok(path)
}

/// Check that `path` is a regular file the current user may execute.
///
/// This is a pre-flight check so that missing files and permission problems are reported clearly.
/// Spawning can still fail for other reasons.
pub fn check_executable(path: &Path) -> Result<(), LaunchError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| LaunchError::with_source(format!("'{}' cannot be read", path.display()), e))?;

    if !metadata.is_file() {
        return Err(LaunchError::new(format!(
            "'{}' is not a file",
            path.display()
        )));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt as _;

        if metadata.permissions().mode() & 0o111 == 0 {
            return Err(LaunchError::new(format!(
                "'{}' lacks execute permission",
                path.display()
            )));
        }
    }

    Ok(())
}
