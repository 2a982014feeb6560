use std::env;
use std::ffi::OsStr;
use std::path::Path;

use bench_launcher_core::prelude::ShutdownHandle;
use bench_launcher_summary_model::{append_run_summary, RunSummary};

use crate::bench_binary::{bench_binary_path, BENCH_LAUNCHER_BIN_ENV};
use crate::cli::LauncherCli;
use crate::launch::{launch_forwarding_ctrl_c, LaunchOutcome};
use crate::types::LauncherResult;

/// Environment variables that are recorded in the run summary when set.
const SUMMARY_ENV_VARS: &[&str] = &[BENCH_LAUNCHER_BIN_ENV, "OMP_NUM_THREADS", "KMP_AFFINITY"];

/// Run the launcher as configured on the command line and return the exit code to exit with.
pub fn run(cli: LauncherCli) -> LauncherResult<i32> {
    let builder = cli.to_builder()?;
    let bench_bin = builder.bench_bin().map(Path::to_path_buf);
    let config = builder.build()?;
    config.validate()?;

    let bench_binary = bench_binary_path(bench_bin.as_deref())?;
    log::debug!("Using bench binary: {}", bench_binary.display());

    if cli.dry_run {
        println!("{}", command_line(&bench_binary, config.to_args().as_slice()));
        return Ok(0);
    }

    let run_id = nanoid::nanoid!(10);
    let started_at = chrono::Utc::now().timestamp();
    let scenario = config.scenario().to_string();
    let mode = config.mode().to_string();

    log::info!("Starting run {run_id}");
    let outcome = launch_forwarding_ctrl_c(config, &bench_binary, &ShutdownHandle::new())?;

    if let Some(path) = &cli.run_summary {
        let summary = summarise(run_id, scenario, mode, started_at, &bench_binary, &outcome);
        log::info!("Run fingerprint: {}", summary.fingerprint());

        // The run itself is done, so a summary that cannot be written must not hide its exit code.
        if let Err(e) = append_run_summary(&summary, path) {
            log::error!("Failed to write run summary to {}: {e:?}", path.display());
        }
    }

    Ok(outcome.exit_code)
}

fn summarise(
    run_id: String,
    scenario: String,
    mode: String,
    started_at: i64,
    bench_binary: &Path,
    outcome: &LaunchOutcome,
) -> RunSummary {
    let mut summary = RunSummary::new(
        run_id,
        scenario,
        mode,
        started_at,
        bench_binary.display().to_string(),
        outcome
            .args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect(),
        env!("CARGO_PKG_VERSION").to_string(),
    );
    summary.set_outcome(
        outcome.exit_code,
        u64::try_from(outcome.duration.as_millis()).unwrap_or(u64::MAX),
        outcome.interrupted,
    );

    for key in SUMMARY_ENV_VARS {
        if let Ok(value) = env::var(key) {
            summary.add_env(key.to_string(), value);
        }
    }

    summary
}

/// Render the command for display, quoting tokens that a POSIX shell would split or expand.
pub(crate) fn command_line(bench_binary: &Path, args: &[impl AsRef<OsStr>]) -> String {
    std::iter::once(bench_binary.as_os_str())
        .chain(args.iter().map(AsRef::as_ref))
        .map(|token| shell_quote(&token.to_string_lossy()))
        .collect::<Vec<_>>()
        .join(" ")
}

fn shell_quote(token: &str) -> String {
    let plain = !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if plain {
        token.to_string()
    } else {
        format!("'{}'", token.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn command_line_quotes_only_when_needed() {
        let line = command_line(
            Path::new("/opt/bench/ov_mlperf"),
            &["--scenario", "Server", "--data_path", "/data/my set", "--model_name", "it's"],
        );
        assert_eq!(
            line,
            r"/opt/bench/ov_mlperf --scenario Server --data_path '/data/my set' --model_name 'it'\''s'"
        );
    }

    #[test]
    fn empty_token_is_quoted() {
        assert_eq!(shell_quote(""), "''");
    }

    #[test]
    fn summary_records_outcome() {
        let outcome = LaunchOutcome {
            exit_code: 3,
            interrupted: false,
            duration: Duration::from_millis(1500),
            args: vec!["--scenario".into(), "Offline".into()],
        };

        let summary = summarise(
            "abc".to_string(),
            "Offline".to_string(),
            "Performance".to_string(),
            1_700_000_000,
            Path::new("/opt/bench/ov_mlperf"),
            &outcome,
        );

        assert_eq!(summary.exit_code, 3);
        assert_eq!(summary.duration_ms, 1500);
        assert!(!summary.interrupted);
        assert_eq!(summary.args, vec!["--scenario", "Offline"]);
        assert_eq!(summary.bench_binary, "/opt/bench/ov_mlperf");
    }
}
