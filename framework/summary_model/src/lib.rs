use itertools::Itertools;
use serde::{Deserialize, Serialize};
use sha3::Digest;
use std::collections::HashMap;
use std::io::{BufRead, Read, Write};
use std::path::Path;

/// Summary of a single bench binary launch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    /// The unique run id
    ///
    /// Chosen by the launcher. Unique for each run.
    pub run_id: String,
    /// The load generation scenario, for example `Server`
    pub scenario: String,
    /// The measurement mode, `Accuracy` or `Performance`
    pub mode: String,
    /// The time the run started
    ///
    /// This is a Unix timestamp in seconds.
    pub started_at: i64,
    /// Wall clock time the bench binary ran for, in milliseconds
    pub duration_ms: u64,
    /// The exit code reported by the bench binary
    ///
    /// When the process was killed by a signal this is `128 + signal`.
    pub exit_code: i32,
    /// Whether an interrupt was forwarded to the bench binary before it exited
    pub interrupted: bool,
    /// The executable that was launched
    pub bench_binary: String,
    /// The arguments passed to the bench binary, in order
    pub args: Vec<String>,
    /// Environment variables set for the run
    ///
    /// This won't capture all environment variables. Just the ones that the launcher is aware of.
    pub env: HashMap<String, String>,
    /// The version of the launcher that was used for this run
    pub launcher_version: String,
}

impl RunSummary {
    /// Create a new run summary, before the outcome of the run is known
    pub fn new(
        run_id: String,
        scenario: String,
        mode: String,
        started_at: i64,
        bench_binary: String,
        args: Vec<String>,
        launcher_version: String,
    ) -> Self {
        Self {
            run_id,
            scenario,
            mode,
            started_at,
            duration_ms: 0,
            exit_code: 0,
            interrupted: false,
            bench_binary,
            args,
            env: HashMap::with_capacity(0),
            launcher_version,
        }
    }

    /// Record how the run finished
    pub fn set_outcome(&mut self, exit_code: i32, duration_ms: u64, interrupted: bool) {
        self.exit_code = exit_code;
        self.duration_ms = duration_ms;
        self.interrupted = interrupted;
    }

    /// Add an environment variable
    pub fn add_env(&mut self, key: String, value: String) {
        self.env.insert(key, value);
    }

    /// Compute a fingerprint for this run summary
    ///
    /// The fingerprint identifies the configuration used for the run, so that repeated runs of the
    /// same configuration can be grouped. It uses the
    ///     - Scenario
    ///     - Mode
    ///     - Bench binary arguments
    ///     - Selected environment variables
    ///
    /// The fingerprint is computed using [sha3::Sha3_256].
    pub fn fingerprint(&self) -> String {
        let mut hasher = sha3::Sha3_256::new();
        Digest::update(&mut hasher, self.scenario.as_bytes());
        Digest::update(&mut hasher, self.mode.as_bytes());
        for arg in &self.args {
            Digest::update(&mut hasher, arg.as_bytes());
            // Separator, so that ["ab", "c"] and ["a", "bc"] differ
            Digest::update(&mut hasher, [0u8]);
        }
        self.env
            .iter()
            .sorted_by_key(|(k, _)| k.to_owned())
            .for_each(|(k, v)| {
                Digest::update(&mut hasher, k.as_bytes());
                Digest::update(&mut hasher, [0u8]);
                Digest::update(&mut hasher, v.as_bytes());
                Digest::update(&mut hasher, [0u8]);
            });

        format!("{:x}", hasher.finalize())
    }
}

/// Append the run summary to a file
///
/// The summary will be serialized to JSON and output as a single line followed by a newline. The
/// recommended file extension is `.jsonl`.
pub fn append_run_summary(run_summary: &RunSummary, path: impl AsRef<Path>) -> anyhow::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)?;
    store_run_summary(run_summary, &mut file)?;
    file.write_all(b"\n")?;
    Ok(())
}

/// Serialize the run summary to a writer
pub fn store_run_summary<W: Write>(run_summary: &RunSummary, writer: &mut W) -> anyhow::Result<()> {
    serde_json::to_writer(writer, run_summary)?;
    Ok(())
}

/// Load a run summary from a reader
pub fn load_run_summary<R: Read>(reader: R) -> anyhow::Result<RunSummary> {
    let reader = std::io::BufReader::new(reader);
    let run_summary: RunSummary = serde_json::from_reader(reader)?;
    Ok(run_summary)
}

/// Load run summaries from a file
///
/// The file should contain one JSON object per line. This is the format produced by
/// [append_run_summary]. Blank lines are skipped.
pub fn load_run_summaries(path: impl AsRef<Path>) -> anyhow::Result<Vec<RunSummary>> {
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);
    let mut runs = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let run: RunSummary = serde_json::from_str(&line)?;
        runs.push(run);
    }
    Ok(runs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(run_id: &str) -> RunSummary {
        let mut summary = RunSummary::new(
            run_id.to_string(),
            "Server".to_string(),
            "Accuracy".to_string(),
            1_700_000_000,
            "/opt/bench/ov_mlperf".to_string(),
            vec![
                "--scenario".to_string(),
                "Server".to_string(),
                "--nireq".to_string(),
                "28".to_string(),
            ],
            "0.1.0".to_string(),
        );
        summary.add_env("BENCH_LAUNCHER_BIN".to_string(), "/opt/bench/ov_mlperf".to_string());
        summary
    }

    #[test]
    fn fingerprint_ignores_run_identity_and_outcome() {
        let a = sample("a");
        let mut b = sample("b");
        b.set_outcome(3, 1200, true);
        b.started_at += 60;

        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn fingerprint_changes_with_args() {
        let a = sample("a");
        let mut b = sample("a");
        b.args.push("--nthreads".to_string());
        b.args.push("56".to_string());

        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn fingerprint_separates_env_keys_from_values() {
        let mut a = sample("a");
        a.env.clear();
        a.add_env("AB".to_string(), "C".to_string());
        let mut b = sample("a");
        b.env.clear();
        b.add_env("A".to_string(), "BC".to_string());

        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn fingerprint_ignores_launcher_version() {
        let a = sample("a");
        let mut b = sample("a");
        b.launcher_version = "0.2.0".to_string();

        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn append_and_load_summaries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run_summary.jsonl");

        let first = sample("first");
        let mut second = sample("second");
        second.set_outcome(3, 42, false);

        append_run_summary(&first, &path).unwrap();
        append_run_summary(&second, &path).unwrap();

        let loaded = load_run_summaries(&path).unwrap();
        assert_eq!(loaded, vec![first, second]);
    }

    #[test]
    fn load_single_summary_from_reader() {
        let summary = sample("single");
        let mut buf = Vec::new();
        store_run_summary(&summary, &mut buf).unwrap();

        let loaded = load_run_summary(buf.as_slice()).unwrap();
        assert_eq!(loaded, summary);
    }
}
