use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context;
use bench_launcher_core::prelude::ConfigError;
use serde::Deserialize;

use crate::types::LauncherResult;

/// The load generation pattern the bench binary should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display, Deserialize)]
#[serde(try_from = "String")]
pub enum Scenario {
    Server,
    Offline,
    SingleStream,
    MultiStream,
}

impl FromStr for Scenario {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "server" => Ok(Scenario::Server),
            "offline" => Ok(Scenario::Offline),
            "singlestream" => Ok(Scenario::SingleStream),
            "multistream" => Ok(Scenario::MultiStream),
            _ => Err(ConfigError::new(format!(
                "unknown scenario '{s}', expected one of Server, Offline, SingleStream, MultiStream"
            ))),
        }
    }
}

impl TryFrom<String> for Scenario {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Whether the run measures correctness or throughput and latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display, Deserialize)]
#[serde(try_from = "String")]
pub enum Mode {
    Accuracy,
    Performance,
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "accuracy" => Ok(Mode::Accuracy),
            "performance" => Ok(Mode::Performance),
            _ => Err(ConfigError::new(format!(
                "unknown mode '{s}', expected Accuracy or Performance"
            ))),
        }
    }
}

impl TryFrom<String> for Mode {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// The parameters for a single bench binary run.
///
/// Must be created with a [`RunConfigBuilder`]. Once built the configuration cannot be changed, and
/// it is consumed by [`crate::launch::launch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    scenario: Scenario,
    mode: Mode,
    mlperf_conf: Option<PathBuf>,
    user_conf: Option<PathBuf>,
    model_name: Option<String>,
    data_path: Option<PathBuf>,
    nireq: Option<u32>,
    nthreads: Option<u32>,
    nstreams: Option<u32>,
    total_sample_count: Option<u32>,
    warmup_iters: Option<u32>,
    model_path: Option<PathBuf>,
}

impl RunConfig {
    pub fn scenario(&self) -> Scenario {
        self.scenario
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn mlperf_conf(&self) -> Option<&Path> {
        self.mlperf_conf.as_deref()
    }

    pub fn user_conf(&self) -> Option<&Path> {
        self.user_conf.as_deref()
    }

    pub fn model_name(&self) -> Option<&str> {
        self.model_name.as_deref()
    }

    pub fn data_path(&self) -> Option<&Path> {
        self.data_path.as_deref()
    }

    pub fn nireq(&self) -> Option<u32> {
        self.nireq
    }

    pub fn nthreads(&self) -> Option<u32> {
        self.nthreads
    }

    pub fn nstreams(&self) -> Option<u32> {
        self.nstreams
    }

    pub fn total_sample_count(&self) -> Option<u32> {
        self.total_sample_count
    }

    pub fn warmup_iters(&self) -> Option<u32> {
        self.warmup_iters
    }

    pub fn model_path(&self) -> Option<&Path> {
        self.model_path.as_deref()
    }

    /// Check that everything the bench binary cannot run without is present.
    ///
    /// Paths are not checked for existence, that is left to the bench binary.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model_path.is_none() {
            return Err(ConfigError::missing("model_path"));
        }

        Ok(())
    }

    /// The command line tokens for the bench binary.
    ///
    /// Each set field becomes a flag followed by its value, in field declaration order. Unset
    /// fields produce nothing.
    pub fn to_args(&self) -> Vec<OsString> {
        let mut args = Vec::new();

        push_arg(&mut args, "--scenario", Some(self.scenario.to_string()));
        push_arg(&mut args, "--mode", Some(self.mode.to_string()));
        push_arg(&mut args, "--mlperf_conf", self.mlperf_conf.as_ref());
        push_arg(&mut args, "--user_conf", self.user_conf.as_ref());
        push_arg(&mut args, "--model_name", self.model_name.as_ref());
        push_arg(&mut args, "--data_path", self.data_path.as_ref());
        push_arg(&mut args, "--nireq", self.nireq.map(|v| v.to_string()));
        push_arg(&mut args, "--nthreads", self.nthreads.map(|v| v.to_string()));
        push_arg(&mut args, "--nstreams", self.nstreams.map(|v| v.to_string()));
        push_arg(
            &mut args,
            "--total_sample_count",
            self.total_sample_count.map(|v| v.to_string()),
        );
        push_arg(
            &mut args,
            "--warmup_iters",
            self.warmup_iters.map(|v| v.to_string()),
        );
        push_arg(&mut args, "--model_path", self.model_path.as_ref());

        args
    }
}

fn push_arg<V: Into<OsString>>(args: &mut Vec<OsString>, flag: &str, value: Option<V>) {
    if let Some(value) = value {
        args.push(flag.into());
        args.push(value.into());
    }
}

/// Collects the fields of a [`RunConfig`] from any mix of presets, a TOML file and CLI flags.
///
/// Every field is optional here. Required fields are checked by [`RunConfigBuilder::build`] and
/// [`RunConfig::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfigBuilder {
    scenario: Option<Scenario>,
    mode: Option<Mode>,
    mlperf_conf: Option<PathBuf>,
    user_conf: Option<PathBuf>,
    model_name: Option<String>,
    data_path: Option<PathBuf>,
    nireq: Option<u32>,
    nthreads: Option<u32>,
    nstreams: Option<u32>,
    total_sample_count: Option<u32>,
    warmup_iters: Option<u32>,
    model_path: Option<PathBuf>,

    /// The executable to launch. Not passed to the bench binary.
    bench_bin: Option<PathBuf>,
}

impl RunConfigBuilder {
    /// The fixed Server/Accuracy invocation the launcher was first written for.
    pub fn server_accuracy_preset() -> Self {
        Self::default()
            .with_scenario(Scenario::Server)
            .with_mode(Mode::Accuracy)
            .with_nireq(28)
            .with_nthreads(56)
            .with_nstreams(14)
            .with_total_sample_count(5000)
            .with_warmup_iters(500)
    }

    /// Parse a builder from the contents of a TOML run config file.
    ///
    /// Keys are the field names, for example `nireq = 28`, plus `bench_bin`. Unknown keys are
    /// rejected.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::new(format!("bad config file: {e}")))
    }

    /// Read and parse a TOML run config file.
    pub fn from_file(path: &Path) -> LauncherResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::new(format!(
                "failed to read config file '{}': {e}",
                path.display()
            ))
        })?;

        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to load run config from '{}'", path.display()))
    }

    pub fn with_scenario(mut self, scenario: Scenario) -> Self {
        self.scenario = Some(scenario);
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_mlperf_conf(mut self, path: impl Into<PathBuf>) -> Self {
        self.mlperf_conf = Some(path.into());
        self
    }

    pub fn with_user_conf(mut self, path: impl Into<PathBuf>) -> Self {
        self.user_conf = Some(path.into());
        self
    }

    pub fn with_model_name(mut self, name: impl Into<String>) -> Self {
        self.model_name = Some(name.into());
        self
    }

    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = Some(path.into());
        self
    }

    pub fn with_nireq(mut self, nireq: u32) -> Self {
        self.nireq = Some(nireq);
        self
    }

    pub fn with_nthreads(mut self, nthreads: u32) -> Self {
        self.nthreads = Some(nthreads);
        self
    }

    pub fn with_nstreams(mut self, nstreams: u32) -> Self {
        self.nstreams = Some(nstreams);
        self
    }

    pub fn with_total_sample_count(mut self, count: u32) -> Self {
        self.total_sample_count = Some(count);
        self
    }

    pub fn with_warmup_iters(mut self, iters: u32) -> Self {
        self.warmup_iters = Some(iters);
        self
    }

    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = Some(path.into());
        self
    }

    pub fn with_bench_bin(mut self, path: impl Into<PathBuf>) -> Self {
        self.bench_bin = Some(path.into());
        self
    }

    pub fn bench_bin(&self) -> Option<&Path> {
        self.bench_bin.as_deref()
    }

    /// Layer `overrides` on top of this builder. Fields set in `overrides` win.
    pub fn merge(self, overrides: RunConfigBuilder) -> Self {
        Self {
            scenario: overrides.scenario.or(self.scenario),
            mode: overrides.mode.or(self.mode),
            mlperf_conf: overrides.mlperf_conf.or(self.mlperf_conf),
            user_conf: overrides.user_conf.or(self.user_conf),
            model_name: overrides.model_name.or(self.model_name),
            data_path: overrides.data_path.or(self.data_path),
            nireq: overrides.nireq.or(self.nireq),
            nthreads: overrides.nthreads.or(self.nthreads),
            nstreams: overrides.nstreams.or(self.nstreams),
            total_sample_count: overrides.total_sample_count.or(self.total_sample_count),
            warmup_iters: overrides.warmup_iters.or(self.warmup_iters),
            model_path: overrides.model_path.or(self.model_path),
            bench_bin: overrides.bench_bin.or(self.bench_bin),
        }
    }

    /// Build a [`RunConfig`]. Empty strings and paths are treated as unset.
    ///
    /// Returns a [`ConfigError`] if the scenario or mode is not set.
    pub fn build(self) -> Result<RunConfig, ConfigError> {
        let scenario = self.scenario.ok_or_else(|| ConfigError::missing("scenario"))?;
        let mode = self.mode.ok_or_else(|| ConfigError::missing("mode"))?;

        Ok(RunConfig {
            scenario,
            mode,
            mlperf_conf: non_empty_path(self.mlperf_conf),
            user_conf: non_empty_path(self.user_conf),
            model_name: self.model_name.filter(|name| !name.is_empty()),
            data_path: non_empty_path(self.data_path),
            nireq: self.nireq,
            nthreads: self.nthreads,
            nstreams: self.nstreams,
            total_sample_count: self.total_sample_count,
            warmup_iters: self.warmup_iters,
            model_path: non_empty_path(self.model_path),
        })
    }
}

fn non_empty_path(path: Option<PathBuf>) -> Option<PathBuf> {
    path.filter(|p| !p.as_os_str().is_empty())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn args_of(config: &RunConfig) -> Vec<String> {
        config
            .to_args()
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn server_accuracy_args_follow_declaration_order() {
        let config = RunConfigBuilder::default()
            .with_scenario(Scenario::Server)
            .with_mode(Mode::Accuracy)
            .with_nireq(28)
            .with_nthreads(56)
            .with_nstreams(14)
            .with_total_sample_count(5000)
            .with_warmup_iters(500)
            .build()
            .unwrap();

        assert_eq!(
            args_of(&config).join(" "),
            "--scenario Server --mode Accuracy --nireq 28 --nthreads 56 --nstreams 14 \
             --total_sample_count 5000 --warmup_iters 500"
        );
    }

    #[test]
    fn preset_matches_fixed_invocation() {
        let config = RunConfigBuilder::server_accuracy_preset().build().unwrap();
        assert_eq!(config.scenario(), Scenario::Server);
        assert_eq!(config.mode(), Mode::Accuracy);
        assert_eq!(config.nireq(), Some(28));
        assert_eq!(config.nthreads(), Some(56));
        assert_eq!(config.nstreams(), Some(14));
        assert_eq!(config.total_sample_count(), Some(5000));
        assert_eq!(config.warmup_iters(), Some(500));
        assert_eq!(config.model_path(), None);
    }

    #[test]
    fn every_field_emits_one_pair() {
        let config = RunConfigBuilder::default()
            .with_scenario(Scenario::MultiStream)
            .with_mode(Mode::Performance)
            .with_mlperf_conf("mlperf.conf")
            .with_user_conf("user.conf")
            .with_model_name("resnet50")
            .with_data_path("/data/imagenet")
            .with_nireq(1)
            .with_nthreads(2)
            .with_nstreams(3)
            .with_total_sample_count(4)
            .with_warmup_iters(0)
            .with_model_path("/models/resnet50.xml")
            .build()
            .unwrap();

        assert_eq!(
            args_of(&config),
            vec![
                "--scenario",
                "MultiStream",
                "--mode",
                "Performance",
                "--mlperf_conf",
                "mlperf.conf",
                "--user_conf",
                "user.conf",
                "--model_name",
                "resnet50",
                "--data_path",
                "/data/imagenet",
                "--nireq",
                "1",
                "--nthreads",
                "2",
                "--nstreams",
                "3",
                "--total_sample_count",
                "4",
                "--warmup_iters",
                "0",
                "--model_path",
                "/models/resnet50.xml",
            ]
        );
    }

    #[test]
    fn empty_values_produce_no_pair() {
        let config = RunConfigBuilder::default()
            .with_scenario(Scenario::Offline)
            .with_mode(Mode::Accuracy)
            .with_model_name("")
            .with_data_path("")
            .build()
            .unwrap();

        assert_eq!(
            args_of(&config),
            vec!["--scenario", "Offline", "--mode", "Accuracy"]
        );
    }

    #[test]
    fn build_requires_scenario_and_mode() {
        let err = RunConfigBuilder::default()
            .with_mode(Mode::Accuracy)
            .build()
            .unwrap_err();
        assert!(err.message().contains("scenario"));

        let err = RunConfigBuilder::default()
            .with_scenario(Scenario::Server)
            .build()
            .unwrap_err();
        assert!(err.message().contains("mode"));
    }

    #[test]
    fn validate_requires_model_path() {
        let config = RunConfigBuilder::server_accuracy_preset().build().unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.message().contains("model_path"));

        let config = RunConfigBuilder::server_accuracy_preset()
            .with_model_path("/models/resnet50.xml")
            .build()
            .unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_names_ignoring_case() {
        assert_eq!("singlestream".parse::<Scenario>().unwrap(), Scenario::SingleStream);
        assert_eq!("SERVER".parse::<Scenario>().unwrap(), Scenario::Server);
        assert_eq!("performance".parse::<Mode>().unwrap(), Mode::Performance);
        assert!("Batch".parse::<Scenario>().is_err());
        assert!("Fast".parse::<Mode>().is_err());
    }

    #[test]
    fn toml_file_values_are_parsed() {
        let builder = RunConfigBuilder::from_toml_str(
            r#"
scenario = "Offline"
mode = "performance"
model_name = "resnet50"
nireq = 4
model_path = "/models/resnet50.xml"
bench_bin = "/opt/bench/ov_mlperf"
"#,
        )
        .unwrap();

        assert_eq!(builder.bench_bin(), Some(Path::new("/opt/bench/ov_mlperf")));

        let config = builder.build().unwrap();
        assert_eq!(config.scenario(), Scenario::Offline);
        assert_eq!(config.mode(), Mode::Performance);
        assert_eq!(config.model_name(), Some("resnet50"));
        assert_eq!(config.nireq(), Some(4));
        assert_eq!(config.model_path(), Some(Path::new("/models/resnet50.xml")));
    }

    #[test]
    fn toml_rejects_unknown_keys_and_negative_numbers() {
        assert!(RunConfigBuilder::from_toml_str("batch_size = 8").is_err());
        assert!(RunConfigBuilder::from_toml_str("nireq = -1").is_err());
        assert!(RunConfigBuilder::from_toml_str("scenario = \"Batch\"").is_err());
    }

    #[test]
    fn merge_prefers_overrides() {
        let base = RunConfigBuilder::server_accuracy_preset().with_model_name("resnet50");
        let overrides = RunConfigBuilder::default()
            .with_mode(Mode::Performance)
            .with_nireq(8);

        let config = base.merge(overrides).build().unwrap();
        assert_eq!(config.mode(), Mode::Performance);
        assert_eq!(config.nireq(), Some(8));
        assert_eq!(config.nthreads(), Some(56));
        assert_eq!(config.model_name(), Some("resnet50"));
    }
}
