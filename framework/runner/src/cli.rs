use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, ValueEnum};

use crate::config::{Mode, RunConfigBuilder, Scenario};
use crate::types::LauncherResult;

/// Hardcoded starting points for a run configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Preset {
    /// Server scenario in Accuracy mode with 28 requests, 56 threads, 14 streams, 5000 samples and
    /// 500 warmup iterations.
    ServerAccuracy,
}

impl Preset {
    pub fn builder(self) -> RunConfigBuilder {
        match self {
            Preset::ServerAccuracy => RunConfigBuilder::server_accuracy_preset(),
        }
    }
}

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct LauncherCli {
    /// The load generation scenario: Server, Offline, SingleStream or MultiStream
    #[arg(long, value_parser = Scenario::from_str)]
    pub scenario: Option<Scenario>,

    /// What the run measures: Accuracy or Performance
    #[arg(long, value_parser = Mode::from_str)]
    pub mode: Option<Mode>,

    /// Path to the main benchmark config file
    #[arg(long = "mlperf_conf")]
    pub mlperf_conf: Option<PathBuf>,

    /// Path to the user config overrides
    #[arg(long = "user_conf")]
    pub user_conf: Option<PathBuf>,

    /// Identifier of the model under test
    #[arg(long = "model_name")]
    pub model_name: Option<String>,

    /// Dataset directory
    #[arg(long = "data_path")]
    pub data_path: Option<PathBuf>,

    /// Number of in-flight inference requests
    #[arg(long)]
    pub nireq: Option<u32>,

    /// Worker thread count
    #[arg(long)]
    pub nthreads: Option<u32>,

    /// Stream count
    #[arg(long)]
    pub nstreams: Option<u32>,

    /// Number of samples to process
    #[arg(long = "total_sample_count")]
    pub total_sample_count: Option<u32>,

    /// Warmup iteration count, excluded from the reported results
    #[arg(long = "warmup_iters")]
    pub warmup_iters: Option<u32>,

    /// Path to the compiled model artifact
    #[arg(long = "model_path")]
    pub model_path: Option<PathBuf>,

    /// A TOML file with any of the run parameters above, plus `bench_bin`.
    ///
    /// Values given as flags take precedence over the file, which takes precedence over the preset.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Start from a hardcoded run configuration
    #[arg(long, value_enum)]
    pub preset: Option<Preset>,

    /// The bench binary to launch.
    ///
    /// Defaults to the `BENCH_LAUNCHER_BIN` environment variable, then `ov_mlperf` on the `PATH`.
    #[arg(long)]
    pub bench_bin: Option<PathBuf>,

    /// Append a JSON line describing the run to this file once the bench binary exits
    #[arg(long)]
    pub run_summary: Option<PathBuf>,

    /// Print the command line that would be run instead of running it
    #[arg(long, default_value = "false")]
    pub dry_run: bool,
}

impl LauncherCli {
    /// Combine the preset, the config file and the flags into a single builder.
    pub fn to_builder(&self) -> LauncherResult<RunConfigBuilder> {
        let mut builder = self.preset.map(Preset::builder).unwrap_or_default();

        if let Some(path) = &self.config {
            log::debug!("Loading run config from {}", path.display());
            builder = builder.merge(RunConfigBuilder::from_file(path)?);
        }

        Ok(builder.merge(self.flag_overrides()))
    }

    fn flag_overrides(&self) -> RunConfigBuilder {
        let mut overrides = RunConfigBuilder::default();

        if let Some(scenario) = self.scenario {
            overrides = overrides.with_scenario(scenario);
        }
        if let Some(mode) = self.mode {
            overrides = overrides.with_mode(mode);
        }
        if let Some(path) = &self.mlperf_conf {
            overrides = overrides.with_mlperf_conf(path);
        }
        if let Some(path) = &self.user_conf {
            overrides = overrides.with_user_conf(path);
        }
        if let Some(name) = &self.model_name {
            overrides = overrides.with_model_name(name);
        }
        if let Some(path) = &self.data_path {
            overrides = overrides.with_data_path(path);
        }
        if let Some(nireq) = self.nireq {
            overrides = overrides.with_nireq(nireq);
        }
        if let Some(nthreads) = self.nthreads {
            overrides = overrides.with_nthreads(nthreads);
        }
        if let Some(nstreams) = self.nstreams {
            overrides = overrides.with_nstreams(nstreams);
        }
        if let Some(count) = self.total_sample_count {
            overrides = overrides.with_total_sample_count(count);
        }
        if let Some(iters) = self.warmup_iters {
            overrides = overrides.with_warmup_iters(iters);
        }
        if let Some(path) = &self.model_path {
            overrides = overrides.with_model_path(path);
        }
        if let Some(path) = &self.bench_bin {
            overrides = overrides.with_bench_bin(path);
        }

        overrides
    }
}
