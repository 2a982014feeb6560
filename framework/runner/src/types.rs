/// Result type used across the launcher. Typed failures are carried as
/// [bench_launcher_core::prelude::ConfigError] and [bench_launcher_core::prelude::LaunchError],
/// which callers can detect with [anyhow::Error::is].
pub type LauncherResult<T> = anyhow::Result<T>;
