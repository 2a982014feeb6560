use bench_launcher_core::prelude::ShutdownHandle;
use tokio::runtime::Runtime;

use crate::types::LauncherResult;

/// Turn Ctrl-C received by the launcher into a shutdown request on `handle`.
///
/// The handler is registered before this returns, so an interrupt that arrives while the bench
/// binary is being spawned is not lost.
#[cfg(unix)]
pub(crate) fn start_shutdown_listener(
    runtime: &Runtime,
    handle: &ShutdownHandle,
) -> LauncherResult<()> {
    use anyhow::Context as _;
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = {
        let _guard = runtime.enter();
        signal(SignalKind::interrupt()).context("Failed to listen for Ctrl-C")?
    };

    let listener_handle = handle.clone();
    runtime.spawn(async move {
        if interrupt.recv().await.is_some() {
            log::warn!("Received interrupt, forwarding to the bench binary");
            listener_handle.shutdown();
        }
    });

    Ok(())
}

#[cfg(not(unix))]
pub(crate) fn start_shutdown_listener(
    runtime: &Runtime,
    handle: &ShutdownHandle,
) -> LauncherResult<()> {
    let listener_handle = handle.clone();
    runtime.spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                log::warn!("Received interrupt, forwarding to the bench binary");
                listener_handle.shutdown();
            }
            Err(e) => log::error!("Failed to listen for Ctrl-C: {e}"),
        }
    });

    Ok(())
}
