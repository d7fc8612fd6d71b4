//! # Termination signals for [`Swarm::run_until_signal`](crate::Swarm::run_until_signal).
//!
//! Unix: `SIGINT`, `SIGTERM` (sent by Kubernetes on pod deletion) and `SIGQUIT`.
//! Elsewhere: Ctrl-C only.

/// Resolves on the first termination signal.
///
/// Listeners are registered per call; registration failure is returned as `Err`.
#[cfg(unix)]
pub(crate) async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut quit = signal(SignalKind::quit())?;

    let name = tokio::select! {
        _ = interrupt.recv() => "SIGINT",
        _ = terminate.recv() => "SIGTERM",
        _ = quit.recv() => "SIGQUIT",
    };
    tracing::debug!(signal = name, "termination signal");
    Ok(())
}

/// Resolves on Ctrl-C.
#[cfg(not(unix))]
pub(crate) async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await?;
    tracing::debug!(signal = "ctrl_c", "termination signal");
    Ok(())
}
