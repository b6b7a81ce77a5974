//! Termination of server processes with SIGTERM → SIGKILL escalation.

use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use tokio::process::Child;

/// Time a server gets to exit after SIGTERM before it is killed.
pub const DEFAULT_TERMINATE_GRACE: Duration = Duration::from_secs(3);

/// Terminate `child` and reap it.
///
/// Unix: SIGTERM, wait up to `grace`, then SIGKILL. Elsewhere the process is
/// killed immediately.
pub async fn terminate(child: &mut Child, grace: Duration) -> io::Result<ExitStatus> {
    if let Some(status) = child.try_wait()? {
        return Ok(status);
    }

    #[cfg(unix)]
    {
        if send_sigterm(child)? {
            if let Ok(result) = tokio::time::timeout(grace, child.wait()).await {
                return result;
            }
            tracing::debug!(pid = ?child.id(), "SIGTERM grace expired, killing");
        } else {
            return child.wait().await;
        }
    }

    #[cfg(not(unix))]
    let _ = grace;

    child.kill().await?;
    child.wait().await
}

/// Returns `false` when the process is already gone.
#[cfg(unix)]
fn send_sigterm(child: &Child) -> io::Result<bool> {
    use nix::errno::Errno;
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        return Ok(false);
    };
    let pid = i32::try_from(pid).map_err(io::Error::other)?;

    match signal::kill(Pid::from_raw(pid), Signal::SIGTERM) {
        Ok(()) => Ok(true),
        Err(Errno::ESRCH) => Ok(false),
        Err(e) => Err(io::Error::other(e)),
    }
}
