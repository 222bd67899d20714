//! Detached child processes, liveness probes and signals.
//!
//! Agents outlive the request that spawned them, so the coordinator only
//! keeps a pid. Children run in their own process group so that signals
//! reach anything the CLI forks.

use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

use tracing::{debug, warn};

/// Launch `program` detached: new process group, stdin from `/dev/null`,
/// stdout and stderr appended to `log_path`. Returns the child pid.
pub fn launch_detached(program: &Path, args: &[String], cwd: Option<&Path>, log_path: &Path) -> io::Result<u32> {
    let stdout = OpenOptions::new().create(true).append(true).open(log_path)?;
    let stderr = stdout.try_clone()?;

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr));
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    // Dropping the handle neither kills nor waits; `reap` collects the exit.
    let child = cmd.spawn()?;
    Ok(child.id())
}

#[cfg(unix)]
mod unix {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, kill, killpg};
    use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
    use nix::unistd::{Pid, getpgid, getpgrp};

    fn pid_of(pid: u32) -> Option<Pid> {
        i32::try_from(pid).ok().filter(|p| *p > 0).map(Pid::from_raw)
    }

    pub fn is_alive(pid: u32) -> bool {
        let Some(pid) = pid_of(pid) else {
            return false;
        };
        matches!(kill(pid, None), Ok(()) | Err(Errno::EPERM))
    }

    pub fn reap(pid: u32) -> Option<i32> {
        let pid = pid_of(pid)?;
        match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::Exited(_, code)) => Some(code),
            Ok(WaitStatus::Signaled(_, signal, _)) => Some(128 + signal as i32),
            // Still running, not our child, or any other failure
            Ok(_) | Err(_) => None,
        }
    }

    pub fn signal_group(pid: u32, signal: Signal) -> nix::Result<()> {
        let Some(target) = pid_of(pid) else {
            return Ok(());
        };
        let result = match getpgid(Some(target)) {
            // Never signal our own group
            Ok(pgid) if pgid != getpgrp() => killpg(pgid, signal),
            Ok(_) => kill(target, signal),
            Err(Errno::ESRCH) => return Ok(()),
            Err(_) => kill(target, signal),
        };
        match result {
            Err(Errno::ESRCH) => Ok(()),
            other => other,
        }
    }
}

/// Whether `pid` exists. A permission error still means it exists.
#[cfg(unix)]
pub fn is_alive(pid: u32) -> bool {
    unix::is_alive(pid)
}

/// Non-blocking reap. Exit code when collected (128 + signal number when
/// killed by a signal); `None` while running or when `pid` is not our child.
#[cfg(unix)]
pub fn reap(pid: u32) -> Option<i32> {
    unix::reap(pid)
}

/// SIGTERM the process group of `pid`. A vanished process is success.
#[cfg(unix)]
pub fn terminate_group(pid: u32) {
    if let Err(e) = unix::signal_group(pid, nix::sys::signal::Signal::SIGTERM) {
        warn!(pid, error = %e, "Failed to send SIGTERM");
    }
}

/// SIGKILL the process group of `pid`. A vanished process is success.
#[cfg(unix)]
pub fn kill_group(pid: u32) {
    if let Err(e) = unix::signal_group(pid, nix::sys::signal::Signal::SIGKILL) {
        warn!(pid, error = %e, "Failed to send SIGKILL");
    }
}

#[cfg(not(unix))]
pub const fn is_alive(_pid: u32) -> bool {
    false
}

#[cfg(not(unix))]
pub const fn reap(_pid: u32) -> Option<i32> {
    None
}

#[cfg(not(unix))]
pub const fn terminate_group(_pid: u32) {}

#[cfg(not(unix))]
pub const fn kill_group(_pid: u32) {}

/// Poll interval while waiting for a signalled process to exit.
const EXIT_POLL: Duration = Duration::from_millis(50);

/// Wait up to `grace` for `pid` to exit. Returns the exit code if it was
/// collected, and whether the process is gone.
pub async fn wait_for_exit(pid: u32, grace: Duration) -> (Option<i32>, bool) {
    let deadline = tokio::time::Instant::now() + grace;
    loop {
        if let Some(code) = reap(pid) {
            return (Some(code), true);
        }
        if !is_alive(pid) {
            return (None, true);
        }
        if tokio::time::Instant::now() >= deadline {
            return (None, false);
        }
        tokio::time::sleep(EXIT_POLL).await;
    }
}

/// Kill a process group outright and collect the child, blocking briefly.
///
/// Used to undo a spawn whose bookkeeping failed.
pub fn kill_and_reap(pid: u32) {
    kill_group(pid);
    for _ in 0..40 {
        if reap(pid).is_some() || !is_alive(pid) {
            debug!(pid, "Rolled back child reaped");
            return;
        }
        std::thread::sleep(EXIT_POLL);
    }
    warn!(pid, "Rolled back child did not exit");
}
