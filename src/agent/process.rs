//! Supervision of a local LangGraph dev server.

use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

/// How long a terminated server gets to exit before it is killed
pub const STOP_GRACE: Duration = Duration::from_secs(5);

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A LangGraph dev server started as a child process
///
/// The child is terminated when this handle is stopped or dropped. The
/// launcher (`uv run`) forwards SIGTERM to the real server, so a plain kill
/// would leave the server orphaned and holding its port.
#[derive(Debug)]
pub struct LangGraphProcess {
    child: Option<Child>,
}

impl LangGraphProcess {
    /// Spawn `command`, wait `startup_delay`, and check it is still running
    ///
    /// Returns `None` (after reporting on stderr) if the command is empty,
    /// fails to spawn, or exits during the startup delay.
    pub async fn start(command: &[String], startup_delay: Duration) -> Option<Self> {
        let Some((program, args)) = command.split_first() else {
            eprintln!("Failed to start LangGraph server: empty command");
            return None;
        };

        tracing::info!(command = %command.join(" "), "Starting LangGraph server");

        // stdout is the MCP stdio channel; keep the child off it.
        let spawned = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                eprintln!("Error starting LangGraph server: {}", e);
                return None;
            }
        };

        tokio::time::sleep(startup_delay).await;

        match child.try_wait() {
            Ok(None) => {
                eprintln!("LangGraph server started successfully");
                Some(Self { child: Some(child) })
            }
            Ok(Some(status)) => {
                eprintln!("Failed to start LangGraph server: exited with {}", status);
                None
            }
            Err(e) => {
                eprintln!("Failed to start LangGraph server: {}", e);
                let _ = child.kill();
                let _ = child.wait();
                None
            }
        }
    }

    /// OS process id of the server
    pub fn id(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    /// Whether the server process is still alive
    pub fn is_running(&mut self) -> bool {
        match self.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// Terminate the server, waiting up to [`STOP_GRACE`] before killing it
    pub fn stop(&mut self) {
        self.stop_within(STOP_GRACE);
    }

    /// Send SIGTERM, wait up to `grace` for the server to exit, then kill and reap it
    pub fn stop_within(&mut self, grace: Duration) {
        let Some(mut child) = self.child.take() else {
            return;
        };

        if !matches!(child.try_wait(), Ok(None)) {
            return;
        }

        if !(terminate(&child) && wait_for_exit(&mut child, grace)) {
            tracing::warn!("LangGraph server did not exit after SIGTERM, killing it");
            if let Err(e) = child.kill() {
                tracing::warn!("Failed to kill LangGraph server: {}", e);
            }
        }

        let _ = child.wait();
        eprintln!("LangGraph server stopped");
    }
}

#[cfg(unix)]
fn terminate(child: &Child) -> bool {
    let Ok(pid) = libc::pid_t::try_from(child.id()) else {
        return false;
    };

    // SAFETY: `pid` names our own child, which has not been reaped yet.
    let rc = unsafe { libc::kill(pid, libc::SIGTERM) };
    if rc != 0 {
        tracing::warn!(
            "Failed to send SIGTERM to LangGraph server: {}",
            std::io::Error::last_os_error()
        );
    }
    rc == 0
}

#[cfg(not(unix))]
fn terminate(_child: &Child) -> bool {
    false
}

fn wait_for_exit(child: &mut Child, grace: Duration) -> bool {
    let deadline = Instant::now() + grace;
    loop {
        match child.try_wait() {
            Ok(Some(_)) => return true,
            Ok(None) if Instant::now() < deadline => std::thread::sleep(EXIT_POLL_INTERVAL),
            _ => return false,
        }
    }
}

impl Drop for LangGraphProcess {
    fn drop(&mut self) {
        self.stop();
    }
}
