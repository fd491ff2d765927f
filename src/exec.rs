//! Bounded execution of one shell command.
//!
//! A run moves through `Idle -> Running -> Completed` on natural exit, or
//! `Running -> TimingOut -> Completed` when the wall-clock budget runs out. The
//! child is started in its own process group and waited on from a helper
//! thread; the caller blocks on a channel with a timeout. On timeout the whole
//! group is killed with `SIGKILL` and the helper thread is joined. The group
//! is also killed after a natural exit, so no process from the candidate
//! outlives [`BoundedExecutor::run`].
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::process::{Command, Output, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

pub const DEFAULT_SHELL: &str = "/bin/sh";

/// How long to wait for the helper thread after the group was killed.
const REAP_GRACE: Duration = Duration::from_secs(5);

/// Bytes of stderr kept for logging.
const MAX_STDERR_BYTES: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecOutcome {
    /// Natural exit. `None` when the process died from a signal.
    Exited(Option<i32>),
    TimedOut,
    /// The shell could not be started or waited on.
    Failed(String),
}

impl ExecOutcome {
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ExecOutcome::Exited(code) => *code,
            ExecOutcome::TimedOut | ExecOutcome::Failed(_) => None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code() == Some(0)
    }
}

/// Outcome plus what an operator needs to see about the run.
#[derive(Debug, Clone)]
pub struct Execution {
    pub outcome: ExecOutcome,
    pub pid: Option<u32>,
    pub elapsed: Duration,
    pub stderr: String,
}

impl Execution {
    /// Short human-readable reason for a rejection.
    pub fn describe(&self) -> String {
        match &self.outcome {
            ExecOutcome::Exited(Some(code)) => format!("exit status {code}"),
            ExecOutcome::Exited(None) => "terminated by signal".to_string(),
            ExecOutcome::TimedOut => format!("timed out after {} ms", self.elapsed.as_millis()),
            ExecOutcome::Failed(err) => format!("execution failed: {err}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Running,
    TimingOut,
    Completed,
}

#[derive(Debug, Clone)]
pub struct BoundedExecutor {
    shell: String,
}

impl Default for BoundedExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_SHELL)
    }
}

impl BoundedExecutor {
    pub fn new(shell: &str) -> Self {
        Self {
            shell: shell.to_string(),
        }
    }

    /// Run `command` through the shell with captured output, killing it once
    /// `timeout` elapses.
    pub fn run(&self, command: &str, timeout: Duration) -> Execution {
        let start = Instant::now();
        let mut phase = Phase::Idle;

        let spawned = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .spawn();
        let child = match spawned {
            Ok(child) => child,
            Err(err) => {
                return Execution {
                    outcome: ExecOutcome::Failed(format!("spawn {}: {err}", self.shell)),
                    pid: None,
                    elapsed: start.elapsed(),
                    stderr: String::new(),
                }
            }
        };
        let pid = child.id();
        transition(&mut phase, Phase::Running, pid);

        let (tx, rx) = mpsc::channel();
        let waiter = thread::spawn(move || {
            // The receiver may be gone if the caller already gave up.
            let _ = tx.send(child.wait_with_output());
        });

        let waited = match rx.recv_timeout(timeout) {
            Ok(waited) => Some(waited),
            Err(mpsc::RecvTimeoutError::Disconnected) => None,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                transition(&mut phase, Phase::TimingOut, pid);
                kill_group(pid);
                match rx.recv_timeout(REAP_GRACE) {
                    Ok(_) => {
                        let _ = waiter.join();
                    }
                    Err(err) => tracing::warn!(pid, %err, "child not reaped after kill"),
                }
                transition(&mut phase, Phase::Completed, pid);
                return Execution {
                    outcome: ExecOutcome::TimedOut,
                    pid: Some(pid),
                    elapsed: start.elapsed(),
                    stderr: String::new(),
                };
            }
        };
        let _ = waiter.join();
        // The shell has exited; anything it left running in its group goes too.
        kill_group(pid);
        transition(&mut phase, Phase::Completed, pid);

        match waited {
            Some(Ok(output)) => Execution {
                outcome: ExecOutcome::Exited(exit_code(&output)),
                pid: Some(pid),
                elapsed: start.elapsed(),
                stderr: stderr_excerpt(&output.stderr),
            },
            Some(Err(err)) => Execution {
                outcome: ExecOutcome::Failed(format!("wait: {err}")),
                pid: Some(pid),
                elapsed: start.elapsed(),
                stderr: String::new(),
            },
            None => Execution {
                outcome: ExecOutcome::Failed("waiter thread exited without a result".to_string()),
                pid: Some(pid),
                elapsed: start.elapsed(),
                stderr: String::new(),
            },
        }
    }
}

fn transition(phase: &mut Phase, next: Phase, pid: u32) {
    tracing::trace!(pid, from = ?*phase, to = ?next, "executor phase");
    *phase = next;
}

fn exit_code(output: &Output) -> Option<i32> {
    if let Some(signal) = output.status.signal() {
        tracing::debug!(signal, "command terminated by signal");
    }
    output.status.code()
}

fn kill_group(pid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: killpg only sends a signal; the group id is the child's own pid
    // because it was spawned with `process_group(0)`.
    let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        tracing::debug!(pid, %err, "killpg failed");
    }
}

fn stderr_excerpt(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim();
    if text.len() <= MAX_STDERR_BYTES {
        return text.to_string();
    }
    let mut end = MAX_STDERR_BYTES;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn process_alive(pid: u32) -> bool {
        // SAFETY: signal 0 performs only the existence check.
        unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
    }

    /// Running means present and not a zombie awaiting its reaper.
    fn running(pid: u32) -> bool {
        let Ok(stat) = std::fs::read_to_string(format!("/proc/{pid}/stat")) else {
            return false;
        };
        let state = stat
            .rsplit_once(") ")
            .and_then(|(_, rest)| rest.chars().next());
        !matches!(state, Some('Z') | Some('X') | None)
    }

    fn eventually_gone(pid: u32) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if !running(pid) {
                return true;
            }
            thread::sleep(Duration::from_millis(20));
        }
        false
    }

    #[test]
    fn reports_exit_codes() {
        let executor = BoundedExecutor::default();
        let ok = executor.run("true", Duration::from_secs(5));
        assert_eq!(ok.outcome, ExecOutcome::Exited(Some(0)));
        assert!(ok.outcome.is_success());

        let failed = executor.run("echo nope >&2; exit 3", Duration::from_secs(5));
        assert_eq!(failed.outcome.exit_code(), Some(3));
        assert_eq!(failed.stderr, "nope");
        assert_eq!(failed.describe(), "exit status 3");
    }

    #[test]
    fn shell_features_are_available() {
        let executor = BoundedExecutor::default();
        let piped = executor.run("echo a b | wc -w | grep -q 2", Duration::from_secs(5));
        assert!(piped.outcome.is_success());
    }

    #[test]
    fn long_sleep_times_out_and_leaves_no_process() {
        let executor = BoundedExecutor::default();
        let start = Instant::now();
        let run = executor.run("sleep 30", Duration::from_millis(200));
        assert_eq!(run.outcome, ExecOutcome::TimedOut);
        assert_eq!(run.outcome.exit_code(), None);
        assert!(start.elapsed() < Duration::from_secs(10));
        let pid = run.pid.expect("spawned");
        assert!(!process_alive(pid));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn timeout_kills_background_children_too() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pid_file = dir.path().join("bg.pid");
        let command = format!("sleep 30 & echo $! > {}; wait", pid_file.display());
        let executor = BoundedExecutor::default();
        let run = executor.run(&command, Duration::from_millis(300));
        assert_eq!(run.outcome, ExecOutcome::TimedOut);

        let background: u32 = std::fs::read_to_string(&pid_file)
            .expect("background pid written")
            .trim()
            .parse()
            .expect("pid");
        assert!(eventually_gone(background));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn natural_exit_reaps_detached_background_children() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pid_file = dir.path().join("bg.pid");
        let command = format!(
            "sleep 30 >/dev/null 2>&1 & echo $! > {}",
            pid_file.display()
        );
        let executor = BoundedExecutor::default();
        let run = executor.run(&command, Duration::from_secs(5));
        assert_eq!(run.outcome, ExecOutcome::Exited(Some(0)));

        let background: u32 = std::fs::read_to_string(&pid_file)
            .expect("background pid written")
            .trim()
            .parse()
            .expect("pid");
        assert!(eventually_gone(background));
    }

    #[test]
    fn missing_shell_is_a_failure_not_a_panic() {
        let executor = BoundedExecutor::new("/nonexistent/shell");
        let run = executor.run("true", Duration::from_secs(1));
        assert!(matches!(run.outcome, ExecOutcome::Failed(_)));
        assert!(!run.outcome.is_success());
    }
}
