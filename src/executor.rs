//! Run executor: one invocation of the external test command
//!
//! The executor only captures output. Parsing happens elsewhere, so the
//! text contract can be tested without spawning anything.

use crate::cancel::CancelToken;
use crate::config::expand_command;
use crate::error::RunError;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::io::Read;
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

/// Interval between child status checks
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Produces the raw output of one run asking for `slowest` tests
pub trait RunExecutor {
    fn execute_run(&mut self, slowest: usize) -> Result<String, RunError>;
}

impl<F> RunExecutor for F
where
    F: FnMut(usize) -> Result<String, RunError>,
{
    fn execute_run(&mut self, slowest: usize) -> Result<String, RunError> {
        self(slowest)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

type Chunk = (Stream, std::io::Result<Vec<u8>>);

/// Exit status plus both captured streams
struct Finished {
    status: ExitStatus,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

/// Runs a real process and captures its stdout followed by its stderr
///
/// The command runs in its own process group. On timeout or cancellation the
/// whole group is killed, so nothing it started outlives the run.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    command: Vec<String>,
    timeout: Option<Duration>,
    cancel: CancelToken,
}

impl CommandExecutor {
    /// `command` is the argv template; see [`crate::config::SessionConfig::command_for`]
    pub fn new(command: Vec<String>, timeout: Option<Duration>, cancel: CancelToken) -> Self {
        Self {
            command,
            timeout,
            cancel,
        }
    }

    /// Wait until the child has exited and both streams are closed
    ///
    /// Cancellation and the timeout are checked throughout, including while a
    /// leftover subprocess keeps a pipe open after the child itself exited.
    fn wait(&self, child: &mut Child, output: &Receiver<Chunk>) -> Result<Finished, RunError> {
        let started = Instant::now();
        let mut status = None;
        let mut stdout = None;
        let mut stderr = None;

        loop {
            if self.cancel.is_cancelled() {
                kill_group(child);
                return Err(RunError::Cancelled);
            }
            if status.is_none() {
                status = child.try_wait()?;
            }
            let drained = stdout.is_some() && stderr.is_some();
            if let (Some(status), true) = (status, drained) {
                return Ok(Finished {
                    status,
                    stdout: stdout.unwrap_or_default(),
                    stderr: stderr.unwrap_or_default(),
                });
            }
            if let Some(limit) = self.timeout {
                if started.elapsed() >= limit {
                    kill_group(child);
                    return Err(RunError::Timeout { after: limit });
                }
            }

            if drained {
                thread::sleep(POLL_INTERVAL);
                continue;
            }
            match output.recv_timeout(POLL_INTERVAL) {
                Ok((stream, Ok(bytes))) => match stream {
                    Stream::Stdout => stdout = Some(bytes),
                    Stream::Stderr => stderr = Some(bytes),
                },
                Ok((_, Err(e))) => {
                    kill_group(child);
                    return Err(RunError::Io(e));
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    kill_group(child);
                    return Err(RunError::Io(std::io::Error::other(
                        "output reader thread exited without reporting",
                    )));
                }
            }
        }
    }
}

/// SIGKILL the child's process group, then reap the child
fn kill_group(child: &mut Child) {
    let pgid = Pid::from_raw(child.id() as i32);
    if let Err(e) = killpg(pgid, Signal::SIGKILL) {
        tracing::debug!("failed to kill process group {}: {}", pgid, e);
        let _ = child.kill();
    }
    let _ = child.wait();
}

fn drain<R: Read + Send + 'static>(stream: Stream, source: Option<R>, tx: Sender<Chunk>) {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let result = match source {
            Some(mut source) => source.read_to_end(&mut buf).map(|_| buf),
            None => Ok(buf),
        };
        // The receiver is gone once the run was abandoned
        let _ = tx.send((stream, result));
    });
}

impl RunExecutor for CommandExecutor {
    fn execute_run(&mut self, slowest: usize) -> Result<String, RunError> {
        let argv = expand_command(&self.command, slowest);
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| RunError::Io(std::io::Error::other("empty test command")))?;

        tracing::debug!(program = %program, ?args, "spawning test command");
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .spawn()
            .map_err(|source| RunError::Spawn {
                program: program.clone(),
                source,
            })?;

        let (tx, rx) = mpsc::channel();
        drain(Stream::Stdout, child.stdout.take(), tx.clone());
        drain(Stream::Stderr, child.stderr.take(), tx);
        let finished = self.wait(&mut child, &rx)?;

        if !finished.status.success() {
            // A signal that reached both us and the child is a cancellation
            if self.cancel.is_cancelled() {
                return Err(RunError::Cancelled);
            }
            return Err(match finished.status.code() {
                Some(code) => RunError::NonZeroExit { code },
                None => RunError::Terminated,
            });
        }

        let mut output = finished.stdout;
        output.extend(finished.stderr);
        Ok(String::from_utf8_lossy(&output).into_owned())
    }
}
