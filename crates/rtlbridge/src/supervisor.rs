//! Supervision of the external rtl_433 process.
//!
//! A single spawn is attempted. Spawn errors, stdout failures and process exit
//! are all terminal for that instance: they are logged and reported as a
//! [`Termination`], never retried. Process liveness is expected to be
//! supervised externally, e.g. by a service manager restarting rtlbridge.

use std::path::Path;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::process::Stdio;

use tokio::io::AsyncBufRead;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;
use tokio::io::BufReader;
use tokio::process::Child;
use tokio::process::Command;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::decoder::DecodedLines;
use crate::dispatcher::Dispatcher;

/// Quiet mode, JSON output framing, SI units.
pub const RTL_433_ARGS: [&str; 5] = ["-q", "-F", "json", "-C", "si"];

/// Linux keeps only this many bytes of a process name (`TASK_COMM_LEN - 1`).
const COMM_NAME_LEN: usize = 15;

/// Longest stderr chunk logged as one line.
const MAX_STDERR_LINE: usize = 4096;

/// How to launch the decoder process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderCommand {
    program: PathBuf,
    args: Vec<String>,
    kill_stale: bool,
}

impl DecoderCommand {
    /// An arbitrary command. Stale instances are not killed unless requested.
    pub fn new<I, S>(program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            kill_stale: false,
        }
    }

    /// rtl_433 with the fixed JSON/SI argument set followed by `extra_args`.
    pub fn rtl_433(program: impl Into<PathBuf>, extra_args: Vec<String>) -> Self {
        let args = RTL_433_ARGS
            .iter()
            .map(|a| a.to_string())
            .chain(extra_args)
            .collect::<Vec<_>>();
        Self::new(program, args).kill_stale(true)
    }

    /// Kill running processes with the same name before spawning.
    pub fn kill_stale(mut self, kill_stale: bool) -> Self {
        self.kill_stale = kill_stale;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn kills_stale(&self) -> bool {
        self.kill_stale
    }

    /// The name the kernel reports for a running instance of `program`.
    fn process_name(&self) -> Option<String> {
        let name = self.program.file_name()?.to_string_lossy();
        let mut end = name.len().min(COMM_NAME_LEN);
        while !name.is_char_boundary(end) {
            end -= 1;
        }
        Some(name[..end].to_string())
    }

    fn display(&self) -> String {
        std::iter::once(self.program.display().to_string())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Decoder stdout was not captured")]
    MissingStdout,

    #[error("Failed to wait for decoder: {0}")]
    Wait(#[source] std::io::Error),

    #[error("Supervisor task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Terminal outcome of one supervised decoder instance.
#[derive(Debug)]
pub enum Termination {
    /// The process exited on its own
    Exited(ExitStatus),

    /// The process was stopped through [`SupervisorHandle::shutdown`]
    Cancelled(Option<ExitStatus>),

    /// The process could not be started or supervised
    Failed(SupervisorError),
}

/// Owns the decoder process for its whole lifetime.
#[derive(Debug)]
pub struct ProcessSupervisor {
    command: DecoderCommand,
}

impl ProcessSupervisor {
    pub fn new(command: DecoderCommand) -> Self {
        Self { command }
    }

    /// Start the decoder in a background task feeding `dispatcher`.
    ///
    /// Returns immediately; must be called from within a tokio runtime.
    pub fn start(self, dispatcher: Dispatcher) -> SupervisorHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(self.run(dispatcher, shutdown_rx));
        SupervisorHandle {
            shutdown: Some(shutdown_tx),
            task,
        }
    }

    async fn run(
        self,
        mut dispatcher: Dispatcher,
        mut shutdown_rx: oneshot::Receiver<()>,
    ) -> Termination {
        info!("Starting rtl_433 server: {}", self.command.display());

        if self.command.kill_stale {
            kill_stale(&self.command).await;
        }

        let mut child = match spawn(&self.command) {
            Ok(child) => child,
            Err(e) => {
                error!("child error (spawn): {}", e);
                return Termination::Failed(e);
            }
        };
        info!("Decoder running (pid {:?})", child.id());

        let Some(stdout) = child.stdout.take() else {
            error!("child error (spawn): {}", SupervisorError::MissingStdout);
            if let Err(e) = child.start_kill() {
                warn!("Failed to kill decoder without stdout: {}", e);
            }
            return Termination::Failed(SupervisorError::MissingStdout);
        };
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(drain_stderr(stderr));
        }

        // Cleared once the handle is dropped; the decoder then runs detached.
        let mut shutdown_armed = true;

        let mut lines = DecodedLines::new(stdout);
        loop {
            tokio::select! {
                res = &mut shutdown_rx, if shutdown_armed => match res {
                    Ok(()) => return cancel(&mut child).await,
                    Err(_) => {
                        debug!("Supervisor handle dropped, decoder continues detached");
                        shutdown_armed = false;
                    }
                },
                next = lines.next() => match next {
                    Ok(Some(event)) => {
                        dispatcher.on_event(event);
                    }
                    Ok(None) => {
                        warn!("child close (stdout): decoder output ended");
                        break;
                    }
                    Err(e) => {
                        error!("child error (stdout): {}", e);
                        break;
                    }
                },
            }
        }

        let status = loop {
            tokio::select! {
                res = &mut shutdown_rx, if shutdown_armed => match res {
                    Ok(()) => return cancel(&mut child).await,
                    Err(_) => shutdown_armed = false,
                },
                status = child.wait() => break status,
            }
        };

        match status {
            Ok(status) => {
                error!("child exit code (spawn): {}", status);
                Termination::Exited(status)
            }
            Err(e) => {
                error!("child error (wait): {}", e);
                Termination::Failed(SupervisorError::Wait(e))
            }
        }
    }
}

/// Handle to a running supervisor.
///
/// Dropping the handle detaches it; the decoder keeps running and streaming.
#[derive(Debug)]
pub struct SupervisorHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<Termination>,
}

impl SupervisorHandle {
    /// Whether the supervised instance has terminated.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Kill the decoder (if still running) and wait for the supervisor.
    pub async fn shutdown(mut self) -> Termination {
        if let Some(tx) = self.shutdown.take() {
            // Err means the supervisor already finished on its own.
            let _ = tx.send(());
        }
        self.join().await
    }

    /// Wait for the decoder to terminate on its own.
    pub async fn wait(self) -> Termination {
        self.join().await
    }

    async fn join(self) -> Termination {
        match self.task.await {
            Ok(termination) => termination,
            Err(e) => Termination::Failed(SupervisorError::Task(e)),
        }
    }
}

fn spawn(command: &DecoderCommand) -> Result<Child, SupervisorError> {
    Command::new(&command.program)
        .args(&command.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| SupervisorError::Spawn {
            program: command.program.display().to_string(),
            source,
        })
}

/// Best-effort `pkill -x` of instances left over from a previous run, so two
/// decoders never fight over the same receiver.
async fn kill_stale(command: &DecoderCommand) {
    let Some(name) = command.process_name() else {
        return;
    };

    let result = Command::new("pkill")
        .arg("-x")
        .arg(&name)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    match result {
        Ok(status) if status.success() => info!("Killed stale {} instance", name),
        // pkill exits with 1 when nothing matched
        Ok(status) if status.code() == Some(1) => debug!("No stale {} instance running", name),
        Ok(status) => warn!("pkill {} failed: {}", name, status),
        Err(e) => warn!("Failed to run pkill for {}: {}", name, e),
    }
}

async fn cancel(child: &mut Child) -> Termination {
    info!("Stopping decoder");
    if let Err(e) = child.start_kill() {
        debug!("Failed to kill decoder: {}", e);
    }
    match child.wait().await {
        Ok(status) => {
            info!("Decoder stopped: {}", status);
            Termination::Cancelled(Some(status))
        }
        Err(e) => {
            warn!("Failed to reap decoder: {}", e);
            Termination::Cancelled(None)
        }
    }
}

/// Forward the decoder's stderr into the log so the pipe never fills up.
async fn drain_stderr<R: AsyncRead + Unpin>(stderr: R) {
    let mut reader = BufReader::new(stderr);
    let mut line = Vec::new();
    loop {
        match next_stderr_line(&mut reader, &mut line).await {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&line);
                let text = text.trim_end();
                if !text.is_empty() {
                    debug!("[rtl_433 stderr] {}", text);
                }
            }
            Err(e) => {
                debug!("Stopped reading decoder stderr: {}", e);
                break;
            }
        }
    }
}

/// Read up to the next newline, splitting lines longer than `MAX_STDERR_LINE`.
async fn next_stderr_line<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    line: &mut Vec<u8>,
) -> std::io::Result<usize> {
    line.clear();
    (&mut *reader)
        .take(MAX_STDERR_LINE as u64)
        .read_until(b'\n', line)
        .await
}
