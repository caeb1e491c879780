//! # Vendor-format converter
//!
//! Raw instrument files are converted by an external tool with an
//! msconvert-compatible command line:
//!
//! ```text
//! <executable> <input> [--mgf] -o <outdir> [--filter <f>]...
//! ```
//!
//! [`ExternalConverter`] starts the process, captures its output on reader
//! threads, enforces the deadline, honours cancellation and retries
//! transient failures a bounded number of times. Every invocation ends in a
//! typed [`ToolOutcome`].

mod outcome;

pub use outcome::{CapturedOutput, FailureClass, ToolOutcome, KNOWN_SIGNATURES};

use std::ffi::OsString;
use std::fs;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::batch::CancellationToken;

const POLL_INTERVAL: Duration = Duration::from_millis(50);
/// How long output pipes may stay open after the converter exits
const EXIT_OUTPUT_GRACE: Duration = Duration::from_secs(5);
/// How long output pipes may stay open after the converter is killed
const KILL_OUTPUT_GRACE: Duration = Duration::from_millis(500);

/// Format the converter is asked to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// mzML (the default converter output)
    MzML,
    /// MGF (`--mgf`)
    Mgf,
}

impl OutputFormat {
    /// File extension the converter uses for this format
    pub fn extension(self) -> &'static str {
        match self {
            Self::MzML => "mzML",
            Self::Mgf => "mgf",
        }
    }
}

/// Errors raised by [`ExternalConverter`]
#[derive(Debug, thiserror::Error)]
pub enum ConverterError {
    /// The converter executable could not be started
    #[error("failed to start converter {}: {source}", executable.display())]
    Spawn {
        executable: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Waiting on or killing the process failed
    #[error("I/O error while running converter: {0}")]
    Io(#[from] io::Error),

    /// The converter finished unsuccessfully (after retries)
    #[error("converting {} failed: {outcome}", input.display())]
    Failed { input: PathBuf, outcome: ToolOutcome },

    /// The converter reported success without writing the expected file
    #[error("converter succeeded but {} was not written", path.display())]
    MissingOutput { path: PathBuf },
}

/// Converter settings (`[converter]` table of the config file)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Path or name of the converter executable
    pub executable: PathBuf,
    /// Each entry is passed as `--filter <entry>`
    pub filters: Vec<String>,
    /// Deadline per invocation in seconds; 0 disables it
    pub timeout_secs: u64,
    /// Extra attempts after a transient failure
    pub max_retries: u32,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("msconvert"),
            filters: Vec::new(),
            timeout_secs: 3600,
            max_retries: 1,
        }
    }
}

impl ConverterConfig {
    fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// Subprocess adapter for the vendor-format converter
#[derive(Debug, Clone, Default)]
pub struct ExternalConverter {
    config: ConverterConfig,
}

impl ExternalConverter {
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Arguments passed to the executable
    pub fn command_args(&self, input: &Path, outdir: &Path, format: OutputFormat) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![input.into()];
        if format == OutputFormat::Mgf {
            args.push("--mgf".into());
        }
        args.push("-o".into());
        args.push(outdir.into());
        for filter in &self.config.filters {
            args.push("--filter".into());
            args.push(filter.into());
        }
        args
    }

    /// Path the converter writes for `input`
    pub fn output_path(input: &Path, outdir: &Path, format: OutputFormat) -> PathBuf {
        let stem = input.file_stem().unwrap_or(input.as_os_str());
        let mut name = stem.to_os_string();
        name.push(".");
        name.push(format.extension());
        outdir.join(name)
    }

    /// A file in `outdir` with the same stem as `input`, from an earlier run.
    ///
    /// The `format` output wins when present; otherwise the first other
    /// same-stem file by name.
    pub fn existing_output(
        input: &Path,
        outdir: &Path,
        format: OutputFormat,
    ) -> io::Result<Option<PathBuf>> {
        let expected = Self::output_path(input, outdir, format);
        if expected.is_file() {
            return Ok(Some(expected));
        }
        let Some(stem) = input.file_stem() else {
            return Ok(None);
        };
        if !outdir.is_dir() {
            return Ok(None);
        }
        let mut others = Vec::new();
        for entry in fs::read_dir(outdir)? {
            let path = entry?.path();
            if path.is_file() && path.file_stem() == Some(stem) {
                others.push(path);
            }
        }
        others.sort();
        Ok(others.into_iter().next())
    }

    /// Convert `input` into `outdir`, retrying transient failures.
    ///
    /// Returns the path of the written file.
    pub fn convert(
        &self,
        input: &Path,
        outdir: &Path,
        format: OutputFormat,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, ConverterError> {
        fs::create_dir_all(outdir)?;
        let output_path = Self::output_path(input, outdir, format);

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            info!(
                "Converting {} to {} (attempt {attempt})",
                input.display(),
                format.extension()
            );
            let outcome = self.run_once(input, outdir, format, cancel)?;
            if outcome.is_success() {
                break;
            }

            remove_partial_output(&output_path);
            match outcome.failure_class() {
                Some(FailureClass::Transient) if attempt <= self.config.max_retries => {
                    warn!(
                        "Converter {outcome} on {}, retrying ({attempt}/{})",
                        input.display(),
                        self.config.max_retries
                    );
                }
                _ => {
                    if let Some(output) = outcome.output() {
                        debug!("Converter output for {}:\n{}", input.display(), output.tail(20));
                    }
                    return Err(ConverterError::Failed {
                        input: input.to_path_buf(),
                        outcome,
                    });
                }
            }
        }

        if !output_path.is_file() {
            return Err(ConverterError::MissingOutput { path: output_path });
        }
        Ok(output_path)
    }

    /// Run the converter once and report how it ended
    pub fn run_once(
        &self,
        input: &Path,
        outdir: &Path,
        format: OutputFormat,
        cancel: &CancellationToken,
    ) -> Result<ToolOutcome, ConverterError> {
        let mut command = Command::new(&self.config.executable);
        command
            .args(self.command_args(input, outdir, format))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        // own process group, so a kill reaches every descendant
        #[cfg(unix)]
        std::os::unix::process::CommandExt::process_group(&mut command, 0);
        let mut child = command
            .spawn()
            .map_err(|source| ConverterError::Spawn {
                executable: self.config.executable.clone(),
                source,
            })?;

        let (sender, receiver) = unbounded();
        if let Some(stdout) = child.stdout.take() {
            spawn_reader(stdout, Stream::Stdout, sender.clone())?;
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_reader(stderr, Stream::Stderr, sender.clone())?;
        }
        drop(sender);

        let ended = wait_with_deadline(&mut child, self.config.timeout(), cancel)?;
        let grace = match ended {
            Ended::Exited(_) => EXIT_OUTPUT_GRACE,
            Ended::TimedOut | Ended::Cancelled => KILL_OUTPUT_GRACE,
        };
        let output = collect_output(&receiver, grace);

        Ok(match ended {
            Ended::Exited(status) if status.success() => ToolOutcome::Success { output },
            Ended::Exited(status) => ToolOutcome::Failed {
                exit_code: status.code(),
                output,
            },
            Ended::TimedOut => ToolOutcome::TimedOut {
                timeout_secs: self.config.timeout_secs,
                output,
            },
            Ended::Cancelled => ToolOutcome::Cancelled,
        })
    }
}

enum Ended {
    Exited(ExitStatus),
    TimedOut,
    Cancelled,
}

fn wait_with_deadline(
    child: &mut Child,
    timeout: Option<Duration>,
    cancel: &CancellationToken,
) -> io::Result<Ended> {
    let deadline = timeout.map(|t| Instant::now() + t);
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Ended::Exited(status));
        }
        if cancel.is_cancelled() {
            kill(child)?;
            return Ok(Ended::Cancelled);
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            kill(child)?;
            return Ok(Ended::TimedOut);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Kill the converter and its process group, then reap it
#[cfg(unix)]
fn kill(child: &mut Child) -> io::Result<()> {
    let pgid = libc::pid_t::try_from(child.id())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    // SAFETY: kill(2) has no memory effects; the group was created at spawn
    if unsafe { libc::kill(-pgid, libc::SIGKILL) } != 0 {
        let err = io::Error::last_os_error();
        // ESRCH: the whole group already exited
        if err.raw_os_error() != Some(libc::ESRCH) {
            return Err(err);
        }
    }
    child.wait().map(|_| ())
}

#[cfg(not(unix))]
fn kill(child: &mut Child) -> io::Result<()> {
    match child.kill() {
        Ok(()) => {}
        // already exited
        Err(e) if e.kind() == io::ErrorKind::InvalidInput => {}
        Err(e) => return Err(e),
    }
    child.wait().map(|_| ())
}

/// Forward lines of `pipe` to `sender` on a detached thread
fn spawn_reader<R>(pipe: R, stream: Stream, sender: Sender<(Stream, String)>) -> io::Result<()>
where
    R: Read + Send + 'static,
{
    thread::Builder::new()
        .name(format!("converter-{stream:?}").to_lowercase())
        .spawn(move || {
            for line in BufReader::new(pipe).lines().map_while(Result::ok) {
                if sender.send((stream, line)).is_err() {
                    break;
                }
            }
        })
        .map(|_| ())
}

/// Gather output until both pipes close or `grace` elapses.
///
/// A descendant that escaped the kill can hold the pipes open; its reader
/// threads are left behind and exit once it does.
fn collect_output(receiver: &Receiver<(Stream, String)>, grace: Duration) -> CapturedOutput {
    let deadline = Instant::now() + grace;
    let mut output = CapturedOutput::default();
    loop {
        match receiver.recv_deadline(deadline) {
            Ok((Stream::Stdout, line)) => output.stdout.push(line),
            Ok((Stream::Stderr, line)) => output.stderr.push(line),
            Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                warn!("Converter output still open {grace:?} after exit, not waiting for it");
                break;
            }
        }
    }
    output
}

fn remove_partial_output(path: &Path) {
    if path.exists() {
        if let Err(e) = fs::remove_file(path) {
            warn!("Could not remove partial output {}: {e}", path.display());
        }
    }
}
