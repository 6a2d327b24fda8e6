//! Boundary to the publishing engine.
//!
//! The controller and the engine talk over exactly three channels: requests go
//! out on the command channel, and each request comes back as one
//! [`PublishResult`] on the result channel or one [`PublishError`] on the error
//! channel. [`channels`] builds all three and hands each side its ends.

use crate::models::{PublishError, PublishResult, SessionRequest};
use regex::Regex;
use std::future::Future;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

/// Only one request may be outstanding, so one slot is all the command channel needs.
pub const COMMAND_CAPACITY: usize = 1;

const EVENT_CAPACITY: usize = 1;

/// Environment variable carrying the identity passphrase to the engine process.
/// See the contract on [`ProcessEngine`].
pub const PASSPHRASE_ENV: &str = "ONIONIZE_PASSPHRASE";

/// Environment variable carrying the control-port password to the engine process.
/// See the contract on [`ProcessEngine`].
pub const CONTROL_PASSWORD_ENV: &str = "ONIONIZE_CONTROL_PASSWD";

/// Controller-side ends of the engine channels
pub struct EngineEndpoints {
    pub commands: mpsc::Sender<SessionRequest>,
    pub results: mpsc::Receiver<PublishResult>,
    pub errors: mpsc::Receiver<PublishError>,
}

/// Engine-side ends of the engine channels
pub struct EngineSide {
    pub commands: mpsc::Receiver<SessionRequest>,
    pub results: mpsc::Sender<PublishResult>,
    pub errors: mpsc::Sender<PublishError>,
}

/// Create the command, result and error channels.
pub fn channels() -> (EngineEndpoints, EngineSide) {
    let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
    let (result_tx, result_rx) = mpsc::channel(EVENT_CAPACITY);
    let (error_tx, error_rx) = mpsc::channel(EVENT_CAPACITY);

    (
        EngineEndpoints {
            commands: command_tx,
            results: result_rx,
            errors: error_rx,
        },
        EngineSide {
            commands: command_rx,
            results: result_tx,
            errors: error_tx,
        },
    )
}

/// Something that can publish content and report where it ended up.
pub trait PublishEngine: Send + Sync + 'static {
    fn publish(
        &self,
        request: SessionRequest,
    ) -> impl Future<Output = Result<PublishResult, PublishError>> + Send;
}

impl EngineSide {
    /// Feed every incoming request to `engine` and report its outcome.
    ///
    /// Each request produces exactly one message on exactly one of the two
    /// outbound channels. Returns once the command channel closes or the
    /// controller stops listening.
    pub async fn serve<E: PublishEngine>(mut self, engine: E) {
        tracing::debug!("Engine loop started");

        while let Some(request) = self.commands.recv().await {
            tracing::info!("Engine received request: {:?}", request);

            let delivered = match engine.publish(request).await {
                Ok(result) => {
                    tracing::info!("Published at {}", result.address);
                    self.results.send(result).await.is_ok()
                }
                Err(error) => {
                    tracing::warn!("Publish failed: {}", error);
                    self.errors.send(error).await.is_ok()
                }
            };

            if !delivered {
                tracing::warn!("Result listener has stopped - engine loop exiting");
                break;
            }
        }

        tracing::debug!("Engine loop terminated");
    }
}

/// Engine adapter that delegates to an external `onionize` executable.
///
/// The child process is expected to print the published address on stdout and
/// then keep serving until it is killed. Secrets go through environment
/// variables, never the command line.
///
/// # Engine contract
///
/// The two secrets are handed over in [`PASSPHRASE_ENV`] and
/// [`CONTROL_PASSWORD_ENV`]. That is an assumed contract, not one an engine
/// offers on its own: `engine_program` must name an executable that reads
/// those variables, usually a small wrapper script around the real engine.
/// An executable that ignores them still publishes, without the passphrase or
/// control password applied. Both variables are always set, empty when the
/// field is blank.
pub struct ProcessEngine {
    program: String,

    /// Arguments placed before the generated flags (e.g. a wrapper script)
    leading_args: Vec<String>,

    /// Regex for spotting the onion address in engine output
    address_pattern: Regex,
}

impl ProcessEngine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
            address_pattern: Regex::new(r"https?://[A-Za-z0-9.-]+\.onion(?::\d+)?(?:/\S*)?")
                .expect("Invalid address regex"),
        }
    }

    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Flags describing `request` for the engine executable, path last.
    pub fn build_args(&self, request: &SessionRequest) -> Vec<String> {
        let mut args = self.leading_args.clone();
        args.push(format!("-control-addr={}", request.control_address));
        if request.debug {
            args.push("-debug".to_string());
        }
        if request.is_archive() {
            args.push("-zip".to_string());
        }
        if !request.slug {
            args.push("-noslug".to_string());
        }
        args.push(request.path.clone());
        args
    }

    /// Find the first onion address in a line of engine output.
    pub fn extract_address<'a>(&self, line: &'a str) -> Option<&'a str> {
        self.address_pattern.find(line).map(|m| m.as_str())
    }

    async fn run(&self, request: SessionRequest) -> Result<PublishResult, PublishError> {
        let args = self.build_args(&request);
        tracing::info!("Starting engine: {} {}", self.program, args.join(" "));

        let mut child = Command::new(&self.program)
            .args(&args)
            .env(PASSPHRASE_ENV, &request.passphrase)
            .env(CONTROL_PASSWORD_ENV, &request.control_password)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PublishError::new(format!("Failed to start {}: {}", self.program, e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| PublishError::new("Engine stdout is not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| PublishError::new("Engine stderr is not captured"))?;

        let stderr_task = tokio::spawn(last_line_of(stderr));
        let mut lines = BufReader::new(stdout).lines();

        loop {
            let next = lines
                .next_line()
                .await
                .map_err(|e| PublishError::new(format!("Failed to read engine output: {}", e)))?;
            let Some(line) = next else {
                break;
            };
            tracing::debug!("engine: {}", line);

            if let Some(address) = self.extract_address(&line) {
                let result = PublishResult::new(address);

                // The child serves the content for as long as it lives.
                tokio::spawn(async move {
                    while let Ok(Some(line)) = lines.next_line().await {
                        tracing::debug!("engine: {}", line);
                    }
                    match child.wait().await {
                        Ok(status) => tracing::info!("Engine process exited with {}", status),
                        Err(e) => tracing::warn!("Failed to wait for engine process: {}", e),
                    }
                });

                return Ok(result);
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| PublishError::new(format!("Failed to wait for engine: {}", e)))?;
        let last_error = stderr_task.await.ok().flatten();

        tracing::warn!("Engine exited with {} before publishing", status);

        Err(PublishError::new(last_error.unwrap_or_else(|| {
            format!("{} exited with {} without publishing", self.program, status)
        })))
    }
}

impl PublishEngine for ProcessEngine {
    async fn publish(&self, request: SessionRequest) -> Result<PublishResult, PublishError> {
        self.run(request).await
    }
}

/// Log every line of `reader` and keep the last non-empty one.
async fn last_line_of<R>(reader: R) -> Option<String>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    let mut last = None;
    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim().to_string();
        if !line.is_empty() {
            tracing::warn!("engine stderr: {}", line);
            last = Some(line);
        }
    }
    last
}
