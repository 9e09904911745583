//! Gateway to the external model process
//!
//! Every AI-using component (fallback parser, categorizer, dedup
//! confirmation, natural-language queries) goes through this one
//! surface. The model is an opaque pre-authenticated subprocess
//! invoked as `<bin> -p <prompt> --output-format <format>`; stdout is
//! authoritative and a non-zero exit is a failure.
//!
//! The process itself sits behind the `ProcessRunner` capability so
//! tests can substitute canned responses. No caching and no batching
//! happen here; batching is a caller decision.

pub mod parsing;

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Output format requested from the model process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Text,
    StreamJson,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Text => "text",
            Self::StreamJson => "stream-json",
        }
    }
}

/// Raw result of one subprocess invocation
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Pluggable subprocess capability
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, args: &[String]) -> Result<ProcessOutput>;
}

/// Production runner: spawns the configured model binary
pub struct CommandRunner {
    bin: String,
}

impl CommandRunner {
    pub fn new(bin: &str) -> Self {
        Self {
            bin: bin.to_string(),
        }
    }
}

#[async_trait]
impl ProcessRunner for CommandRunner {
    async fn run(&self, args: &[String]) -> Result<ProcessOutput> {
        let output = tokio::process::Command::new(&self.bin)
            .args(args)
            .output()
            .await
            .map_err(|e| Error::Model(format!("Failed to spawn {}: {}", self.bin, e)))?;

        Ok(ProcessOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Canned-response runner for tests.
///
/// Responses are consumed in FIFO order; every invocation's args are
/// recorded so tests can assert on the prompts that were sent.
#[derive(Default)]
pub struct StubRunner {
    responses: std::sync::Mutex<std::collections::VecDeque<Result<ProcessOutput>>>,
    calls: std::sync::Mutex<Vec<Vec<String>>>,
}

impl StubRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful invocation producing `stdout`
    pub fn push_ok(&self, stdout: &str) {
        self.responses.lock().unwrap().push_back(Ok(ProcessOutput {
            exit_code: 0,
            stdout: stdout.to_string(),
            stderr: String::new(),
        }));
    }

    /// Queue a failed invocation
    pub fn push_failure(&self, exit_code: i32, stderr: &str) {
        self.responses.lock().unwrap().push_back(Ok(ProcessOutput {
            exit_code,
            stdout: String::new(),
            stderr: stderr.to_string(),
        }));
    }

    /// Queue a spawn error
    pub fn push_spawn_error(&self, message: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(Error::Model(message.to_string())));
    }

    /// Args of every invocation so far
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    /// Prompts (the `-p` argument) of every invocation so far
    pub fn prompts(&self) -> Vec<String> {
        self.calls()
            .iter()
            .filter_map(|args| {
                args.iter()
                    .position(|a| a == "-p")
                    .and_then(|i| args.get(i + 1).cloned())
            })
            .collect()
    }
}

#[async_trait]
impl ProcessRunner for StubRunner {
    async fn run(&self, args: &[String]) -> Result<ProcessOutput> {
        self.calls.lock().unwrap().push(args.to_vec());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Ok(ProcessOutput {
                    exit_code: 1,
                    stdout: String::new(),
                    stderr: "stub: no response queued".to_string(),
                })
            })
    }
}

/// Outcome of a gateway call; never an Err to callers
#[derive(Debug, Clone)]
pub struct ModelResponse {
    pub ok: bool,
    pub output: String,
    pub error: Option<String>,
}

/// The single invocation surface for the model process
#[derive(Clone)]
pub struct ModelGateway {
    runner: Arc<dyn ProcessRunner>,
}

impl ModelGateway {
    /// Gateway over the real subprocess
    pub fn new(bin: &str) -> Self {
        Self {
            runner: Arc::new(CommandRunner::new(bin)),
        }
    }

    /// Gateway over an injected runner (tests)
    pub fn with_runner(runner: Arc<dyn ProcessRunner>) -> Self {
        Self { runner }
    }

    /// Invoke the model with a prompt in the given output format
    pub async fn run(&self, prompt: &str, format: OutputFormat) -> ModelResponse {
        let args = vec![
            "-p".to_string(),
            prompt.to_string(),
            "--output-format".to_string(),
            format.as_str().to_string(),
        ];

        match self.runner.run(&args).await {
            Ok(out) if out.exit_code == 0 => {
                debug!(bytes = out.stdout.len(), "Model call succeeded");
                ModelResponse {
                    ok: true,
                    output: out.stdout,
                    error: None,
                }
            }
            Ok(out) => {
                let message = if out.stderr.trim().is_empty() {
                    format!("model process exited with code {}", out.exit_code)
                } else {
                    out.stderr.trim().to_string()
                };
                warn!(exit_code = out.exit_code, "Model call failed: {}", message);
                ModelResponse {
                    ok: false,
                    output: String::new(),
                    error: Some(message),
                }
            }
            Err(e) => {
                warn!("Model call failed: {}", e);
                ModelResponse {
                    ok: false,
                    output: String::new(),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Invoke in JSON mode and normalize the response into `T`.
    ///
    /// Any failure (process, envelope, fences, parse) yields None.
    pub async fn run_json<T: DeserializeOwned>(&self, prompt: &str) -> Option<T> {
        let response = self.run(prompt, OutputFormat::Json).await;
        if !response.ok {
            return None;
        }
        let parsed = parsing::extract_json(&response.output);
        if parsed.is_none() {
            warn!(
                preview = %response.output.chars().take(120).collect::<String>(),
                "Model output did not normalize to the expected shape"
            );
        }
        parsed
    }

    /// Cheap liveness probe of the model binary
    pub async fn available(&self) -> bool {
        matches!(
            self.runner.run(&["--version".to_string()]).await,
            Ok(out) if out.exit_code == 0
        )
    }
}
