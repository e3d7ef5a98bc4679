//! The execution backend contract.
//!
//! Running an individual node (an HTTP call, a scrape, a mapping) is never done
//! here. A [`FlowExecutor`] takes the whole flow plus the environment and
//! answers with per-node results and the captured variables.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use knotwork_graph::{Environment, ExecutionResult, Flow};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::ExecutorError;

/// Per-node results and captured variables of one flow execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResponse {
  pub results: HashMap<String, ExecutionResult>,
  #[serde(default)]
  pub variables: Map<String, Value>,
}

/// Accepted wire shapes: `[results, variables]` or `{results, variables}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireResponse {
  Tuple(HashMap<String, ExecutionResult>, Map<String, Value>),
  Object(ExecutionResponse),
}

impl ExecutionResponse {
  pub fn parse(bytes: &[u8]) -> Result<Self, ExecutorError> {
    let wire: WireResponse =
      serde_json::from_slice(bytes).map_err(|e| ExecutorError::Malformed {
        message: e.to_string(),
      })?;
    Ok(match wire {
      WireResponse::Tuple(results, variables) => ExecutionResponse { results, variables },
      WireResponse::Object(response) => response,
    })
  }
}

#[async_trait]
pub trait FlowExecutor: Send + Sync {
  async fn execute_flow(
    &self,
    flow: &Flow,
    env: &Environment,
  ) -> Result<ExecutionResponse, ExecutorError>;
}

#[derive(Debug, Clone)]
pub struct CommandExecutorConfig {
  /// Runner program. Receives `{"flow": ..., "env": ...}` on stdin.
  pub program: PathBuf,
  pub args: Vec<String>,
  pub timeout: Option<Duration>,
}

impl CommandExecutorConfig {
  pub fn new(program: impl Into<PathBuf>) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
      timeout: None,
    }
  }
}

/// Runs each flow through an external runner process.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
  config: CommandExecutorConfig,
}

#[derive(Serialize)]
struct Request<'a> {
  flow: &'a Flow,
  env: &'a Environment,
}

impl CommandExecutor {
  pub fn new(config: CommandExecutorConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &CommandExecutorConfig {
    &self.config
  }

  async fn invoke(&self, request: Vec<u8>) -> Result<std::process::Output, ExecutorError> {
    let program = self.config.program.display().to_string();

    let mut child = Command::new(&self.config.program)
      .args(&self.config.args)
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true)
      .spawn()
      .map_err(|source| ExecutorError::Unreachable {
        program: program.clone(),
        source,
      })?;

    let stdin = child.stdin.take();
    let write = async move {
      if let Some(mut stdin) = stdin {
        stdin.write_all(&request).await?;
        stdin.shutdown().await?;
      }
      Ok::<_, std::io::Error>(())
    };

    let (written, output) = tokio::join!(write, child.wait_with_output());
    let output = output?;

    if !output.status.success() {
      return Err(ExecutorError::Backend {
        status: output.status.code(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
      });
    }
    // A runner may exit before reading all of stdin.
    if let Err(e) = written
      && e.kind() != std::io::ErrorKind::BrokenPipe
    {
      return Err(e.into());
    }

    debug!(
      program = %program,
      stdout_bytes = output.stdout.len(),
      "executor_finished"
    );
    Ok(output)
  }
}

#[async_trait]
impl FlowExecutor for CommandExecutor {
  async fn execute_flow(
    &self,
    flow: &Flow,
    env: &Environment,
  ) -> Result<ExecutionResponse, ExecutorError> {
    let request = serde_json::to_vec(&Request { flow, env }).map_err(|e| {
      ExecutorError::Malformed {
        message: format!("could not encode request: {}", e),
      }
    })?;

    let output = match self.config.timeout {
      Some(timeout) => tokio::time::timeout(timeout, self.invoke(request))
        .await
        .map_err(|_| ExecutorError::Timeout {
          timeout_ms: timeout.as_millis() as u64,
        })??,
      None => self.invoke(request).await?,
    };

    ExecutionResponse::parse(&output.stdout)
  }
}
