//! Child-process runner for the prediction command

use crate::config::PredictConfig;
use crate::error::{TradelogError, TradelogResult};

use serde_json::Value;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, warn};

const SERVICE: &str = "predict";

/// Longest stderr excerpt carried into an error message
const STDERR_EXCERPT: usize = 300;

#[derive(Debug, Clone)]
pub struct PredictionRunner {
    command: String,
    args: Vec<String>,
    timeout: Duration,
}

impl PredictionRunner {
    pub fn new(command: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            args,
            timeout,
        }
    }

    pub fn from_config(config: &PredictConfig) -> Self {
        Self::new(
            config.command.clone(),
            config.args.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Run the process once with `input` and return its JSON object
    ///
    /// The child is killed if the timeout elapses or the future is dropped.
    pub async fn run(&self, input: &Value) -> TradelogResult<Value> {
        let argument = serde_json::to_string(input)
            .map_err(|e| TradelogError::Internal(format!("Cannot encode request: {}", e)))?;

        let child = Command::new(&self.command)
            .args(&self.args)
            .arg(argument)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                TradelogError::upstream(SERVICE, format!("Cannot start {}: {}", self.command, e))
            })?;

        let started = Instant::now();
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result
                .map_err(|e| TradelogError::upstream(SERVICE, format!("Process I/O: {}", e)))?,
            Err(_) => {
                warn!(
                    "Prediction process {} timed out after {:?}",
                    self.command, self.timeout
                );
                return Err(TradelogError::upstream(
                    SERVICE,
                    format!("Timed out after {}ms", self.timeout.as_millis()),
                ));
            }
        };
        debug!(
            "Prediction process exited with {} in {:?}",
            output.status,
            started.elapsed()
        );

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let excerpt: String = stderr.trim().chars().take(STDERR_EXCERPT).collect();
            warn!("Prediction process failed ({}): {}", output.status, excerpt);
            return Err(TradelogError::upstream(
                SERVICE,
                format!("Process exited with {}: {}", output.status, excerpt),
            ));
        }

        parse_single_object(&output.stdout).map_err(|e| TradelogError::upstream(SERVICE, e))
    }
}

/// Exactly one JSON object, optionally surrounded by whitespace
pub fn parse_single_object(stdout: &[u8]) -> Result<Value, String> {
    let mut values = serde_json::Deserializer::from_slice(stdout).into_iter::<Value>();

    let first = match values.next() {
        Some(Ok(value)) => value,
        Some(Err(e)) => return Err(format!("Output is not JSON: {}", e)),
        None => return Err("Process printed nothing".to_string()),
    };
    if !first.is_object() {
        return Err("Output is not a JSON object".to_string());
    }
    if values.next().is_some() {
        return Err("Output contains more than one JSON value".to_string());
    }

    Ok(first)
}
