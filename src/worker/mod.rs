//! Worker transport (C3): line-delimited JSON-RPC 2.0 over a long-lived
//! per-language analyzer subprocess's stdin/stdout.
//!
//! The worker is launched lazily on first use and reused for subsequent
//! RPCs. Only one request may be outstanding at a time — callers serialize
//! through `&mut self`, there is no locking to do.

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SemmergeError;
use crate::model::op::OpLog;

/// `{files: [{path, content}], project?}`. Paths are posix-relative
/// to the tree root; only files with a recognized suffix are included.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SnapshotFile {
    pub path: String,
    pub content: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkerSnapshot {
    pub files: Vec<SnapshotFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
}

impl WorkerSnapshot {
    #[must_use]
    pub const fn new(files: Vec<SnapshotFile>) -> Self {
        Self {
            files,
            project: None,
        }
    }
}

/// Result of `buildAndDiff`: `{opLogLeft, opLogRight, symbolMaps, diagnostics}`.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildAndDiffResult {
    pub op_log_left: OpLog,
    pub op_log_right: OpLog,
    #[serde(default)]
    pub symbol_maps: Value,
    #[serde(default)]
    pub diagnostics: Vec<Value>,
}

/// Result of `diff`: `{opLogRight, diagnostics}`.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResult {
    pub op_log_right: OpLog,
    #[serde(default)]
    pub diagnostics: Vec<Value>,
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

/// A long-lived handle to a single language's analyzer subprocess.
pub struct Worker {
    language: String,
    command: String,
    shutdown_wait: Duration,
    proc: Option<ChildHandle>,
    next_id: u64,
}

struct ChildHandle {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl Worker {
    #[must_use]
    pub fn new(language: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            command: command.into(),
            shutdown_wait: Duration::from_secs(2),
            proc: None,
            next_id: 1,
        }
    }

    /// Start the subprocess if it isn't already running.
    ///
    /// # Errors
    /// Returns [`SemmergeError::AnalyzerUnavailable`] if the worker binary
    /// cannot be spawned.
    pub fn ensure(&mut self) -> Result<(), SemmergeError> {
        if self.proc.is_some() {
            return Ok(());
        }
        let mut child = Command::new(&self.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|_| SemmergeError::AnalyzerUnavailable {
                language: self.language.clone(),
                command: self.command.clone(),
            })?;
        let stdin = child.stdin.take().expect("piped stdin");
        let stdout = child.stdout.take().expect("piped stdout");
        self.proc = Some(ChildHandle {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        });
        Ok(())
    }

    /// `buildAndDiff({base, left, right, config}) → {opLogLeft, opLogRight, symbolMaps, diagnostics}`.
    ///
    /// # Errors
    /// Returns [`SemmergeError::WorkerProtocol`] on a malformed response, an
    /// `error` payload, or end-of-stream before a response.
    pub fn build_and_diff(
        &mut self,
        base: &WorkerSnapshot,
        left: &WorkerSnapshot,
        right: &WorkerSnapshot,
        config: Value,
    ) -> Result<BuildAndDiffResult, SemmergeError> {
        let params = serde_json::json!({
            "base": base,
            "left": left,
            "right": right,
            "config": config,
        });
        let result = self.rpc("buildAndDiff", params)?;
        serde_json::from_value(result).map_err(SemmergeError::from)
    }

    /// `diff({base, right}) → {opLogRight, diagnostics}`.
    ///
    /// # Errors
    /// Returns [`SemmergeError::WorkerProtocol`] on a malformed response, an
    /// `error` payload, or end-of-stream before a response.
    pub fn diff(
        &mut self,
        base: &WorkerSnapshot,
        right: &WorkerSnapshot,
    ) -> Result<DiffResult, SemmergeError> {
        let params = serde_json::json!({ "base": base, "right": right });
        let result = self.rpc("diff", params)?;
        serde_json::from_value(result).map_err(SemmergeError::from)
    }

    fn rpc(&mut self, method: &str, params: Value) -> Result<Value, SemmergeError> {
        self.ensure()?;
        let id = self.next_id;
        self.next_id += 1;

        let request = RpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };
        let line = serde_json::to_string(&request)?;

        let handle = self.proc.as_mut().expect("ensured above");
        writeln!(handle.stdin, "{line}").map_err(|e| SemmergeError::WorkerProtocol {
            method: method.to_owned(),
            detail: format!("failed to write request: {e}"),
        })?;
        handle
            .stdin
            .flush()
            .map_err(|e| SemmergeError::WorkerProtocol {
                method: method.to_owned(),
                detail: format!("failed to flush request: {e}"),
            })?;

        loop {
            let mut raw = String::new();
            let n = handle
                .stdout
                .read_line(&mut raw)
                .map_err(|e| SemmergeError::WorkerProtocol {
                    method: method.to_owned(),
                    detail: format!("failed to read response: {e}"),
                })?;
            if n == 0 {
                return Err(SemmergeError::WorkerProtocol {
                    method: method.to_owned(),
                    detail: "worker closed its output stream before responding".to_owned(),
                });
            }
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                continue;
            }
            let response: RpcResponse =
                serde_json::from_str(trimmed).map_err(|e| SemmergeError::WorkerProtocol {
                    method: method.to_owned(),
                    detail: format!("malformed JSON from worker: {e}"),
                })?;
            if let Some(error) = response.error {
                return Err(SemmergeError::WorkerProtocol {
                    method: method.to_owned(),
                    detail: format!("worker reported an error: {error}"),
                });
            }
            return response.result.ok_or_else(|| SemmergeError::WorkerProtocol {
                method: method.to_owned(),
                detail: "response carried neither result nor error".to_owned(),
            });
        }
    }

    /// Polite-then-hard-kill shutdown: close stdin so the worker sees EOF,
    /// wait up to `shutdown_wait`, then kill if it hasn't exited. A no-op if
    /// the process was never started.
    pub fn close(&mut self) {
        let Some(mut handle) = self.proc.take() else {
            return;
        };
        drop(handle.stdin);
        let start = std::time::Instant::now();
        loop {
            match handle.child.try_wait() {
                Ok(Some(_)) => return,
                Ok(None) => {
                    if start.elapsed() >= self.shutdown_wait {
                        let _ = handle.child.kill();
                        let _ = handle.child.wait();
                        return;
                    }
                    std::thread::sleep(Duration::from_millis(50));
                }
                Err(_) => return,
            }
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_worker_has_no_process_until_ensure() {
        let worker = Worker::new("typescript", "semmerge-worker-typescript");
        assert!(worker.proc.is_none());
    }

    #[test]
    fn ensure_on_missing_binary_is_analyzer_unavailable() {
        let mut worker = Worker::new("nope", "semmerge-worker-does-not-exist-xyz");
        let err = worker.ensure().expect_err("binary does not exist");
        assert!(matches!(err, SemmergeError::AnalyzerUnavailable { .. }));
    }

    #[test]
    fn close_without_ensure_is_a_no_op() {
        let mut worker = Worker::new("typescript", "semmerge-worker-typescript");
        worker.close();
        worker.close();
    }
}
