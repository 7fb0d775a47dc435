//! Type verifier collaborator: given a tree path, return `(ok, diagnostics)`.
//! An unconfigured verifier counts as success.

use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::VerifierConfig;

/// Outcome of a verifier run.
#[derive(Debug, Clone)]
pub struct VerifierOutcome {
    pub ok: bool,
    pub diagnostics: Vec<String>,
}

impl VerifierOutcome {
    const fn success() -> Self {
        Self {
            ok: true,
            diagnostics: Vec::new(),
        }
    }
}

/// Run the configured verifier command against `tree`, if any, enforcing
/// `config.timeout_secs`. A missing configuration is success; a timeout
/// is treated as rejection with a synthetic diagnostic, since it means the
/// verifier could not confirm the tree is sound within budget.
pub fn run_verifier(tree: &Path, config: &VerifierConfig) -> VerifierOutcome {
    let Some(command) = &config.command else {
        debug!("no verifier configured; treating as success");
        return VerifierOutcome::success();
    };

    debug!(command, tree = %tree.display(), timeout_secs = config.timeout_secs, "running verifier");

    let mut child = match Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(tree)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(err) => {
            warn!(command, error = %err, "could not run verifier");
            return VerifierOutcome {
                ok: false,
                diagnostics: vec![format!("could not run verifier command '{command}': {err}")],
            };
        }
    };

    let timeout = Duration::from_secs(config.timeout_secs);
    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                let output = child
                    .wait_with_output()
                    .unwrap_or_else(|_| std::process::Output {
                        status,
                        stdout: Vec::new(),
                        stderr: Vec::new(),
                    });
                if status.success() {
                    return VerifierOutcome::success();
                }
                let stderr = String::from_utf8_lossy(&output.stderr);
                return VerifierOutcome {
                    ok: false,
                    diagnostics: stderr.lines().map(str::to_owned).collect(),
                };
            }
            Ok(None) => {
                if start.elapsed() >= timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    return VerifierOutcome {
                        ok: false,
                        diagnostics: vec![format!(
                            "verifier exceeded timeout of {}s",
                            config.timeout_secs
                        )],
                    };
                }
                std::thread::sleep(Duration::from_millis(20));
            }
            Err(err) => {
                return VerifierOutcome {
                    ok: false,
                    diagnostics: vec![format!("error waiting for verifier: {err}")],
                };
            }
        }
    }
}
