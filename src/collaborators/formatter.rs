//! Formatter collaborator: given a tree path, rewrite files in place. An
//! unconfigured formatter is silently skipped.

use std::path::Path;
use std::process::Command;

use tracing::{debug, warn};

use crate::config::FormatterConfig;

/// Run the configured formatter command against `tree`, if any.
///
/// Absence (`config.command.is_none()`) is a silent no-op. A configured
/// command that fails is logged at `warn` and otherwise tolerated — the
/// formatter is an optional collaborator.
pub fn run_formatter(tree: &Path, config: &FormatterConfig) {
    let Some(command) = &config.command else {
        debug!("no formatter configured; skipping");
        return;
    };

    debug!(command, tree = %tree.display(), "running formatter");
    let result = Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(tree)
        .output();

    match result {
        Ok(output) if output.status.success() => {}
        Ok(output) => {
            warn!(
                command,
                exit_code = output.status.code(),
                stderr = %String::from_utf8_lossy(&output.stderr),
                "formatter exited non-zero; continuing with unformatted output"
            );
        }
        Err(err) => {
            warn!(command, error = %err, "could not run formatter; continuing");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_formatter_is_a_no_op() {
        let dir = tempfile::tempdir().expect("tempdir");
        run_formatter(dir.path(), &FormatterConfig::default());
    }

    #[test]
    fn failing_formatter_command_does_not_panic() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = FormatterConfig {
            command: Some("exit 1".to_owned()),
        };
        run_formatter(dir.path(), &config);
    }
}
