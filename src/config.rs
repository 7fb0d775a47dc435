//! Project configuration (`.semmerge.toml`), C9.
//!
//! Recognized keys per language (file suffixes, worker command override),
//! ignore globs for the workspace snapshot, and the optional formatter and
//! verifier collaborators. A missing file is not an error — defaults apply.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Per-language analyzer settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageConfig {
    /// File suffixes recognized for this language, e.g. `[".ts", ".tsx"]`.
    pub suffixes: Vec<String>,
    /// Worker binary to launch; defaults to `semmerge-worker-<name>` if absent.
    pub worker_command: Option<String>,
}

impl LanguageConfig {
    fn default_for(name: &str, suffixes: &[&str]) -> Self {
        Self {
            suffixes: suffixes.iter().map(|s| (*s).to_owned()).collect(),
            worker_command: Some(format!("semmerge-worker-{name}")),
        }
    }

    #[must_use]
    pub fn worker_command_or_default(&self, name: &str) -> String {
        self.worker_command
            .clone()
            .unwrap_or_else(|| format!("semmerge-worker-{name}"))
    }
}

/// The optional formatter collaborator: given a tree path, rewrite files in
/// place. Absence means the pass is silently skipped.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatterConfig {
    pub command: Option<String>,
}

/// The optional type-verifier collaborator: given a tree path, report
/// `(ok, diagnostics)`. Absence counts as success.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifierConfig {
    pub command: Option<String>,
    #[serde(default = "VerifierConfig::default_timeout_secs")]
    pub timeout_secs: u64,
}

impl VerifierConfig {
    const fn default_timeout_secs() -> u64 {
        30
    }
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            command: None,
            timeout_secs: Self::default_timeout_secs(),
        }
    }
}

/// The advisory side-channel notes collaborator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotesConfig {
    #[serde(default = "NotesConfig::default_namespace")]
    pub namespace: String,
    #[serde(default = "NotesConfig::default_enabled")]
    pub enabled: bool,
}

impl NotesConfig {
    fn default_namespace() -> String {
        "refs/notes/semmerge".to_owned()
    }

    const fn default_enabled() -> bool {
        true
    }
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self {
            namespace: Self::default_namespace(),
            enabled: Self::default_enabled(),
        }
    }
}

/// Top-level `.semmerge.toml` schema (C9).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SemmergeConfig {
    pub languages: BTreeMap<String, LanguageConfig>,
    pub ignore: Vec<String>,
    pub formatter: FormatterConfig,
    pub verifier: VerifierConfig,
    pub notes: NotesConfig,
}

impl Default for SemmergeConfig {
    fn default() -> Self {
        let mut languages = BTreeMap::new();
        languages.insert(
            "typescript".to_owned(),
            LanguageConfig::default_for("typescript", &[".ts", ".tsx"]),
        );
        languages.insert(
            "javascript".to_owned(),
            LanguageConfig::default_for("javascript", &[".js", ".jsx"]),
        );
        languages.insert(
            "python".to_owned(),
            LanguageConfig::default_for("python", &[".py"]),
        );
        Self {
            languages,
            ignore: vec![
                ".git".to_owned(),
                "target".to_owned(),
                "node_modules".to_owned(),
            ],
            formatter: FormatterConfig::default(),
            verifier: VerifierConfig::default(),
            notes: NotesConfig::default(),
        }
    }
}

impl SemmergeConfig {
    /// Load configuration from a TOML file.
    ///
    /// - If the file does not exist, returns all defaults (not an error).
    /// - If the file exists but contains invalid TOML, returns a
    ///   [`ConfigError`] with a line number when one can be derived.
    ///
    /// # Errors
    /// Returns `ConfigError` on I/O errors (other than not-found) or parse errors.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError {
                    path: Some(path.to_owned()),
                    message: format!("could not read file: {e}"),
                });
            }
        };
        Self::parse(&contents).map_err(|mut e| {
            e.path = Some(path.to_owned());
            e
        })
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `ConfigError` on invalid TOML.
    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| {
            let mut message = e.message().to_owned();
            if let Some(span) = e.span() {
                let line = toml_str[..span.start].chars().filter(|&c| c == '\n').count() + 1;
                message = format!("line {line}: {message}");
            }
            ConfigError { path: None, message }
        })
    }
}

/// Error loading a `.semmerge.toml` file.
#[derive(Debug)]
pub struct ConfigError {
    pub path: Option<std::path::PathBuf>,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(p) = &self.path {
            write!(f, "{}: {}", p.display(), self.message)
        } else {
            write!(f, "config error: {}", self.message)
        }
    }
}

impl std::error::Error for ConfigError {}
