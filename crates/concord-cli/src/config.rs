use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use concord_types::ErrorClass;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// File looked up under `--root` when `--config` is not given.
pub const CONFIG_FILE_NAME: &str = "concord.toml";

pub const DEFAULT_LEDGER: &str = "anchors.json";
pub const DEFAULT_COMMANDMENTS: &str = "commandments.md";
pub const DEFAULT_ACTOR: &str = "operator";
pub const DEFAULT_PRIOR_REV: &str = "HEAD";

/// Contents of `concord.toml`. Every key is optional.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConcordConfig {
    pub instance_id: Option<String>,
    pub actor: String,
    pub ledger: String,
    pub commandments: String,
    pub capabilities: Vec<String>,
    pub receipts: Vec<String>,
    pub guard: GuardConfig,
}

impl Default for ConcordConfig {
    fn default() -> Self {
        Self {
            instance_id: None,
            actor: DEFAULT_ACTOR.into(),
            ledger: DEFAULT_LEDGER.into(),
            commandments: DEFAULT_COMMANDMENTS.into(),
            capabilities: Vec::new(),
            receipts: Vec::new(),
            guard: GuardConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GuardConfig {
    pub strict_single_append: bool,
    pub prior_rev: String,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            strict_single_append: false,
            prior_rev: DEFAULT_PRIOR_REV.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("no {what} given; pass {flag} or set `{key}` in concord.toml")]
    MissingValue {
        what: &'static str,
        flag: &'static str,
        key: &'static str,
    },
}

impl ConfigError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Read { source, .. } if source.kind() == io::ErrorKind::NotFound => {
                ErrorClass::Resource
            }
            Self::Read { .. } => ErrorClass::Io,
            Self::Parse { .. } | Self::MissingValue { .. } => ErrorClass::Usage,
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

impl ConcordConfig {
    /// Parse TOML text; `path` is only used in error messages.
    pub fn parse(text: &str, path: &Path) -> ConfigResult<Self> {
        toml::from_str(text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Load the explicit config file, or `<root>/concord.toml` if present,
    /// or fall back to defaults.
    pub fn discover(root: &Path, explicit: Option<&Path>) -> ConfigResult<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let candidate = root.join(CONFIG_FILE_NAME);
                if !candidate.is_file() {
                    tracing::debug!(root = %root.display(), "no config file; using defaults");
                    return Ok(Self::default());
                }
                candidate
            }
        };
        let text = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded config");
        Self::parse(&text, &path)
    }
}

/// Effective settings for one invocation: CLI flags over config file over
/// built-in defaults.
#[derive(Clone, Debug)]
pub struct Settings {
    pub root: PathBuf,
    pub config: ConcordConfig,
    ledger_override: Option<String>,
}

impl Settings {
    pub fn new(root: PathBuf, config: ConcordConfig, ledger_override: Option<String>) -> Self {
        Self {
            root,
            config,
            ledger_override,
        }
    }

    /// Declared ledger path, relative to the root unless absolute.
    pub fn ledger(&self) -> &str {
        self.ledger_override
            .as_deref()
            .unwrap_or(&self.config.ledger)
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.resolve(self.ledger())
    }

    pub fn resolve(&self, declared: &str) -> PathBuf {
        let path = Path::new(declared);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub fn actor(&self, flag: Option<String>) -> String {
        flag.unwrap_or_else(|| self.config.actor.clone())
    }

    pub fn instance_id(&self, flag: Option<String>) -> ConfigResult<String> {
        flag.or_else(|| self.config.instance_id.clone())
            .ok_or(ConfigError::MissingValue {
                what: "instance id",
                flag: "<INSTANCE_ID>",
                key: "instance_id",
            })
    }

    /// Flag values replace the configured list rather than extending it.
    pub fn list_or_config(flags: Vec<String>, configured: &[String]) -> Vec<String> {
        if flags.is_empty() {
            configured.to_vec()
        } else {
            flags
        }
    }
}
