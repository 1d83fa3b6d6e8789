//! Runtime configuration (`seam.toml`).
//!
//! ```toml
//! [executor]
//! workers = 4
//! thread_name = "seam-worker"
//!
//! [callbacks]
//! unchecked_failure = "abort"   # or "return-default"
//!
//! [diagnostics]
//! log_boundary_errors = true
//! ```
//!
//! Every field has a default, so an empty file is a valid configuration.
//! The process-wide configuration is set at most once with [`install`] and
//! read through [`current`].

use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// File name searched for by [`BridgeConfig::find_and_load`].
pub const CONFIG_FILE: &str = "seam.toml";

static INSTALLED: OnceCell<BridgeConfig> = OnceCell::new();

/// Complete runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub executor: ExecutorConfig,
    pub callbacks: CallbackConfig,
    pub diagnostics: DiagnosticsConfig,
}

/// Native worker pool settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Number of worker threads (at least 1).
    pub workers: usize,
    /// Worker thread name prefix; workers are named `<prefix>-<index>`.
    pub thread_name: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        ExecutorConfig {
            workers: 4,
            thread_name: "seam-worker".to_string(),
        }
    }
}

/// Callback bridge settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallbackConfig {
    pub unchecked_failure: UncheckedFailurePolicy,
}

/// What happens when an unchecked callback panics.
///
/// An unchecked callback has no error channel, so the native caller cannot
/// learn that it failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UncheckedFailurePolicy {
    /// Terminate the process. Native code after the callback never runs.
    #[default]
    Abort,
    /// Log the fault and return `R::default()`. Native code after the
    /// callback runs, but the callback's effects may be incomplete.
    ReturnDefault,
}

impl UncheckedFailurePolicy {
    pub fn name(self) -> &'static str {
        match self {
            UncheckedFailurePolicy::Abort => "abort",
            UncheckedFailurePolicy::ReturnDefault => "return-default",
        }
    }
}

/// Logging switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Log every `Err` returned through a boundary guard at debug level.
    pub log_boundary_errors: bool,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        DiagnosticsConfig {
            log_boundary_errors: true,
        }
    }
}

impl BridgeConfig {
    /// Parse a configuration from a TOML string.
    pub fn parse(input: &str) -> Result<Self> {
        let config: BridgeConfig = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration from a file on disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Search upward from `start_dir` for `seam.toml`, returning the parsed
    /// configuration and the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.is_file() {
                let config = Self::load(&candidate)?;
                return Ok(Some((config, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    fn validate(&self) -> Result<()> {
        if self.executor.workers == 0 {
            return Err(CoreError::Config {
                detail: "executor.workers must be at least 1".to_string(),
            });
        }
        if self.executor.thread_name.is_empty() {
            return Err(CoreError::Config {
                detail: "executor.thread_name must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Set the process-wide configuration. Fails if one is already in effect.
pub fn install(config: BridgeConfig) -> Result<()> {
    config.validate()?;
    INSTALLED.set(config).map_err(|_| CoreError::Config {
        detail: "configuration already installed".to_string(),
    })
}

/// The process-wide configuration, defaulted on first read if none was
/// installed.
pub fn current() -> &'static BridgeConfig {
    INSTALLED.get_or_init(BridgeConfig::default)
}
