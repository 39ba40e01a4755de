//! Configuration (minimerge.yaml) data structures
//!
//! The configuration file is searched in order:
//! 1. the `--config` argument
//! 2. `$MINIMERGE_CONFIG`
//! 3. `~/.minimerge.yaml`
//! 4. `<prefix>/etc/minimerge.yaml`
//!
//! When none exists, [`bootstrap`] lays out a fresh prefix and writes the
//! defaults to the last location.

pub mod bootstrap;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::error::{MinimergeError, Result};
use crate::operations::Action;

/// Configuration file name
pub const CONFIG_FILE: &str = "minimerge.yaml";

/// Per-user configuration file name, under the home directory
const USER_CONFIG_FILE: &str = ".minimerge.yaml";

/// Default prefix directory name, under the home directory
const DEFAULT_PREFIX_DIR: &str = "minitage";

/// Top level configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Installation prefix, used when neither `--prefix` nor `$MINIMERGE_PREFIX` is given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<PathBuf>,

    /// Extra minilays, scanned after the ones in `<prefix>/minilays`
    pub minilays: Vec<PathBuf>,

    /// Action used when no action flag is given
    pub default_action: String,

    pub variants: VariantSettings,

    pub backends: BackendSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prefix: None,
            minilays: Vec::new(),
            default_action: Action::Install.to_string(),
            variants: VariantSettings::default(),
            backends: BackendSettings::default(),
        }
    }
}

/// Names used to recognize runtime variant packages
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VariantSettings {
    /// Package depending on every available variant provider
    pub aggregator: String,

    /// Prefix shared by variant provider names; the rest is the variant tag
    pub provider_prefix: String,
}

impl Default for VariantSettings {
    fn default() -> Self {
        Self {
            aggregator: "meta-python".to_string(),
            provider_prefix: "python-".to_string(),
        }
    }
}

/// Active backend keys, in dispatch order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackendSettings {
    pub fetchers: Vec<String>,
    pub unpackers: Vec<String>,
    pub makers: Vec<String>,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            fetchers: vec![
                "git".to_string(),
                "hg".to_string(),
                "svn".to_string(),
                "local".to_string(),
            ],
            unpackers: vec!["zip".to_string(), "tar".to_string()],
            makers: vec!["buildout".to_string(), "script".to_string()],
        }
    }
}

impl Config {
    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to a YAML string
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Load and validate the configuration file at `path`
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(MinimergeError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }
        let content =
            std::fs::read_to_string(path).map_err(|e| MinimergeError::ConfigReadFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        Self::from_yaml(&content).map_err(|e| match e {
            MinimergeError::ConfigParseFailed { reason, .. } => MinimergeError::ConfigParseFailed {
                path: path.display().to_string(),
                reason,
            },
            other => other,
        })
    }

    fn validate(&self) -> Result<()> {
        self.default_action.parse::<Action>()?;
        if self.variants.provider_prefix.is_empty() {
            return Err(MinimergeError::ConfigInvalid {
                message: "variants.provider_prefix must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// The action to run when none is given on the command line
    pub fn default_action(&self) -> Result<Action> {
        self.default_action.parse()
    }
}

/// Prefix given on the command line, else `$MINIMERGE_PREFIX`
pub fn explicit_prefix(cli: Option<&Path>) -> Option<PathBuf> {
    cli.map(Path::to_path_buf)
        .or_else(|| std::env::var_os("MINIMERGE_PREFIX").map(PathBuf::from))
}

/// Prefix of the run
///
/// Priority: explicit prefix, the configured `prefix`, then `fallback`.
pub fn run_prefix(
    explicit: Option<PathBuf>,
    configured: Option<&Path>,
    fallback: PathBuf,
) -> PathBuf {
    explicit
        .or_else(|| configured.map(Path::to_path_buf))
        .unwrap_or(fallback)
}

/// `~/minitage`
pub fn default_prefix() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| MinimergeError::ConfigInvalid {
        message: "Could not determine the home directory, set MINIMERGE_PREFIX".to_string(),
    })?;
    Ok(home.join(DEFAULT_PREFIX_DIR))
}

/// Default configuration path inside a prefix
pub fn prefix_config_path(prefix: &Path) -> PathBuf {
    prefix.join("etc").join(CONFIG_FILE)
}

/// Find the configuration file to use
///
/// An explicitly given path is returned as is, even when missing, so that
/// loading it reports the error.
pub fn locate(explicit: Option<&Path>, prefix: &Path) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Ok(path) = std::env::var("MINIMERGE_CONFIG") {
        return Some(PathBuf::from(path));
    }
    let user = dirs::home_dir().map(|home| home.join(USER_CONFIG_FILE));
    user.into_iter()
        .chain(std::iter::once(prefix_config_path(prefix)))
        .find(|candidate| candidate.is_file())
}

/// Minilay roots to scan, in scan order
///
/// Every subdirectory of `<prefix>/minilays` (sorted), then the configured
/// roots, then the whitespace separated `$MINILAYS` entries.
pub fn minilay_roots(prefix: &Path, config: &Config) -> Result<Vec<PathBuf>> {
    let mut roots = Vec::new();

    let base = prefix.join("minilays");
    if base.is_dir() {
        for entry in WalkDir::new(&base)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| MinimergeError::IoError {
                message: format!("Failed to list {}: {}", base.display(), e),
            })?;
            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            if entry.file_type().is_dir() && !hidden {
                roots.push(entry.into_path());
            }
        }
    }

    roots.extend(config.minilays.iter().cloned());

    if let Ok(extra) = std::env::var("MINILAYS") {
        roots.extend(extra.split_whitespace().map(PathBuf::from));
    }

    let mut seen = std::collections::HashSet::new();
    roots.retain(|root| seen.insert(root.clone()));
    Ok(roots)
}
