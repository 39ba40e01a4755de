//! Operations driving a minimerge run
//!
//! This module provides:
//! - [`Action`]: what to do with the requested packages
//! - [`RunOptions`]: the validated execution modifiers of one run
//! - [`Context`]: prefix, configuration and options threaded through a run
//! - [`Orchestrator`]: plans the package list and executes the action
//!
//! The orchestrator coordinates with:
//! - Minibuild registry (from minibuild module)
//! - Resolver and variant selector (from resolver and variant modules)
//! - Fetchers, unpackers and makers (through [`Backends`])

pub mod backends;
pub mod orchestrator;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::config::Config;
use crate::error::{MinimergeError, Result};

pub use backends::Backends;
pub use orchestrator::Orchestrator;

/// Action applied to the requested packages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Install,
    Remove,
    Rebuild,
    Sync,
}

impl FromStr for Action {
    type Err = MinimergeError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim() {
            "install" => Ok(Action::Install),
            "remove" | "delete" => Ok(Action::Remove),
            "rebuild" | "reinstall" => Ok(Action::Rebuild),
            "sync" => Ok(Action::Sync),
            other => Err(MinimergeError::UnknownAction {
                action: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Install => "install",
            Action::Remove => "remove",
            Action::Rebuild => "rebuild",
            Action::Sync => "sync",
        })
    }
}

/// Pick the single action among the ones requested, `default` when none
pub fn select_action(requested: &[Action], default: Action) -> Result<Action> {
    match requested {
        [] => Ok(default),
        [action] => Ok(*action),
        many => Err(MinimergeError::ConflictingModes {
            message: format!(
                "only one action at a time ({} requested)",
                many.iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }),
    }
}

/// Execution modifiers of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub action: Action,
    /// Packages in request order
    pub packages: Vec<String>,
    /// Never touch the network, use what is already fetched
    pub offline: bool,
    /// Stop after fetching and unpacking
    pub fetchonly: bool,
    /// Drop requested packages before this one
    pub jump: Option<String>,
    /// Act on the requested packages only
    pub nodeps: bool,
    /// Update sources and rebuild already installed packages
    pub upgrade: bool,
    pub debug: bool,
    pub verbose: bool,
}

impl RunOptions {
    #[cfg(test)]
    pub fn new(action: Action, packages: Vec<String>) -> Self {
        Self {
            action,
            packages,
            offline: false,
            fetchonly: false,
            jump: None,
            nodeps: false,
            upgrade: false,
            debug: false,
            verbose: false,
        }
    }

    /// Reject combinations that cannot run, before any side effect
    pub fn validate(&self) -> Result<()> {
        self.validate_modes()?;
        if self.action != Action::Sync && self.packages.is_empty() {
            return Err(MinimergeError::NoPackages);
        }
        Ok(())
    }

    /// Reject mutually exclusive modifiers
    pub fn validate_modes(&self) -> Result<()> {
        if self.jump.is_some() && self.nodeps {
            return Err(MinimergeError::ConflictingModes {
                message: "--jump and --nodeps cannot be combined".to_string(),
            });
        }
        if self.fetchonly && self.offline {
            return Err(MinimergeError::ConflictingModes {
                message: "--fetchonly and --offline cannot be combined".to_string(),
            });
        }
        Ok(())
    }
}

/// Everything a run needs, passed explicitly to every component
#[derive(Debug, Clone)]
pub struct Context {
    pub prefix: PathBuf,
    pub config: Config,
    pub options: RunOptions,
}

impl Context {
    pub fn new(prefix: PathBuf, config: Config, options: RunOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            prefix,
            config,
            options,
        })
    }

    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    /// Staging directory for downloaded archives
    pub fn downloads_dir(&self) -> PathBuf {
        self.prefix.join("downloads")
    }
}
