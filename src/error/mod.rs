//! Error types and handling for minimerge
//!
//! Uses `thiserror` for error definitions and `miette` for pretty diagnostics.
//!
//! This module is organized into sub-modules by error domain:
//! - [`deps`]: Minibuild lookup and dependency graph errors
//! - [`backend`]: Fetcher, unpacker and maker errors

pub mod backend;
pub mod deps;


use miette::Diagnostic;
use thiserror::Error;

/// Main error type for minimerge operations
#[derive(Error, Diagnostic, Debug)]
pub enum MinimergeError {
    // Minibuild errors
    #[error("{}", not_found_message(.name, .referrer.as_deref()))]
    #[diagnostic(
        code(minimerge::minibuild::not_found),
        help("Check the package name and that its minilay is listed in the configuration")
    )]
    MinibuildNotFound {
        name: String,
        referrer: Option<String>,
    },

    #[error("Invalid minibuild '{name}' ({path}): {reason}")]
    #[diagnostic(code(minimerge::minibuild::invalid))]
    InvalidMinibuild {
        name: String,
        path: String,
        reason: String,
    },

    // Dependency errors
    #[error("Circular dependency detected: {chain}")]
    #[diagnostic(
        code(minimerge::deps::circular),
        help("Remove one of the dependencies forming the cycle")
    )]
    CircularDependency { chain: String },

    // Capability registry errors
    #[error("No {kind} matches '{switch}'")]
    #[diagnostic(
        code(minimerge::registry::provider_not_found),
        help("Check the minibuild keys and the active backends in minimerge.yaml")
    )]
    ProviderNotFound { kind: String, switch: String },

    #[error("A {kind} is already registered under '{key}'")]
    #[diagnostic(code(minimerge::registry::duplicate_provider))]
    DuplicateProvider { kind: String, key: String },

    // Mode errors
    #[error("Conflicting modes: {message}")]
    #[diagnostic(
        code(minimerge::cli::conflicting_modes),
        help("Use at most one action and do not combine --jump/--nodeps or --fetchonly/--offline")
    )]
    ConflictingModes { message: String },

    #[error("Unknown action: {action}")]
    #[diagnostic(
        code(minimerge::cli::unknown_action),
        help("Valid actions: install, remove, rebuild, sync")
    )]
    UnknownAction { action: String },

    #[error("You must precise which packages you want to deal with")]
    #[diagnostic(code(minimerge::cli::no_packages))]
    NoPackages,

    // Backend errors
    #[error("Failed to fetch '{uri}': {reason}")]
    #[diagnostic(code(minimerge::fetch::failed))]
    FetchFailure { uri: String, reason: String },

    #[error("Invalid source URI for {fetcher}: {uri}")]
    #[diagnostic(code(minimerge::fetch::invalid_uri))]
    InvalidSourceUri { fetcher: String, uri: String },

    #[error("Source of '{name}' is not available at {path} and minimerge runs offline")]
    #[diagnostic(
        code(minimerge::fetch::offline),
        help("Run once without --offline to fetch the sources")
    )]
    OfflineSourceMissing { name: String, path: String },

    #[error("Failed to unpack '{path}': {reason}")]
    #[diagnostic(code(minimerge::unpack::failed))]
    UnpackFailure { path: String, reason: String },

    #[error("Build failed in {directory}: {reason}")]
    #[diagnostic(code(minimerge::make::failed))]
    BuildFailure { directory: String, reason: String },

    #[error("Action failed for '{name}': {source}")]
    #[diagnostic(code(minimerge::action::failed))]
    PackageActionFailed {
        name: String,
        #[source]
        source: Box<MinimergeError>,
    },

    // Configuration errors
    #[error("Configuration file not found: {path}")]
    #[diagnostic(code(minimerge::config::not_found))]
    ConfigNotFound { path: String },

    #[error("Failed to read configuration file: {path}")]
    #[diagnostic(code(minimerge::config::read_failed))]
    ConfigReadFailed { path: String, reason: String },

    #[error("Failed to parse configuration file: {path}: {reason}")]
    #[diagnostic(code(minimerge::config::parse_failed))]
    ConfigParseFailed { path: String, reason: String },

    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(minimerge::config::invalid))]
    ConfigInvalid { message: String },

    // File system errors
    #[error("IO error: {message}")]
    #[diagnostic(code(minimerge::fs::io_error))]
    IoError { message: String },
}

fn not_found_message(name: &str, referrer: Option<&str>) -> String {
    match referrer {
        Some(referrer) => format!("Minibuild '{name}' (required by '{referrer}') not found"),
        None => format!("Minibuild '{name}' not found"),
    }
}

impl MinimergeError {
    /// Attach the failing package name to an orchestration error
    pub fn for_package(self, name: &str) -> Self {
        match self {
            already @ MinimergeError::PackageActionFailed { .. } => already,
            other => MinimergeError::PackageActionFailed {
                name: name.to_string(),
                source: Box::new(other),
            },
        }
    }
}

impl From<std::io::Error> for MinimergeError {
    fn from(err: std::io::Error) -> Self {
        MinimergeError::IoError {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for MinimergeError {
    fn from(err: serde_yaml::Error) -> Self {
        MinimergeError::ConfigParseFailed {
            path: "unknown".to_string(),
            reason: err.to_string(),
        }
    }
}

/// Result type alias using miette for error handling
pub type Result<T> = miette::Result<T, MinimergeError>;
