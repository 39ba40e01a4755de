//! First-run prefix layout

use std::path::{Path, PathBuf};

use console::style;
use tracing::info;

use crate::error::{MinimergeError, Result};

use super::{Config, prefix_config_path};

/// Directories every prefix carries
const PREFIX_DIRS: &[&str] = &[
    "etc",
    "minilays",
    "logs",
    "eggs/cache",
    "dependencies",
    "downloads",
];

/// Create the prefix layout and write the default configuration
///
/// Returns the path of the written configuration file. Existing directories
/// are kept; an existing configuration file is never overwritten.
pub fn bootstrap(prefix: &Path) -> Result<PathBuf> {
    let config_path = prefix_config_path(prefix);

    println!(
        "{} You seem to be running minimerge for the first time.",
        style("::").cyan().bold()
    );
    println!("   Creating the prefix layout in {}", prefix.display());

    for dir in PREFIX_DIRS {
        let path = prefix.join(dir);
        std::fs::create_dir_all(&path).map_err(|e| MinimergeError::IoError {
            message: format!("Failed to create {}: {}", path.display(), e),
        })?;
    }

    if !config_path.exists() {
        println!("   Generating default config: {}", config_path.display());
        let yaml = Config::default().to_yaml()?;
        std::fs::write(&config_path, yaml).map_err(|e| MinimergeError::IoError {
            message: format!("Failed to write {}: {}", config_path.display(), e),
        })?;
    }

    info!(prefix = %prefix.display(), "prefix bootstrapped");
    Ok(config_path)
}
