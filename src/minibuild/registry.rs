//! Minibuild registry
//!
//! Loads every descriptor found in the configured minilays into a name to
//! record map. Minilays are scanned in order and the FIRST minilay providing a
//! name wins; later duplicates are ignored with a warning naming both files.
//!
//! Descriptors that fail to parse do not abort the scan. They are remembered
//! and reported only when that package is actually looked up.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::deps::{dependency_not_found, not_found};
use crate::error::{MinimergeError, Result};

use super::{parser, Minibuild};

/// Descriptor that could not be parsed
#[derive(Debug, Clone)]
struct Broken {
    path: PathBuf,
    reason: String,
}

/// In-memory index of all known minibuilds
#[derive(Debug, Default)]
pub struct MinibuildRegistry {
    roots: Vec<PathBuf>,
    minibuilds: HashMap<String, Minibuild>,
    broken: HashMap<String, Broken>,
}

impl MinibuildRegistry {
    /// Scan the given minilay roots, in order
    pub fn scan(roots: &[PathBuf]) -> Result<Self> {
        let mut registry = Self {
            roots: roots.to_vec(),
            ..Self::default()
        };
        registry.rescan()?;
        Ok(registry)
    }

    /// Build a registry from already parsed records (first occurrence wins)
    #[cfg(test)]
    pub fn from_minibuilds(minibuilds: impl IntoIterator<Item = Minibuild>) -> Self {
        let mut registry = Self::default();
        for minibuild in minibuilds {
            registry.insert(minibuild);
        }
        registry
    }

    /// Forget everything and read the minilays again
    pub fn rescan(&mut self) -> Result<()> {
        self.minibuilds.clear();
        self.broken.clear();

        for root in self.roots.clone() {
            if !root.is_dir() {
                warn!(minilay = %root.display(), "minilay does not exist, skipping");
                continue;
            }
            for path in descriptor_files(&root)? {
                self.load(&path);
            }
        }

        debug!(
            minibuilds = self.minibuilds.len(),
            broken = self.broken.len(),
            "minilays scanned"
        );
        Ok(())
    }

    fn load(&mut self, path: &Path) {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if let Some(first) = self.provenance(&name) {
            warn!(
                name = %name,
                kept = %first.display(),
                ignored = %path.display(),
                "duplicate minibuild, keeping the first one found"
            );
            return;
        }
        match parser::parse_file(path) {
            Ok(minibuild) => self.insert(minibuild),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "unparsable minibuild");
                let reason = match e {
                    MinimergeError::InvalidMinibuild { reason, .. } => reason,
                    other => other.to_string(),
                };
                self.broken.insert(
                    name,
                    Broken {
                        path: path.to_path_buf(),
                        reason,
                    },
                );
            }
        }
    }

    fn insert(&mut self, minibuild: Minibuild) {
        if self.provenance(&minibuild.name).is_some() {
            return;
        }
        self.minibuilds.insert(minibuild.name.clone(), minibuild);
    }

    /// Descriptor file a name was loaded from, if any
    pub fn provenance(&self, name: &str) -> Option<&Path> {
        self.minibuilds
            .get(name)
            .map(|mb| mb.path.as_path())
            .or_else(|| self.broken.get(name).map(|b| b.path.as_path()))
    }

    /// Look up a requested package
    pub fn get(&self, name: &str) -> Result<&Minibuild> {
        self.lookup(name, None)
    }

    /// Look up a package, naming the package that referenced it on failure
    pub fn lookup(&self, name: &str, referrer: Option<&str>) -> Result<&Minibuild> {
        if let Some(minibuild) = self.minibuilds.get(name) {
            return Ok(minibuild);
        }
        if let Some(broken) = self.broken.get(name) {
            return Err(MinimergeError::InvalidMinibuild {
                name: name.to_string(),
                path: broken.path.display().to_string(),
                reason: broken.reason.clone(),
            });
        }
        Err(match referrer {
            Some(referrer) => dependency_not_found(name, referrer),
            None => not_found(name),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.minibuilds.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.minibuilds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.minibuilds.is_empty()
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }
}

/// Regular, non-hidden files directly inside a minilay, sorted by name
fn descriptor_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| MinimergeError::IoError {
            message: format!("Failed to read minilay {}: {}", root.display(), e),
        })?;
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if entry.file_type().is_file() && !hidden {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}
