//! Minibuild descriptors
//!
//! A minibuild is a small declarative file describing one package: where its
//! sources live, how to fetch them, how to build them and what it depends on.
//! Minibuilds live in minilays (plain directories, usually version controlled)
//! and the file name is the package name.

pub mod parser;
pub mod registry;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{MinimergeError, Result};

pub use registry::MinibuildRegistry;

/// Package category, also the first component of the install path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Category {
    Eggs,
    Dependencies,
    Meta,
    Other(String),
}

impl Category {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "eggs" => Category::Eggs,
            "dependencies" => Category::Dependencies,
            "meta" => Category::Meta,
            other => Category::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Category::Eggs => "eggs",
            Category::Dependencies => "dependencies",
            Category::Meta => "meta",
            Category::Other(other) => other,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed minibuild
#[derive(Debug, Clone)]
pub struct Minibuild {
    /// Package name (the descriptor file name)
    pub name: String,

    /// Descriptor file this record was read from
    pub path: PathBuf,

    pub category: Category,

    /// Dependencies in declaration order
    pub dependencies: Vec<String>,

    pub src_uri: Option<String>,

    /// Fetcher selector
    pub src_type: Option<String>,

    /// Maker selector
    pub install_method: Option<String>,

    /// Every key of the `[minibuild]` section, including the ones above
    pub options: BTreeMap<String, String>,
}

impl Minibuild {
    /// Build a record from the key/value section of a descriptor
    pub fn from_section(
        name: &str,
        path: &Path,
        options: BTreeMap<String, String>,
    ) -> Result<Self> {
        validate_name(name, path)?;

        let get = |key: &str| {
            options
                .get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let category = get("category")
            .map(|c| Category::parse(&c))
            .unwrap_or_else(|| Category::Other(String::new()));
        let dependencies = options
            .get("dependencies")
            .map(|deps| deps.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();

        let minibuild = Minibuild {
            name: name.to_string(),
            path: path.to_path_buf(),
            category,
            dependencies,
            src_uri: get("src_uri"),
            src_type: get("src_type"),
            install_method: get("install_method"),
            options,
        };
        minibuild.validate()?;
        Ok(minibuild)
    }

    fn validate(&self) -> Result<()> {
        if self.category == Category::Meta {
            return Ok(());
        }
        if matches!(&self.category, Category::Other(c) if c.is_empty()) {
            return Err(self.invalid("missing 'category'"));
        }
        if !is_valid_name(self.category.as_str()) {
            return Err(self.invalid("invalid 'category'"));
        }
        for (key, value) in [
            ("src_uri", &self.src_uri),
            ("src_type", &self.src_type),
            ("install_method", &self.install_method),
        ] {
            if value.is_none() {
                return Err(self.invalid(&format!("missing '{key}'")));
            }
        }
        Ok(())
    }

    fn invalid(&self, reason: &str) -> MinimergeError {
        MinimergeError::InvalidMinibuild {
            name: self.name.clone(),
            path: self.path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Raw option lookup, used by makers and fetchers for their own keys
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Revision to fetch, if pinned
    pub fn revision(&self) -> Option<&str> {
        self.option("revision")
    }

    /// Where this package is installed under `prefix`
    pub fn install_path(&self, prefix: &Path) -> PathBuf {
        prefix.join(self.category.as_str()).join(&self.name)
    }

    pub fn is_meta(&self) -> bool {
        self.category == Category::Meta
    }
}

/// Names end up as path components of the install path
fn is_valid_name(name: &str) -> bool {
    !matches!(name, "" | "." | "..")
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '+' | '-'))
}

fn validate_name(name: &str, path: &Path) -> Result<()> {
    if is_valid_name(name) {
        Ok(())
    } else {
        Err(MinimergeError::InvalidMinibuild {
            name: name.to_string(),
            path: path.display().to_string(),
            reason: "names may only contain letters, digits, '.', '_', '+' and '-'".to_string(),
        })
    }
}
