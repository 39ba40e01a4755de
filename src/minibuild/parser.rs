//! Minibuild descriptor parsing
//!
//! Descriptors are INI-like files. Only the `[minibuild]` section is read:
//!
//! ```text
//! [minibuild]
//! dependencies=python-2.5 libxml2
//! src_uri=https://hg.example.org/foo
//! src_type=hg
//! install_method=buildout
//! category=eggs
//! ```
//!
//! `#` and `;` start comments, and indented lines continue the previous value.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{MinimergeError, Result};

use super::Minibuild;

const SECTION: &str = "minibuild";

/// Read and parse the descriptor at `path`; the file name is the package name
pub fn parse_file(path: &Path) -> Result<Minibuild> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let content = std::fs::read_to_string(path).map_err(|e| MinimergeError::InvalidMinibuild {
        name: name.clone(),
        path: path.display().to_string(),
        reason: format!("cannot read descriptor: {e}"),
    })?;
    parse_str(&name, path, &content)
}

/// Parse descriptor text
pub fn parse_str(name: &str, path: &Path, content: &str) -> Result<Minibuild> {
    let section = parse_section(content).map_err(|reason| MinimergeError::InvalidMinibuild {
        name: name.to_string(),
        path: path.display().to_string(),
        reason,
    })?;
    Minibuild::from_section(name, path, section)
}

fn parse_section(content: &str) -> std::result::Result<BTreeMap<String, String>, String> {
    let mut values: BTreeMap<String, String> = BTreeMap::new();
    let mut current: Option<String> = None;
    let mut in_section = false;
    let mut seen_section = false;

    for (lineno, raw) in content.lines().enumerate() {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }

        if let Some(header) = trimmed.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
            in_section = header.trim() == SECTION;
            seen_section |= in_section;
            current = None;
            continue;
        }

        if !in_section {
            continue;
        }

        // continuation line
        if raw.starts_with([' ', '\t']) {
            if let Some(key) = &current {
                if let Some(value) = values.get_mut(key) {
                    value.push(' ');
                    value.push_str(trimmed);
                }
                continue;
            }
        }

        let Some((key, value)) = trimmed.split_once('=').or_else(|| trimmed.split_once(':'))
        else {
            return Err(format!("line {}: expected 'key=value'", lineno + 1));
        };
        let key = key.trim().to_lowercase();
        values.insert(key.clone(), value.trim().to_string());
        current = Some(key);
    }

    if seen_section {
        Ok(values)
    } else {
        Err(format!("no [{SECTION}] section"))
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::minibuild::Category;

    #[test]
    fn test_parse_basic_descriptor() {
        let mb = parse_str(
            "minibuild-1",
            Path::new("minibuild-1"),
            "\n[minibuild]\ndependencies=minibuild-0\nsrc_uri=https://hg.example.org/m\nsrc_type=hg\ninstall_method=buildout\ncategory=eggs\n",
        )
        .expect("descriptor should parse");
        assert_eq!(mb.name, "minibuild-1");
        assert_eq!(mb.dependencies, vec!["minibuild-0"]);
        assert_eq!(mb.category, Category::Eggs);
    }

    #[test]
    fn test_continuation_lines_and_comments() {
        let mb = parse_str(
            "zope",
            Path::new("zope"),
            "# leading comment\n[minibuild]\ndependencies=a\n    b\n\tc\n; other\ncategory=meta\n",
        )
        .expect("descriptor should parse");
        assert_eq!(mb.dependencies, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_other_sections_are_ignored() {
        let mb = parse_str(
            "m",
            Path::new("m"),
            "[other]\ncategory=eggs\n[minibuild]\ncategory=meta\n",
        )
        .expect("descriptor should parse");
        assert!(mb.is_meta());
    }

    #[test]
    fn test_missing_section() {
        let err = parse_str("m", Path::new("m"), "category=eggs\n").expect_err("no section");
        assert!(err.to_string().contains("no [minibuild] section"));
    }

    #[test]
    fn test_garbage_line() {
        let err = parse_str("m", Path::new("m"), "[minibuild]\nnot a pair\n")
            .expect_err("garbage line");
        assert!(err.to_string().contains("line 2"));
    }
}
