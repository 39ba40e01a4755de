//! Common test utilities for minimerge integration tests

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Minilay every test writes its minibuilds to
pub const MINILAY: &str = "minilays/core";

/// A scratch installation prefix, isolated from the user's environment
#[allow(dead_code)]
pub struct TestPrefix {
    pub temp: TempDir,
    /// Installation prefix
    pub path: PathBuf,
    /// Fake home directory, so `~/.minimerge.yaml` is never picked up
    pub home: PathBuf,
}

#[allow(dead_code)]
impl TestPrefix {
    /// A bootstrapped prefix with a default configuration and one minilay
    pub fn new() -> Self {
        let prefix = Self::bare();
        prefix.write_file("etc/minimerge.yaml", "default_action: install\n");
        std::fs::create_dir_all(prefix.path.join(MINILAY)).expect("Failed to create minilay");
        prefix
    }

    /// A prefix directory that was never initialized
    pub fn bare() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let path = temp.path().join("prefix");
        let home = temp.path().join("home");
        std::fs::create_dir_all(&home).expect("Failed to create home directory");
        Self { temp, path, home }
    }

    /// Write a minibuild descriptor into the test minilay
    pub fn write_minibuild(&self, name: &str, body: &str) {
        self.write_file(&format!("{MINILAY}/{name}"), &format!("[minibuild]\n{body}"));
    }

    /// Write a `dependencies` minibuild built by the script maker from `source`
    pub fn script_minibuild(&self, name: &str, deps: &str, source: &Path, command: &str) {
        self.write_minibuild(
            name,
            &format!(
                "category=dependencies\n\
                 dependencies={deps}\n\
                 src_type=local\n\
                 src_uri={}\n\
                 install_method=script\n\
                 install_command={command}\n",
                source.display()
            ),
        );
    }

    /// Create a source tree outside the prefix holding `files`
    pub fn source_tree(&self, name: &str, files: &[(&str, &str)]) -> PathBuf {
        let root = self.temp.path().join("sources").join(name);
        std::fs::create_dir_all(&root).expect("Failed to create source tree");
        for (file, content) in files {
            std::fs::write(root.join(file), content).expect("Failed to write source file");
        }
        root
    }

    /// Write a file relative to the prefix
    pub fn write_file(&self, path: &str, content: &str) {
        let file_path = self.path.join(path);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&file_path, content).expect("Failed to write file");
    }

    /// Read a file relative to the prefix
    pub fn read_file(&self, path: &str) -> String {
        std::fs::read_to_string(self.path.join(path)).expect("Failed to read file")
    }

    /// Check if a path exists relative to the prefix
    pub fn file_exists(&self, path: &str) -> bool {
        self.path.join(path).exists()
    }

    /// The minimerge binary, pointed at this prefix
    pub fn cmd(&self) -> Command {
        let mut cmd = minimerge_cmd();
        cmd.env("HOME", &self.home)
            .env_remove("MINIMERGE_PREFIX")
            .env_remove("MINIMERGE_CONFIG")
            .env_remove("MINILAYS")
            .env_remove("RUST_LOG")
            .arg("--prefix")
            .arg(&self.path);
        cmd
    }
}

impl Default for TestPrefix {
    fn default() -> Self {
        Self::new()
    }
}

// Temporary fix for deprecated cargo_bin - will be updated when build-dir issues are resolved
#[allow(deprecated)]
pub fn minimerge_cmd() -> Command {
    Command::cargo_bin("minimerge").expect("minimerge binary")
}
