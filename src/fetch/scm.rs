//! Mercurial and Subversion fetchers
//!
//! Both drive the external client; the binary must be on `PATH`.

use std::path::Path;

use tracing::info;

use crate::error::Result;
use crate::error::backend::{fetch_failed, invalid_uri};
use crate::process;

use super::{FetchRequest, Fetched, Fetcher, scheme};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tool {
    Mercurial,
    Subversion,
}

/// Fetcher shelling out to `hg` or `svn`
pub struct ScmFetcher {
    tool: Tool,
}

impl ScmFetcher {
    pub fn mercurial() -> Self {
        Self {
            tool: Tool::Mercurial,
        }
    }

    pub fn subversion() -> Self {
        Self {
            tool: Tool::Subversion,
        }
    }

    fn program(&self) -> &'static str {
        match self.tool {
            Tool::Mercurial => "hg",
            Tool::Subversion => "svn",
        }
    }

    fn accepted_schemes(&self) -> &'static [&'static str] {
        match self.tool {
            Tool::Mercurial => &["file", "hg", "ssh", "http", "https"],
            Tool::Subversion => &["file", "svn", "svn+ssh", "http", "https"],
        }
    }

    fn default_revision(&self) -> &'static str {
        match self.tool {
            Tool::Mercurial => "tip",
            Tool::Subversion => "HEAD",
        }
    }

    fn run(&self, location: &str, args: &[&str]) -> Result<()> {
        process::run(self.program(), args, None, &[])
            .map(|_| ())
            .map_err(|e| fetch_failed(location, e))
    }
}

impl Fetcher for ScmFetcher {
    fn name(&self) -> &'static str {
        self.program()
    }

    fn metadata_dir(&self) -> Option<&'static str> {
        match self.tool {
            Tool::Mercurial => Some(".hg"),
            Tool::Subversion => Some(".svn"),
        }
    }

    fn is_valid_src_uri(&self, uri: &str) -> bool {
        scheme(uri).is_some_and(|scheme| self.accepted_schemes().contains(&scheme))
    }

    fn fetch(&self, request: &FetchRequest<'_>) -> Result<Fetched> {
        if !self.is_valid_src_uri(request.uri) {
            return Err(invalid_uri(self.name(), request.uri));
        }
        if let Some(parent) = request.dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let dest = request.dest.to_string_lossy();
        let revision = request.revision.unwrap_or(self.default_revision());
        info!(tool = self.program(), uri = %request.uri, dest = %dest, revision, "checkout");

        match self.tool {
            Tool::Mercurial => {
                self.run(request.uri, &["clone", request.uri, &*dest])?;
                self.run(request.uri, &["up", "-r", revision, "-R", &*dest])?;
            }
            Tool::Subversion => {
                self.run(request.uri, &["co", "-r", revision, request.uri, &*dest])?;
            }
        }
        Ok(Fetched::Tree(request.dest.to_path_buf()))
    }

    fn update(&self, dest: &Path, uri: Option<&str>, revision: Option<&str>) -> Result<()> {
        if let Some(uri) = uri {
            if !self.is_valid_src_uri(uri) {
                return Err(invalid_uri(self.name(), uri));
            }
        }
        let location = uri.map_or_else(|| dest.display().to_string(), str::to_string);
        let path = dest.to_string_lossy();
        let revision = revision.unwrap_or(self.default_revision());
        info!(tool = self.program(), dest = %path, revision, "update");

        match self.tool {
            Tool::Mercurial => {
                match uri {
                    Some(uri) => self.run(&location, &["pull", "-f", uri, "-R", &*path])?,
                    None => self.run(&location, &["pull", "-f", "-R", &*path])?,
                }
                self.run(&location, &["up", "-r", revision, "-R", &*path])
            }
            Tool::Subversion => self.run(&location, &["up", "-r", revision, &*path]),
        }
    }
}
