//! Source fetchers
//!
//! A fetcher brings a package's sources to its install path, selected by the
//! minibuild's `src_type`. Version control fetchers leave a working copy
//! there; the local fetcher either copies a tree or stages an archive that
//! still has to be unpacked.

pub mod git;
pub mod local;
pub mod scm;

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::capability::CapabilityRegistry;
use crate::error::Result;

/// Where and what to fetch
#[derive(Debug, Clone, Copy)]
pub struct FetchRequest<'a> {
    pub uri: &'a str,
    /// Install path receiving the sources
    pub dest: &'a Path,
    /// Staging directory for downloaded archives
    pub downloads: &'a Path,
    pub revision: Option<&'a str>,
}

/// Outcome of a fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched {
    /// Sources are ready in this directory
    Tree(PathBuf),
    /// An archive that must be unpacked into the install path
    Archive(PathBuf),
}

pub trait Fetcher {
    /// Short name used in logs and errors
    fn name(&self) -> &'static str;

    /// Directory a working copy of this kind carries (`.git`, `.hg`, ...)
    fn metadata_dir(&self) -> Option<&'static str> {
        None
    }

    /// Whether `uri` has a shape this fetcher can handle
    fn is_valid_src_uri(&self, uri: &str) -> bool;

    /// Fetch sources into `request.dest` for the first time
    fn fetch(&self, request: &FetchRequest<'_>) -> Result<Fetched>;

    /// Refresh an existing working copy, from `uri` when given
    fn update(&self, dest: &Path, uri: Option<&str>, revision: Option<&str>) -> Result<()>;

    /// Whether `dest` already holds sources fetched by this fetcher
    fn is_fetched(&self, dest: &Path) -> bool {
        match self.metadata_dir() {
            Some(dir) => dest.join(dir).is_dir(),
            None => dest
                .read_dir()
                .map(|mut entries| entries.next().is_some())
                .unwrap_or(false),
        }
    }

    /// Sources already available locally, used in offline mode
    fn cached(&self, request: &FetchRequest<'_>) -> Option<Fetched> {
        self.is_fetched(request.dest)
            .then(|| Fetched::Tree(request.dest.to_path_buf()))
    }

    fn fetch_or_update(&self, request: &FetchRequest<'_>) -> Result<Fetched> {
        if self.is_fetched(request.dest) {
            debug!(fetcher = self.name(), dest = %request.dest.display(), "updating sources");
            self.update(request.dest, Some(request.uri), request.revision)?;
            Ok(Fetched::Tree(request.dest.to_path_buf()))
        } else {
            debug!(fetcher = self.name(), dest = %request.dest.display(), "fetching sources");
            self.fetch(request)
        }
    }
}

/// Scheme of a URI (`https` for `https://...`), if it has one
pub fn scheme(uri: &str) -> Option<&str> {
    let (scheme, rest) = uri.split_once("://")?;
    let valid = !scheme.is_empty()
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    (valid && !rest.is_empty()).then_some(scheme)
}

/// Every fetcher compiled in, keyed and matched by `src_type`
pub fn registry() -> Result<CapabilityRegistry<dyn Fetcher>> {
    let mut registry: CapabilityRegistry<dyn Fetcher> = CapabilityRegistry::new("fetcher");
    registry.register("git", |s| s == "git", || Box::new(git::GitFetcher))?;
    registry.register(
        "hg",
        |s| matches!(s, "hg" | "mercurial"),
        || Box::new(scm::ScmFetcher::mercurial()),
    )?;
    registry.register(
        "svn",
        |s| matches!(s, "svn" | "subversion"),
        || Box::new(scm::ScmFetcher::subversion()),
    )?;
    registry.register(
        "local",
        |s| matches!(s, "local" | "file"),
        || Box::new(local::LocalFetcher),
    )?;
    Ok(registry)
}
