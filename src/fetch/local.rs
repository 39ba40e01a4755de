//! Local filesystem fetcher
//!
//! `src_uri` is a `file://` URI or an absolute path. A directory is copied
//! into the install path; a file is staged in the downloads directory as an
//! archive for the unpackers.

use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::backend::{fetch_failed, invalid_uri};
use crate::error::Result;

use super::{FetchRequest, Fetched, Fetcher};

pub struct LocalFetcher;

impl LocalFetcher {
    fn source_path(uri: &str) -> Option<PathBuf> {
        let path = uri.strip_prefix("file://").unwrap_or(uri);
        let path = Path::new(path);
        path.is_absolute().then(|| path.to_path_buf())
    }

    fn staged_archive(request: &FetchRequest<'_>) -> Option<PathBuf> {
        let source = Self::source_path(request.uri)?;
        Some(request.downloads.join(source.file_name()?))
    }
}

impl Fetcher for LocalFetcher {
    fn name(&self) -> &'static str {
        "local"
    }

    fn is_valid_src_uri(&self, uri: &str) -> bool {
        Self::source_path(uri).is_some()
    }

    fn fetch(&self, request: &FetchRequest<'_>) -> Result<Fetched> {
        let source =
            Self::source_path(request.uri).ok_or_else(|| invalid_uri(self.name(), request.uri))?;

        if source.is_dir() {
            info!(source = %source.display(), dest = %request.dest.display(), "copying source tree");
            copy_tree(&source, request.dest).map_err(|e| fetch_failed(request.uri, e))?;
            return Ok(Fetched::Tree(request.dest.to_path_buf()));
        }

        if source.is_file() {
            let staged = Self::staged_archive(request)
                .ok_or_else(|| invalid_uri(self.name(), request.uri))?;
            info!(source = %source.display(), staged = %staged.display(), "staging archive");
            stage_file(&source, &staged).map_err(|e| fetch_failed(request.uri, e))?;
            return Ok(Fetched::Archive(staged));
        }

        Err(fetch_failed(request.uri, "no such file or directory"))
    }

    fn update(&self, dest: &Path, uri: Option<&str>, _revision: Option<&str>) -> Result<()> {
        let Some(uri) = uri else {
            debug!(dest = %dest.display(), "local sources have no upstream to update from");
            return Ok(());
        };
        let source = Self::source_path(uri).ok_or_else(|| invalid_uri(self.name(), uri))?;
        if !source.is_dir() {
            return Err(fetch_failed(uri, "only directory sources can be updated in place"));
        }
        copy_tree(&source, dest).map_err(|e| fetch_failed(uri, e))
    }

    fn cached(&self, request: &FetchRequest<'_>) -> Option<Fetched> {
        if self.is_fetched(request.dest) {
            return Some(Fetched::Tree(request.dest.to_path_buf()));
        }
        Self::staged_archive(request)
            .filter(|staged| staged.is_file())
            .map(Fetched::Archive)
    }

    fn fetch_or_update(&self, request: &FetchRequest<'_>) -> Result<Fetched> {
        // copies and staging are idempotent
        self.fetch(request)
    }
}

/// Copy every entry of `source` into `dest`, overwriting files
fn copy_tree(source: &Path, dest: &Path) -> std::io::Result<()> {
    for entry in WalkDir::new(source).follow_links(false) {
        let entry = entry.map_err(std::io::Error::other)?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(std::io::Error::other)?;
        let target = dest.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Copy `source` to `staged` through a temporary file in the same directory
fn stage_file(source: &Path, staged: &Path) -> std::io::Result<()> {
    let dir = staged
        .parent()
        .ok_or_else(|| std::io::Error::other("staging path has no parent"))?;
    std::fs::create_dir_all(dir)?;
    let mut temp = NamedTempFile::new_in(dir)?;
    let mut input = std::fs::File::open(source)?;
    std::io::copy(&mut input, temp.as_file_mut())?;
    temp.persist(staged).map_err(|e| e.error)?;
    Ok(())
}
