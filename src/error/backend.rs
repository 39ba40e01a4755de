//! Fetcher, unpacker and maker errors

use std::path::Path;

use super::MinimergeError;

pub fn fetch_failed(uri: &str, reason: impl ToString) -> MinimergeError {
    MinimergeError::FetchFailure {
        uri: uri.to_string(),
        reason: reason.to_string(),
    }
}

pub fn invalid_uri(fetcher: &str, uri: &str) -> MinimergeError {
    MinimergeError::InvalidSourceUri {
        fetcher: fetcher.to_string(),
        uri: uri.to_string(),
    }
}

pub fn unpack_failed(path: &Path, reason: impl ToString) -> MinimergeError {
    MinimergeError::UnpackFailure {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

pub fn build_failed(directory: &Path, reason: impl ToString) -> MinimergeError {
    MinimergeError::BuildFailure {
        directory: directory.display().to_string(),
        reason: reason.to_string(),
    }
}
