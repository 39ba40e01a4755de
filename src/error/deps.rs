//! Minibuild lookup and dependency graph errors

use super::MinimergeError;

/// A requested package that no minilay provides
pub fn not_found(name: &str) -> MinimergeError {
    MinimergeError::MinibuildNotFound {
        name: name.to_string(),
        referrer: None,
    }
}

/// A declared dependency that no minilay provides
pub fn dependency_not_found(name: &str, referrer: &str) -> MinimergeError {
    MinimergeError::MinibuildNotFound {
        name: name.to_string(),
        referrer: Some(referrer.to_string()),
    }
}

/// A cycle, rendered as `a -> b -> a`
pub fn circular<S: AsRef<str>>(chain: &[S]) -> MinimergeError {
    MinimergeError::CircularDependency {
        chain: chain
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(" -> "),
    }
}
