//! Capability registry
//!
//! Backends (fetchers, unpackers, makers) are registered under a logical key
//! together with a predicate deciding which selector values they accept.
//! Dispatch walks the entries in registration order and picks the first one
//! whose predicate matches, so overlapping or pattern based selectors are
//! allowed and earlier registrations win ties.
//!
//! Keys are only used by configuration: [`CapabilityRegistry::activate`]
//! keeps and reorders the entries named in `minimerge.yaml`. Providers are
//! constructed on their first successful match.

use std::cell::OnceCell;

use tracing::debug;

use crate::error::{MinimergeError, Result};

/// Selector predicate of a registered provider
pub type Predicate = Box<dyn Fn(&str) -> bool>;

/// Provider constructor
pub type Factory<P> = Box<dyn Fn() -> Box<P>>;

struct Entry<P: ?Sized> {
    key: String,
    matches: Predicate,
    factory: Factory<P>,
    instance: OnceCell<Box<P>>,
}

impl<P: ?Sized> Entry<P> {
    fn provider(&self) -> &P {
        self.instance.get_or_init(|| {
            debug!(key = %self.key, "constructing provider");
            (self.factory)()
        })
    }
}

/// Predicate based dispatch table for one kind of provider
pub struct CapabilityRegistry<P: ?Sized> {
    kind: &'static str,
    entries: Vec<Entry<P>>,
}

impl<P: ?Sized> CapabilityRegistry<P> {
    /// Create an empty registry; `kind` names the providers in errors
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: Vec::new(),
        }
    }

    /// Register a provider under `key`
    ///
    /// A key can only be registered once.
    pub fn register<M, F>(&mut self, key: &str, matches: M, factory: F) -> Result<()>
    where
        M: Fn(&str) -> bool + 'static,
        F: Fn() -> Box<P> + 'static,
    {
        if self.entries.iter().any(|e| e.key == key) {
            return Err(MinimergeError::DuplicateProvider {
                kind: self.kind.to_string(),
                key: key.to_string(),
            });
        }
        self.entries.push(Entry {
            key: key.to_string(),
            matches: Box::new(matches),
            factory: Box::new(factory),
            instance: OnceCell::new(),
        });
        Ok(())
    }

    /// Keep only the entries named in `keys`, in that order
    pub fn activate<S: AsRef<str>>(&mut self, keys: &[S]) -> Result<()> {
        let mut remaining = std::mem::take(&mut self.entries);
        let mut active: Vec<Entry<P>> = Vec::with_capacity(keys.len());
        for key in keys {
            let key = key.as_ref();
            let Some(index) = remaining.iter().position(|e| e.key == key) else {
                let already = active.iter().any(|e| e.key == key);
                return Err(MinimergeError::ConfigInvalid {
                    message: if already {
                        format!("{} '{}' is listed twice", self.kind, key)
                    } else {
                        format!("unknown {} '{}'", self.kind, key)
                    },
                });
            };
            active.push(remaining.remove(index));
        }
        if !remaining.is_empty() {
            debug!(
                kind = self.kind,
                disabled = ?remaining.iter().map(|e| e.key.as_str()).collect::<Vec<_>>(),
                "providers disabled by configuration"
            );
        }
        self.entries = active;
        Ok(())
    }

    /// First provider, in registration order, accepting `switch`
    pub fn resolve(&self, switch: &str) -> Result<&P> {
        self.entries
            .iter()
            .find(|e| (e.matches)(switch))
            .map(|e| {
                debug!(kind = self.kind, switch = %switch, key = %e.key, "provider selected");
                e.provider()
            })
            .ok_or_else(|| MinimergeError::ProviderNotFound {
                kind: self.kind.to_string(),
                switch: switch.to_string(),
            })
    }

    /// Registered keys, in dispatch order
    pub fn keys(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.key.as_str()).collect()
    }
}
