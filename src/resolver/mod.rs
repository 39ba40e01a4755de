//! Dependency resolution for minibuilds
//!
//! This module handles:
//! - Ordering a requested set of packages dependencies-first
//! - Circular dependency detection
//! - Truncating an explicit request list (`--jump`)
//! - Looking up packages without their dependencies (`--nodeps`)
//!
//! Resolution never touches the filesystem; any failure aborts it before a
//! single package action runs.

pub mod sort;

use std::collections::HashSet;

use tracing::debug;

use crate::error::Result;
use crate::minibuild::{Minibuild, MinibuildRegistry};

/// Dependency resolver over a scanned registry
pub struct Resolver<'r> {
    registry: &'r MinibuildRegistry,
}

impl<'r> Resolver<'r> {
    pub fn new(registry: &'r MinibuildRegistry) -> Self {
        Self { registry }
    }

    /// Resolve `requested` and all transitive dependencies into build order
    ///
    /// Every dependency is placed before its dependents, each name appears
    /// exactly once and the order only depends on the request order and the
    /// declaration order of dependencies.
    pub fn resolve(&self, requested: &[String]) -> Result<Vec<&'r Minibuild>> {
        let order = sort::topological_order(self.registry, requested)?;
        debug!(
            requested = ?requested,
            order = ?order.iter().map(|m| m.name.as_str()).collect::<Vec<_>>(),
            "dependencies resolved"
        );
        Ok(order)
    }

    /// Look up `requested` only, ignoring their dependencies
    pub fn without_dependencies(&self, requested: &[String]) -> Result<Vec<&'r Minibuild>> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        for name in requested {
            if seen.insert(name.as_str()) {
                order.push(self.registry.get(name)?);
            }
        }
        Ok(order)
    }
}

/// Drop every entry before the first occurrence of `jump`
///
/// Operates on the explicit request list only. An absent target leaves the
/// list unchanged.
pub fn truncate(explicit: &[String], jump: &str) -> Vec<String> {
    match explicit.iter().position(|name| name == jump) {
        Some(start) => explicit[start..].to_vec(),
        None => {
            debug!(jump = %jump, "jump target not in the request list, nothing dropped");
            explicit.to_vec()
        }
    }
}
