//! Build drivers ("makers")
//!
//! A maker turns fetched sources sitting in a package's install path into an
//! installed package. It is selected by the minibuild's `install_method` and
//! receives the package's variant set so it can fan out one build per
//! runtime variant.

pub mod buildout;
pub mod script;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::capability::CapabilityRegistry;
use crate::error::Result;
use crate::minibuild::Minibuild;

/// Everything a maker needs to know about one package build
#[derive(Debug, Clone, Copy)]
pub struct MakeRequest<'a> {
    pub minibuild: &'a Minibuild,
    /// Install path holding the sources
    pub directory: &'a Path,
    pub prefix: &'a Path,
    pub variants: Option<&'a BTreeSet<String>>,
    pub offline: bool,
    pub upgrade: bool,
    pub debug: bool,
    pub verbose: bool,
}

/// Options computed by a maker before building
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MakeOptions {
    /// Build steps to run, all of them when empty
    pub parts: Vec<String>,
    /// Variant tags to build for, once unvaried when empty
    pub variants: Vec<String>,
    pub config_file: Option<String>,
    pub command: Option<String>,
    pub interpreter: Option<PathBuf>,
    /// Local package caches handed to the build tool
    pub find_links: Vec<PathBuf>,
    pub offline: bool,
    pub upgrade: bool,
    pub debug: bool,
    pub verbose: bool,
}

pub trait Maker {
    fn name(&self) -> &'static str;

    fn get_options(&self, request: &MakeRequest<'_>) -> Result<MakeOptions>;

    fn install(&self, request: &MakeRequest<'_>, options: &MakeOptions) -> Result<()>;

    /// Build again, discarding the maker's own completion state first
    fn reinstall(&self, request: &MakeRequest<'_>, options: &MakeOptions) -> Result<()> {
        self.install(request, options)
    }
}

/// Every maker compiled in, matched by `install_method`
pub fn registry() -> Result<CapabilityRegistry<dyn Maker>> {
    let mut registry: CapabilityRegistry<dyn Maker> = CapabilityRegistry::new("maker");
    registry.register(
        "buildout",
        |s| s == "buildout",
        || Box::new(buildout::BuildoutMaker),
    )?;
    registry.register(
        "script",
        |s| matches!(s, "script" | "shell"),
        || Box::new(script::ScriptMaker),
    )?;
    Ok(registry)
}
