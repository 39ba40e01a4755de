//! Action orchestrator
//!
//! A run is planned completely before anything touches the filesystem: the
//! request list is truncated by `--jump`, resolved (or looked up as is with
//! `--nodeps`) and handed to variant selection. The plan is then executed
//! in order and the first failing package stops the run.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use console::style;
use tracing::{debug, info, warn};

use crate::error::backend::invalid_uri;
use crate::error::{MinimergeError, Result};
use crate::fetch::{FetchRequest, Fetched};
use crate::make::MakeRequest;
use crate::minibuild::{Minibuild, MinibuildRegistry};
use crate::progress::ProgressDisplay;
use crate::resolver::{self, Resolver};
use crate::variant::{VariantMap, VariantSelector};

use super::{Action, Backends, Context};

/// File left in an install path once its package is built
pub const INSTALLED_MARKER: &str = ".minimerge-installed";

/// Working copy metadata directories and the fetcher that syncs them
const MINILAY_VCS: [(&str, &str); 3] = [(".git", "git"), (".hg", "hg"), (".svn", "svn")];

/// Packages to act on, in execution order
#[derive(Debug)]
pub struct Plan<'r> {
    pub packages: Vec<&'r Minibuild>,
    pub variants: VariantMap,
}

impl Plan<'_> {
    pub fn names(&self) -> Vec<&str> {
        self.packages.iter().map(|m| m.name.as_str()).collect()
    }
}

/// What happened to one package
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Built,
    AlreadyInstalled,
    /// Sources fetched, build skipped
    Fetched,
    /// Meta package, nothing to fetch or build
    Nothing,
    Removed,
    NotInstalled,
}

pub struct Orchestrator<'a> {
    context: &'a Context,
    backends: &'a Backends,
    progress: ProgressDisplay,
}

impl<'a> Orchestrator<'a> {
    pub fn new(context: &'a Context, backends: &'a Backends) -> Self {
        Self {
            context,
            backends,
            progress: ProgressDisplay::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressDisplay) -> Self {
        self.progress = progress;
        self
    }

    /// Execute the configured action, returning what happened per package
    pub fn run(&self, registry: &mut MinibuildRegistry) -> Result<Vec<(String, Outcome)>> {
        if self.context.options.action == Action::Sync {
            self.sync(registry)?;
            return Ok(Vec::new());
        }
        let plan = self.plan(registry)?;
        info!(
            action = %self.context.options.action,
            packages = ?plan.names(),
            "plan computed"
        );
        self.execute(&plan)
    }

    fn requested(&self) -> Vec<String> {
        let options = &self.context.options;
        match &options.jump {
            Some(jump) => resolver::truncate(&options.packages, jump),
            None => options.packages.clone(),
        }
    }

    /// Compute the ordered package list without side effects
    pub fn plan<'r>(&self, registry: &'r MinibuildRegistry) -> Result<Plan<'r>> {
        let options = &self.context.options;
        let requested = self.requested();
        let resolver = Resolver::new(registry);

        if options.action == Action::Remove {
            let mut packages = resolver.without_dependencies(&requested)?;
            packages.reverse();
            return Ok(Plan {
                packages,
                variants: VariantMap::new(),
            });
        }

        let order = if options.nodeps {
            resolver.without_dependencies(&requested)?
        } else {
            resolver.resolve(&requested)?
        };
        let selector = VariantSelector::new(registry, &self.context.config.variants)
            .lenient(options.nodeps);
        let available = selector.available_variants();
        let selection = selector.select(&order, &requested, &available)?;

        let packages = if options.nodeps {
            order
        } else {
            selection.order
        };
        Ok(Plan {
            packages,
            variants: selection.variants,
        })
    }

    fn execute(&self, plan: &Plan<'_>) -> Result<Vec<(String, Outcome)>> {
        let action = self.context.options.action;
        let mut outcomes = Vec::with_capacity(plan.packages.len());
        self.progress.set_total(plan.packages.len() as u64);

        for minibuild in &plan.packages {
            self.progress
                .update_package(&action.to_string(), &minibuild.name);
            let result = match action {
                Action::Remove => self.remove(minibuild),
                _ => self.install(minibuild, plan.variants.get(&minibuild.name)),
            };
            match result {
                Ok(outcome) => {
                    self.progress.inc_package();
                    outcomes.push((minibuild.name.clone(), outcome));
                }
                Err(e) => {
                    self.progress.abandon();
                    return Err(e.for_package(&minibuild.name));
                }
            }
        }

        self.progress.finish();
        Ok(outcomes)
    }

    fn install(
        &self,
        minibuild: &Minibuild,
        variants: Option<&BTreeSet<String>>,
    ) -> Result<Outcome> {
        let options = &self.context.options;
        if minibuild.is_meta() {
            debug!(package = %minibuild.name, "meta package, nothing to do");
            return Ok(Outcome::Nothing);
        }
        let (Some(uri), Some(src_type)) = (minibuild.src_uri.as_deref(), minibuild.src_type.as_deref())
        else {
            debug!(package = %minibuild.name, "nothing to fetch or build");
            return Ok(Outcome::Nothing);
        };

        let dest = minibuild.install_path(self.context.prefix());
        let marker = dest.join(INSTALLED_MARKER);
        let rebuild = options.action == Action::Rebuild;
        if rebuild && marker.exists() {
            fs::remove_file(&marker)?;
        } else if marker.exists() && !options.upgrade && !options.fetchonly {
            info!(package = %minibuild.name, path = %dest.display(), "already installed");
            self.progress
                .println(status("Installed", &minibuild.name, "already"));
            return Ok(Outcome::AlreadyInstalled);
        }

        let fetcher = self.backends.fetchers.resolve(src_type)?;
        if !fetcher.is_valid_src_uri(uri) {
            return Err(invalid_uri(fetcher.name(), uri));
        }
        let downloads = self.context.downloads_dir();
        let request = FetchRequest {
            uri,
            dest: &dest,
            downloads: &downloads,
            revision: minibuild.revision(),
        };

        let fetched = if options.offline {
            fetcher
                .cached(&request)
                .ok_or_else(|| MinimergeError::OfflineSourceMissing {
                    name: minibuild.name.clone(),
                    path: dest.display().to_string(),
                })?
        } else if options.upgrade {
            fetcher.fetch_or_update(&request)?
        } else {
            match fetcher.cached(&request) {
                Some(cached) => {
                    debug!(package = %minibuild.name, "reusing fetched sources");
                    cached
                }
                None => {
                    self.progress
                        .println(status("Fetching", &minibuild.name, fetcher.name()));
                    fetcher.fetch(&request)?
                }
            }
        };
        if let Fetched::Archive(archive) = &fetched {
            let unpacker = self
                .backends
                .unpackers
                .resolve(&archive.to_string_lossy())?;
            debug!(archive = %archive.display(), unpacker = unpacker.name(), "unpacking");
            unpacker.unpack(archive, &dest)?;
        }

        if options.fetchonly {
            info!(package = %minibuild.name, "fetched, not building");
            return Ok(Outcome::Fetched);
        }
        let Some(method) = minibuild.install_method.as_deref() else {
            debug!(package = %minibuild.name, "no install method, sources only");
            return Ok(Outcome::Fetched);
        };

        let maker = self.backends.makers.resolve(method)?;
        let make_request = MakeRequest {
            minibuild,
            directory: &dest,
            prefix: self.context.prefix(),
            variants,
            offline: options.offline,
            upgrade: options.upgrade,
            debug: options.debug,
            verbose: options.verbose,
        };
        let make_options = maker.get_options(&make_request)?;
        self.progress.println(status(
            if rebuild { "Rebuilding" } else { "Building" },
            &minibuild.name,
            maker.name(),
        ));
        if rebuild {
            maker.reinstall(&make_request, &make_options)?;
        } else {
            maker.install(&make_request, &make_options)?;
        }

        write_marker(&marker, minibuild, variants)?;
        Ok(Outcome::Built)
    }

    fn remove(&self, minibuild: &Minibuild) -> Result<Outcome> {
        let dest = minibuild.install_path(self.context.prefix());
        if !dest.exists() {
            warn!(package = %minibuild.name, path = %dest.display(), "not installed, nothing to remove");
            return Ok(Outcome::NotInstalled);
        }
        fs::remove_dir_all(&dest)?;
        info!(package = %minibuild.name, path = %dest.display(), "removed");
        self.progress
            .println(status("Removed", &minibuild.name, &dest.display().to_string()));
        Ok(Outcome::Removed)
    }

    /// Update minilays that are working copies, then reload them
    fn sync(&self, registry: &mut MinibuildRegistry) -> Result<()> {
        for root in registry.roots().to_vec() {
            let Some((_, kind)) = MINILAY_VCS.iter().find(|(dir, _)| root.join(dir).is_dir())
            else {
                debug!(minilay = %root.display(), "not a working copy, skipping");
                continue;
            };
            if self.context.options.offline {
                info!(minilay = %root.display(), "offline, not syncing");
                continue;
            }
            let fetcher = self.backends.fetchers.resolve(kind)?;
            self.progress
                .println(status("Syncing", &root.display().to_string(), fetcher.name()));
            fetcher
                .update(&root, None, None)
                .map_err(|e| e.for_package(&root.display().to_string()))?;
        }
        registry.rescan()
    }
}

/// Operator-facing status line: `<Verb> <subject> (<detail>)`
fn status(verb: &str, subject: &str, detail: &str) -> String {
    format!(
        "{:>12} {} {}",
        style(verb).green().bold(),
        subject,
        style(format!("({detail})")).dim()
    )
}

fn write_marker(
    marker: &Path,
    minibuild: &Minibuild,
    variants: Option<&BTreeSet<String>>,
) -> Result<()> {
    let mut content = format!("{}\n", minibuild.name);
    if let Some(variants) = variants {
        content.push_str(&variants.iter().cloned().collect::<Vec<_>>().join(" "));
        content.push('\n');
    }
    fs::write(marker, content)?;
    Ok(())
}
