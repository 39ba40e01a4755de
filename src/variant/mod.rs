//! Runtime variant selection
//!
//! Some `eggs` packages must be built once per runtime version (one
//! `site-packages-2.4`, one `site-packages-2.5`, ...). Runtime versions are
//! provided by *provider* packages whose names carry a common prefix
//! (`python-2.4`, `python-2.5`) and are grouped by an *aggregator* package
//! (`meta-python`) depending on all of them. Only the prefixed dependencies
//! of the aggregator are providers, so `python-ldap` stays a plain package.
//!
//! For each `eggs` package of a resolved order:
//! - a provider reached through any edge other than the aggregator's is a
//!   *pin*; pins in the package's own dependency closure give its exact
//!   variant set,
//! - otherwise, if the closure reaches the aggregator, the variant set is the
//!   pins declared anywhere in the run or, when there are none, every
//!   available variant,
//! - otherwise the package is built once and gets no entry.
//!
//! The returned order drops providers that only came in through the
//! aggregator and that no variant set needs, and gains any needed provider
//! that is missing.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use tracing::{debug, warn};

use crate::config::VariantSettings;
use crate::error::Result;
use crate::minibuild::{Category, Minibuild, MinibuildRegistry};
use crate::resolver::Resolver;

/// Package name to the variant tags it must be built for
pub type VariantMap = BTreeMap<String, BTreeSet<String>>;

/// Result of variant selection
#[derive(Debug)]
pub struct Selection<'r> {
    /// Build order including the variant providers actually needed
    pub order: Vec<&'r Minibuild>,
    pub variants: VariantMap,
}

/// What an `eggs` package reaches through its dependencies
#[derive(Debug, Default)]
struct Reach {
    aggregator: bool,
    pins: BTreeSet<String>,
}

pub struct VariantSelector<'r, 's> {
    registry: &'r MinibuildRegistry,
    settings: &'s VariantSettings,
    /// Providers the aggregator depends on
    providers: BTreeSet<String>,
    lenient: bool,
}

impl<'r, 's> VariantSelector<'r, 's> {
    pub fn new(registry: &'r MinibuildRegistry, settings: &'s VariantSettings) -> Self {
        let providers = match registry.get(&settings.aggregator) {
            Ok(aggregator) => aggregator
                .dependencies
                .iter()
                .filter(|dep| {
                    dep.len() > settings.provider_prefix.len()
                        && dep.starts_with(&settings.provider_prefix)
                })
                .cloned()
                .collect(),
            Err(_) => {
                debug!(aggregator = %settings.aggregator, "no aggregator minibuild");
                BTreeSet::new()
            }
        };
        Self {
            registry,
            settings,
            providers,
            lenient: false,
        }
    }

    /// Skip dependencies missing from the registry instead of failing
    pub fn lenient(mut self, lenient: bool) -> Self {
        self.lenient = lenient;
        self
    }

    fn is_provider(&self, name: &str) -> bool {
        self.providers.contains(name)
    }

    fn tag<'a>(&self, name: &'a str) -> &'a str {
        &name[self.settings.provider_prefix.len()..]
    }

    fn provider_name(&self, tag: &str) -> String {
        format!("{}{}", self.settings.provider_prefix, tag)
    }

    /// Variant tags of every provider the aggregator depends on
    pub fn available_variants(&self) -> BTreeSet<String> {
        self.providers
            .iter()
            .map(|name| self.tag(name).to_string())
            .collect()
    }

    /// Compute variant sets for `order` and extend it with needed providers
    pub fn select(
        &self,
        order: &[&'r Minibuild],
        requested: &[String],
        available: &BTreeSet<String>,
    ) -> Result<Selection<'r>> {
        let run_pins = self.run_pins(order);
        let mut variants = VariantMap::new();

        for minibuild in order.iter().filter(|m| m.category == Category::Eggs) {
            let reach = self.reach(minibuild)?;
            if !reach.aggregator && reach.pins.is_empty() {
                continue;
            }
            let set = if !reach.pins.is_empty() {
                reach.pins
            } else if !run_pins.is_empty() {
                run_pins.clone()
            } else {
                available.clone()
            };
            if set.is_empty() {
                warn!(
                    package = %minibuild.name,
                    aggregator = %self.settings.aggregator,
                    "no runtime variant available, building once"
                );
                continue;
            }
            debug!(package = %minibuild.name, variants = ?set, "variants selected");
            variants.insert(minibuild.name.clone(), set);
        }

        let order = self.extend_order(order, requested, &run_pins, &variants)?;
        Ok(Selection { order, variants })
    }

    /// Providers pinned by any package of the run other than the aggregator
    fn run_pins(&self, order: &[&Minibuild]) -> BTreeSet<String> {
        order
            .iter()
            .filter(|m| m.name != self.settings.aggregator)
            .flat_map(|m| m.dependencies.iter())
            .filter(|dep| self.is_provider(dep))
            .map(|dep| self.tag(dep).to_string())
            .collect()
    }

    /// Walk the dependency closure of `minibuild`
    fn reach(&self, minibuild: &'r Minibuild) -> Result<Reach> {
        let mut reach = Reach::default();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut stack: Vec<&'r Minibuild> = vec![minibuild];

        while let Some(current) = stack.pop() {
            if !seen.insert(current.name.as_str()) {
                continue;
            }
            for dep in &current.dependencies {
                if *dep == self.settings.aggregator {
                    reach.aggregator = true;
                } else if self.is_provider(dep) && current.name != self.settings.aggregator {
                    reach.pins.insert(self.tag(dep).to_string());
                }
                match self.registry.lookup(dep, Some(&current.name)) {
                    Ok(next) => stack.push(next),
                    Err(_) if self.lenient => {
                        debug!(
                            package = %current.name,
                            dependency = %dep,
                            "unresolved dependency ignored"
                        );
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(reach)
    }

    fn extend_order(
        &self,
        order: &[&'r Minibuild],
        requested: &[String],
        run_pins: &BTreeSet<String>,
        variants: &VariantMap,
    ) -> Result<Vec<&'r Minibuild>> {
        let needed: BTreeSet<&str> = variants
            .values()
            .flatten()
            .map(String::as_str)
            .collect();

        let kept: Vec<&'r Minibuild> = order
            .iter()
            .copied()
            .filter(|m| {
                let drop = !run_pins.is_empty()
                    && self.is_provider(&m.name)
                    && !needed.contains(self.tag(&m.name))
                    && !run_pins.contains(self.tag(&m.name))
                    && !requested.contains(&m.name);
                if drop {
                    debug!(provider = %m.name, "variant provider not needed, skipping");
                }
                !drop
            })
            .collect();

        let present: HashSet<&str> = kept.iter().map(|m| m.name.as_str()).collect();
        let missing: Vec<String> = needed
            .iter()
            .map(|tag| self.provider_name(tag))
            .filter(|name| !present.contains(name.as_str()))
            .collect();
        if missing.is_empty() {
            return Ok(kept);
        }

        debug!(providers = ?missing, "adding missing variant providers");
        let mut extended: Vec<&'r Minibuild> = Resolver::new(self.registry)
            .resolve(&missing)?
            .into_iter()
            .filter(|m| !present.contains(m.name.as_str()))
            .collect();
        extended.extend(kept);
        Ok(extended)
    }
}
