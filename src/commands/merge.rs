//! The minimerge command
//!
//! Resolves the prefix and configuration (bootstrapping the prefix on first
//! run), scans the minilays and hands the run to the orchestrator.

use std::path::Path;

use tracing::{debug, info};

use crate::cli::Cli;
use crate::config::{self, Config, bootstrap::bootstrap};
use crate::error::Result;
use crate::minibuild::MinibuildRegistry;
use crate::operations::orchestrator::Outcome;
use crate::operations::{Action, Backends, Context, Orchestrator};
use crate::progress::ProgressDisplay;

/// Load the configuration, creating a fresh prefix when there is none
fn load_or_bootstrap(explicit: Option<&Path>, prefix: &Path) -> Result<Config> {
    match config::locate(explicit, prefix) {
        Some(path) => {
            debug!(config = %path.display(), "loading configuration");
            Config::load(&path)
        }
        None => {
            let path = bootstrap(prefix)?;
            Config::load(&path)
        }
    }
}

/// Run the command line
pub fn run(cli: &Cli) -> Result<()> {
    cli.check_modes()?;
    let explicit = config::explicit_prefix(cli.prefix.as_deref());
    let search_prefix = match &explicit {
        Some(prefix) => prefix.clone(),
        None => config::default_prefix()?,
    };
    let config = load_or_bootstrap(cli.config.as_deref(), &search_prefix)?;
    let prefix = config::run_prefix(explicit, config.prefix.as_deref(), search_prefix);

    let options = cli.run_options(config.default_action()?)?;
    let roots = config::minilay_roots(&prefix, &config)?;
    info!(prefix = %prefix.display(), minilays = roots.len(), "starting run");

    let context = Context::new(prefix, config, options)?;
    let mut registry = MinibuildRegistry::scan(&roots)?;
    let backends = Backends::from_settings(&context.config.backends)?;

    let outcomes = Orchestrator::new(&context, &backends)
        .with_progress(ProgressDisplay::new(0))
        .run(&mut registry)?;

    print_summary(&context, &outcomes, registry.len());
    Ok(())
}

fn print_summary(context: &Context, outcomes: &[(String, Outcome)], minibuilds: usize) {
    let count = |wanted: Outcome| outcomes.iter().filter(|(_, o)| *o == wanted).count();
    match context.options.action {
        Action::Sync => println!("Minilays synced, {minibuilds} minibuild(s) available"),
        Action::Remove => println!("Removed {} package(s)", count(Outcome::Removed)),
        Action::Install | Action::Rebuild if context.options.fetchonly => {
            println!("Fetched {} package(s)", count(Outcome::Fetched));
        }
        Action::Install | Action::Rebuild => {
            let built = count(Outcome::Built);
            let skipped = count(Outcome::AlreadyInstalled);
            if built == 0 && skipped > 0 {
                println!("Nothing to do, {skipped} package(s) already installed");
            } else {
                println!("Built {built} package(s)");
            }
        }
    }
}
