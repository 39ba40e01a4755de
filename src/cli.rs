//! CLI definitions using clap derive API

use clap::Parser;
use clap::builder::{Styles, styling::AnsiColor};
use std::path::PathBuf;

use crate::error::Result;
use crate::operations::{Action, RunOptions, select_action};

/// Minimerge - meta package manager
///
/// Builds projects and their dependencies from minibuild descriptors.
#[derive(Parser, Debug)]
#[command(
    name = "minimerge",
    author,
    version,
    color = clap::ColorChoice::Always,
    styles = Styles::styled()
        .header(AnsiColor::Green.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default().bold())
        .placeholder(AnsiColor::Cyan.on_default()),
    about = "Meta package manager building projects from minibuild descriptors",
    long_about = "Minimerge reads the minibuild descriptors found in the minilays of a \
                  prefix, resolves the dependencies of the requested packages, then fetches, \
                  unpacks and builds each of them in dependency order.",
    after_help = "\x1b[1m\x1b[32mExamples:\x1b[0m\n    \
                  minimerge lxml\n    \
                  minimerge -u --nodeps lxml\n    \
                  minimerge --offline -R libxml2 lxml\n    \
                  minimerge --rm lxml\n    \
                  minimerge -s"
)]
pub struct Cli {
    /// Packages to act on, in order
    #[arg(value_name = "PACKAGE")]
    pub packages: Vec<String>,

    /// Install packages (the default action)
    #[arg(long, short = 'i', help_heading = "Actions")]
    pub install: bool,

    /// Remove installed packages
    #[arg(long = "remove", visible_alias = "rm", help_heading = "Actions")]
    pub remove: bool,

    /// Rebuild packages even when already installed
    #[arg(long, short = 'R', help_heading = "Actions")]
    pub rebuild: bool,

    /// Update minilays that are working copies
    #[arg(long, short = 's', help_heading = "Actions")]
    pub sync: bool,

    /// Do not touch the network, build from what is already fetched
    #[arg(long, short = 'o')]
    pub offline: bool,

    /// Fetch and unpack only, do not build
    #[arg(long, short = 'f')]
    pub fetchonly: bool,

    /// Skip requested packages before this one
    #[arg(long, short = 'j', value_name = "PACKAGE")]
    pub jump: Option<String>,

    /// Act on the named packages only, ignoring their dependencies
    #[arg(long, short = 'N')]
    pub nodeps: bool,

    /// Update sources and rebuild already installed packages
    #[arg(long, short = 'u')]
    pub upgrade: bool,

    /// Configuration file
    #[arg(long, short = 'c', value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Installation prefix (defaults to $MINIMERGE_PREFIX or ~/minitage)
    #[arg(long, value_name = "DIR")]
    pub prefix: Option<PathBuf>,

    /// Debug output, passed on to build tools
    #[arg(long, short = 'd')]
    pub debug: bool,

    /// Enable verbose output
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

impl Cli {
    /// Action flags given on the command line
    pub fn actions(&self) -> Vec<Action> {
        [
            (self.install, Action::Install),
            (self.remove, Action::Remove),
            (self.rebuild, Action::Rebuild),
            (self.sync, Action::Sync),
        ]
        .into_iter()
        .filter_map(|(set, action)| set.then_some(action))
        .collect()
    }

    fn options(&self, action: Action) -> RunOptions {
        RunOptions {
            action,
            packages: self.packages.clone(),
            offline: self.offline,
            fetchonly: self.fetchonly,
            jump: self.jump.clone(),
            nodeps: self.nodeps,
            upgrade: self.upgrade,
            debug: self.debug,
            verbose: self.verbose,
        }
    }

    /// Fail on conflicting flags, before configuration is even looked at
    pub fn check_modes(&self) -> Result<()> {
        let action = select_action(&self.actions(), Action::Install)?;
        self.options(action).validate_modes()
    }

    /// Run options for this invocation, validated
    pub fn run_options(&self, default_action: Action) -> Result<RunOptions> {
        let options = self.options(select_action(&self.actions(), default_action)?);
        options.validate()?;
        Ok(options)
    }
}
