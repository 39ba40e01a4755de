//! Minimerge - meta package manager
//!
//! Builds projects and their dependencies from minibuild descriptors found
//! in the minilays of an installation prefix.

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod capability;
mod cli;
mod commands;
mod config;
mod error;
mod fetch;
mod make;
mod minibuild;
mod operations;
mod process;
mod progress;
mod resolver;
mod unpack;
mod variant;

use cli::Cli;

/// Log filter when `RUST_LOG` is not set
fn default_filter(cli: &Cli) -> &'static str {
    if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    }
}

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(&cli)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    if let Err(e) = commands::merge::run(&cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_levels() {
        let parse = |args: &[&str]| {
            Cli::try_parse_from(std::iter::once("minimerge").chain(args.iter().copied()))
                .expect("valid command line")
        };
        assert_eq!(default_filter(&parse(&["a"])), "warn");
        assert_eq!(default_filter(&parse(&["-v", "a"])), "info");
        assert_eq!(default_filter(&parse(&["-v", "-d", "a"])), "debug");
    }
}
