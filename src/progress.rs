//! Progress bar display for package actions

use indicatif::{ProgressBar, ProgressStyle};

/// Progress display over the planned package list
pub struct ProgressDisplay {
    package_pb: ProgressBar,
}

impl ProgressDisplay {
    /// Create a new progress display with total package count
    pub fn new(total_packages: u64) -> Self {
        let style = ProgressStyle::default_bar()
            .template("[{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");

        let package_pb = ProgressBar::new(total_packages);
        package_pb.set_style(style);

        Self { package_pb }
    }

    /// A display that never draws, for tests and quiet runs
    pub fn hidden() -> Self {
        Self {
            package_pb: ProgressBar::hidden(),
        }
    }

    /// Set the package count once the plan is known
    pub fn set_total(&self, total_packages: u64) {
        self.package_pb.set_length(total_packages);
    }

    /// Update to show the package being processed
    pub fn update_package(&self, action: &str, name: &str) {
        self.package_pb.set_message(format!("{action} {name}"));
    }

    /// Increment package progress
    pub fn inc_package(&self) {
        self.package_pb.inc(1);
    }

    /// Print a status line to stdout without breaking the bar
    pub fn println(&self, line: impl AsRef<str>) {
        self.package_pb.suspend(|| println!("{}", line.as_ref()));
    }

    pub fn finish(&self) {
        self.package_pb.finish_and_clear();
    }

    /// Abandon on error, leaving the bar where it stopped
    pub fn abandon(&self) {
        self.package_pb.abandon();
    }
}
