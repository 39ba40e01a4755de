//! Backend registries of a run

use tracing::debug;

use crate::capability::CapabilityRegistry;
use crate::config::BackendSettings;
use crate::error::Result;
use crate::fetch::{self, Fetcher};
use crate::make::{self, Maker};
use crate::unpack::{self, Unpacker};

/// The three capability registries a run dispatches through
pub struct Backends {
    pub fetchers: CapabilityRegistry<dyn Fetcher>,
    pub unpackers: CapabilityRegistry<dyn Unpacker>,
    pub makers: CapabilityRegistry<dyn Maker>,
}

impl Backends {
    /// Compiled-in backends, narrowed and ordered by configuration
    pub fn from_settings(settings: &BackendSettings) -> Result<Self> {
        let mut fetchers = fetch::registry()?;
        fetchers.activate(&settings.fetchers)?;
        let mut unpackers = unpack::registry()?;
        unpackers.activate(&settings.unpackers)?;
        let mut makers = make::registry()?;
        makers.activate(&settings.makers)?;
        debug!(
            fetchers = ?fetchers.keys(),
            unpackers = ?unpackers.keys(),
            makers = ?makers.keys(),
            "backends activated"
        );
        Ok(Self {
            fetchers,
            unpackers,
            makers,
        })
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_activate_everything() {
        let backends = Backends::from_settings(&BackendSettings::default()).expect("defaults");
        assert_eq!(backends.fetchers.keys(), vec!["git", "hg", "svn", "local"]);
        assert_eq!(backends.unpackers.keys(), vec!["zip", "tar"]);
        assert_eq!(backends.makers.keys(), vec!["buildout", "script"]);
    }

    #[test]
    fn test_settings_disable_backends() {
        let settings = BackendSettings {
            fetchers: vec!["local".to_string()],
            ..BackendSettings::default()
        };
        let backends = Backends::from_settings(&settings).expect("valid");
        assert!(backends.fetchers.resolve("git").is_err());
        assert!(backends.fetchers.resolve("local").is_ok());
    }

    #[test]
    fn test_unknown_backend_key() {
        let settings = BackendSettings {
            makers: vec!["cmake".to_string()],
            ..BackendSettings::default()
        };
        assert!(Backends::from_settings(&settings).is_err());
    }
}
