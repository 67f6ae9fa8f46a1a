//! CLI configuration from environment.

use rota_core::Profile;
use rota_osrm::DEFAULT_BASE_URL;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub osrm_url: String,
    pub profile: Profile,
    pub timeout_s: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            osrm_url: DEFAULT_BASE_URL.to_string(),
            profile: Profile::default(),
            timeout_s: 30,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset or invalid values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            osrm_url: lookup("ROTA_OSRM_URL")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.osrm_url),
            profile: lookup("ROTA_PROFILE")
                .and_then(|s| s.parse::<Profile>().ok())
                .unwrap_or(defaults.profile),
            timeout_s: lookup("ROTA_TIMEOUT_S")
                .and_then(|s| s.trim().parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .unwrap_or(defaults.timeout_s),
        }
    }
}
