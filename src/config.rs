//! Configuration management.
//!
//! Centralizes per-source timeouts, fan-out concurrency, retry knobs, source
//! toggles and history-store location. Values can come from environment
//! variables (`PHONEINTEL_*`) and are merged with command-line arguments,
//! with the CLI taking precedence.

use std::path::PathBuf;
use std::time::Duration;

use crate::errors::{PhoneIntelError, Result};
use crate::retry::RetryConfig;
use crate::sources::SourceCategory;

/// Main configuration structure.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Network / fan-out settings.
    pub network: NetworkConfig,

    /// Which source categories run.
    pub sources: SourceToggles,

    /// Historical snapshot store settings.
    pub history: HistoryConfig,

    /// Output preferences.
    pub output: OutputConfig,
}

/// Fan-out and timeout settings.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Timeout applied to most source calls.
    pub source_timeout: Duration,

    /// WHOIS registries are slower; they get their own budget.
    pub whois_timeout: Duration,

    /// Purely local analysis should never take long.
    pub pattern_timeout: Duration,

    /// Maximum concurrent source calls. Sized to the handful of distinct
    /// external collaborators; this is I/O fan-out, not CPU parallelism.
    pub concurrency_limit: usize,

    /// Retry behavior for non-heuristic sources.
    pub retry: RetryConfig,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            source_timeout: Duration::from_secs(5),
            whois_timeout: Duration::from_secs(8),
            pattern_timeout: Duration::from_secs(2),
            concurrency_limit: 6,
            retry: RetryConfig::default(),
        }
    }
}

impl NetworkConfig {
    /// Effective timeout for one source category.
    pub fn timeout_for(&self, category: SourceCategory) -> Duration {
        match category {
            SourceCategory::Whois => self.whois_timeout,
            SourceCategory::Pattern => self.pattern_timeout,
            _ => self.source_timeout,
        }
    }
}

/// Per-category enable flags. Technical data and the history step have their
/// own lifecycle and are not toggled here.
#[derive(Debug, Clone)]
pub struct SourceToggles {
    pub carrier: bool,
    pub reputation: bool,
    pub social: bool,
    pub breach: bool,
    pub whois: bool,
    pub pattern: bool,
}

impl Default for SourceToggles {
    fn default() -> Self {
        Self {
            carrier: true,
            reputation: true,
            social: true,
            breach: true,
            whois: true,
            pattern: true,
        }
    }
}

impl SourceToggles {
    pub fn enabled(&self, category: SourceCategory) -> bool {
        match category {
            SourceCategory::Carrier => self.carrier,
            SourceCategory::Reputation => self.reputation,
            SourceCategory::Social => self.social,
            SourceCategory::Breach => self.breach,
            SourceCategory::Whois => self.whois,
            SourceCategory::Pattern => self.pattern,
            SourceCategory::Technical | SourceCategory::Historical => true,
        }
    }

    /// Count of enabled fan-out categories.
    pub fn enabled_count(&self) -> usize {
        SourceCategory::fanout()
            .iter()
            .filter(|c| self.enabled(**c))
            .count()
    }
}

/// Historical snapshot store settings.
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    pub enabled: bool,

    /// JSONL file path. None keeps history in memory for the process
    /// lifetime only.
    pub path: Option<PathBuf>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

/// Output preferences.
#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    /// Include the full normalization attempt trail in reports.
    pub show_attempts: bool,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(timeout) = std::env::var("PHONEINTEL_SOURCE_TIMEOUT_SECS")
            && let Ok(secs) = timeout.parse::<u64>()
        {
            config.network.source_timeout = Duration::from_secs(secs);
        }

        if let Ok(timeout) = std::env::var("PHONEINTEL_WHOIS_TIMEOUT_SECS")
            && let Ok(secs) = timeout.parse::<u64>()
        {
            config.network.whois_timeout = Duration::from_secs(secs);
        }

        if let Ok(limit) = std::env::var("PHONEINTEL_CONCURRENCY")
            && let Ok(n) = limit.parse::<usize>()
        {
            config.network.concurrency_limit = n;
        }

        if let Ok(enabled) = std::env::var("PHONEINTEL_HISTORY_ENABLED") {
            config.history.enabled = enabled.eq_ignore_ascii_case("true")
                || enabled.eq_ignore_ascii_case("1")
                || enabled.eq_ignore_ascii_case("yes");
        }

        if let Ok(path) = std::env::var("PHONEINTEL_HISTORY_DB") {
            config.history.path = Some(PathBuf::from(path));
        }

        config
    }

    /// Merge with CLI arguments, giving CLI precedence.
    pub fn merge_with_cli(&mut self, cli: &crate::cli::Cli) {
        self.sources.carrier = !cli.no_use_carrier;
        self.sources.reputation = !cli.no_use_reputation;
        self.sources.social = !cli.no_use_social;
        self.sources.breach = !cli.no_use_breach;
        self.sources.whois = !cli.no_use_whois;
        self.sources.pattern = !cli.no_use_pattern;

        if cli.no_history {
            self.history.enabled = false;
        }
        if let Some(ref path) = cli.history_db {
            self.history.path = Some(PathBuf::from(path));
            self.history.enabled = true;
        }
        if let Some(secs) = cli.timeout_secs {
            self.network.source_timeout = Duration::from_secs(secs);
            self.network.whois_timeout =
                self.network.whois_timeout.max(Duration::from_secs(secs));
        }
        if cli.show_attempts {
            self.output.show_attempts = true;
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.network.source_timeout.as_secs() == 0 {
            return Err(PhoneIntelError::configuration(
                "network.source_timeout must be greater than 0",
            ));
        }

        if self.network.concurrency_limit == 0 {
            return Err(PhoneIntelError::configuration(
                "network.concurrency_limit must be at least 1",
            ));
        }

        if self.sources.enabled_count() == 0 && !self.sources.enabled(SourceCategory::Technical) {
            return Err(PhoneIntelError::configuration(
                "at least one source category must be enabled",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.network.source_timeout, Duration::from_secs(5));
        assert_eq!(config.sources.enabled_count(), 6);
        assert!(config.history.enabled);
        assert!(config.history.path.is_none());
    }

    #[test]
    fn per_category_timeouts() {
        let config = Config::default();
        assert_eq!(
            config.network.timeout_for(SourceCategory::Whois),
            Duration::from_secs(8)
        );
        assert_eq!(
            config.network.timeout_for(SourceCategory::Carrier),
            Duration::from_secs(5)
        );
        assert_eq!(
            config.network.timeout_for(SourceCategory::Pattern),
            Duration::from_secs(2)
        );
    }

    #[test]
    fn zero_timeout_fails_validation() {
        let mut config = Config::default();
        config.network.source_timeout = Duration::from_secs(0);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.network.concurrency_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_loading() {
        unsafe {
            env::set_var("PHONEINTEL_SOURCE_TIMEOUT_SECS", "11");
            env::set_var("PHONEINTEL_CONCURRENCY", "3");
            env::set_var("PHONEINTEL_HISTORY_ENABLED", "false");
        }

        let config = Config::from_env();
        assert_eq!(config.network.source_timeout, Duration::from_secs(11));
        assert_eq!(config.network.concurrency_limit, 3);
        assert!(!config.history.enabled);

        unsafe {
            env::remove_var("PHONEINTEL_SOURCE_TIMEOUT_SECS");
            env::remove_var("PHONEINTEL_CONCURRENCY");
            env::remove_var("PHONEINTEL_HISTORY_ENABLED");
        }
    }

    #[test]
    fn toggles_cover_fanout() {
        let mut toggles = SourceToggles::default();
        toggles.breach = false;
        toggles.whois = false;
        assert_eq!(toggles.enabled_count(), 4);
        assert!(!toggles.enabled(SourceCategory::Breach));
        assert!(toggles.enabled(SourceCategory::Technical));
    }
}
