//! Command-line interface definition.
//!
//! Verbosity levels:
//! 0 - silent (only final output)
//! 1 - errors (default)
//! 2 - warnings + errors
//! 5 - trace/debug

use clap::{Parser, ValueEnum};

/// Structured output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Yaml,
}

#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Investigate a phone number: normalization, offline heuristics, pluggable intelligence sources and change history"
)]
pub struct Cli {
    /// Phone number to investigate (arbitrary punctuation accepted).
    #[arg(required_unless_present = "generate_schema")]
    pub number: Option<String>,

    /// Country hint: an ISO code (IN, US, GB, ...) or "auto".
    #[arg(long, short = 'c', default_value = "auto")]
    pub country: String,

    /// Verbosity level (0,1,2,5)
    #[arg(long, default_value_t = 1)]
    pub verbose: u8,

    /// Disable the carrier lookup source
    #[arg(long = "no-use-carrier", default_value_t = false)]
    pub no_use_carrier: bool,

    /// Disable the reputation source
    #[arg(long = "no-use-reputation", default_value_t = false)]
    pub no_use_reputation: bool,

    /// Disable the social-presence source
    #[arg(long = "no-use-social", default_value_t = false)]
    pub no_use_social: bool,

    /// Disable the breach source
    #[arg(long = "no-use-breach", default_value_t = false)]
    pub no_use_breach: bool,

    /// Disable the WHOIS source
    #[arg(long = "no-use-whois", default_value_t = false)]
    pub no_use_whois: bool,

    /// Disable pattern analysis
    #[arg(long = "no-use-pattern", default_value_t = false)]
    pub no_use_pattern: bool,

    /// Do not record or diff historical snapshots
    #[arg(long = "no-history", default_value_t = false)]
    pub no_history: bool,

    /// Historical snapshot file (JSON lines). Implies history is enabled.
    #[arg(long = "history-db", value_name = "FILE")]
    pub history_db: Option<String>,

    /// Override the per-source timeout, in seconds
    #[arg(long = "timeout-secs", value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Include the normalization attempt trail in the text report
    #[arg(long = "show-attempts", default_value_t = false)]
    pub show_attempts: bool,

    /// Print the JSON schema of the structured output and exit
    #[arg(long = "generate-schema", default_value_t = false)]
    pub generate_schema: bool,
}

impl Cli {
    /// Parse CLI arguments from process args.
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Convenience: are we in very verbose/debug mode?
    pub fn is_trace(&self) -> bool {
        self.verbose >= 5
    }

    /// Are warning-level messages enabled?
    pub fn warn_enabled(&self) -> bool {
        self.verbose >= 2
    }

    /// Are error-level messages enabled?
    pub fn error_enabled(&self) -> bool {
        self.verbose >= 1
    }
}
