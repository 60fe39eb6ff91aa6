//! Unified error handling.
//!
//! A `thiserror`-based model with:
//!   * Typed variants for common failure domains
//!   * A categorization layer (`ErrorCategory`) for reporting
//!   * Helper constructors
//!
//! Only structurally unusable input (an empty target string, an unknown
//! country code) escalates to the caller as a hard error. Everything else —
//! a timed-out carrier API, an unreachable breach database, a snapshot store
//! that cannot be written — degrades into per-category failure records on
//! the investigation result, with these variants carried as the reason.

use std::io;

use thiserror::Error;

/// Coarse classification for structured reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Network,
    Parse,
    Persistence,
    Internal,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorCategory::Input => "input",
            ErrorCategory::Network => "network",
            ErrorCategory::Parse => "parse",
            ErrorCategory::Persistence => "persistence",
            ErrorCategory::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// Primary application error type.
#[derive(Error, Debug)]
pub enum PhoneIntelError {
    // ------------------------ Input / Validation ----------------------------
    #[error("Empty input: a phone number (or at least a digit sequence) is required")]
    EmptyInput,

    #[error("Unsupported country code '{code}' (supported: {})", .supported.join(", "))]
    UnsupportedCountry { code: String, supported: Vec<String> },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    // ---------------------------- Parsing -----------------------------------
    #[error("Candidate '{candidate}' rejected: {reason}")]
    CandidateRejected { candidate: String, reason: String },

    // ----------------------------- Network ----------------------------------
    #[error("Source '{source_name}' timed out after {seconds}s")]
    SourceTimeout { source_name: String, seconds: u64 },

    #[error("Source '{source_name}' unavailable: {reason}")]
    SourceUnavailable { source_name: String, reason: String },

    // --------------------------- Persistence --------------------------------
    #[error("Snapshot store {operation} failed: {reason}")]
    Persistence { operation: String, reason: String },

    // ---------------------------- Internal ----------------------------------
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl PhoneIntelError {
    /// Categorize the error for structured output.
    pub fn category(&self) -> ErrorCategory {
        use PhoneIntelError::*;
        match self {
            EmptyInput | UnsupportedCountry { .. } | Configuration { .. } => ErrorCategory::Input,
            CandidateRejected { .. } => ErrorCategory::Parse,
            SourceTimeout { .. } | SourceUnavailable { .. } => ErrorCategory::Network,
            Persistence { .. } => ErrorCategory::Persistence,
            Internal { .. } => ErrorCategory::Internal,
        }
    }

    // ---------------------------- Constructors -----------------------------

    pub fn unsupported_country(code: impl Into<String>, supported: Vec<String>) -> Self {
        Self::UnsupportedCountry {
            code: code.into(),
            supported,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn candidate_rejected(candidate: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CandidateRejected {
            candidate: candidate.into(),
            reason: reason.into(),
        }
    }

    pub fn source_timeout(source_name: impl Into<String>, seconds: u64) -> Self {
        Self::SourceTimeout {
            source_name: source_name.into(),
            seconds,
        }
    }

    pub fn source_unavailable(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    pub fn persistence(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Persistence {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    pub fn internal_with(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

/// Public result alias.
pub type Result<T> = std::result::Result<T, PhoneIntelError>;

impl From<io::Error> for PhoneIntelError {
    fn from(e: io::Error) -> Self {
        PhoneIntelError::Persistence {
            operation: "io".into(),
            reason: e.to_string(),
        }
    }
}

impl From<tokio::time::error::Elapsed> for PhoneIntelError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        // Source name not available at this conversion point; callers wrap
        // via `source_timeout` where context is known.
        PhoneIntelError::SourceTimeout {
            source_name: "<unknown>".into(),
            seconds: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_mapping() {
        assert_eq!(PhoneIntelError::EmptyInput.category(), ErrorCategory::Input);
        assert_eq!(
            PhoneIntelError::source_timeout("carrier-api", 5).category(),
            ErrorCategory::Network
        );
        assert_eq!(
            PhoneIntelError::candidate_rejected("123", "too short").category(),
            ErrorCategory::Parse
        );
        assert_eq!(
            PhoneIntelError::persistence("append", "disk full").category(),
            ErrorCategory::Persistence
        );
    }

    #[test]
    fn display_snippets() {
        let e = PhoneIntelError::unsupported_country("ZZ", vec!["IN".into(), "US".into()]);
        let s = e.to_string();
        assert!(s.contains("ZZ"));
        assert!(s.contains("IN, US"));

        let t = PhoneIntelError::source_timeout("whois", 8);
        assert!(t.to_string().contains("whois"));
        assert!(t.to_string().contains("8s"));
    }
}
