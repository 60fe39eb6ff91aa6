//! phoneintel
//!
//! Multi-source phone number investigation. This library provides
//! functionality to:
//!
//! - Normalize arbitrary phone-number input through an ordered list of
//!   candidate transformations, backed by the `phonenumber` parser
//! - Run offline carrier/pattern heuristics (prefix allocation tables,
//!   business-likelihood and bulk-block analysis)
//! - Fan out to pluggable intelligence sources with per-source timeouts and
//!   failure isolation
//! - Merge everything into a single scored result and diff it against
//!   previous observations of the same number
//!
//! # Example
//!
//! ```rust,no_run
//! use phoneintel::aggregator::Investigator;
//! use phoneintel::config::Config;
//! use phoneintel::countries::CountryHint;
//!
//! # async fn run() -> phoneintel::errors::Result<()> {
//! let investigator = Investigator::new(Config::default());
//! let hint = CountryHint::parse("IN")?;
//! let result = investigator.investigate("9876543210", &hint).await?;
//! println!("confidence: {:.2}", result.confidence_score);
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod cli;
pub mod config;
pub mod countries;
pub mod errors;
pub mod formatter;
pub mod heuristics;
pub mod history;
pub mod output;
pub mod retry;
pub mod sources;
pub mod structured_output;

// Re-export commonly used types for convenience
pub use aggregator::{ConfidenceLevel, InvestigationResult, Investigator};
pub use config::Config;
pub use countries::CountryHint;
pub use errors::{PhoneIntelError, Result};
pub use formatter::{FormatOutcome, FormattedNumber};
pub use history::{ChangeSet, HistoryReport, HistoryStore};
pub use sources::{IntelligenceRecord, IntelligenceSource, SourceCategory, SourceOutcome};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
