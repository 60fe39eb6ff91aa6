//! Pluggable intelligence sources.
//!
//! Every category of intelligence — carrier attribution, reputation, social
//! presence, breach exposure, WHOIS linkage, pattern analysis — is produced
//! by an implementation of one uniform async trait, registered by category.
//! The aggregator dispatches through the registry instead of branching per
//! source, and treats every source as optional and interchangeable.
//!
//! Outcomes are a three-way split so "no data exists" and "the source broke"
//! never collapse into each other:
//!   * `Found(data)`  — the source produced a typed payload
//!   * `NotFound`     — the source ran and has nothing for this number
//!   * `Failed(why)`  — timeout / unavailable / disabled, with the reason
//!
//! The built-in implementations are offline: they answer from the static
//! heuristics tables and honestly report `NotFound` where only a remote
//! service could know (breach, WHOIS). API-backed sources plug in through
//! the same trait.

use async_trait::async_trait;
use serde::Serialize;

use crate::countries::CountryProfile;
use crate::errors::Result;
use crate::formatter::FormattedNumber;
use crate::heuristics::{
    self, BulkBlock, CarrierGuess, NumberKind, PresenceLikelihood,
};
use crate::history::ChangeEntry;

/// Intelligence categories, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceCategory {
    Technical,
    Carrier,
    Reputation,
    Social,
    Breach,
    Whois,
    Pattern,
    Historical,
}

impl SourceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceCategory::Technical => "technical",
            SourceCategory::Carrier => "carrier",
            SourceCategory::Reputation => "reputation",
            SourceCategory::Social => "social",
            SourceCategory::Breach => "breach",
            SourceCategory::Whois => "whois",
            SourceCategory::Pattern => "pattern",
            SourceCategory::Historical => "historical",
        }
    }

    /// The categories dispatched through the registry fan-out. Technical is
    /// computed locally from the formatter output and Historical from the
    /// snapshot store, so neither is fanned out.
    pub fn fanout() -> &'static [SourceCategory] {
        &[
            SourceCategory::Carrier,
            SourceCategory::Reputation,
            SourceCategory::Social,
            SourceCategory::Breach,
            SourceCategory::Whois,
            SourceCategory::Pattern,
        ]
    }
}

impl std::fmt::Display for SourceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a source produced nothing usable.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceFailure {
    Timeout { seconds: u64 },
    Unavailable { reason: String },
    Disabled,
}

impl std::fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceFailure::Timeout { seconds } => write!(f, "timed out after {seconds}s"),
            SourceFailure::Unavailable { reason } => write!(f, "unavailable: {reason}"),
            SourceFailure::Disabled => f.write_str("disabled by configuration"),
        }
    }
}

/// What one source call produced.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceOutcome {
    Found { data: SourceData },
    NotFound {
        #[serde(skip_serializing_if = "Option::is_none")]
        note: Option<String>,
    },
    Failed { failure: SourceFailure },
}

impl SourceOutcome {
    pub fn not_found(note: impl Into<String>) -> Self {
        SourceOutcome::NotFound {
            note: Some(note.into()),
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, SourceOutcome::Found { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SourceOutcome::Failed { .. })
    }
}

/// Typed per-category payloads.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum SourceData {
    Technical(TechnicalData),
    Carrier(CarrierData),
    Reputation(ReputationData),
    Social(SocialData),
    Breach(BreachData),
    Whois(WhoisData),
    Pattern(PatternData),
    Historical(HistoricalData),
}

/// What the parsing library itself reports about the number.
#[derive(Debug, Clone, Serialize)]
pub struct TechnicalData {
    pub is_valid: bool,
    pub is_possible: bool,
    pub iso: String,
    pub calling_code: u16,
    pub e164: String,
    pub international: String,
    pub national: String,
    pub rfc3966: String,
    pub number_kind: NumberKind,
}

/// Carrier attribution. `heuristic` is false only for confirmed carrier-API
/// data from an external source.
#[derive(Debug, Clone, Serialize)]
pub struct CarrierData {
    pub carrier_name: String,
    pub region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_type: Option<String>,
    pub heuristic: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Reputation / spam standing.
#[derive(Debug, Clone, Serialize)]
pub struct ReputationData {
    /// 0.0 (clean) to 1.0 (certain spam).
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub indicators: Vec<String>,
    pub heuristic: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlatformPresence {
    pub platform: &'static str,
    pub likelihood: PresenceLikelihood,
}

/// Expected social-platform footprint.
#[derive(Debug, Clone, Serialize)]
pub struct SocialData {
    pub overall: PresenceLikelihood,
    pub platforms: Vec<PlatformPresence>,
    pub heuristic: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BreachIncident {
    pub name: String,
    pub year: Option<u16>,
    pub data_classes: Vec<String>,
}

/// Breach-database exposure.
#[derive(Debug, Clone, Serialize)]
pub struct BreachData {
    pub incidents: Vec<BreachIncident>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DomainRecord {
    pub domain: String,
    pub registrar: Option<String>,
    pub status: Option<String>,
}

/// WHOIS registrant linkage.
#[derive(Debug, Clone, Serialize)]
pub struct WhoisData {
    pub domains: Vec<DomainRecord>,
    pub business_connections: Vec<String>,
}

/// Offline pattern-analysis bundle.
#[derive(Debug, Clone, Serialize)]
pub struct PatternData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carrier_guess: Option<CarrierGuess>,
    pub business_likelihood: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bulk_block: Option<BulkBlock>,
    pub repeated_digit_density: f64,
    pub longest_sequential_run: usize,
    pub spam_patterns: Vec<&'static str>,
    pub heuristic: bool,
}

/// Change history produced by the snapshot store.
#[derive(Debug, Clone, Serialize)]
pub struct HistoricalData {
    pub first_observation: bool,
    pub changes: Vec<ChangeEntry>,
}

/// One category's contribution to a merged investigation result.
#[derive(Debug, Clone, Serialize)]
pub struct IntelligenceRecord {
    pub category: SourceCategory,
    pub source_name: String,
    pub heuristic: bool,
    pub outcome: SourceOutcome,
    pub elapsed_ms: u64,
}

impl IntelligenceRecord {
    pub fn failed(category: SourceCategory, source_name: &str, failure: SourceFailure) -> Self {
        Self {
            category,
            source_name: source_name.to_string(),
            heuristic: false,
            outcome: SourceOutcome::Failed { failure },
            elapsed_ms: 0,
        }
    }
}

/// Immutable per-investigation context shared by every source call.
#[derive(Debug, Clone)]
pub struct InvestigationTarget {
    pub raw_input: String,
    /// Present when the formatter succeeded.
    pub formatted: Option<FormattedNumber>,
    pub number_kind: NumberKind,
    pub profile: Option<&'static CountryProfile>,
}

impl InvestigationTarget {
    /// Best available digit string: the parsed NSN, or the raw digits when
    /// formatting failed (pattern checks still run on those).
    pub fn digits(&self) -> String {
        match &self.formatted {
            Some(f) => f.national_significant.clone(),
            None => self
                .raw_input
                .chars()
                .filter(|c| c.is_ascii_digit())
                .collect(),
        }
    }

    pub fn iso(&self) -> &str {
        match &self.formatted {
            Some(f) => &f.iso,
            None => self.profile.map(|p| p.iso).unwrap_or(""),
        }
    }
}

/// Trait every intelligence source implements.
#[async_trait]
pub trait IntelligenceSource: Send + Sync {
    fn name(&self) -> &'static str;
    fn category(&self) -> SourceCategory;
    /// Heuristic sources answer from static tables; they never corroborate
    /// technical data the way an external lookup does.
    fn is_heuristic(&self) -> bool {
        false
    }
    async fn fetch(&self, target: &InvestigationTarget) -> Result<SourceOutcome>;
}

/// Source lookup table keyed by category.
pub struct SourceRegistry {
    sources: Vec<std::sync::Arc<dyn IntelligenceSource>>,
}

impl SourceRegistry {
    pub fn empty() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// The offline built-ins, one per fan-out category.
    pub fn with_defaults() -> Self {
        let mut reg = Self::empty();
        reg.register(PrefixCarrierSource);
        reg.register(ReputationHeuristicSource);
        reg.register(SocialPresenceSource);
        reg.register(BreachDirectorySource);
        reg.register(WhoisDirectorySource);
        reg.register(PatternAnalysisSource);
        reg
    }

    /// Register a source; replaces any existing source for the category.
    pub fn register<S: IntelligenceSource + 'static>(&mut self, source: S) {
        let category = source.category();
        self.sources.retain(|s| s.category() != category);
        self.sources.push(std::sync::Arc::new(source));
    }

    pub fn get(&self, category: SourceCategory) -> Option<std::sync::Arc<dyn IntelligenceSource>> {
        self.sources
            .iter()
            .find(|s| s.category() == category)
            .cloned()
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/* -------------------------------------------------------------------------- */
/*                        Offline source implementations                      */
/* -------------------------------------------------------------------------- */

/// Carrier attribution from the static prefix allocation table.
pub struct PrefixCarrierSource;

#[async_trait]
impl IntelligenceSource for PrefixCarrierSource {
    fn name(&self) -> &'static str {
        "prefix-table"
    }

    fn category(&self) -> SourceCategory {
        SourceCategory::Carrier
    }

    fn is_heuristic(&self) -> bool {
        true
    }

    async fn fetch(&self, target: &InvestigationTarget) -> Result<SourceOutcome> {
        let digits = target.digits();
        match heuristics::lookup_carrier_by_prefix(&digits, target.iso()) {
            Some(guess) => Ok(SourceOutcome::Found {
                data: SourceData::Carrier(CarrierData {
                    carrier_name: guess.carrier,
                    region: guess.region,
                    network_type: None,
                    heuristic: true,
                }),
            }),
            None => Ok(SourceOutcome::not_found(
                "no allocation rule matches this prefix",
            )),
        }
    }
}

/// Offline reputation screen: structural spam cues only.
pub struct ReputationHeuristicSource;

#[async_trait]
impl IntelligenceSource for ReputationHeuristicSource {
    fn name(&self) -> &'static str {
        "pattern-reputation"
    }

    fn category(&self) -> SourceCategory {
        SourceCategory::Reputation
    }

    fn is_heuristic(&self) -> bool {
        true
    }

    async fn fetch(&self, target: &InvestigationTarget) -> Result<SourceOutcome> {
        let digits = target.digits();
        let mut indicators: Vec<String> = Vec::new();
        let mut risk: f64 = 0.0;

        for hit in heuristics::spam_pattern_hits(&digits) {
            indicators.push(format!("spam digit pattern '{hit}'"));
            risk += 0.35;
        }
        let density = heuristics::repeated_digit_density(&digits);
        if density >= 0.7 {
            indicators.push("dominated by a single repeated digit".to_string());
            risk += 0.25;
        }
        if target.formatted.as_ref().is_some_and(|f| !f.is_valid) {
            indicators.push("number is not valid for its region".to_string());
            risk += 0.2;
        }

        let risk_score = risk.min(1.0);
        let risk_level = if risk_score >= 0.6 {
            RiskLevel::High
        } else if risk_score >= 0.3 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        };

        Ok(SourceOutcome::Found {
            data: SourceData::Reputation(ReputationData {
                risk_score,
                risk_level,
                indicators,
                heuristic: true,
            }),
        })
    }
}

/// Social-presence expectation from the static country + kind table.
pub struct SocialPresenceSource;

#[async_trait]
impl IntelligenceSource for SocialPresenceSource {
    fn name(&self) -> &'static str {
        "presence-table"
    }

    fn category(&self) -> SourceCategory {
        SourceCategory::Social
    }

    fn is_heuristic(&self) -> bool {
        true
    }

    async fn fetch(&self, target: &InvestigationTarget) -> Result<SourceOutcome> {
        if target.formatted.is_none() {
            return Ok(SourceOutcome::not_found(
                "presence estimation needs a parsed number",
            ));
        }
        let overall =
            heuristics::estimate_social_presence_likelihood(target.iso(), target.number_kind);
        let platforms = vec![
            PlatformPresence {
                platform: "WhatsApp",
                likelihood: overall,
            },
            PlatformPresence {
                platform: "Telegram",
                likelihood: overall.min(PresenceLikelihood::High),
            },
        ];
        Ok(SourceOutcome::Found {
            data: SourceData::Social(SocialData {
                overall,
                platforms,
                heuristic: true,
            }),
        })
    }
}

/// Breach exposure needs a remote dataset; the built-in reports NotFound so
/// the category can explain why it is empty instead of disappearing.
pub struct BreachDirectorySource;

#[async_trait]
impl IntelligenceSource for BreachDirectorySource {
    fn name(&self) -> &'static str {
        "breach-directory"
    }

    fn category(&self) -> SourceCategory {
        SourceCategory::Breach
    }

    async fn fetch(&self, _target: &InvestigationTarget) -> Result<SourceOutcome> {
        Ok(SourceOutcome::not_found(
            "no offline breach dataset; register an external breach source",
        ))
    }
}

/// Reverse-WHOIS linkage likewise requires an external registry.
pub struct WhoisDirectorySource;

#[async_trait]
impl IntelligenceSource for WhoisDirectorySource {
    fn name(&self) -> &'static str {
        "whois-directory"
    }

    fn category(&self) -> SourceCategory {
        SourceCategory::Whois
    }

    async fn fetch(&self, _target: &InvestigationTarget) -> Result<SourceOutcome> {
        Ok(SourceOutcome::not_found(
            "no offline registrant index; register an external WHOIS source",
        ))
    }
}

/// Full pattern-analysis bundle over the digit string. Runs even when the
/// formatter failed, using the raw digits.
pub struct PatternAnalysisSource;

#[async_trait]
impl IntelligenceSource for PatternAnalysisSource {
    fn name(&self) -> &'static str {
        "pattern-analysis"
    }

    fn category(&self) -> SourceCategory {
        SourceCategory::Pattern
    }

    fn is_heuristic(&self) -> bool {
        true
    }

    async fn fetch(&self, target: &InvestigationTarget) -> Result<SourceOutcome> {
        let digits = target.digits();
        if digits.is_empty() {
            return Ok(SourceOutcome::not_found("input contains no digits"));
        }
        Ok(SourceOutcome::Found {
            data: SourceData::Pattern(PatternData {
                carrier_guess: heuristics::lookup_carrier_by_prefix(&digits, target.iso()),
                business_likelihood: heuristics::estimate_business_likelihood(&digits),
                bulk_block: heuristics::detect_bulk_block(&digits),
                repeated_digit_density: heuristics::repeated_digit_density(&digits),
                longest_sequential_run: heuristics::longest_sequential_run(&digits),
                spam_patterns: heuristics::spam_pattern_hits(&digits),
                heuristic: true,
            }),
        })
    }
}
