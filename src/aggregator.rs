//! Multi-source intelligence aggregation.
//!
//! `Investigator::investigate` is the core entry point: it normalizes the
//! input, fans out the enabled source categories concurrently, merges
//! whatever came back, scores the result and records a snapshot for change
//! tracking.
//!
//! The central failure-isolation contract: one source's failure never blocks
//! or corrupts another's result. Every source call is wrapped so that an
//! error or timeout produces a `Failed` record with its reason instead of
//! aborting the aggregation. The overall call errors only on structurally
//! unusable input (an empty string); a formatter failure still yields a
//! result with guidance and whatever raw-digit heuristics could run.
//!
//! Fan-out is bounded by a semaphore sized for the handful of external
//! collaborators, and each source call carries its own timeout so a single
//! unreachable service cannot stall the investigation. Dropping the
//! `investigate` future (caller-side cancellation) abandons in-flight calls;
//! nothing is recorded for them.
//!
//! When two sources disagree on the same fact, both values stay in their own
//! labeled records and a conflict advisory is attached — the aggregator
//! never silently picks a winner.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use log::{debug, warn};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::time::timeout;

use crate::config::Config;
use crate::countries::{self, CountryHint};
use crate::errors::Result;
use crate::formatter::{self, FormatOutcome, FormattedNumber, ParseAttempt};
use crate::heuristics::{self, NumberKind};
use crate::history::{HistoricalSnapshot, HistoryReport, HistoryStore};
use crate::retry::{
    CarrierApiRetryPolicy, RetryConfig, RetryExecutor, TransientRetryPolicy, WhoisRetryPolicy,
};
use crate::sources::{
    HistoricalData, IntelligenceRecord, IntelligenceSource, InvestigationTarget, SourceCategory,
    SourceData, SourceFailure, SourceOutcome, SourceRegistry, TechnicalData,
};

/// What happened during normalization, kept on the result whether or not it
/// succeeded.
#[derive(Debug, Clone, Serialize)]
pub struct FormattingReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<FormattedNumber>,
    pub attempts: Vec<ParseAttempt>,
    /// Country-specific example formats, present when formatting failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guidance: Option<String>,
}

/// Two sources disagreeing on one fact. Both values also remain in their
/// respective records; this is an advisory, not an error.
#[derive(Debug, Clone, Serialize)]
pub struct ConflictNote {
    pub field: &'static str,
    /// (source name, value) pairs, in record order.
    pub values: Vec<(String, String)>,
}

/// Confidence bands for the overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    Critical,
    High,
    Medium,
    Low,
    VeryLow,
    Unreliable,
}

impl ConfidenceLevel {
    /// Band for a score in [0, 1].
    pub fn from_score(score: f64) -> Self {
        let pct = score * 100.0;
        if pct >= 95.0 {
            ConfidenceLevel::Critical
        } else if pct >= 80.0 {
            ConfidenceLevel::High
        } else if pct >= 60.0 {
            ConfidenceLevel::Medium
        } else if pct >= 40.0 {
            ConfidenceLevel::Low
        } else if pct >= 20.0 {
            ConfidenceLevel::VeryLow
        } else {
            ConfidenceLevel::Unreliable
        }
    }
}

/// Run statistics for the report footer.
#[derive(Debug, Clone, Serialize)]
pub struct InvestigationStats {
    pub sources_total: usize,
    pub sources_successful: usize,
    pub duration_ms: u64,
}

/// The merged aggregate of one investigation. Constructed once, never
/// mutated after return.
#[derive(Debug, Serialize)]
pub struct InvestigationResult {
    pub raw_input: String,
    pub country_hint: String,
    pub formatting: FormattingReport,
    pub number_kind: NumberKind,
    pub records: BTreeMap<SourceCategory, IntelligenceRecord>,
    pub conflicts: Vec<ConflictNote>,
    pub warnings: Vec<String>,
    /// In [0, 1]; monotonically non-decreasing in successful, corroborating
    /// sources. Exactly 0 when formatting failed and nothing returned data.
    pub confidence_score: f64,
    pub confidence_level: ConfidenceLevel,
    pub history: HistoryReport,
    pub started_at: DateTime<Utc>,
    pub stats: InvestigationStats,
}

impl InvestigationResult {
    pub fn record(&self, category: SourceCategory) -> Option<&IntelligenceRecord> {
        self.records.get(&category)
    }
}

// Confidence weights. Tunable; only the monotonicity property is contractual.
const WEIGHT_VALID: f64 = 0.40;
const WEIGHT_POSSIBLE: f64 = 0.15;
const WEIGHT_COVERAGE: f64 = 0.45;
const WEIGHT_CORROBORATION: f64 = 0.15;

/// The investigation engine: formatter + heuristics + source registry +
/// history store, wired per the configuration.
pub struct Investigator {
    config: Config,
    registry: SourceRegistry,
    history: HistoryStore,
}

impl Investigator {
    /// Build with the offline default sources and a history store placed per
    /// the configuration (JSONL file if a path is set, in-memory otherwise).
    pub fn new(config: Config) -> Self {
        let history = match (&config.history.path, config.history.enabled) {
            (Some(path), true) => HistoryStore::jsonl(path),
            _ => HistoryStore::in_memory(),
        };
        Self {
            config,
            registry: SourceRegistry::with_defaults(),
            history,
        }
    }

    /// Swap in a custom source registry (external API-backed sources, test
    /// doubles).
    pub fn with_registry(mut self, registry: SourceRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Swap in a custom history store.
    pub fn with_history_store(mut self, history: HistoryStore) -> Self {
        self.history = history;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run one investigation. Errors only on empty input or an unknown
    /// country hint; every other failure mode degrades into the result.
    pub async fn investigate(
        &self,
        raw_input: &str,
        hint: &CountryHint,
    ) -> Result<InvestigationResult> {
        let started_at = Utc::now();
        let clock = Instant::now();

        let formatting = match formatter::format(raw_input, hint)? {
            FormatOutcome::Success(s) => FormattingReport {
                success: true,
                number: Some(s.number),
                attempts: s.attempts,
                guidance: None,
            },
            FormatOutcome::Failure(f) => FormattingReport {
                success: false,
                number: None,
                attempts: f.attempts,
                guidance: Some(f.guidance),
            },
        };
        let formatted = formatting.number.clone();

        let profile = formatted
            .as_ref()
            .and_then(|f| countries::profile_for(&f.iso))
            .or_else(|| hint.profile());
        let digits: String = match &formatted {
            Some(f) => f.national_significant.clone(),
            None => raw_input.chars().filter(|c| c.is_ascii_digit()).collect(),
        };
        let number_kind = heuristics::classify_number_kind(profile, &digits);
        let target = Arc::new(InvestigationTarget {
            raw_input: raw_input.trim().to_string(),
            formatted: formatted.clone(),
            number_kind,
            profile,
        });

        let mut records: BTreeMap<SourceCategory, IntelligenceRecord> = BTreeMap::new();
        let mut warnings: Vec<String> = Vec::new();

        records.insert(
            SourceCategory::Technical,
            technical_record(&formatted, number_kind),
        );

        // Concurrent fan-out over the enabled categories.
        let semaphore = Arc::new(Semaphore::new(self.config.network.concurrency_limit));
        let mut calls = Vec::new();
        for &category in SourceCategory::fanout() {
            if !self.config.sources.enabled(category) {
                records.insert(
                    category,
                    IntelligenceRecord::failed(category, "config", SourceFailure::Disabled),
                );
                continue;
            }
            let Some(source) = self.registry.get(category) else {
                records.insert(
                    category,
                    IntelligenceRecord::failed(
                        category,
                        "registry",
                        SourceFailure::Unavailable {
                            reason: "no source registered for this category".into(),
                        },
                    ),
                );
                continue;
            };

            let target = target.clone();
            let semaphore = semaphore.clone();
            let budget = self.config.network.timeout_for(category);
            let retry = self.config.network.retry.clone();
            calls.push(async move {
                let _permit = match semaphore.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return IntelligenceRecord::failed(
                            category,
                            source.name(),
                            SourceFailure::Unavailable {
                                reason: "scheduler shut down".into(),
                            },
                        );
                    }
                };
                let start = Instant::now();
                let fetched = timeout(budget, call_source(&source, target.as_ref(), retry)).await;
                let elapsed_ms = start.elapsed().as_millis() as u64;
                let outcome = match fetched {
                    Ok(Ok(outcome)) => outcome,
                    Ok(Err(e)) => {
                        warn!("source {} failed: {e}", source.name());
                        SourceOutcome::Failed {
                            failure: SourceFailure::Unavailable {
                                reason: e.to_string(),
                            },
                        }
                    }
                    Err(_) => {
                        warn!(
                            "source {} timed out after {}s",
                            source.name(),
                            budget.as_secs()
                        );
                        SourceOutcome::Failed {
                            failure: SourceFailure::Timeout {
                                seconds: budget.as_secs(),
                            },
                        }
                    }
                };
                IntelligenceRecord {
                    category,
                    source_name: source.name().to_string(),
                    heuristic: source.is_heuristic(),
                    outcome,
                    elapsed_ms,
                }
            });
        }
        for record in join_all(calls).await {
            debug!(
                "source {} ({}) finished in {}ms",
                record.source_name, record.category, record.elapsed_ms
            );
            records.insert(record.category, record);
        }

        let conflicts = detect_conflicts(&records, &mut warnings);

        // Score before the history step so the snapshot can carry it; the
        // historical record is bookkeeping, not corroboration.
        let confidence_score = confidence_score(
            &formatting,
            &records,
            self.config.sources.enabled_count() + 1,
        );

        let history = self
            .record_history(&formatted, &records, number_kind, confidence_score, &mut warnings)
            .await;
        records.insert(
            SourceCategory::Historical,
            historical_record(&history),
        );

        let stats = InvestigationStats {
            sources_total: records.len(),
            sources_successful: records.values().filter(|r| r.outcome.is_found()).count(),
            duration_ms: clock.elapsed().as_millis() as u64,
        };

        Ok(InvestigationResult {
            raw_input: raw_input.trim().to_string(),
            country_hint: hint.label().to_string(),
            formatting,
            number_kind,
            records,
            conflicts,
            warnings,
            confidence_score,
            confidence_level: ConfidenceLevel::from_score(confidence_score),
            history,
            started_at,
            stats,
        })
    }

    /// Record the snapshot and diff it against the previous observation.
    async fn record_history(
        &self,
        formatted: &Option<FormattedNumber>,
        records: &BTreeMap<SourceCategory, IntelligenceRecord>,
        number_kind: NumberKind,
        confidence: f64,
        warnings: &mut Vec<String>,
    ) -> HistoryReport {
        if !self.config.history.enabled {
            return HistoryReport::Disabled;
        }
        let Some(f) = formatted else {
            // No normalized key to file the snapshot under.
            return HistoryReport::Unavailable {
                reason: "formatting failed; no E.164 key".into(),
            };
        };

        let (carrier, region) = snapshot_carrier_fields(records);
        let snapshot = HistoricalSnapshot::new(
            &f.e164,
            carrier,
            region,
            number_kind,
            f.is_valid,
            confidence,
        );
        match self.history.record_and_diff(snapshot).await {
            Ok(changes) => HistoryReport::Recorded { changes },
            Err(e) => {
                warnings.push(format!("history unavailable: {e}"));
                HistoryReport::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }
}

/// One source call, with retries for non-heuristic sources. The per-source
/// timeout wraps the whole retry sequence.
async fn call_source(
    source: &Arc<dyn IntelligenceSource>,
    target: &InvestigationTarget,
    retry: RetryConfig,
) -> Result<SourceOutcome> {
    if source.is_heuristic() {
        return source.fetch(target).await;
    }
    let executor = RetryExecutor::new(retry);
    match source.category() {
        SourceCategory::Carrier => {
            executor
                .execute(|| source.fetch(target), CarrierApiRetryPolicy)
                .await
        }
        SourceCategory::Whois => {
            executor
                .execute(|| source.fetch(target), WhoisRetryPolicy)
                .await
        }
        _ => {
            executor
                .execute(|| source.fetch(target), TransientRetryPolicy)
                .await
        }
    }
}

/// The technical slice comes straight from the formatter output.
fn technical_record(
    formatted: &Option<FormattedNumber>,
    number_kind: NumberKind,
) -> IntelligenceRecord {
    let outcome = match formatted {
        Some(f) => SourceOutcome::Found {
            data: SourceData::Technical(TechnicalData {
                is_valid: f.is_valid,
                is_possible: f.is_possible,
                iso: f.iso.clone(),
                calling_code: f.calling_code,
                e164: f.e164.clone(),
                international: f.international.clone(),
                national: f.national.clone(),
                rfc3966: f.rfc3966.clone(),
                number_kind,
            }),
        },
        None => SourceOutcome::not_found("no normalization candidate parsed"),
    };
    IntelligenceRecord {
        category: SourceCategory::Technical,
        source_name: "libphonenumber".to_string(),
        heuristic: false,
        outcome,
        elapsed_ms: 0,
    }
}

/// The historical slice mirrors the history step outcome.
fn historical_record(history: &HistoryReport) -> IntelligenceRecord {
    let category = SourceCategory::Historical;
    match history {
        HistoryReport::Disabled => {
            IntelligenceRecord::failed(category, "snapshot-store", SourceFailure::Disabled)
        }
        HistoryReport::Unavailable { reason } => IntelligenceRecord::failed(
            category,
            "snapshot-store",
            SourceFailure::Unavailable {
                reason: reason.clone(),
            },
        ),
        HistoryReport::Recorded { changes } => IntelligenceRecord {
            category,
            source_name: "snapshot-store".to_string(),
            heuristic: false,
            outcome: SourceOutcome::Found {
                data: SourceData::Historical(HistoricalData {
                    first_observation: changes.first_observation,
                    changes: changes.entries.clone(),
                }),
            },
            elapsed_ms: 0,
        },
    }
}

/// Best carrier/region pair for the snapshot: a confirmed carrier record
/// wins over the pattern engine's table guess.
fn snapshot_carrier_fields(
    records: &BTreeMap<SourceCategory, IntelligenceRecord>,
) -> (Option<String>, Option<String>) {
    if let Some(record) = records.get(&SourceCategory::Carrier)
        && let SourceOutcome::Found {
            data: SourceData::Carrier(c),
        } = &record.outcome
    {
        return (Some(c.carrier_name.clone()), Some(c.region.clone()));
    }
    if let Some(record) = records.get(&SourceCategory::Pattern)
        && let SourceOutcome::Found {
            data: SourceData::Pattern(p),
        } = &record.outcome
        && let Some(guess) = &p.carrier_guess
    {
        return (Some(guess.carrier.clone()), Some(guess.region.clone()));
    }
    (None, None)
}

/// Carrier attributions from every record that offered one, labeled by
/// source. Disagreements become advisories; the values stay where they are.
fn detect_conflicts(
    records: &BTreeMap<SourceCategory, IntelligenceRecord>,
    warnings: &mut Vec<String>,
) -> Vec<ConflictNote> {
    let mut attributions: Vec<(String, String)> = Vec::new();

    if let Some(record) = records.get(&SourceCategory::Carrier)
        && let SourceOutcome::Found {
            data: SourceData::Carrier(c),
        } = &record.outcome
    {
        attributions.push((record.source_name.clone(), c.carrier_name.clone()));
    }
    if let Some(record) = records.get(&SourceCategory::Pattern)
        && let SourceOutcome::Found {
            data: SourceData::Pattern(p),
        } = &record.outcome
        && let Some(guess) = &p.carrier_guess
    {
        attributions.push((record.source_name.clone(), guess.carrier.clone()));
    }

    let mut conflicts = Vec::new();
    if attributions.len() > 1 {
        let first = attributions[0].1.to_ascii_lowercase();
        if attributions
            .iter()
            .any(|(_, v)| v.to_ascii_lowercase() != first)
        {
            warnings.push(format!(
                "conflicting carrier attribution: {}",
                attributions
                    .iter()
                    .map(|(s, v)| format!("{s}={v}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
            conflicts.push(ConflictNote {
                field: "carrier",
                values: attributions,
            });
        }
    }
    conflicts
}

/// Weighted confidence over validity, category coverage and external
/// corroboration. Monotonically non-decreasing in successful sources.
fn confidence_score(
    formatting: &FormattingReport,
    records: &BTreeMap<SourceCategory, IntelligenceRecord>,
    categories_total: usize,
) -> f64 {
    let found: Vec<&IntelligenceRecord> = records
        .values()
        .filter(|r| r.outcome.is_found())
        .collect();

    if !formatting.success && found.is_empty() {
        return 0.0;
    }

    let mut score = 0.0;
    if let Some(number) = &formatting.number {
        score += if number.is_valid {
            WEIGHT_VALID
        } else {
            WEIGHT_POSSIBLE
        };
    }

    score += WEIGHT_COVERAGE * (found.len() as f64 / categories_total.max(1) as f64);

    let corroborated = found
        .iter()
        .any(|r| !r.heuristic && r.category != SourceCategory::Technical);
    if corroborated {
        score += WEIGHT_CORROBORATION;
    }

    score.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::CarrierData;
    use async_trait::async_trait;
    use std::time::Duration;

    struct StaticCarrierSource {
        carrier: &'static str,
    }

    #[async_trait]
    impl IntelligenceSource for StaticCarrierSource {
        fn name(&self) -> &'static str {
            "test-carrier-api"
        }
        fn category(&self) -> SourceCategory {
            SourceCategory::Carrier
        }
        async fn fetch(&self, _target: &InvestigationTarget) -> Result<SourceOutcome> {
            Ok(SourceOutcome::Found {
                data: SourceData::Carrier(CarrierData {
                    carrier_name: self.carrier.to_string(),
                    region: "test".to_string(),
                    network_type: Some("GSM".to_string()),
                    heuristic: false,
                }),
            })
        }
    }

    struct FailingSource {
        category: SourceCategory,
    }

    #[async_trait]
    impl IntelligenceSource for FailingSource {
        fn name(&self) -> &'static str {
            "test-failing"
        }
        fn category(&self) -> SourceCategory {
            self.category
        }
        async fn fetch(&self, _target: &InvestigationTarget) -> Result<SourceOutcome> {
            Err(crate::errors::PhoneIntelError::source_unavailable(
                "test-failing",
                "injected fault",
            ))
        }
    }

    struct HangingSource {
        category: SourceCategory,
    }

    #[async_trait]
    impl IntelligenceSource for HangingSource {
        fn name(&self) -> &'static str {
            "test-hanging"
        }
        fn category(&self) -> SourceCategory {
            self.category
        }
        async fn fetch(&self, _target: &InvestigationTarget) -> Result<SourceOutcome> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(SourceOutcome::NotFound { note: None })
        }
    }

    fn investigator() -> Investigator {
        Investigator::new(Config::default())
    }

    fn hint_in() -> CountryHint {
        CountryHint::parse("IN").unwrap()
    }

    #[tokio::test]
    async fn offline_investigation_of_valid_indian_mobile() {
        let result = investigator()
            .investigate("9876543210", &hint_in())
            .await
            .unwrap();

        assert!(result.formatting.success);
        let number = result.formatting.number.as_ref().unwrap();
        assert_eq!(number.e164, "+919876543210");
        assert_eq!(result.number_kind, NumberKind::Mobile);

        assert!(result.record(SourceCategory::Technical).unwrap().outcome.is_found());
        assert!(result.record(SourceCategory::Carrier).unwrap().outcome.is_found());
        assert!(result.record(SourceCategory::Pattern).unwrap().outcome.is_found());
        // Offline built-ins have no breach dataset, and that is not a failure.
        assert!(matches!(
            result.record(SourceCategory::Breach).unwrap().outcome,
            SourceOutcome::NotFound { .. }
        ));

        assert!(result.confidence_score > 0.0);
        assert!(result.confidence_score <= 1.0);
        match &result.history {
            HistoryReport::Recorded { changes } => assert!(changes.first_observation),
            other => panic!("unexpected history report: {other:?}"),
        }
    }

    #[tokio::test]
    async fn single_source_timeout_degrades_but_does_not_poison() {
        let mut config = Config::default();
        config.network.source_timeout = Duration::from_millis(50);
        let mut registry = SourceRegistry::with_defaults();
        registry.register(HangingSource {
            category: SourceCategory::Carrier,
        });

        let result = Investigator::new(config)
            .with_registry(registry)
            .investigate("9876543210", &hint_in())
            .await
            .unwrap();

        match &result.record(SourceCategory::Carrier).unwrap().outcome {
            SourceOutcome::Failed {
                failure: SourceFailure::Timeout { .. },
            } => {}
            other => panic!("expected carrier timeout, got {other:?}"),
        }
        // Technical data is still populated and the score stays nonzero.
        assert!(result.record(SourceCategory::Technical).unwrap().outcome.is_found());
        assert!(result.confidence_score > 0.0);

        let baseline = investigator()
            .investigate("9876543210", &hint_in())
            .await
            .unwrap();
        assert!(result.confidence_score < baseline.confidence_score);
    }

    #[tokio::test]
    async fn injected_fault_leaves_other_categories_untouched() {
        let mut registry = SourceRegistry::with_defaults();
        registry.register(FailingSource {
            category: SourceCategory::Reputation,
        });
        let result = Investigator::new(Config::default())
            .with_registry(registry)
            .investigate("9876543210", &hint_in())
            .await
            .unwrap();
        let baseline = investigator()
            .investigate("9876543210", &hint_in())
            .await
            .unwrap();

        assert!(result.record(SourceCategory::Reputation).unwrap().outcome.is_failed());
        for category in [
            SourceCategory::Technical,
            SourceCategory::Carrier,
            SourceCategory::Social,
            SourceCategory::Breach,
            SourceCategory::Whois,
            SourceCategory::Pattern,
        ] {
            let a = result.record(category).unwrap().outcome.is_found();
            let b = baseline.record(category).unwrap().outcome.is_found();
            assert_eq!(a, b, "category {category} changed outcome");
        }
    }

    #[tokio::test]
    async fn disabled_category_is_reported_as_disabled() {
        let mut config = Config::default();
        config.sources.whois = false;
        let result = Investigator::new(config)
            .investigate("9876543210", &hint_in())
            .await
            .unwrap();
        assert!(matches!(
            result.record(SourceCategory::Whois).unwrap().outcome,
            SourceOutcome::Failed {
                failure: SourceFailure::Disabled
            }
        ));
    }

    #[tokio::test]
    async fn empty_input_is_a_hard_error() {
        let err = investigator().investigate("  ", &hint_in()).await.unwrap_err();
        assert!(matches!(err, crate::errors::PhoneIntelError::EmptyInput));
    }

    #[tokio::test]
    async fn formatting_failure_still_runs_raw_digit_heuristics() {
        let result = investigator().investigate("12 34", &hint_in()).await.unwrap();
        assert!(!result.formatting.success);
        assert!(result.formatting.guidance.as_ref().unwrap().contains("+91"));
        // Pattern analysis ran on the raw digits.
        assert!(result.record(SourceCategory::Pattern).unwrap().outcome.is_found());
        // History cannot be keyed without a normalized number.
        assert!(matches!(result.history, HistoryReport::Unavailable { .. }));
    }

    #[tokio::test]
    async fn external_corroboration_raises_confidence() {
        let mut registry = SourceRegistry::with_defaults();
        registry.register(StaticCarrierSource { carrier: "Vodafone Idea" });
        let corroborated = Investigator::new(Config::default())
            .with_registry(registry)
            .investigate("9876543210", &hint_in())
            .await
            .unwrap();
        let baseline = investigator()
            .investigate("9876543210", &hint_in())
            .await
            .unwrap();
        assert!(corroborated.confidence_score > baseline.confidence_score);
    }

    #[tokio::test]
    async fn conflicting_carrier_attributions_are_both_retained() {
        let mut registry = SourceRegistry::with_defaults();
        registry.register(StaticCarrierSource { carrier: "Acme Telecom" });
        let result = Investigator::new(Config::default())
            .with_registry(registry)
            .investigate("9876543210", &hint_in())
            .await
            .unwrap();

        assert_eq!(result.conflicts.len(), 1);
        let conflict = &result.conflicts[0];
        assert_eq!(conflict.field, "carrier");
        assert_eq!(conflict.values.len(), 2);
        assert!(result.warnings.iter().any(|w| w.contains("carrier")));

        // Each record keeps its own value; nothing was collapsed.
        match &result.record(SourceCategory::Carrier).unwrap().outcome {
            SourceOutcome::Found {
                data: SourceData::Carrier(c),
            } => assert_eq!(c.carrier_name, "Acme Telecom"),
            other => panic!("unexpected carrier outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn carrier_change_between_runs_is_one_change_entry() {
        // Simulated carrier change between two runs against the same store.
        // Rebuilding the investigator would lose the in-memory log, so reuse
        // one investigator with a swapped registry instead.
        let mut registry = SourceRegistry::with_defaults();
        registry.register(StaticCarrierSource { carrier: "Acme Telecom" });
        let investigator = Investigator::new(Config::default()).with_registry(registry);
        let first = investigator.investigate("9876543210", &hint_in()).await.unwrap();
        match &first.history {
            HistoryReport::Recorded { changes } => assert!(changes.first_observation),
            other => panic!("unexpected history report: {other:?}"),
        }

        let mut registry = SourceRegistry::with_defaults();
        registry.register(StaticCarrierSource { carrier: "Globex Mobile" });
        let investigator = investigator.with_registry(registry);
        let second = investigator.investigate("9876543210", &hint_in()).await.unwrap();
        match &second.history {
            HistoryReport::Recorded { changes } => {
                assert!(!changes.first_observation);
                assert_eq!(changes.entries.len(), 1);
                assert_eq!(changes.entries[0].field, "carrier");
                assert_eq!(changes.entries[0].old_value, "Acme Telecom");
                assert_eq!(changes.entries[0].new_value, "Globex Mobile");
            }
            other => panic!("unexpected history report: {other:?}"),
        }
    }

    #[test]
    fn confidence_level_bands() {
        assert_eq!(ConfidenceLevel::from_score(0.97), ConfidenceLevel::Critical);
        assert_eq!(ConfidenceLevel::from_score(0.85), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_score(0.65), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_score(0.45), ConfidenceLevel::Low);
        assert_eq!(ConfidenceLevel::from_score(0.25), ConfidenceLevel::VeryLow);
        assert_eq!(ConfidenceLevel::from_score(0.05), ConfidenceLevel::Unreliable);
    }
}
