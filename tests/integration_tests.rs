//! Integration tests for phoneintel.
//!
//! These tests verify end-to-end functionality without relying on external
//! network services: the default sources are offline, and external
//! collaborators are stood in for by test doubles implementing the source
//! trait.

use async_trait::async_trait;
use tempfile::tempdir;

use phoneintel::aggregator::Investigator;
use phoneintel::config::Config;
use phoneintel::countries::CountryHint;
use phoneintel::errors::Result;
use phoneintel::history::{HistoryReport, HistoryStore};
use phoneintel::sources::{
    BreachData, BreachIncident, CarrierData, IntelligenceSource, InvestigationTarget,
    SourceCategory, SourceData, SourceOutcome, SourceRegistry,
};
use phoneintel::structured_output::InvestigationReport;

struct FixedCarrierSource {
    carrier: &'static str,
}

#[async_trait]
impl IntelligenceSource for FixedCarrierSource {
    fn name(&self) -> &'static str {
        "carrier-api"
    }
    fn category(&self) -> SourceCategory {
        SourceCategory::Carrier
    }
    async fn fetch(&self, _target: &InvestigationTarget) -> Result<SourceOutcome> {
        Ok(SourceOutcome::Found {
            data: SourceData::Carrier(CarrierData {
                carrier_name: self.carrier.to_string(),
                region: "Karnataka".to_string(),
                network_type: Some("GSM".to_string()),
                heuristic: false,
            }),
        })
    }
}

struct FixedBreachSource;

#[async_trait]
impl IntelligenceSource for FixedBreachSource {
    fn name(&self) -> &'static str {
        "breach-api"
    }
    fn category(&self) -> SourceCategory {
        SourceCategory::Breach
    }
    async fn fetch(&self, _target: &InvestigationTarget) -> Result<SourceOutcome> {
        Ok(SourceOutcome::Found {
            data: SourceData::Breach(BreachData {
                incidents: vec![BreachIncident {
                    name: "ExampleCo".to_string(),
                    year: Some(2023),
                    data_classes: vec!["phone".to_string(), "email".to_string()],
                }],
            }),
        })
    }
}

struct BrokenSource {
    category: SourceCategory,
}

#[async_trait]
impl IntelligenceSource for BrokenSource {
    fn name(&self) -> &'static str {
        "broken"
    }
    fn category(&self) -> SourceCategory {
        self.category
    }
    async fn fetch(&self, _target: &InvestigationTarget) -> Result<SourceOutcome> {
        Err(phoneintel::PhoneIntelError::source_unavailable(
            "broken",
            "connection refused by peer",
        ))
    }
}

fn hint(iso: &str) -> CountryHint {
    CountryHint::parse(iso).unwrap()
}

/// Full offline run with a file-backed history store, twice, checking that
/// the second run diffs against the first.
#[tokio::test]
async fn repeat_investigation_uses_persisted_history() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("history.jsonl");

    let mut config = Config::default();
    config.history.path = Some(db.clone());
    let investigator = Investigator::new(config);

    let first = investigator
        .investigate("+91 9876543210", &CountryHint::Auto)
        .await
        .unwrap();
    assert!(first.formatting.success);
    match &first.history {
        HistoryReport::Recorded { changes } => assert!(changes.first_observation),
        other => panic!("unexpected history report: {other:?}"),
    }

    // A fresh investigator over the same file sees the prior snapshot.
    let mut config = Config::default();
    config.history.path = Some(db);
    let second = Investigator::new(config)
        .investigate("9876543210", &hint("IN"))
        .await
        .unwrap();
    match &second.history {
        HistoryReport::Recorded { changes } => {
            assert!(!changes.first_observation);
            assert!(changes.entries.is_empty(), "nothing changed between runs");
        }
        other => panic!("unexpected history report: {other:?}"),
    }
}

/// External sources plug in through the registry and show up, corroborated,
/// in the structured report.
#[tokio::test]
async fn external_sources_flow_into_the_report() {
    let mut registry = SourceRegistry::with_defaults();
    registry.register(FixedCarrierSource { carrier: "Vodafone Idea" });
    registry.register(FixedBreachSource);

    let baseline = Investigator::new(Config::default())
        .investigate("9876543210", &hint("IN"))
        .await
        .unwrap();
    let result = Investigator::new(Config::default())
        .with_registry(registry)
        .investigate("9876543210", &hint("IN"))
        .await
        .unwrap();

    // More successful, corroborating sources never lower the score.
    assert!(result.confidence_score > baseline.confidence_score);

    let report = InvestigationReport::from(&result);
    let breach = report
        .intelligence
        .iter()
        .find(|c| c.category == "breach")
        .unwrap();
    assert_eq!(breach.source, "breach-api");
    assert!(breach.data.as_ref().unwrap().to_string().contains("ExampleCo"));

    let carrier = report
        .intelligence
        .iter()
        .find(|c| c.category == "carrier")
        .unwrap();
    assert!(!carrier.heuristic);

    let json = report.to_json().unwrap();
    let parsed: InvestigationReport = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.confidence.score, report.confidence.score);
}

/// Breaking several sources at once degrades those categories only; the
/// result still comes back scored and explained.
#[tokio::test]
async fn broken_sources_degrade_gracefully() {
    let mut registry = SourceRegistry::with_defaults();
    for category in [
        SourceCategory::Carrier,
        SourceCategory::Reputation,
        SourceCategory::Social,
    ] {
        registry.register(BrokenSource { category });
    }

    let result = Investigator::new(Config::default())
        .with_registry(registry)
        .investigate("9876543210", &hint("IN"))
        .await
        .unwrap();

    for category in [
        SourceCategory::Carrier,
        SourceCategory::Reputation,
        SourceCategory::Social,
    ] {
        let record = result.record(category).unwrap();
        assert!(record.outcome.is_failed());
    }
    // Technical and pattern data survive, and the number is still valid.
    assert!(result.record(SourceCategory::Technical).unwrap().outcome.is_found());
    assert!(result.record(SourceCategory::Pattern).unwrap().outcome.is_found());
    assert!(result.confidence_score > 0.0);

    // Each failed category carries a reason the UI can show.
    let report = InvestigationReport::from(&result);
    for entry in report.intelligence.iter().filter(|c| {
        matches!(
            c.category.as_str(),
            "carrier" | "reputation" | "social"
        )
    }) {
        assert!(entry.failure.as_ref().unwrap().contains("connection refused"));
    }
}

/// Investigations of different numbers are independent and can run
/// concurrently against one investigator.
#[tokio::test]
async fn concurrent_investigations_of_different_numbers() {
    let investigator = std::sync::Arc::new(Investigator::new(Config::default()));

    let a = {
        let inv = investigator.clone();
        tokio::spawn(async move { inv.investigate("9876543210", &hint("IN")).await })
    };
    let b = {
        let inv = investigator.clone();
        tokio::spawn(async move { inv.investigate("7012345678", &hint("IN")).await })
    };

    let a = a.await.unwrap().unwrap();
    let b = b.await.unwrap().unwrap();
    assert_eq!(a.formatting.number.as_ref().unwrap().e164, "+919876543210");
    assert_eq!(b.formatting.number.as_ref().unwrap().e164, "+917012345678");
    // Both were first observations of their own key.
    for result in [&a, &b] {
        match &result.history {
            HistoryReport::Recorded { changes } => assert!(changes.first_observation),
            other => panic!("unexpected history report: {other:?}"),
        }
    }
}

/// A custom history store can be shared between investigators.
#[tokio::test]
async fn shared_memory_store_diffs_across_investigators() {
    let store = HistoryStore::in_memory();
    let investigator = Investigator::new(Config::default()).with_history_store(store);

    let first = investigator.investigate("9876543210", &hint("IN")).await.unwrap();
    let second = investigator.investigate("9876543210", &hint("IN")).await.unwrap();

    match (&first.history, &second.history) {
        (HistoryReport::Recorded { changes: c1 }, HistoryReport::Recorded { changes: c2 }) => {
            assert!(c1.first_observation);
            assert!(!c2.first_observation);
        }
        other => panic!("unexpected history reports: {other:?}"),
    }
}
