//! Structured output for JSON and YAML serialization.
//!
//! A parallel, fully-owned report model mirroring `InvestigationResult`,
//! designed to be both human-readable and machine-parsable. Keeping it
//! separate from the core types means the wire format can stay stable (and
//! schema-versioned) while internals evolve.

use anyhow::Result;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::aggregator::InvestigationResult;
use crate::history::HistoryReport;
use crate::sources::SourceOutcome;

pub const SCHEMA_VERSION: &str = "1.0.0";

/// Root structure for all structured output.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct InvestigationReport {
    /// Tool version and metadata
    pub metadata: ReportMetadata,

    /// What was investigated
    pub input: InputInfo,

    /// Normalization outcome
    pub formatting: FormattingInfo,

    /// One entry per intelligence category, including empty and failed ones
    pub intelligence: Vec<CategoryReport>,

    /// Facts on which sources disagree; the per-category entries keep their
    /// own values
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub conflicts: Vec<ConflictInfo>,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub warnings: Vec<String>,

    pub confidence: ConfidenceInfo,

    pub history: HistoryInfo,

    pub statistics: Statistics,
}

/// Tool metadata and versioning information.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct ReportMetadata {
    pub tool_name: String,
    pub version: String,
    pub generated_at: DateTime<Utc>,
    pub schema_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct InputInfo {
    pub raw_input: String,
    pub country_hint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct FormattingInfo {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub e164: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub international: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub national: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rfc3966: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    pub number_kind: String,
    pub is_valid: bool,
    /// Which normalization rule produced the winning candidate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_rule: Option<String>,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guidance: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CategoryStatus {
    Found,
    NotFound,
    Failed,
}

/// One category's contribution, with its payload as raw JSON.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct CategoryReport {
    pub category: String,
    pub source: String,
    pub heuristic: bool,
    pub status: CategoryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct ConflictInfo {
    pub field: String,
    /// source name -> value
    pub values: Vec<ConflictValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct ConflictValue {
    pub source: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct ConfidenceInfo {
    /// In [0, 1].
    pub score: f64,
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct HistoryInfo {
    /// "recorded", "disabled" or "unavailable".
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_observation: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub changes: Vec<ChangeInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct ChangeInfo {
    pub field: String,
    pub old_value: String,
    pub new_value: String,
    pub old_observed_at: DateTime<Utc>,
    pub new_observed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct Statistics {
    pub categories_total: u32,
    pub categories_with_data: u32,
    pub duration_ms: u64,
}

impl InvestigationReport {
    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Emit the JSON schema for this output format.
    pub fn generate_json_schema() -> Result<String> {
        let schema = schemars::schema_for!(InvestigationReport);
        Ok(serde_json::to_string_pretty(&schema)?)
    }
}

impl From<&InvestigationResult> for InvestigationReport {
    fn from(result: &InvestigationResult) -> Self {
        let formatting = match &result.formatting.number {
            Some(n) => FormattingInfo {
                success: true,
                e164: Some(n.e164.clone()),
                international: Some(n.international.clone()),
                national: Some(n.national.clone()),
                rfc3966: Some(n.rfc3966.clone()),
                region: Some(n.iso.clone()),
                number_kind: result.number_kind.describe().to_string(),
                is_valid: n.is_valid,
                matched_rule: Some(n.matched_rule.describe().to_string()),
                attempts: result.formatting.attempts.len() as u32,
                guidance: None,
            },
            None => FormattingInfo {
                success: false,
                e164: None,
                international: None,
                national: None,
                rfc3966: None,
                region: None,
                number_kind: result.number_kind.describe().to_string(),
                is_valid: false,
                matched_rule: None,
                attempts: result.formatting.attempts.len() as u32,
                guidance: result.formatting.guidance.clone(),
            },
        };

        let intelligence = result
            .records
            .values()
            .map(|record| {
                let (status, note, failure, data) = match &record.outcome {
                    SourceOutcome::Found { data } => (
                        CategoryStatus::Found,
                        None,
                        None,
                        serde_json::to_value(data).ok(),
                    ),
                    SourceOutcome::NotFound { note } => {
                        (CategoryStatus::NotFound, note.clone(), None, None)
                    }
                    SourceOutcome::Failed { failure } => (
                        CategoryStatus::Failed,
                        None,
                        Some(failure.to_string()),
                        None,
                    ),
                };
                CategoryReport {
                    category: record.category.as_str().to_string(),
                    source: record.source_name.clone(),
                    heuristic: record.heuristic,
                    status,
                    note,
                    failure,
                    data,
                    elapsed_ms: record.elapsed_ms,
                }
            })
            .collect();

        let conflicts = result
            .conflicts
            .iter()
            .map(|c| ConflictInfo {
                field: c.field.to_string(),
                values: c
                    .values
                    .iter()
                    .map(|(source, value)| ConflictValue {
                        source: source.clone(),
                        value: value.clone(),
                    })
                    .collect(),
            })
            .collect();

        let history = match &result.history {
            HistoryReport::Disabled => HistoryInfo {
                status: "disabled".to_string(),
                first_observation: None,
                changes: Vec::new(),
                reason: None,
            },
            HistoryReport::Unavailable { reason } => HistoryInfo {
                status: "unavailable".to_string(),
                first_observation: None,
                changes: Vec::new(),
                reason: Some(reason.clone()),
            },
            HistoryReport::Recorded { changes } => HistoryInfo {
                status: "recorded".to_string(),
                first_observation: Some(changes.first_observation),
                changes: changes
                    .entries
                    .iter()
                    .map(|e| ChangeInfo {
                        field: e.field.to_string(),
                        old_value: e.old_value.clone(),
                        new_value: e.new_value.clone(),
                        old_observed_at: e.old_observed_at,
                        new_observed_at: e.new_observed_at,
                    })
                    .collect(),
                reason: None,
            },
        };

        InvestigationReport {
            metadata: ReportMetadata {
                tool_name: crate::NAME.to_string(),
                version: crate::VERSION.to_string(),
                generated_at: Utc::now(),
                schema_version: SCHEMA_VERSION.to_string(),
            },
            input: InputInfo {
                raw_input: result.raw_input.clone(),
                country_hint: result.country_hint.clone(),
            },
            formatting,
            intelligence,
            conflicts,
            warnings: result.warnings.clone(),
            confidence: ConfidenceInfo {
                score: result.confidence_score,
                level: format!("{:?}", result.confidence_level).to_lowercase(),
            },
            history,
            statistics: Statistics {
                categories_total: result.stats.sources_total as u32,
                categories_with_data: result.stats.sources_successful as u32,
                duration_ms: result.stats.duration_ms,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::Investigator;
    use crate::config::Config;
    use crate::countries::CountryHint;

    async fn sample_report() -> InvestigationReport {
        let result = Investigator::new(Config::default())
            .investigate("9876543210", &CountryHint::parse("IN").unwrap())
            .await
            .unwrap();
        InvestigationReport::from(&result)
    }

    #[tokio::test]
    async fn json_round_trips() {
        let report = sample_report().await;
        let json = report.to_json().unwrap();
        assert!(json.contains("\"schema_version\""));
        assert!(json.contains("+919876543210"));

        let parsed: InvestigationReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.input.raw_input, "9876543210");
        assert_eq!(parsed.intelligence.len(), report.intelligence.len());
    }

    #[tokio::test]
    async fn yaml_serializes() {
        let report = sample_report().await;
        let yaml = report.to_yaml().unwrap();
        assert!(yaml.contains("raw_input: '9876543210'") || yaml.contains("raw_input: \"9876543210\"") || yaml.contains("raw_input: 9876543210"));
    }

    #[tokio::test]
    async fn every_category_appears_even_when_empty() {
        let report = sample_report().await;
        let categories: Vec<&str> = report
            .intelligence
            .iter()
            .map(|c| c.category.as_str())
            .collect();
        for expected in [
            "technical", "carrier", "reputation", "social", "breach", "whois", "pattern",
            "historical",
        ] {
            assert!(categories.contains(&expected), "missing {expected}");
        }
        // The breach entry explains why it is empty.
        let breach = report
            .intelligence
            .iter()
            .find(|c| c.category == "breach")
            .unwrap();
        assert_eq!(breach.status, CategoryStatus::NotFound);
        assert!(breach.note.is_some());
    }

    #[test]
    fn schema_generation_works() {
        let schema = InvestigationReport::generate_json_schema().unwrap();
        assert!(schema.contains("\"title\""));
        assert!(schema.contains("InvestigationReport"));
    }
}
