//! Plain-text report rendering.
//!
//! Every category prints a line even when it produced nothing, with the
//! reason spelled out (timeout vs no data vs disabled), so a reader is never
//! left guessing whether data does not exist or a source broke.

use std::fmt::Write;

use crate::aggregator::{ConfidenceLevel, InvestigationResult};
use crate::formatter::ParseOutcome;
use crate::history::HistoryReport;
use crate::sources::{IntelligenceRecord, SourceData, SourceOutcome};

/// Text formatter for investigation results.
pub struct TextFormatter {
    pub show_attempts: bool,
}

impl TextFormatter {
    pub fn new(show_attempts: bool) -> Self {
        Self { show_attempts }
    }

    pub fn format_result(&self, result: &InvestigationResult) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "Target: {}", result.raw_input);
        let _ = writeln!(out, "Country hint: {}", result.country_hint);

        match &result.formatting.number {
            Some(n) => {
                let _ = writeln!(out);
                let _ = writeln!(out, "Normalized number");
                let _ = writeln!(out, "  E.164:         {}", n.e164);
                let _ = writeln!(out, "  International: {}", n.international);
                let _ = writeln!(out, "  National:      {}", n.national);
                let _ = writeln!(out, "  RFC3966:       {}", n.rfc3966);
                let _ = writeln!(
                    out,
                    "  Region: {}  Valid: {}  Kind: {}",
                    n.iso,
                    n.is_valid,
                    result.number_kind.describe()
                );
                let _ = writeln!(out, "  Matched rule: {}", n.matched_rule.describe());
            }
            None => {
                let _ = writeln!(out);
                let _ = writeln!(out, "Could not normalize the input.");
                if let Some(guidance) = &result.formatting.guidance {
                    let _ = writeln!(out, "{guidance}");
                }
            }
        }

        if self.show_attempts || !result.formatting.success {
            let _ = writeln!(out);
            let _ = writeln!(out, "Normalization attempts");
            for attempt in &result.formatting.attempts {
                let status = match &attempt.outcome {
                    ParseOutcome::Valid => "valid".to_string(),
                    ParseOutcome::Possible => "possible".to_string(),
                    ParseOutcome::Invalid { reason } => format!("invalid ({reason})"),
                };
                let region = attempt.region.unwrap_or("-");
                let _ = writeln!(
                    out,
                    "  [{}] {:<20} region {:<4} -> {}",
                    attempt.rule.describe(),
                    attempt.candidate,
                    region,
                    status
                );
            }
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "Intelligence");
        for record in result.records.values() {
            self.format_record(&mut out, record);
        }

        if !result.conflicts.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Conflicting data (all values retained)");
            for conflict in &result.conflicts {
                let values = conflict
                    .values
                    .iter()
                    .map(|(source, value)| format!("{source}: {value}"))
                    .collect::<Vec<_>>()
                    .join(" / ");
                let _ = writeln!(out, "  {}: {}", conflict.field, values);
            }
        }

        if !result.warnings.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Warnings");
            for warning in &result.warnings {
                let _ = writeln!(out, "  - {warning}");
            }
        }

        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Confidence: {:.0}% ({})",
            result.confidence_score * 100.0,
            level_name(result.confidence_level)
        );
        let _ = writeln!(
            out,
            "Categories: {} total, {} with data; completed in {} ms",
            result.stats.sources_total, result.stats.sources_successful, result.stats.duration_ms
        );

        out
    }

    fn format_record(&self, out: &mut String, record: &IntelligenceRecord) {
        let heading = format!(
            "  {:<10} [{}{}]",
            record.category.as_str(),
            record.source_name,
            if record.heuristic { ", heuristic" } else { "" }
        );
        match &record.outcome {
            SourceOutcome::Failed { failure } => {
                let _ = writeln!(out, "{heading} {failure}");
            }
            SourceOutcome::NotFound { note } => {
                let _ = writeln!(
                    out,
                    "{heading} no data{}",
                    note.as_ref()
                        .map(|n| format!(" ({n})"))
                        .unwrap_or_default()
                );
            }
            SourceOutcome::Found { data } => {
                let _ = writeln!(out, "{heading} {}", summarize(data));
            }
        }
    }
}

fn level_name(level: ConfidenceLevel) -> &'static str {
    match level {
        ConfidenceLevel::Critical => "critical",
        ConfidenceLevel::High => "high",
        ConfidenceLevel::Medium => "medium",
        ConfidenceLevel::Low => "low",
        ConfidenceLevel::VeryLow => "very low",
        ConfidenceLevel::Unreliable => "unreliable",
    }
}

/// One-line summary per payload kind.
fn summarize(data: &SourceData) -> String {
    match data {
        SourceData::Technical(t) => format!(
            "{} {} ({}), valid={}",
            t.e164,
            t.iso,
            t.number_kind.describe(),
            t.is_valid
        ),
        SourceData::Carrier(c) => {
            let mut s = format!("{} — {}", c.carrier_name, c.region);
            if let Some(network) = &c.network_type {
                let _ = write!(s, " ({network})");
            }
            if c.heuristic {
                s.push_str(" [unverified]");
            }
            s
        }
        SourceData::Reputation(r) => format!(
            "risk {:.2} ({:?}){}",
            r.risk_score,
            r.risk_level,
            if r.indicators.is_empty() {
                String::new()
            } else {
                format!("; {}", r.indicators.join("; "))
            }
        ),
        SourceData::Social(s) => format!(
            "expected presence {:?}: {}",
            s.overall,
            s.platforms
                .iter()
                .map(|p| format!("{} {:?}", p.platform, p.likelihood))
                .collect::<Vec<_>>()
                .join(", ")
        ),
        SourceData::Breach(b) => format!("{} incident(s)", b.incidents.len()),
        SourceData::Whois(w) => format!(
            "{} domain(s), {} business connection(s)",
            w.domains.len(),
            w.business_connections.len()
        ),
        SourceData::Pattern(p) => {
            let mut parts = vec![format!("business likelihood {:.2}", p.business_likelihood)];
            if let Some(guess) = &p.carrier_guess {
                parts.push(format!("allocation {} [unverified]", guess.carrier));
            }
            if let Some(block) = &p.bulk_block {
                parts.push(format!(
                    "bulk block {}-{} ({})",
                    block.block_start, block.block_end, block.indicator
                ));
            }
            if !p.spam_patterns.is_empty() {
                parts.push(format!("spam patterns {:?}", p.spam_patterns));
            }
            parts.join(", ")
        }
        SourceData::Historical(h) => {
            if h.first_observation {
                "first observation recorded".to_string()
            } else if h.changes.is_empty() {
                "no changes since last observation".to_string()
            } else {
                h.changes
                    .iter()
                    .map(|c| format!("{} changed: {} -> {}", c.field, c.old_value, c.new_value))
                    .collect::<Vec<_>>()
                    .join("; ")
            }
        }
    }
}

/// Render the history step on its own, for timeline display.
pub fn format_history(report: &HistoryReport) -> String {
    match report {
        HistoryReport::Disabled => "history: disabled".to_string(),
        HistoryReport::Unavailable { reason } => format!("history: unavailable ({reason})"),
        HistoryReport::Recorded { changes } if changes.first_observation => {
            "history: first observation".to_string()
        }
        HistoryReport::Recorded { changes } if changes.entries.is_empty() => {
            "history: no changes".to_string()
        }
        HistoryReport::Recorded { changes } => format!(
            "history: {} change(s): {}",
            changes.entries.len(),
            changes
                .entries
                .iter()
                .map(|c| format!("{} {} -> {}", c.field, c.old_value, c.new_value))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}
