//! Offline carrier and pattern heuristics.
//!
//! Pure functions over a validated national significant number; no I/O.
//! Everything here is an acknowledged estimate derived from static tables
//! and structural cues, never verified data: each result type carries an
//! explicit `heuristic` marker so downstream consumers cannot mistake it for
//! confirmed carrier-API output.
//!
//! The prefix table is India-specific. Mobile number series are recycled and
//! ported between operators, so a prefix match identifies the original
//! allocation at best.

use serde::Serialize;

use crate::countries::CountryProfile;

/// One prefix allocation rule. First matching rule wins.
#[derive(Debug, Clone, Copy)]
struct PrefixRule {
    iso: &'static str,
    prefix: &'static str,
    nsn_len: usize,
    carrier: &'static str,
    region: &'static str,
}

/// Ordered allocation rules. BSNL's named series sit above the broader
/// Vodafone Idea range so they stay reachable under first-match-wins.
static PREFIX_RULES: &[PrefixRule] = &[
    PrefixRule { iso: "IN", prefix: "60", nsn_len: 10, carrier: "Reliance Jio", region: "pan-India" },
    PrefixRule { iso: "IN", prefix: "61", nsn_len: 10, carrier: "Reliance Jio", region: "pan-India" },
    PrefixRule { iso: "IN", prefix: "62", nsn_len: 10, carrier: "Reliance Jio", region: "pan-India" },
    PrefixRule { iso: "IN", prefix: "63", nsn_len: 10, carrier: "Reliance Jio", region: "pan-India" },
    PrefixRule { iso: "IN", prefix: "64", nsn_len: 10, carrier: "Reliance Jio", region: "pan-India" },
    PrefixRule { iso: "IN", prefix: "65", nsn_len: 10, carrier: "Reliance Jio", region: "pan-India" },
    PrefixRule { iso: "IN", prefix: "66", nsn_len: 10, carrier: "Reliance Jio", region: "pan-India" },
    PrefixRule { iso: "IN", prefix: "67", nsn_len: 10, carrier: "Reliance Jio", region: "pan-India" },
    PrefixRule { iso: "IN", prefix: "68", nsn_len: 10, carrier: "Reliance Jio", region: "pan-India" },
    PrefixRule { iso: "IN", prefix: "69", nsn_len: 10, carrier: "Reliance Jio", region: "pan-India" },
    PrefixRule { iso: "IN", prefix: "70", nsn_len: 10, carrier: "Airtel", region: "pan-India" },
    PrefixRule { iso: "IN", prefix: "80", nsn_len: 10, carrier: "Airtel", region: "pan-India" },
    PrefixRule { iso: "IN", prefix: "81", nsn_len: 10, carrier: "Airtel", region: "pan-India" },
    PrefixRule { iso: "IN", prefix: "82", nsn_len: 10, carrier: "Airtel", region: "pan-India" },
    PrefixRule { iso: "IN", prefix: "83", nsn_len: 10, carrier: "Airtel", region: "pan-India" },
    PrefixRule { iso: "IN", prefix: "84", nsn_len: 10, carrier: "Airtel", region: "pan-India" },
    PrefixRule { iso: "IN", prefix: "85", nsn_len: 10, carrier: "Airtel", region: "pan-India" },
    PrefixRule { iso: "IN", prefix: "86", nsn_len: 10, carrier: "Airtel", region: "pan-India" },
    PrefixRule { iso: "IN", prefix: "87", nsn_len: 10, carrier: "Airtel", region: "pan-India" },
    PrefixRule { iso: "IN", prefix: "88", nsn_len: 10, carrier: "Airtel", region: "pan-India" },
    PrefixRule { iso: "IN", prefix: "89", nsn_len: 10, carrier: "Airtel", region: "pan-India" },
    PrefixRule { iso: "IN", prefix: "94", nsn_len: 10, carrier: "BSNL", region: "state circles" },
    PrefixRule { iso: "IN", prefix: "95", nsn_len: 10, carrier: "BSNL", region: "state circles" },
    PrefixRule { iso: "IN", prefix: "90", nsn_len: 10, carrier: "Vodafone Idea", region: "pan-India" },
    PrefixRule { iso: "IN", prefix: "91", nsn_len: 10, carrier: "Vodafone Idea", region: "pan-India" },
    PrefixRule { iso: "IN", prefix: "92", nsn_len: 10, carrier: "Vodafone Idea", region: "pan-India" },
    PrefixRule { iso: "IN", prefix: "93", nsn_len: 10, carrier: "Vodafone Idea", region: "pan-India" },
    PrefixRule { iso: "IN", prefix: "96", nsn_len: 10, carrier: "Vodafone Idea", region: "pan-India" },
    PrefixRule { iso: "IN", prefix: "97", nsn_len: 10, carrier: "Vodafone Idea", region: "pan-India" },
    PrefixRule { iso: "IN", prefix: "98", nsn_len: 10, carrier: "Vodafone Idea", region: "pan-India" },
    PrefixRule { iso: "IN", prefix: "99", nsn_len: 10, carrier: "Vodafone Idea", region: "pan-India" },
];

/// Spam-number digit patterns; a hit raises the offline reputation risk.
static SPAM_PATTERNS: &[&str] = &["999999", "888888", "777777", "000000"];

/// Carrier attribution from the static allocation table.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CarrierGuess {
    pub carrier: String,
    pub region: String,
    pub matched_prefix: String,
    /// Always true: table-derived, unverified.
    pub heuristic: bool,
}

/// Coarse number classification. The parsing library reports validity and
/// formatting only, so the kind is inferred from country-profile series.
/// Deserialize is needed because the kind is a tracked field in persisted
/// history snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberKind {
    Mobile,
    FixedLineOrUnknown,
    TollFree,
    Premium,
    ShortCode,
}

impl NumberKind {
    pub fn describe(&self) -> &'static str {
        match self {
            NumberKind::Mobile => "mobile",
            NumberKind::FixedLineOrUnknown => "fixed line or unknown",
            NumberKind::TollFree => "toll-free",
            NumberKind::Premium => "premium rate",
            NumberKind::ShortCode => "short code",
        }
    }
}

/// Coarse social-presence expectation bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceLikelihood {
    Low,
    Medium,
    High,
    VeryHigh,
}

/// A contiguous allocation block this number appears to belong to.
#[derive(Debug, Clone, Serialize)]
pub struct BulkBlock {
    pub block_start: String,
    pub block_end: String,
    pub block_size: u32,
    pub confidence: f64,
    pub indicator: &'static str,
    pub heuristic: bool,
}

/// Match the NSN against the ordered prefix table. None means "unknown",
/// not an error.
pub fn lookup_carrier_by_prefix(nsn: &str, iso: &str) -> Option<CarrierGuess> {
    PREFIX_RULES
        .iter()
        .find(|r| {
            r.iso.eq_ignore_ascii_case(iso) && nsn.len() == r.nsn_len && nsn.starts_with(r.prefix)
        })
        .map(|r| CarrierGuess {
            carrier: r.carrier.to_string(),
            region: r.region.to_string(),
            matched_prefix: r.prefix.to_string(),
            heuristic: true,
        })
}

/// Structural business-likelihood score in [0, 1]. Deterministic, side
/// effect free. Round tails, long repeats and sequential runs all point at
/// block allocations typically sold to businesses.
pub fn estimate_business_likelihood(nsn: &str) -> f64 {
    if nsn.is_empty() {
        return 0.0;
    }
    let mut score: f64 = 0.0;

    if nsn.starts_with("1800") || nsn.starts_with("800") {
        score += 0.5;
    }

    let trailing_zeros = nsn.chars().rev().take_while(|c| *c == '0').count();
    if trailing_zeros >= 3 {
        score += 0.25;
    } else if trailing_zeros == 2 {
        score += 0.1;
    }

    let density = repeated_digit_density(nsn);
    if density >= 0.5 {
        score += 0.2;
    }

    if longest_sequential_run(nsn) >= 4 {
        score += 0.15;
    }

    score.min(1.0)
}

/// Expected social-platform presence from a static country + kind table.
/// A hint only, never ground truth.
pub fn estimate_social_presence_likelihood(iso: &str, kind: NumberKind) -> PresenceLikelihood {
    match kind {
        // Messaging-first markets: an active mobile number almost always has
        // a WhatsApp/Telegram footprint.
        NumberKind::Mobile if matches!(iso, "IN" | "BR") => PresenceLikelihood::VeryHigh,
        NumberKind::Mobile => PresenceLikelihood::High,
        NumberKind::FixedLineOrUnknown => PresenceLikelihood::Low,
        NumberKind::TollFree | NumberKind::Premium => PresenceLikelihood::Low,
        NumberKind::ShortCode => PresenceLikelihood::Low,
    }
}

/// Classify the number kind from country-profile series.
pub fn classify_number_kind(profile: Option<&CountryProfile>, nsn: &str) -> NumberKind {
    let Some(profile) = profile else {
        return NumberKind::FixedLineOrUnknown;
    };
    if nsn.len() < profile.min_nsn {
        return NumberKind::ShortCode;
    }
    if nsn.starts_with("1800") || nsn.starts_with("800") {
        return NumberKind::TollFree;
    }
    if nsn.starts_with("900") || nsn.starts_with("1900") {
        return NumberKind::Premium;
    }
    if profile
        .mobile_prefixes
        .iter()
        .any(|p| nsn.starts_with(p))
    {
        return NumberKind::Mobile;
    }
    NumberKind::FixedLineOrUnknown
}

/// Detect membership in an apparent bulk allocation block.
pub fn detect_bulk_block(nsn: &str) -> Option<BulkBlock> {
    if nsn.len() < 6 {
        return None;
    }

    let tail_repeat = nsn
        .chars()
        .rev()
        .take_while(|c| Some(*c) == nsn.chars().last())
        .count();
    if tail_repeat >= 3 {
        let cut = nsn.len() - 3;
        return Some(BulkBlock {
            block_start: format!("{}000", &nsn[..cut]),
            block_end: format!("{}999", &nsn[..cut]),
            block_size: 1000,
            confidence: (0.5 + 0.1 * (tail_repeat as f64 - 3.0)).min(0.9),
            indicator: "repeated-digit tail",
            heuristic: true,
        });
    }

    let run = longest_sequential_run(&nsn[nsn.len() - 4..]);
    if run >= 4 {
        let cut = nsn.len() - 2;
        return Some(BulkBlock {
            block_start: format!("{}00", &nsn[..cut]),
            block_end: format!("{}99", &nsn[..cut]),
            block_size: 100,
            confidence: 0.4,
            indicator: "sequential tail",
            heuristic: true,
        });
    }

    None
}

/// Spam digit patterns present in the NSN, if any.
pub fn spam_pattern_hits(nsn: &str) -> Vec<&'static str> {
    SPAM_PATTERNS
        .iter()
        .copied()
        .filter(|p| nsn.contains(p))
        .collect()
}

/// Share of the string occupied by its most frequent digit.
pub fn repeated_digit_density(nsn: &str) -> f64 {
    if nsn.is_empty() {
        return 0.0;
    }
    let mut counts = [0usize; 10];
    let mut digits = 0usize;
    for c in nsn.chars() {
        if let Some(d) = c.to_digit(10) {
            counts[d as usize] += 1;
            digits += 1;
        }
    }
    if digits == 0 {
        return 0.0;
    }
    let max = counts.iter().copied().max().unwrap_or(0);
    max as f64 / digits as f64
}

/// Longest run of consecutive ascending or descending digits.
pub fn longest_sequential_run(nsn: &str) -> usize {
    let digits: Vec<i32> = nsn.chars().filter_map(|c| c.to_digit(10)).map(|d| d as i32).collect();
    if digits.len() < 2 {
        return digits.len();
    }
    let mut best = 1usize;
    let mut asc = 1usize;
    let mut desc = 1usize;
    for w in digits.windows(2) {
        if w[1] == w[0] + 1 {
            asc += 1;
            desc = 1;
        } else if w[1] == w[0] - 1 {
            desc += 1;
            asc = 1;
        } else {
            asc = 1;
            desc = 1;
        }
        best = best.max(asc).max(desc);
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::countries::profile_for;

    #[test]
    fn prefix_lookup_first_match_wins() {
        let g = lookup_carrier_by_prefix("9876543210", "IN").unwrap();
        assert_eq!(g.carrier, "Vodafone Idea");
        assert!(g.heuristic);

        let g = lookup_carrier_by_prefix("9440012345", "IN").unwrap();
        assert_eq!(g.carrier, "BSNL");

        let g = lookup_carrier_by_prefix("7012345678", "IN").unwrap();
        assert_eq!(g.carrier, "Airtel");

        let g = lookup_carrier_by_prefix("6212345678", "IN").unwrap();
        assert_eq!(g.carrier, "Reliance Jio");
    }

    #[test]
    fn prefix_lookup_unknown_is_none() {
        // Length mismatch
        assert!(lookup_carrier_by_prefix("98765", "IN").is_none());
        // No rules for this country
        assert!(lookup_carrier_by_prefix("5551234567", "US").is_none());
        // No rule for landline-style series
        assert!(lookup_carrier_by_prefix("1123456789", "IN").is_none());
    }

    #[test]
    fn business_likelihood_bounds_and_cues() {
        for nsn in ["9876543210", "18001234000", "9999999999", ""] {
            let s = estimate_business_likelihood(nsn);
            assert!((0.0..=1.0).contains(&s), "score {s} out of range for {nsn}");
        }
        assert!(
            estimate_business_likelihood("18002220000")
                > estimate_business_likelihood("9812457306")
        );
        // Deterministic
        assert_eq!(
            estimate_business_likelihood("9876500000"),
            estimate_business_likelihood("9876500000")
        );
    }

    #[test]
    fn number_kind_classification() {
        let india = profile_for("IN");
        assert_eq!(classify_number_kind(india, "9876543210"), NumberKind::Mobile);
        assert_eq!(classify_number_kind(india, "123"), NumberKind::ShortCode);
        assert_eq!(
            classify_number_kind(india, "1800123456"),
            NumberKind::TollFree
        );
        assert_eq!(classify_number_kind(None, "9876543210"), NumberKind::FixedLineOrUnknown);
    }

    #[test]
    fn social_presence_table() {
        assert_eq!(
            estimate_social_presence_likelihood("IN", NumberKind::Mobile),
            PresenceLikelihood::VeryHigh
        );
        assert_eq!(
            estimate_social_presence_likelihood("DE", NumberKind::Mobile),
            PresenceLikelihood::High
        );
        assert_eq!(
            estimate_social_presence_likelihood("IN", NumberKind::TollFree),
            PresenceLikelihood::Low
        );
    }

    #[test]
    fn bulk_block_detection() {
        let b = detect_bulk_block("9876540000").unwrap();
        assert_eq!(b.block_size, 1000);
        assert_eq!(b.block_start, "9876540000");
        assert_eq!(b.block_end, "9876540999");
        assert!(b.heuristic);

        let b = detect_bulk_block("9876541234").unwrap();
        assert_eq!(b.indicator, "sequential tail");

        assert!(detect_bulk_block("9817365204").is_none());
    }

    #[test]
    fn spam_patterns() {
        assert_eq!(spam_pattern_hits("9999990123"), vec!["999999"]);
        assert!(spam_pattern_hits("9876543210").is_empty());
    }

    #[test]
    fn digit_statistics() {
        assert!((repeated_digit_density("9999999999") - 1.0).abs() < f64::EPSILON);
        assert!(repeated_digit_density("9876543210") <= 0.2);
        assert_eq!(longest_sequential_run("9876543210"), 10);
        assert_eq!(longest_sequential_run("9182736450"), 2);
    }
}
