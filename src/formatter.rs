//! Phone number normalization and formatting.
//!
//! Wraps the `phonenumber` crate (the libphonenumber port; its region
//! inference and valid-length tables are treated as ground truth). Raw user
//! input arrives with arbitrary punctuation and an optional country hint, so
//! parsing is attempted over an ordered list of normalization candidates:
//!
//!   1. the input as-is
//!   2. digits only (separators and whitespace stripped)
//!   3. digits only with a single leading zero removed
//!   4. digits prefixed with the hinted country's calling code
//!   5. the input with a '+' inserted before a detected calling code
//!
//! The first candidate the library reports valid wins. If nothing validates,
//! the best possible-but-not-valid candidate is retained. A structured
//! `FormatFailure` listing every attempt and its rejection reason is returned
//! only when no candidate is even possible. Non-empty input never panics.

use once_cell::sync::Lazy;
use phonenumber::{Mode, PhoneNumber};
use regex::Regex;

use crate::countries::{self, CountryHint, CountryProfile};
use crate::errors::{PhoneIntelError, Result};

/// Which normalization produced the winning candidate. Reported for
/// diagnostics and asserted on in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationRule {
    AsIs,
    DigitsOnly,
    StripLeadingZero,
    PrependCallingCode,
    InsertPlus,
}

impl NormalizationRule {
    pub fn describe(&self) -> &'static str {
        match self {
            NormalizationRule::AsIs => "input as-is",
            NormalizationRule::DigitsOnly => "digits only",
            NormalizationRule::StripLeadingZero => "leading zero stripped",
            NormalizationRule::PrependCallingCode => "calling code prepended",
            NormalizationRule::InsertPlus => "'+' inserted before calling code",
        }
    }
}

/// Outcome of one candidate parse.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseOutcome {
    Valid,
    Possible,
    Invalid { reason: String },
}

/// One normalization variant and what the parser said about it.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ParseAttempt {
    pub candidate: String,
    pub rule: NormalizationRule,
    /// Region the candidate was parsed against; None for region-free parsing
    /// of '+'-prefixed candidates.
    pub region: Option<&'static str>,
    pub outcome: ParseOutcome,
}

/// All formatted representations of the winning candidate. Immutable once
/// produced; every field is derived from the same parsed number.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FormattedNumber {
    pub e164: String,
    pub international: String,
    pub national: String,
    pub rfc3966: String,
    /// ISO region reported by the parser, e.g. "IN".
    pub iso: String,
    pub calling_code: u16,
    /// Digits of the number excluding the country calling code.
    pub national_significant: String,
    pub is_valid: bool,
    pub is_possible: bool,
    pub matched_rule: NormalizationRule,
}

/// Successful formatting: the winning number plus the full attempt trail.
#[derive(Debug, Clone)]
pub struct FormatSuccess {
    pub number: FormattedNumber,
    pub attempts: Vec<ParseAttempt>,
}

/// No candidate was even possible. Recoverable: carries guidance for the
/// selected country so the caller can show example formats.
#[derive(Debug, Clone)]
pub struct FormatFailure {
    pub input: String,
    pub attempts: Vec<ParseAttempt>,
    pub guidance: String,
}

/// Result of a formatting run over all candidates.
#[derive(Debug, Clone)]
pub enum FormatOutcome {
    Success(FormatSuccess),
    Failure(FormatFailure),
}

impl FormatOutcome {
    pub fn success(&self) -> Option<&FormatSuccess> {
        match self {
            FormatOutcome::Success(s) => Some(s),
            FormatOutcome::Failure(_) => None,
        }
    }

    pub fn attempts(&self) -> &[ParseAttempt] {
        match self {
            FormatOutcome::Success(s) => &s.attempts,
            FormatOutcome::Failure(f) => &f.attempts,
        }
    }
}

/// Normalize raw input and parse it, trying candidates in fixed priority
/// order. Hard error only on empty input.
pub fn format(raw_input: &str, hint: &CountryHint) -> Result<FormatOutcome> {
    let trimmed = raw_input.trim();
    if trimmed.is_empty() {
        return Err(PhoneIntelError::EmptyInput);
    }

    let candidates = build_candidates(trimmed, hint);

    let mut attempts: Vec<ParseAttempt> = Vec::new();
    let mut best_valid: Option<(PhoneNumber, NormalizationRule)> = None;
    let mut best_possible: Option<(PhoneNumber, NormalizationRule)> = None;

    'candidates: for (candidate, rule) in candidates {
        for profile in regions_for(&candidate, hint) {
            let (outcome, parsed) = evaluate(&candidate, profile);
            attempts.push(ParseAttempt {
                candidate: candidate.clone(),
                rule,
                region: profile.map(|p| p.iso),
                outcome: outcome.clone(),
            });
            match outcome {
                ParseOutcome::Valid => {
                    best_valid = parsed.map(|p| (p, rule));
                    break 'candidates;
                }
                ParseOutcome::Possible => {
                    if best_possible.is_none() {
                        best_possible = parsed.map(|p| (p, rule));
                    }
                }
                ParseOutcome::Invalid { .. } => {}
            }
        }
    }

    let winner = best_valid.or(best_possible);
    match winner {
        Some((parsed, rule)) => {
            let number = render(&parsed, rule);
            Ok(FormatOutcome::Success(FormatSuccess { number, attempts }))
        }
        None => {
            let guidance = match hint.profile() {
                Some(p) => p.guidance_text(),
                None => format!(
                    "No candidate parsed for any supported country ({})",
                    countries::supported_codes().join(", ")
                ),
            };
            Ok(FormatOutcome::Failure(FormatFailure {
                input: trimmed.to_string(),
                attempts,
                guidance,
            }))
        }
    }
}

/// Candidate list in fixed priority order, deduplicated.
fn build_candidates(trimmed: &str, hint: &CountryHint) -> Vec<(String, NormalizationRule)> {
    let cleaned = clean(trimmed);
    let bare = cleaned.trim_start_matches('+').to_string();

    let mut out: Vec<(String, NormalizationRule)> = Vec::new();
    let push = |candidate: String, rule: NormalizationRule, out: &mut Vec<(String, NormalizationRule)>| {
        if !candidate.is_empty() && !out.iter().any(|(c, _)| c == &candidate) {
            out.push((candidate, rule));
        }
    };

    push(trimmed.to_string(), NormalizationRule::AsIs, &mut out);
    push(cleaned.clone(), NormalizationRule::DigitsOnly, &mut out);

    if !cleaned.starts_with('+')
        && let Some(stripped) = cleaned.strip_prefix('0')
    {
        push(
            stripped.to_string(),
            NormalizationRule::StripLeadingZero,
            &mut out,
        );
    }

    if let Some(profile) = hint.profile()
        && !cleaned.starts_with('+')
    {
        let cc = profile.calling_code.to_string();
        let digits = cleaned.strip_prefix('0').unwrap_or(&cleaned);
        if !digits.starts_with(&cc) {
            push(
                format!("+{cc}{digits}"),
                NormalizationRule::PrependCallingCode,
                &mut out,
            );
        }
    }

    if !cleaned.starts_with('+') && detect_calling_code(&bare, hint).is_some() {
        push(
            format!("+{bare}"),
            NormalizationRule::InsertPlus,
            &mut out,
        );
    }

    out
}

/// Strip separators: drop a "(0)" national-prefix marker, then every
/// character that is not a digit, keeping a single leading '+'.
fn clean(input: &str) -> String {
    static PAREN_ZERO: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(\s*0\s*\)").unwrap());
    let without_marker = PAREN_ZERO.replace_all(input, "");

    let mut cleaned = String::with_capacity(without_marker.len());
    for (i, ch) in without_marker.trim().chars().enumerate() {
        if ch.is_ascii_digit() || (ch == '+' && i == 0) {
            cleaned.push(ch);
        }
    }
    cleaned
}

/// Which profile's calling code prefixes the bare digit string, if any.
/// Requires enough trailing digits to plausibly hold a national number.
fn detect_calling_code(bare: &str, hint: &CountryHint) -> Option<&'static CountryProfile> {
    let profiles: Vec<&'static CountryProfile> = match hint.profile() {
        Some(p) => vec![p],
        None => countries::PROFILES.iter().collect(),
    };
    profiles.into_iter().find(|p| {
        let cc = p.calling_code.to_string();
        bare.starts_with(&cc) && bare.len() >= cc.len() + p.min_nsn
    })
}

/// Regions to parse a candidate against. '+'-prefixed candidates carry their
/// own country and parse region-free; bare candidates use the hint, or each
/// supported country in table order when auto-detecting.
fn regions_for(candidate: &str, hint: &CountryHint) -> Vec<Option<&'static CountryProfile>> {
    if candidate.starts_with('+') {
        return vec![None];
    }
    match hint.profile() {
        Some(p) => vec![Some(p)],
        None => countries::PROFILES.iter().map(Some).collect(),
    }
}

/// Parse one candidate against one region and classify the result.
fn evaluate(
    candidate: &str,
    profile: Option<&'static CountryProfile>,
) -> (ParseOutcome, Option<PhoneNumber>) {
    let region = profile.and_then(|p| p.region_id());
    match phonenumber::parse(region, candidate) {
        Ok(parsed) => {
            let nsn = national_significant(&parsed);
            // Below a country's minimum length is invalid, never merely
            // possible.
            let resolved = resolved_profile(&parsed).or(profile);
            if let Some(p) = resolved
                && nsn.len() < p.min_nsn
            {
                return (
                    ParseOutcome::Invalid {
                        reason: format!(
                            "{} digits is below the {} minimum of {}",
                            nsn.len(),
                            p.iso,
                            p.min_nsn
                        ),
                    },
                    None,
                );
            }
            if phonenumber::is_valid(&parsed) {
                (ParseOutcome::Valid, Some(parsed))
            } else {
                (ParseOutcome::Possible, Some(parsed))
            }
        }
        Err(e) => (
            ParseOutcome::Invalid {
                reason: format!("{e:?}"),
            },
            None,
        ),
    }
}

/// Profile matching the region the parser assigned to the number. The parser
/// reports no region for numbers too mangled to validate, so fall back to
/// matching the calling code (NANP countries share code 1 but also share
/// length bounds, so the fallback stays sound).
fn resolved_profile(parsed: &PhoneNumber) -> Option<&'static CountryProfile> {
    if let Some(id) = parsed.country().id()
        && let Some(profile) = countries::profile_for(&format!("{id:?}"))
    {
        return Some(profile);
    }
    let code = parsed.country().code();
    countries::PROFILES.iter().find(|p| p.calling_code == code)
}

/// National significant number: E.164 digits minus the calling code.
fn national_significant(parsed: &PhoneNumber) -> String {
    let e164 = parsed.format().mode(Mode::E164).to_string();
    let cc = parsed.country().code().to_string();
    e164.trim_start_matches('+')
        .strip_prefix(cc.as_str())
        .unwrap_or_else(|| e164.trim_start_matches('+'))
        .to_string()
}

/// Produce every representation from the winning parse. All four formats
/// encode the same digits and country by construction.
fn render(parsed: &PhoneNumber, rule: NormalizationRule) -> FormattedNumber {
    let iso = parsed
        .country()
        .id()
        .map(|id| format!("{id:?}"))
        .unwrap_or_default();

    FormattedNumber {
        e164: parsed.format().mode(Mode::E164).to_string(),
        international: parsed.format().mode(Mode::International).to_string(),
        national: parsed.format().mode(Mode::National).to_string(),
        rfc3966: parsed.format().mode(Mode::Rfc3966).to_string(),
        iso,
        calling_code: parsed.country().code(),
        national_significant: national_significant(parsed),
        is_valid: phonenumber::is_valid(parsed),
        is_possible: true,
        matched_rule: rule,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hint(iso: &str) -> CountryHint {
        CountryHint::parse(iso).unwrap()
    }

    fn expect_success(raw: &str, h: &CountryHint) -> FormatSuccess {
        match format(raw, h).unwrap() {
            FormatOutcome::Success(s) => s,
            FormatOutcome::Failure(f) => panic!("expected success for {raw:?}, got {f:?}"),
        }
    }

    #[test]
    fn indian_mobile_ten_digits() {
        let s = expect_success("9876543210", &hint("IN"));
        assert!(s.number.is_valid);
        assert_eq!(s.number.e164, "+919876543210");
        assert_eq!(s.number.international, "+91 98765 43210");
        assert_eq!(s.number.iso, "IN");
        assert_eq!(s.number.calling_code, 91);
        assert_eq!(s.number.national_significant, "9876543210");
    }

    #[test]
    fn auto_detect_with_plus_prefix() {
        let s = expect_success("+91 9876543210", &CountryHint::Auto);
        assert!(s.number.is_valid);
        assert_eq!(s.number.e164, "+919876543210");
        assert_eq!(s.number.matched_rule, NormalizationRule::AsIs);
    }

    #[test]
    fn too_short_is_failure_with_attempts() {
        match format("123", &hint("IN")).unwrap() {
            FormatOutcome::Failure(f) => {
                assert!(!f.attempts.is_empty());
                assert!(f
                    .attempts
                    .iter()
                    .all(|a| matches!(a.outcome, ParseOutcome::Invalid { .. })));
                assert!(f.guidance.contains("+91"));
            }
            FormatOutcome::Success(s) => panic!("short input should not format: {s:?}"),
        }
    }

    #[test]
    fn leading_zero_national_form() {
        let s = expect_success("09876543210", &hint("IN"));
        assert!(s.number.is_valid);
        assert_eq!(s.number.e164, "+919876543210");
    }

    #[test]
    fn bare_country_code_digits() {
        let s = expect_success("91 9876543210", &hint("IN"));
        assert!(s.number.is_valid);
        assert_eq!(s.number.e164, "+919876543210");
    }

    #[test]
    fn punctuated_input() {
        let s = expect_success("(+91) 98765-43210", &hint("IN"));
        assert!(s.number.is_valid);
        assert_eq!(s.number.e164, "+919876543210");
    }

    #[test]
    fn uk_mobile_with_leading_zero() {
        let s = expect_success("07700 900123", &hint("GB"));
        assert!(s.number.is_valid);
        assert_eq!(s.number.e164, "+447700900123");
        assert_eq!(s.number.iso, "GB");
    }

    #[test]
    fn non_numeric_junk_fails_cleanly() {
        match format("hello world", &hint("US")).unwrap() {
            FormatOutcome::Failure(f) => assert!(!f.attempts.is_empty()),
            FormatOutcome::Success(s) => panic!("junk should not format: {s:?}"),
        }
    }

    #[test]
    fn empty_input_is_a_hard_error() {
        assert!(matches!(
            format("   ", &CountryHint::Auto),
            Err(PhoneIntelError::EmptyInput)
        ));
    }

    #[test]
    fn round_trip_is_stable() {
        let first = expect_success("9876543210", &hint("IN"));
        let second = expect_success(&first.number.international, &hint("IN"));
        assert_eq!(first.number.e164, second.number.e164);
        assert_eq!(first.number.international, second.number.international);
        assert_eq!(first.number.national, second.number.national);
        assert_eq!(first.number.iso, second.number.iso);
    }

    #[test]
    fn clean_strips_separators_and_marker() {
        assert_eq!(clean("+44 (0) 7700 900123"), "+447700900123");
        assert_eq!(clean("(555) 123-4567"), "5551234567");
        assert_eq!(clean("  98 76 54 32 10 "), "9876543210");
    }
}
