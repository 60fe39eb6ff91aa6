//! Static per-country configuration.
//!
//! Profiles carry the calling code, example input formats, guidance text and
//! structural hints (national-significant-number length bounds, mobile prefix
//! series) for the countries the tool supports. The table is process-wide
//! read-only data: safe for concurrent reads, loaded once.
//!
//! The guidance strings are surfaced verbatim when formatting fails so the
//! caller can show the user what a well-formed number looks like for the
//! selected country.

use std::str::FromStr;

use phonenumber::country::Id;

use crate::errors::{PhoneIntelError, Result};

/// One supported country.
#[derive(Debug, Clone)]
pub struct CountryProfile {
    pub name: &'static str,
    pub iso: &'static str,
    /// ITU calling code, without the leading '+'.
    pub calling_code: u16,
    /// Example inputs accepted for this country.
    pub examples: &'static [&'static str],
    pub placeholder: &'static str,
    pub guidance: &'static str,
    pub tips: &'static [&'static str],
    /// National significant number length bounds (inclusive). Anything
    /// shorter than `min_nsn` is rejected as invalid rather than possible.
    pub min_nsn: usize,
    pub max_nsn: usize,
    /// Leading digit series of mobile allocations (matched against the NSN).
    pub mobile_prefixes: &'static [&'static str],
}

/// Supported countries, in auto-detection priority order.
///
/// India leads: it is the original tool's default investigation context and
/// the only country with carrier-prefix heuristics.
pub static PROFILES: &[CountryProfile] = &[
    CountryProfile {
        name: "India",
        iso: "IN",
        calling_code: 91,
        examples: &[
            "9876543210",
            "+91 9876543210",
            "09876543210",
            "91 9876543210",
            "(+91) 98765-43210",
        ],
        placeholder: "e.g., 9876543210",
        guidance: "Format: +91 9876543210",
        tips: &[
            "Mobile numbers start with 6, 7, 8, or 9",
            "Total 10 digits after country code",
            "Can include or exclude +91 prefix",
        ],
        min_nsn: 10,
        max_nsn: 10,
        mobile_prefixes: &["6", "7", "8", "9"],
    },
    CountryProfile {
        name: "United States",
        iso: "US",
        calling_code: 1,
        examples: &[
            "(555) 123-4567",
            "+1 555 123 4567",
            "5551234567",
            "1-555-123-4567",
        ],
        placeholder: "e.g., (555) 123-4567",
        guidance: "Format: +1 (555) 123-4567",
        tips: &[
            "Area code cannot start with 0 or 1",
            "Total 10 digits after country code",
        ],
        min_nsn: 10,
        max_nsn: 10,
        mobile_prefixes: &[],
    },
    CountryProfile {
        name: "United Kingdom",
        iso: "GB",
        calling_code: 44,
        examples: &[
            "07700 900123",
            "+44 7700 900123",
            "447700900123",
            "0044 7700 900123",
        ],
        placeholder: "e.g., 07700 900123",
        guidance: "Format: +44 7700 900123",
        tips: &[
            "Mobile numbers start with 07",
            "Total 11 digits including leading 0",
        ],
        min_nsn: 9,
        max_nsn: 10,
        mobile_prefixes: &["7"],
    },
    CountryProfile {
        name: "Canada",
        iso: "CA",
        calling_code: 1,
        examples: &[
            "(416) 555-0123",
            "+1 416 555 0123",
            "4165550123",
            "1-416-555-0123",
        ],
        placeholder: "e.g., (416) 555-0123",
        guidance: "Format: +1 (416) 555-0123",
        tips: &[
            "Same format as US numbers",
            "Total 10 digits after country code",
        ],
        min_nsn: 10,
        max_nsn: 10,
        mobile_prefixes: &[],
    },
    CountryProfile {
        name: "Australia",
        iso: "AU",
        calling_code: 61,
        examples: &["0412 345 678", "+61 412 345 678", "61412345678"],
        placeholder: "e.g., 0412 345 678",
        guidance: "Format: +61 412 345 678",
        tips: &[
            "Mobile numbers start with 04",
            "Total 10 digits including leading 0",
        ],
        min_nsn: 9,
        max_nsn: 9,
        mobile_prefixes: &["4"],
    },
    CountryProfile {
        name: "Germany",
        iso: "DE",
        calling_code: 49,
        examples: &["0151 12345678", "+49 151 12345678", "4915112345678"],
        placeholder: "e.g., 0151 12345678",
        guidance: "Format: +49 151 12345678",
        tips: &[
            "Mobile numbers start with 015, 016, 017",
            "Variable length (10-12 digits)",
        ],
        min_nsn: 6,
        max_nsn: 11,
        mobile_prefixes: &["15", "16", "17"],
    },
    CountryProfile {
        name: "France",
        iso: "FR",
        calling_code: 33,
        examples: &["06 12 34 56 78", "+33 6 12 34 56 78", "33612345678"],
        placeholder: "e.g., 06 12 34 56 78",
        guidance: "Format: +33 6 12 34 56 78",
        tips: &[
            "Mobile numbers start with 06 or 07",
            "Total 10 digits including leading 0",
        ],
        min_nsn: 9,
        max_nsn: 9,
        mobile_prefixes: &["6", "7"],
    },
    CountryProfile {
        name: "Japan",
        iso: "JP",
        calling_code: 81,
        examples: &["090-1234-5678", "+81 90 1234 5678", "819012345678"],
        placeholder: "e.g., 090-1234-5678",
        guidance: "Format: +81 90 1234 5678",
        tips: &[
            "Mobile numbers start with 070, 080, 090",
            "Total 11 digits including leading 0",
        ],
        min_nsn: 9,
        max_nsn: 10,
        mobile_prefixes: &["70", "80", "90"],
    },
    CountryProfile {
        name: "China",
        iso: "CN",
        calling_code: 86,
        examples: &["138 0013 8000", "+86 138 0013 8000", "8613800138000"],
        placeholder: "e.g., 138 0013 8000",
        guidance: "Format: +86 138 0013 8000",
        tips: &[
            "Mobile numbers start with 13, 14, 15, 17, 18, 19",
            "Total 11 digits",
        ],
        min_nsn: 10,
        max_nsn: 11,
        mobile_prefixes: &["13", "14", "15", "17", "18", "19"],
    },
    CountryProfile {
        name: "Brazil",
        iso: "BR",
        calling_code: 55,
        examples: &["(11) 91234-5678", "+55 11 91234 5678", "5511912345678"],
        placeholder: "e.g., (11) 91234-5678",
        guidance: "Format: +55 11 91234 5678",
        tips: &[
            "Mobile numbers have 9 digits after the 2-digit area code",
            "Mobile numbers start with 9",
        ],
        min_nsn: 10,
        max_nsn: 11,
        mobile_prefixes: &[],
    },
];

/// Look up a profile by ISO code (case-insensitive).
pub fn profile_for(iso: &str) -> Option<&'static CountryProfile> {
    PROFILES.iter().find(|p| p.iso.eq_ignore_ascii_case(iso))
}

/// Supported ISO codes in table order.
pub fn supported_codes() -> Vec<String> {
    PROFILES.iter().map(|p| p.iso.to_string()).collect()
}

/// Country selection supplied with the raw input: either a fixed ISO code or
/// the auto-detect sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountryHint {
    Auto,
    Country(&'static CountryProfile),
}

impl CountryHint {
    /// Parse a user-supplied hint ("auto", "IN", "in", ...).
    pub fn parse(hint: &str) -> Result<Self> {
        let trimmed = hint.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("auto") {
            return Ok(CountryHint::Auto);
        }
        profile_for(trimmed)
            .map(CountryHint::Country)
            .ok_or_else(|| PhoneIntelError::unsupported_country(trimmed, supported_codes()))
    }

    /// The fixed profile, if any.
    pub fn profile(&self) -> Option<&'static CountryProfile> {
        match self {
            CountryHint::Auto => None,
            CountryHint::Country(p) => Some(p),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CountryHint::Auto => "auto",
            CountryHint::Country(p) => p.iso,
        }
    }
}

impl PartialEq for CountryProfile {
    fn eq(&self, other: &Self) -> bool {
        self.iso == other.iso
    }
}
impl Eq for CountryProfile {}

impl CountryProfile {
    /// The `phonenumber` region identifier for this profile.
    pub fn region_id(&self) -> Option<Id> {
        Id::from_str(self.iso).ok()
    }

    /// Human guidance block shown when parsing fails: expected format plus
    /// example inputs.
    pub fn guidance_text(&self) -> String {
        let mut out = String::new();
        out.push_str(self.guidance);
        out.push_str("\nExamples: ");
        out.push_str(&self.examples.join(", "));
        for tip in self.tips {
            out.push_str("\n  - ");
            out.push_str(tip);
        }
        out
    }
}
