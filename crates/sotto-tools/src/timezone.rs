//! IANA timezone resolution from spoken place names.
//!
//! The index maps every IANA zone's leaf name ("America/New_York" ->
//! "new york") to its zone, then overlays manual aliases for US states,
//! countries, and common abbreviations that are not zone leaves.  Built
//! once at startup; lookups are a single map probe.

use std::collections::HashMap;

use chrono_tz::{TZ_VARIANTS, Tz};

/// Manual aliases: spoken names that are not IANA zone leaves.
const ALIASES: &[(&str, &str)] = &[
    // US states (mapped to a representative zone).
    ("alabama", "America/Chicago"),
    ("alaska", "America/Anchorage"),
    ("arizona", "America/Phoenix"),
    ("california", "America/Los_Angeles"),
    ("colorado", "America/Denver"),
    ("florida", "America/New_York"),
    ("georgia", "America/New_York"),
    ("hawaii", "Pacific/Honolulu"),
    ("illinois", "America/Chicago"),
    ("massachusetts", "America/New_York"),
    ("michigan", "America/Detroit"),
    ("minnesota", "America/Chicago"),
    ("missouri", "America/Chicago"),
    ("nevada", "America/Los_Angeles"),
    ("new jersey", "America/New_York"),
    ("ohio", "America/New_York"),
    ("oregon", "America/Los_Angeles"),
    ("pennsylvania", "America/New_York"),
    ("texas", "America/Chicago"),
    ("utah", "America/Denver"),
    ("virginia", "America/New_York"),
    ("washington state", "America/Los_Angeles"),
    ("washington dc", "America/New_York"),
    // Countries whose zones are named after a city.
    ("japan", "Asia/Tokyo"),
    ("china", "Asia/Shanghai"),
    ("india", "Asia/Kolkata"),
    ("south korea", "Asia/Seoul"),
    ("korea", "Asia/Seoul"),
    ("uk", "Europe/London"),
    ("england", "Europe/London"),
    ("united kingdom", "Europe/London"),
    ("france", "Europe/Paris"),
    ("germany", "Europe/Berlin"),
    ("italy", "Europe/Rome"),
    ("spain", "Europe/Madrid"),
    ("netherlands", "Europe/Amsterdam"),
    ("russia", "Europe/Moscow"),
    ("brazil", "America/Sao_Paulo"),
    ("mexico", "America/Mexico_City"),
    ("canada", "America/Toronto"),
    ("australia", "Australia/Sydney"),
    ("new zealand", "Pacific/Auckland"),
    ("egypt", "Africa/Cairo"),
    ("israel", "Asia/Jerusalem"),
    ("uae", "Asia/Dubai"),
    ("thailand", "Asia/Bangkok"),
    ("vietnam", "Asia/Ho_Chi_Minh"),
    ("philippines", "Asia/Manila"),
    ("indonesia", "Asia/Jakarta"),
    ("argentina", "America/Argentina/Buenos_Aires"),
    // Common city abbreviations and nicknames.
    ("nyc", "America/New_York"),
    ("new york city", "America/New_York"),
    ("la", "America/Los_Angeles"),
    ("sf", "America/Los_Angeles"),
    ("san francisco", "America/Los_Angeles"),
    ("dc", "America/New_York"),
    ("vegas", "America/Los_Angeles"),
    ("las vegas", "America/Los_Angeles"),
    ("philly", "America/New_York"),
    ("philadelphia", "America/New_York"),
    ("atlanta", "America/New_York"),
    ("boston", "America/New_York"),
    ("miami", "America/New_York"),
    ("seattle", "America/Los_Angeles"),
    ("san diego", "America/Los_Angeles"),
    ("austin", "America/Chicago"),
    ("dallas", "America/Chicago"),
    ("houston", "America/Chicago"),
    ("san antonio", "America/Chicago"),
    ("minneapolis", "America/Chicago"),
    ("orlando", "America/New_York"),
    ("portland", "America/Los_Angeles"),
    ("mumbai", "Asia/Kolkata"),
    ("delhi", "Asia/Kolkata"),
    ("new delhi", "Asia/Kolkata"),
    ("bangalore", "Asia/Kolkata"),
    ("beijing", "Asia/Shanghai"),
    ("osaka", "Asia/Tokyo"),
    ("kyoto", "Asia/Tokyo"),
    ("munich", "Europe/Berlin"),
    ("frankfurt", "Europe/Berlin"),
    ("barcelona", "Europe/Madrid"),
    ("milan", "Europe/Rome"),
    ("geneva", "Europe/Zurich"),
    ("sydney australia", "Australia/Sydney"),
    ("melbourne australia", "Australia/Melbourne"),
];

// ---------------------------------------------------------------------------
// Index
// ---------------------------------------------------------------------------

/// Prebuilt place-name to timezone lookup table.
pub struct TimezoneIndex {
    map: HashMap<String, Tz>,
}

impl TimezoneIndex {
    /// Build the index: IANA leaf names first, manual aliases layered on
    /// top (aliases win on collision).
    pub fn new() -> Self {
        let mut map: HashMap<String, Tz> = HashMap::with_capacity(TZ_VARIANTS.len() + ALIASES.len());

        for tz in TZ_VARIANTS {
            let leaf = tz.name().rsplit('/').next().unwrap_or(tz.name());
            let key = leaf.replace('_', " ").to_lowercase();
            // First writer wins among zones; keeps e.g. America/* ahead of
            // the deprecated duplicates later in the list.
            map.entry(key).or_insert(tz);
        }

        for (alias, zone) in ALIASES {
            if let Ok(tz) = zone.parse::<Tz>() {
                map.insert((*alias).to_owned(), tz);
            }
        }

        Self { map }
    }

    /// Resolve a spoken place name to a timezone.
    ///
    /// Returns `None` for unknown places; callers typically retry with just
    /// the part before a comma ("Austin, Texas" -> "Austin").
    pub fn resolve(&self, name: &str) -> Option<Tz> {
        let key = name
            .trim()
            .trim_end_matches(['?', '.', '!', ','])
            .to_lowercase();
        if key.is_empty() {
            return None;
        }
        self.map.get(&key).copied()
    }
}

impl Default for TimezoneIndex {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_iana_leaf_names() {
        let index = TimezoneIndex::new();
        assert_eq!(index.resolve("Tokyo"), Some(chrono_tz::Asia::Tokyo));
        assert_eq!(index.resolve("new york"), Some(chrono_tz::America::New_York));
        assert_eq!(index.resolve("London"), Some(chrono_tz::Europe::London));
        assert_eq!(index.resolve("chicago"), Some(chrono_tz::America::Chicago));
    }

    #[test]
    fn resolves_manual_aliases() {
        let index = TimezoneIndex::new();
        assert_eq!(index.resolve("texas"), Some(chrono_tz::America::Chicago));
        assert_eq!(index.resolve("japan"), Some(chrono_tz::Asia::Tokyo));
        assert_eq!(index.resolve("nyc"), Some(chrono_tz::America::New_York));
        assert_eq!(index.resolve("sf"), Some(chrono_tz::America::Los_Angeles));
    }

    #[test]
    fn resolve_is_case_and_punctuation_insensitive() {
        let index = TimezoneIndex::new();
        assert_eq!(index.resolve("TOKYO?"), Some(chrono_tz::Asia::Tokyo));
        assert_eq!(index.resolve("  paris.  "), Some(chrono_tz::Europe::Paris));
    }

    #[test]
    fn unknown_places_return_none() {
        let index = TimezoneIndex::new();
        assert_eq!(index.resolve("atlantis"), None);
        assert_eq!(index.resolve(""), None);
    }
}
