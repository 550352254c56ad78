//! Fast-path intent matching.
//!
//! Some queries have deterministic answers that do not need a multi-second
//! model round trip.  Time and date questions are pattern-matched against
//! the transcription and answered instantly from the client's timezone (or
//! a resolved city); anything else returns `None` and falls through to the
//! language model.

use chrono::{DateTime, Local, TimeZone, Utc};
use regex::Regex;
use tracing::{debug, info};

use sotto_tools::TimezoneIndex;

// ---------------------------------------------------------------------------
// FastPath
// ---------------------------------------------------------------------------

/// Deterministic short-circuit for time/date queries.  All patterns
/// compile at construction, once per process.
pub struct FastPath {
    time_patterns: Vec<Regex>,
    date_patterns: Vec<Regex>,
    trailing_now: Regex,
    timezones: TimezoneIndex,
}

impl FastPath {
    /// Build the matcher and its timezone lookup table.
    pub fn new() -> Self {
        let time_patterns = [
            // "what's the time [in X]?" / "what is the current time [in X]"
            r"(?i)^what(?:'s| is) the (?:current )?time(?:\s+(?:right now|now|currently))?(?:\s+in\s+(.+?))?[?.!]?\s*$",
            // "what time is it [right now] [in X]?"
            r"(?i)^what time is it(?:\s+(?:right now|now|currently))?(?:\s+in\s+(.+?))?[?.!]?\s*$",
            // "what time is it in Austin, Texas now?"
            r"(?i)^what time is it\s+in\s+(.+?)(?:\s+(?:right now|now|currently))?[?.!]?\s*$",
            // "tell me the time [in X]"
            r"(?i)^(?:tell me|give me|get me) the (?:current )?time(?:\s+in\s+(.+?))?[?.!]?\s*$",
        ];
        let date_patterns = [
            r"(?i)^what(?:'s| is) (?:today(?:'s date)?|the date)[?.!]?\s*$",
            r"(?i)^what day is it(?: today)?[?.!]?\s*$",
            r"(?i)^what(?:'s| is) today(?:'s date)?[?.!]?\s*$",
        ];

        Self {
            time_patterns: time_patterns
                .iter()
                .map(|p| Regex::new(p).expect("static pattern"))
                .collect(),
            date_patterns: date_patterns
                .iter()
                .map(|p| Regex::new(p).expect("static pattern"))
                .collect(),
            trailing_now: Regex::new(r"(?i)\s+(?:right now|now|currently)\s*$")
                .expect("static pattern"),
            timezones: TimezoneIndex::new(),
        }
    }

    /// Try to answer without the model.  Returns `None` when no fast path
    /// matched (including time queries naming a place we cannot resolve --
    /// the model handles those).
    pub fn try_answer(&self, text: &str, client_tz: Option<&str>) -> Option<String> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        for pattern in &self.time_patterns {
            let Some(caps) = pattern.captures(text) else {
                continue;
            };
            let location = caps
                .get(1)
                .map(|m| self.clean_location(m.as_str()))
                .unwrap_or_default();

            if location.is_empty() {
                let reply = self.spoken_now_time(client_tz, "");
                info!(reply = %reply, "fast path answered local time");
                return Some(reply);
            }

            // Try the full string ("Mexico City"), then just the part
            // before a comma ("Austin, Texas" -> "Austin").
            let tz = self.timezones.resolve(&location).or_else(|| {
                let city = location.split(',').next().unwrap_or(&location).trim();
                self.timezones.resolve(city)
            });

            return match tz {
                Some(tz) => {
                    let now = Utc::now().with_timezone(&tz);
                    let reply = spoken_time_in(now, &location);
                    info!(location = %location, reply = %reply, "fast path answered time");
                    Some(reply)
                }
                None => {
                    // Unknown city: let the model handle it.
                    debug!(location = %location, "fast path: unknown location, falling through");
                    None
                }
            };
        }

        for pattern in &self.date_patterns {
            if pattern.is_match(text) {
                let reply = self.spoken_today(client_tz);
                info!(reply = %reply, "fast path answered date");
                return Some(reply);
            }
        }

        None
    }

    /// The zone to render "now" in: the client's IANA zone when supplied
    /// and parseable, else a best-effort name for the server's own zone.
    /// `None` means no name could be found; callers render with the OS
    /// local offset instead.
    fn client_zone(&self, client_tz: Option<&str>) -> Option<chrono_tz::Tz> {
        client_tz
            .and_then(|name| name.parse::<chrono_tz::Tz>().ok())
            .or_else(local_zone_guess)
    }

    /// Spoken time response for "now" in the client's (or the server's
    /// own) zone.
    fn spoken_now_time(&self, client_tz: Option<&str>, location: &str) -> String {
        match self.client_zone(client_tz) {
            Some(tz) => spoken_time_in(Utc::now().with_timezone(&tz), location),
            None => spoken_time_in(Local::now(), location),
        }
    }

    /// Spoken date response for "today" in the client's (or the server's
    /// own) zone.
    fn spoken_today(&self, client_tz: Option<&str>) -> String {
        let day = match self.client_zone(client_tz) {
            Some(tz) => Utc::now().with_timezone(&tz).format("%A, %B %-d, %Y").to_string(),
            None => Local::now().format("%A, %B %-d, %Y").to_string(),
        };
        format!("Today is {day}.")
    }

    /// Strip trailing filler from a captured location.
    fn clean_location(&self, raw: &str) -> String {
        let loc = raw.trim().trim_end_matches(['?', '.', '!']);
        self.trailing_now.replace(loc, "").trim().to_owned()
    }
}

impl Default for FastPath {
    fn default() -> Self {
        Self::new()
    }
}

/// Best-effort IANA name for the server's own zone, so spoken replies can
/// carry an abbreviation.  The wall clock agrees with [`Local`] either way,
/// since every source here feeds the same OS zone configuration; `None`
/// just means the reply renders with the plain local offset.
fn local_zone_guess() -> Option<chrono_tz::Tz> {
    if let Ok(name) = std::env::var("TZ") {
        if let Ok(tz) = name.trim_start_matches(':').parse() {
            return Some(tz);
        }
    }
    // Debian-style systems carry the IANA name directly.
    if let Ok(name) = std::fs::read_to_string("/etc/timezone") {
        if let Ok(tz) = name.trim().parse() {
            return Some(tz);
        }
    }
    // Elsewhere /etc/localtime is usually a symlink into the zoneinfo tree.
    if let Ok(target) = std::fs::read_link("/etc/localtime") {
        let path = target.to_string_lossy();
        if let Some(idx) = path.find("zoneinfo/") {
            if let Ok(tz) = path[idx + "zoneinfo/".len()..].parse() {
                return Some(tz);
            }
        }
    }
    None
}

/// Format a natural spoken time response.
fn spoken_time_in<Tz: TimeZone>(now: DateTime<Tz>, location: &str) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let time = now.format("%-I:%M %p");
    let tz = now.format("%Z");
    let day = now.format("%A, %B %-d, %Y");

    if location.is_empty() {
        format!("It's {time} {tz} — {day}.")
    } else {
        format!("It's {time} {tz} in {location} — {day}.")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_query_with_known_city() {
        let fp = FastPath::new();
        let reply = fp
            .try_answer("what time is it in Tokyo?", Some("America/Chicago"))
            .unwrap();
        assert!(reply.starts_with("It's "));
        assert!(reply.contains("Tokyo"));
        // Tokyo renders as the JST abbreviation (or +09 on older tzdata).
        assert!(reply.contains("JST") || reply.contains("+09"), "{reply}");
    }

    #[test]
    fn time_query_with_state_suffix_resolves_city() {
        let fp = FastPath::new();
        let reply = fp
            .try_answer("what time is it in Austin, Texas now?", None)
            .unwrap();
        assert!(reply.contains("Austin, Texas"));
        assert!(reply.contains("CDT") || reply.contains("CST") || reply.contains("-05") || reply.contains("-06"));
    }

    #[test]
    fn time_query_without_location_uses_client_timezone() {
        let fp = FastPath::new();
        let reply = fp
            .try_answer("what time is it?", Some("Asia/Tokyo"))
            .unwrap();
        assert!(reply.starts_with("It's "));
        assert!(!reply.contains(" in "));
        assert!(reply.contains("JST") || reply.contains("+09"), "{reply}");
    }

    #[test]
    fn unknown_city_falls_through_to_the_model() {
        let fp = FastPath::new();
        assert_eq!(fp.try_answer("what time is it in Atlantis?", None), None);
    }

    #[test]
    fn date_queries_are_answered() {
        let fp = FastPath::new();
        let reply = fp.try_answer("what day is it today?", Some("Asia/Tokyo")).unwrap();
        assert!(reply.starts_with("Today is "));

        let reply = fp.try_answer("what's today's date", None).unwrap();
        assert!(reply.starts_with("Today is "));
    }

    #[test]
    fn non_time_queries_fall_through() {
        let fp = FastPath::new();
        assert_eq!(fp.try_answer("what's the weather in Austin?", None), None);
        assert_eq!(fp.try_answer("hello there", None), None);
        assert_eq!(fp.try_answer("", None), None);
    }

    #[test]
    fn phrasing_variants_match() {
        let fp = FastPath::new();
        assert!(fp.try_answer("what's the time in paris", None).is_some());
        assert!(fp.try_answer("tell me the time", Some("Europe/Paris")).is_some());
        assert!(fp.try_answer("what time is it right now", Some("Europe/Paris")).is_some());
    }

    #[test]
    fn invalid_client_timezone_falls_back_to_os_local_clock() {
        let fp = FastPath::new();

        let before = Local::now().format("%-I:%M %p").to_string();
        let reply = fp.try_answer("what time is it", Some("Not/AZone")).unwrap();
        let after = Local::now().format("%-I:%M %p").to_string();

        assert!(reply.starts_with("It's "), "{reply}");
        // The clock shown is the machine's own, never a UTC default.  The
        // minute can roll over mid-test, so accept either snapshot.
        assert!(
            reply.contains(&before) || reply.contains(&after),
            "reply {reply:?} does not show the local time {before:?}"
        );
    }

    #[test]
    fn missing_client_timezone_uses_os_local_clock() {
        let fp = FastPath::new();

        let before = Local::now().format("%-I:%M %p").to_string();
        let reply = fp.try_answer("what time is it", None).unwrap();
        let after = Local::now().format("%-I:%M %p").to_string();

        assert!(
            reply.contains(&before) || reply.contains(&after),
            "reply {reply:?} does not show the local time {before:?}"
        );
    }
}
