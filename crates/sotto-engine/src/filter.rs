//! Input-quality classifier.
//!
//! Decides whether STT output is worth sending downstream at all.  Several
//! free signals (computed during transcription) are combined: the
//! recognizer's no-speech probability and average token log-probability,
//! audio duration, word count, and a set of known noise transcriptions.
//! Garbage and low-quality inputs are dropped silently; every rejected
//! query saves a useless multi-second model round trip.

use std::collections::HashSet;

use regex::Regex;
use tracing::info;

/// Classification of one transcribed utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputQuality {
    /// Send to the fast path / model.
    Valid,
    /// Drop silently.
    Garbage,
    /// Drop silently (borderline, but not worth the model cost).
    Low,
}

/// STT quality metrics supplied by the transport alongside the text.
#[derive(Debug, Clone, Copy, Default)]
pub struct SttSignals {
    /// Recognizer's confidence that the segment is NOT speech (0.0-1.0).
    pub no_speech_prob: f64,
    /// Average token log-probability (negative; closer to 0 is better).
    pub avg_logprob: f64,
    /// Duration of the recording in seconds (0.0 = unknown).
    pub audio_duration_s: f64,
}

/// Single words the recognizer commonly produces from noise or short mic
/// presses.  Greetings and farewells are deliberately absent: those are
/// real conversational signals.
const FILLER_WORDS: &[&str] = &[
    // Filler / non-speech.
    "you", "the", "a", "i", "um", "uh", "hmm", "oh", "ah", "eh",
    // Common hallucinations on silence or noise.
    "beep", "boop", "okay", "ok", "yeah", "yes", "no", "so",
    "well", "right", "like", "just", "but", "and", "or", "if", "it",
    // Noise artifacts.
    "something", "nothing", "uh-huh", "mm-hmm", "mhm", "huh",
];

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// The classifier, with its patterns compiled once at startup.
pub struct InputFilter {
    fillers: HashSet<&'static str>,
    /// Only punctuation, e.g. ". . . .".
    all_punctuation: Regex,
    /// Fully parenthesized, e.g. "(upbeat music)".
    parenthesized: Regex,
}

impl InputFilter {
    /// Build the classifier.
    pub fn new() -> Self {
        Self {
            fillers: FILLER_WORDS.iter().copied().collect(),
            all_punctuation: Regex::new(r"^[\s.,!?\-…]+$").expect("static pattern"),
            parenthesized: Regex::new(r"^\(.*\)$").expect("static pattern"),
        }
    }

    /// Classify one transcription.
    pub fn classify(&self, text: &str, signals: &SttSignals) -> InputQuality {
        let clean = text.trim();

        if clean.is_empty() {
            return InputQuality::Garbage;
        }

        // Very short recording: almost always an accidental tap.
        if signals.audio_duration_s > 0.0 && signals.audio_duration_s < 0.6 {
            info!(duration = signals.audio_duration_s, text = %clean, "dropped: too short");
            return InputQuality::Garbage;
        }

        // The recognizer itself thinks this is not speech.
        if signals.no_speech_prob > 0.6 {
            info!(no_speech = signals.no_speech_prob, text = %clean, "dropped: no-speech");
            return InputQuality::Garbage;
        }

        // Hallucination shapes: punctuation runs, repeated words,
        // parenthetical sound descriptions, music notes.
        if self.all_punctuation.is_match(clean)
            || self.parenthesized.is_match(clean)
            || clean.starts_with('♪')
            || is_repeated_word(clean)
        {
            info!(text = %clean, "dropped: hallucination pattern");
            return InputQuality::Garbage;
        }

        let trimmed = clean.trim_end_matches(['?', '.', '!', ',']);
        let words: Vec<&str> = trimmed.split_whitespace().collect();
        let word_count = words.len();

        if word_count == 1 && self.is_filler(words[0]) {
            info!(text = %clean, "dropped: filler word");
            return InputQuality::Garbage;
        }

        // Low confidence plus very short: probably noise misheard as words.
        if signals.avg_logprob < -1.0 && word_count <= 3 {
            info!(
                logprob = signals.avg_logprob,
                words = word_count,
                text = %clean,
                "dropped: low confidence"
            );
            return InputQuality::Low;
        }

        if word_count == 2 && self.is_filler(words[0]) && self.is_filler(words[1]) {
            info!(text = %clean, "dropped: two filler words");
            return InputQuality::Garbage;
        }

        InputQuality::Valid
    }

    fn is_filler(&self, word: &str) -> bool {
        let normalized = word
            .to_lowercase()
            .trim_matches(['?', '.', '!', ',', '-'])
            .to_owned();
        self.fillers.contains(normalized.as_str())
    }
}

impl Default for InputFilter {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether the text is one word repeated three or more times
/// ("the the the").
fn is_repeated_word(text: &str) -> bool {
    let words: Vec<String> = text.split_whitespace().map(str::to_lowercase).collect();
    words.len() >= 3 && words.windows(2).all(|w| w[0] == w[1])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(text: &str) -> InputQuality {
        InputFilter::new().classify(text, &SttSignals::default())
    }

    #[test]
    fn empty_text_is_garbage() {
        assert_eq!(classify(""), InputQuality::Garbage);
        assert_eq!(classify("   "), InputQuality::Garbage);
    }

    #[test]
    fn duration_boundary_is_exclusive_at_point_six() {
        let filter = InputFilter::new();
        let at = SttSignals {
            audio_duration_s: 0.6,
            ..Default::default()
        };
        let below = SttSignals {
            audio_duration_s: 0.59,
            ..Default::default()
        };
        assert_eq!(filter.classify("what time is it", &at), InputQuality::Valid);
        assert_eq!(filter.classify("what time is it", &below), InputQuality::Garbage);
    }

    #[test]
    fn no_speech_boundary_is_exclusive_at_point_six() {
        let filter = InputFilter::new();
        let at = SttSignals {
            no_speech_prob: 0.60,
            ..Default::default()
        };
        let above = SttSignals {
            no_speech_prob: 0.61,
            ..Default::default()
        };
        assert_eq!(filter.classify("what time is it", &at), InputQuality::Valid);
        assert_eq!(filter.classify("what time is it", &above), InputQuality::Garbage);
    }

    #[test]
    fn hallucination_patterns_are_garbage() {
        assert_eq!(classify(". . . ."), InputQuality::Garbage);
        assert_eq!(classify("the the the"), InputQuality::Garbage);
        assert_eq!(classify("(upbeat music)"), InputQuality::Garbage);
        assert_eq!(classify("♪ la la la"), InputQuality::Garbage);
    }

    #[test]
    fn filler_words_are_garbage_but_greetings_are_not() {
        assert_eq!(classify("you"), InputQuality::Garbage);
        assert_eq!(classify("Um."), InputQuality::Garbage);
        assert_eq!(classify("okay yeah"), InputQuality::Garbage);
        // Greetings deserve a reply.
        assert_eq!(classify("hello"), InputQuality::Valid);
        assert_eq!(classify("thanks"), InputQuality::Valid);
    }

    #[test]
    fn low_confidence_short_utterances_are_low() {
        let filter = InputFilter::new();
        let signals = SttSignals {
            avg_logprob: -1.4,
            ..Default::default()
        };
        assert_eq!(filter.classify("red blue green", &signals), InputQuality::Low);
        // Longer utterances survive low confidence.
        assert_eq!(
            filter.classify("what is the weather like in austin", &signals),
            InputQuality::Valid
        );
    }

    #[test]
    fn normal_queries_are_valid() {
        assert_eq!(classify("what's the weather in Austin?"), InputQuality::Valid);
        assert_eq!(classify("compare the top 3 S&P 500 companies"), InputQuality::Valid);
    }

    #[test]
    fn two_real_words_are_valid() {
        assert_eq!(classify("good morning"), InputQuality::Valid);
    }
}
