//! # Vocabulary Module
//!
//! Static definitions of the annotation token categories.
//!
//! ## Token Anatomy
//! A token is a whitespace-free symbol, optionally followed by a signed pitch:
//! - `q-4` - quarter note on pitch -4
//! - `=e=2` - eighth note beamed on both sides, pitch 2
//! - `#3` - sharp on pitch 3
//! - `clef.G-2` - treble clef with its curl on pitch -2
//! - `time.4` - a single time-signature digit (the `4` is *not* a pitch)
//!
//! The *generic* form of a token is the token with its pitch stripped. All
//! category lookups are done on the generic form.
//!
//! ## Pitches
//! Pitches are integers in `[-12, 12]`. Pitch 0 is the centre staff line,
//! even pitches sit on lines and odd pitches in spaces. Positive pitches are
//! higher on the staff.
//!
//! ## Attachment Order
//! Decorations (accidentals, slur brackets, dots, ...) attach to the item
//! before or after them and must appear in the fixed order of
//! [`ATTACHMENT_ORDER`].

/// Highest pitch an item may sit on (fourth ledger line above).
pub const HIGHEST_PITCH: i32 = 12;

/// Lowest pitch an item may sit on (fourth ledger line below).
pub const LOWEST_PITCH: i32 = -12;

/// The unknown-symbol token (grace notes and other unrecognised glyphs).
pub const UNKNOWN_SYMBOL: &str = "?";

pub const ACCIDENTALS: [&str; 5] = ["#", "b", "N", "x", "bb"];

pub const DURATION_DOTS: [&str; 2] = ["*", "**"];

pub const BEFORE_ATTACHMENTS: [&str; 10] = [
    ")", "fermata", "trill", "+", "tuplet.3", "#", "b", "N", "x", "bb",
];

pub const AFTER_ATTACHMENTS: [&str; 7] = [".", "_", ">", "^", "*", "**", "("];

/// Precedence of attachments around an item: before-attachments first,
/// then after-attachments, each in this exact order.
pub const ATTACHMENT_ORDER: [&str; 17] = [
    ")", "fermata", "trill", "+", "tuplet.3", "#", "b", "N", "x", "bb", ".", "_", ">", "^",
    "*", "**", "(",
];

pub const BEAMED_NOTES: [&str; 9] = ["=e", "=e=", "e=", "=s", "=s=", "s=", "=t", "=t=", "t="];

pub const NOTES: [&str; 15] = [
    "w", "h", "q", "e", "s", "t", "=e", "=e=", "e=", "=s", "=s=", "s=", "=t", "=t=", "t=",
];

pub const RESTS: [&str; 8] = ["lr", "br", "wr", "hr", "qr", "er", "sr", "tr"];

pub const NUMERIC_TIME_SIGNATURES: [&str; 10] = [
    "time.0", "time.1", "time.2", "time.3", "time.4", "time.5", "time.6", "time.7", "time.8",
    "time.9",
];

pub const BARLINES: [&str; 3] = ["|", ":|", "|:"];

/// Wildcard vocabulary; `{p}` expands to every pitch.
const WILDCARD_VOCABULARY: &[&str] = &[
    "?", "|", "|:", ":|", ":|:",
    "clef.C4", "clef.C2", "clef.C0", "clef.C-2", "clef.C-4",
    "clef.F0", "clef.F2", "clef.F3", "clef.G-2", "clef.G-4",
    "time.C", "time.C/", "time.0", "time.1", "time.2", "time.3", "time.4",
    "time.5", "time.6", "time.7", "time.8", "time.9",
    "#{p}", "b{p}", "N{p}", "x{p}", "bb{p}",
    "(", ")",
    "tuplet.3",
    "fermata", "trill", "+",
    ".", "_", ">", "^", "*", "**",
    "lr", "br", "wr", "hr", "qr", "er", "sr", "tr",
    "w{p}", "h{p}", "q{p}", "e{p}", "s{p}", "t{p}",
    "=e{p}", "=e={p}", "e={p}",
    "=s{p}", "=s={p}", "s={p}",
    "=t{p}", "=t={p}", "t={p}",
];

/// Pitches from the highest to the lowest.
pub fn pitches() -> impl Iterator<Item = i32> {
    (LOWEST_PITCH..=HIGHEST_PITCH).rev()
}

/// Expand the wildcard vocabulary into the full, ordered list of tokens
/// a recognition model may output.
pub fn build_vocabulary() -> Vec<String> {
    let mut out = Vec::new();
    for wild in WILDCARD_VOCABULARY {
        if wild.contains("{p}") {
            out.extend(pitches().map(|p| wild.replace("{p}", &p.to_string())));
        } else {
            out.push(wild.to_string());
        }
    }
    out
}

/// Convert a token to its generic (pitch-less) form.
///
/// `time.*` and `tuplet.*` tokens end in digits that are not pitches and are
/// returned unchanged.
pub fn to_generic(token: &str) -> &str {
    if token.starts_with("tuplet.") || token.starts_with("time.") {
        return token;
    }
    token.trim_end_matches(|c: char| c == '-' || c.is_ascii_digit())
}

/// Pitch of a token, or `None` for pitch-less tokens.
pub fn get_pitch(token: &str) -> Option<i32> {
    let generic = to_generic(token);
    let suffix = &token[generic.len()..];
    if suffix.is_empty() {
        return None;
    }
    suffix.parse().ok()
}

/// Rebuild a token from a generic form and an optional pitch.
pub fn with_pitch(generic: &str, pitch: Option<i32>) -> String {
    match pitch {
        Some(p) => format!("{}{}", generic, p),
        None => generic.to_string(),
    }
}

pub fn is_before_attachment(token: &str) -> bool {
    BEFORE_ATTACHMENTS.contains(&to_generic(token))
}

pub fn is_after_attachment(token: &str) -> bool {
    AFTER_ATTACHMENTS.contains(&to_generic(token))
}

pub fn is_duration_dot(token: &str) -> bool {
    DURATION_DOTS.contains(&token)
}

pub fn is_note(token: &str) -> bool {
    NOTES.contains(&to_generic(token))
}

pub fn is_beamed_note(token: &str) -> bool {
    BEAMED_NOTES.contains(&to_generic(token))
}

pub fn is_rest(token: &str) -> bool {
    RESTS.contains(&token)
}

pub fn is_clef(token: &str) -> bool {
    token.starts_with("clef.")
}

pub fn is_accidental(token: &str) -> bool {
    ACCIDENTALS.contains(&to_generic(token))
}

/// True for single digit time-signature tokens (not `time.C` or `time.C/`).
pub fn is_numeric_time_signature(token: &str) -> bool {
    NUMERIC_TIME_SIGNATURES.contains(&token)
}

pub fn is_barline(token: &str) -> bool {
    BARLINES.contains(&token)
}

/// Position of an attachment in [`ATTACHMENT_ORDER`]; unknown tokens sort last.
pub fn attachment_rank(token: &str) -> usize {
    let generic = to_generic(token);
    ATTACHMENT_ORDER
        .iter()
        .position(|a| *a == generic)
        .unwrap_or(ATTACHMENT_ORDER.len())
}

/// Sort attachments by [`ATTACHMENT_ORDER`], keeping the relative order of equal ranks.
pub fn sort_attachments(attachments: &[String]) -> Vec<String> {
    let mut sorted = attachments.to_vec();
    sorted.sort_by_key(|a| attachment_rank(a));
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_to_generic_strips_signed_pitch() {
        assert_eq!(to_generic("q-4"), "q");
        assert_eq!(to_generic("=e=12"), "=e=");
        assert_eq!(to_generic("clef.G-2"), "clef.G");
        assert_eq!(to_generic("bb-3"), "bb");
        assert_eq!(to_generic("|"), "|");
    }

    #[test]
    fn test_to_generic_keeps_time_and_tuplet_digits() {
        assert_eq!(to_generic("time.4"), "time.4");
        assert_eq!(to_generic("tuplet.3"), "tuplet.3");
    }

    #[test]
    fn test_get_pitch() {
        assert_eq!(get_pitch("q-4"), Some(-4));
        assert_eq!(get_pitch("#3"), Some(3));
        assert_eq!(get_pitch("clef.F2"), Some(2));
        assert_eq!(get_pitch("qr"), None);
        assert_eq!(get_pitch("time.8"), None);
        // a dangling sign is not a pitch
        assert_eq!(get_pitch("q-"), None);
    }

    #[test]
    fn test_categories() {
        assert!(is_note("w0"));
        assert!(is_note("=s=-3"));
        assert!(is_beamed_note("t=5"));
        assert!(!is_beamed_note("e5"));
        assert!(is_rest("qr"));
        assert!(!is_rest("qr1"));
        assert!(is_accidental("N-2"));
        assert!(is_before_attachment(")"));
        assert!(is_before_attachment("b4"));
        assert!(is_after_attachment("("));
        assert!(is_after_attachment("**"));
        assert!(is_duration_dot("**"));
        assert!(!is_duration_dot("."));
        assert!(is_numeric_time_signature("time.3"));
        assert!(!is_numeric_time_signature("time.C"));
        assert!(is_barline("|"));
        assert!(is_clef("clef.C0"));
    }

    #[test]
    fn test_attachment_ordering() {
        let sorted = sort_attachments(&["(".to_string(), ".".to_string(), "*".to_string()]);
        assert_eq!(sorted, vec![".", "*", "("]);

        let sorted = sort_attachments(&["#2".to_string(), ")".to_string()]);
        assert_eq!(sorted, vec![")", "#2"]);
    }

    #[test]
    fn test_vocabulary_has_no_duplicates() {
        let vocabulary = build_vocabulary();
        let unique: HashSet<&String> = vocabulary.iter().collect();
        assert_eq!(unique.len(), vocabulary.len());
        assert!(vocabulary.contains(&"q-12".to_string()));
        assert!(vocabulary.contains(&"=t=12".to_string()));
        assert!(vocabulary.contains(&"time.C/".to_string()));
        // 20 pitched wildcards * 25 pitches + 47 plain tokens
        assert_eq!(vocabulary.len(), 20 * 25 + 47);
    }
}
