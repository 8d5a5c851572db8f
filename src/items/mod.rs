//! # Score Items
//!
//! The semantic units placed on a [`crate::Canvas`].
//!
//! ## Item Kinds
//! [`ItemKind`] is a closed set of variants. What an item can take part in
//! is answered by capability queries rather than by its type:
//!
//! | kind | pitch | slurable | stemmed | beamed |
//! |---|---|---|---|---|
//! | Barline | | yes | | |
//! | Clef | yes | | | |
//! | TimeSignature, WholeTimeSignature | | | | |
//! | KeySignature | | | | |
//! | Rest | | | | |
//! | Note (whole) | yes | yes | | |
//! | Note (half, quarter, flag) | yes | yes | yes | |
//! | Note (beamed) | yes | yes | yes | yes |
//! | InvisibleSlurEnd | | yes | | |
//!
//! ## Conversion
//! [`ScoreItem::from_group`] turns a parsed [`TokenGroup`] into an item and
//! [`ScoreItem::annotation_tokens`] turns it back into tokens. Anything an
//! item cannot represent (a slur bracket on a rest, a `x` accidental on a
//! note) is dropped by the conversion; callers detect that by comparing the
//! tokens (see [`crate::canvas::annotation_to_canvas`]).
//!
//! ## Layout State
//! Besides its semantics an item carries the state of the current layout
//! pass: its sprite group, the stem direction, sided beam counts, ledger
//! lines and the stroke crossing a cut time signature. See `placement`.

mod placement;

use crate::annotation::{GroupToken, TokenGroup};
use crate::error::HandstaffError;
use crate::sprites::{Sprite, SpriteGroup, Stroke};
use crate::symbols::SymbolKind;
use crate::vocabulary::{
    get_pitch, is_accidental, is_duration_dot, to_generic, HIGHEST_PITCH, LOWEST_PITCH,
};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Accidental {
    Sharp,
    Flat,
    Natural,
}

impl Accidental {
    pub fn from_generic(generic: &str) -> Option<Self> {
        match generic {
            "#" => Some(Accidental::Sharp),
            "b" => Some(Accidental::Flat),
            "N" => Some(Accidental::Natural),
            _ => None,
        }
    }

    pub fn token(&self) -> &'static str {
        match self {
            Accidental::Sharp => "#",
            Accidental::Flat => "b",
            Accidental::Natural => "N",
        }
    }

    pub fn symbol_kind(&self) -> SymbolKind {
        match self {
            Accidental::Sharp => SymbolKind::Sharp,
            Accidental::Flat => SymbolKind::Flat,
            Accidental::Natural => SymbolKind::Natural,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum DurationDots {
    #[default]
    None,
    Single,
    Double,
}

impl DurationDots {
    /// Read the duration dots from a group's after attachments.
    fn from_group(group: &TokenGroup) -> Self {
        let dots = group.after_attachments.iter().find(|a| is_duration_dot(a));
        match dots.map(String::as_str) {
            Some("*") => DurationDots::Single,
            Some("**") => DurationDots::Double,
            _ => DurationDots::None,
        }
    }

    pub fn token(&self) -> Option<&'static str> {
        match self {
            DurationDots::None => None,
            DurationDots::Single => Some("*"),
            DurationDots::Double => Some("**"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ClefKind {
    G,
    F,
    C,
}

impl ClefKind {
    /// Staff positions the clef may sit on.
    pub fn allowed_pitches(&self) -> &'static [i32] {
        match self {
            ClefKind::G => &[-4, -2],
            ClefKind::F => &[0, 2, 3],
            ClefKind::C => &[-4, -2, 0, 2, 4],
        }
    }

    fn letter(&self) -> &'static str {
        match self {
            ClefKind::G => "G",
            ClefKind::F => "F",
            ClefKind::C => "C",
        }
    }

    pub fn symbol_kind(&self) -> SymbolKind {
        match self {
            ClefKind::G => SymbolKind::GClef,
            ClefKind::F => SymbolKind::FClef,
            ClefKind::C => SymbolKind::CClef,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RestKind {
    Longa,
    Breve,
    Whole,
    Half,
    Quarter,
    Eighth,
    Sixteenth,
}

impl RestKind {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "lr" => Some(RestKind::Longa),
            "br" => Some(RestKind::Breve),
            "wr" => Some(RestKind::Whole),
            "hr" => Some(RestKind::Half),
            "qr" => Some(RestKind::Quarter),
            "er" => Some(RestKind::Eighth),
            "sr" => Some(RestKind::Sixteenth),
            _ => None,
        }
    }

    pub fn token(&self) -> &'static str {
        match self {
            RestKind::Longa => "lr",
            RestKind::Breve => "br",
            RestKind::Whole => "wr",
            RestKind::Half => "hr",
            RestKind::Quarter => "qr",
            RestKind::Eighth => "er",
            RestKind::Sixteenth => "sr",
        }
    }

    pub fn symbol_kind(&self) -> SymbolKind {
        match self {
            RestKind::Longa => SymbolKind::LongaRest,
            RestKind::Breve => SymbolKind::BreveRest,
            RestKind::Whole => SymbolKind::WholeRest,
            RestKind::Half => SymbolKind::HalfRest,
            RestKind::Quarter => SymbolKind::QuarterRest,
            RestKind::Eighth => SymbolKind::EighthRest,
            RestKind::Sixteenth => SymbolKind::SixteenthRest,
        }
    }

    /// Long rests get extra room on both sides.
    fn is_long(&self) -> bool {
        matches!(
            self,
            RestKind::Longa | RestKind::Breve | RestKind::Whole | RestKind::Half
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FlagKind {
    Eighth,
    Sixteenth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NoteKind {
    Whole,
    Half,
    Quarter,
    Flag(FlagKind),
    /// `beams` is 1 for eighths, 2 for sixteenths, 3 for thirty-seconds
    Beamed {
        beams: u8,
        left_beamed: bool,
        right_beamed: bool,
    },
}

impl NoteKind {
    fn from_generic(generic: &str) -> Option<Self> {
        let kind = match generic {
            "w" => NoteKind::Whole,
            "h" => NoteKind::Half,
            "q" => NoteKind::Quarter,
            "e" => NoteKind::Flag(FlagKind::Eighth),
            "s" => NoteKind::Flag(FlagKind::Sixteenth),
            _ => {
                let left_beamed = generic.starts_with('=');
                let right_beamed = generic.ends_with('=');
                if !left_beamed && !right_beamed {
                    return None;
                }
                let beams = match generic.trim_matches('=') {
                    "e" => 1,
                    "s" => 2,
                    "t" => 3,
                    _ => return None,
                };
                NoteKind::Beamed {
                    beams,
                    left_beamed,
                    right_beamed,
                }
            }
        };
        Some(kind)
    }

    pub fn generic_token(&self) -> String {
        match self {
            NoteKind::Whole => "w".to_string(),
            NoteKind::Half => "h".to_string(),
            NoteKind::Quarter => "q".to_string(),
            NoteKind::Flag(FlagKind::Eighth) => "e".to_string(),
            NoteKind::Flag(FlagKind::Sixteenth) => "s".to_string(),
            NoteKind::Beamed {
                beams,
                left_beamed,
                right_beamed,
            } => {
                let letter = match beams {
                    1 => "e",
                    2 => "s",
                    _ => "t",
                };
                format!(
                    "{}{}{}",
                    if *left_beamed { "=" } else { "" },
                    letter,
                    if *right_beamed { "=" } else { "" }
                )
            }
        }
    }

    /// Beamed notes borrow the quarter note glyph and grow a beam instead of flags.
    pub fn symbol_kind(&self) -> SymbolKind {
        match self {
            NoteKind::Whole => SymbolKind::WholeNote,
            NoteKind::Half => SymbolKind::HalfNote,
            NoteKind::Quarter | NoteKind::Beamed { .. } => SymbolKind::QuarterNote,
            NoteKind::Flag(FlagKind::Eighth) => SymbolKind::EighthNote,
            NoteKind::Flag(FlagKind::Sixteenth) => SymbolKind::SixteenthNote,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Note {
    pub kind: NoteKind,
    pub pitch: i32,
    pub accidental: Option<Accidental>,
    pub dots: DurationDots,
    pub staccato: bool,
}

impl Note {
    pub fn new(kind: NoteKind, pitch: i32) -> Self {
        Self {
            kind,
            pitch,
            accidental: None,
            dots: DurationDots::None,
            staccato: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ItemKind {
    Barline,
    Clef { clef: ClefKind, pitch: i32 },
    TimeSignature { top: u8, bottom: u8 },
    WholeTimeSignature { crossed: bool },
    KeySignature { accidentals: Vec<(Accidental, i32)> },
    Rest { kind: RestKind, dots: DurationDots },
    Note(Note),
    /// Zero-glyph endpoint of an otherwise unmatched slur
    InvisibleSlurEnd,
}

/// Beam membership of a beamed note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Beaming {
    pub beams: u8,
    pub left_beamed: bool,
    pub right_beamed: bool,
}

/// A ledger line under or over a note.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerLine {
    pub pitch: i32,
    /// Pixel row of the line, set when the item is placed
    pub row: i32,
    /// Glyph relative to (item position x, row)
    pub sprite: Sprite,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreItem {
    pub kind: ItemKind,
    pub slur_start: bool,
    pub slur_end: bool,

    pub sprites: SpriteGroup,
    /// Stem points down; decided during sprite selection
    pub flipped: bool,
    pub left_beam_count: u8,
    pub right_beam_count: u8,
    pub ledger_lines: Vec<LedgerLine>,
    /// The stroke crossing a cut time signature
    pub stroke: Option<Stroke>,
}

impl ScoreItem {
    pub fn new(kind: ItemKind) -> Self {
        Self {
            kind,
            slur_start: false,
            slur_end: false,
            sprites: SpriteGroup::new(),
            flipped: false,
            left_beam_count: 0,
            right_beam_count: 0,
            ledger_lines: Vec::new(),
            stroke: None,
        }
    }

    pub fn note(kind: NoteKind, pitch: i32) -> Self {
        Self::new(ItemKind::Note(Note::new(kind, pitch)))
    }

    pub fn barline() -> Self {
        Self::new(ItemKind::Barline)
    }

    /// An invisible item that starts (or ends) a slur.
    pub fn invisible_slur_end(start_here: bool) -> Self {
        Self::new(ItemKind::InvisibleSlurEnd).with_slur(start_here, !start_here)
    }

    pub fn with_slur(mut self, slur_start: bool, slur_end: bool) -> Self {
        self.slur_start = slur_start;
        self.slur_end = slur_end;
        self
    }

    /// Convert a parsed token group into an item.
    pub fn from_group(group: &TokenGroup) -> Result<Self, HandstaffError> {
        let token = match &group.token {
            GroupToken::KeySignature => {
                let accidentals = group
                    .before_attachments
                    .iter()
                    .map(|a| parse_accidental(a))
                    .collect::<Result<Vec<_>, _>>()?;
                return Ok(Self::new(ItemKind::KeySignature { accidentals }));
            }
            GroupToken::TimeSignature { top, bottom } => {
                return Ok(Self::new(ItemKind::TimeSignature {
                    top: parse_time_digit(top)?,
                    bottom: parse_time_digit(bottom)?,
                }));
            }
            GroupToken::Symbol { token } => token.as_str(),
        };

        let slur_start = group.has_after("(");
        let slur_end = group.has_before(")");
        let generic = to_generic(token);

        let item = match generic {
            "|" => Self::barline().with_slur(slur_start, slur_end),
            "time.C" => Self::new(ItemKind::WholeTimeSignature { crossed: false }),
            "time.C/" => Self::new(ItemKind::WholeTimeSignature { crossed: true }),
            "clef.G" | "clef.F" | "clef.C" => {
                let clef = match generic {
                    "clef.G" => ClefKind::G,
                    "clef.F" => ClefKind::F,
                    _ => ClefKind::C,
                };
                let pitch = required_pitch(token)?;
                if !clef.allowed_pitches().contains(&pitch) {
                    return Err(invalid(
                        token,
                        format!("{} clef cannot sit on pitch {}", clef.letter(), pitch),
                    ));
                }
                Self::new(ItemKind::Clef { clef, pitch })
            }
            _ => {
                if let Some(kind) = RestKind::from_token(token) {
                    Self::new(ItemKind::Rest {
                        kind,
                        dots: DurationDots::from_group(group),
                    })
                } else if let Some(kind) = NoteKind::from_generic(generic) {
                    let accidental = group
                        .before_attachments
                        .iter()
                        .find(|a| is_accidental(a))
                        .and_then(|a| Accidental::from_generic(to_generic(a)));
                    let note = Note {
                        kind,
                        pitch: required_pitch(token)?,
                        accidental,
                        dots: DurationDots::from_group(group),
                        staccato: group.has_after("."),
                    };
                    Self::new(ItemKind::Note(note)).with_slur(slur_start, slur_end)
                } else {
                    return Err(invalid(token, "no score item accepts this token"));
                }
            }
        };
        Ok(item)
    }

    pub fn pitch(&self) -> Option<i32> {
        match &self.kind {
            ItemKind::Note(note) => Some(note.pitch),
            ItemKind::Clef { pitch, .. } => Some(*pitch),
            _ => None,
        }
    }

    pub fn as_note(&self) -> Option<&Note> {
        match &self.kind {
            ItemKind::Note(note) => Some(note),
            _ => None,
        }
    }

    pub fn is_note(&self) -> bool {
        self.as_note().is_some()
    }

    pub fn is_slurable(&self) -> bool {
        matches!(
            self.kind,
            ItemKind::Barline | ItemKind::Note(_) | ItemKind::InvisibleSlurEnd
        )
    }

    /// Notes with a stem: everything but whole notes.
    pub fn is_stemmed(&self) -> bool {
        self.as_note()
            .map_or(false, |note| note.kind != NoteKind::Whole)
    }

    pub fn beaming(&self) -> Option<Beaming> {
        match self.as_note()?.kind {
            NoteKind::Beamed {
                beams,
                left_beamed,
                right_beamed,
            } => Some(Beaming {
                beams,
                left_beamed,
                right_beamed,
            }),
            _ => None,
        }
    }

    /// The item token alone, without attachments. `None` for items that
    /// are not written as a single token.
    pub fn item_token(&self) -> Option<String> {
        match &self.kind {
            ItemKind::Barline => Some("|".to_string()),
            ItemKind::Clef { clef, pitch } => Some(format!("clef.{}{}", clef.letter(), pitch)),
            ItemKind::WholeTimeSignature { crossed } => {
                Some(if *crossed { "time.C/" } else { "time.C" }.to_string())
            }
            ItemKind::Rest { kind, .. } => Some(kind.token().to_string()),
            ItemKind::Note(note) => Some(format!("{}{}", note.kind.generic_token(), note.pitch)),
            ItemKind::TimeSignature { .. }
            | ItemKind::KeySignature { .. }
            | ItemKind::InvisibleSlurEnd => None,
        }
    }

    /// The annotation tokens this item stands for, attachments included.
    pub fn annotation_tokens(&self) -> Vec<String> {
        let mut tokens = Vec::new();
        match &self.kind {
            ItemKind::InvisibleSlurEnd => {}
            ItemKind::KeySignature { accidentals } => {
                for (accidental, pitch) in accidentals {
                    tokens.push(format!("{}{}", accidental.token(), pitch));
                }
            }
            ItemKind::TimeSignature { top, bottom } => {
                tokens.push(format!("time.{}", top));
                tokens.push(format!("time.{}", bottom));
            }
            ItemKind::Rest { kind, dots } => {
                tokens.push(kind.token().to_string());
                tokens.extend(dots.token().map(String::from));
            }
            ItemKind::Note(note) => {
                if self.slur_end {
                    tokens.push(")".to_string());
                }
                if let Some(accidental) = note.accidental {
                    tokens.push(format!("{}{}", accidental.token(), note.pitch));
                }
                tokens.push(format!("{}{}", note.kind.generic_token(), note.pitch));
                if note.staccato {
                    tokens.push(".".to_string());
                }
                tokens.extend(note.dots.token().map(String::from));
                if self.slur_start {
                    tokens.push("(".to_string());
                }
            }
            ItemKind::Barline | ItemKind::Clef { .. } | ItemKind::WholeTimeSignature { .. } => {
                let slurable = self.is_slurable();
                if slurable && self.slur_end {
                    tokens.push(")".to_string());
                }
                tokens.extend(self.item_token());
                if slurable && self.slur_start {
                    tokens.push("(".to_string());
                }
            }
        }
        tokens
    }
}

fn invalid(token: &str, reason: impl Into<String>) -> HandstaffError {
    HandstaffError::InvalidToken {
        token: token.to_string(),
        reason: reason.into(),
    }
}

fn required_pitch(token: &str) -> Result<i32, HandstaffError> {
    let pitch = get_pitch(token).ok_or_else(|| invalid(token, "missing pitch"))?;
    if !(LOWEST_PITCH..=HIGHEST_PITCH).contains(&pitch) {
        return Err(invalid(
            token,
            format!(
                "pitch {} is outside [{}, {}]",
                pitch, LOWEST_PITCH, HIGHEST_PITCH
            ),
        ));
    }
    Ok(pitch)
}

fn parse_accidental(token: &str) -> Result<(Accidental, i32), HandstaffError> {
    let accidental = Accidental::from_generic(to_generic(token))
        .ok_or_else(|| invalid(token, "unsupported key signature accidental"))?;
    Ok((accidental, required_pitch(token)?))
}

fn parse_time_digit(token: &str) -> Result<u8, HandstaffError> {
    token
        .strip_prefix("time.")
        .and_then(|digit| digit.parse().ok())
        .filter(|digit| *digit <= 9)
        .ok_or_else(|| invalid(token, "not a time signature digit"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::parse;

    fn items(annotation: &str) -> Vec<ScoreItem> {
        parse(annotation)
            .groups
            .iter()
            .map(|g| ScoreItem::from_group(g).unwrap())
            .collect()
    }

    fn tokens(items: &[ScoreItem]) -> String {
        items
            .iter()
            .flat_map(|i| i.annotation_tokens())
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_note_conversion() {
        let items = items(") #3 q3 . * (");
        assert_eq!(items.len(), 1);
        let note = items[0].as_note().unwrap();
        assert_eq!(note.kind, NoteKind::Quarter);
        assert_eq!(note.pitch, 3);
        assert_eq!(note.accidental, Some(Accidental::Sharp));
        assert_eq!(note.dots, DurationDots::Single);
        assert!(note.staccato);
        assert!(items[0].slur_start);
        assert!(items[0].slur_end);
    }

    #[test]
    fn test_beamed_note_conversion() {
        let items = items("s=-4 =e=-3 =t-2");
        let beamings: Vec<Beaming> = items.iter().map(|i| i.beaming().unwrap()).collect();
        assert_eq!(
            beamings,
            vec![
                Beaming { beams: 2, left_beamed: false, right_beamed: true },
                Beaming { beams: 1, left_beamed: true, right_beamed: true },
                Beaming { beams: 3, left_beamed: true, right_beamed: false },
            ]
        );
    }

    #[test]
    fn test_capabilities() {
        let items = items("clef.G-2 | w0 h0 e0 qr time.C");
        let slurable: Vec<bool> = items.iter().map(|i| i.is_slurable()).collect();
        assert_eq!(slurable, vec![false, true, true, true, true, false, false]);
        let stemmed: Vec<bool> = items.iter().map(|i| i.is_stemmed()).collect();
        assert_eq!(stemmed, vec![false, false, false, true, true, false, false]);
        assert_eq!(items[0].pitch(), Some(-2));
        assert_eq!(items[5].pitch(), None);
    }

    #[test]
    fn test_tokens_round_trip() {
        let annotations = [
            "clef.G-2 #4 #1 time.3 time.4 q0 . * ( | ) e=-4 =e=-4 =e-4",
            "clef.F3 b-1 w-1 ** lr br wr hr qr * er sr **",
            "time.C/ | ( ) h12 N-12 s-12 time.C",
        ];
        for annotation in annotations {
            assert_eq!(tokens(&items(annotation)), annotation);
        }
    }

    #[test]
    fn test_invisible_slur_end_has_no_tokens() {
        assert!(ScoreItem::invisible_slur_end(true).annotation_tokens().is_empty());
    }

    #[test]
    fn test_rest_drops_slur_brackets() {
        let items = items("qr (");
        assert_eq!(tokens(&items), "qr");
    }

    #[test]
    fn test_invalid_clef_position() {
        let group = TokenGroup::new("clef.G3");
        match ScoreItem::from_group(&group) {
            Err(HandstaffError::InvalidToken { token, .. }) => assert_eq!(token, "clef.G3"),
            other => panic!("Expected InvalidToken but got: {:?}", other),
        }
        assert!(ScoreItem::from_group(&TokenGroup::new("clef.F3")).is_ok());
    }

    #[test]
    fn test_unsupported_tokens() {
        for token in ["?", ":|", "|:", "t3", "tr", "q13", "q", "clef.C"] {
            let result = ScoreItem::from_group(&TokenGroup::new(token));
            assert!(
                matches!(result, Err(HandstaffError::InvalidToken { .. })),
                "{} should be rejected",
                token
            );
        }
    }

    #[test]
    fn test_unsupported_key_signature_accidental() {
        let group = TokenGroup::key_signature(vec!["x2".to_string()]);
        assert!(matches!(
            ScoreItem::from_group(&group),
            Err(HandstaffError::InvalidToken { .. })
        ));
    }

    #[test]
    fn test_time_signature_digits() {
        let group = TokenGroup::time_signature("time.6", "time.8");
        let item = ScoreItem::from_group(&group).unwrap();
        assert_eq!(item.kind, ItemKind::TimeSignature { top: 6, bottom: 8 });
    }
}
