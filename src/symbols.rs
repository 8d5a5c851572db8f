//! # Symbol Provider
//!
//! Source of glyph geometry for score items.
//!
//! ## Purpose
//! Score items do not know what their glyphs look like. During sprite
//! selection they ask a [`SymbolProvider`] for the candidate
//! [`SpriteGroup`]s of a [`SymbolKind`] and one candidate is picked at random
//! (see [`crate::context::LayoutContext`]). A provider backed by a corpus of
//! handwritten symbols plugs in here; [`SyntheticSymbols`] is a built-in
//! provider with a few geometric variants per kind so the layout pipeline can
//! run on its own.
//!
//! ## Sprite Names
//! Items rely on these names inside the groups they receive:
//! - notes: `notehead`, plus `stem` and the `stem_head` point for stemmed
//!   notes, plus `flag_8` / `flag_16` for flag notes
//! - rests: `rest`
//! - clefs: `clef`
//! - barlines: `barline`
//! - time marks: `symbol`
//! - single glyphs (accidentals, dots, ledger lines): the first sprite is used

use crate::sprites::{Sprite, SpriteGroup};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    WholeNote,
    HalfNote,
    QuarterNote,
    EighthNote,
    SixteenthNote,
    LongaRest,
    BreveRest,
    WholeRest,
    HalfRest,
    QuarterRest,
    EighthRest,
    SixteenthRest,
    GClef,
    FClef,
    CClef,
    Barline,
    TallBarline,
    /// Numeric time-signature digit 0-9
    TimeDigit(u8),
    CommonTime,
    Sharp,
    Flat,
    Natural,
    Dot,
    LedgerLine,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolKind::WholeNote => write!(f, "whole-note"),
            SymbolKind::HalfNote => write!(f, "half-note"),
            SymbolKind::QuarterNote => write!(f, "quarter-note"),
            SymbolKind::EighthNote => write!(f, "eighth-note"),
            SymbolKind::SixteenthNote => write!(f, "sixteenth-note"),
            SymbolKind::LongaRest => write!(f, "longa-rest"),
            SymbolKind::BreveRest => write!(f, "breve-rest"),
            SymbolKind::WholeRest => write!(f, "whole-rest"),
            SymbolKind::HalfRest => write!(f, "half-rest"),
            SymbolKind::QuarterRest => write!(f, "quarter-rest"),
            SymbolKind::EighthRest => write!(f, "eighth-rest"),
            SymbolKind::SixteenthRest => write!(f, "sixteenth-rest"),
            SymbolKind::GClef => write!(f, "g-clef"),
            SymbolKind::FClef => write!(f, "f-clef"),
            SymbolKind::CClef => write!(f, "c-clef"),
            SymbolKind::Barline => write!(f, "barline"),
            SymbolKind::TallBarline => write!(f, "tall-barline"),
            SymbolKind::TimeDigit(d) => write!(f, "time-{}", d),
            SymbolKind::CommonTime => write!(f, "time-c"),
            SymbolKind::Sharp => write!(f, "sharp"),
            SymbolKind::Flat => write!(f, "flat"),
            SymbolKind::Natural => write!(f, "natural"),
            SymbolKind::Dot => write!(f, "dot"),
            SymbolKind::LedgerLine => write!(f, "ledger-line"),
        }
    }
}

/// Supplies candidate glyph geometry per symbol kind.
pub trait SymbolProvider {
    /// All equivalent candidates for a kind. Empty if the kind is unknown.
    fn candidates(&self, kind: SymbolKind) -> &[SpriteGroup];
}

/// Built-in provider with scaled geometric variants of every symbol.
#[derive(Debug, Clone)]
pub struct SyntheticSymbols {
    symbols: HashMap<SymbolKind, Vec<SpriteGroup>>,
}

const SCALES: [f64; 3] = [0.9, 1.0, 1.1];

fn scaled(value: i32, scale: f64) -> i32 {
    (value as f64 * scale).round() as i32
}

impl Default for SyntheticSymbols {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntheticSymbols {
    pub fn new() -> Self {
        let mut symbols: HashMap<SymbolKind, Vec<SpriteGroup>> = HashMap::new();

        for (variant, scale) in SCALES.iter().enumerate() {
            let mut add = |kind: SymbolKind, group: SpriteGroup| {
                symbols.entry(kind).or_default().push(group);
            };
            let glyph = |kind: SymbolKind, part: &str| format!("{}.{}.{}", kind, part, variant);
            let s = *scale;

            let whole = Sprite::centered(
                glyph(SymbolKind::WholeNote, "notehead"),
                scaled(36, s),
                scaled(24, s),
            );
            let mut group = SpriteGroup::new();
            group.add("notehead", whole);
            add(SymbolKind::WholeNote, group);

            let stemmed = [
                (SymbolKind::HalfNote, 0),
                (SymbolKind::QuarterNote, 0),
                (SymbolKind::EighthNote, 1),
                (SymbolKind::SixteenthNote, 2),
            ];
            for (kind, flags) in stemmed {
                add(kind, stem_note(&glyph(kind, "notehead"), s, flags));
            }

            // (kind, sprite name, width, height, top), unscaled
            let singles = [
                (SymbolKind::LongaRest, "rest", 14, 56, None),
                (SymbolKind::BreveRest, "rest", 14, 28, None),
                // hangs from its line
                (SymbolKind::WholeRest, "rest", 30, 12, Some(0)),
                // sits on its line
                (SymbolKind::HalfRest, "rest", 30, 12, Some(-12)),
                (SymbolKind::QuarterRest, "rest", 20, 70, None),
                (SymbolKind::EighthRest, "rest", 20, 44, None),
                (SymbolKind::SixteenthRest, "rest", 22, 64, None),
                (SymbolKind::GClef, "clef", 60, 170, Some(-100)),
                (SymbolKind::FClef, "clef", 60, 70, Some(-20)),
                (SymbolKind::CClef, "clef", 50, 120, Some(-60)),
                (SymbolKind::CommonTime, "symbol", 40, 56, None),
                (SymbolKind::Sharp, "symbol", 20, 60, None),
                // the bulb of a flat sits on its pitch
                (SymbolKind::Flat, "symbol", 18, 50, Some(-35)),
                (SymbolKind::Natural, "symbol", 16, 60, None),
                (SymbolKind::Dot, "symbol", 8, 8, None),
            ];
            for (kind, name, width, height, top) in singles {
                let top = top.map(|t| scaled(t, s));
                add(kind, single(name, glyph(kind, name), scaled(width, s), scaled(height, s), top));
            }

            for digit in 0..=9u8 {
                let kind = SymbolKind::TimeDigit(digit);
                add(kind, single("symbol", glyph(kind, "symbol"), scaled(34, s), scaled(52, s), None));
            }

            // barlines span the staff exactly and ledger lines keep their thickness
            let thickness = 3 + variant as i32;
            let kind = SymbolKind::Barline;
            add(kind, single("barline", glyph(kind, "barline"), thickness, 112, None));
            let kind = SymbolKind::TallBarline;
            add(kind, single("barline", glyph(kind, "barline"), thickness, 224, None));
            let kind = SymbolKind::LedgerLine;
            add(kind, single("symbol", glyph(kind, "symbol"), scaled(50, s), 3, None));
        }

        Self { symbols }
    }
}

impl SymbolProvider for SyntheticSymbols {
    fn candidates(&self, kind: SymbolKind) -> &[SpriteGroup] {
        self.symbols
            .get(&kind)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// A group with one sprite, horizontally centred. `top` defaults to
/// vertical centring.
fn single(name: &str, glyph: String, width: i32, height: i32, top: Option<i32>) -> SpriteGroup {
    let mut sprite = Sprite::centered(glyph, width, height);
    if let Some(top) = top {
        sprite.y = top;
    }
    let mut group = SpriteGroup::new();
    group.add(name, sprite);
    group
}

/// A notehead with an upward stem on its right and `flags` flags.
fn stem_note(notehead: &str, scale: f64, flags: usize) -> SpriteGroup {
    let head_width = scaled(30, scale);
    let head_height = scaled(24, scale);
    let stem_height = scaled(90, scale);
    let stem_x = head_width / 2 - 3;

    let mut group = SpriteGroup::new();
    group
        .add("notehead", Sprite::centered(notehead, head_width, head_height))
        .add("stem", Sprite::new("stem", stem_x, -stem_height, 3, stem_height))
        .add_point("stem_head", (stem_x + 1, -stem_height));

    for i in 0..flags {
        let name = if i == 0 { "flag_8" } else { "flag_16" };
        group.add(
            name,
            Sprite::new(
                name,
                stem_x + 3,
                -stem_height + scaled(14, scale) * i as i32,
                scaled(16, scale),
                scaled(40, scale),
            ),
        );
    }
    group
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_has_candidates() {
        let symbols = SyntheticSymbols::new();
        let mut kinds = vec![
            SymbolKind::WholeNote,
            SymbolKind::HalfNote,
            SymbolKind::QuarterNote,
            SymbolKind::EighthNote,
            SymbolKind::SixteenthNote,
            SymbolKind::LongaRest,
            SymbolKind::BreveRest,
            SymbolKind::WholeRest,
            SymbolKind::HalfRest,
            SymbolKind::QuarterRest,
            SymbolKind::EighthRest,
            SymbolKind::SixteenthRest,
            SymbolKind::GClef,
            SymbolKind::FClef,
            SymbolKind::CClef,
            SymbolKind::Barline,
            SymbolKind::TallBarline,
            SymbolKind::CommonTime,
            SymbolKind::Sharp,
            SymbolKind::Flat,
            SymbolKind::Natural,
            SymbolKind::Dot,
            SymbolKind::LedgerLine,
        ];
        kinds.extend((0..=9).map(SymbolKind::TimeDigit));

        for kind in kinds {
            assert_eq!(symbols.candidates(kind).len(), SCALES.len(), "{}", kind);
        }
    }

    #[test]
    fn test_stem_note_parts() {
        let symbols = SyntheticSymbols::new();
        for group in symbols.candidates(SymbolKind::SixteenthNote) {
            assert!(group.has_sprite("notehead"));
            assert!(group.has_sprite("stem"));
            assert!(group.has_sprite("flag_8"));
            assert!(group.has_sprite("flag_16"));

            // the stem head sits on top of the stem
            let stem = group.sprite("stem").unwrap();
            let stem_head = group.point("stem_head").unwrap();
            assert_eq!(stem_head.1, stem.y);
        }
        for group in symbols.candidates(SymbolKind::QuarterNote) {
            assert!(!group.has_sprite("flag_8"));
        }
    }

    #[test]
    fn test_unknown_digit_has_no_candidates() {
        let symbols = SyntheticSymbols::new();
        assert!(symbols.candidates(SymbolKind::TimeDigit(12)).is_empty());
    }

    #[test]
    fn test_display() {
        assert_eq!(SymbolKind::TimeDigit(3).to_string(), "time-3");
        assert_eq!(SymbolKind::GClef.to_string(), "g-clef");
    }
}
