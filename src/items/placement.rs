//! Per-variant sprite selection and placement.
//!
//! A layout pass runs three steps on every item, in order:
//! 1. `select_sprites` picks glyphs from the symbol provider and decides
//!    the stem direction
//! 2. `place_sprites` arranges the glyphs around the item origin
//! 3. `place_item` moves the origin onto the staff and reports the width
//!    the item occupies
//!
//! Beamed notes additionally get their stems stretched once the beam is
//! placed (`stretch_stem`).

use super::{DurationDots, ItemKind, LedgerLine, NoteKind, RestKind, ScoreItem};
use crate::context::LayoutContext;
use crate::error::HandstaffError;
use crate::options::CanvasOptions;
use crate::sprites::{Point, SpriteGroup, Stroke};
use crate::staff::ledger_line_pitches;
use crate::symbols::SymbolKind;

/// Sprites and points of a stemmed note that rotate with the stem.
const STEM_PARTS: [&str; 6] = ["notehead", "stem", "stem_head", "flag_8", "flag_16", "flag_32"];

/// Which way barlines extend beyond the staff.
fn barline_extension(options: &CanvasOptions) -> (bool, bool) {
    (options.barlines_up, options.barlines_down)
}

impl ScoreItem {
    /// Pick glyphs for this item. `beam_flipped` is the direction of the
    /// beam a beamed note belongs to.
    pub fn select_sprites(
        &mut self,
        ctx: &mut LayoutContext,
        options: &CanvasOptions,
        beam_flipped: Option<bool>,
    ) -> Result<(), HandstaffError> {
        let mut ledger_lines = Vec::new();

        let group = match &self.kind {
            ItemKind::Barline => {
                let (up, down) = barline_extension(options);
                let kind = if up || down {
                    SymbolKind::TallBarline
                } else {
                    SymbolKind::Barline
                };
                ctx.choose_group(kind)?
            }
            ItemKind::Clef { clef, .. } => ctx.choose_group(clef.symbol_kind())?,
            ItemKind::TimeSignature { top, bottom } => {
                let mut top_sprite = ctx.choose_sprite(SymbolKind::TimeDigit(*top))?;
                let mut bottom_sprite = ctx.choose_sprite(SymbolKind::TimeDigit(*bottom))?;
                top_sprite.y -= top_sprite.height / 2 + ctx.int(5, 10);
                bottom_sprite.y += bottom_sprite.height / 2 + ctx.int(5, 10);

                let mut group = SpriteGroup::new();
                group.add("top", top_sprite).add("bottom", bottom_sprite);
                group
            }
            ItemKind::WholeTimeSignature { .. } => ctx.choose_group(SymbolKind::CommonTime)?,
            ItemKind::KeySignature { accidentals } => {
                let mut group = SpriteGroup::new();
                for (i, (accidental, _)) in accidentals.iter().enumerate() {
                    let sprite = ctx.choose_sprite(accidental.symbol_kind())?;
                    group.add(&format!("item_{}", i), sprite);
                }
                group
            }
            ItemKind::Rest { kind, dots } => {
                let mut group = ctx.choose_group(kind.symbol_kind())?;
                select_duration_dots(&mut group, *dots, ctx)?;
                group
            }
            ItemKind::Note(note) => {
                let mut group = ctx.choose_group(note.kind.symbol_kind())?;
                for pitch in ledger_line_pitches(note.pitch) {
                    ledger_lines.push(LedgerLine {
                        pitch,
                        row: 0,
                        sprite: ctx.choose_sprite(SymbolKind::LedgerLine)?,
                    });
                }
                if let Some(accidental) = note.accidental {
                    group.add("accidental", ctx.choose_sprite(accidental.symbol_kind())?);
                }
                select_duration_dots(&mut group, note.dots, ctx)?;
                if note.staccato {
                    group.add("staccato", ctx.choose_sprite(SymbolKind::Dot)?);
                }
                group
            }
            ItemKind::InvisibleSlurEnd => SpriteGroup::new(),
        };

        self.sprites = group;
        self.ledger_lines = ledger_lines;
        self.stroke = None;

        self.flipped = match (self.is_stemmed(), self.pitch(), beam_flipped) {
            (true, _, Some(beam_flipped)) => beam_flipped,
            (true, Some(pitch), None) => {
                if options.randomize_stem_flips_for_pitches.contains(&pitch) {
                    ctx.coin()
                } else {
                    pitch > 0
                }
            }
            _ => false,
        };
        Ok(())
    }

    /// Arrange the selected glyphs around the item origin.
    pub fn place_sprites(&mut self, ctx: &mut LayoutContext, options: &CanvasOptions) {
        match &self.kind {
            ItemKind::Barline => {
                if let Some(barline) = self.sprites.sprite_mut("barline") {
                    match barline_extension(options) {
                        (true, false) => barline.y -= barline.height / 2,
                        (false, true) => barline.y += barline.height / 2,
                        _ => {}
                    }
                }
            }
            ItemKind::Rest { kind, dots } => {
                let rest_width = self.sprites.sprite("rest").map_or(0, |s| s.width);
                let y_offset = if *kind == RestKind::Whole { 10 } else { -10 };
                place_duration_dots(&mut self.sprites, *dots, rest_width, y_offset, ctx);
            }
            ItemKind::Note(note) => {
                let stemmed = note.kind != NoteKind::Whole;
                if stemmed && self.flipped {
                    self.sprites = self.sprites.create_flipped_copy(Some(&STEM_PARTS));
                }

                let (head_width, head_height) = self
                    .sprites
                    .sprite("notehead")
                    .map_or((0, 0), |s| (s.width, s.height));

                if let Some(accidental) = self.sprites.sprite_mut("accidental") {
                    accidental.x -= head_width / 2;
                    accidental.x -= accidental.width / 2;
                    accidental.x -= ctx.int(5, 25);
                }

                // dots go into a space
                let y_offset = match note.pitch {
                    p if p % 2 != 0 => 0,
                    p if p > 0 => 10,
                    _ => -10,
                };
                place_duration_dots(&mut self.sprites, note.dots, head_width, y_offset, ctx);

                if let Some(staccato) = self.sprites.sprite_mut("staccato") {
                    let sign = if stemmed && self.flipped { -1 } else { 1 };
                    staccato.y += sign * (head_height / 2);
                    staccato.y += sign * (staccato.height / 2);
                    staccato.y += sign * ctx.int(5, 15);
                }

                if let NoteKind::Flag(_) = note.kind {
                    if self.flipped {
                        for name in ["flag_8", "flag_16"] {
                            if let Some(flag) = self.sprites.sprite_mut(name) {
                                flag.mirror();
                                flag.x += flag.width;
                            }
                        }
                    }
                }
            }
            _ => {}
        }

        self.contribute_to_padding();
        self.sprites.recalculate_bounding_box();
    }

    fn contribute_to_padding(&mut self) {
        self.sprites.reset_padding();
        let extra = match &self.kind {
            ItemKind::Rest { kind, .. } if kind.is_long() => 20,
            ItemKind::InvisibleSlurEnd => 10,
            _ => 0,
        };
        self.sprites.padding_left += extra;
        self.sprites.padding_right += extra;
    }

    /// Move the item origin onto the staff with its left edge at `head`.
    /// Returns the width the item occupies.
    pub fn place_item(
        &mut self,
        head: i32,
        ctx: &mut LayoutContext,
        options: &CanvasOptions,
    ) -> i32 {
        if let ItemKind::KeySignature { accidentals } = &self.kind {
            let rows: Vec<i32> = accidentals
                .iter()
                .map(|(_, pitch)| ctx.staff().row(*pitch))
                .collect();
            return place_key_signature(&mut self.sprites, &rows, head, ctx);
        }

        self.sprites.position_x = head - self.sprites.left;
        self.sprites.position_y = ctx.staff().row(0);

        match &self.kind {
            ItemKind::Note(note) => {
                self.sprites.position_y = ctx.staff().row(note.pitch);
                for ledger in self.ledger_lines.iter_mut() {
                    ledger.row = ctx.staff().row(ledger.pitch);
                }
            }
            ItemKind::Clef { pitch, .. } => {
                self.sprites.position_y = ctx.staff().row(*pitch);
            }
            ItemKind::Rest { kind, .. } if *kind == RestKind::Whole => {
                self.sprites.position_y = ctx.staff().row(2);
            }
            ItemKind::Barline => match barline_extension(options) {
                (true, false) => self.sprites.position_y = ctx.staff().row(-4),
                (false, true) => self.sprites.position_y = ctx.staff().row(4),
                _ => {}
            },
            ItemKind::WholeTimeSignature { crossed: true } => {
                let height = self.sprites.sprite("symbol").map_or(0, |s| s.height);
                let reach = (height as f64 * 0.7) as i32;
                let (x, y) = (self.sprites.position_x, self.sprites.position_y);
                let from = (x + ctx.int(-5, 5) + 5, y - reach);
                let to = (x + ctx.int(-5, 5) - 5, y + reach);
                self.stroke = Some(Stroke::new(from, to));
            }
            _ => {}
        }

        self.sprites.width
    }

    /// Stretch the stem of a placed note so it is `stem_length` pixels long
    /// measured from the note origin.
    pub fn stretch_stem(&mut self, stem_length: i32) {
        let flipped = self.flipped;
        let sign = if flipped { -1 } else { 1 };

        let Some(stem) = self.sprites.sprite_mut("stem") else {
            return;
        };
        let mut lengthen = if flipped {
            stem_length - stem.y - stem.height
        } else {
            stem_length + stem.y
        };
        // stems starting far from the notehead would get a negative height
        if stem.height + lengthen < 1 {
            lengthen = 1 - stem.height;
        }
        stem.stretch_height(stem.height + lengthen);
        if !flipped {
            stem.y -= lengthen;
        }

        if let Some((x, y)) = self.sprites.point("stem_head") {
            self.sprites.add_point("stem_head", (x, y - sign * lengthen));
        }
        self.sprites.recalculate_bounding_box();
    }

    /// The tip of the stem in staff coordinates.
    pub fn global_stem_head(&self) -> Option<Point> {
        self.sprites
            .point("stem_head")
            .map(|p| self.sprites.to_global(p))
    }
}

fn select_duration_dots(
    group: &mut SpriteGroup,
    dots: DurationDots,
    ctx: &mut LayoutContext,
) -> Result<(), HandstaffError> {
    if dots == DurationDots::None {
        return Ok(());
    }
    group.add("duration_dot", ctx.choose_sprite(SymbolKind::Dot)?);
    if dots == DurationDots::Double {
        group.add("duration_dot_2", ctx.choose_sprite(SymbolKind::Dot)?);
    }
    Ok(())
}

/// Move centred dots right of a glyph `host_width` wide.
fn place_duration_dots(
    group: &mut SpriteGroup,
    dots: DurationDots,
    host_width: i32,
    y_offset: i32,
    ctx: &mut LayoutContext,
) {
    let Some(first) = group.sprite_mut("duration_dot") else {
        return;
    };
    first.x += host_width / 2;
    first.x += first.width / 2;
    first.x += ctx.int(5, 15);
    first.y += y_offset;
    first.y += ctx.int(-5, 5);
    let (first_x, first_y) = (first.x, first.y);

    if dots != DurationDots::Double {
        return;
    }
    if let Some(second) = group.sprite_mut("duration_dot_2") {
        second.x += first_x;
        second.y += first_y;
        second.x += second.width / 2;
        second.x += ctx.int(5, 15);
    }
}

/// Lay accidentals out left to right, each on its own row. The origin sits
/// at `head` on row 0, so sprite rows are absolute.
fn place_key_signature(
    group: &mut SpriteGroup,
    rows: &[i32],
    head: i32,
    ctx: &mut LayoutContext,
) -> i32 {
    group.position_x = head;
    group.position_y = 0;

    let count = group.sprites.len();
    let mut local_head = 0;
    for (i, ((_, sprite), row)) in group.sprites.iter_mut().zip(rows).enumerate() {
        sprite.x += sprite.width / 2 + local_head;
        sprite.y += row;
        local_head += sprite.width;
        if i + 1 < count {
            local_head += ctx.int(0, 5);
        }
    }

    group.recalculate_bounding_box();
    local_head
}
