//! # Canvas
//!
//! The score model of one staff: an ordered sequence of [`ScoreItem`]s plus
//! the [`Beam`]s and [`Slur`]s derived from them.
//!
//! ## Lifecycle
//! 1. items are appended with [`Canvas::add`] (or [`annotation_to_canvas`])
//! 2. [`Canvas::finish_construction`] derives beams and slurs exactly once;
//!    the item sequence is frozen from then on
//! 3. [`Canvas::layout`] selects sprites, sweeps the items left to right and
//!    places beams and slurs
//! 4. [`Canvas::render_geometry`] snapshots everything a renderer needs
//!
//! ## Arena
//! Items live in an arena and are addressed by [`ItemId`]. The sequence is a
//! separate list of ids, so synthesized slur ends can be inserted anywhere
//! without invalidating the ids held by beams and slurs.
//!
//! ## Example
//! ```rust
//! use handstaff::canvas::{annotation_to_canvas, Canvas};
//! use handstaff::context::LayoutContext;
//!
//! let mut canvas = Canvas::default();
//! annotation_to_canvas(&mut canvas, "clef.G-2 e=-4 =e=-4 =e-4 | q-4 ( ) q-4").unwrap();
//!
//! let mut ctx = LayoutContext::seeded(1);
//! let geometry = canvas.render_geometry(&mut ctx).unwrap();
//! assert_eq!(geometry.beams.len(), 1);
//! assert_eq!(geometry.slurs.len(), 1);
//! ```

use crate::annotation::{parse, stringify};
use crate::beam::Beam;
use crate::context::LayoutContext;
use crate::error::HandstaffError;
use crate::items::{ItemKind, LedgerLine, ScoreItem};
use crate::options::CanvasOptions;
use crate::slur::Slur;
use crate::sprites::{Point, SpriteGroup, Stroke};
use crate::staff::StaffGeometry;
use log::{debug, warn};
use rand::Rng;
use serde::Serialize;
use std::collections::HashMap;

/// Handle of an item in the canvas arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ItemId(usize);

impl ItemId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct Canvas {
    items: Vec<ScoreItem>,
    order: Vec<ItemId>,
    beams: Vec<Beam>,
    slurs: Vec<Slur>,
    /// Item to the index of its beam
    beam_index: HashMap<ItemId, usize>,
    options: CanvasOptions,
    finished: bool,
}

impl Canvas {
    pub fn new(options: CanvasOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn options(&self) -> &CanvasOptions {
        &self.options
    }

    /// Append an item to the sequence.
    pub fn add(&mut self, item: ScoreItem) -> Result<ItemId, HandstaffError> {
        if self.finished {
            return Err(HandstaffError::ConstructionFinished);
        }
        Ok(self.push(item))
    }

    fn push(&mut self, item: ScoreItem) -> ItemId {
        let id = ItemId(self.items.len());
        self.items.push(item);
        self.order.push(id);
        id
    }

    pub fn item(&self, id: ItemId) -> &ScoreItem {
        &self.items[id.0]
    }

    /// Item ids in sequence order.
    pub fn order(&self) -> &[ItemId] {
        &self.order
    }

    /// Items in sequence order.
    pub fn items(&self) -> impl Iterator<Item = &ScoreItem> + '_ {
        self.order.iter().map(move |id| &self.items[id.0])
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn beams(&self) -> &[Beam] {
        &self.beams
    }

    pub fn slurs(&self) -> &[Slur] {
        &self.slurs
    }

    /// The beam an item belongs to.
    pub fn beam_of(&self, id: ItemId) -> Option<&Beam> {
        self.beam_index.get(&id).map(|&b| &self.beams[b])
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Derive beams and slurs and freeze the item sequence.
    pub fn finish_construction<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<(), HandstaffError> {
        if self.finished {
            return Err(HandstaffError::AlreadyFinished);
        }

        let beams = self.derive_beams()?;
        for beam in &beams {
            beam.assign_beam_counts(&mut self.items, rng);
        }
        self.beam_index = beams
            .iter()
            .enumerate()
            .flat_map(|(b, beam)| beam.items.iter().map(move |&id| (id, b)))
            .collect();
        self.beams = beams;

        self.slurs = self.derive_slurs();
        self.finished = true;

        debug!(
            "Canvas finished with {} items, {} beams and {} slurs",
            self.order.len(),
            self.beams.len(),
            self.slurs.len()
        );
        Ok(())
    }

    /// Group consecutive beamed notes into beams. Other items do not
    /// interrupt an open beam.
    fn derive_beams(&self) -> Result<Vec<Beam>, HandstaffError> {
        let mut beams = Vec::new();
        let mut open: Option<Vec<ItemId>> = None;

        for &id in &self.order {
            let item = &self.items[id.0];
            let Some(beaming) = item.beaming() else {
                continue;
            };
            let token = || item.item_token().unwrap_or_default();

            match open.as_mut() {
                Some(members) => {
                    members.push(id);
                    if !beaming.right_beamed {
                        let members = std::mem::take(members);
                        beams.push(Beam::new(members, &self.items)?);
                        open = None;
                    }
                }
                None => match (beaming.left_beamed, beaming.right_beamed) {
                    (false, true) => open = Some(vec![id]),
                    (true, true) => return Err(HandstaffError::UnterminatedBeam { token: token() }),
                    _ => {
                        return Err(HandstaffError::MalformedBeam {
                            message: format!("'{}' is not inside an open beam", token()),
                        })
                    }
                },
            }
        }

        if let Some(last) = open.and_then(|members| members.last().copied()) {
            return Err(HandstaffError::UnterminatedBeam {
                token: self.items[last.0].item_token().unwrap_or_default(),
            });
        }
        Ok(beams)
    }

    /// Pair slur starts with slur ends, synthesizing invisible ends for
    /// unmatched brackets.
    fn derive_slurs(&mut self) -> Vec<Slur> {
        let mut slurs = Vec::new();
        let mut pending: Vec<ItemId> = Vec::new();
        let mut order = Vec::with_capacity(self.order.len());

        for id in std::mem::take(&mut self.order) {
            let (slurable, slur_start, slur_end) = {
                let item = &self.items[id.0];
                (item.is_slurable(), item.slur_start, item.slur_end)
            };
            if !slurable {
                order.push(id);
                continue;
            }

            if slur_end {
                let start = match pending.pop() {
                    Some(start) => start,
                    None => {
                        let start = ItemId(self.items.len());
                        self.items.push(ScoreItem::invisible_slur_end(true));
                        order.push(start);
                        start
                    }
                };
                slurs.push(Slur::new(start, id));
            }
            order.push(id);
            if slur_start {
                pending.push(id);
            }
        }

        while let Some(start) = pending.pop() {
            let end = ItemId(self.items.len());
            self.items.push(ScoreItem::invisible_slur_end(false));
            let position = order.iter().position(|&o| o == start).map_or(order.len(), |p| p + 1);
            order.insert(position, end);
            slurs.push(Slur::new(start, end));
        }

        self.order = order;
        slurs
    }

    /// Tokens of all items in sequence order.
    pub fn annotation_tokens(&self) -> Vec<String> {
        self.items().flat_map(ScoreItem::annotation_tokens).collect()
    }

    /// Lay the staff out. Finishes construction first if needed.
    /// Returns the width of the laid out staff.
    pub fn layout(&mut self, ctx: &mut LayoutContext) -> Result<i32, HandstaffError> {
        self.options.validate()?;
        if !self.finished {
            self.finish_construction(ctx.rng())?;
        }

        for &id in &self.order {
            let beam_flipped = self.beam_index.get(&id).map(|&b| self.beams[b].flipped);
            self.items[id.0].select_sprites(ctx, &self.options, beam_flipped)?;
        }
        for &id in &self.order {
            self.items[id.0].place_sprites(ctx, &self.options);
        }

        let options = &self.options;
        let mut head = 0;
        for &id in &self.order {
            let p = options.random_space_probability;
            if p > 0.0 && ctx.chance(p) {
                head += ctx.int(options.random_space_size.0, options.random_space_size.1);
            }
            head += ctx.int(options.padding_range.0, options.padding_range.1);
            head += self.items[id.0].place_item(head, ctx, options);
            head += ctx.int(options.padding_range.0, options.padding_range.1);
        }

        for beam in self.beams.iter_mut() {
            beam.place(&mut self.items, ctx.rng());
        }
        for slur in self.slurs.iter_mut() {
            slur.place(&self.items, ctx.rng());
        }

        debug!("Laid out {} items over {} pixels", self.order.len(), head);
        Ok(head)
    }

    /// Lay the staff out and snapshot the result.
    pub fn render_geometry(
        &mut self,
        ctx: &mut LayoutContext,
    ) -> Result<ScoreGeometry, HandstaffError> {
        let width = self.layout(ctx)?;

        let positions: HashMap<ItemId, usize> = self
            .order
            .iter()
            .enumerate()
            .map(|(position, &id)| (id, position))
            .collect();
        let position = |id: &ItemId| positions.get(id).copied().unwrap_or_default();

        let items = self
            .items()
            .map(|item| ItemGeometry {
                kind: item.kind.clone(),
                tokens: item.annotation_tokens(),
                flipped: item.flipped,
                sprites: item.sprites.clone(),
                ledger_lines: item.ledger_lines.clone(),
                stroke: item.stroke,
            })
            .collect();

        let beams = self
            .beams
            .iter()
            .filter_map(|beam| {
                let line = beam.line.as_ref()?;
                Some(BeamGeometry {
                    members: beam.items.iter().map(position).collect(),
                    flipped: beam.flipped,
                    pivot: line.pivot,
                    slope: line.slope,
                    strokes: beam.strokes.clone(),
                })
            })
            .collect();

        let slurs = self
            .slurs
            .iter()
            .filter_map(|slur| {
                let placement = slur.placement.as_ref()?;
                Some(SlurGeometry {
                    start: position(&slur.start),
                    end: position(&slur.end),
                    flipped: placement.flipped,
                    tail_to_tail: placement.tail_to_tail,
                    start_point: placement.start_point,
                    end_point: placement.end_point,
                    center: placement.center,
                    coefficients: placement.coefficients?,
                })
            })
            .collect();

        Ok(ScoreGeometry {
            width,
            staff: ctx.staff().clone(),
            items,
            beams,
            slurs,
        })
    }
}

/// Everything a renderer needs to paint one laid out staff.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreGeometry {
    pub width: i32,
    pub staff: StaffGeometry,
    pub items: Vec<ItemGeometry>,
    pub beams: Vec<BeamGeometry>,
    /// Slurs without a curve are left out
    pub slurs: Vec<SlurGeometry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemGeometry {
    pub kind: ItemKind,
    pub tokens: Vec<String>,
    pub flipped: bool,
    /// Origin, bounding box and sprites
    pub sprites: SpriteGroup,
    pub ledger_lines: Vec<LedgerLine>,
    pub stroke: Option<Stroke>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BeamGeometry {
    /// Positions of the members in the item list
    pub members: Vec<usize>,
    pub flipped: bool,
    pub pivot: Point,
    pub slope: f64,
    pub strokes: Vec<Stroke>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlurGeometry {
    pub start: usize,
    pub end: usize,
    pub flipped: bool,
    pub tail_to_tail: bool,
    pub start_point: Point,
    pub end_point: Point,
    pub center: Point,
    /// `[a, b, c]` of `y = a x^2 + b x + c`
    pub coefficients: [f64; 3],
}

/// Parse an annotation and append its items to a canvas.
///
/// Parser warnings are logged and the repaired annotation is used. Fails
/// if a group cannot become an item, or if the items do not reproduce the
/// repaired annotation.
pub fn annotation_to_canvas(canvas: &mut Canvas, annotation: &str) -> Result<(), HandstaffError> {
    let parsed = parse(annotation);
    for warning in &parsed.warnings {
        warn!("{}", warning);
    }

    let items = parsed
        .groups
        .iter()
        .map(ScoreItem::from_group)
        .collect::<Result<Vec<_>, _>>()?;

    if canvas.is_finished() {
        return Err(HandstaffError::ConstructionFinished);
    }

    let given = stringify(&parsed.groups);
    let generated = items
        .iter()
        .flat_map(ScoreItem::annotation_tokens)
        .collect::<Vec<_>>()
        .join(" ");
    if given != generated {
        return Err(HandstaffError::AnnotationMismatch { given, generated });
    }

    for item in items {
        canvas.add(item)?;
    }
    Ok(())
}
