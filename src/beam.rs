//! # Beams
//!
//! A [`Beam`] bridges consecutive beamed notes. Beams are derived by the
//! canvas from the right/left beamed flags of its notes and are never built
//! by hand.
//!
//! ## Shape
//! A beam holds at least two notes. The first note is beamed to the right
//! only, the last note to the left only and every note in between to both
//! sides. [`Beam::new`] rejects anything else.
//!
//! ## Placement
//! All members share one straight line:
//! 1. every member gets a minimum stem tip `(max(beams, 2) + 1) * BEAM_SPACING`
//!    above its notehead (below if the beam is flipped)
//! 2. the topmost tip (bottommost when flipped) is the pivot
//! 3. the slopes from the pivot to the other tips are candidates; a
//!    candidate is dropped if its line would cut into any tip by more than
//!    [`SLOPE_SLACK`] pixels
//! 4. the candidate closest to a least squares fit through all tips wins
//! 5. near-flat slopes get a little random tilt, then the slope is clamped
//!    to [`MAX_SLOPE`]
//!
//! Every stem is then stretched to meet the line and the strokes between
//! neighbouring members are computed.

use crate::canvas::ItemId;
use crate::error::HandstaffError;
use crate::items::ScoreItem;
use crate::sprites::{Point, Stroke};
use log::warn;
use rand::Rng;
use std::cmp::Ordering;

pub const BEAM_THICKNESS: i32 = 4;
/// Vertical distance between stacked beams
pub const BEAM_SPACING: i32 = 16;
pub const MAX_SLOPE: f64 = 0.35;
/// Magnitude of the random tilt given to flat beams
pub const SLOPE_JITTER: f64 = 0.1;
/// Pixels a beam line may cut into a minimum stem tip
pub const SLOPE_SLACK: f64 = 5.0;

const FLAT_SLOPE: f64 = 0.01;

/// The straight line all stems of a beam end on.
#[derive(Debug, Clone, PartialEq)]
pub struct BeamLine {
    pub pivot: Point,
    pub slope: f64,
    /// Minimum stem tips of the members
    pub tips: Vec<Point>,
}

impl BeamLine {
    pub fn y_at(&self, x: i32) -> f64 {
        (x - self.pivot.0) as f64 * self.slope + self.pivot.1 as f64
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Beam {
    pub items: Vec<ItemId>,
    /// Stems point down
    pub flipped: bool,
    /// Set once the beam is placed
    pub line: Option<BeamLine>,
    pub strokes: Vec<Stroke>,
}

impl Beam {
    /// Build a beam over `items`, checking the beamed flags of every member.
    pub fn new(items: Vec<ItemId>, arena: &[ScoreItem]) -> Result<Self, HandstaffError> {
        if items.len() < 2 {
            return Err(HandstaffError::MalformedBeam {
                message: format!("a beam needs at least 2 notes, got {}", items.len()),
            });
        }

        let last = items.len() - 1;
        let mut pitch_sum = 0;
        for (i, id) in items.iter().enumerate() {
            let item = &arena[id.index()];
            let beaming = item.beaming().ok_or_else(|| HandstaffError::MalformedBeam {
                message: format!("member {} is not a beamed note", i),
            })?;
            let expected = (i > 0, i < last);
            if (beaming.left_beamed, beaming.right_beamed) != expected {
                return Err(HandstaffError::MalformedBeam {
                    message: format!(
                        "member {} of {} is beamed left={} right={}",
                        i,
                        items.len(),
                        beaming.left_beamed,
                        beaming.right_beamed
                    ),
                });
            }
            pitch_sum += item.pitch().unwrap_or(0);
        }

        Ok(Self {
            items,
            flipped: pitch_sum > 0,
            line: None,
            strokes: Vec::new(),
        })
    }

    /// Split the beam count of every member into a left and a right part.
    pub fn assign_beam_counts<R: Rng + ?Sized>(&self, arena: &mut [ScoreItem], rng: &mut R) {
        let beams: Vec<u8> = self
            .items
            .iter()
            .map(|id| arena[id.index()].beaming().map_or(1, |b| b.beams))
            .collect();

        for (id, (left, right)) in self.items.iter().zip(sided_beam_counts(&beams, rng)) {
            let item = &mut arena[id.index()];
            item.left_beam_count = left;
            item.right_beam_count = right;
        }
    }

    /// Fit the beam line, stretch the member stems onto it and compute the
    /// strokes. Members must already be placed on the staff.
    pub fn place<R: Rng + ?Sized>(&mut self, arena: &mut [ScoreItem], rng: &mut R) {
        let notes: Vec<(Point, u8)> = self
            .items
            .iter()
            .map(|id| {
                let item = &arena[id.index()];
                (
                    (item.sprites.position_x, item.sprites.position_y),
                    item.beaming().map_or(1, |b| b.beams),
                )
            })
            .collect();
        let line = fit_beam_line(&notes, self.flipped, rng);

        for id in &self.items {
            let item = &mut arena[id.index()];
            let y = line.y_at(item.sprites.position_x);
            let stem_length = (item.sprites.position_y as f64 - y).abs().round() as i32;
            item.stretch_stem(stem_length);
        }
        self.line = Some(line);

        self.strokes.clear();
        for pair in self.items.windows(2) {
            let (start, end) = (&arena[pair[0].index()], &arena[pair[1].index()]);
            let (Some(a), Some(b)) = (start.global_stem_head(), end.global_stem_head()) else {
                continue;
            };
            self.strokes.extend(pair_strokes(
                a,
                b,
                start.right_beam_count,
                end.left_beam_count,
                self.flipped,
                rng,
            ));
        }
    }
}

/// Stem length a note with `beams` beams needs at least.
pub fn min_stem_length(beams: u8) -> i32 {
    (beams.max(2) as i32 + 1) * BEAM_SPACING
}

/// Left and right beam counts for a run of notes with the given beam counts.
///
/// The ends only connect inwards. An interior note connects to each side
/// with as many beams as the neighbour shares; beams left over go entirely
/// to one random side.
pub fn sided_beam_counts<R: Rng + ?Sized>(beams: &[u8], rng: &mut R) -> Vec<(u8, u8)> {
    let last = beams.len().saturating_sub(1);
    beams
        .iter()
        .enumerate()
        .map(|(i, &own)| {
            if i == 0 {
                return (0, own);
            }
            if i == last {
                return (own, 0);
            }
            let mut left = beams[i - 1].min(own);
            let mut right = beams[i + 1].min(own);
            let remaining = own.saturating_sub(left.max(right));
            if remaining > 0 {
                if rng.gen::<bool>() {
                    left += remaining;
                } else {
                    right += remaining;
                }
            }
            (left, right)
        })
        .collect()
}

/// Choose the beam line for notes given as (notehead position, beam count).
pub fn fit_beam_line<R: Rng + ?Sized>(
    notes: &[(Point, u8)],
    flipped: bool,
    rng: &mut R,
) -> BeamLine {
    let sign = if flipped { -1 } else { 1 };
    let sign_f = sign as f64;

    let tips: Vec<Point> = notes
        .iter()
        .map(|&((x, y), beams)| (x, y - sign * min_stem_length(beams)))
        .collect();

    let mut pivot = tips.first().copied().unwrap_or((0, 0));
    for &tip in tips.iter().skip(1) {
        if sign * tip.1 < sign * pivot.1 {
            pivot = tip;
        }
    }

    let clears = |slope: f64| {
        tips.iter().all(|&(x, y)| {
            let line_y = (x - pivot.0) as f64 * slope + pivot.1 as f64;
            (line_y - SLOPE_SLACK * sign_f) * sign_f <= y as f64 * sign_f
        })
    };
    let candidates: Vec<f64> = tips
        .iter()
        .filter(|&&tip| tip != pivot && tip.0 != pivot.0)
        .map(|&(x, y)| (pivot.1 - y) as f64 / (pivot.0 - x) as f64)
        .filter(|&slope| clears(slope))
        .collect();

    let fitted = fitted_slope(&tips);
    let mut slope = match candidates.iter().copied().min_by(|a, b| {
        (a - fitted)
            .abs()
            .partial_cmp(&(b - fitted).abs())
            .unwrap_or(Ordering::Equal)
    }) {
        Some(slope) => slope,
        None => {
            warn!("No beam slope clears all {} stems, using a flat beam", tips.len());
            0.0
        }
    };

    if slope.abs() < FLAT_SLOPE {
        slope = rng.gen_range(-SLOPE_JITTER..=SLOPE_JITTER);
    }
    slope = slope.clamp(-MAX_SLOPE, MAX_SLOPE);

    // tilting and clamping may push the line into a tip; move it away
    let overshoot = tips
        .iter()
        .map(|&(x, y)| ((x - pivot.0) as f64 * slope + pivot.1 as f64 - y as f64) * sign_f)
        .fold(0.0, f64::max);
    let excess = overshoot - SLOPE_SLACK;
    if excess > 0.0 {
        pivot.1 -= sign * excess.ceil() as i32;
    }

    BeamLine { pivot, slope, tips }
}

/// Slope of the total least squares line through `points`.
fn fitted_slope(points: &[Point]) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.0 as f64).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.1 as f64).sum::<f64>() / n;

    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for &(x, y) in points {
        let dx = x as f64 - mean_x;
        let dy = y as f64 - mean_y;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }
    (0.5 * (2.0 * sxy).atan2(sxx - syy)).tan()
}

/// Strokes between two neighbouring stem heads `a` and `b`.
///
/// Shared beams span the whole gap. Beams only the left note has end in a
/// stub 60-80% of the way from `b` towards `a`, beams only the right note
/// has start in a stub 20-40% of the way.
pub fn pair_strokes<R: Rng + ?Sized>(
    a: Point,
    b: Point,
    left_beams: u8,
    right_beams: u8,
    flipped: bool,
    rng: &mut R,
) -> Vec<Stroke> {
    let step = if flipped { -BEAM_SPACING } else { BEAM_SPACING };
    let shared = left_beams.min(right_beams);
    let (mut a, mut b) = (a, b);
    let mut strokes = Vec::new();

    for _ in 0..shared {
        strokes.push(Stroke::new(a, b));
        a.1 += step;
        b.1 += step;
    }
    for _ in shared..left_beams {
        let t = rng.gen_range(0.6..0.8);
        strokes.push(Stroke::new(a, lerp(a, b, t)));
        a.1 += step;
        b.1 += step;
    }
    for _ in shared..right_beams {
        let t = rng.gen_range(0.2..0.4);
        strokes.push(Stroke::new(lerp(a, b, t), b));
        a.1 += step;
        b.1 += step;
    }
    strokes
}

/// `a * t + b * (1 - t)`
fn lerp(a: Point, b: Point, t: f64) -> Point {
    (
        (a.0 as f64 * t + b.0 as f64 * (1.0 - t)).round() as i32,
        (a.1 as f64 * t + b.1 as f64 * (1.0 - t)).round() as i32,
    )
}
