//! # Slurs
//!
//! A [`Slur`] connects two slurable items: notes, barlines or invisible slur
//! ends. Slurs are derived by the canvas from the slur brackets of its items.
//!
//! ## Direction
//! The slur bends away from the stems:
//! - both ends stemmed the same way: that way, attached below (or above) the
//!   noteheads
//! - both ends stemmed, opposite ways: a random way, attached below or above
//! - one end stemmed: that end's way, attached below or above
//! - no end stemmed: a random way, attached tail to tail at the sides of
//!   the noteheads
//!
//! ## Curve
//! The slur is the parabola `y = a x^2 + b x + c` through both attachment
//! points and a centre point bent by `width / 5` pixels, kept within
//! `0..=20`.

use crate::canvas::ItemId;
use crate::items::ScoreItem;
use crate::sprites::Point;
use log::debug;
use rand::Rng;
use serde::Serialize;

/// Gap between a notehead and the slur end
pub const SLUR_OFFSET: i32 = 8;
/// Largest bend of the slur centre in pixels
pub const MAX_SLUR_BEND: i32 = 20;

const SINGULAR_PIVOT: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlurPlacement {
    /// Bends upwards
    pub flipped: bool,
    pub tail_to_tail: bool,
    pub start_point: Point,
    pub end_point: Point,
    pub center: Point,
    /// `[a, b, c]`, or `None` when the points share an x coordinate
    pub coefficients: Option<[f64; 3]>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Slur {
    pub start: ItemId,
    pub end: ItemId,
    /// Set once the slur is placed
    pub placement: Option<SlurPlacement>,
}

impl Slur {
    pub fn new(start: ItemId, end: ItemId) -> Self {
        Self {
            start,
            end,
            placement: None,
        }
    }

    /// Compute the curve. Both ends must already be placed on the staff.
    pub fn place<R: Rng + ?Sized>(&mut self, arena: &[ScoreItem], rng: &mut R) {
        let start = &arena[self.start.index()];
        let end = &arena[self.end.index()];

        let (flipped, tail_to_tail) = slur_direction(start, end, rng);
        let (start_point, end_point) = attachment_points(start, end, flipped, tail_to_tail);

        let width = end_point.0 - start_point.0;
        // overlapping tail to tail ends give a negative width
        let bend = ((width as f64 / 5.0) as i32).clamp(0, MAX_SLUR_BEND);
        let center = (
            (start_point.0 + end_point.0).div_euclid(2),
            (start_point.1 + end_point.1).div_euclid(2) + if flipped { -bend } else { bend },
        );

        let coefficients = fit_parabola([start_point, center, end_point]);
        if coefficients.is_none() {
            debug!(
                "Slur from {:?} to {:?} has no curve, skipping it",
                start_point, end_point
            );
        }

        self.placement = Some(SlurPlacement {
            flipped,
            tail_to_tail,
            start_point,
            end_point,
            center,
            coefficients,
        });
    }
}

/// Decide `(flipped, tail_to_tail)` for a slur between two items.
pub fn slur_direction<R: Rng + ?Sized>(
    start: &ScoreItem,
    end: &ScoreItem,
    rng: &mut R,
) -> (bool, bool) {
    match (start.is_stemmed(), end.is_stemmed()) {
        (true, true) if start.flipped == end.flipped => (start.flipped, false),
        (true, true) => (rng.gen(), false),
        (true, false) => (start.flipped, false),
        (false, true) => (end.flipped, false),
        (false, false) => (rng.gen(), true),
    }
}

fn attachment_points(
    start: &ScoreItem,
    end: &ScoreItem,
    flipped: bool,
    tail_to_tail: bool,
) -> (Point, Point) {
    let start_note = note_attachment(start, true, flipped, tail_to_tail);
    let end_note = note_attachment(end, false, flipped, tail_to_tail);

    // items without a notehead take their height from the other end
    let start_point = start_note.unwrap_or_else(|| {
        let y = end_note.map_or(start.sprites.position_y, |p| p.1);
        (side_x(start, true), y)
    });
    let end_point = end_note.unwrap_or_else(|| {
        let y = start_note.map_or(end.sprites.position_y, |p| p.1);
        (side_x(end, false), y)
    });
    (start_point, end_point)
}

fn note_attachment(
    item: &ScoreItem,
    is_start: bool,
    flipped: bool,
    tail_to_tail: bool,
) -> Option<Point> {
    if !item.is_note() {
        return None;
    }
    let (head_width, head_height) = item
        .sprites
        .sprite("notehead")
        .map_or((0, 0), |s| (s.width, s.height));
    let (x, y) = (item.sprites.position_x, item.sprites.position_y);

    let point = if tail_to_tail {
        let side = if is_start { 1 } else { -1 };
        (x + side * (head_width / 2 + SLUR_OFFSET), y)
    } else {
        let sign = if flipped { -1 } else { 1 };
        (x, y + sign * (head_height / 2 + SLUR_OFFSET))
    };
    Some(point)
}

fn side_x(item: &ScoreItem, is_start: bool) -> i32 {
    let side = if is_start { -1 } else { 1 };
    item.sprites.position_x + side * (item.sprites.width / 2 + SLUR_OFFSET)
}

/// Coefficients of the parabola through three points, by Gaussian
/// elimination with partial pivoting. `None` if the system is singular.
pub fn fit_parabola(points: [Point; 3]) -> Option<[f64; 3]> {
    let mut m = points.map(|(x, y)| {
        let x = x as f64;
        [x * x, x, 1.0, y as f64]
    });

    for col in 0..3 {
        let pivot_row = (col..3).max_by(|&a, &b| {
            m[a][col]
                .abs()
                .partial_cmp(&m[b][col].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;
        if m[pivot_row][col].abs() < SINGULAR_PIVOT {
            return None;
        }
        m.swap(col, pivot_row);

        for row in col + 1..3 {
            let factor = m[row][col] / m[col][col];
            for k in col..4 {
                m[row][k] -= factor * m[col][k];
            }
        }
    }

    let mut solution = [0.0; 3];
    for row in (0..3).rev() {
        let tail: f64 = (row + 1..3).map(|k| m[row][k] * solution[k]).sum();
        solution[row] = (m[row][3] - tail) / m[row][row];
    }
    Some(solution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::NoteKind;
    use crate::sprites::Sprite;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn placed_note(kind: NoteKind, x: i32, y: i32, flipped: bool) -> ScoreItem {
        let mut item = ScoreItem::note(kind, 0);
        item.sprites.add("notehead", Sprite::centered("notehead", 30, 24));
        item.sprites.position_x = x;
        item.sprites.position_y = y;
        item.sprites.recalculate_bounding_box();
        item.flipped = flipped;
        item
    }

    fn evaluate(coefficients: [f64; 3], x: i32) -> f64 {
        let x = x as f64;
        coefficients[0] * x * x + coefficients[1] * x + coefficients[2]
    }

    #[test]
    fn test_same_stem_direction() {
        let mut rng = StdRng::seed_from_u64(1);
        let up = placed_note(NoteKind::Quarter, 0, 0, false);
        let down = placed_note(NoteKind::Half, 0, 0, true);
        assert_eq!(slur_direction(&up, &up, &mut rng), (false, false));
        assert_eq!(slur_direction(&down, &down, &mut rng), (true, false));
    }

    #[test]
    fn test_opposite_stems_attach_below() {
        let mut rng = StdRng::seed_from_u64(2);
        let up = placed_note(NoteKind::Quarter, 0, 0, false);
        let down = placed_note(NoteKind::Quarter, 0, 0, true);
        let mut seen = [false, false];
        for _ in 0..50 {
            let (flipped, tail_to_tail) = slur_direction(&up, &down, &mut rng);
            assert!(!tail_to_tail);
            seen[flipped as usize] = true;
        }
        assert_eq!(seen, [true, true]);
    }

    #[test]
    fn test_one_stemmed_end_decides() {
        let mut rng = StdRng::seed_from_u64(3);
        let down = placed_note(NoteKind::Quarter, 0, 0, true);
        let whole = placed_note(NoteKind::Whole, 0, 0, false);
        let barline = ScoreItem::barline();
        assert_eq!(slur_direction(&down, &whole, &mut rng), (true, false));
        assert_eq!(slur_direction(&barline, &down, &mut rng), (true, false));
    }

    #[test]
    fn test_unstemmed_ends_go_tail_to_tail() {
        let mut rng = StdRng::seed_from_u64(4);
        let whole = placed_note(NoteKind::Whole, 0, 0, false);
        let (_, tail_to_tail) = slur_direction(&whole, &ScoreItem::barline(), &mut rng);
        assert!(tail_to_tail);
    }

    #[test]
    fn test_below_note_attachment() {
        let arena = vec![
            placed_note(NoteKind::Quarter, 100, 200, false),
            placed_note(NoteKind::Quarter, 300, 180, false),
        ];
        let mut slur = Slur::new(ItemId::new(0), ItemId::new(1));
        slur.place(&arena, &mut StdRng::seed_from_u64(5));

        let placement = slur.placement.unwrap();
        assert!(!placement.flipped);
        assert_eq!(placement.start_point, (100, 220));
        assert_eq!(placement.end_point, (300, 200));
        // width 200 bends by the maximum
        assert_eq!(placement.center, (200, 230));

        let coefficients = placement.coefficients.unwrap();
        for (x, y) in [placement.start_point, placement.center, placement.end_point] {
            assert!((evaluate(coefficients, x) - y as f64).abs() < 1e-6);
        }
        // opens upwards on screen, y grows downwards
        assert!(coefficients[0] < 0.0);
    }

    #[test]
    fn test_tail_to_tail_attachment() {
        let mut arena = vec![
            placed_note(NoteKind::Whole, 100, 200, false),
            placed_note(NoteKind::Whole, 160, 200, false),
        ];
        arena[1].sprites.sprite_mut("notehead").unwrap().width = 40;
        let mut slur = Slur::new(ItemId::new(0), ItemId::new(1));
        slur.place(&arena, &mut StdRng::seed_from_u64(6));

        let placement = slur.placement.unwrap();
        assert!(placement.tail_to_tail);
        assert_eq!(placement.start_point, (123, 200));
        assert_eq!(placement.end_point, (132, 200));
        let bend = if placement.flipped { -1 } else { 1 };
        assert_eq!(placement.center, (127, 200 + bend));
    }

    #[test]
    fn test_overlapping_ends_do_not_bend_backwards() {
        let arena = vec![
            placed_note(NoteKind::Whole, 100, 200, false),
            placed_note(NoteKind::Whole, 120, 200, false),
        ];
        let mut slur = Slur::new(ItemId::new(0), ItemId::new(1));
        slur.place(&arena, &mut StdRng::seed_from_u64(8));

        let placement = slur.placement.unwrap();
        assert!(placement.tail_to_tail);
        assert_eq!(placement.start_point, (123, 200));
        assert_eq!(placement.end_point, (97, 200));
        assert_eq!(placement.center, (110, 200));
    }

    #[test]
    fn test_barline_takes_height_from_note() {
        let mut barline = ScoreItem::barline();
        barline.sprites.add("barline", Sprite::centered("barline", 4, 112));
        barline.sprites.position_x = 50;
        barline.sprites.position_y = 140;
        barline.sprites.recalculate_bounding_box();

        let arena = vec![barline, placed_note(NoteKind::Quarter, 200, 100, true)];
        let mut slur = Slur::new(ItemId::new(0), ItemId::new(1));
        slur.place(&arena, &mut StdRng::seed_from_u64(7));

        let placement = slur.placement.unwrap();
        assert!(placement.flipped);
        assert_eq!(placement.end_point, (200, 80));
        assert_eq!(placement.start_point, (40, 80));
    }

    #[test]
    fn test_coincident_points_are_singular() {
        assert_eq!(fit_parabola([(10, 0), (10, 5), (10, 0)]), None);
        assert_eq!(fit_parabola([(10, 0), (20, 5), (20, 0)]), None);
    }

    #[test]
    fn test_parabola_through_points() {
        let coefficients = fit_parabola([(0, 0), (1, 1), (2, 4)]).unwrap();
        assert!((coefficients[0] - 1.0).abs() < 1e-9);
        assert!(coefficients[1].abs() < 1e-9);
        assert!(coefficients[2].abs() < 1e-9);
    }
}
