//! # Staff Geometry
//!
//! Maps pitches to pixel rows of a five-line staff.
//!
//! Rows grow downwards. Pitch 0 is the centre line, pitch 4 the top line and
//! pitch -4 the bottom line. Beyond the staff the mapping continues in half
//! line-spacing steps up to [`HIGHEST_PITCH`] and down to [`LOWEST_PITCH`],
//! which is where ledger lines go.

use crate::vocabulary::{HIGHEST_PITCH, LOWEST_PITCH};
use serde::Serialize;

pub const DEFAULT_LINE_SPACING: i32 = 28;

/// Pitch-to-row mapping of one staff.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StaffGeometry {
    pub line_spacing: i32,
    pub margin: i32,
    /// Rows from the highest pitch to the lowest
    rows: Vec<i32>,
}

impl Default for StaffGeometry {
    fn default() -> Self {
        Self::new(DEFAULT_LINE_SPACING, 4 * DEFAULT_LINE_SPACING)
    }
}

impl StaffGeometry {
    /// Build the mapping for a staff whose top line sits `margin` pixels
    /// below the top of the image.
    pub fn new(line_spacing: i32, margin: i32) -> Self {
        let lines: Vec<i32> = (0..5).map(|i| margin + i * line_spacing).collect();

        let mut rows = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            rows.push(*line);
            if i + 1 < lines.len() {
                rows.push(line + line_spacing / 2);
            }
        }

        let step = line_spacing / 2;
        let extra = HIGHEST_PITCH.abs().max(LOWEST_PITCH.abs()) - 4;
        for _ in 0..extra {
            let top = rows[0] - step;
            let bottom = rows[rows.len() - 1] + step;
            rows.insert(0, top);
            rows.push(bottom);
        }

        Self {
            line_spacing,
            margin,
            rows,
        }
    }

    /// Pixel row of a pitch. Pitches outside the staff range are clamped.
    pub fn row(&self, pitch: i32) -> i32 {
        let pitch = pitch.clamp(LOWEST_PITCH, HIGHEST_PITCH);
        self.rows[(HIGHEST_PITCH - pitch) as usize]
    }

    /// Height of the whole staff image including both margins.
    pub fn height(&self) -> i32 {
        4 * self.line_spacing + 2 * self.margin
    }
}

/// Pitches of the ledger lines a note on `pitch` needs.
///
/// Only even pitches are lines; notes within the staff need none.
pub fn ledger_line_pitches(pitch: i32) -> Vec<i32> {
    let sign = if pitch > 0 { 1 } else { -1 };
    (6..=pitch.abs())
        .filter(|p| p % 2 == 0)
        .map(|p| p * sign)
        .collect()
}
