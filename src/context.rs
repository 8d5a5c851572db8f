//! # Layout Context
//!
//! Everything a layout pass needs besides the canvas itself: the random
//! source for cosmetic jitter, the symbol provider and the staff geometry.
//!
//! A context is created once per generation session and passed by
//! reference. Seeding it makes a whole layout reproducible:
//!
//! ```rust
//! use handstaff::context::LayoutContext;
//!
//! let mut a = LayoutContext::seeded(7);
//! let mut b = LayoutContext::seeded(7);
//! assert_eq!(a.int(0, 1000), b.int(0, 1000));
//! ```

use crate::error::HandstaffError;
use crate::sprites::{Sprite, SpriteGroup};
use crate::staff::StaffGeometry;
use crate::symbols::{SymbolKind, SymbolProvider, SyntheticSymbols};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

pub struct LayoutContext {
    rng: StdRng,
    symbols: Box<dyn SymbolProvider>,
    staff: StaffGeometry,
}

impl LayoutContext {
    pub fn new(rng: StdRng, symbols: Box<dyn SymbolProvider>, staff: StaffGeometry) -> Self {
        Self {
            rng,
            symbols,
            staff,
        }
    }

    /// Synthetic symbols on the default staff with a seeded random source.
    pub fn seeded(seed: u64) -> Self {
        Self::new(
            StdRng::seed_from_u64(seed),
            Box::new(SyntheticSymbols::new()),
            StaffGeometry::default(),
        )
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    pub fn staff(&self) -> &StaffGeometry {
        &self.staff
    }

    /// A random candidate group for a symbol kind.
    pub fn choose_group(&mut self, kind: SymbolKind) -> Result<SpriteGroup, HandstaffError> {
        self.symbols
            .candidates(kind)
            .choose(&mut self.rng)
            .cloned()
            .ok_or_else(|| HandstaffError::MissingSymbol {
                kind: kind.to_string(),
            })
    }

    /// The glyph of a random single-glyph symbol.
    pub fn choose_sprite(&mut self, kind: SymbolKind) -> Result<Sprite, HandstaffError> {
        self.choose_group(kind)?
            .first_sprite()
            .cloned()
            .ok_or_else(|| HandstaffError::MissingSymbol {
                kind: kind.to_string(),
            })
    }

    /// Uniform integer in `[low, high]`.
    pub fn int(&mut self, low: i32, high: i32) -> i32 {
        self.rng.gen_range(low..=high)
    }

    pub fn coin(&mut self) -> bool {
        self.rng.gen()
    }

    /// True with probability `p`.
    pub fn chance(&mut self, p: f64) -> bool {
        self.rng.gen::<f64>() < p
    }
}
