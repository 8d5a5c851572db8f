//! # Sprite Geometry
//!
//! Glyph boxes in item-local pixel space.
//!
//! A [`Sprite`] is the box of one glyph (a notehead, a stem, a flag...)
//! relative to the origin of the item it belongs to. A [`SpriteGroup`] is a
//! named collection of sprites and tracked points around an origin, plus the
//! origin's position on the staff. No pixels live here: the renderer looks a
//! glyph up by its name and paints it into the box.
//!
//! ## Conventions
//! - `x`, `y` are the upper left corner of the box; `y` grows downwards
//! - symbols are centred on the origin when a provider hands them out
//! - points (e.g. `stem_head`) do not contribute to the bounding box

use serde::Serialize;

/// A pixel coordinate.
pub type Point = (i32, i32);

/// A straight line the renderer draws between two points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Stroke {
    pub from: Point,
    pub to: Point,
}

impl Stroke {
    pub fn new(from: Point, to: Point) -> Self {
        Self { from, to }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sprite {
    /// Identifier of the glyph the renderer paints into this box
    pub glyph: String,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    /// Rotated by 180 degrees
    pub rotated: bool,
    /// Mirrored horizontally
    pub mirrored: bool,
}

impl Sprite {
    pub fn new(glyph: impl Into<String>, x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            glyph: glyph.into(),
            x,
            y,
            width,
            height,
            rotated: false,
            mirrored: false,
        }
    }

    /// A sprite centred on the origin.
    pub fn centered(glyph: impl Into<String>, width: i32, height: i32) -> Self {
        Self::new(glyph, -width / 2, -height / 2, width, height)
    }

    pub fn left(&self) -> i32 {
        self.x
    }

    pub fn top(&self) -> i32 {
        self.y
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Rotate by 180 degrees around the origin.
    pub fn flip(&mut self) {
        self.x = -self.x - self.width;
        self.y = -self.y - self.height;
        self.rotated = !self.rotated;
    }

    /// Mirror the glyph horizontally in place. The box does not move.
    pub fn mirror(&mut self) {
        self.mirrored = !self.mirrored;
    }

    pub fn stretch_height(&mut self, height: i32) {
        self.height = height;
    }
}

/// A collection of sprites placed around an origin.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SpriteGroup {
    /// Position of the origin on the staff
    pub position_x: i32,
    pub position_y: i32,

    pub padding_top: i32,
    pub padding_bottom: i32,
    pub padding_left: i32,
    pub padding_right: i32,

    /// Bounding box in local space, padding included
    pub top: i32,
    pub left: i32,
    pub bottom: i32,
    pub right: i32,
    pub width: i32,
    pub height: i32,

    /// Sprites in drawing order
    pub sprites: Vec<(String, Sprite)>,
    pub points: Vec<(String, Point)>,
}

impl SpriteGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sprite, replacing any sprite of the same name.
    pub fn add(&mut self, name: &str, sprite: Sprite) -> &mut Self {
        match self.sprites.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = sprite,
            None => self.sprites.push((name.to_string(), sprite)),
        }
        self
    }

    /// Add a point, replacing any point of the same name.
    pub fn add_point(&mut self, name: &str, point: Point) -> &mut Self {
        match self.points.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = point,
            None => self.points.push((name.to_string(), point)),
        }
        self
    }

    pub fn sprite(&self, name: &str) -> Option<&Sprite> {
        self.sprites.iter().find(|(n, _)| n == name).map(|(_, s)| s)
    }

    pub fn sprite_mut(&mut self, name: &str) -> Option<&mut Sprite> {
        self.sprites
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s)
    }

    pub fn point(&self, name: &str) -> Option<Point> {
        self.points.iter().find(|(n, _)| n == name).map(|(_, p)| *p)
    }

    pub fn has_sprite(&self, name: &str) -> bool {
        self.sprite(name).is_some()
    }

    /// The first sprite of the group, for single-glyph symbols.
    pub fn first_sprite(&self) -> Option<&Sprite> {
        self.sprites.first().map(|(_, s)| s)
    }

    pub fn reset_padding(&mut self) {
        self.padding_top = 0;
        self.padding_bottom = 0;
        self.padding_left = 0;
        self.padding_right = 0;
    }

    pub fn recalculate_bounding_box(&mut self) {
        if self.sprites.is_empty() {
            self.left = 0;
            self.right = 0;
            self.top = 0;
            self.bottom = 0;
        } else {
            let sprites = || self.sprites.iter().map(|(_, s)| s);
            self.left = sprites().map(Sprite::left).min().unwrap_or(0);
            self.right = sprites().map(Sprite::right).max().unwrap_or(0);
            self.top = sprites().map(Sprite::top).min().unwrap_or(0);
            self.bottom = sprites().map(Sprite::bottom).max().unwrap_or(0);
        }

        self.right += self.padding_right;
        self.bottom += self.padding_bottom;
        self.top -= self.padding_top;
        self.left -= self.padding_left;

        self.width = self.right - self.left;
        self.height = self.bottom - self.top;
    }

    /// A copy with the named sprites and points rotated by 180 degrees
    /// around the origin. `None` flips everything.
    pub fn create_flipped_copy(&self, names: Option<&[&str]>) -> Self {
        let selected = |name: &str| names.map_or(true, |names| names.contains(&name));
        let mut copy = self.clone();

        for (name, sprite) in copy.sprites.iter_mut() {
            if selected(name) {
                sprite.flip();
            }
        }
        for (name, point) in copy.points.iter_mut() {
            if selected(name) {
                *point = (-point.0, -point.1);
            }
        }
        copy
    }

    /// Convert a local point to staff coordinates.
    pub fn to_global(&self, point: Point) -> Point {
        (self.position_x + point.0, self.position_y + point.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note() -> SpriteGroup {
        let mut group = SpriteGroup::new();
        group
            .add("notehead", Sprite::centered("notehead", 30, 24))
            .add("stem", Sprite::new("stem", 12, -90, 3, 90))
            .add_point("stem_head", (13, -90));
        group
    }

    #[test]
    fn test_bounding_box() {
        let mut group = note();
        group.recalculate_bounding_box();
        assert_eq!((group.left, group.right), (-15, 15));
        assert_eq!((group.top, group.bottom), (-90, 12));
        assert_eq!((group.width, group.height), (30, 102));
    }

    #[test]
    fn test_bounding_box_with_padding() {
        let mut group = note();
        group.padding_left = 10;
        group.padding_right = 5;
        group.recalculate_bounding_box();
        assert_eq!((group.left, group.right), (-25, 20));
        assert_eq!(group.width, 45);
    }

    #[test]
    fn test_empty_group_has_only_padding() {
        let mut group = SpriteGroup::new();
        group.padding_left = 10;
        group.padding_right = 10;
        group.recalculate_bounding_box();
        assert_eq!(group.width, 20);
        assert_eq!(group.height, 0);
    }

    #[test]
    fn test_flip_selected_names() {
        let group = note();
        let flipped = group.create_flipped_copy(Some(&["stem", "stem_head"]));

        let stem = flipped.sprite("stem").unwrap();
        assert_eq!((stem.x, stem.y), (-15, 0));
        assert!(stem.rotated);
        assert_eq!(flipped.point("stem_head"), Some((-13, 90)));

        // untouched
        assert_eq!(flipped.sprite("notehead"), group.sprite("notehead"));
    }

    #[test]
    fn test_double_flip_is_identity() {
        let group = note();
        let twice = group.create_flipped_copy(None).create_flipped_copy(None);
        assert_eq!(twice, group);
    }

    #[test]
    fn test_add_replaces_by_name() {
        let mut group = note();
        group.add("notehead", Sprite::centered("notehead_alt", 20, 20));
        assert_eq!(group.sprites.len(), 2);
        assert_eq!(group.sprite("notehead").unwrap().glyph, "notehead_alt");
    }
}
