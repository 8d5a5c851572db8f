//! # Canvas Options
//!
//! Layout configuration of a [`crate::Canvas`].
//!
//! [`CanvasOptions`] is a plain immutable value with sensible defaults.
//! Overrides come in as a [`RawCanvasOptions`] (typically loaded from YAML)
//! where every field is optional; [`CanvasOptions::merge`] applies the set
//! fields once and validates the result.
//!
//! ## YAML Format
//! ```yaml
//! randomize-stem-flips-for-pitches: [-1, 0, 1]
//! barlines-up: true
//! random-space-probability: 0.1
//! random-space-size: [40, 120]
//! padding-range: [5, 25]
//! ```
//!
//! ## Example
//! ```rust
//! use handstaff::options::{CanvasOptions, RawCanvasOptions};
//!
//! let raw = RawCanvasOptions::from_yaml("barlines-down: true").unwrap();
//! let options = CanvasOptions::default().merge(&raw).unwrap();
//! assert!(options.barlines_down);
//! assert!(!options.barlines_up);
//! ```

use crate::error::HandstaffError;
use serde::Deserialize;

/// Options that alter how the staff is laid out.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasOptions {
    /// Pitches whose stem orientation is randomized 50:50
    pub randomize_stem_flips_for_pitches: Vec<i32>,
    /// Barlines extend above the staff
    pub barlines_up: bool,
    /// Barlines extend below the staff
    pub barlines_down: bool,
    /// Probability of a large extra gap before an item
    pub random_space_probability: f64,
    /// Size range of that gap in pixels, inclusive
    pub random_space_size: (i32, i32),
    /// Left and right padding around every item, inclusive
    pub padding_range: (i32, i32),
}

impl Default for CanvasOptions {
    fn default() -> Self {
        Self {
            randomize_stem_flips_for_pitches: vec![-2, -1, 0, 1, 2],
            barlines_up: false,
            barlines_down: false,
            random_space_probability: 0.03,
            random_space_size: (50, 300),
            padding_range: (5, 25),
        }
    }
}

/// Partial canvas options for YAML deserialization
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct RawCanvasOptions {
    pub randomize_stem_flips_for_pitches: Option<Vec<i32>>,
    pub barlines_up: Option<bool>,
    pub barlines_down: Option<bool>,
    pub random_space_probability: Option<f64>,
    pub random_space_size: Option<(i32, i32)>,
    pub padding_range: Option<(i32, i32)>,
}

impl RawCanvasOptions {
    pub fn from_yaml(content: &str) -> Result<Self, HandstaffError> {
        serde_yaml::from_str(content).map_err(|e| HandstaffError::Config(e.to_string()))
    }
}

impl CanvasOptions {
    /// Apply every field set in `raw` on top of these options.
    pub fn merge(&self, raw: &RawCanvasOptions) -> Result<Self, HandstaffError> {
        let merged = Self {
            randomize_stem_flips_for_pitches: raw
                .randomize_stem_flips_for_pitches
                .clone()
                .unwrap_or_else(|| self.randomize_stem_flips_for_pitches.clone()),
            barlines_up: raw.barlines_up.unwrap_or(self.barlines_up),
            barlines_down: raw.barlines_down.unwrap_or(self.barlines_down),
            random_space_probability: raw
                .random_space_probability
                .unwrap_or(self.random_space_probability),
            random_space_size: raw.random_space_size.unwrap_or(self.random_space_size),
            padding_range: raw.padding_range.unwrap_or(self.padding_range),
        };
        merged.validate()?;
        Ok(merged)
    }

    pub fn validate(&self) -> Result<(), HandstaffError> {
        if !(0.0..=1.0).contains(&self.random_space_probability) {
            return Err(HandstaffError::Config(format!(
                "random-space-probability must be within [0, 1], got {}",
                self.random_space_probability
            )));
        }
        validate_range("random-space-size", self.random_space_size)?;
        validate_range("padding-range", self.padding_range)?;
        Ok(())
    }
}

fn validate_range(name: &str, (low, high): (i32, i32)) -> Result<(), HandstaffError> {
    if low < 0 || low > high {
        return Err(HandstaffError::Config(format!(
            "{} must be an ordered non-negative range, got ({}, {})",
            name, low, high
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(CanvasOptions::default().validate().is_ok());
    }

    #[test]
    fn test_merge_only_set_fields() {
        let yaml = r#"
randomize-stem-flips-for-pitches: [0]
random-space-size: [10, 20]
"#;
        let raw = RawCanvasOptions::from_yaml(yaml).unwrap();
        let options = CanvasOptions::default().merge(&raw).unwrap();

        assert_eq!(options.randomize_stem_flips_for_pitches, vec![0]);
        assert_eq!(options.random_space_size, (10, 20));
        assert_eq!(options.random_space_probability, 0.03);
        assert_eq!(options.padding_range, (5, 25));
    }

    #[test]
    fn test_empty_override_keeps_base() {
        let base = CanvasOptions {
            barlines_up: true,
            ..CanvasOptions::default()
        };
        let merged = base.merge(&RawCanvasOptions::default()).unwrap();
        assert_eq!(merged, base);
    }

    #[test]
    fn test_invalid_probability() {
        let raw = RawCanvasOptions {
            random_space_probability: Some(1.5),
            ..RawCanvasOptions::default()
        };
        let result = CanvasOptions::default().merge(&raw);
        assert!(matches!(result, Err(HandstaffError::Config(_))));
    }

    #[test]
    fn test_unordered_range() {
        let raw = RawCanvasOptions::from_yaml("padding-range: [30, 10]").unwrap();
        let result = CanvasOptions::default().merge(&raw);
        assert!(matches!(result, Err(HandstaffError::Config(_))));
    }

    #[test]
    fn test_malformed_yaml() {
        let result = RawCanvasOptions::from_yaml("barlines-up: [");
        assert!(matches!(result, Err(HandstaffError::Config(_))));
    }
}
