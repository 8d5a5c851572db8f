//! # Error Types
//!
//! This module defines the fatal error types of the synthesizer.
//!
//! Problems in an annotation that the parser can repair are *not* errors:
//! they are reported as [`AnnotationWarning`] values next to the repaired
//! token groups. The variants below abort the generation of a single sample
//! and are meant to be caught by the calling harness, which skips that sample.
//!
//! ## Error Types
//! - `InvalidToken` - A token no score item accepts (unknown symbol, bad pitch)
//! - `InvalidAnnotation` - An annotation that was expected to be final produced warnings
//! - `ConstructionFinished` / `AlreadyFinished` - Canvas lifecycle violations
//! - `UnterminatedBeam` / `MalformedBeam` - Beam shape invariants broken on the canvas
//! - `AnnotationMismatch` - The canvas cannot reproduce the annotation it was built from
//! - `MissingSymbol` - The symbol provider has no candidates for a glyph kind
//! - `Config` - Invalid canvas options
//!
//! ## Usage
//! ```rust
//! use handstaff::{validate_annotation, HandstaffError};
//!
//! match validate_annotation("e=-4 q-4") {
//!     Ok(groups) => println!("{} groups", groups.len()),
//!     Err(HandstaffError::InvalidAnnotation { warnings, .. }) => {
//!         for w in warnings {
//!             eprintln!("warning: {}", w);
//!         }
//!     }
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use crate::annotation::AnnotationWarning;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HandstaffError {
    /// A token that cannot be turned into any score item.
    ///
    /// # Example
    /// ```
    /// # use handstaff::HandstaffError;
    /// let err = HandstaffError::InvalidToken {
    ///     token: "clef.G3".to_string(),
    ///     reason: "G clef cannot sit on pitch 3".to_string(),
    /// };
    /// assert_eq!(err.to_string(), "Invalid token 'clef.G3': G clef cannot sit on pitch 3");
    /// ```
    #[error("Invalid token '{token}': {reason}")]
    InvalidToken { token: String, reason: String },

    /// An annotation that must be warning-free produced parser warnings.
    #[error("Invalid annotation '{annotation}': {}", join_warnings(.warnings))]
    InvalidAnnotation {
        annotation: String,
        warnings: Vec<AnnotationWarning>,
    },

    /// An item was added after `finish_construction` ran.
    #[error("Cannot add item, construction has been finished")]
    ConstructionFinished,

    /// `finish_construction` was called a second time.
    #[error("Construction has been already finished")]
    AlreadyFinished,

    /// A beamed note left a beam open (or claimed a left neighbour that does not exist).
    #[error("Unterminated beam at '{token}'")]
    UnterminatedBeam { token: String },

    /// Beam members violate the first/interior/last shape.
    #[error("Malformed beam: {message}")]
    MalformedBeam { message: String },

    /// The canvas regenerated a different annotation than it was given.
    #[error("Canvas generated '{generated}' instead of '{given}'")]
    AnnotationMismatch { given: String, generated: String },

    /// The symbol provider has no glyph candidates for the requested kind.
    #[error("No symbols available for {kind}")]
    MissingSymbol { kind: String },

    /// Invalid canvas options.
    ///
    /// # Example
    /// ```
    /// # use handstaff::HandstaffError;
    /// let err = HandstaffError::Config("random-space-probability must be within [0, 1]".to_string());
    /// assert_eq!(err.to_string(), "Invalid options: random-space-probability must be within [0, 1]");
    /// ```
    #[error("Invalid options: {0}")]
    Config(String),
}

fn join_warnings(warnings: &[AnnotationWarning]) -> String {
    warnings
        .iter()
        .map(|w| w.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
