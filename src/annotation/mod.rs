//! # Annotation Module
//!
//! Parses, validates and repairs staff annotations.
//!
//! ## Purpose
//! An annotation is a whitespace-separated list of tokens describing one
//! staff (see [`crate::vocabulary`]). This module turns it into an ordered
//! list of [`TokenGroup`]s: one item token together with the decorations
//! attached before and after it. Token groups are the intermediate
//! representation that is appended to a [`crate::Canvas`].
//!
//! ## Repairs
//! The parser never fails on malformed input. Anything it can fix (attachment
//! ordering, broken beams, stray attachments, unpaired time-signature digits)
//! is fixed and reported as an [`AnnotationWarning`].
//!
//! ## Round Trip
//! For an annotation that parses without warnings,
//! `stringify(&parse(text).groups)` reproduces the annotation with
//! whitespace normalized.
//!
//! ## Example
//! ```rust
//! use handstaff::annotation::{parse, stringify};
//!
//! let parsed = parse("#-2 q-2 . ( ) h-1");
//! assert!(parsed.warnings.is_empty());
//! assert_eq!(parsed.groups.len(), 2);
//! assert_eq!(stringify(&parsed.groups), "#-2 q-2 . ( ) h-1");
//! ```
//!
//! ## Related Modules
//! - `vocabulary` - Token categories used by every phase
//! - `items` - Converts token groups to score items
//! - `error` - `InvalidAnnotation` for annotations that must be warning-free

mod parser;


use crate::error::HandstaffError;
use crate::vocabulary::{is_barline, sort_attachments};
use serde::Serialize;
use thiserror::Error;

pub use parser::parse;

/// The item part of a token group.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum GroupToken {
    /// A plain item token (`q-4`, `|`, `clef.G-2`, `time.C`, ...)
    Symbol { token: String },
    /// Two numeric time-signature digits merged into one group
    TimeSignature { top: String, bottom: String },
    /// Accidentals without an item to stick to; they live in `before_attachments`
    KeySignature,
}

/// An item with its before and after attachments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenGroup {
    pub token: GroupToken,
    pub before_attachments: Vec<String>,
    pub after_attachments: Vec<String>,
}

impl TokenGroup {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: GroupToken::Symbol {
                token: token.into(),
            },
            before_attachments: Vec::new(),
            after_attachments: Vec::new(),
        }
    }

    pub fn with_attachments(
        token: impl Into<String>,
        before_attachments: Vec<String>,
        after_attachments: Vec<String>,
    ) -> Self {
        Self {
            before_attachments,
            after_attachments,
            ..Self::new(token)
        }
    }

    pub fn time_signature(top: impl Into<String>, bottom: impl Into<String>) -> Self {
        Self {
            token: GroupToken::TimeSignature {
                top: top.into(),
                bottom: bottom.into(),
            },
            before_attachments: Vec::new(),
            after_attachments: Vec::new(),
        }
    }

    pub fn key_signature(accidentals: Vec<String>) -> Self {
        Self {
            token: GroupToken::KeySignature,
            before_attachments: accidentals,
            after_attachments: Vec::new(),
        }
    }

    /// The plain item token, if this is not a time or key signature group.
    pub fn symbol(&self) -> Option<&str> {
        match &self.token {
            GroupToken::Symbol { token } => Some(token),
            _ => None,
        }
    }

    pub fn is_key_signature(&self) -> bool {
        matches!(self.token, GroupToken::KeySignature)
    }

    pub fn has_before(&self, attachment: &str) -> bool {
        self.before_attachments.iter().any(|a| a == attachment)
    }

    pub fn has_after(&self, attachment: &str) -> bool {
        self.after_attachments.iter().any(|a| a == attachment)
    }

    /// Tokens of this group in annotation order.
    pub fn tokens(&self) -> Vec<String> {
        let mut tokens = sort_attachments(&self.before_attachments);
        match &self.token {
            GroupToken::Symbol { token } => tokens.push(token.clone()),
            GroupToken::TimeSignature { top, bottom } => {
                tokens.push(top.clone());
                tokens.push(bottom.clone());
            }
            GroupToken::KeySignature => {}
        }
        tokens.extend(sort_attachments(&self.after_attachments));
        tokens
    }
}

/// A problem the parser found and repaired.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum AnnotationWarning {
    #[error("Unpaired numeric time signature: {token}")]
    UnpairedTimeSignature { token: String },

    #[error("Unattached before attachments: {attachments:?}")]
    UnattachedBeforeAttachments { attachments: Vec<String> },

    #[error("Unattached after attachments: {attachments:?}")]
    UnattachedAfterAttachments { attachments: Vec<String> },

    #[error("Attachments are not ordered properly: {attachments:?}")]
    MisorderedAttachments { attachments: Vec<String> },

    #[error("Unexpected token inside a beamed group: '{token}'")]
    UnexpectedTokenInBeam { token: String },

    #[error("Non-started beam: 'x =x' at '{token}'")]
    NonStartedBeam { token: String },

    #[error("Non-finished beam: 'x= x' at '{token}'")]
    NonFinishedBeam { token: String },

    #[error("Non-finished beam: 'x= EOS' at the last token")]
    BeamOpenAtEnd,
}

/// Token groups together with the warnings produced while repairing them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParsedAnnotation {
    pub groups: Vec<TokenGroup>,
    pub warnings: Vec<AnnotationWarning>,
}

/// Join token groups back into an annotation string.
pub fn stringify(groups: &[TokenGroup]) -> String {
    groups
        .iter()
        .flat_map(|g| g.tokens())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Collapse all whitespace runs into single spaces.
pub fn normalize_whitespace(annotation: &str) -> String {
    annotation.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse an annotation that must already be final.
///
/// Any warning is a hard failure. Use [`parse`] for externally sourced
/// annotations whose repairs are acceptable.
pub fn validate_annotation(annotation: &str) -> Result<Vec<TokenGroup>, HandstaffError> {
    let parsed = parse(annotation);
    if !parsed.warnings.is_empty() {
        return Err(HandstaffError::InvalidAnnotation {
            annotation: annotation.to_string(),
            warnings: parsed.warnings,
        });
    }
    Ok(parsed.groups)
}

/// Repair attachment ordering, beams and stray tokens.
/// Returns the repaired annotation and the warnings describing each repair.
pub fn repair_annotation(annotation: &str) -> (String, Vec<AnnotationWarning>) {
    let parsed = parse(annotation);
    (stringify(&parsed.groups), parsed.warnings)
}

/// Split an annotation into the annotations of individual measures.
///
/// The split is purely token based: a leading and a trailing barline are
/// dropped and every other barline separates two measures.
pub fn get_measures(annotation: &str) -> Vec<String> {
    let mut tokens: Vec<&str> = annotation.split_whitespace().collect();
    if tokens.first() == Some(&"|") {
        tokens.remove(0);
    }
    if tokens.last() == Some(&"|") {
        tokens.pop();
    }

    let mut measures = Vec::new();
    let mut measure: Vec<&str> = Vec::new();
    for token in tokens {
        if is_barline(token) {
            measures.push(measure.join(" "));
            measure.clear();
        } else {
            measure.push(token);
        }
    }
    if !measure.is_empty() {
        measures.push(measure.join(" "));
    }
    measures
}
