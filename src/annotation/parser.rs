//! Phased annotation parser.
//!
//! Each phase consumes the output of the previous one:
//! 1. attach decorations to items
//! 2. pair numeric time-signature digits
//! 3. extract key signatures
//! 4. drop attachments that found no item
//! 5. repair attachment ordering
//! 6. repair beam continuity

use super::{AnnotationWarning, GroupToken, ParsedAnnotation, TokenGroup};
use crate::vocabulary::{
    get_pitch, is_accidental, is_after_attachment, is_before_attachment, is_beamed_note, is_clef,
    is_note, is_numeric_time_signature, is_rest, sort_attachments, to_generic, with_pitch,
    UNKNOWN_SYMBOL,
};

/// Parse an annotation into token groups, repairing what can be repaired.
pub fn parse(annotation: &str) -> ParsedAnnotation {
    let mut warnings = Vec::new();

    let mut groups = attach(annotation);
    pair_time_signatures(&mut groups, &mut warnings);
    extract_key_signatures(&mut groups, &mut warnings);
    drop_sentinels(&mut groups, &mut warnings);
    repair_attachment_order(&mut groups, &mut warnings);
    repair_beams(&mut groups, &mut warnings);

    ParsedAnnotation { groups, warnings }
}

/// The START and END sentinels are empty symbols. Whitespace splitting never
/// yields an empty token, so they cannot collide with real input.
fn is_sentinel(group: &TokenGroup) -> bool {
    group.symbol() == Some("")
}

fn attach(annotation: &str) -> Vec<TokenGroup> {
    let mut groups: Vec<TokenGroup> = vec![TokenGroup::new("")];
    let mut before_attachments: Vec<String> = Vec::new();

    for token in annotation.split_whitespace() {
        if is_before_attachment(token) {
            before_attachments.push(token.to_string());
        } else if is_after_attachment(token) {
            // the START sentinel guarantees there is always a group to attach to
            if let Some(last) = groups.last_mut() {
                last.after_attachments.push(token.to_string());
            }
        } else {
            groups.push(TokenGroup::with_attachments(
                token,
                std::mem::take(&mut before_attachments),
                Vec::new(),
            ));
        }
    }

    groups.push(TokenGroup::with_attachments(
        "",
        before_attachments,
        Vec::new(),
    ));
    groups
}

fn is_numeric_time_signature_group(group: &TokenGroup) -> bool {
    group.symbol().map_or(false, is_numeric_time_signature)
}

fn pair_time_signatures(groups: &mut Vec<TokenGroup>, warnings: &mut Vec<AnnotationWarning>) {
    let mut i = 0;
    while i + 1 < groups.len() {
        if !is_numeric_time_signature_group(&groups[i]) {
            i += 1;
            continue;
        }

        if is_numeric_time_signature_group(&groups[i + 1]) {
            let second = groups.remove(i + 1);
            let first = &mut groups[i];
            // attachments between the digits end up after the pair
            if !first.after_attachments.is_empty() || !second.before_attachments.is_empty() {
                warnings.push(AnnotationWarning::MisorderedAttachments {
                    attachments: first
                        .after_attachments
                        .iter()
                        .chain(&second.before_attachments)
                        .cloned()
                        .collect(),
                });
            }
            let top = first.symbol().unwrap_or_default().to_string();
            let bottom = second.symbol().unwrap_or_default().to_string();
            first.token = GroupToken::TimeSignature { top, bottom };
            first.before_attachments.extend(second.before_attachments);
            first.after_attachments.extend(second.after_attachments);
            i += 1;
        } else {
            let unpaired = groups.remove(i);
            warnings.push(AnnotationWarning::UnpairedTimeSignature {
                token: unpaired.symbol().unwrap_or_default().to_string(),
            });
        }
    }
}

fn should_extract_key_signature(group: &TokenGroup) -> bool {
    let accidentals: Vec<&String> = group
        .before_attachments
        .iter()
        .filter(|a| is_accidental(a))
        .collect();

    match accidentals.as_slice() {
        [] => false,
        [accidental] => match group.symbol() {
            Some(token) if is_note(token) => get_pitch(accidental) != get_pitch(token),
            _ => true,
        },
        _ => true,
    }
}

fn extract_key_signatures(groups: &mut Vec<TokenGroup>, warnings: &mut Vec<AnnotationWarning>) {
    let mut i = 0;
    while i < groups.len() {
        if should_extract_key_signature(&groups[i]) {
            let written = std::mem::take(&mut groups[i].before_attachments);
            let (accidentals, rest): (Vec<String>, Vec<String>) =
                written.iter().cloned().partition(|a| is_accidental(a));
            // the key signature is written in front of every other attachment
            if !written.starts_with(&accidentals) {
                warnings.push(AnnotationWarning::MisorderedAttachments {
                    attachments: written,
                });
            }
            groups[i].before_attachments = rest;
            groups.insert(i, TokenGroup::key_signature(accidentals));
            i += 1;
        }
        i += 1;
    }
}

fn drop_sentinels(groups: &mut Vec<TokenGroup>, warnings: &mut Vec<AnnotationWarning>) {
    groups.retain(|group| {
        if !is_sentinel(group) {
            return true;
        }
        if !group.before_attachments.is_empty() {
            warnings.push(AnnotationWarning::UnattachedBeforeAttachments {
                attachments: group.before_attachments.clone(),
            });
        }
        if !group.after_attachments.is_empty() {
            warnings.push(AnnotationWarning::UnattachedAfterAttachments {
                attachments: group.after_attachments.clone(),
            });
        }
        false
    });
}

fn repair_attachment_order(groups: &mut [TokenGroup], warnings: &mut Vec<AnnotationWarning>) {
    for group in groups.iter_mut().filter(|g| !g.is_key_signature()) {
        for attachments in [
            &mut group.before_attachments,
            &mut group.after_attachments,
        ] {
            let sorted = sort_attachments(attachments);
            if *attachments != sorted {
                warnings.push(AnnotationWarning::MisorderedAttachments {
                    attachments: attachments.clone(),
                });
                *attachments = sorted;
            }
        }
    }
}

fn set_symbol(group: &mut TokenGroup, token: String) {
    group.token = GroupToken::Symbol { token };
}

fn remove_right_beam(group: &mut TokenGroup) {
    let Some(token) = group.symbol() else { return };
    let generic = to_generic(token);
    if let Some(stripped) = generic.strip_suffix('=') {
        let repaired = with_pitch(stripped, get_pitch(token));
        set_symbol(group, repaired);
    }
}

fn remove_left_beam(group: &mut TokenGroup) {
    let Some(token) = group.symbol() else { return };
    if let Some(stripped) = token.strip_prefix('=') {
        let repaired = stripped.to_string();
        set_symbol(group, repaired);
    }
}

fn add_left_beam(group: &mut TokenGroup) {
    let Some(token) = group.symbol() else { return };
    if !token.starts_with('=') {
        let repaired = format!("={}", token);
        set_symbol(group, repaired);
    }
}

/// Tokens allowed inside a beam without interrupting it.
fn is_beam_transparent(group: &TokenGroup) -> bool {
    match group.symbol() {
        Some(token) => is_rest(token) || is_clef(token) || token == UNKNOWN_SYMBOL,
        None => group.is_key_signature(),
    }
}

fn repair_beams(groups: &mut [TokenGroup], warnings: &mut Vec<AnnotationWarning>) {
    // index of the last beamed note of the open beam
    let mut open_beam: Option<usize> = None;

    for i in 0..groups.len() {
        let is_beamed = groups[i].symbol().map_or(false, is_beamed_note);

        match open_beam {
            Some(last) => {
                if is_beam_transparent(&groups[i]) {
                    continue;
                }

                if !is_beamed {
                    warnings.push(AnnotationWarning::UnexpectedTokenInBeam {
                        token: groups[i].tokens().join(" "),
                    });
                    remove_right_beam(&mut groups[last]);
                    open_beam = None;
                    continue;
                }

                let token = groups[i].symbol().unwrap_or_default().to_string();
                if !to_generic(&token).starts_with('=') {
                    warnings.push(AnnotationWarning::NonFinishedBeam { token });
                    add_left_beam(&mut groups[i]);
                }

                let token = groups[i].symbol().unwrap_or_default();
                open_beam = if to_generic(token).ends_with('=') {
                    Some(i)
                } else {
                    None
                };
            }
            None => {
                if !is_beamed {
                    continue;
                }

                let token = groups[i].symbol().unwrap_or_default().to_string();
                if to_generic(&token).starts_with('=') {
                    warnings.push(AnnotationWarning::NonStartedBeam { token });
                    remove_left_beam(&mut groups[i]);
                }

                let token = groups[i].symbol().unwrap_or_default();
                if to_generic(token).ends_with('=') {
                    open_beam = Some(i);
                }
            }
        }
    }

    if let Some(last) = open_beam {
        warnings.push(AnnotationWarning::BeamOpenAtEnd);
        remove_right_beam(&mut groups[last]);
    }
}
