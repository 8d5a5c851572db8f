//! Random annotation generator.
//!
//! Produces short, valid annotations with a realistic mix of barlines,
//! clefs, time and key signatures, rests, notes and beamed runs, with slurs
//! laid over the notes. Every generated annotation parses without warnings.

use crate::annotation::{stringify, validate_annotation, TokenGroup};
use crate::error::HandstaffError;
use crate::vocabulary::{get_pitch, is_note, HIGHEST_PITCH, LOWEST_PITCH};
use rand::seq::SliceRandom;
use rand::Rng;

/// Pitch spread of a beamed run around its centre
const BEAM_HALF_SPREAD: i32 = 4;

const CLEFS: [&str; 6] = ["clef.C4", "clef.C-2", "clef.C-4", "clef.F0", "clef.F3", "clef.G-4"];
const RESTS: [&str; 7] = ["lr", "br", "wr", "hr", "qr", "er", "sr"];
const NOTES: [&str; 5] = ["w", "h", "q", "e", "s"];
const BEAMED_KINDS: [&str; 3] = ["e", "s", "t"];
const KEY_ACCIDENTALS: [&str; 3] = ["#", "b", "N"];

/// Generate a random annotation of 5 to 15 items.
pub fn generate_random_annotation<R: Rng + ?Sized>(
    rng: &mut R,
) -> Result<String, HandstaffError> {
    let count = rng.gen_range(5..=15);
    let mut groups: Vec<TokenGroup> = Vec::new();

    let mut i = 0;
    while i < count {
        if rng.gen::<f64>() < 0.1 && i + 2 < count {
            let mut length = rng.gen_range(2..=(count - i).min(8));
            if rng.gen::<f64>() < 0.1 {
                length = 2;
            }
            let run = beamed_run(length, groups.last(), rng);
            groups.extend(run);
            i += length;
        } else {
            let group = simple_group(groups.last(), rng);
            groups.push(group);
            i += 1;
        }
    }

    add_slurs(&mut groups, rng);

    let annotation = stringify(&groups);
    validate_annotation(&annotation)?;
    Ok(annotation)
}

/// Open a slur on a note with probability 0.3 and close it on a later note
/// with probability 0.3.
fn add_slurs<R: Rng + ?Sized>(groups: &mut [TokenGroup], rng: &mut R) {
    let mut slur_start: Option<usize> = None;
    for i in 0..groups.len() {
        if !groups[i].symbol().map_or(false, is_note) {
            continue;
        }
        match slur_start {
            None => {
                if rng.gen::<f64>() < 0.3 {
                    slur_start = Some(i);
                }
            }
            Some(start) => {
                if rng.gen::<f64>() < 0.3 {
                    groups[start].after_attachments.push("(".to_string());
                    groups[i].before_attachments.insert(0, ")".to_string());
                    slur_start = None;
                }
            }
        }
    }
}

fn simple_group<R: Rng + ?Sized>(previous: Option<&TokenGroup>, rng: &mut R) -> TokenGroup {
    match rng.gen_range(0..12) {
        0..=4 => TokenGroup::new("|"),
        5 => TokenGroup::new(clef(rng)),
        6 => time_signature(rng),
        7 => key_signature(rng),
        8 => rest(rng),
        _ => {
            let kind = NOTES.choose(rng).copied().unwrap_or("q");
            note(kind, None, previous, rng)
        }
    }
}

fn beamed_run<R: Rng + ?Sized>(
    length: usize,
    previous: Option<&TokenGroup>,
    rng: &mut R,
) -> Vec<TokenGroup> {
    let center = rng.gen_range(LOWEST_PITCH + BEAM_HALF_SPREAD..=HIGHEST_PITCH - BEAM_HALF_SPREAD);
    let mut run: Vec<TokenGroup> = Vec::with_capacity(length);

    for i in 0..length {
        let letter = BEAMED_KINDS.choose(rng).copied().unwrap_or("e");
        let kind = format!(
            "{}{}{}",
            if i > 0 { "=" } else { "" },
            letter,
            if i + 1 < length { "=" } else { "" }
        );
        let pitch = center + rng.gen_range(-BEAM_HALF_SPREAD..=BEAM_HALF_SPREAD);
        let group = note(&kind, Some(pitch), run.last().or(previous), rng);
        run.push(group);
    }
    run
}

fn note<R: Rng + ?Sized>(
    kind: &str,
    pitch: Option<i32>,
    previous: Option<&TokenGroup>,
    rng: &mut R,
) -> TokenGroup {
    let mut pitch = pitch.unwrap_or_else(|| random_pitch(rng));
    let mut accidental = match rng.gen_range(0..13) {
        10 => Some("#"),
        11 => Some("b"),
        12 => Some("N"),
        _ => None,
    };

    // a note right after a key signature would be read as part of it
    if let Some(key_pitch) = previous
        .filter(|p| p.is_key_signature())
        .and_then(|p| p.before_attachments.last())
        .and_then(|a| get_pitch(a))
    {
        accidental = None;
        while pitch == key_pitch {
            pitch = random_pitch(rng);
        }
    }

    let mut group = TokenGroup::new(format!("{}{}", kind, pitch));
    if let Some(accidental) = accidental {
        group.before_attachments.push(format!("{}{}", accidental, pitch));
    }
    if rng.gen_range(0..6) == 5 {
        group.after_attachments.push(".".to_string());
    }
    group.after_attachments.extend(duration_dots(rng));
    group
}

fn rest<R: Rng + ?Sized>(rng: &mut R) -> TokenGroup {
    let mut group = TokenGroup::new(RESTS.choose(rng).copied().unwrap_or("qr"));
    group.after_attachments.extend(duration_dots(rng));
    group
}

/// None, `*` or `**` weighted 10:5:1.
fn duration_dots<R: Rng + ?Sized>(rng: &mut R) -> Option<String> {
    match rng.gen_range(0..16) {
        0..=9 => None,
        10..=14 => Some("*".to_string()),
        _ => Some("**".to_string()),
    }
}

fn clef<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    for common in ["clef.G-2", "clef.F2", "clef.C0", "clef.C2"] {
        if rng.gen::<f64>() < 0.2 {
            return common;
        }
    }
    CLEFS.choose(rng).copied().unwrap_or("clef.G-2")
}

fn time_signature<R: Rng + ?Sized>(rng: &mut R) -> TokenGroup {
    if rng.gen::<f64>() < 0.3 {
        return TokenGroup::new("time.C");
    }
    if rng.gen::<f64>() < 0.1 {
        return TokenGroup::new("time.C/");
    }
    TokenGroup::time_signature(
        format!("time.{}", rng.gen_range(0..=9)),
        format!("time.{}", rng.gen_range(0..=9)),
    )
}

fn key_signature<R: Rng + ?Sized>(rng: &mut R) -> TokenGroup {
    let count = rng.gen_range(1..=8);
    let accidentals = (0..count)
        .map(|_| {
            let accidental = KEY_ACCIDENTALS.choose(rng).copied().unwrap_or("#");
            format!("{}{}", accidental, rng.gen_range(-4..=4))
        })
        .collect();
    TokenGroup::key_signature(accidentals)
}

fn random_pitch<R: Rng + ?Sized>(rng: &mut R) -> i32 {
    rng.gen_range(LOWEST_PITCH..=HIGHEST_PITCH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::parse;
    use crate::canvas::{annotation_to_canvas, Canvas};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generated_annotations_are_valid() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..300 {
            let annotation = generate_random_annotation(&mut rng).unwrap();
            let parsed = parse(&annotation);
            assert!(parsed.warnings.is_empty(), "{}: {:?}", annotation, parsed.warnings);
            assert_eq!(stringify(&parsed.groups), annotation);
        }
    }

    #[test]
    fn test_generated_annotations_fit_a_canvas() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let annotation = generate_random_annotation(&mut rng).unwrap();
            let mut canvas = Canvas::default();
            annotation_to_canvas(&mut canvas, &annotation).unwrap();
            canvas.finish_construction(&mut rng).unwrap();
        }
    }

    #[test]
    fn test_same_seed_same_annotation() {
        let a = generate_random_annotation(&mut StdRng::seed_from_u64(3)).unwrap();
        let b = generate_random_annotation(&mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_note_after_key_signature() {
        let mut rng = StdRng::seed_from_u64(11);
        let key = TokenGroup::key_signature(vec!["#4".to_string(), "b2".to_string()]);
        for _ in 0..200 {
            let group = note("q", Some(2), Some(&key), &mut rng);
            assert!(group.before_attachments.is_empty());
            assert_ne!(group.symbol(), Some("q2"));
        }
    }

    #[test]
    fn test_beamed_run_shape() {
        let mut rng = StdRng::seed_from_u64(12);
        let run = beamed_run(4, None, &mut rng);
        let generic: Vec<String> = run
            .iter()
            .map(|g| crate::vocabulary::to_generic(g.symbol().unwrap()).to_string())
            .collect();
        assert!(!generic[0].starts_with('=') && generic[0].ends_with('='));
        assert!(generic[1].starts_with('=') && generic[1].ends_with('='));
        assert!(generic[3].starts_with('=') && !generic[3].ends_with('='));
    }
}
