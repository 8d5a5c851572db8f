use std::sync::Once;

use handstaff::annotation::normalize_whitespace;
use handstaff::beam::{fit_beam_line, MAX_SLOPE, SLOPE_SLACK};
use handstaff::canvas::ItemId;
use handstaff::items::ItemKind;
use handstaff::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

static INIT: Once = Once::new();

fn init_logger() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

fn finished_canvas(annotation: &str, seed: u64) -> Canvas {
    let mut canvas = Canvas::default();
    annotation_to_canvas(&mut canvas, annotation).unwrap();
    canvas
        .finish_construction(&mut StdRng::seed_from_u64(seed))
        .unwrap();
    canvas
}

fn beam_counts(canvas: &Canvas) -> Vec<Vec<(u8, u8, u8)>> {
    canvas
        .beams()
        .iter()
        .map(|beam| {
            beam.items
                .iter()
                .map(|&id| {
                    let item = canvas.item(id);
                    let beams = item.beaming().unwrap().beams;
                    (beams, item.left_beam_count, item.right_beam_count)
                })
                .collect()
        })
        .collect()
}

#[test]
fn test_round_trip_of_generated_annotations() {
    init_logger();
    let mut rng = StdRng::seed_from_u64(2024);
    for _ in 0..200 {
        let annotation = generate_random_annotation(&mut rng).unwrap();
        let spaced = annotation.replace(' ', "  \t");
        let parsed = parse(&spaced);
        assert!(parsed.warnings.is_empty());
        assert_eq!(stringify(&parsed.groups), normalize_whitespace(&spaced));
    }
}

#[test]
fn test_sided_beam_counts_property() {
    init_logger();
    let mut rng = StdRng::seed_from_u64(99);
    let mut checked = 0;
    while checked < 100 {
        let annotation = generate_random_annotation(&mut rng).unwrap();
        let canvas = finished_canvas(&annotation, rng.gen());

        for members in beam_counts(&canvas) {
            checked += 1;
            let last = members.len() - 1;
            assert_eq!((members[0].1, members[0].2), (0, members[0].0));
            assert_eq!((members[last].1, members[last].2), (members[last].0, 0));

            for i in 1..last {
                let (own, left, right) = members[i];
                let expected_left = members[i - 1].0.min(own);
                let expected_right = members[i + 1].0.min(own);
                let remaining = own - expected_left.max(expected_right);
                assert!(
                    (left, right) == (expected_left + remaining, expected_right)
                        || (left, right) == (expected_left, expected_right + remaining),
                    "{}: member {} got ({}, {})",
                    annotation,
                    i,
                    left,
                    right
                );
            }
        }
    }
}

#[test]
fn test_slur_stack_discipline() {
    init_logger();
    let mut rng = StdRng::seed_from_u64(5);
    let brackets = ["", "(", ")", ") ("];
    for _ in 0..200 {
        // notes with random brackets, not necessarily balanced
        let tokens: Vec<String> = (0..rng.gen_range(1..10))
            .map(|i| {
                let bracket = brackets[rng.gen_range(0..brackets.len())];
                match bracket {
                    "(" => format!("q{} (", i % 5),
                    ")" => format!(") q{}", i % 5),
                    ") (" => format!(") q{} (", i % 5),
                    _ => format!("q{}", i % 5),
                }
            })
            .collect();
        let annotation = tokens.join(" ");
        let canvas = finished_canvas(&annotation, 1);

        let starts = annotation.matches('(').count();
        let ends = annotation.matches(')').count();
        let items: Vec<_> = canvas.items().collect();
        let invisible = items
            .iter()
            .filter(|i| i.kind == ItemKind::InvisibleSlurEnd)
            .count();

        // every bracket is in exactly one slur
        for slur in canvas.slurs() {
            assert!(canvas.item(slur.start).slur_start);
            assert!(canvas.item(slur.end).slur_end);
        }
        let visible_starts = canvas
            .slurs()
            .iter()
            .filter(|s| canvas.item(s.start).kind != ItemKind::InvisibleSlurEnd)
            .count();
        let visible_ends = canvas
            .slurs()
            .iter()
            .filter(|s| canvas.item(s.end).kind != ItemKind::InvisibleSlurEnd)
            .count();
        assert_eq!(visible_starts, starts, "{}", annotation);
        assert_eq!(visible_ends, ends, "{}", annotation);
        assert_eq!(invisible, canvas.slurs().len() * 2 - starts - ends);

        // synthesized starts precede their end, synthesized ends follow their start
        for slur in canvas.slurs() {
            let position = |id: ItemId| canvas.order().iter().position(|&o| o == id).unwrap();
            let (start, end) = (position(slur.start), position(slur.end));
            if items[start].kind == ItemKind::InvisibleSlurEnd {
                assert_eq!(start + 1, end);
            }
            if items[end].kind == ItemKind::InvisibleSlurEnd {
                assert_eq!(start + 1, end);
            }
        }
    }
}

#[test]
fn test_beam_placement_property() {
    init_logger();
    let mut rng = StdRng::seed_from_u64(17);
    for _ in 0..300 {
        let mut x = 100;
        let notes: Vec<((i32, i32), u8)> = (0..rng.gen_range(2..=8))
            .map(|_| {
                x += rng.gen_range(40..100);
                ((x, rng.gen_range(100..500)), rng.gen_range(1..=3))
            })
            .collect();
        let flipped = rng.gen();
        let line = fit_beam_line(&notes, flipped, &mut rng);

        let sign = if flipped { -1.0 } else { 1.0 };
        assert!(line.slope.abs() <= MAX_SLOPE);
        for &(tip_x, tip_y) in &line.tips {
            assert!((line.y_at(tip_x) - tip_y as f64) * sign <= SLOPE_SLACK);
        }
    }
}

#[test]
fn test_finish_twice_is_rejected() {
    init_logger();
    let mut canvas = finished_canvas("e=-4 =e-4 ( ) q0", 1);
    let result = canvas.finish_construction(&mut StdRng::seed_from_u64(1));
    assert!(matches!(result, Err(HandstaffError::AlreadyFinished)));
    assert_eq!(canvas.beams().len(), 1);
    assert_eq!(canvas.slurs().len(), 1);
}

#[test]
fn test_scenario_direct_slur() {
    init_logger();
    let parsed = parse("q-4 ( ) q-4");
    assert!(parsed.warnings.is_empty());
    assert_eq!(parsed.groups.len(), 2);
    assert_eq!(parsed.groups[0].after_attachments, vec!["("]);
    assert_eq!(parsed.groups[1].before_attachments, vec![")"]);

    let canvas = finished_canvas("q-4 ( ) q-4", 1);
    assert_eq!(canvas.len(), 2);
    assert_eq!(canvas.slurs().len(), 1);
    assert_eq!(canvas.slurs()[0].start, canvas.order()[0]);
    assert_eq!(canvas.slurs()[0].end, canvas.order()[1]);
}

#[test]
fn test_scenario_stray_slur_end() {
    init_logger();
    assert!(parse("qr ) q-2").warnings.is_empty());

    let canvas = finished_canvas("qr ) q-2", 1);
    let kinds: Vec<bool> = canvas
        .items()
        .map(|i| i.kind == ItemKind::InvisibleSlurEnd)
        .collect();
    assert_eq!(kinds, vec![false, true, false]);
    assert_eq!(canvas.slurs().len(), 1);
    assert_eq!(canvas.slurs()[0].start, canvas.order()[1]);
    assert_eq!(canvas.slurs()[0].end, canvas.order()[2]);
}

#[test]
fn test_scenario_three_eighths() {
    init_logger();
    let canvas = finished_canvas("e=-4 =e=-4 =e-4", 1);
    assert_eq!(canvas.beams().len(), 1);
    assert_eq!(
        beam_counts(&canvas),
        vec![vec![(1, 0, 1), (1, 1, 1), (1, 1, 0)]]
    );
}

#[test]
fn test_scenario_sixteenth_and_eighth() {
    init_logger();
    let canvas = finished_canvas("s=-4 =e-4", 1);
    assert_eq!(beam_counts(&canvas), vec![vec![(2, 0, 2), (1, 1, 0)]]);
}

#[test]
fn test_layout_of_generated_annotations() {
    init_logger();
    let mut rng = StdRng::seed_from_u64(31);
    for _ in 0..50 {
        let annotation = generate_random_annotation(&mut rng).unwrap();
        let mut ctx = LayoutContext::seeded(rng.gen());
        let geometry = layout_annotation(&annotation, CanvasOptions::default(), &mut ctx).unwrap();

        let tokens: Vec<String> = geometry.items.iter().flat_map(|i| i.tokens.clone()).collect();
        assert_eq!(tokens.join(" "), annotation);
        assert!(geometry.width > 0);
        for beam in &geometry.beams {
            assert!(beam.slope.abs() <= MAX_SLOPE);
            assert!(beam.strokes.len() >= beam.members.len() - 1);
        }
    }
}

#[test]
fn test_layout_is_reproducible() {
    init_logger();
    let annotation = "clef.G-2 #4 #1 time.3 time.4 q0 ( e=1 =s=2 =t3 ) | h-5 * wr";
    let a = layout_annotation(annotation, CanvasOptions::default(), &mut LayoutContext::seeded(8)).unwrap();
    let b = layout_annotation(annotation, CanvasOptions::default(), &mut LayoutContext::seeded(8)).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_geometry_serializes_to_yaml() {
    init_logger();
    let geometry = layout_annotation("q-4 ( e=-2 =e-1 ) |", CanvasOptions::default(), &mut LayoutContext::seeded(1))
        .unwrap();
    let yaml = serde_yaml::to_string(&geometry).unwrap();
    assert!(yaml.contains("beams:"));
    assert!(yaml.contains("coefficients:"));
}

#[test]
fn test_options_from_yaml() {
    init_logger();
    let raw = RawCanvasOptions::from_yaml("barlines-up: true\nrandom-space-probability: 0.0\n").unwrap();
    let options = CanvasOptions::default().merge(&raw).unwrap();
    assert!(options.barlines_up);

    let geometry = layout_annotation("| q0 |", options, &mut LayoutContext::seeded(2)).unwrap();
    let barline = &geometry.items[0].sprites;
    assert_eq!(barline.position_y, geometry.staff.row(-4));

    let bad = RawCanvasOptions::from_yaml("padding-range: [30, 10]\n").unwrap();
    assert!(matches!(
        CanvasOptions::default().merge(&bad),
        Err(HandstaffError::Config(_))
    ));
}

#[test]
fn test_repaired_annotation_is_valid() {
    init_logger();
    let (repaired, warnings) = repair_annotation("=e1 =e1 q0 e=2 =e=2 | #3 ( q3 (");
    assert!(!warnings.is_empty());
    assert!(validate_annotation(&repaired).is_ok());

    let mut canvas = Canvas::default();
    annotation_to_canvas(&mut canvas, &repaired).unwrap();
    assert!(canvas.finish_construction(&mut StdRng::seed_from_u64(1)).is_ok());
}

#[test]
fn test_invalid_annotation_reports_warnings() {
    init_logger();
    match validate_annotation("e=-4 q-4") {
        Err(HandstaffError::InvalidAnnotation { warnings, .. }) => {
            assert!(!warnings.is_empty());
        }
        other => panic!("Expected InvalidAnnotation but got: {:?}", other),
    }
}
