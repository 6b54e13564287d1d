use super::*;
use crate::sketch::{ParsedShape, ParsedSketch, Point, Stroke};

fn stroke(label: Option<&str>, points: usize) -> Stroke {
    Stroke {
        id: StrokeId::new_random(),
        label: label.map(str::to_string),
        points: (0..points)
            .map(|i| Point {
                x: i as f64,
                y: 0.0,
                time: i as u64,
            })
            .collect(),
    }
}

fn example(strokes: Vec<Stroke>, shapes: Vec<(&str, Vec<StrokeId>)>) -> Example {
    let sketch = ParsedSketch {
        strokes,
        shapes: shapes
            .into_iter()
            .map(|(label, strokes)| ParsedShape {
                label: Some(label.to_string()),
                strokes,
            })
            .collect(),
    };
    Example::new("class/example.json", "example.json", "class", sketch).unwrap()
}

fn evaluated(check: &GroupCheck) -> &GroupAttribution {
    match check {
        GroupCheck::Evaluated(attribution) => attribution,
        other => panic!("expected evaluated group, got {other:?}"),
    }
}

fn attribute(example: &Example, results: &[RecognitionResult]) -> Vec<GroupCheck> {
    let catalog = FamilyCatalog::default();
    let attributor = Attributor::new(&catalog, AttributionSettings::default());
    attributor.attribute_example(example, &PredictionIndex::new(results), None)
}

fn arrow_example() -> (Example, Vec<StrokeId>) {
    let strokes = vec![stroke(None, 5), stroke(None, 5), stroke(None, 5)];
    let ids: Vec<StrokeId> = strokes.iter().map(|s| s.id).collect();
    (example(strokes, vec![("Arrow", ids.clone())]), ids)
}

#[test]
fn full_cover_with_right_label_is_correct() {
    let (example, ids) = arrow_example();
    let results = vec![RecognitionResult::single(PredictedGroup::composite(
        "Arrow",
        0.92,
        ids.iter()
            .map(|id| PredictedGroup::leaf("Line", 0.9, vec![*id]))
            .collect(),
    ))];
    let checks = attribute(&example, &results);
    assert_eq!(checks.len(), 1);
    let attribution = evaluated(&checks[0]);
    assert!(attribution.is_correct());
    assert!(attribution.is_precision_hit());
    assert_eq!(attribution.family, "Arrow");
    assert_eq!(attribution.result, Some(0));
    assert!(attribution.confusion_entry("class/example.json").is_none());
}

#[test]
fn partial_cover_is_false_negative_without_label_check() {
    let (example, ids) = arrow_example();
    let results = vec![
        RecognitionResult::single(PredictedGroup::leaf("Arrow", 0.92, vec![ids[0], ids[1]])),
        RecognitionResult::single(PredictedGroup::leaf("Line", 0.8, vec![ids[2]])),
    ];
    let checks = attribute(&example, &results);
    let attribution = evaluated(&checks[0]);
    assert_eq!(
        attribution.verdict,
        Verdict::BadCombine {
            sign: CombineSign::FalseNegative,
            charged: 1,
            note: "2 of 3 strokes".into(),
        }
    );
    assert!(!attribution.is_correct());
    assert!(!attribution.combined_correctly());
    let entry = attribution.confusion_entry("class/example.json").unwrap();
    assert_eq!(entry.predicted, "Bad Combine (-)");
    assert_eq!(entry.actual, "Arrow");
    assert_eq!(entry.confidence, 0.0);
}

#[test]
fn extra_strokes_are_charged_once_per_example() {
    let a = stroke(Some("Line"), 4);
    let b = stroke(Some("Line"), 4);
    let (ida, idb) = (a.id, b.id);
    let example = example(vec![a, b], vec![]);
    let results = vec![RecognitionResult::single(PredictedGroup::composite(
        "Arrow",
        0.7,
        vec![
            PredictedGroup::leaf("Line", 0.8, vec![ida]),
            PredictedGroup::leaf("Arc", 0.6, vec![idb]),
        ],
    ))];
    let checks = attribute(&example, &results);
    let first = evaluated(&checks[0]);
    let second = evaluated(&checks[1]);
    assert_eq!(
        first.verdict,
        Verdict::BadCombine {
            sign: CombineSign::FalsePositive,
            charged: 1,
            note: "as part of Line (0.800)".into(),
        }
    );
    assert!(matches!(
        second.verdict,
        Verdict::BadCombine {
            sign: CombineSign::FalsePositive,
            charged: 0,
            ..
        }
    ));
    assert_eq!(
        second.confusion_entry("x").unwrap().predicted,
        "Bad Combine (+)"
    );
}

#[test]
fn polyline_accepts_polygon_of_equal_arity() {
    let a = stroke(Some("Polyline (4)"), 6);
    let id = a.id;
    let example = example(vec![a], vec![]);
    let hit = vec![RecognitionResult::single(PredictedGroup::leaf(
        "Polygon (4)",
        0.7,
        vec![id],
    ))];
    assert!(evaluated(&attribute(&example, &hit)[0]).is_correct());

    let miss = vec![RecognitionResult::single(PredictedGroup::leaf(
        "Polygon (5)",
        0.7,
        vec![id],
    ))];
    let checks = attribute(&example, &miss);
    let attribution = evaluated(&checks[0]);
    assert_eq!(attribution.family, "Polyline");
    assert!(!attribution.is_correct());
}

#[test]
fn true_label_in_n_best_counts_for_precision_only() {
    let a = stroke(Some("Arc"), 6);
    let id = a.id;
    let example = example(vec![a], vec![]);
    let results = vec![RecognitionResult::new(
        vec![
            PredictedGroup::leaf("Line", 0.6, vec![id]),
            PredictedGroup::leaf("Arc", 0.3, vec![id]),
        ],
        Vec::new(),
    )];
    let checks = attribute(&example, &results);
    let attribution = evaluated(&checks[0]);
    assert!(!attribution.is_correct());
    assert!(attribution.is_precision_hit());
    let entry = attribution.confusion_entry("x").unwrap();
    assert_eq!(entry.predicted, "Line");
    assert_eq!(entry.confidence, 0.6);
}

#[test]
fn precision_search_stops_at_rank() {
    let a = stroke(Some("Arc"), 6);
    let id = a.id;
    let example = example(vec![a], vec![]);
    let mut n_best: Vec<PredictedGroup> = (0..6)
        .map(|i| PredictedGroup::leaf("Line", 0.9 - i as f64 * 0.1, vec![id]))
        .collect();
    n_best.push(PredictedGroup::leaf("Arc", 0.05, vec![id]));
    let results = vec![RecognitionResult::new(n_best, Vec::new())];
    let checks = attribute(&example, &results);
    assert!(!evaluated(&checks[0]).is_precision_hit());
}

#[test]
fn single_point_stroke_falls_back_to_dot() {
    let dot = stroke(Some("Dot"), 1);
    let line = stroke(Some("Line"), 3);
    let example = example(vec![dot, line], vec![]);
    let checks = attribute(&example, &[]);
    let dot = evaluated(&checks[0]);
    assert!(dot.is_correct());
    assert_eq!(dot.result, None);
    let line = evaluated(&checks[1]);
    assert_eq!(
        line.verdict,
        Verdict::NotFound {
            note: String::new()
        }
    );
    assert_eq!(
        line.confusion_entry("x").unwrap().predicted,
        NOT_FOUND_LABEL
    );
}

#[test]
fn dot_fallback_can_be_disabled() {
    let example = example(vec![stroke(Some("Dot"), 1)], vec![]);
    let catalog = FamilyCatalog::default();
    let settings = AttributionSettings {
        precision_rank: 5,
        dot_fallback: false,
    };
    let checks = Attributor::new(&catalog, settings).attribute_example(
        &example,
        &PredictionIndex::empty(),
        None,
    );
    assert_eq!(
        evaluated(&checks[0]).verdict,
        Verdict::NotFound {
            note: String::new()
        }
    );
}

#[test]
fn incomplete_recognition_never_falls_back_to_dot() {
    let example = example(vec![stroke(Some("Dot"), 1), stroke(Some("Line"), 4)], vec![]);
    let catalog = FamilyCatalog::default();
    let checks = Attributor::new(&catalog, AttributionSettings::default()).attribute_example(
        &example,
        &PredictionIndex::empty(),
        Some("Over Time"),
    );
    for check in &checks {
        let attribution = evaluated(check);
        assert!(!attribution.is_correct());
        assert_eq!(
            attribution.verdict,
            Verdict::NotFound {
                note: "Over Time".into()
            }
        );
    }
}

#[test]
fn missing_and_unknown_labels_are_diagnostics() {
    let blank = stroke(Some(""), 3);
    let none = stroke(None, 3);
    let odd = stroke(Some("Squiggle"), 3);
    let example = example(vec![blank, none, odd], vec![]);
    let checks = attribute(&example, &[]);
    assert_eq!(checks[0], GroupCheck::Unlabeled { group_index: 0 });
    assert_eq!(checks[1], GroupCheck::Unlabeled { group_index: 1 });
    assert_eq!(
        checks[2],
        GroupCheck::UnknownLabel {
            group_index: 2,
            label: "Squiggle".into()
        }
    );
}

#[test]
fn attribution_follows_stroke_identity_not_result_order() {
    let a = stroke(Some("Line"), 3);
    let b = stroke(Some("Arc"), 3);
    let (ida, idb) = (a.id, b.id);
    let example = example(vec![a, b], vec![]);
    let results = vec![
        RecognitionResult::single(PredictedGroup::leaf("Arc", 0.9, vec![idb])),
        RecognitionResult::single(PredictedGroup::leaf("Line", 0.9, vec![ida])),
    ];
    let checks = attribute(&example, &results);
    assert!(evaluated(&checks[0]).is_correct());
    assert_eq!(evaluated(&checks[0]).result, Some(1));
    assert!(evaluated(&checks[1]).is_correct());
    assert_eq!(evaluated(&checks[1]).result, Some(0));
}
