mod support;

use std::fs;
use std::path::Path;

use sketcheval::config::EvaluationSettings;
use sketcheval::dataset::{LoaderOptions, collect_class_files, export_folds, load_corpus};
use sketcheval::eval::{BatchRunner, EvalState};
use sketcheval::recognition::{
    DEFAULT_PREDICTIONS_FILE, RecognitionError, RecognitionResult, Recognizer, ReplayRecognizer,
};
use sketcheval::sketch::{Example, FamilyCatalog, JsonSketchParser, Stroke};
use support::fixtures::{SketchFixture, leaf, result, write_predictions};

/// Replays recorded output and remembers the training split sizes it saw.
struct CountingRecognizer {
    inner: ReplayRecognizer,
    training_sizes: Vec<usize>,
}

impl Recognizer for CountingRecognizer {
    fn name(&self) -> &str {
        "counting"
    }

    fn train(&mut self, training: &[&Example]) -> Result<(), RecognitionError> {
        self.training_sizes.push(training.len());
        Ok(())
    }

    fn clear(&mut self) {
        self.inner.clear();
    }

    fn submit(&mut self, strokes: &[Stroke]) {
        self.inner.submit(strokes);
    }

    fn recognize(&mut self) -> Result<Vec<RecognitionResult>, RecognitionError> {
        self.inner.recognize()
    }
}

/// Ten single-stroke rectangle examples, all recognized correctly.
fn rectangle_corpus(root: &Path) {
    let mut records = Vec::new();
    for i in 0..10 {
        let mut sketch = SketchFixture::new();
        let id = sketch.stroke(Some("Rectangle"), 20);
        sketch.write(&root.join(format!("rectangle/r{i:02}.json")));
        records.push(result(vec![leaf("Rectangle", 0.9, &[id])], &[]));
    }
    write_predictions(&root.join(DEFAULT_PREDICTIONS_FILE), &records);
}

fn count_files(dir: &Path) -> usize {
    fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}

#[test]
fn ten_folds_of_ten_examples_test_one_each() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path().join("testData");
    rectangle_corpus(&root);

    let corpus = load_corpus(&root, &LoaderOptions::default(), &JsonSketchParser).unwrap();
    let mut recognizer = CountingRecognizer {
        inner: ReplayRecognizer::from_path(&root.join(DEFAULT_PREDICTIONS_FILE)).unwrap(),
        training_sizes: Vec::new(),
    };
    let catalog = FamilyCatalog::default();
    let runner = BatchRunner::new(&catalog, &EvaluationSettings::default());
    let mut state = EvalState::default();
    runner
        .run_cross_validation(&mut recognizer, &corpus.classes, 10, None, &mut state)
        .unwrap();

    assert_eq!(recognizer.training_sizes, vec![9; 10]);
    let folds = state.aggregator.folds();
    assert_eq!(folds.len(), 10);
    assert!(folds.iter().all(|fold| fold.files == 1 && fold.correct == 1));
    let rectangle = state.aggregator.class("Rectangle").unwrap();
    assert_eq!((rectangle.tested, rectangle.correct), (10, 10));
}

#[test]
fn exported_folds_split_one_test_file_per_fold() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path().join("testData");
    rectangle_corpus(&root);
    let log = temp.path().join("data_division.txt");

    let files = collect_class_files(&root, &LoaderOptions::default()).unwrap();
    let summary = export_folds(&root, &files, 10, None, &log).unwrap();
    assert_eq!(summary.out_dir, temp.path().join("testData_CV"));
    assert_eq!(summary.files, 10);

    for fold in 0..10 {
        let test_dir = summary
            .out_dir
            .join(format!("testData_test_{fold}"))
            .join("rectangle");
        let train_dir = summary
            .out_dir
            .join(format!("testData_train_{fold}"))
            .join("rectangle");
        assert_eq!(count_files(&test_dir), 1);
        assert_eq!(count_files(&train_dir), 9);
        assert!(test_dir.join(format!("r{fold:02}.json")).is_file());
    }

    let division = fs::read_to_string(&log).unwrap();
    assert!(division.starts_with("Directory: rectangle\n"));
    assert!(division.contains("r03.json 3\n"));
}

#[test]
fn seeded_exports_are_reproducible() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path().join("testData");
    rectangle_corpus(&root);
    let files = collect_class_files(&root, &LoaderOptions::default()).unwrap();

    let first = temp.path().join("first.txt");
    let second = temp.path().join("second.txt");
    export_folds(&root, &files, 3, Some("seed"), &first).unwrap();
    export_folds(&root, &files, 3, Some("seed"), &second).unwrap();
    assert_eq!(
        fs::read_to_string(first).unwrap(),
        fs::read_to_string(second).unwrap()
    );
}
