//! Batch accuracy evaluation of recorded recognizer output over a labeled corpus.
//!
//! Per-file problems are logged and skipped; only an unusable configuration or an
//! unwritable report makes the process exit with an error.

use std::path::PathBuf;

use sketcheval::config::{self, EvalConfig};
use sketcheval::dataset::{LoadedCorpus, LoaderOptions, load_corpus};
use sketcheval::eval::{BatchRunner, EvalState, format_ratio, write_report};
use sketcheval::logging;
use sketcheval::recognition::{DEFAULT_PREDICTIONS_FILE, ReplayRecognizer};
use sketcheval::sketch::JsonSketchParser;
use tracing::{info, warn};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

#[derive(Debug, Clone, Default)]
struct CliOptions {
    test_data_dir: Option<PathBuf>,
    report_path: Option<PathBuf>,
    predictions: Option<PathBuf>,
    folds: Option<FoldMode>,
    config_path: Option<PathBuf>,
    thresholds_out: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy)]
enum FoldMode {
    /// `--cv`: use the configured fold count.
    Configured,
    Explicit(usize),
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    if let Err(err) = logging::init("sketcheval") {
        eprintln!("File logging disabled: {err}");
        let _ = logging::init_stdout();
    }

    let config = match &options.config_path {
        Some(path) => config::load_from(path),
        None => config::load_or_default(),
    }
    .map_err(|err| err.to_string())?;
    let catalog = config.validate().map_err(|err| err.to_string())?;

    if options.test_data_dir.is_none() || options.report_path.is_none() {
        warn!("{}", usage_notice(&config));
    }
    let test_data_dir = options
        .test_data_dir
        .unwrap_or_else(|| config.dataset.test_data_dir.clone());
    let report_path = options
        .report_path
        .unwrap_or_else(|| config.report.output_path.clone());

    let loader_options = LoaderOptions::from_settings(&config.dataset);
    let corpus = match load_corpus(&test_data_dir, &loader_options, &JsonSketchParser) {
        Ok(corpus) => corpus,
        Err(err) => {
            warn!("{err}");
            LoadedCorpus::default()
        }
    };
    info!(
        "Loaded {} examples in {} classes from {} ({} skipped)",
        corpus.example_count(),
        corpus.classes.len(),
        test_data_dir.display(),
        corpus.skipped.len()
    );

    let predictions = options
        .predictions
        .unwrap_or_else(|| test_data_dir.join(DEFAULT_PREDICTIONS_FILE));
    let mut recognizer = match ReplayRecognizer::from_path(&predictions) {
        Ok(recognizer) => recognizer,
        Err(err) => {
            warn!("{err}; every group will be scored as not found");
            ReplayRecognizer::default()
        }
    };

    let runner = BatchRunner::new(&catalog, &config.evaluation);
    let mut state = EvalState::new(&catalog);
    match options.folds {
        Some(mode) => {
            let fold_count = match mode {
                FoldMode::Configured => config.evaluation.fold_count,
                FoldMode::Explicit(count) => count,
            };
            runner
                .run_cross_validation(
                    &mut recognizer,
                    &corpus.classes,
                    fold_count,
                    config.evaluation.shuffle_seed.as_deref(),
                    &mut state,
                )
                .map_err(|err| err.to_string())?;
        }
        None => runner.run(&mut recognizer, corpus.examples(), &mut state),
    }

    write_report(&report_path, &state.aggregator, &state.thresholds)
        .map_err(|err| err.to_string())?;
    if let Some(path) = &options.thresholds_out {
        state
            .thresholds
            .write_to(path)
            .map_err(|err| err.to_string())?;
    }
    let totals = state.aggregator.totals();
    info!(
        "Final Accuracy = {} ({} of {} primitives, {} files)",
        format_ratio(totals.accuracy()),
        totals.groups.correct,
        totals.groups.tested,
        totals.files_tested
    );
    info!("Report written to {}", report_path.display());
    Ok(())
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();
    let mut positionals: Vec<PathBuf> = Vec::new();

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--predictions" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--predictions requires a value".to_string())?;
                options.predictions = Some(PathBuf::from(value));
            }
            "--folds" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--folds requires a value".to_string())?;
                let count = value
                    .parse::<usize>()
                    .ok()
                    .filter(|count| *count > 0)
                    .ok_or_else(|| format!("Invalid --folds value: {value}"))?;
                options.folds = Some(FoldMode::Explicit(count));
            }
            "--cv" => {
                if options.folds.is_none() {
                    options.folds = Some(FoldMode::Configured);
                }
            }
            "--config" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--config requires a value".to_string())?;
                options.config_path = Some(PathBuf::from(value));
            }
            "--thresholds-out" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--thresholds-out requires a value".to_string())?;
                options.thresholds_out = Some(PathBuf::from(value));
            }
            flag if flag.starts_with("--") => {
                return Err(format!("Unknown argument: {flag}\n\n{}", help_text()));
            }
            value => positionals.push(PathBuf::from(value)),
        }
        idx += 1;
    }

    if positionals.len() > 2 {
        return Err(format!("Too many arguments\n\n{}", help_text()));
    }
    let mut positionals = positionals.into_iter();
    options.test_data_dir = positionals.next();
    options.report_path = positionals.next();
    Ok(options)
}

fn usage_notice(config: &EvalConfig) -> String {
    format!(
        "Usage: sketcheval <testDataDir> <reportingOutputFile>; using {} and {}",
        config.dataset.test_data_dir.display(),
        config.report.output_path.display()
    )
}

fn help_text() -> String {
    [
        "sketcheval",
        "",
        "Usage:",
        "  sketcheval [testDataDir] [reportingOutputFile] [options]",
        "",
        "Options:",
        "  --predictions <path>     Recorded recognizer output (.jsonl file or directory).",
        "                           Default: <testDataDir>/predictions.jsonl.",
        "  --folds <n>              Cross-validate with n stratified folds.",
        "  --cv                     Cross-validate with the configured fold count.",
        "  --config <path>          Settings file (default: sketcheval.toml in the app dir).",
        "  --thresholds-out <path>  Also write the threshold listing to this file.",
    ]
    .join("\n")
}
