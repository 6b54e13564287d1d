//! Materialize stratified cross-validation folds of a labeled corpus on disk.

use std::path::PathBuf;

use sketcheval::config;
use sketcheval::dataset::{LoaderOptions, collect_class_files, export_folds};
use sketcheval::logging;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

#[derive(Debug, Clone, Default)]
struct CliOptions {
    test_data_dir: Option<PathBuf>,
    division_log: Option<PathBuf>,
    folds: Option<usize>,
    seed: Option<String>,
    config_path: Option<PathBuf>,
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    if let Err(err) = logging::init("sketcheval-divide") {
        eprintln!("File logging disabled: {err}");
        let _ = logging::init_stdout();
    }
    let config = match &options.config_path {
        Some(path) => config::load_from(path),
        None => config::load_or_default(),
    }
    .map_err(|err| err.to_string())?;
    config.validate().map_err(|err| err.to_string())?;

    let root = options
        .test_data_dir
        .unwrap_or_else(|| config.dataset.test_data_dir.clone());
    let division_log = options
        .division_log
        .unwrap_or_else(|| config.report.division_output_path.clone());
    let fold_count = options.folds.unwrap_or(config.evaluation.fold_count);
    let seed = options.seed.or_else(|| config.evaluation.shuffle_seed.clone());

    let files = collect_class_files(&root, &LoaderOptions::from_settings(&config.dataset))
        .map_err(|err| err.to_string())?;
    let summary = export_folds(&root, &files, fold_count, seed.as_deref(), &division_log)
        .map_err(|err| err.to_string())?;
    println!(
        "Wrote {} folds of {} files in {} classes to {}",
        summary.fold_count,
        summary.files,
        summary.classes,
        summary.out_dir.display()
    );
    println!("Division log: {}", division_log.display());
    Ok(())
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();
    let mut positionals: Vec<PathBuf> = Vec::new();

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--folds" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--folds requires a value".to_string())?;
                let count = value
                    .parse::<usize>()
                    .ok()
                    .filter(|count| *count > 0)
                    .ok_or_else(|| format!("Invalid --folds value: {value}"))?;
                options.folds = Some(count);
            }
            "--seed" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--seed requires a value".to_string())?;
                options.seed = Some(value.to_string());
            }
            "--config" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--config requires a value".to_string())?;
                options.config_path = Some(PathBuf::from(value));
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
    options.division_log = positionals.next();
    Ok(options)
}

fn help_text() -> String {
    [
        "sketcheval-divide",
        "",
        "Usage:",
        "  sketcheval-divide [testDataDir] [divisionOutputFile] [options]",
        "",
        "Writes <testDataDir>_CV/<name>_train_<i> and <name>_test_<i> trees.",
        "",
        "Options:",
        "  --folds <n>      Number of folds (default: evaluation.fold_count).",
        "  --seed <s>       Shuffle each class deterministically before splitting.",
        "  --config <path>  Settings file (default: sketcheval.toml in the app dir).",
    ]
    .join("\n")
}
