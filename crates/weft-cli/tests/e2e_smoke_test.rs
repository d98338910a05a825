//! Runs every demo document through the CLI pipeline.

use std::{
    fs,
    path::{Path, PathBuf},
};

use tempfile::TempDir;

use weft_cli::{Args, CliError, Format, run};

fn demos_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos")
}

fn demo_files() -> Vec<PathBuf> {
    let mut files: Vec<_> = fs::read_dir(demos_dir())
        .expect("demos directory should exist")
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    files.sort();
    files
}

fn args(input: &Path, output: &Path, format: Format) -> Args {
    Args {
        input: input.display().to_string(),
        output: output.display().to_string(),
        config: None,
        log_level: "off".to_string(),
        format,
    }
}

#[test]
fn test_all_demos_produce_reports() {
    let dir = TempDir::new().expect("temp dir");
    let files = demo_files();
    assert!(!files.is_empty(), "no demos found in {}", demos_dir().display());

    for input in &files {
        let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("demo");
        for (format, ext) in [(Format::Text, "txt"), (Format::Toml, "toml")] {
            let output = dir.path().join(format!("{stem}.{ext}"));
            if let Err(err) = run(&args(input, &output, format)) {
                panic!("{} failed: {err}", input.display());
            }
            let report = fs::read_to_string(&output).expect("report written");
            assert!(!report.is_empty(), "{} produced an empty report", input.display());
        }
    }
}

#[test]
fn test_refused_edit_fails_the_run() {
    let dir = TempDir::new().expect("temp dir");
    let input = dir.path().join("refused.toml");
    fs::write(
        &input,
        r#"
        [[lifeline]]
        label = "a"

        [[lifeline]]
        label = "b"

        [[edit]]
        op = "add_message"
        sort = "asynchronous"
        from = { on = "a", y = 200 }
        to = { on = "b", y = 120 }
        "#,
    )
    .expect("write input");
    let output = dir.path().join("refused.txt");

    let result = run(&args(&input, &output, Format::Text));
    assert!(matches!(result, Err(CliError::Edit { index: 0, .. })), "got {result:?}");
    assert!(!output.exists(), "no report for a failed run");
}

#[test]
fn test_missing_input_is_io_error() {
    let dir = TempDir::new().expect("temp dir");
    let input = dir.path().join("absent.toml");
    let output = dir.path().join("absent.txt");
    assert!(matches!(run(&args(&input, &output, Format::Text)), Err(CliError::Io(_))));
}
