use std::path::Path;
use std::process;

use rfkit_core::{dump, ProjectContext};
use serde::Serialize;

use super::load_model;
use crate::{print_json, report_error, OutputFormat};

#[derive(Debug, PartialEq, Eq, Serialize)]
struct Difference {
    line: usize,
    expected: String,
    actual: String,
}

#[derive(Debug, Serialize)]
struct Report {
    file: String,
    identical: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_difference: Option<Difference>,
}

/// First line (1-based) where `actual` departs from `expected`, line
/// terminators included.
fn first_difference(expected: &str, actual: &str) -> Option<Difference> {
    if expected == actual {
        return None;
    }
    let mut left = expected.split_inclusive('\n');
    let mut right = actual.split_inclusive('\n');
    let mut line = 1;
    loop {
        match (left.next(), right.next()) {
            (Some(a), Some(b)) if a == b => line += 1,
            (a, b) => {
                return Some(Difference {
                    line,
                    expected: a.unwrap_or_default().to_owned(),
                    actual: b.unwrap_or_default().to_owned(),
                })
            }
        }
    }
}

pub(crate) fn cmd_roundtrip(
    project: &ProjectContext,
    file: &Path,
    output: OutputFormat,
    quiet: bool,
) {
    let source = match std::fs::read_to_string(file) {
        Ok(text) => text,
        Err(e) => {
            report_error(&format!("cannot read '{}': {e}", file.display()), output, quiet);
            process::exit(1);
        }
    };
    let model = load_model(project, file, output, quiet);
    let written = dump(&model);
    let report = Report {
        file: file.display().to_string(),
        identical: written == source,
        first_difference: first_difference(&source, &written),
    };

    if !quiet {
        match output {
            OutputFormat::Json => print_json(&report),
            OutputFormat::Text => match &report.first_difference {
                None => println!("{}: identical", report.file),
                Some(diff) => {
                    println!("{}: differs at line {}", report.file, diff.line);
                    println!("  expected: {:?}", diff.expected);
                    println!("  actual:   {:?}", diff.actual);
                }
            },
        }
    }
    if !report.identical {
        process::exit(1);
    }
}
