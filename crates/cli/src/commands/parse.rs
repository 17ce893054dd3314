use std::path::Path;

use rfkit_core::{FileModel, ProjectContext, SectionKind, TokenTag};
use serde::Serialize;

use super::load_model;
use crate::{print_json, OutputFormat};

#[derive(Debug, Serialize)]
struct Summary {
    file: String,
    version: String,
    sections: Vec<&'static str>,
    settings: usize,
    imports: usize,
    variables: usize,
    test_cases: Vec<String>,
    tasks: Vec<String>,
    keywords: Vec<String>,
    anomalies: Vec<Anomaly>,
}

#[derive(Debug, Serialize)]
struct Anomaly {
    line: u32,
    column: u32,
    kind: &'static str,
    text: String,
}

/// `Test Cases` for `*** Test Cases ***`.
fn section_label(kind: SectionKind) -> &'static str {
    kind.canonical_header().trim_matches(|c: char| c == '*' || c == ' ')
}

fn summarize(model: &FileModel) -> Summary {
    let mut sections = Vec::new();
    if model.settings.is_present() {
        sections.push("Settings");
    }
    if model.variables.is_present() {
        sections.push("Variables");
    }
    for table in model.code_tables() {
        if table.is_present() {
            sections.push(section_label(table.kind));
        }
    }
    sections.extend(model.raw_sections.iter().map(|raw| section_label(raw.kind)));

    let names = |table: &rfkit_core::model::CodeTable| -> Vec<String> {
        table
            .units
            .iter()
            .filter(|u| !u.is_anonymous())
            .map(|u| u.name_text().to_owned())
            .collect()
    };

    let mut anomalies: Vec<Anomaly> = model
        .all_tokens()
        .into_iter()
        .filter_map(|t| {
            let kind = if t.has_tag(TokenTag::Duplicated) {
                "duplicate"
            } else if t.has_tag(TokenTag::Trash) {
                "unrecognized"
            } else {
                return None;
            };
            Some(Anomaly {
                line: t.line,
                column: t.column,
                kind,
                text: t.text.clone(),
            })
        })
        .collect();
    anomalies.sort_by_key(|a| (a.line, a.column));

    Summary {
        file: model.path().display().to_string(),
        version: model.version.to_string(),
        sections,
        settings: model.settings.settings.len(),
        imports: model.imports().len(),
        variables: model.variables.variables.len(),
        test_cases: names(&model.test_cases),
        tasks: names(&model.tasks),
        keywords: names(&model.keywords),
        anomalies,
    }
}

pub(crate) fn cmd_parse(
    project: &ProjectContext,
    file: &Path,
    full: bool,
    output: OutputFormat,
    quiet: bool,
) {
    let model = load_model(project, file, output, quiet);
    if quiet {
        return;
    }
    match output {
        OutputFormat::Json if full => print_json(model.as_ref()),
        OutputFormat::Json => print_json(&summarize(&model)),
        OutputFormat::Text => print_text(&summarize(&model), full),
    }
}

fn print_text(summary: &Summary, full: bool) {
    println!("{} (language {})", summary.file, summary.version);
    println!("  sections:   {}", summary.sections.join(", "));
    println!("  settings:   {} ({} imports)", summary.settings, summary.imports);
    println!("  variables:  {}", summary.variables);
    for (label, names) in [
        ("test cases", &summary.test_cases),
        ("tasks", &summary.tasks),
        ("keywords", &summary.keywords),
    ] {
        println!("  {:<11} {}", format!("{label}:"), names.len());
        if full {
            for name in names {
                println!("    {name}");
            }
        }
    }
    if summary.anomalies.is_empty() {
        println!("  anomalies:  none");
        return;
    }
    println!("  anomalies:  {}", summary.anomalies.len());
    for a in &summary.anomalies {
        println!("    {}:{} {} '{}'", a.line, a.column, a.kind, a.text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfkit_core::{parse_source, LanguageVersion};

    #[test]
    fn summary_counts_and_anomalies() {
        let model = parse_source(
            "*** Settings ***\nLibrary    Collections\n\n*** Keywords ***\nK\n    [Timeout]    1s\n    [Timeout]    2s\n",
            "s.robot",
            LanguageVersion::LATEST,
        );
        let summary = summarize(&model);
        assert_eq!(summary.sections, vec!["Settings", "Keywords"]);
        assert_eq!(summary.imports, 1);
        assert_eq!(summary.keywords, vec!["K"]);
        assert_eq!(summary.anomalies[0].kind, "duplicate");
        assert_eq!(summary.anomalies[0].line, 7);
    }
}
