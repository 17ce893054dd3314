use std::collections::BTreeMap;
use std::path::Path;

use rfkit_core::{KeywordEntity, KeywordLocator, ProjectContext, Scope};
use serde::Serialize;

use super::load_model;
use crate::{print_json, OutputFormat};

#[derive(Serialize)]
struct Report {
    file: String,
    accessible: BTreeMap<Scope, Vec<KeywordEntity>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    unimported: Option<Vec<KeywordEntity>>,
}

/// One line per keyword: location for user keywords, signature for library
/// ones.
pub(crate) fn describe(keyword: &KeywordEntity) -> String {
    let origin = if keyword.line > 0 {
        let file = keyword
            .exposing_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("{file}:{}", keyword.line)
    } else {
        format!("{} [{}]", keyword.source_name, keyword.arguments)
    };
    let deprecated = if keyword.deprecated { " (deprecated)" } else { "" };
    format!("{}  {origin}{deprecated}", keyword.name)
}

pub(crate) fn cmd_keywords(
    project: &ProjectContext,
    file: &Path,
    unimported: bool,
    output: OutputFormat,
    quiet: bool,
) {
    let model = load_model(project, file, output, quiet);
    let locator = KeywordLocator::new(project, model);
    let report = Report {
        file: locator.file().path().display().to_string(),
        accessible: locator.all_accessible_grouped_by_scope(),
        unimported: unimported.then(|| locator.non_accessible()),
    };
    if quiet {
        return;
    }
    match output {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Text => {
            for (scope, keywords) in &report.accessible {
                println!("{scope:?} ({})", keywords.len());
                for keyword in keywords {
                    println!("  {}", describe(keyword));
                }
            }
            if let Some(keywords) = &report.unimported {
                println!("Not imported ({})", keywords.len());
                for keyword in keywords {
                    println!("  {}", describe(keyword));
                }
            }
        }
    }
}
