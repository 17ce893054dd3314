use std::path::Path;
use std::process;

use rfkit_core::{KeywordEntity, KeywordLocator, ProjectContext};
use serde::Serialize;

use super::keywords::describe;
use super::load_model;
use crate::{print_json, report_error, OutputFormat};

#[derive(Serialize)]
struct Report<'a> {
    usage: &'a str,
    resolved: Option<&'a KeywordEntity>,
    candidates: &'a [KeywordEntity],
    /// Matches in libraries the file does not import.
    unimported: &'a [KeywordEntity],
}

/// Print the candidates for `usage`; exit 1 when nothing accessible matches.
pub(crate) fn cmd_find(
    project: &ProjectContext,
    file: &Path,
    usage: &str,
    output: OutputFormat,
    quiet: bool,
) {
    let model = load_model(project, file, output, quiet);
    let locator = KeywordLocator::new(project, model);
    let candidates = locator.find_all(usage);
    let resolved = locator.resolve(usage);
    let unimported = if candidates.is_empty() {
        locator.find_non_accessible(usage)
    } else {
        Vec::new()
    };

    if !quiet {
        match output {
            OutputFormat::Json => print_json(&Report {
                usage,
                resolved: resolved.as_ref(),
                candidates: &candidates,
                unimported: &unimported,
            }),
            OutputFormat::Text => {
                if let Some(best) = &resolved {
                    println!("{usage} -> {} ({:?})", describe(best), best.scope);
                }
                for other in candidates.iter().filter(|c| Some(*c) != resolved.as_ref()) {
                    println!("  also: {} ({:?})", describe(other), other.scope);
                }
                for offer in &unimported {
                    println!("  not imported: {}", describe(offer));
                }
            }
        }
    }
    if candidates.is_empty() {
        report_error(&format!("no accessible keyword matches '{usage}'"), output, quiet);
        process::exit(1);
    }
}
