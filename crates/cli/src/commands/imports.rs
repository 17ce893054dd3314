use std::path::Path;

use rfkit_core::{ImportTarget, ProjectContext, ResolvedImport};
use serde::Serialize;

use super::load_model;
use crate::{print_json, OutputFormat};

#[derive(Serialize)]
struct Report<'a> {
    file: String,
    imports: &'a [ResolvedImport],
    unresolved: usize,
}

fn describe(target: &ImportTarget) -> String {
    match target {
        ImportTarget::File(path) => path.display().to_string(),
        ImportTarget::Library(name) => format!("library {name}"),
        ImportTarget::Unresolved(reason) => format!("unresolved: {reason}"),
        ImportTarget::Malformed(err) => format!("malformed: {err}"),
    }
}

pub(crate) fn cmd_imports(
    project: &ProjectContext,
    file: &Path,
    output: OutputFormat,
    quiet: bool,
) {
    let model = load_model(project, file, output, quiet);
    let imports = project.imports(&model);
    if quiet {
        return;
    }
    let unresolved = imports.unresolved().count();
    match output {
        OutputFormat::Json => print_json(&Report {
            file: model.path().display().to_string(),
            imports: &imports.imports,
            unresolved,
        }),
        OutputFormat::Text => {
            if imports.imports.is_empty() {
                println!("{}: no imports", model.path().display());
                return;
            }
            for import in &imports.imports {
                let alias = import
                    .alias
                    .as_deref()
                    .map(|a| format!(" AS {a}"))
                    .unwrap_or_default();
                println!(
                    "{:>4}  {:<9} {}{} -> {}",
                    import.line,
                    format!("{:?}", import.kind),
                    import.declared,
                    alias,
                    describe(&import.target)
                );
            }
            println!("{} imports, {} unresolved", imports.imports.len(), unresolved);
        }
    }
}
