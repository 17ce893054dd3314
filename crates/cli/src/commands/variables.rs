use std::path::Path;
use std::process;

use rfkit_core::{FileModel, ProjectContext, VariableEntity, VariableLocator};

use super::load_model;
use crate::{print_json, report_error, OutputFormat};

/// Byte offset of the first cell on `line`, falling back to the last cell
/// before it when the line holds nothing.
fn offset_of_line(model: &FileModel, line: u32) -> Option<usize> {
    let tokens = model.all_tokens();
    let placed = tokens.iter().filter(|t| t.is_placed());
    placed
        .clone()
        .filter(|t| t.line == line)
        .map(|t| t.offset)
        .min()
        .or_else(|| placed.filter(|t| t.line < line).map(|t| t.offset).max())
}

fn describe(variable: &VariableEntity) -> String {
    let location = if variable.line > 0 {
        format!("{}:{}", variable.source, variable.line)
    } else {
        variable.source.clone()
    };
    format!("{}  {:?}  {location}", variable.name, variable.origin)
}

pub(crate) fn cmd_variables(
    project: &ProjectContext,
    file: &Path,
    line: Option<u32>,
    name: Option<&str>,
    output: OutputFormat,
    quiet: bool,
) {
    let model = load_model(project, file, output, quiet);
    let offset = line.and_then(|l| offset_of_line(&model, l));
    let locator = VariableLocator::new(project, model);

    if let Some(name) = name {
        if !locator.is_accessible(name, offset) {
            report_error(&format!("variable '{name}' is not accessible here"), output, quiet);
            process::exit(1);
        }
        let found = locator.resolve(name, offset);
        if quiet {
            return;
        }
        match (output, found) {
            (OutputFormat::Json, found) => print_json(&found),
            (OutputFormat::Text, Some(found)) => println!("{}", describe(&found)),
            (OutputFormat::Text, None) => println!("{name}  always defined"),
        }
        return;
    }

    let visible = locator.all_accessible(offset);
    if quiet {
        return;
    }
    match output {
        OutputFormat::Json => print_json(&visible),
        OutputFormat::Text => {
            for variable in &visible {
                println!("{}", describe(variable));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfkit_core::{parse_source, LanguageVersion};

    #[test]
    fn line_offsets_fall_back_to_earlier_cells() {
        let src = "*** Keywords ***\nK\n\n    Log    x\n";
        let model = parse_source(src, "k.robot", LanguageVersion::LATEST);
        assert_eq!(offset_of_line(&model, 2), Some(src.find("K\n").unwrap()));
        assert_eq!(offset_of_line(&model, 4), Some(src.find("Log    x").unwrap()));
        assert!(offset_of_line(&model, 3).unwrap() < src.find("Log    x").unwrap());
    }
}
