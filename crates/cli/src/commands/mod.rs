pub(crate) mod find;
pub(crate) mod imports;
pub(crate) mod keywords;
pub(crate) mod parse;
pub(crate) mod roundtrip;
pub(crate) mod variables;

use std::path::Path;
use std::process;
use std::sync::Arc;

use rfkit_core::{FileModel, ProjectContext};

use crate::{report_error, OutputFormat};

/// Load `file` through the project, exiting with status 1 when it cannot be
/// read.
pub(crate) fn load_model(
    project: &ProjectContext,
    file: &Path,
    output: OutputFormat,
    quiet: bool,
) -> Arc<FileModel> {
    match project.load(file) {
        Ok(model) => model,
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    }
}
