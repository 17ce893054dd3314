//! Variable resolution.
//!
//! Order: locals at the usage offset, the file's own variable table,
//! variables of imported resources (depth first), variable files, project
//! globals, BuiltIn.

use std::collections::HashSet;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use super::{line_at_offset, ContinueDecision};
use crate::library::BUILTIN_VARIABLES;
use crate::model::{CodeUnit, FileModel, SectionKind, SettingKind, UnitItem};
use crate::project::{ModelSource, ProjectContext};
use crate::varsyntax;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum VariableOrigin {
    /// Keyword arguments, embedded name arguments, assignments and loop
    /// variables of the enclosing unit.
    Local,
    /// The usage file's own variable table.
    File,
    Resource,
    VariableFile,
    Global,
    BuiltIn,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableEntity {
    /// As written at the definition, e.g. `${my var}`.
    pub name: String,
    /// Normalized name without sigil or braces.
    pub base: String,
    pub origin: VariableOrigin,
    /// Defining file, or a label for globals and BuiltIn.
    pub source: String,
    /// 0 when the definition has no source position.
    pub line: u32,
}

impl VariableEntity {
    fn new(name: String, base: String, origin: VariableOrigin, source: String, line: u32) -> Self {
        VariableEntity {
            name,
            base,
            origin,
            source,
            line,
        }
    }

    /// From a declaring cell such as `${x}=`, `@{rest}` or `${b}=default`.
    fn declared(text: &str, origin: VariableOrigin, source: &str, line: u32) -> Option<Self> {
        let trimmed = text.trim().trim_end_matches('=').trim_end();
        let first = varsyntax::find_variables(trimmed).into_iter().next()?;
        if first.start != 0 || first.sigil == '%' {
            return None;
        }
        let base = varsyntax::normalize(&first.name);
        Some(Self::new(first.full_text(), base, origin, source.to_owned(), line))
    }

    /// From a configured name; bare names without a sigil count as scalars.
    fn configured(text: &str, origin: VariableOrigin, source: &str) -> Self {
        Self::declared(text, origin, source, 0).unwrap_or_else(|| {
            let bare = text.trim();
            Self::new(
                format!("${{{bare}}}"),
                varsyntax::normalize(bare),
                origin,
                source.to_owned(),
                0,
            )
        })
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

/// Variables always defined regardless of imports: environment variables,
/// numbers and inline Python expressions.
fn is_intrinsic(sigil: char, name: &str) -> bool {
    if sigil == '%' {
        return true;
    }
    if sigil != '$' {
        return false;
    }
    if name.starts_with('{') && name.ends_with('}') {
        return true;
    }
    let number = name.trim().replace('_', "");
    let number = number.strip_prefix('-').unwrap_or(&number);
    let lower = number.to_ascii_lowercase();
    let radix = [("0x", 16), ("0o", 8), ("0b", 2)]
        .into_iter()
        .find_map(|(prefix, radix)| lower.strip_prefix(prefix).map(|digits| (digits, radix)));
    match radix {
        Some((digits, radix)) => !digits.is_empty() && u64::from_str_radix(digits, radix).is_ok(),
        None => number.parse::<f64>().is_ok() && !lower.contains("inf") && !lower.contains("nan"),
    }
}

/// Variables visible from one file, optionally at a byte offset.
pub struct VariableLocator<'c> {
    ctx: &'c ProjectContext,
    file: Arc<FileModel>,
}

impl<'c> VariableLocator<'c> {
    pub fn new(ctx: &'c ProjectContext, file: Arc<FileModel>) -> Self {
        VariableLocator { ctx, file }
    }

    /// Every visible definition in priority order. Without an offset no
    /// local variables are visited.
    pub fn visit(
        &self,
        offset: Option<usize>,
        mut callback: impl FnMut(VariableEntity) -> ContinueDecision,
    ) {
        let _ = self.walk(offset, &mut callback);
    }

    fn walk(
        &self,
        offset: Option<usize>,
        callback: &mut dyn FnMut(VariableEntity) -> ContinueDecision,
    ) -> ControlFlow<()> {
        let usage = self.file.path();
        let usage_label = display(usage);

        if let Some(line) = offset.and_then(|o| line_at_offset(&self.file, o)) {
            for local in self.locals_at(line) {
                callback(local).flow()?;
            }
        }

        for entity in table_variables(&self.file, VariableOrigin::File, &usage_label) {
            callback(entity).flow()?;
        }

        let mut visited: HashSet<PathBuf> = HashSet::new();
        visited.insert(self.ctx.workspace().canonicalize(usage));
        let mut variable_files: Vec<PathBuf> = Vec::new();
        self.walk_resources(&self.file, &mut visited, &mut variable_files, callback)?;

        for path in &variable_files {
            let Some(spec) = self.ctx.variable_file(path) else {
                debug!(file = %path.display(), "no introspection data for variable file");
                continue;
            };
            let label = display(path);
            for name in &spec.variables {
                callback(VariableEntity::configured(name, VariableOrigin::VariableFile, &label))
                    .flow()?;
            }
        }

        for name in self.ctx.global_variables() {
            callback(VariableEntity::configured(name, VariableOrigin::Global, "global")).flow()?;
        }
        for name in BUILTIN_VARIABLES {
            callback(VariableEntity::configured(name, VariableOrigin::BuiltIn, "BuiltIn")).flow()?;
        }
        ControlFlow::Continue(())
    }

    /// Walks resources imported by `model`, collecting variable files of the
    /// whole import tree into `variable_files`.
    fn walk_resources(
        &self,
        model: &FileModel,
        visited: &mut HashSet<PathBuf>,
        variable_files: &mut Vec<PathBuf>,
        callback: &mut dyn FnMut(VariableEntity) -> ContinueDecision,
    ) -> ControlFlow<()> {
        let imports = self.ctx.imports(model);
        for path in imports.variable_files() {
            if !variable_files.iter().any(|p| p == path) {
                variable_files.push(path.to_path_buf());
            }
        }
        for path in imports.resources() {
            if !visited.insert(path.to_path_buf()) {
                debug!(resource = %path.display(), "resource already visited");
                continue;
            }
            let Some(resource) = self.ctx.model(path) else {
                continue;
            };
            for entity in table_variables(&resource, VariableOrigin::Resource, &display(path)) {
                callback(entity).flow()?;
            }
            self.walk_resources(&resource, visited, variable_files, callback)?;
        }
        ControlFlow::Continue(())
    }

    /// Local variables visible on `line`: definitions of the unit covering
    /// it, from rows strictly before that line.
    fn locals_at(&self, line: u32) -> Vec<VariableEntity> {
        let label = display(self.file.path());
        for table in self.file.code_tables() {
            let Some((index, _)) = table.find_by_line(line) else {
                continue;
            };
            return table
                .get(index)
                .map(|unit| unit_locals(unit, line, &label))
                .unwrap_or_default();
        }
        Vec::new()
    }

    /// Candidates for a usage such as `${x}`, `@{list}[0]`, `${obj.attr}` or
    /// a bare `x`, in priority order.
    pub fn find(&self, usage: &str, offset: Option<usize>) -> Vec<VariableEntity> {
        let Some(names) = lookup_names(usage) else {
            return Vec::new();
        };
        let mut found: Vec<VariableEntity> = Vec::new();
        self.visit(offset, |entity| {
            if names.contains(&entity.base) && !found.contains(&entity) {
                found.push(entity);
            }
            ContinueDecision::Continue
        });
        found
    }

    /// The definition `usage` refers to.
    pub fn resolve(&self, usage: &str, offset: Option<usize>) -> Option<VariableEntity> {
        let names = lookup_names(usage)?;
        let mut best = None;
        self.visit(offset, |entity| {
            if names.contains(&entity.base) {
                best = Some(entity);
                ContinueDecision::Stop
            } else {
                ContinueDecision::Continue
            }
        });
        best
    }

    pub fn is_accessible(&self, usage: &str, offset: Option<usize>) -> bool {
        if let Some(first) = varsyntax::find_variables(usage.trim()).first() {
            if is_intrinsic(first.sigil, &first.name) {
                return true;
            }
        }
        self.resolve(usage, offset).is_some()
    }

    /// Visible variables, one per base name; the highest-priority
    /// definition shadows the rest.
    pub fn all_accessible(&self, offset: Option<usize>) -> Vec<VariableEntity> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut all = Vec::new();
        self.visit(offset, |entity| {
            if seen.insert(entity.base.clone()) {
                all.push(entity);
            }
            ContinueDecision::Continue
        });
        all
    }
}

/// Normalized names a usage may refer to, or `None` for intrinsic values.
fn lookup_names(usage: &str) -> Option<Vec<String>> {
    let usage = usage.trim();
    match varsyntax::find_variables(usage).into_iter().next() {
        Some(first) if is_intrinsic(first.sigil, &first.name) => None,
        Some(first) => Some(varsyntax::lookup_names(&first.name)),
        None if usage.is_empty() => None,
        None => Some(varsyntax::lookup_names(usage)),
    }
}

fn table_variables(model: &FileModel, origin: VariableOrigin, label: &str) -> Vec<VariableEntity> {
    model
        .variables
        .variables
        .iter()
        .filter_map(|var| {
            let base = var.lookup_name()?;
            Some(VariableEntity::new(
                var.name_text().trim_end_matches('=').trim_end().to_owned(),
                base,
                origin,
                label.to_owned(),
                var.line(),
            ))
        })
        .collect()
}

fn unit_locals(unit: &CodeUnit, line: u32, label: &str) -> Vec<VariableEntity> {
    let mut locals = Vec::new();
    if unit.section == SectionKind::Keywords {
        if let Some(arguments) = unit.setting(SettingKind::Arguments) {
            locals.extend(arguments.values.iter().filter_map(|value| {
                VariableEntity::declared(&value.text, VariableOrigin::Local, label, value.line)
            }));
        }
        if let Some(name) = &unit.name {
            locals.extend(
                varsyntax::find_variables(&name.text)
                    .into_iter()
                    .filter(|v| v.sigil == '$')
                    .map(|v| {
                        // `${n:\d+}` declares `n`.
                        let bare = v.name.split(':').next().unwrap_or(&v.name).to_owned();
                        VariableEntity::new(
                            format!("${{{bare}}}"),
                            varsyntax::normalize(&bare),
                            VariableOrigin::Local,
                            label.to_owned(),
                            name.line,
                        )
                    }),
            );
        }
    }
    for item in &unit.items {
        let UnitItem::Row(row) = item else {
            continue;
        };
        if row.line() >= line {
            break;
        }
        for token in row.assignments.iter().chain(row.loop_variables()) {
            if let Some(entity) =
                VariableEntity::declared(&token.text, VariableOrigin::Local, label, token.line)
            {
                locals.push(entity);
            }
        }
    }
    locals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::VariableFileSpec;
    use crate::project::ProjectConfig;
    use crate::workspace::InMemoryWorkspace;

    const SUITE: &str = "\
*** Settings ***
Resource    common.resource
Variables    vars.py

*** Variables ***
${SHARED}    suite

*** Keywords ***
Wait ${n} Seconds
    [Arguments]    ${a}    ${b}=2
    ${x}=    Set Variable    1
    Log    ${x}
    FOR    ${i}    IN RANGE    3
        Log    ${i}
    END
    ${late}=    Set Variable    2
";

    const COMMON: &str = "\
*** Settings ***
Resource    suite.robot

*** Variables ***
${SHARED}    resource
${HOST}    localhost
";

    fn context() -> ProjectContext {
        let ws = InMemoryWorkspace::new()
            .with_file("/p/suite.robot", SUITE)
            .with_file("/p/common.resource", COMMON)
            .with_file("/p/vars.py", "");
        let config = ProjectConfig {
            variable_files: vec![VariableFileSpec {
                path: "vars.py".into(),
                variables: vec!["${PORT}".into()],
            }],
            global_variables: vec!["${BROWSER}".into()],
            ..ProjectConfig::default()
        };
        ProjectContext::new(config, Arc::new(ws))
    }

    #[test]
    fn locals_come_from_preceding_rows_only() {
        let ctx = context();
        let file = ctx.load(Path::new("/p/suite.robot")).unwrap();
        let locator = VariableLocator::new(&ctx, file);
        let offset = SUITE.find("Log    ${x}").unwrap();
        let locals: Vec<String> = locator
            .all_accessible(Some(offset))
            .into_iter()
            .filter(|v| v.origin == VariableOrigin::Local)
            .map(|v| v.base)
            .collect();
        assert_eq!(locals, vec!["a", "b", "n", "x"]);
        assert!(!locator.is_accessible("${late}", Some(offset)));
        assert!(!locator.is_accessible("${x}", None));
    }

    #[test]
    fn file_variables_shadow_resource_ones() {
        let ctx = context();
        let file = ctx.load(Path::new("/p/suite.robot")).unwrap();
        let locator = VariableLocator::new(&ctx, file);
        let found = locator.find("${shared}", None);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].origin, VariableOrigin::File);
        assert_eq!(found[1].origin, VariableOrigin::Resource);
        assert_eq!(locator.resolve("${SHARED}", None).unwrap().origin, VariableOrigin::File);
        assert_eq!(locator.resolve("${host}", None).unwrap().source, "/p/common.resource");
    }

    #[test]
    fn variable_files_globals_and_builtins() {
        let ctx = context();
        let file = ctx.load(Path::new("/p/suite.robot")).unwrap();
        let locator = VariableLocator::new(&ctx, file);
        let origin = |usage: &str| locator.resolve(usage, None).map(|v| v.origin);
        assert_eq!(origin("${PORT}"), Some(VariableOrigin::VariableFile));
        assert_eq!(origin("${browser}"), Some(VariableOrigin::Global));
        assert_eq!(origin("${EMPTY}"), Some(VariableOrigin::BuiltIn));
        assert_eq!(origin("@{EMPTY}"), Some(VariableOrigin::BuiltIn));
        assert_eq!(origin("${missing}"), None);
    }

    #[test]
    fn intrinsic_values_are_always_accessible() {
        let ctx = context();
        let file = ctx.load(Path::new("/p/suite.robot")).unwrap();
        let locator = VariableLocator::new(&ctx, file);
        for usage in ["%{HOME}", "${42}", "${-1.5}", "${0x1F}", "${{1 + 2}}"] {
            assert!(locator.is_accessible(usage, None), "{usage}");
        }
        assert!(!locator.is_accessible("${0xZZ}", None));
        assert!(locator.is_accessible("${SHARED.upper()}", None));
    }

    #[test]
    fn stop_ends_the_walk() {
        let ctx = context();
        let file = ctx.load(Path::new("/p/suite.robot")).unwrap();
        let locator = VariableLocator::new(&ctx, file);
        let mut seen = 0;
        locator.visit(None, |_| {
            seen += 1;
            ContinueDecision::Stop
        });
        assert_eq!(seen, 1);
    }
}
