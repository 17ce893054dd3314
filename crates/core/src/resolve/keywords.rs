//! Keyword resolution.
//!
//! Priority order of the walk: keywords of the usage file, keywords of
//! imported resources (depth first, each file at most once), libraries
//! imported by those resources, libraries imported by the file itself, and
//! finally BuiltIn.
//!
//! A usage name is matched in three steps, stopping at the first step with
//! a hit: the whole text as a bare name, then as `Source.Name` split at each
//! `.` from the last to the first, then against embedded-argument patterns.
//! A leading `Given`/`When`/`Then`/`And`/`But` is tried with and then
//! without.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tracing::debug;

use super::{is_standard_library, source_name, ContinueDecision, Scope};
use crate::arguments::ArgumentsDescriptor;
use crate::embedded::EmbeddedPattern;
use crate::imports::{FileImports, ImportTarget, ResolvedImport};
use crate::library::{self, LibrarySpec};
use crate::model::{CodeUnit, FileModel, SettingKind};
use crate::project::{ModelSource, ProjectContext};
use crate::varsyntax;

const BDD_PREFIXES: &[&str] = &["given ", "when ", "then ", "and ", "but "];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordEntity {
    /// The name the keyword is referred to by at the usage site.
    pub name_in_use: String,
    /// The name as defined.
    pub name: String,
    /// Resource file stem or library name, used to qualify the name.
    pub source_name: String,
    pub alias: Option<String>,
    pub scope: Scope,
    pub deprecated: bool,
    pub arguments: ArgumentsDescriptor,
    /// File that defines the keyword, or that imports its library.
    pub exposing_file: PathBuf,
    /// Definition line for user keywords; 0 for library keywords.
    pub line: u32,
}

type Identity = (String, String, Scope, Option<String>);

impl KeywordEntity {
    /// Two entities are the same keyword iff these compare equal.
    pub fn identity(&self) -> Identity {
        (
            varsyntax::normalize(&self.name_in_use),
            varsyntax::normalize(&self.name),
            self.scope,
            self.alias.as_deref().map(varsyntax::normalize),
        )
    }

    /// Name qualified by its alias or source, e.g. `Collections.Append To List`.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.alias.as_deref().unwrap_or(&self.source_name), self.name)
    }

    pub fn has_embedded_arguments(&self) -> bool {
        varsyntax::find_variables(&self.name)
            .iter()
            .any(|v| v.sigil == '$')
    }

    fn user(unit: &CodeUnit, scope: Scope, file: &Path) -> Option<KeywordEntity> {
        if unit.is_anonymous() {
            return None;
        }
        let arguments = unit
            .setting(SettingKind::Arguments)
            .map(|s| ArgumentsDescriptor::from_keyword_arguments(&s.value_texts()))
            .unwrap_or_default();
        let deprecated = unit
            .setting(SettingKind::Documentation)
            .and_then(|doc| doc.values.first())
            .is_some_and(|t| t.text.starts_with("*DEPRECATED"));
        Some(KeywordEntity {
            name_in_use: unit.name_text().to_owned(),
            name: unit.name_text().to_owned(),
            source_name: source_name(file),
            alias: None,
            scope,
            deprecated,
            arguments,
            exposing_file: file.to_path_buf(),
            line: unit.line,
        })
    }

    fn library(
        spec: &LibrarySpec,
        keyword: &library::KeywordSpec,
        alias: Option<&str>,
        importer: &Path,
    ) -> KeywordEntity {
        KeywordEntity {
            name_in_use: keyword.name.clone(),
            name: keyword.name.clone(),
            source_name: spec.name.clone(),
            alias: alias.map(str::to_owned),
            scope: if is_standard_library(&spec.name) {
                Scope::StandardLibrary
            } else {
                Scope::ReferencedLibrary
            },
            deprecated: keyword.deprecated,
            arguments: keyword.arguments(),
            exposing_file: importer.to_path_buf(),
            line: 0,
        }
    }
}

/// Merge same-identity entities, keeping first-seen order. On a conflict the
/// entity exposed by the usage file wins.
fn dedupe(entities: Vec<KeywordEntity>, usage_file: &Path) -> Vec<KeywordEntity> {
    let mut index: HashMap<Identity, usize> = HashMap::new();
    let mut kept: Vec<KeywordEntity> = Vec::with_capacity(entities.len());
    for entity in entities {
        match index.get(&entity.identity()) {
            Some(&at) => {
                if entity.exposing_file == usage_file && kept[at].exposing_file != usage_file {
                    kept[at] = entity;
                }
            }
            None => {
                index.insert(entity.identity(), kept.len());
                kept.push(entity);
            }
        }
    }
    kept
}

// ──────────────────────────────────────────────
// Matching
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum MatchStep {
    /// The whole text as a bare name, or split at its last `.`.
    Direct {
        name: String,
        qualified: Option<(String, String)>,
    },
    /// Split at an earlier `.`; the rest belongs to the bare name.
    Qualified { source: String, name: String },
    Embedded(String),
}

impl MatchStep {
    /// Steps for `usage` in the order they are tried.
    fn plan(usage: &str) -> Vec<MatchStep> {
        let usage = usage.trim();
        let mut variants = vec![usage.to_owned()];
        let bdd = BDD_PREFIXES.iter().find(|p| {
            usage
                .get(..p.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(p))
        });
        if let Some(prefix) = bdd {
            let stripped = usage[prefix.len()..].trim_start();
            if !stripped.is_empty() {
                variants.push(stripped.to_owned());
            }
        }

        let mut steps = Vec::new();
        for variant in variants {
            let mut splits = variant
                .match_indices('.')
                .rev()
                .map(|(dot, _)| (&variant[..dot], &variant[dot + 1..]))
                .filter(|(source, name)| !source.is_empty() && !name.is_empty())
                .map(|(source, name)| (varsyntax::normalize(source), varsyntax::normalize(name)));
            steps.push(MatchStep::Direct {
                name: varsyntax::normalize(&variant),
                qualified: splits.next(),
            });
            steps.extend(splits.map(|(source, name)| MatchStep::Qualified { source, name }));
            steps.push(MatchStep::Embedded(variant));
        }
        steps
    }

    fn matches(&self, entity: &KeywordEntity, pattern: Option<&EmbeddedPattern>) -> bool {
        match self {
            MatchStep::Direct { name, qualified } => {
                varsyntax::normalize(&entity.name) == *name
                    || qualified
                        .as_ref()
                        .is_some_and(|(source, name)| qualifies(entity, source, name))
            }
            MatchStep::Qualified { source, name } => qualifies(entity, source, name),
            MatchStep::Embedded(usage) => pattern.is_some_and(|p| p.matches(usage)),
        }
    }

    fn is_embedded(&self) -> bool {
        matches!(self, MatchStep::Embedded(_))
    }

    fn usage_text(&self, original: &str) -> String {
        match self {
            MatchStep::Embedded(usage) => usage.clone(),
            _ => original.trim().to_owned(),
        }
    }
}

fn qualifies(entity: &KeywordEntity, source: &str, name: &str) -> bool {
    let qualifier = entity.alias.as_deref().unwrap_or(&entity.source_name);
    varsyntax::normalize(qualifier) == source && varsyntax::normalize(&entity.name) == name
}

fn compile_pattern(entity: &KeywordEntity) -> Option<EmbeddedPattern> {
    if !entity.has_embedded_arguments() {
        return None;
    }
    match EmbeddedPattern::compile(&entity.name) {
        Ok(pattern) => pattern,
        Err(err) => {
            debug!(error = %err, "ignoring keyword with invalid embedded pattern");
            None
        }
    }
}

// ──────────────────────────────────────────────
// Locator
// ──────────────────────────────────────────────

/// Keyword lookups from the point of view of one file.
pub struct KeywordLocator<'c> {
    ctx: &'c ProjectContext,
    file: Arc<FileModel>,
}

impl<'c> KeywordLocator<'c> {
    pub fn new(ctx: &'c ProjectContext, file: Arc<FileModel>) -> Self {
        KeywordLocator { ctx, file }
    }

    pub fn file(&self) -> &FileModel {
        &self.file
    }

    /// Every accessible keyword in priority order, possibly repeated when
    /// reachable along several import paths.
    pub fn visit(&self, mut callback: impl FnMut(KeywordEntity) -> ContinueDecision) {
        let _ = self.walk(&mut callback);
    }

    fn walk(&self, callback: &mut dyn FnMut(KeywordEntity) -> ContinueDecision) -> ControlFlow<()> {
        let usage = self.file.path();
        for unit in &self.file.keywords.units {
            if let Some(entity) = KeywordEntity::user(unit, Scope::Local, usage) {
                callback(entity).flow()?;
            }
        }

        let imports = self.ctx.imports(&self.file);
        let mut visited: HashSet<PathBuf> = HashSet::new();
        visited.insert(self.ctx.workspace().canonicalize(usage));
        let mut resource_libraries: Vec<(ResolvedImport, PathBuf)> = Vec::new();
        self.walk_resources(&imports, &mut visited, &mut resource_libraries, callback)?;

        for (import, importer) in &resource_libraries {
            self.walk_library(import, importer, callback)?;
        }
        for import in imports.libraries() {
            self.walk_library(import, usage, callback)?;
        }
        let builtin = self.ctx.libraries().builtin();
        for keyword in &builtin.keywords {
            callback(KeywordEntity::library(builtin, keyword, None, usage)).flow()?;
        }
        ControlFlow::Continue(())
    }

    fn walk_resources(
        &self,
        imports: &FileImports,
        visited: &mut HashSet<PathBuf>,
        libraries: &mut Vec<(ResolvedImport, PathBuf)>,
        callback: &mut dyn FnMut(KeywordEntity) -> ContinueDecision,
    ) -> ControlFlow<()> {
        for path in imports.resources() {
            if !visited.insert(path.to_path_buf()) {
                debug!(resource = %path.display(), "resource already visited");
                continue;
            }
            let Some(model) = self.ctx.model(path) else {
                continue;
            };
            for unit in &model.keywords.units {
                if let Some(entity) = KeywordEntity::user(unit, Scope::Resource, path) {
                    callback(entity).flow()?;
                }
            }
            let nested = self.ctx.imports(&model);
            libraries.extend(nested.libraries().map(|i| (i.clone(), path.to_path_buf())));
            self.walk_resources(&nested, visited, libraries, callback)?;
        }
        ControlFlow::Continue(())
    }

    fn walk_library(
        &self,
        import: &ResolvedImport,
        importer: &Path,
        callback: &mut dyn FnMut(KeywordEntity) -> ContinueDecision,
    ) -> ControlFlow<()> {
        let ImportTarget::Library(name) = &import.target else {
            return ControlFlow::Continue(());
        };
        let Some(spec) = self.ctx.libraries().get(name) else {
            return ControlFlow::Continue(());
        };
        for keyword in &spec.keywords {
            let entity = KeywordEntity::library(spec, keyword, import.alias.as_deref(), importer);
            callback(entity).flow()?;
        }
        ControlFlow::Continue(())
    }

    /// Candidates for `usage`, delivered to `on_match` best step first.
    /// `Stop` ends the search; everything delivered so far is returned.
    pub fn find_matching(
        &self,
        usage: &str,
        mut on_match: impl FnMut(&KeywordEntity) -> ContinueDecision,
    ) -> Vec<KeywordEntity> {
        let mut delivered = Vec::new();
        for step in MatchStep::plan(usage) {
            let mut hits = Vec::new();
            self.visit(|entity| {
                let pattern = if step.is_embedded() {
                    compile_pattern(&entity)
                } else {
                    None
                };
                if step.matches(&entity, pattern.as_ref()) {
                    hits.push(KeywordEntity {
                        name_in_use: step.usage_text(usage),
                        ..entity
                    });
                }
                ContinueDecision::Continue
            });
            if hits.is_empty() {
                continue;
            }
            for hit in dedupe(hits, self.file.path()) {
                let decision = on_match(&hit);
                delivered.push(hit);
                if decision == ContinueDecision::Stop {
                    break;
                }
            }
            break;
        }
        delivered
    }

    /// All candidates for `usage`.
    pub fn find_all(&self, usage: &str) -> Vec<KeywordEntity> {
        self.find_matching(usage, |_| ContinueDecision::Continue)
    }

    /// The keyword `usage` resolves to: a candidate from the best scope, the
    /// usage file's own definitions shadowing everything imported.
    pub fn resolve(&self, usage: &str) -> Option<KeywordEntity> {
        best_candidate(self.find_all(usage))
    }

    pub fn is_accessible(&self, usage: &str) -> bool {
        let mut found = false;
        self.find_matching(usage, |_| {
            found = true;
            ContinueDecision::Stop
        });
        found
    }

    pub fn all_accessible_grouped_by_scope(&self) -> BTreeMap<Scope, Vec<KeywordEntity>> {
        let mut grouped: BTreeMap<Scope, Vec<KeywordEntity>> = BTreeMap::new();
        for entity in self.accessible() {
            grouped.entry(entity.scope).or_default().push(entity);
        }
        grouped
    }

    /// Accessible keywords, deduplicated, in priority order.
    pub fn accessible(&self) -> Vec<KeywordEntity> {
        let mut all = Vec::new();
        self.visit(|entity| {
            all.push(entity);
            ContinueDecision::Continue
        });
        dedupe(all, self.file.path())
    }

    /// Keywords of known libraries that the file does not reach through its
    /// imports, for offering the missing import.
    pub fn non_accessible(&self) -> Vec<KeywordEntity> {
        let mut reachable: HashSet<String> = HashSet::new();
        self.visit(|entity| {
            if matches!(entity.scope, Scope::StandardLibrary | Scope::ReferencedLibrary) {
                reachable.insert(varsyntax::normalize(&entity.source_name));
            }
            ContinueDecision::Continue
        });
        let usage = self.file.path();
        self.ctx
            .libraries()
            .iter()
            .filter(|lib| !reachable.contains(&varsyntax::normalize(&lib.name)))
            .flat_map(|lib| {
                lib.keywords
                    .iter()
                    .map(move |kw| KeywordEntity::library(lib, kw, None, usage))
            })
            .collect()
    }

    /// Non-accessible keywords matching `usage` by bare name or pattern.
    pub fn find_non_accessible(&self, usage: &str) -> Vec<KeywordEntity> {
        let candidates = self.non_accessible();
        for step in MatchStep::plan(usage) {
            let hits: Vec<KeywordEntity> = candidates
                .iter()
                .filter(|e| step.matches(e, compile_pattern(e).as_ref()))
                .cloned()
                .collect();
            if !hits.is_empty() {
                return hits;
            }
        }
        Vec::new()
    }
}

fn best_candidate(candidates: Vec<KeywordEntity>) -> Option<KeywordEntity> {
    candidates
        .into_iter()
        .enumerate()
        .min_by_key(|(order, e)| (e.scope.priority(), *order))
        .map(|(_, e)| e)
}

// ──────────────────────────────────────────────
// Cached name -> candidates map
// ──────────────────────────────────────────────

/// A snapshot of everything accessible from one file, indexed by name.
#[derive(Debug)]
pub struct AccessibleKeywords {
    usage_file: PathBuf,
    entities: Vec<KeywordEntity>,
    by_name: HashMap<String, Vec<usize>>,
    patterns: Vec<(usize, EmbeddedPattern)>,
}

impl AccessibleKeywords {
    pub fn build(locator: &KeywordLocator<'_>) -> Self {
        let entities = locator.accessible();
        let mut by_name: HashMap<String, Vec<usize>> = HashMap::new();
        let mut patterns = Vec::new();
        for (i, entity) in entities.iter().enumerate() {
            by_name
                .entry(varsyntax::normalize(&entity.name))
                .or_default()
                .push(i);
            if let Some(pattern) = compile_pattern(entity) {
                patterns.push((i, pattern));
            }
        }
        AccessibleKeywords {
            usage_file: locator.file().path().to_path_buf(),
            entities,
            by_name,
            patterns,
        }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeywordEntity> {
        self.entities.iter()
    }

    pub fn find(&self, usage: &str) -> Vec<KeywordEntity> {
        for step in MatchStep::plan(usage) {
            let indices: Vec<usize> = match &step {
                MatchStep::Direct { name, qualified: None } => {
                    self.by_name.get(name).cloned().unwrap_or_default()
                }
                MatchStep::Direct { .. } | MatchStep::Qualified { .. } => (0..self.entities.len())
                    .filter(|&i| step.matches(&self.entities[i], None))
                    .collect(),
                MatchStep::Embedded(_) => self
                    .patterns
                    .iter()
                    .filter(|(i, p)| step.matches(&self.entities[*i], Some(p)))
                    .map(|(i, _)| *i)
                    .collect(),
            };
            if indices.is_empty() {
                continue;
            }
            let hits = indices
                .into_iter()
                .map(|i| KeywordEntity {
                    name_in_use: step.usage_text(usage),
                    ..self.entities[i].clone()
                })
                .collect();
            return dedupe(hits, &self.usage_file);
        }
        Vec::new()
    }

    pub fn resolve(&self, usage: &str) -> Option<KeywordEntity> {
        best_candidate(self.find(usage))
    }
}

/// Per-file [`AccessibleKeywords`], rebuilt when the store generation moves.
#[derive(Debug, Default)]
pub struct KeywordCache {
    entries: Mutex<HashMap<PathBuf, (u64, Arc<AccessibleKeywords>)>>,
}

impl KeywordCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accessible(
        &self,
        ctx: &ProjectContext,
        file: Arc<FileModel>,
    ) -> Arc<AccessibleKeywords> {
        let key = file.path().to_path_buf();
        let generation = ctx.store().generation();
        {
            let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some((built_at, cached)) = entries.get(&key) {
                if *built_at == generation {
                    return Arc::clone(cached);
                }
            }
        }
        let built = Arc::new(AccessibleKeywords::build(&KeywordLocator::new(ctx, file)));
        // Building may load imported files; stamp with the generation after.
        let generation = ctx.store().generation();
        debug!(file = %key.display(), keywords = built.len(), generation, "rebuilt keyword map");
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key, (generation, Arc::clone(&built)));
        built
    }

    pub fn invalidate(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::{KeywordSpec, LibrarySpec};
    use crate::project::ProjectConfig;
    use crate::workspace::InMemoryWorkspace;

    fn context(files: &[(&str, &str)], libraries: Vec<LibrarySpec>) -> ProjectContext {
        let mut ws = InMemoryWorkspace::new();
        for (path, text) in files {
            ws.insert(path, *text);
        }
        let config = ProjectConfig {
            libraries,
            ..ProjectConfig::default()
        };
        ProjectContext::new(config, Arc::new(ws))
    }

    #[test]
    fn match_plan_order() {
        let steps = MatchStep::plan("Given a.b.c");
        assert_eq!(
            steps[0],
            MatchStep::Direct {
                name: "givena.b.c".into(),
                qualified: Some(("givena.b".into(), "c".into())),
            }
        );
        assert_eq!(
            steps[1],
            MatchStep::Qualified {
                source: "givena".into(),
                name: "b.c".into()
            }
        );
        assert!(steps.contains(&MatchStep::Direct {
            name: "a.b.c".into(),
            qualified: Some(("a.b".into(), "c".into())),
        }));
        assert!(steps.contains(&MatchStep::Qualified {
            source: "a".into(),
            name: "b.c".into()
        }));
        assert_eq!(
            MatchStep::plan("Log")[0],
            MatchStep::Direct {
                name: "log".into(),
                qualified: None,
            }
        );
    }

    #[test]
    fn dotted_names_and_qualified_names_share_a_tier() {
        let lib = LibrarySpec {
            name: "MyLib".into(),
            path: None,
            keywords: vec![KeywordSpec::new("Run", &[])],
        };
        let ctx = context(
            &[(
                "/s.robot",
                "*** Settings ***\nLibrary    MyLib\n\n*** Keywords ***\nMyLib.Run\n    No Operation\n",
            )],
            vec![lib],
        );
        let file = ctx.load(Path::new("/s.robot")).unwrap();
        let locator = KeywordLocator::new(&ctx, Arc::clone(&file));
        let mut scopes: Vec<Scope> = locator
            .find_all("MyLib.Run")
            .iter()
            .map(|k| k.scope)
            .collect();
        scopes.sort();
        assert_eq!(scopes, vec![Scope::Local, Scope::ReferencedLibrary]);
        assert_eq!(locator.resolve("MyLib.Run").unwrap().scope, Scope::Local);

        let map = AccessibleKeywords::build(&locator);
        assert_eq!(map.find("mylib.run").len(), 2);
    }

    #[test]
    fn alias_qualifies_library_keywords() {
        let lib = LibrarySpec {
            name: "MyLib".into(),
            path: None,
            keywords: vec![KeywordSpec::new("Do It", &[])],
        };
        let ctx = context(
            &[("/s.robot", "*** Settings ***\nLibrary    MyLib    AS    Short\n")],
            vec![lib],
        );
        let file = ctx.load(Path::new("/s.robot")).unwrap();
        let locator = KeywordLocator::new(&ctx, file);
        let found = locator.resolve("Short.Do It").unwrap();
        assert_eq!(found.alias.as_deref(), Some("Short"));
        assert_eq!(found.scope, Scope::ReferencedLibrary);
        assert!(locator.resolve("MyLib.Do It").is_none());
        assert!(locator.resolve("do_it").is_some());
    }

    #[test]
    fn stop_halts_the_search() {
        let ctx = context(
            &[("/s.robot", "*** Keywords ***\nLog\n    No Operation\n")],
            vec![],
        );
        let file = ctx.load(Path::new("/s.robot")).unwrap();
        let locator = KeywordLocator::new(&ctx, file);
        assert_eq!(locator.find_all("Log").len(), 2);
        let mut seen = 0;
        let delivered = locator.find_matching("Log", |_| {
            seen += 1;
            ContinueDecision::Stop
        });
        assert_eq!(seen, 1);
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].scope, Scope::Local);
    }

    #[test]
    fn non_accessible_library_keywords() {
        let lib = LibrarySpec {
            name: "Collections".into(),
            path: None,
            keywords: vec![KeywordSpec::new("Append To List", &["list_", "*values"])],
        };
        let ctx = context(&[("/s.robot", "*** Test Cases ***\nT\n    Log    x\n")], vec![lib]);
        let file = ctx.load(Path::new("/s.robot")).unwrap();
        let locator = KeywordLocator::new(&ctx, file);
        assert!(!locator.is_accessible("Append To List"));
        let offered = locator.find_non_accessible("append to list");
        assert_eq!(offered.len(), 1);
        assert_eq!(offered[0].source_name, "Collections");
    }

    #[test]
    fn cache_rebuilds_after_republish() {
        let ctx = context(&[("/s.robot", "*** Keywords ***\nOld\n")], vec![]);
        let cache = KeywordCache::new();
        let file = ctx.load(Path::new("/s.robot")).unwrap();
        let first = cache.accessible(&ctx, file.clone());
        assert!(Arc::ptr_eq(&first, &cache.accessible(&ctx, file)));
        assert!(first.resolve("Old").is_some());

        let file = ctx.update(Path::new("/s.robot"), "*** Keywords ***\nNew\n");
        let second = cache.accessible(&ctx, file);
        assert!(second.resolve("Old").is_none());
        assert!(second.resolve("New").is_some());
    }
}
