//! Keyword, variable and import resolution over an in-memory workspace.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use rfkit_core::imports::UnresolvedReason;
use rfkit_core::library::KeywordSpec;
use rfkit_core::resolve::AccessibleKeywords;
use rfkit_core::{
    ContinueDecision, ImportTarget, InMemoryWorkspace, KeywordCache, KeywordLocator, LibrarySpec,
    ProjectConfig, ProjectContext, Scope, VariableLocator, VariableOrigin,
};

fn project(files: &[(&str, &str)], config: ProjectConfig) -> ProjectContext {
    let mut ws = InMemoryWorkspace::new();
    for (path, text) in files {
        ws.insert(path, *text);
    }
    ProjectContext::new(config, Arc::new(ws))
}

fn collections() -> LibrarySpec {
    LibrarySpec {
        name: "Collections".into(),
        path: None,
        keywords: vec![
            KeywordSpec::new("Append To List", &["list_", "*values"]),
            KeywordSpec::new("Log List", &["list_", "level=INFO"]),
        ],
    }
}

const SUITE: &str = "\
*** Settings ***
Resource    resources/common.resource
Library     Collections

*** Test Cases ***
T
    Log    hello
    Shared Step
    Wait 5 Seconds
    Log List    ${items}

*** Keywords ***
Log
    No Operation
";

const COMMON: &str = "\
*** Settings ***
Resource    ../suite.robot
Library     OperatingSystem

*** Keywords ***
Shared Step
    No Operation
Wait ${n} Seconds
    [Arguments]    ${unused}=1
    Sleep    ${n}
Log List
    [Documentation]    *DEPRECATED* local variant
    No Operation
";

fn suite_project() -> ProjectContext {
    let config = ProjectConfig {
        libraries: vec![
            collections(),
            LibrarySpec {
                name: "OperatingSystem".into(),
                path: None,
                keywords: vec![KeywordSpec::new("Create File", &["path", "content="])],
            },
        ],
        ..ProjectConfig::default()
    };
    project(
        &[
            ("/p/suite.robot", SUITE),
            ("/p/resources/common.resource", COMMON),
        ],
        config,
    )
}

#[test]
fn local_definitions_shadow_builtin() {
    let ctx = suite_project();
    let file = ctx.load(Path::new("/p/suite.robot")).unwrap();
    let locator = KeywordLocator::new(&ctx, file);
    let candidates = locator.find_all("log");
    let scopes: Vec<Scope> = candidates.iter().map(|c| c.scope).collect();
    assert_eq!(scopes, vec![Scope::Local, Scope::StandardLibrary]);
    assert_eq!(locator.resolve("LOG").unwrap().scope, Scope::Local);
    assert_eq!(locator.resolve("BuiltIn.Log").unwrap().scope, Scope::StandardLibrary);
}

#[test]
fn resource_keywords_shadow_library_keywords() {
    let ctx = suite_project();
    let file = ctx.load(Path::new("/p/suite.robot")).unwrap();
    let locator = KeywordLocator::new(&ctx, file);
    let best = locator.resolve("Log List").unwrap();
    assert_eq!(best.scope, Scope::Resource);
    assert!(best.deprecated);
    assert_eq!(best.exposing_file, PathBuf::from("/p/resources/common.resource"));
    let qualified = locator.resolve("Collections.Log List").unwrap();
    assert_eq!(qualified.scope, Scope::StandardLibrary);
    assert_eq!(qualified.arguments.required_count(), 1);
}

#[test]
fn embedded_arguments_match_literal_usages() {
    let ctx = suite_project();
    let file = ctx.load(Path::new("/p/suite.robot")).unwrap();
    let locator = KeywordLocator::new(&ctx, file);
    let found = locator.resolve("Wait 5 seconds").unwrap();
    assert_eq!(found.name, "Wait ${n} Seconds");
    assert_eq!(found.name_in_use, "Wait 5 seconds");
    assert_eq!(found.line, 8);
    assert!(locator.resolve("Given wait 10 Seconds").is_some());
    assert!(locator.resolve("Wait Seconds").is_none());
}

#[test]
fn suite_definition_shadows_resource_definition() {
    let ctx = project(
        &[
            (
                "/p/s.robot",
                "*** Settings ***\nResource    r.resource\n\n*** Test Cases ***\nT\n    Foo\n\n*** Keywords ***\nFoo\n    No Operation\n",
            ),
            (
                "/p/r.resource",
                "*** Keywords ***\nFoo\n    No Operation\nWait\n    No Operation\nWait ${n} seconds\n    Sleep    ${n}\n",
            ),
        ],
        ProjectConfig::default(),
    );
    let file = ctx.load(Path::new("/p/s.robot")).unwrap();
    let locator = KeywordLocator::new(&ctx, file);

    let best = locator.resolve("Foo").unwrap();
    assert_eq!(best.scope, Scope::Local);
    assert_eq!(best.exposing_file, PathBuf::from("/p/s.robot"));
    let scopes: Vec<Scope> = locator.find_all("Foo").iter().map(|c| c.scope).collect();
    assert_eq!(scopes, vec![Scope::Local, Scope::Resource]);

    let waits = locator.find_all("Wait 5 seconds");
    assert_eq!(waits.len(), 1);
    assert_eq!(waits[0].name, "Wait ${n} seconds");
    assert_eq!(locator.resolve("Wait").unwrap().name, "Wait");
}

#[test]
fn import_cycles_are_walked_once() {
    let ctx = suite_project();
    let file = ctx.load(Path::new("/p/suite.robot")).unwrap();
    let locator = KeywordLocator::new(&ctx, file);
    let grouped = locator.all_accessible_grouped_by_scope();
    let local: Vec<&str> = grouped[&Scope::Local].iter().map(|k| k.name.as_str()).collect();
    assert_eq!(local, vec!["Log"]);
    let resource: Vec<&str> = grouped[&Scope::Resource].iter().map(|k| k.name.as_str()).collect();
    assert_eq!(resource, vec!["Shared Step", "Wait ${n} Seconds", "Log List"]);
    // Libraries imported by the resource are visible too.
    assert!(locator.is_accessible("Create File"));

    // Walking from the resource side reaches the suite's keywords once.
    let common = ctx.load(Path::new("/p/resources/common.resource")).unwrap();
    let from_common = KeywordLocator::new(&ctx, common);
    let suite_log: Vec<_> = from_common
        .find_all("Log")
        .into_iter()
        .filter(|k| k.scope == Scope::Resource)
        .collect();
    assert_eq!(suite_log.len(), 1);
}

#[test]
fn stop_keeps_what_was_already_delivered() {
    let ctx = suite_project();
    let file = ctx.load(Path::new("/p/suite.robot")).unwrap();
    let locator = KeywordLocator::new(&ctx, file);
    let mut visited = 0;
    locator.visit(|_| {
        visited += 1;
        if visited == 3 {
            ContinueDecision::Stop
        } else {
            ContinueDecision::Continue
        }
    });
    assert_eq!(visited, 3);
    let delivered = locator.find_matching("Log", |_| ContinueDecision::Stop);
    assert_eq!(delivered.len(), 1);
}

#[test]
fn unimported_library_keywords_are_reported_separately() {
    let config = ProjectConfig {
        libraries: vec![collections()],
        ..ProjectConfig::default()
    };
    let ctx = project(
        &[(
            "/p/t.robot",
            "*** Test Cases ***\nT\n    Append To List    ${l}    1\n",
        )],
        config,
    );
    let file = ctx.load(Path::new("/p/t.robot")).unwrap();
    let locator = KeywordLocator::new(&ctx, file);
    assert!(locator.resolve("Append To List").is_none());
    let offered = locator.find_non_accessible("Append To List");
    assert_eq!(offered.len(), 1);
    assert_eq!(offered[0].source_name, "Collections");
}

#[test]
fn parameterized_imports_stay_unresolved() {
    let ctx = project(
        &[
            ("/p/t.robot", "*** Settings ***\nResource    ${ROOT}/lib.robot\n"),
            ("/p/${ROOT}/lib.robot", "*** Keywords ***\nTrap\n"),
        ],
        ProjectConfig::default(),
    );
    let file = ctx.load(Path::new("/p/t.robot")).unwrap();
    let imports = ctx.imports(&file);
    let unresolved: Vec<_> = imports.unresolved().collect();
    assert_eq!(unresolved.len(), 1);
    match &unresolved[0].target {
        ImportTarget::Unresolved(UnresolvedReason::Parameterized { variables }) => {
            assert_eq!(variables, &vec!["${ROOT}".to_owned()]);
        }
        other => panic!("unexpected target {other:?}"),
    }
    assert!(!KeywordLocator::new(&ctx, file).is_accessible("Trap"));
}

#[test]
fn search_paths_resolve_relative_imports() {
    let config = ProjectConfig {
        search_paths: vec![PathBuf::from("/shared")],
        ..ProjectConfig::default()
    };
    let ctx = project(
        &[
            ("/p/t.robot", "*** Settings ***\nResource    keywords.resource\n"),
            ("/shared/keywords.resource", "*** Keywords ***\nFrom Search Path\n"),
        ],
        config,
    );
    let file = ctx.load(Path::new("/p/t.robot")).unwrap();
    let locator = KeywordLocator::new(&ctx, file);
    let found = locator.resolve("From Search Path").unwrap();
    assert_eq!(found.exposing_file, PathBuf::from("/shared/keywords.resource"));
}

#[test]
fn variables_follow_priority_order() {
    let src = "\
*** Settings ***
Resource    vars.resource

*** Variables ***
${NAME}    suite

*** Keywords ***
K
    [Arguments]    ${name}
    Log    ${name}
";
    let ctx = project(
        &[
            ("/p/t.robot", src),
            ("/p/vars.resource", "*** Variables ***\n${NAME}    resource\n${OTHER}    x\n"),
        ],
        ProjectConfig {
            global_variables: vec!["${NAME}".into()],
            ..ProjectConfig::default()
        },
    );
    let file = ctx.load(Path::new("/p/t.robot")).unwrap();
    let locator = VariableLocator::new(&ctx, file);
    let offset = src.find("Log    ${name}").unwrap();
    let origins: Vec<VariableOrigin> = locator
        .find("${name}", Some(offset))
        .iter()
        .map(|v| v.origin)
        .collect();
    assert_eq!(
        origins,
        vec![
            VariableOrigin::Local,
            VariableOrigin::File,
            VariableOrigin::Resource,
            VariableOrigin::Global,
        ]
    );
    assert_eq!(locator.resolve("${NAME}", None).unwrap().origin, VariableOrigin::File);
    assert!(locator.is_accessible("${other}", None));
    assert!(locator.is_accessible("${TEMPDIR}", None));
}

#[test]
fn keyword_cache_follows_republished_models() {
    let ctx = suite_project();
    let cache = KeywordCache::new();
    let file = ctx.load(Path::new("/p/suite.robot")).unwrap();
    let before = cache.accessible(&ctx, file);
    assert!(before.resolve("Shared Step").is_some());

    let edited = SUITE.replace("Resource    resources/common.resource\n", "");
    let file = ctx.update(Path::new("/p/suite.robot"), &edited);
    let after = cache.accessible(&ctx, file);
    assert!(after.resolve("Shared Step").is_none());
    assert_eq!(after.resolve("Log").unwrap().scope, Scope::Local);
}

#[test]
fn readers_see_whole_models_during_reparse() {
    let ctx = Arc::new(suite_project());
    let path = Path::new("/p/suite.robot");
    ctx.load(path).unwrap();
    let variants = [
        "*** Keywords ***\nAlpha\n    No Operation\nBeta\n    No Operation\n",
        "*** Keywords ***\nGamma\n    No Operation\nDelta\n    No Operation\n",
    ];

    let writer = {
        let ctx = Arc::clone(&ctx);
        thread::spawn(move || {
            for i in 0..200 {
                ctx.update(Path::new("/p/suite.robot"), variants[i % 2]);
            }
        })
    };
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let ctx = Arc::clone(&ctx);
            thread::spawn(move || {
                for _ in 0..200 {
                    let model = ctx.load(Path::new("/p/suite.robot")).unwrap();
                    let names: Vec<&str> =
                        model.keywords.units.iter().map(|u| u.name_text()).collect();
                    assert!(
                        names == ["Log"] || names == ["Alpha", "Beta"] || names == ["Gamma", "Delta"],
                        "torn model: {names:?}"
                    );
                    let keywords = AccessibleKeywords::build(&KeywordLocator::new(&ctx, model));
                    assert!(keywords.resolve("No Operation").is_some());
                }
            })
        })
        .collect();
    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
}
