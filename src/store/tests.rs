//! Store behavior tests over an in-memory index

use std::path::{Path, PathBuf};

use serde_json::json;

use crate::extract::{AliasDoc, AliasKind, ModuleDoc, TypeDoc, ValueDoc};

use super::*;

fn store() -> SymbolStore {
    SymbolStore::open_in_memory().expect("open in-memory store")
}

fn add_package(store: &mut SymbolStore, name: &str) -> i64 {
    store
        .upsert_package(
            name,
            Path::new(&format!("/proj/{name}")),
            &json!({"name": name}),
            Some("cfg0"),
        )
        .expect("upsert package")
}

fn module(name: &str, qualified: &str) -> ModuleDoc {
    ModuleDoc {
        name: name.to_string(),
        qualified_name: qualified.to_string(),
        types: Vec::new(),
        values: Vec::new(),
        aliases: Vec::new(),
        children: Vec::new(),
    }
}

fn ty(name: &str, signature: &str) -> TypeDoc {
    TypeDoc {
        name: name.to_string(),
        kind: Some("record".to_string()),
        signature: Some(signature.to_string()),
        detail: json!({}),
    }
}

fn value(name: &str, signature: &str, param_count: i64) -> ValueDoc {
    ValueDoc {
        name: name.to_string(),
        signature: Some(signature.to_string()),
        param_count,
        detail: json!({}),
    }
}

fn alias(name: &str, target: &str) -> AliasDoc {
    AliasDoc {
        name: name.to_string(),
        kind: AliasKind::Module,
        target_qualified_name: target.to_string(),
        docstrings: json!([]),
    }
}

/// `App` with one type, one value, one alias and a child holding one value
fn sample_tree() -> ModuleDoc {
    let mut root = module("App", "App");
    root.types.push(ty("state", "type state = {count: int}"));
    root.values.push(value("render", "state => element", 1));
    root.aliases.push(alias("B", "Belt"));
    let mut inner = module("Inner", "App.Inner");
    inner.values.push(value("helper", "unit => unit", 1));
    root.children.push(inner);
    root
}

fn file(compiled: &str, digest: &str, modules: Vec<ModuleDoc>) -> FileModules {
    FileModules {
        compiled_file_path: PathBuf::from(compiled),
        source_file_path: PathBuf::from("/proj/app/src/App.res"),
        file_digest: Some(digest.to_string()),
        modules,
    }
}

fn count(store: &SymbolStore, sql: &str) -> i64 {
    let rows = store.run_query(sql).expect("count query");
    rows[0].values().next().expect("one column").as_i64().expect("integer")
}

#[test]
fn counts_start_at_zero() {
    let store = store();
    let counts = store.counts().expect("counts");
    assert_eq!(
        counts,
        IndexCounts { packages: 0, modules: 0, types: 0, values: 0 }
    );
}

#[test]
fn package_upsert_is_keyed_by_name() {
    let mut store = store();
    let first = store
        .upsert_package("app", Path::new("/old/app"), &json!({"name": "app"}), None)
        .expect("first upsert");
    let second = store
        .upsert_package(
            "app",
            Path::new("/new/app"),
            &json!({"name": "app", "dependencies": ["ui"]}),
            Some("cfg1"),
        )
        .expect("second upsert");

    assert_eq!(first, second, "conflict on name must reuse the row");
    assert_eq!(store.counts().expect("counts").packages, 1);
    assert_eq!(
        store.find_package_by_path(Path::new("/new/app")).expect("lookup"),
        Some(first),
        "path column follows the refresh"
    );
    assert_eq!(
        store.find_package_by_path(Path::new("/old/app")).expect("lookup"),
        None
    );
}

#[test]
fn stores_a_module_forest_with_symbols() {
    let mut store = store();
    let pkg = add_package(&mut store, "app");

    let written = store
        .store_package_batch(pkg, &[file("/lib/ocaml/App.res", "digest-1", vec![sample_tree()])])
        .expect("store batch");
    assert_eq!(written, 1, "one root module");

    let counts = store.counts().expect("counts");
    assert_eq!(counts.modules, 2);
    assert_eq!(counts.types, 1);
    assert_eq!(counts.values, 2);

    let root = store
        .find_module("App")
        .expect("lookup")
        .expect("root stored");
    assert_eq!(root.file_digest.as_deref(), Some("digest-1"));

    let rows = store
        .modules_for_compiled_file(Path::new("/lib/ocaml/App.res"))
        .expect("by compiled path");
    assert_eq!(rows.len(), 2, "root and nested module share the artifact");

    // Return type is never populated by extraction.
    let rows = store
        .run_query("SELECT return_type FROM \"values\" WHERE name = 'render'")
        .expect("query");
    assert!(rows[0]["return_type"].is_null());
}

#[test]
fn restoring_an_unchanged_tree_does_not_duplicate_rows() {
    let mut store = store();
    let pkg = add_package(&mut store, "app");
    let batch = [file("/lib/ocaml/App.res", "digest-1", vec![sample_tree()])];

    store.store_package_batch(pkg, &batch).expect("first store");
    let before = store.counts().expect("counts");
    let root_before = store.find_module("App").expect("lookup").expect("stored");

    store.store_package_batch(pkg, &batch).expect("second store");
    let after = store.counts().expect("counts");
    let root_after = store.find_module("App").expect("lookup").expect("stored");

    assert_eq!(before, after, "idempotent restore");
    assert_eq!(root_before.id, root_after.id, "row identity is stable");
}

#[test]
fn restoring_replaces_symbols_and_refreshes_provenance() {
    let mut store = store();
    let pkg = add_package(&mut store, "app");
    store
        .store_package_batch(pkg, &[file("/lib/ocaml/App.res", "digest-1", vec![sample_tree()])])
        .expect("first store");

    let mut changed = module("App", "App");
    changed.values.push(value("mount", "element => unit", 1));
    store
        .store_package_batch(pkg, &[file("/lib/ocaml/App.res", "digest-2", vec![changed])])
        .expect("second store");

    assert_eq!(
        count(&store, "SELECT COUNT(*) FROM \"values\" WHERE name = 'render'"),
        0,
        "old symbols are gone"
    );
    assert_eq!(
        count(&store, "SELECT COUNT(*) FROM \"values\" WHERE name = 'mount'"),
        1
    );
    let root = store.find_module("App").expect("lookup").expect("stored");
    assert_eq!(root.file_digest.as_deref(), Some("digest-2"));
    assert_eq!(
        store.find_module("App.Inner").expect("lookup"),
        None,
        "stale child modules are purged"
    );
}

#[test]
fn alias_rows_do_not_accumulate_across_restores() {
    let mut store = store();
    let pkg = add_package(&mut store, "app");
    let batch = [file("/lib/ocaml/App.res", "digest-1", vec![sample_tree()])];

    for _ in 0..3 {
        store.store_package_batch(pkg, &batch).expect("store");
    }
    assert_eq!(count(&store, "SELECT COUNT(*) FROM aliases"), 1);
}

#[test]
fn qualified_name_collision_reuses_the_first_row() {
    let mut store = store();
    let first_pkg = add_package(&mut store, "app");
    let second_pkg = add_package(&mut store, "vendored");
    assert_ne!(first_pkg, second_pkg);

    store
        .store_package_batch(first_pkg, &[file("/a/Shared.res", "digest-a", vec![module("Shared", "Shared")])])
        .expect("first package");
    store
        .store_package_batch(second_pkg, &[file("/b/Shared.res", "digest-b", vec![module("Shared", "Shared")])])
        .expect("second package");

    assert_eq!(store.counts().expect("counts").modules, 1);
    assert_eq!(
        count(&store, "SELECT package_id FROM modules WHERE qualified_name = 'Shared'"),
        first_pkg,
        "ownership stays with the first writer"
    );
    let row = store.find_module("Shared").expect("lookup").expect("stored");
    assert_eq!(
        row.file_digest.as_deref(),
        Some("digest-b"),
        "provenance follows the latest derivation"
    );
}

#[test]
fn deleting_a_package_cascades_to_its_contents() {
    let mut store = store();
    let pkg = add_package(&mut store, "app");
    store
        .store_package_batch(pkg, &[file("/lib/ocaml/App.res", "digest-1", vec![sample_tree()])])
        .expect("store");

    assert!(store.delete_package("app").expect("delete"));
    let counts = store.counts().expect("counts");
    assert_eq!(
        counts,
        IndexCounts { packages: 0, modules: 0, types: 0, values: 0 }
    );
    assert_eq!(count(&store, "SELECT COUNT(*) FROM aliases"), 0);
}

#[test]
fn deleting_a_module_cascades_to_its_subtree() {
    let mut store = store();
    let pkg = add_package(&mut store, "app");
    store
        .store_package_batch(pkg, &[file("/lib/ocaml/App.res", "digest-1", vec![sample_tree()])])
        .expect("store");

    assert!(store.delete_module("App").expect("delete"));
    let counts = store.counts().expect("counts");
    assert_eq!(counts.modules, 0);
    assert_eq!(counts.types, 0);
    assert_eq!(counts.values, 0);
    assert_eq!(counts.packages, 1, "the owning package survives");
}

#[test]
fn replace_module_subtree_drops_stale_children() {
    let mut store = store();
    let pkg = add_package(&mut store, "app");
    store
        .store_package_batch(pkg, &[file("/lib/ocaml/App.res", "digest-1", vec![sample_tree()])])
        .expect("store");

    let mut slim = module("App", "App");
    slim.values.push(value("render", "state => element", 1));
    let written = store
        .replace_module_subtree(pkg, &file("/lib/ocaml/App.res", "digest-2", vec![slim]))
        .expect("replace");

    assert_eq!(written, 1);
    assert_eq!(store.counts().expect("counts").modules, 1);
    assert_eq!(store.find_module("App.Inner").expect("lookup"), None);
    let root = store.find_module("App").expect("lookup").expect("stored");
    assert_eq!(root.file_digest.as_deref(), Some("digest-2"));
}

#[test]
fn runtime_auto_open_marks_and_seeds_builtins() {
    let mut store = store();
    let pkg = add_package(&mut store, "@rescript/runtime");
    store
        .store_package_batch(
            pkg,
            &[
                file("/rt/Stdlib.res", "digest-s", vec![module("Stdlib", "Stdlib")]),
                file("/rt/Pervasives.res", "digest-p", vec![module("Pervasives", "Pervasives")]),
            ],
        )
        .expect("store runtime modules");

    store.apply_auto_open(pkg, true, &[]).expect("apply");
    assert_eq!(
        store.auto_opened_modules().expect("flags"),
        vec!["Pervasives".to_string(), "Stdlib".to_string()]
    );
    assert_eq!(
        store.counts().expect("counts").types,
        BUILTIN_TYPES.len() as i64,
        "builtins seeded under Pervasives"
    );

    // A second pass finds every builtin already present.
    store.apply_auto_open(pkg, true, &[]).expect("reapply");
    assert_eq!(store.counts().expect("counts").types, BUILTIN_TYPES.len() as i64);
}

#[test]
fn compiler_flag_auto_open_targets_named_modules() {
    let mut store = store();
    let pkg = add_package(&mut store, "app");
    store
        .store_package_batch(
            pkg,
            &[
                file("/a/Belt.res", "digest-1", vec![module("Belt", "Belt")]),
                file("/a/Other.res", "digest-2", vec![module("Other", "Other")]),
            ],
        )
        .expect("store");

    let flags = vec!["-open Belt".to_string(), "-w +26".to_string()];
    store.apply_auto_open(pkg, false, &flags).expect("apply");
    assert_eq!(
        store.auto_opened_modules().expect("flags"),
        vec!["Belt".to_string()]
    );
}

#[test]
fn clearing_auto_open_flags_resets_the_index() {
    let mut store = store();
    let pkg = add_package(&mut store, "app");
    store
        .store_package_batch(pkg, &[file("/a/Belt.res", "digest-1", vec![module("Belt", "Belt")])])
        .expect("store");
    store
        .apply_auto_open(pkg, false, &["-open Belt".to_string()])
        .expect("apply");

    assert_eq!(store.clear_auto_open_flags().expect("clear"), 1);
    assert!(store.auto_opened_modules().expect("flags").is_empty());
}

#[test]
fn auto_open_flag_survives_a_restore() {
    let mut store = store();
    let pkg = add_package(&mut store, "app");
    let batch = [file("/lib/ocaml/App.res", "digest-1", vec![sample_tree()])];
    store.store_package_batch(pkg, &batch).expect("store");
    store
        .apply_auto_open(pkg, false, &["-open App".to_string()])
        .expect("apply");

    let changed = [file("/lib/ocaml/App.res", "digest-2", vec![sample_tree()])];
    store.store_package_batch(pkg, &changed).expect("restore");
    assert_eq!(
        store.auto_opened_modules().expect("flags"),
        vec!["App".to_string()],
        "row reuse keeps the flag"
    );
}

#[test]
fn auto_open_flag_survives_a_post_build_update() {
    let mut store = store();
    let pkg = add_package(&mut store, "app");
    store
        .store_package_batch(pkg, &[file("/lib/ocaml/App.res", "digest-1", vec![sample_tree()])])
        .expect("store");
    store
        .apply_auto_open(pkg, false, &["-open App".to_string()])
        .expect("apply");

    store
        .replace_module_subtree(pkg, &file("/lib/ocaml/App.res", "digest-2", vec![sample_tree()]))
        .expect("replace");

    let root = store.find_module("App").expect("lookup").expect("stored");
    assert_eq!(root.file_digest.as_deref(), Some("digest-2"), "rows were rewritten");
    assert_eq!(
        store.auto_opened_modules().expect("flags"),
        vec!["App".to_string()],
        "the flag outlives the rewrite"
    );
}

#[test]
fn query_gate_rejects_mutations_and_non_selects() {
    assert_eq!(
        validate_query("DELETE FROM modules"),
        Err(QueryRejection::ForbiddenKeyword { keyword: "DELETE" })
    );
    assert_eq!(
        validate_query("insert into packages values (1)"),
        Err(QueryRejection::ForbiddenKeyword { keyword: "INSERT" })
    );
    assert_eq!(
        validate_query("PRAGMA journal_mode"),
        Err(QueryRejection::NotSelect)
    );
    assert_eq!(validate_query("  select 1"), Ok(()));

    // The scan is substring-based: a SELECT mentioning a forbidden word in
    // a literal is rejected too.
    assert_eq!(
        validate_query("SELECT 'created'"),
        Err(QueryRejection::ForbiddenKeyword { keyword: "CREATE" })
    );
}

#[test]
fn query_rows_keep_select_column_order() {
    let mut store = store();
    let pkg = add_package(&mut store, "app");
    store
        .store_package_batch(pkg, &[file("/lib/ocaml/App.res", "digest-1", vec![sample_tree()])])
        .expect("store");

    let rows = store
        .run_query("SELECT param_count, name FROM \"values\" WHERE name = 'render'")
        .expect("query");
    assert_eq!(rows.len(), 1);
    assert_eq!(
        serde_json::to_string(&rows[0]).expect("serialize"),
        r#"{"param_count":1,"name":"render"}"#,
        "columns serialize in SELECT order"
    );
}

#[test]
fn query_encodes_blobs_as_base64() {
    let store = store();
    let rows = store
        .run_query("SELECT X'DEADBEEF' AS payload")
        .expect("query");
    assert_eq!(rows[0]["payload"], json!("3q2+7w=="));
}

#[test]
fn query_surfaces_execution_errors() {
    let store = store();
    let err = store
        .run_query("SELECT no_such_column FROM modules")
        .expect_err("prepare must fail");
    assert!(err.to_string().contains("no_such_column"));
}
