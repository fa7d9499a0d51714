//! Directory batches and configuration files through the public engine API.

mod common;

use common::*;
use enc_analyzer::analyzer::{load_documents, AnalysisEngine, AnalyzerConfig};
use enc_analyzer::ast_core::json::{load_tree, tree_to_json};
use enc_analyzer::{CancellationToken, RudeEditKind, SyntaxTree};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;

fn write_tree(path: &Path, tree: &SyntaxTree) {
    let json = serde_json::to_string_pretty(&tree_to_json(tree, tree.root())).unwrap();
    fs::write(path, json).unwrap();
}

fn with_method(ty: &str) -> SyntaxTree {
    unit(vec![class("C", vec![method(ty, "M", &[], block(vec![call("Work", vec![])]))])]).build()
}

#[test]
fn json_round_trip_keeps_analysis_result() {
    let dir = tempfile::tempdir().unwrap();
    let tree = with_method("void");
    let path = dir.path().join("tree.json");
    write_tree(&path, &tree);

    let loaded = load_tree(&path).unwrap();
    assert_eq!(loaded.len(), tree.len());
    assert_eq!(loaded.fingerprint(loaded.root()), tree.fingerprint(tree.root()));
    assert!(analyze(&tree, &loaded).script.is_empty());
}

#[test]
fn batch_reports_each_document() {
    let old_dir = tempfile::tempdir().unwrap();
    let new_dir = tempfile::tempdir().unwrap();
    write_tree(&old_dir.path().join("a.json"), &with_method("void"));
    write_tree(&new_dir.path().join("a.json"), &with_method("void"));
    write_tree(&old_dir.path().join("b.json"), &with_method("void"));
    write_tree(&new_dir.path().join("b.json"), &with_method("int"));

    let old_b = with_method("void");
    let offset = old_b.span(call_statement(&old_b, "Work")).start;
    fs::write(old_dir.path().join("b.active.json"), format!(r#"[{{ "offset": {offset} }}]"#)).unwrap();

    let documents = load_documents(old_dir.path(), new_dir.path()).unwrap();
    let reports = engine().analyze_documents(&documents, &CancellationToken::new()).unwrap();
    let names: Vec<&str> = reports.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["a.json", "b.json"]);

    assert!(reports[0].report.edits.is_empty());
    assert!(reports[0].report.diagnostics.is_empty());

    let b = &reports[1].report;
    let codes: Vec<&str> = b.diagnostics.iter().map(|d| d.code.as_str()).collect();
    assert_eq!(codes, vec![RudeEditKind::TypeUpdate.code().as_str()]);
    assert_eq!(b.active_statements.len(), 1);
    assert!(b.active_statements[0].new_statement.is_some());

    let json = serde_json::to_value(&reports).unwrap();
    assert_eq!(json[1]["name"], "b.json");
    assert_eq!(json[1]["diagnostics"][0]["kind"], "TypeUpdate");
}

#[test]
fn unknown_active_offset_fails_the_batch() {
    let old_dir = tempfile::tempdir().unwrap();
    let new_dir = tempfile::tempdir().unwrap();
    write_tree(&old_dir.path().join("a.json"), &with_method("void"));
    write_tree(&new_dir.path().join("a.json"), &with_method("void"));
    fs::write(old_dir.path().join("a.active.json"), r#"[{ "offset": 100000 }]"#).unwrap();

    let documents = load_documents(old_dir.path(), new_dir.path()).unwrap();
    let err = engine().analyze_documents(&documents, &CancellationToken::new()).unwrap_err();
    assert!(!err.is_cancelled());
    assert!(err.to_string().contains("100000"));
}

#[test]
fn cancelled_batch_stops() {
    let old_dir = tempfile::tempdir().unwrap();
    let new_dir = tempfile::tempdir().unwrap();
    write_tree(&old_dir.path().join("a.json"), &with_method("void"));
    write_tree(&new_dir.path().join("a.json"), &with_method("int"));

    let documents = load_documents(old_dir.path(), new_dir.path()).unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();
    assert!(engine().analyze_documents(&documents, &cancel).unwrap_err().is_cancelled());
}

#[test]
fn configuration_file_drives_the_engine() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("enc-analyzer.toml");
    fs::write(&path, "report_unsupported_constructs = false\nworkers = 1\n").unwrap();

    let config = AnalyzerConfig::load_from_file(&path).unwrap();
    assert_eq!(config.workers, 1);
    assert_eq!(config.similarity_threshold, AnalyzerConfig::default().similarity_threshold);

    let engine = AnalysisEngine::new(config).unwrap();
    assert_eq!(engine.worker_count(), 1);
    let old = with_method("void");
    let body = block(vec![call("Work", vec![lambda(block(vec![]))])]);
    let new = unit(vec![class("C", vec![method("void", "M", &[], body)])]).build();
    let analysis = engine.analyze_with_statements(&old, &new, &[], &CancellationToken::new()).unwrap();
    assert!(!analysis.has_rude_edits());

    fs::write(&path, "similarity_threshold = 1.5\n").unwrap();
    assert!(AnalyzerConfig::load_from_file(&path).is_err());
}
