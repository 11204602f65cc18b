//! Integration tests for Trellis
//!
//! These tests verify that multiple systems work together correctly.

use std::collections::HashMap;
use std::process::Command;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use trellis_analyzer::{AnalysisResults, AnalysisScheduler, Analyzer, Location, PassContext};
use trellis_core::{AnalysisResult, Artifact, Ast, GraphBuilder, InMemoryManifest, Manifest};
use trellis_position::{Position, PositionMapper};

const MANIFEST: &str = r#"[
    {"id": "model.vendor.base", "name": "base", "project": "vendor",
     "raw_text": "select 1 as id", "compiled_text": "select 1 as id"},
    {"id": "model.shop.stg_orders", "name": "stg_orders", "project": "shop",
     "depends_on": ["model.vendor.base"], "path": "models/staging/stg_orders.sql",
     "raw_text": "select id\nfrom {{ ref('base') }} where broken_col > 0",
     "compiled_text": "select id\nfrom `db`.`vendor`.`base` where broken_col > 0"},
    {"id": "model.shop.orders", "name": "orders", "project": "shop",
     "depends_on": ["model.shop.stg_orders"],
     "raw_text": "select * from {{ ref('stg_orders') }}",
     "compiled_text": "select * from `db`.`shop`.`stg_orders`"},
    {"id": "model.shop.customers", "name": "customers", "project": "shop",
     "depends_on": ["source.shop.raw_customers"],
     "raw_text": "select 1 as id", "compiled_text": "select 1 as id"},
    {"id": "model.shop.report", "name": "report", "project": "shop",
     "depends_on": ["model.shop.orders", "model.shop.customers"],
     "raw_text": "select * from {{ ref('orders') }} join {{ ref('customers') }} using (id)",
     "compiled_text": "select * from `db`.`shop`.`orders` join `db`.`shop`.`customers` using (id)"}
]"#;

/// Rejects the unknown column `broken_col` and anything built on a failed
/// dependency.
#[derive(Default)]
struct ColumnCheck {
    calls: Mutex<HashMap<String, usize>>,
}

impl ColumnCheck {
    fn calls(&self, id: &str) -> usize {
        self.calls.lock().unwrap().get(id).copied().unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl Analyzer for ColumnCheck {
    async fn analyze(
        &self,
        artifact: &Artifact,
        compiled_text: &str,
        cx: &PassContext,
    ) -> anyhow::Result<AnalysisResult> {
        *self.calls.lock().unwrap().entry(artifact.id.to_string()).or_default() += 1;

        for dep in &artifact.depends_on {
            if let Some(result) = cx.analyze_by_id(dep.as_str()).await {
                if result.is_err() {
                    return Ok(AnalysisResult::error(format!("{} is not available", dep)));
                }
            }
        }
        if compiled_text.contains("broken_col") {
            return Ok(AnalysisResult::error("column broken_col does not exist"));
        }
        Ok(AnalysisResult::ok(Ast(serde_json::json!({ "model": artifact.name }))))
    }

    fn name(&self) -> &str {
        "column-check"
    }
}

fn sorted_ids(records: &[trellis_core::ArtifactAnalysisRecord]) -> Vec<&str> {
    let mut ids: Vec<&str> = records.iter().map(|r| r.artifact_id.as_str()).collect();
    ids.sort();
    ids
}

/// Test a full pass: manifest, graph, scheduler, filtering and ranges
#[tokio::test]
async fn test_project_pass_reports_root_errors() {
    let manifest = InMemoryManifest::from_json(MANIFEST).unwrap();
    let graph = Arc::new(GraphBuilder::from_manifest(&manifest, None).build().unwrap());
    assert_eq!(graph.node_count(), 5);

    let analyzer = Arc::new(ColumnCheck::default());
    let scheduler = AnalysisScheduler::new(Arc::clone(&graph), analyzer.clone());
    let records = scheduler.run("shop", &CancellationToken::new()).await.unwrap();

    assert_eq!(sorted_ids(&records), vec!["model.shop.customers", "model.shop.stg_orders"]);
    assert_eq!(analyzer.calls("model.vendor.base"), 1);
    for id in ["model.shop.stg_orders", "model.shop.orders", "model.shop.customers", "model.shop.report"] {
        assert_eq!(analyzer.calls(id), 1, "{} analyzed more than once", id);
    }

    let mut results = AnalysisResults::new();
    results.update(records);
    let failed: Vec<&str> = results.errors().map(|r| r.artifact_id.as_str()).collect();
    assert_eq!(failed, vec!["model.shop.stg_orders"]);

    // The unknown column sits after the expanded reference, so its raw
    // position differs from the compiled one.
    let ranges = AnalysisResults::ranges(&manifest, "model.shop.stg_orders", Location::new(42, 52)).unwrap();
    assert_eq!(ranges.compiled.start, Position::new(1, 32));
    assert_eq!(ranges.raw.start, Position::new(1, 29));
    assert_eq!(ranges.raw.end, Position::new(1, 39));
}

/// Test re-analyzing the dependents of a fixed artifact
#[tokio::test]
async fn test_subtree_after_fix_clears_errors() {
    let manifest = InMemoryManifest::from_json(MANIFEST).unwrap();
    let graph = Arc::new(GraphBuilder::from_manifest(&manifest, None).build().unwrap());
    let mut results = AnalysisResults::new();
    results.update(
        AnalysisScheduler::new(graph, Arc::new(ColumnCheck::default()))
            .run("shop", &CancellationToken::new())
            .await
            .unwrap(),
    );

    let fixed: Vec<Artifact> = manifest
        .artifacts(None)
        .into_iter()
        .map(|mut a| {
            if a.name == "stg_orders" {
                a.compiled_text = a.compiled_text.map(|t| t.replace("broken_col", "id"));
            }
            a
        })
        .collect();
    let mut builder = GraphBuilder::new();
    builder.extend(fixed);
    let graph = Arc::new(builder.build().unwrap());

    let analyzer = Arc::new(ColumnCheck::default());
    let records = AnalysisScheduler::new(graph, analyzer.clone())
        .analyze_subtree("model.shop.stg_orders", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        sorted_ids(&records),
        vec!["model.shop.orders", "model.shop.report", "model.shop.stg_orders"]
    );
    assert_eq!(analyzer.calls("model.shop.customers"), 1);

    for record in records {
        results.update_record(record);
    }
    assert_eq!(results.records().len(), 4);
    assert_eq!(results.errors().count(), 0);
}

/// Test that a template-heavy model maps diagnostics back line by line
#[test]
fn test_mapping_across_multiline_expansion() {
    let raw = "{{ config(materialized='view') }}\n\nselect\n  {{ cols() }}\nfrom t\nwhere a = 1";
    let compiled = "\n\nselect\n  a,\n  b,\n  c\nfrom t\nwhere a = 1";
    let mapper = PositionMapper::new(raw, compiled);

    // "from" and "where" follow a macro that expanded to three lines.
    assert_eq!(mapper.to_raw(Position::new(6, 0)), Position::new(4, 0));
    assert_eq!(mapper.to_raw(Position::new(7, 6)), Position::new(5, 6));
    assert_eq!(mapper.to_compiled(Position::new(5, 6)), Position::new(7, 6));
    assert_eq!(mapper.to_raw(Position::new(2, 3)), Position::new(2, 3));
}

/// Test the plan command on a manifest file
#[test]
fn test_cli_plan() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = dir.path().join("manifest.json");
    std::fs::write(&manifest, MANIFEST).unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_trellis"))
        .args(["plan", "--manifest"])
        .arg(&manifest)
        .args(["--project", "shop"])
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success());

    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(plan["models"], 4);
    let mut levels: Vec<Vec<String>> = serde_json::from_value(plan["levels"].clone()).unwrap();
    for level in &mut levels {
        level.sort();
    }
    assert_eq!(
        levels,
        vec![
            vec!["model.shop.customers".to_string(), "model.shop.stg_orders".to_string()],
            vec!["model.shop.orders".to_string(), "model.shop.report".to_string()],
        ]
    );
}

/// Test the map command in both directions
#[test]
fn test_cli_map() {
    let dir = tempfile::tempdir().unwrap();
    let raw = dir.path().join("raw.sql");
    let compiled = dir.path().join("compiled.sql");
    std::fs::write(&raw, "select *\nfrom {{ ref('a') }} where x = 1").unwrap();
    std::fs::write(&compiled, "select *\nfrom `db`.`s`.`a` where x = 1").unwrap();

    let run = |extra: &[&str]| -> serde_json::Value {
        let output = Command::new(env!("CARGO_BIN_EXE_trellis"))
            .arg("map")
            .arg("--raw")
            .arg(&raw)
            .arg("--compiled")
            .arg(&compiled)
            .args(extra)
            .output()
            .expect("Failed to execute command");
        assert!(output.status.success());
        serde_json::from_slice(&output.stdout).unwrap()
    };

    let to_raw = run(&["--line", "1", "--character", "24"]);
    assert_eq!(to_raw["raw"], serde_json::json!({ "line": 1, "character": 26 }));

    let to_compiled = run(&["--line", "1", "--character", "26", "--to-compiled"]);
    assert_eq!(to_compiled["compiled"], serde_json::json!({ "line": 1, "character": 24 }));
}

/// Test that the CLI can be invoked
#[test]
fn test_cli_invocation() {
    let output = Command::new(env!("CARGO_BIN_EXE_trellis"))
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("trellis"));
    assert!(stdout.contains("Dependency-ordered analysis"));
}
