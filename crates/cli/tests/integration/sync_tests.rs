//! setup / refresh / plan against a mock catalog.

use predicates::prelude::*;

use super::common::TestEnv;

const BRONZE: &str = r#"
[sources.bronze]
workspace_id = "ws-bronze"
collection_id = "lh-bronze"
schema = "bronze_schema"
"#;

#[test]
fn setup_creates_missing_shortcuts() {
  let mut env = TestEnv::new(BRONZE);
  let tables = env.mock_tables("ws-bronze", "lh-bronze", &["customers", "orders", "products"]).create();
  let existing = env.mock_shortcuts("bronze_schema", &[]).create();
  let create = env.mock_create("bronze_schema", 201).expect(3).create();

  let output = env.cmd().args(["setup", "--format", "json"]).output().unwrap();
  assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

  let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(report["totals"]["created"], 3);
  assert_eq!(report["totals"]["failed"], 0);
  assert_eq!(report["sources"]["bronze"]["schema"], "bronze_schema");

  tables.assert();
  existing.assert();
  create.assert();
}

#[test]
fn refresh_skips_existing_shortcuts() {
  let mut env = TestEnv::new(BRONZE);
  let _tables = env.mock_tables("ws-bronze", "lh-bronze", &["customers", "orders"]).create();
  let _existing = env.mock_shortcuts("bronze_schema", &["customers", "orders"]).create();
  let create = env.mock_create("bronze_schema", 201).expect(0).create();

  env
    .cmd()
    .arg("refresh")
    .assert()
    .success()
    .stdout(predicate::str::contains("Reconciliation complete"))
    .stdout(predicate::str::contains("Skipped: 2"));

  create.assert();
}

#[test]
fn refresh_fails_when_a_source_is_forbidden() {
  let mut env = TestEnv::new(BRONZE);
  let _tables = env
    .server
    .mock("GET", "/workspaces/ws-bronze/collections/lh-bronze/tables")
    .with_status(403)
    .with_body(r#"{"errorCode":"Forbidden","message":"no read access"}"#)
    .create();

  env
    .cmd()
    .arg("refresh")
    .assert()
    .failure()
    .stdout(predicate::str::contains("bronze [access]"))
    .stderr(predicate::str::contains("1 operation(s) failed"));
}

#[test]
fn failures_can_be_tolerated() {
  let mut env = TestEnv::new(BRONZE);
  let _tables = env.mock_tables("ws-bronze", "lh-bronze", &["customers"]).create();
  let _existing = env.mock_shortcuts("bronze_schema", &[]).create();
  let _create = env.mock_create("bronze_schema", 403).create();

  env
    .cmd()
    .args(["refresh", "--fail-on-error", "false"])
    .assert()
    .success()
    .stdout(predicate::str::contains("bronze/customers [access]"));
}

#[test]
fn plan_creates_nothing() {
  let mut env = TestEnv::new(BRONZE);
  let _tables = env.mock_tables("ws-bronze", "lh-bronze", &["customers", "orders"]).create();
  let _existing = env.mock_shortcuts("bronze_schema", &["customers"]).create();
  let create = env.mock_create("bronze_schema", 201).expect(0).create();

  env
    .cmd()
    .arg("plan")
    .assert()
    .success()
    .stdout(predicate::str::contains("+ orders"))
    .stdout(predicate::str::contains("A refresh would create 1 shortcut(s)"));

  create.assert();
}

#[test]
fn add_source_reconciles_only_the_new_source() {
  let mut env = TestEnv::new(BRONZE);
  let bronze = env.mock_tables("ws-bronze", "lh-bronze", &["customers"]).expect(0).create();
  let _gold_tables = env.mock_tables("ws-gold", "lh-gold", &["revenue"]).create();
  let _existing = env.mock_shortcuts("gold_schema", &[]).create();
  let create = env.mock_create("gold_schema", 201).expect(1).create();

  let output = env
    .cmd()
    .args([
      "add-source",
      "gold",
      "--workspace-id",
      "ws-gold",
      "--collection-id",
      "lh-gold",
      "--schema",
      "gold_schema",
      "--format",
      "json",
    ])
    .output()
    .unwrap();
  assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

  let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(report["totals"]["created"], 1);
  assert!(report["sources"].get("bronze").is_none());

  bronze.assert();
  create.assert();
}
