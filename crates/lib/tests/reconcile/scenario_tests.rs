//! Setup, refresh and add-source over healthy catalogs.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use lakesync_lib::catalog::{MemoryCatalog, ShortcutDescriptor};
use lakesync_lib::ratelimit::{RateLimitPolicy, RateLimiter};
use lakesync_lib::reconcile::{AlreadyExistsPolicy, ReconciliationOutcome, SourcePlan};
use tokio::time::Instant;

use super::common::{TARGET_LH, TARGET_WS, names, reconciler, seed_source, source, sources};

fn all_names(outcome: &ReconciliationOutcome) -> Vec<String> {
  let mut all: Vec<String> = outcome
    .created
    .iter()
    .chain(&outcome.skipped)
    .chain(&outcome.already_present)
    .map(|s| s.name.clone())
    .collect();
  all.extend(outcome.failed.iter().filter_map(|f| f.table().map(str::to_string)));
  all
}

#[tokio::test]
async fn bronze_setup_creates_everything() {
  let catalog = MemoryCatalog::new();
  seed_source(&catalog, "bronze", &["customers", "orders", "products"]);
  let reconciler = reconciler(catalog);

  let report = reconciler.setup(&sources(&[("bronze", &[])])).await.unwrap();
  let bronze = report.outcome("bronze").unwrap();

  assert_eq!(bronze.schema, "bronze_schema");
  assert_eq!(names(&bronze.created), vec!["customers", "orders", "products"]);
  assert!(bronze.skipped.is_empty());
  assert!(bronze.failed.is_empty());
  assert_eq!(report.totals.created, 3);
  assert_eq!(report.success_rate(), Some(1.0));

  for shortcut in &bronze.created {
    assert_eq!(shortcut.target_workspace_id, TARGET_WS);
    assert_eq!(shortcut.target_collection_id, TARGET_LH);
    assert_eq!(shortcut.source_collection_id, "lh-bronze");
    assert_eq!(shortcut.source_table_name, shortcut.name);
  }
}

#[tokio::test]
async fn refresh_after_setup_is_idempotent() {
  let catalog = MemoryCatalog::new();
  seed_source(&catalog, "bronze", &["customers", "orders", "products"]);
  seed_source(&catalog, "silver", &["customers", "orders"]);
  let reconciler = reconciler(catalog);
  let config = sources(&[("bronze", &[]), ("silver", &[])]);

  reconciler.setup(&config).await.unwrap();
  let creates_after_setup = reconciler.catalog().create_calls().len();

  let report = reconciler.refresh(&config).await.unwrap();
  assert!(report.is_success());
  assert_eq!(report.totals.created, 0);
  assert_eq!(report.totals.skipped, 5);
  assert_eq!(names(&report.outcome("bronze").unwrap().skipped), vec!["customers", "orders", "products"]);
  assert_eq!(reconciler.catalog().create_calls().len(), creates_after_setup);

  let plan = reconciler.plan(&config).await.unwrap();
  assert_eq!(plan.to_create(), 0);
}

#[tokio::test]
async fn silver_filter_excludes_unlisted_tables() {
  let catalog = MemoryCatalog::new();
  seed_source(&catalog, "silver", &["customers", "orders", "products"]);
  let reconciler = reconciler(catalog);

  let report = reconciler
    .setup(&sources(&[("silver", &["customers", "orders"])]))
    .await
    .unwrap();
  let silver = report.outcome("silver").unwrap();

  assert_eq!(names(&silver.created), vec!["customers", "orders"]);
  assert!(!all_names(silver).iter().any(|n| n == "products"));
  assert!(
    !reconciler
      .catalog()
      .create_calls()
      .iter()
      .any(|s| s.name == "products")
  );
}

#[tokio::test]
async fn same_name_pointing_elsewhere_is_skipped() {
  let catalog = MemoryCatalog::new();
  seed_source(&catalog, "silver", &["customers", "orders"]);
  catalog.add_shortcut(ShortcutDescriptor {
    name: "customers".to_string(),
    target_schema: "silver_schema".to_string(),
    target_workspace_id: TARGET_WS.to_string(),
    target_collection_id: TARGET_LH.to_string(),
    source_workspace_id: "ws-legacy".to_string(),
    source_collection_id: "lh-legacy".to_string(),
    source_table_name: "customers_2019".to_string(),
  });
  let reconciler = reconciler(catalog);

  let report = reconciler.refresh(&sources(&[("silver", &[])])).await.unwrap();
  let silver = report.outcome("silver").unwrap();

  assert_eq!(names(&silver.skipped), vec!["customers"]);
  assert_eq!(names(&silver.created), vec!["orders"]);

  // the stale shortcut is left as it was
  let held = reconciler.catalog().shortcuts();
  let customers: Vec<_> = held.iter().filter(|s| s.name == "customers").collect();
  assert_eq!(customers.len(), 1);
  assert_eq!(customers[0].source_table_name, "customers_2019");
}

#[tokio::test]
async fn outcome_partitions_desired_set() {
  let catalog = MemoryCatalog::new();
  seed_source(&catalog, "bronze", &["a", "b", "c", "d", "e"]);
  catalog.add_shortcut(ShortcutDescriptor {
    name: "b".to_string(),
    target_schema: "bronze_schema".to_string(),
    target_workspace_id: TARGET_WS.to_string(),
    target_collection_id: TARGET_LH.to_string(),
    source_workspace_id: "ws-bronze".to_string(),
    source_collection_id: "lh-bronze".to_string(),
    source_table_name: "b".to_string(),
  });
  catalog.fail_create(
    "bronze_schema",
    "c",
    lakesync_lib::catalog::CatalogError::AlreadyExists {
      message: "conflict".to_string(),
    },
    1,
  );
  catalog.fail_create(
    "bronze_schema",
    "d",
    lakesync_lib::catalog::CatalogError::Unknown {
      status: Some(418),
      message: "teapot".to_string(),
    },
    1,
  );
  let reconciler = reconciler(catalog);

  let report = reconciler
    .refresh(&sources(&[("bronze", &["a", "b", "c", "d", "e", "zzz"])]))
    .await
    .unwrap();
  let bronze = report.outcome("bronze").unwrap();

  let all = all_names(bronze);
  let unique: HashSet<_> = all.iter().cloned().collect();
  assert_eq!(all.len(), unique.len());
  assert_eq!(
    unique,
    ["a", "b", "c", "d", "e"].iter().map(|s| s.to_string()).collect::<HashSet<_>>()
  );
  assert_eq!(names(&bronze.created), vec!["a", "e"]);
  assert_eq!(names(&bronze.skipped), vec!["b"]);
  assert_eq!(names(&bronze.already_present), vec!["c"]);
  assert_eq!(bronze.failed[0].table(), Some("d"));
}

#[tokio::test]
async fn already_exists_policy_created() {
  let catalog = MemoryCatalog::new();
  seed_source(&catalog, "bronze", &["orders"]);
  catalog.fail_create(
    "bronze_schema",
    "orders",
    lakesync_lib::catalog::CatalogError::AlreadyExists {
      message: "conflict".to_string(),
    },
    1,
  );
  let reconciler = reconciler(catalog).with_already_exists(AlreadyExistsPolicy::Created);

  let report = reconciler.refresh(&sources(&[("bronze", &[])])).await.unwrap();
  assert_eq!(report.totals.created, 1);
  assert_eq!(report.totals.already_present, 0);
}

#[tokio::test]
async fn add_source_touches_only_the_new_source() {
  let catalog = MemoryCatalog::new();
  seed_source(&catalog, "bronze", &["customers"]);
  seed_source(&catalog, "gold", &["revenue", "churn"]);
  let reconciler = reconciler(catalog);
  let configured = sources(&[("bronze", &[])]);

  let report = reconciler
    .add_source(&configured, "gold", &source("gold", &[]))
    .await
    .unwrap();

  assert_eq!(report.sources.keys().collect::<Vec<_>>(), vec!["gold"]);
  assert_eq!(names(&report.outcome("gold").unwrap().created), vec!["revenue", "churn"]);
  assert_eq!(reconciler.catalog().listing_calls("lh-bronze"), 0);
  assert!(
    reconciler
      .catalog()
      .create_calls()
      .iter()
      .all(|s| s.target_schema == "gold_schema")
  );
}

#[tokio::test]
async fn add_source_rejects_schema_collision() {
  let reconciler = reconciler(MemoryCatalog::new());
  let configured = sources(&[("bronze", &[])]);
  let mut spec = source("gold", &[]);
  spec.schema = "bronze_schema".to_string();

  assert!(reconciler.add_source(&configured, "gold", &spec).await.is_err());
  assert!(reconciler.catalog().create_calls().is_empty());
}

#[tokio::test]
async fn plan_reports_diff_per_source() {
  let catalog = MemoryCatalog::new();
  seed_source(&catalog, "bronze", &["customers", "orders"]);
  catalog.add_shortcut(ShortcutDescriptor {
    name: "customers".to_string(),
    target_schema: "bronze_schema".to_string(),
    target_workspace_id: TARGET_WS.to_string(),
    target_collection_id: TARGET_LH.to_string(),
    source_workspace_id: "ws-bronze".to_string(),
    source_collection_id: "lh-bronze".to_string(),
    source_table_name: "customers".to_string(),
  });
  let reconciler = reconciler(catalog);

  let plan = reconciler.plan(&sources(&[("bronze", &[])])).await.unwrap();
  match &plan.sources["bronze"] {
    SourcePlan::Ready { schema, diff } => {
      assert_eq!(schema, "bronze_schema");
      assert_eq!(names(&diff.to_create), vec!["orders"]);
      assert_eq!(names(&diff.to_skip), vec!["customers"]);
    }
    other => panic!("unexpected plan: {other:?}"),
  }
  assert!(reconciler.catalog().create_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn rate_limit_is_shared_across_sources() {
  let catalog = MemoryCatalog::new();
  seed_source(&catalog, "bronze", &["a", "b"]);
  seed_source(&catalog, "silver", &["c", "d"]);
  let limiter = Arc::new(RateLimiter::new(RateLimitPolicy::FixedDelay(Duration::from_millis(500))));
  let reconciler = reconciler(catalog).with_rate_limiter(limiter);

  let start = Instant::now();
  let report = reconciler
    .setup(&sources(&[("bronze", &[]), ("silver", &[])]))
    .await
    .unwrap();

  assert_eq!(report.totals.created, 4);
  assert!(start.elapsed() >= Duration::from_millis(1500));
}
