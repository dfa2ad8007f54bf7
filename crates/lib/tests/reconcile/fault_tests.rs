//! Failure isolation and retry behaviour.

use std::time::Duration;

use lakesync_lib::catalog::{CatalogError, ErrorKind, MemoryCatalog, RetryPolicy, RetryingCatalog, TransientReason};

use super::common::{names, reconciler, seed_source, sources};

fn forbidden() -> CatalogError {
  CatalogError::Access {
    status: 403,
    code: Some("Forbidden".to_string()),
    message: "caller lacks read access".to_string(),
  }
}

fn throttled() -> CatalogError {
  CatalogError::Transient {
    reason: TransientReason::RateLimited,
    message: "too many requests".to_string(),
    retry_after: None,
  }
}

fn retrying(catalog: MemoryCatalog) -> RetryingCatalog<MemoryCatalog> {
  RetryingCatalog::new(catalog, RetryPolicy::new(3, Duration::from_millis(500)))
}

#[tokio::test]
async fn inaccessible_source_does_not_affect_others() {
  let catalog = MemoryCatalog::new();
  seed_source(&catalog, "a", &["t1", "t2"]);
  seed_source(&catalog, "b", &["t1"]);
  seed_source(&catalog, "c", &["t3"]);
  catalog.deny_collection("lh-b", forbidden());
  let reconciler = reconciler(catalog);

  let report = reconciler
    .setup(&sources(&[("a", &[]), ("b", &[]), ("c", &[])]))
    .await
    .unwrap();

  assert_eq!(names(&report.outcome("a").unwrap().created), vec!["t1", "t2"]);
  assert_eq!(names(&report.outcome("c").unwrap().created), vec!["t3"]);

  let b = report.outcome("b").unwrap();
  assert!(b.is_source_failure());
  assert_eq!(b.failed.len(), 1);
  assert_eq!(b.failed[0].kind, ErrorKind::Access);
  assert!(b.created.is_empty());

  let failures: Vec<_> = report.failures().collect();
  assert_eq!(failures.len(), 1);
  assert_eq!(failures[0].source, "b");
  assert_eq!(failures[0].table, None);
  assert!(
    reconciler
      .catalog()
      .create_calls()
      .iter()
      .all(|s| s.target_schema != "b_schema")
  );
}

#[tokio::test]
async fn missing_source_collection_is_source_failure() {
  let catalog = MemoryCatalog::new();
  seed_source(&catalog, "a", &["t1"]);
  let reconciler = reconciler(catalog);

  let report = reconciler
    .refresh(&sources(&[("a", &[]), ("ghost", &[])]))
    .await
    .unwrap();

  assert!(report.outcome("a").unwrap().is_success());
  let ghost = report.outcome("ghost").unwrap();
  assert_eq!(ghost.failed[0].kind, ErrorKind::Access);
  assert!(ghost.failed[0].message.starts_with("listing source tables"));
}

#[tokio::test]
async fn per_table_access_error_is_recorded_and_run_continues() {
  let catalog = MemoryCatalog::new();
  seed_source(&catalog, "a", &["t1", "t2", "t3"]);
  catalog.fail_create("a_schema", "t2", forbidden(), 1);
  let reconciler = reconciler(retrying(catalog));

  let report = reconciler.setup(&sources(&[("a", &[])])).await.unwrap();
  let a = report.outcome("a").unwrap();

  assert_eq!(names(&a.created), vec!["t1", "t3"]);
  assert_eq!(a.failed.len(), 1);
  assert_eq!(a.failed[0].table(), Some("t2"));
  assert_eq!(a.failed[0].kind, ErrorKind::Access);
  // access errors are not retried
  let t2_calls = reconciler
    .catalog()
    .inner()
    .create_calls()
    .iter()
    .filter(|s| s.name == "t2")
    .count();
  assert_eq!(t2_calls, 1);
}

#[tokio::test(start_paused = true)]
async fn transient_create_recovers_within_budget() {
  let catalog = MemoryCatalog::new();
  seed_source(&catalog, "a", &["t1"]);
  catalog.fail_create("a_schema", "t1", throttled(), 2);
  let reconciler = reconciler(retrying(catalog));

  let report = reconciler.setup(&sources(&[("a", &[])])).await.unwrap();

  assert_eq!(report.totals.created, 1);
  assert!(report.is_success());
  assert_eq!(reconciler.catalog().inner().create_calls().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn transient_create_exhaustion_is_failure() {
  let catalog = MemoryCatalog::new();
  seed_source(&catalog, "a", &["t1", "t2"]);
  catalog.fail_create("a_schema", "t1", throttled(), 3);
  let reconciler = reconciler(retrying(catalog));

  let report = reconciler.setup(&sources(&[("a", &[])])).await.unwrap();
  let a = report.outcome("a").unwrap();

  assert_eq!(a.failed.len(), 1);
  assert_eq!(a.failed[0].kind, ErrorKind::Transient);
  assert_eq!(names(&a.created), vec!["t2"]);
  assert_eq!(report.success_rate(), Some(0.5));
}

#[tokio::test(start_paused = true)]
async fn transient_listing_exhaustion_fails_only_that_source() {
  let catalog = MemoryCatalog::new();
  seed_source(&catalog, "a", &["t1"]);
  seed_source(&catalog, "b", &["t2"]);
  catalog.fail_listing("lh-a", throttled(), 3);
  let reconciler = reconciler(retrying(catalog));

  let report = reconciler
    .refresh(&sources(&[("a", &[]), ("b", &[])]))
    .await
    .unwrap();

  let a = report.outcome("a").unwrap();
  assert!(a.is_source_failure());
  assert_eq!(a.failed[0].kind, ErrorKind::Transient);
  assert_eq!(reconciler.catalog().inner().listing_calls("lh-a"), 3);
  assert_eq!(names(&report.outcome("b").unwrap().created), vec!["t2"]);
}

#[tokio::test]
async fn target_listing_failure_fails_source() {
  let catalog = MemoryCatalog::new();
  seed_source(&catalog, "a", &["t1"]);
  catalog.deny_collection("lh-target", forbidden());
  let reconciler = reconciler(catalog);

  let report = reconciler.refresh(&sources(&[("a", &[])])).await.unwrap();
  let a = report.outcome("a").unwrap();

  assert!(a.is_source_failure());
  assert!(a.failed[0].message.starts_with("listing existing shortcuts"));
  assert!(reconciler.catalog().create_calls().is_empty());
}
