//! Implementation of the `lakesync sources` command.

use anyhow::Result;

use super::{GlobalArgs, load_config};
use crate::output::{print_info, print_json, print_stat, symbols};

/// List configured sources. Makes no remote calls.
pub fn cmd_sources(global: &GlobalArgs) -> Result<()> {
  let path = global.config_path();
  let config = load_config(&path)?;

  if global.format.is_json() {
    let json = serde_json::json!({
      "target": config.target,
      "sources": config.sources,
    });
    return print_json(&json);
  }

  println!(
    "Target: {}/{}",
    config.target.workspace_id, config.target.collection_id
  );

  if config.sources.is_empty() {
    print_info("No sources configured");
    return Ok(());
  }

  for (key, source) in &config.sources {
    println!();
    println!("{} {}", symbols::INFO, key);
    print_stat("Collection", &format!("{}/{}", source.workspace_id, source.collection_id));
    print_stat("Schema", &source.schema);
    let tables = if source.tables.is_empty() {
      "all".to_string()
    } else {
      source.tables.iter().cloned().collect::<Vec<_>>().join(", ")
    };
    print_stat("Tables", &tables);
  }

  Ok(())
}
