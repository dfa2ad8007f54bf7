//! Implementation of the `lakesync plan` command.
//!
//! Lists source tables and existing shortcuts for every configured source and
//! prints what a refresh would create. Nothing is created.

use anyhow::Result;

use lakesync_lib::reconcile::SourcePlan;

use super::{GlobalArgs, Session, load_config};
use crate::output::{print_info, print_json, print_stat, print_success, print_warning, symbols};

pub fn cmd_plan(global: &GlobalArgs) -> Result<()> {
  let path = global.config_path();
  let config = load_config(&path)?;

  let session = Session::open(&config, global)?;
  let plan = session.rt.block_on(session.reconciler.plan(&config.sources))?;
  session.finish()?;

  if global.format.is_json() {
    return print_json(&plan);
  }

  for (key, source) in &plan.sources {
    match source {
      SourcePlan::Ready { schema, diff } => {
        println!("{} ({})", key, schema);
        for shortcut in &diff.to_create {
          println!("  {} {}", symbols::ADD, shortcut.name);
        }
        if global.verbose {
          for shortcut in &diff.to_skip {
            println!("  {} {}", symbols::SKIP, shortcut.name);
          }
        }
        print_stat("To create", &diff.to_create.len().to_string());
        print_stat("Existing", &diff.to_skip.len().to_string());
      }
      SourcePlan::Failed { schema, kind, message } => {
        println!("{} ({})", key, schema);
        print_warning(&format!("{}: {} ({})", key, message, kind));
      }
    }
  }

  println!();
  match plan.to_create() {
    0 if !plan.has_failures() => print_success("Nothing to create"),
    0 => print_info("Nothing to create for reachable sources"),
    n => print_info(&format!("A refresh would create {} shortcut(s)", n)),
  }

  Ok(())
}
