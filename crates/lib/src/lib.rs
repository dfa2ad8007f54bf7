//! lakesync-lib: shortcut reconciliation for lakehouse collections
//!
//! This crate keeps a target collection's shortcuts in line with a declared
//! set of source collections:
//! - `catalog`: typed access to the remote catalog API, with retry
//! - `config`: strongly typed, validated run configuration
//! - `ratelimit`: shared pacing policy for remote calls
//! - `reconcile`: filter, diff, apply and the per-source orchestrator

pub mod catalog;
pub mod config;
pub mod consts;
pub mod platform;
pub mod ratelimit;
pub mod reconcile;
