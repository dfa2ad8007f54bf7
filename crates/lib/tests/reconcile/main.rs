//! End-to-end engine tests against the in-memory catalog.

mod fault_tests;
mod scenario_tests;
