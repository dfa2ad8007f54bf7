//! CLI tests against a mock catalog server.

mod sync_tests;
