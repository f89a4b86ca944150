//! End-to-end tests for pathsync.
//!
//! Run with: `cargo test --package integration-tests`

#[cfg(test)]
mod coordinator_tests;
#[cfg(test)]
mod load_tests;
#[cfg(test)]
mod scenario_tests;
