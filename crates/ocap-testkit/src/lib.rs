//! Ocap Testing Infrastructure
//!
//! Shared sample values, proptest strategies and assertion helpers used by
//! the tests of every ocap crate.

//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! ocap-testkit = { path = "../ocap-testkit" }
//! ```
//!
//! ```rust,no_run
//! use ocap_testkit::fixtures::rank_sample;
//!
//! let sample = rank_sample();
//! assert_eq!(sample.unsorted.len(), sample.sorted.len());
//! ```

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

pub mod assertions;
pub mod fixtures;
pub mod strategies;

pub use fixtures::{
    example_alice, example_bob, example_carol, far_function_containers, rank_sample, RankSample,
};

/// Install a test-friendly tracing subscriber once per process
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
