//! # Battle Test Utilities
//!
//! Shared testing utilities for all crates:
//! - Scripted decision layer and recording action pipeline
//! - Battle and roster fixtures
//! - Determinism test harness
//! - Property-based testing strategies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod determinism;
pub mod fixtures;

/// Re-export proptest for convenience.
pub use proptest;
