//! Core types, error taxonomy, and concept state machines for repset.
//!
//! A *concept* is an independently-owned state module: it owns exactly one
//! persisted collection, exposes operations over its own data only, and knows
//! nothing about other concepts. Cross-concept consistency lives in the
//! synchronization layer (`repset-api`), never here.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod concepts;
pub mod error;
pub mod store;

pub use error::{Error, Result};

#[cfg(test)]
pub(crate) mod memory;
