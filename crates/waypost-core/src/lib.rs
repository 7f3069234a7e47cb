//! Core types and trait definitions for the Waypost social-map backend,
//! plus the request-authorization and visit-attribution workflow.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod external;
pub mod marker;
pub mod principal;
pub mod review;
pub mod store;
pub mod visit;
pub mod workflow;

pub use error::{Error, Result};
