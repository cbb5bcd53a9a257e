// Shared test support code for integration tests.
// This module provides common utilities that all test files can use.

pub mod collector;
pub mod common;
pub mod harness;
pub mod upstream;

pub use common::*;
pub use harness::{serve_pipeline, TestHarness};
