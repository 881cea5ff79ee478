//! MATCHCAST: football match outcome prediction pipeline.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod data;
pub mod features;
pub mod model;
pub mod storage;
pub mod engine;
