//! Common library for the Dogtrack application
//!
//! This crate provides shared infrastructure used by the Dogtrack services:
//! database connectivity and the common error types.

pub mod database;
pub mod error;
