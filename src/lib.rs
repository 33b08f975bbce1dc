//! DRIP — Deposit-Reactive Incremental Purchaser
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod clock;
pub mod config;
pub mod engine;
pub mod exchange;
pub mod schedule;
