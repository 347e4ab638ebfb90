//! Integration tests for the Gather lifecycle engine
//!
//! This crate contains integration tests that verify the engine end to end
//! through the in-memory store adapter: lifecycle scenarios, reconciliation
//! behavior, join-code collision handling, the visibility gate and the
//! membership model.

// This is a test-only crate
#![cfg(test)]
