//! Shared test utilities for bgtranslate integration tests.
//!
//! This module provides:
//! - `TestHarness`: an in-memory database, table store and job repository
//! - `FakeAi`: a scriptable completion client
//! - `CancellingStore`: a store wrapper that cancels a job mid-run

pub mod cancelling_store;
pub mod fake_ai;
pub mod harness;

pub use cancelling_store::{CancelPoint, CancellingStore};
pub use fake_ai::{FakeAi, Reply, PREFIX};
pub use harness::{settings, TestHarness};
