//! In-memory implementations for testing.
//!
//! Available behind the `test-utils` feature flag.

mod scripted_backend;

pub use scripted_backend::ScriptedBackend;
