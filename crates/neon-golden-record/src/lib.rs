//! Golden records for the Neon compiler test harness.
//!
//! This crate provides:
//! - [`TestCase`]: the recorded expectation for one fixture
//! - A byte-exact, length-prefixed codec for persisting test cases
//! - [`load`] / [`save`]: filesystem access, with atomic replacement on save
//!
//! A missing record is not an error: [`load`] returns `Ok(None)` so callers can
//! fall back to a smoke test. Anything that exists but does not parse is a
//! [`RecordError::Malformed`].

#![forbid(unsafe_code)]

pub mod codec;
pub mod error;
pub mod test_case;

pub use codec::{load, save};
pub use error::RecordError;
pub use test_case::TestCase;
