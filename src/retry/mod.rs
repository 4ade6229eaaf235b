//! Retry with exponential backoff.
//!
//! Only rate-limit and quota errors are retried; every other failure propagates on the first
//! attempt.

pub mod policy;

pub use policy::*;
