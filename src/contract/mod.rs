//! API contract checks: body shapes and authentication behaviour

pub mod shape;
pub mod suite;

pub use suite::{CheckOutcome, run_auth_suite};
