//! Domain layer types and invariants.

pub mod context;
pub mod question;
pub mod types;
