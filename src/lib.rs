//! Listing cache for the exam question bank.
//!
//! Paginated question listings are served cache-aside from a shared store,
//! guarded by advisory recomputation locks and evicted precisely through a
//! question → listing-key index when questions change.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
