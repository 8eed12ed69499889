//! Application services layer.

pub mod error;
pub mod listing;
pub mod pagination;
pub mod policy;
pub mod repos;
