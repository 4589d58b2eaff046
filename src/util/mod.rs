//! Shared helpers

pub mod geometry;
pub mod rate_limit;
pub mod time;
