//! Shared wire types for `TaskFlow`: task rows and auth sessions.

pub mod auth;
pub mod task;
