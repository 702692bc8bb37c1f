//! `TaskFlow` — terminal task manager library.

pub mod app;
pub mod auth;
pub mod backend;
pub mod config;
pub mod net;
pub mod session;
pub mod storage;
pub mod tasks;
pub mod ui;
