//! # TaskDesk Shared Library
//!
//! Data access and authentication for the TaskDesk task manager. Front ends
//! (the `taskdesk` shell today) talk to [`storage::Storage`] and never to the
//! database directly.
//!
//! ## Module Organization
//!
//! - `storage`: the facade front ends call
//! - `store`: persistence backends (PostgreSQL and in-memory)
//! - `models`: users, tasks and their queries
//! - `auth`: password hashing, registration and verification
//! - `session`: the signed-in user
//! - `render`: display lines for task lists
//! - `db`: connection pool and migrations
//! - `config`: configuration management
//! - `error`: common error types

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod render;
pub mod session;
pub mod storage;
pub mod store;

/// Current version of the TaskDesk shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
