//! Listkeeper Server - session-backed todo lists.
//!
//! Visitors create named lists, add, complete and delete todos within them,
//! and see which lists are finished. All state lives in the visitor's
//! session; nothing is persisted across sessions or restarts.
//!
//! # Architecture
//!
//! - [`store`] holds the list logic: id assignment, name validation,
//!   lookups, mutations, and completion/display helpers.
//! - [`session`] keeps one [`store::ListStore`] per session token in memory.
//! - [`context`] checks a session out for one request and writes it back.
//! - [`routes`] translates HTTP requests into store operations.

pub mod config;
pub mod context;
pub mod error;
pub mod routes;
pub mod session;
pub mod store;
pub mod types;
