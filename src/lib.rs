//! Research-paper-to-podcast conversion service.
//!
//! The library target exists so integration tests can assemble the full
//! router in-process; the binary in `main.rs` is a thin startup shell.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
