//! Core data models for the podcast conversion service.
//!
//! A job is an ephemeral, request-scoped record; only the produced
//! artifacts outlive the request. Responses serialize as JSON via `serde`.

pub mod job;
pub mod response;
