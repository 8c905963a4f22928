//! Domain model for stored questions and provider configuration.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//!
//! # Invariants
//! - Every question is identified by a stable opaque id.
//! - Deletion is a soft-delete tombstone first; hard delete is explicit.

pub mod ai_config;
pub mod question;
