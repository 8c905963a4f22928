//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep CLI/HTTP layers decoupled from storage details.

pub mod question_service;
