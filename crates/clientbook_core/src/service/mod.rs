//! Use-case services over the client repository.
//!
//! # Responsibility
//! - Orchestrate repository calls into application-facing entry points.
//! - Keep callers decoupled from SQL and storage details.

pub mod client_service;
