//! Core use-case services.
//!
//! # Responsibility
//! - Validate caller input and orchestrate repository calls.
//! - Keep the request surface decoupled from storage details.

pub mod edit_lock_service;
pub mod graph_service;
