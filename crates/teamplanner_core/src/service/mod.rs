//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into authorization-gated operations.
//! - Keep controllers decoupled from storage details.
//!
//! Every operation takes the acting user's id explicitly and returns
//! [`error::ServiceError`] on failure.

pub mod access;
pub mod attachment_service;
pub mod calendar_rules;
pub mod error;
pub mod event_service;
pub mod group_service;
pub mod invitation_service;
pub mod notification;
pub mod task_service;
pub mod user_service;
