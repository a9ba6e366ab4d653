//! # relay-core
//!
//! Core types shared by every Relay crate.
//!
//! - Entity structs for organizations, boards (leads and referrals), support
//!   tickets, subscriptions, the activity log and the email queue
//! - Status enums with transition tables
//! - ID prefix constants
//! - Request and response DTOs for the HTTP API
//! - Custom-field value validation
//! - [`errors::CoreError`] for failed domain rule checks
//! - Prompt templates for the AI assistant

pub mod activity_detail;
pub mod entities;
pub mod enums;
pub mod errors;
pub mod identity;
pub mod ids;
pub mod prompts;
pub mod requests;
pub mod responses;
