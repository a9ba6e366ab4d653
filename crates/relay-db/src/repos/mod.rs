//! Repository implementations, one module per aggregate.
//!
//! Each module adds methods to [`crate::service::RelayService`].

pub mod activity;
pub mod analytics;
pub mod board;
pub mod email;
pub mod export;
pub mod field;
pub mod member;
pub mod message;
pub mod organization;
pub mod rating;
pub mod subscription;
pub mod ticket;
