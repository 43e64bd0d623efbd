//! Core types for cloudenv
//!
//! This crate provides the ARN handling and secret service classification used by both
//! the template macro and the runtime resolver.

pub mod arn;
pub mod error;
pub mod service;

pub use arn::Arn;
pub use error::ArnError;
pub use service::{SecretService, EXEC_WRAPPER_PATH};
