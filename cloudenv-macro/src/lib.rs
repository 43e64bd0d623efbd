//! cloudenv CloudFormation macro
//!
//! Rewrites `AWS::Serverless::Function` resources that declare `Environment.Secrets`:
//! - each secret becomes a prefixed environment variable resolved by the wrapper layer
//! - the wrapper layer (or image entrypoint) is wired in
//! - IAM statements granting read access to the referenced parameters and secrets are added

pub mod config;
pub mod error;
pub mod function;
pub mod handler;
pub mod policy;
pub mod request;
pub mod transform;

pub use config::{ConfigError, EntryPointMode, LayerConfig};
pub use error::TransformError;
pub use handler::MacroHandler;
pub use request::{MacroRequest, MacroResponse};
pub use transform::Transformer;
