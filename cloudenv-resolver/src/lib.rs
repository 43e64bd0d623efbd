//! cloudenv environment resolver
//!
//! Counterpart of the macro at function startup: environment values written as
//! `{aws-ssm}<arn>` or `{aws-sm}<arn>` are replaced by the parameter or secret they
//! reference before the real program is started.
//!
//! Values are read through a [`SecretSource`]; [`InMemorySource`] backs tests and local runs.

pub mod env;
pub mod error;
pub mod resolve;
pub mod source;

pub use env::{apply, parameter_name, scan, Env, References};
pub use error::{ResolveError, SourceError};
pub use resolve::{Resolved, Resolver};
pub use source::{GetParametersOutput, InMemorySource, Parameter, SecretSource, SecretValue};
