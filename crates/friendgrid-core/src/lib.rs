//! # friendgrid-core
//!
//! Execution runtime for FriendGrid nodes.
//!
//! This crate provides what a node needs from its host while it runs:
//! - An explicit per-item parameter accessor with expression support
//! - Credential type registration and credential lookup
//! - Authenticated HTTP requests that never expose secrets to the node
//! - A registry that dispatches a node instance to its executor

pub mod context;
pub mod credentials;
pub mod error;
pub mod executor;
pub mod expression;
pub mod mock;
pub mod request;
pub mod runtime;

pub use context::ExecuteContext;
pub use credentials::{
    authenticate, CredentialStore, CredentialTypeRegistry, DecryptedCredentialData,
    MemoryCredentialStore,
};
pub use error::*;
pub use executor::*;
pub use expression::{ExpressionError, ExpressionResult};
pub use mock::{MockRequestHelper, RecordedRequest};
pub use request::{
    CredentialTestResult, CredentialTestStatus, HttpRequestHelper, RequestHelper, RequestOptions,
};
pub use runtime::RuntimeConfig;
