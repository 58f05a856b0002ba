//! # friendgrid-workflow
//!
//! Types shared between the FriendGrid node and the workflow host that runs
//! it: input/output items, node parameters, node and credential type
//! descriptions, and the error taxonomy.

pub mod credential;
pub mod data;
pub mod error;
pub mod node;

pub use credential::*;
pub use data::*;
pub use error::*;
pub use node::*;
