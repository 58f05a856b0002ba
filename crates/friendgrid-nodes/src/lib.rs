//! # friendgrid-nodes
//!
//! The FriendGrid integration: the `friendGridApi` credential type and the
//! `friendGrid` node that creates SendGrid marketing contacts.

pub mod credentials;
pub mod nodes;

use std::sync::Arc;

use friendgrid_core::{CredentialTypeRegistry, NodeExecutorRegistry};

pub use credentials::{friend_grid_api, FRIEND_GRID_API};
pub use nodes::{friend_grid_description, FriendGridNode, FRIEND_GRID};

/// Register the node and its credential type with a host.
pub fn register(nodes: &mut NodeExecutorRegistry, credential_types: &mut CredentialTypeRegistry) {
    credential_types.register(friend_grid_api());
    nodes.register(Arc::new(FriendGridNode));
}
