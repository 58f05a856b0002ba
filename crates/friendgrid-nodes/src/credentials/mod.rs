//! Credential types provided by this crate.

mod friend_grid_api;

pub use friend_grid_api::*;
