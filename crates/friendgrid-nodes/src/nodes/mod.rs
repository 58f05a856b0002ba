//! Node executors provided by this crate.

mod friend_grid;

pub use friend_grid::*;
