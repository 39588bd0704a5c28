//! Backing store contract
//!
//! The clients only need three primitives from the hierarchical key-value
//! store: a point-in-time fetch, an overwriting write, and a cancellable
//! long-poll that blocks until a path's version cursor moves past a given
//! index. Any store speaking this contract can back a [`crate::Client`].

mod node;
mod store_client;

pub mod adaptors;


pub use adaptors::*;
pub use node::*;
pub use store_client::*;
