//! Request handlers, one module per concept group.
//!
//! Handlers resolve the caller through the [`Session`](crate::session::Session)
//! extractor, run the relevant authorization assertion strictly before any
//! mutation, and delegate cross-concept sequences to [`crate::sync`].

pub mod comments;
pub mod conversations;
pub mod friends;
pub mod points;
pub mod posts;
pub mod tracking;
pub mod upvotes;
pub mod users;
