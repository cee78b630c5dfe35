//! Language-server transport for presence-lsp.
//!
//! Speaks just enough LSP to receive document lifecycle notifications from an
//! editor and forward them to the activity engine.

pub mod codec;
pub mod protocol;
mod server;

pub use server::{SERVER_NAME, serve};
