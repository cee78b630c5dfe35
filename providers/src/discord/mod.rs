//! Discord desktop RPC over the local IPC socket.

mod activity;
mod client;
pub mod codec;

pub use client::DiscordIpcClient;
