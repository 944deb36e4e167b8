//! Live reload: WebSocket server and message protocol.

mod message;
mod server;

pub use server::{LiveReload, ReloadHandle};
