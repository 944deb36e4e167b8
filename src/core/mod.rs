//! Process-wide state shared by the server, the watcher and `main`.

mod state;

pub use state::{is_shutdown, register_server, register_shutdown, setup_shutdown_handler};
