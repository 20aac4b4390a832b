//! HTTP front end for parley: a JSON chat API plus a bundled chat page.

pub mod handlers;
pub mod manager;
pub mod server;
pub mod state;

pub use manager::Manager;
pub use server::{build_router, run_server};
pub use state::{AppState, ChatCommand, ManagerCommand};
