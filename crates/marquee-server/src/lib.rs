pub mod client;
pub mod handlers;
pub mod server;

pub use client::ClientRegistry;
pub use handlers::HandlerState;
pub use server::{start, AppState, ServerHandle};
