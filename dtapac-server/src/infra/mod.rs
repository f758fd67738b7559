//! Process wiring.

pub mod signals;
pub mod wiring;

pub use signals::shutdown_signal;
pub use wiring::{ServiceClients, build_clients, build_orchestrator};
