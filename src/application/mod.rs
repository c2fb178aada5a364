// Application layer - Sessions and the ports they talk through
pub mod session;
pub mod session_registry;
pub mod snapshot_sink;
