// Application state for HTTP handlers
use crate::application::session_registry::SessionRegistry;

#[derive(Clone)]
pub struct AppState {
    pub registry: SessionRegistry,
    /// Echoed to clients so status messages clear themselves after this long.
    pub status_clear_ms: u64,
}
