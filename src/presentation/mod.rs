// Presentation layer - HTTP adapter over dashboard sessions
pub mod app_state;
pub mod error;
pub mod handlers;
