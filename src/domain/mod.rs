// Domain layer - Parking lot model, simulation and view projection
pub mod dashboard;
pub mod lot;
pub mod simulation;
pub mod snapshot;
pub mod view;
