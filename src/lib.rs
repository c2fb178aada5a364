// Parking occupancy simulator - layered like the service that hosts it
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
