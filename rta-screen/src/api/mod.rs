//! HTTP API handlers for rta-screen

pub mod body;
pub mod health;
pub mod identify;
pub mod screen;

pub use body::{parse_body, ParseStage};
pub use health::health_routes;
pub use identify::identify_routes;
pub use screen::screen_routes;
