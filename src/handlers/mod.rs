pub mod health_handlers;
pub mod podcast_handlers;
