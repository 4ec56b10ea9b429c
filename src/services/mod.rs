pub mod converter;
pub mod podcast_service;
