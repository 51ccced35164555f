// Panel REST surface: HTTP client and payload models.

pub mod client;
pub mod models;
