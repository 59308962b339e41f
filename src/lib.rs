pub mod chat;
pub mod config;
pub mod documents;
pub mod error;
pub mod gateway;
pub mod ingest;
pub mod models;
pub mod ollama;
pub mod server;
pub mod sessions;

pub use config::AppConfig;
pub use server::run_server;
