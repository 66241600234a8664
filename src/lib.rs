pub mod api;
pub mod config;
pub mod dashboard;
pub mod entity;
pub mod llm;
pub mod store;
pub mod types;

pub use config::Config;
