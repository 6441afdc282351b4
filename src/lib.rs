pub mod analytics;
pub mod api;
pub mod config;
pub mod error;
pub mod links;
pub mod models;
pub mod redirect;
pub mod render;
pub mod storage;
