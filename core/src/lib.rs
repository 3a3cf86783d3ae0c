pub mod analytics;
pub mod auth;
pub mod db;
pub mod error;
pub mod files;
pub mod log;
pub mod metrics;
pub mod models;
pub mod service;
pub mod session;
pub mod store;
pub mod transfer;
