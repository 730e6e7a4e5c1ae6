pub mod app;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod hooks;
pub mod models;
pub mod query;
pub mod router;
pub mod storage;
pub mod upload;
pub mod views;

pub use config::Config;
pub use error::{AppError, AppResult};
