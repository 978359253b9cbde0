pub mod browser_ai;
pub mod config;
pub mod conversation;
pub mod error;
pub mod models;
pub mod prompts;
pub mod storage;

pub use config::Config;
pub use error::{AppError, Result};
