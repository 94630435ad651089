pub mod auth;
pub mod cli;
pub mod config;
pub mod entity;
pub mod error;
pub mod http;
pub mod service;
pub mod storage;

pub use config::Config;
pub use error::{CrmError, Result};
pub use service::CrmService;
pub use storage::SqliteStore;
