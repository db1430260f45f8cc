pub mod api;
pub mod cli;
pub mod config;
pub mod entity;
pub mod error;
pub mod server;
pub mod session;
pub mod storage;

pub use api::Api;
pub use config::Config;
pub use error::{Result, SigndeskError};
pub use storage::{EntityStore, StoreHandle};
