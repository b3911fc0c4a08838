pub mod config;
pub mod error;
pub mod services;
pub mod text_map;

pub use error::{Result, ViewerError};
