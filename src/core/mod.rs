pub mod config;
pub mod error;
pub mod types;

pub use config::{GameConfig, ValidatedConfig};
pub use error::{Result, StealthError};
