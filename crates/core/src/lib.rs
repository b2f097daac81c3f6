pub mod business_time;
pub mod config;
pub mod errors;

pub use config::AppConfig;
pub use errors::{WillCallError, WillCallResult};
