//! Infrastructure layer
//!
//! Process-level configuration and logging setup.

mod config;
mod logging;

pub use config::Config;
pub use logging::init_logging;
