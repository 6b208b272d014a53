pub mod config;
pub mod error;
pub mod status;
pub mod types;

pub use config::{Defaults, PulseConfig, ResolvedConfig};
pub use error::{ConfigError, ConfigResult};
pub use status::Status;
pub use types::*;
