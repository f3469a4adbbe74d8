pub mod adapters;
#[cfg(feature = "cli")]
pub mod config;
pub mod core;
pub mod domain;
pub mod normalizer;
pub mod parsers;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, TomlConfig};

pub use adapters::{LocalStorage, SshNetconfConnector, StdoutStorage, SystemSshConnector};
pub use core::{etl::CollectorEngine, pipeline::DevicePipeline};
pub use normalizer::{normalize_data, Record};
pub use utils::error::{CollectorError, Result};
