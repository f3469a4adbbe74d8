//! Concrete implementations of the domain ports: device transports and
//! metric sinks.

pub mod netconf;
pub mod ssh;
pub mod storage;

pub use netconf::SshNetconfConnector;
pub use ssh::SystemSshConnector;
pub use storage::{LocalStorage, StdoutStorage};
