pub mod commander;
pub mod connector;
pub mod dispatcher;
pub mod etl;
pub mod pipeline;
pub mod tables;

pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
pub use dispatcher::Dispatcher;
pub use pipeline::DevicePipeline;
