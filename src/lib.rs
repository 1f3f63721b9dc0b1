pub mod archive;
pub mod config;
pub mod error;
pub mod fetch;
pub mod media;
pub mod model;
pub mod pipeline;
pub mod resolve;
pub mod server;
pub mod workspace;

pub use error::{ApiError, Error, ErrorKind, Result};
