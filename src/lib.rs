// src/lib.rs
pub mod batch;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod io;
pub mod pipeline;
pub mod processing;
pub mod scene;
pub mod utils;

pub use config::PipelineConfig;
pub use error::{Error, Result};
pub use pipeline::Pipeline;

// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
