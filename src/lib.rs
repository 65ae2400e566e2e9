pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliArgs;

pub use crate::app::pipelines::TimelinePipeline;
pub use crate::config::{cli::LocalStorage, TimelineConfig};
pub use crate::core::engine::TimelineEngine;
pub use crate::utils::error::{Result, TimelineError};
