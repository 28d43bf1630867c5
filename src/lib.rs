#![forbid(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;

pub use cli::CliArgs;
pub use config::{LoggingSettings, PipelineConfig, StageConfig};
pub use error::AppError;
pub use logging::setup_logging;
pub use pipeline::{run_from_config, Pipeline, PreparedPipeline, RunSummary, StageReport};
