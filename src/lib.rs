pub mod capture_pipeline;
pub mod cli;
pub mod logger;
