//! IO module - configuration and file handling for AFQMC runs.

mod config;

pub use config::{parse_run_config, read_run_config, RunConfig, SystemConfig};
