//! Loads `sentinel_core::PlannerConfiguration` from an optional TOML file,
//! falling back to its built-in defaults when the CLI config names none.
//! Mirrors the read→parse→validate shape used for the CLI's own
//! [`crate::config::CliConfig`], applied to the planner's tunables instead
//! of the CLI shell's.

use std::path::Path;

use sentinel_core::PlannerConfiguration;

use crate::error::{Error, Result};

pub fn load(path: Option<&Path>) -> Result<PlannerConfiguration> {
    let config = match path {
        None => PlannerConfiguration::default(),
        Some(path) => {
            let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
                path: path.to_path_buf(),
                source: e,
            })?;
            toml::from_str(&contents)?
        }
    };
    config
        .validate()
        .map_err(|e| Error::Config(format!("planner configuration: {e}")))?;
    Ok(config)
}
