pub mod error;
pub mod settings;

pub use error::*;
pub use settings::{ApiSettings, PollSettings, WorkflowConfig};

use std::path::PathBuf;

const CONFIG_ENV: &str = "APGATE_CONFIG_PATH";
const CANDIDATES: [&str; 2] = ["apgate.local.yaml", "apgate.yaml"];

/// Locate the config file
///
/// Search order:
/// 1. `APGATE_CONFIG_PATH`
/// 2. current directory: apgate.local.yaml, apgate.yaml
/// 3. `./.apgate/`, same order
/// 4. `~/.config/apgate/config.yaml`
pub fn find_config_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var(CONFIG_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
    }

    let current_dir = std::env::current_dir()?;
    for filename in &CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    let local_dir = current_dir.join(".apgate");
    if local_dir.is_dir() {
        for filename in &CANDIDATES {
            let path = local_dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("apgate").join("config.yaml");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::ConfigFileNotFound)
}

/// Load the config file, falling back to defaults when there is none
pub fn load() -> Result<(WorkflowConfig, Option<PathBuf>)> {
    match find_config_file() {
        Ok(path) => Ok((WorkflowConfig::load_from(&path)?, Some(path))),
        Err(ConfigError::ConfigFileNotFound) => {
            tracing::debug!("No config file found, using defaults");
            Ok((WorkflowConfig::default(), None))
        }
        Err(e) => Err(e),
    }
}
