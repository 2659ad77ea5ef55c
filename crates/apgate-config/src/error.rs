use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "Config file not found. Looked in:\n\
        - APGATE_CONFIG_PATH\n\
        - current directory: apgate.local.yaml, apgate.yaml\n\
        - ./.apgate/ directory\n\
        - ~/.config/apgate/config.yaml"
    )]
    ConfigFileNotFound,

    #[error("Invalid config {path}: {message}")]
    Invalid { path: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
