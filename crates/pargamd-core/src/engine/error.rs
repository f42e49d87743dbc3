use super::config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("Invalid parameters: {0}")]
    Config(#[from] ConfigError),

    #[error("Rendered bundle is inconsistent: {0}")]
    Inconsistent(String),
}
