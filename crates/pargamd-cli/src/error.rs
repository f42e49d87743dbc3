use pargamd::engine::config::ConfigError;
use pargamd::engine::error::GeneratorError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Generator(#[from] GeneratorError),

    #[error("Invalid parameters: {0}")]
    Parameters(#[from] ConfigError),

    #[error("Invalid --set override: {0}")]
    Override(String),

    #[error("Asset path error: {0}")]
    Assets(String),

    #[error("Failed to read '{path}': {source}", path = path.display())]
    FileParsing {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    /// Problems the user can fix by editing the parameter file or flags.
    pub fn is_user_input(&self) -> bool {
        matches!(
            self,
            CliError::Parameters(_)
                | CliError::Override(_)
                | CliError::FileParsing { .. }
                | CliError::Argument(_)
                | CliError::Generator(GeneratorError::Config(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameter_errors_name_the_field() {
        let err: CliError = ConfigError::MissingParameter("account").into();
        assert_eq!(err.to_string(), "Invalid parameters: Missing required parameter: account");
        assert!(err.is_user_input());
    }

    #[test]
    fn infrastructure_errors_are_not_user_input() {
        assert!(!CliError::Server("bind".to_string()).is_user_input());
        assert!(!CliError::Generator(GeneratorError::Inconsistent("x".to_string())).is_user_input());
    }
}
