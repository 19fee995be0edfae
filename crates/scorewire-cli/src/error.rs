use scorewire_core::ServiceError;
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] scorewire_core::ValidationError),

    #[error(transparent)]
    Config(#[from] scorewire_core::ConfigError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Config(_) => 2,
            Self::Service(ServiceError::UnknownDataset { .. }) => 2,
            Self::Service(ServiceError::Unavailable { .. }) => 3,
            Self::Serialization(_) => 4,
            Self::Io(_) => 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scorewire_core::{AllSourcesFailed, ConfigError};

    #[test]
    fn exit_codes_follow_error_category() {
        let unavailable = CliError::from(ServiceError::Unavailable {
            key: String::from("tabla"),
            source: AllSourcesFailed { failures: Vec::new() },
        });
        assert_eq!(unavailable.exit_code(), 3);

        let config = CliError::from(ConfigError::ZeroNotAllowed {
            var: "SCOREWIRE_MAX_RETRIES",
        });
        assert_eq!(config.exit_code(), 2);

        let io = CliError::from(std::io::Error::other("broken pipe"));
        assert_eq!(io.exit_code(), 10);
    }
}
