use lookback_utils::ErrorKind;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Utils(#[from] lookback_utils::Error),

    #[error(transparent)]
    Common(#[from] lookback_common::Error),

    #[error(transparent)]
    Server(#[from] lookback_server::Error),

    #[error("Failed to format output as JSON. (Error: {0})")]
    OutputFormatting(#[from] serde_json::Error),
}

impl CliError {
    /// 2 for bad input, 3 when rate limited, 1 for everything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Common(_) => 2,
            CliError::Utils(err) => match err.kind() {
                ErrorKind::InvalidInput => 2,
                ErrorKind::RateLimited => 3,
                _ => 1,
            },
            CliError::Server(_) | CliError::OutputFormatting(_) => 1,
        }
    }
}
