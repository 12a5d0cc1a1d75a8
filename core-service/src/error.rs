use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)]
    Config(#[from] core_runtime::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Sync(#[from] core_sync::SyncError),

    #[error("Library error: {0}")]
    Library(#[from] core_library::LibraryError),
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use core_sync::SyncError;

    #[test]
    fn test_sync_errors_keep_their_message() {
        let error: CoreError = SyncError::UnsupportedProvider("dropbox".to_string()).into();
        assert_eq!(error.to_string(), "Unsupported provider: dropbox");
    }

    #[test]
    fn test_config_errors_pass_through() {
        let error: CoreError = core_runtime::Error::Config("missing database_path".to_string()).into();
        assert_eq!(error.to_string(), "Configuration error: missing database_path");
    }
}
