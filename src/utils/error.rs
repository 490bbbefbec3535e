use thiserror::Error;

#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    #[error("API request failed: {0}")]
    Api(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Missing configuration value: {field}")]
    MissingConfig { field: String },

    #[error("Invalid configuration value for {field} ('{value}'): {reason}")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unexpected data shape: {message}")]
    DataShape { message: String },

    #[error("Processing error: {message}")]
    Processing { message: String },
}

impl MigrateError {
    pub fn auth(message: impl Into<String>) -> Self {
        MigrateError::Auth {
            message: message.into(),
        }
    }

    pub fn data_shape(message: impl Into<String>) -> Self {
        MigrateError::DataShape {
            message: message.into(),
        }
    }

    pub fn processing(message: impl Into<String>) -> Self {
        MigrateError::Processing {
            message: message.into(),
        }
    }

    /// 配置與認證錯誤是致命的，其餘錯誤以資料形式記錄在結果中
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            MigrateError::Auth { .. }
                | MigrateError::MissingConfig { .. }
                | MigrateError::InvalidConfigValue { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, MigrateError>;
