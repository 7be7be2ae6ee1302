use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Simulator protocol error: {message}")]
    ProtocolError { message: String },

    #[error("Simulator connection error: {message}")]
    ConnectionError { message: String },

    #[error("No telemetry received for {seconds}s")]
    SimulatorTimeout { seconds: u64 },

    #[error("Invalid input for {field}: {reason}")]
    InvalidInput { field: String, reason: String },
}

/// 錯誤分類，用於日誌與退出碼
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Simulator,
    Storage,
    Data,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AgentError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AgentError::ConfigError { .. }
            | AgentError::InvalidConfigValueError { .. }
            | AgentError::MissingConfigError { .. }
            | AgentError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            AgentError::ProtocolError { .. }
            | AgentError::ConnectionError { .. }
            | AgentError::SimulatorTimeout { .. } => ErrorCategory::Simulator,
            AgentError::ZipError(_) | AgentError::IoError(_) => ErrorCategory::Storage,
            AgentError::CsvError(_)
            | AgentError::SerializationError(_)
            | AgentError::InvalidInput { .. } => ErrorCategory::Data,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 模擬器暫停或載入中，稍後重試即可
            AgentError::SimulatorTimeout { .. } => ErrorSeverity::Medium,
            AgentError::ConnectionError { .. } => ErrorSeverity::Medium,
            AgentError::InvalidInput { .. } | AgentError::ProtocolError { .. } => {
                ErrorSeverity::High
            }
            AgentError::ConfigError { .. }
            | AgentError::InvalidConfigValueError { .. }
            | AgentError::MissingConfigError { .. }
            | AgentError::ConfigValidationError { .. } => ErrorSeverity::High,
            AgentError::CsvError(_) | AgentError::SerializationError(_) => ErrorSeverity::High,
            AgentError::ZipError(_) | AgentError::IoError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            AgentError::SimulatorTimeout { seconds } => format!(
                "The simulator stopped sending telemetry ({}s without data)",
                seconds
            ),
            AgentError::ConnectionError { message } => {
                format!("Could not talk to the simulator: {}", message)
            }
            AgentError::InvalidConfigValueError { field, reason, .. } => {
                format!("Setting '{}' is invalid: {}", field, reason)
            }
            AgentError::MissingConfigError { field } => {
                format!("Setting '{}' is required", field)
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => "Check the configuration file and command line options",
            ErrorCategory::Simulator => match self {
                AgentError::ProtocolError { .. } => {
                    "Make sure the configured port belongs to X-Plane and not another application"
                }
                _ => "Make sure the simulator is running, unpaused, and reachable on the configured address",
            },
            ErrorCategory::Storage => "Check that the output directory exists and is writable",
            ErrorCategory::Data => "Check the input values or recorded file for malformed data",
        }
    }

    /// 依嚴重程度決定程序退出碼
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }

    pub fn invalid_input(field: &str, reason: impl Into<String>) -> Self {
        AgentError::InvalidInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        AgentError::ProtocolError {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AgentError>;
