use std::fmt;

#[derive(Debug, Clone)]
pub enum SnaplinkError {
    Validation(String),
    NotFound(String),
    Storage(String),
    CorruptData(String),
    RetriesExhausted(String),
}

impl SnaplinkError {
    pub fn code(&self) -> &'static str {
        match self {
            SnaplinkError::Validation(_) => "E001",
            SnaplinkError::NotFound(_) => "E002",
            SnaplinkError::Storage(_) => "E003",
            SnaplinkError::CorruptData(_) => "E004",
            SnaplinkError::RetriesExhausted(_) => "E005",
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            SnaplinkError::Validation(_) => "Validation Error",
            SnaplinkError::NotFound(_) => "Resource Not Found",
            SnaplinkError::Storage(_) => "Storage Error",
            SnaplinkError::CorruptData(_) => "Corrupt Data",
            SnaplinkError::RetriesExhausted(_) => "Retries Exhausted",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            SnaplinkError::Validation(msg) => msg,
            SnaplinkError::NotFound(msg) => msg,
            SnaplinkError::Storage(msg) => msg,
            SnaplinkError::CorruptData(msg) => msg,
            SnaplinkError::RetriesExhausted(msg) => msg,
        }
    }

    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for SnaplinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for SnaplinkError {}

impl SnaplinkError {
    pub fn validation<T: Into<String>>(msg: T) -> Self {
        SnaplinkError::Validation(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        SnaplinkError::NotFound(msg.into())
    }

    pub fn storage<T: Into<String>>(msg: T) -> Self {
        SnaplinkError::Storage(msg.into())
    }

    pub fn corrupt_data<T: Into<String>>(msg: T) -> Self {
        SnaplinkError::CorruptData(msg.into())
    }

    pub fn retries_exhausted<T: Into<String>>(msg: T) -> Self {
        SnaplinkError::RetriesExhausted(msg.into())
    }
}

impl From<redis::RedisError> for SnaplinkError {
    fn from(err: redis::RedisError) -> Self {
        SnaplinkError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for SnaplinkError {
    fn from(err: serde_json::Error) -> Self {
        SnaplinkError::CorruptData(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SnaplinkError>;
