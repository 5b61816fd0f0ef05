use thiserror::Error;

pub type SebitResult<T> = Result<T, SebitError>;

#[derive(Error, Debug)]
pub enum SebitError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("unknown model: {name}\navailable: {available}")]
    UnknownModel { name: String, available: String },

    #[error("{0}")]
    Validation(String),

    #[error("Workbook error: {0}")]
    Workbook(String),

    #[error("Report error: {0}")]
    Report(String),
}

impl SebitError {
    pub fn validation(message: impl Into<String>) -> Self {
        SebitError::Validation(message.into())
    }
}
