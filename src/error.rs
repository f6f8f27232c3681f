use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StripError {
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),
}

pub type Result<T> = std::result::Result<T, StripError>;
