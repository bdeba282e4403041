pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid range: {0}")]
    InvalidRange(String),

    #[error("reference sequence file required: {0}")]
    ReferenceRequired(String),

    #[error("index required: {0}")]
    IndexRequired(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Short machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Error::NotFound(_) => "NotFound",
            Error::UnsupportedFormat(_) => "UnsupportedFormat",
            Error::InvalidInput(_) => "InvalidInput",
            Error::InvalidRange(_) => "InvalidRange",
            Error::ReferenceRequired(_) => "ReferenceRequired",
            Error::IndexRequired(_) => "IndexRequired",
            Error::Io(_) | Error::Internal(_) => "InternalError",
        }
    }
}
