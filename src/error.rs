pub type KinetoResult<T> = Result<T, KinetoError>;

#[derive(thiserror::Error, Debug)]
pub enum KinetoError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("sequence error: {0}")]
    Sequence(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl KinetoError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn sequence(msg: impl Into<String>) -> Self {
        Self::Sequence(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }
}
