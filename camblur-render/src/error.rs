use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MotionBlurError {
    #[error("unsupported platform: {0} not available")]
    Unsupported(&'static str),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("unknown handle {0}")]
    UnknownHandle(u64),
}

pub type Result<T> = std::result::Result<T, MotionBlurError>;
