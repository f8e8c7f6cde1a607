use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    #[error("Optimized profiles differ: {0}")]
    CompareMismatch(String),

    #[error("Invalid trace: {0}")]
    TraceInvalid(String),
}
