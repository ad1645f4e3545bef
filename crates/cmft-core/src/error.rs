use thiserror::Error;

/// Failure modes of the filtering core, matching the error kinds a caller
/// needs to distinguish between: validation failures it can fix by changing
/// arguments, and device failures it can only retry or fall back from.
#[derive(Debug, Error)]
pub enum CmftError {
    #[error("input is not a six-face, equal-sided cubemap")]
    InvalidInput,

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("GPU device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("GPU task failed: {0}")]
    DeviceFailed(String),

    #[error("host allocation failed")]
    AllocationFailed,
}

pub type Result<T> = std::result::Result<T, CmftError>;
