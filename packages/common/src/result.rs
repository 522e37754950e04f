use crate::error::TreeError;

/// Common Result type alias
pub type CommonResult<T> = Result<T, TreeError>;
