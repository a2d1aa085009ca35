//! Embedder-facing, host-boundary errors.
//!
//! These are distinct from in-language `Error` *values*: a `VmError` means
//! the embedder misused the stack-based API itself, not that a script
//! failed. Scripts never see a `VmError`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VmError {
    #[error("stack index {0} out of range (stack has {1} values)")]
    StackIndexOutOfRange(i64, usize),

    #[error("slot {0} is not a {1}")]
    WrongType(i64, &'static str),

    #[error("module not found: {0}")]
    FileNotFound(String),

    #[error("host hook violated its contract: {0}")]
    HookContractViolation(String),

    #[error("stack[{0}] is not callable")]
    NotCallable(i64),
}

/// Numeric result codes at the embedding boundary, kept alongside
/// `VmError` for any C-ABI-shaped wrapper that cannot propagate a Rust
/// `Result`.
pub const RESULT_OK: i32 = 0;
pub const RESULT_FAIL: i32 = -1;
pub const RESULT_FILE_NOT_FOUND: i32 = -2;

impl From<&VmError> for i32 {
    fn from(e: &VmError) -> i32 {
        match e {
            VmError::FileNotFound(_) => RESULT_FILE_NOT_FOUND,
            _ => RESULT_FAIL,
        }
    }
}

pub type VmResult<T> = Result<T, VmError>;
