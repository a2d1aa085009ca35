//! Host-program errors: anything that can go wrong driving the embedding
//! API from the command line, distinct from both in-language `Error`
//! values and `ferro_rt::VmError` (which only covers API misuse).

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReplError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("embedding API error: {0}")]
    Vm(#[from] ferro_rt::VmError),

    #[error("line editor error: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),
}

pub type ReplResult<T> = Result<T, ReplError>;
