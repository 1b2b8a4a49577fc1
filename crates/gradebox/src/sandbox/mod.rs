//! Per-evaluation sandbox
//!
//! Each evaluation owns one disposable directory under the configured
//! sandbox root. The sandbox holds the staged submission, staged test units,
//! compiled output, and captured toolchain logs; destroying it is one
//! operation that releases everything the evaluation created.

use thiserror::Error;

pub use crate::sandbox::lifecycle::{Sandbox, SandboxPool};
pub use crate::sandbox::paths::{ValidationError, check_size, confine, sanitize_file_name};

mod lifecycle;
mod paths;

/// Errors that occur during sandbox operations
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("failed to create sandbox {id}: {source}")]
    CreateFailed {
        id: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to clean up sandbox {id}: {source}")]
    CleanupFailed {
        id: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("sandbox pool is closed")]
    PoolClosed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
