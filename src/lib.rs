//! `sha1copy`'s engine library: a bounded worker pool that streams files,
//! hashes them with SHA-1 in the same pass, and emits or verifies a
//! `hashes.sha1` manifest. The `sha1copy` binary (`main.rs`) is a thin CLI
//! front-end over the functions re-exported here.

pub mod config;
pub mod engine;
pub mod error;

pub use engine::{
    CancellationToken, CopyOptions, CopyTask, HashLine, ProgressEvent, ProgressSink,
    VerifySummary, VerifyOptions, VerifyTask, copy_from_list, verify_from_manifest,
};
pub use error::CopyError;
