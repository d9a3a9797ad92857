pub mod hash;
pub mod manifest;
pub mod stream;
pub mod supervisor;
pub mod types;
pub mod worker;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

pub use types::{
    CancellationToken, CopyTask, HashLine, ProgressEvent, ProgressSink, VerifySummary, VerifyTask,
};

use crate::error::CopyError;

const MANIFEST_FILE_NAME: &str = "hashes.sha1";

/// Options for `copy_from_list`. Unspecified fields default via `Default`.
pub struct CopyOptions {
    pub thread_count: Option<usize>,
    pub save_lists: bool,
    pub on_progress: Option<Box<dyn FnMut(ProgressEvent) + Send>>,
    pub cancel_token: Option<CancellationToken>,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            thread_count: None,
            save_lists: false,
            on_progress: None,
            cancel_token: None,
        }
    }
}

/// Options for `verify_from_manifest`. Same shape as `CopyOptions` minus
/// `save_lists`, which has no meaning for a read-only verify run.
pub struct VerifyOptions {
    pub thread_count: Option<usize>,
    pub on_progress: Option<Box<dyn FnMut(ProgressEvent) + Send>>,
    pub cancel_token: Option<CancellationToken>,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            thread_count: None,
            on_progress: None,
            cancel_token: None,
        }
    }
}

/// Resolve the requested thread count, defaulting to the host's logical CPU
/// count. `Some(0)` is rejected -- a pool of zero workers can never drain a
/// non-empty queue.
fn resolve_thread_count(requested: Option<usize>) -> Result<usize, CopyError> {
    match requested {
        Some(0) => Err(CopyError::Config("--threads must be at least 1".to_string())),
        Some(n) => Ok(n),
        None => Ok(std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4)),
    }
}

/// Strip a leading `/` so an absolute source path mirrors under `dest_dir`
/// instead of being interpreted as an absolute destination.
fn mirror_dest(dest_dir: &Path, source: &Path) -> PathBuf {
    let relative = source.strip_prefix("/").unwrap_or(source);
    dest_dir.join(relative)
}

/// Read a list file into `CopyTask`s, filtering blank lines and paths that
/// resolve to existing directories, per `spec.md` §6's input contract.
fn build_copy_tasks(list_path: &Path, dest_dir: &Path) -> Result<Vec<CopyTask>, CopyError> {
    let contents = fs::read_to_string(list_path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            CopyError::ListNotFound {
                path: list_path.to_path_buf(),
            }
        } else {
            CopyError::Io { source: e }
        }
    })?;

    let mut tasks = Vec::new();
    for line in contents.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let source = PathBuf::from(trimmed);
        if source.is_dir() {
            continue;
        }
        let dest = mirror_dest(dest_dir, &source);
        tasks.push(CopyTask { source, dest });
    }
    Ok(tasks)
}

/// Create the parent directory of every task's destination, recursively and
/// idempotently, before any worker is dispatched -- the Streamer assumes
/// this is already done.
fn create_dest_parents(tasks: &[CopyTask]) -> Result<(), CopyError> {
    for task in tasks {
        if let Some(parent) = task.dest.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
    }
    Ok(())
}

fn write_list_file(path: &Path, entries: &[PathBuf]) -> Result<(), CopyError> {
    let mut contents = String::new();
    for entry in entries {
        contents.push_str(&entry.display().to_string());
        contents.push('\n');
    }
    fs::write(path, contents)?;
    Ok(())
}

/// Copy every file named in `list_path` into `dest_dir`, hashing each as it
/// is written, and emit `<dest_dir>/hashes.sha1` on completion.
pub fn copy_from_list(list_path: &Path, dest_dir: &Path, mut opts: CopyOptions) -> Result<(), CopyError> {
    let thread_count = resolve_thread_count(opts.thread_count)?;

    let tasks = build_copy_tasks(list_path, dest_dir)?;
    create_dest_parents(&tasks)?;

    let manifest_path = dest_dir.join(MANIFEST_FILE_NAME);
    if manifest_path.exists() {
        fs::remove_file(&manifest_path)?;
    }

    let cancel_token = opts.cancel_token.clone().unwrap_or_default();
    let total = tasks.len();

    info!(total, thread_count, "starting copy run");

    let mut sink = opts.on_progress.take();
    let result = supervisor::run_copy(tasks, thread_count, &cancel_token, |event| {
        if let Some(sink) = sink.as_mut() {
            sink(event);
        }
    });

    if result.cancelled {
        tracing::warn!("copy run cancelled; writing partial artifacts");
    }

    manifest::write_manifest(&manifest_path, &result.hash_lines)?;

    if opts.save_lists {
        let copied_sources: Vec<PathBuf> = result.copied.clone();
        write_list_file(&dest_dir.join("copied.txt"), &copied_sources)?;
        let errored_sources: Vec<PathBuf> = result.errored.iter().map(|(p, _)| p.clone()).collect();
        write_list_file(&dest_dir.join("errored.txt"), &errored_sources)?;
    }

    info!(
        copied = result.copied.len(),
        errored = result.errored.len(),
        "copy run finished"
    );

    Ok(())
}

/// Read `manifest_path`, re-hash every listed file, and return the resulting
/// `VerifySummary`.
pub fn verify_from_manifest(manifest_path: &Path, mut opts: VerifyOptions) -> Result<VerifySummary, CopyError> {
    let thread_count = resolve_thread_count(opts.thread_count)?;

    let contents = fs::read_to_string(manifest_path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            CopyError::ManifestNotFound {
                path: manifest_path.to_path_buf(),
            }
        } else {
            CopyError::Io { source: e }
        }
    })?;

    let entries = manifest::parse_manifest(manifest_path, &contents)?;
    let tasks: Vec<VerifyTask> = entries
        .into_iter()
        .map(|(expected, path)| VerifyTask { path, expected })
        .collect();

    let cancel_token = opts.cancel_token.clone().unwrap_or_default();
    let total = tasks.len();

    info!(total, thread_count, "starting verify run");

    let mut sink = opts.on_progress.take();
    let summary = supervisor::run_verify(tasks, thread_count, &cancel_token, |event| {
        if let Some(sink) = sink.as_mut() {
            sink(event);
        }
    });

    info!(
        ok = summary.ok,
        mismatched = summary.mismatched,
        errors = summary.errors,
        "verify run finished"
    );

    Ok(summary)
}
