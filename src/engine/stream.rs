//! One-file copy-with-hash and verify-with-hash loops.
//!
//! Both loops feed identical bytes to the hasher and (for copy) the
//! destination file in the same pass -- there is no separate re-read for
//! hashing. Progress is throttled to at most one `FileProgress` per ~100ms
//! per file; the caller supplies the emit closure so this module has no
//! dependency on the Supervisor's event type beyond the callback shape.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use crate::engine::hash::StreamHasher;
use crate::error::CopyError;

/// Buffer size for the read loop and BufWriter: 256KB.
const BUF_SIZE: usize = 256 * 1024;
const PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

/// Result of a successful copy: final digest and total bytes moved.
pub struct CopyOutcome {
    pub digest: String,
    pub bytes: u64,
}

/// Copies `source` to `dest`, hashing every chunk as it is written.
///
/// `dest`'s parent directory must already exist -- the Supervisor creates it
/// before dispatch, per the streamer/supervisor division of labor. Every
/// chunk read is written to `dest` and fed to the hasher before the next
/// chunk is read, so both observe the identical byte sequence.
pub fn copy_with_hash(
    source: &Path,
    dest: &Path,
    mut on_progress: impl FnMut(u64, u64),
) -> Result<CopyOutcome, CopyError> {
    let src_file = File::open(source)?;
    let bytes_total = src_file.metadata()?.len();
    let mut reader = BufReader::with_capacity(BUF_SIZE, src_file);

    let dest_file = File::create(dest)?;
    let mut writer = BufWriter::with_capacity(BUF_SIZE, dest_file);

    let mut hasher = StreamHasher::new();
    let mut buf = [0u8; BUF_SIZE];
    let mut bytes_so_far: u64 = 0;
    let mut last_emit = Instant::now();

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        writer.write_all(&buf[..n])?;
        hasher.update(&buf[..n]);
        bytes_so_far += n as u64;

        if last_emit.elapsed() >= PROGRESS_INTERVAL {
            on_progress(bytes_so_far, bytes_total);
            last_emit = Instant::now();
        }
    }

    writer.flush()?;

    Ok(CopyOutcome {
        digest: hasher.finalize(),
        bytes: bytes_so_far,
    })
}

/// Result of a verify pass: the computed digest, for the caller to compare.
pub struct VerifyOutcome {
    pub digest: String,
    pub bytes: u64,
}

/// Re-hashes `path` without writing anything. Same chunking and progress
/// throttle as `copy_with_hash`, minus the destination write.
pub fn verify_with_hash(
    path: &Path,
    mut on_progress: impl FnMut(u64, u64),
) -> Result<VerifyOutcome, CopyError> {
    let src_file = File::open(path)?;
    let bytes_total = src_file.metadata()?.len();
    let mut reader = BufReader::with_capacity(BUF_SIZE, src_file);

    let mut hasher = StreamHasher::new();
    let mut buf = [0u8; BUF_SIZE];
    let mut bytes_so_far: u64 = 0;
    let mut last_emit = Instant::now();

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        bytes_so_far += n as u64;

        if last_emit.elapsed() >= PROGRESS_INTERVAL {
            on_progress(bytes_so_far, bytes_total);
            last_emit = Instant::now();
        }
    }

    Ok(VerifyOutcome {
        digest: hasher.finalize(),
        bytes: bytes_so_far,
    })
}

/// Case-insensitive hex digest comparison, per the Streamer's verify contract.
pub fn digests_match(expected: &str, actual: &str) -> bool {
    expected.eq_ignore_ascii_case(actual)
}
