//! Parsing and rendering of the `hashes.sha1` manifest format:
//! `<hex-digest><space><space><path>\n`, the `sha1sum` convention.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::engine::types::HashLine;
use crate::error::CopyError;

/// Render one hash line, two ASCII spaces between digest and path.
pub fn render_line(line: &HashLine) -> String {
    format!("{}  {}\n", line.digest, line.dest.display())
}

/// Write every line to `path`, truncating (or creating) it first. Called
/// only at finalization -- never incrementally during a run.
pub fn write_manifest(path: &Path, lines: &[HashLine]) -> Result<(), CopyError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    for line in lines {
        writer.write_all(render_line(line).as_bytes())?;
    }
    writer.flush()?;
    Ok(())
}

/// Parse one non-blank, already-trimmed manifest line into (digest, path).
///
/// Splits on the first run of whitespace, not a fixed byte offset -- lines
/// with fewer than two fields are rejected rather than guessed at.
pub fn parse_line(line: &str) -> Option<(String, PathBuf)> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let digest = parts.next()?;
    let rest = parts.next()?.trim_start();
    if digest.is_empty() || rest.is_empty() {
        return None;
    }
    Some((digest.to_string(), PathBuf::from(rest)))
}

/// Parse an entire manifest file's contents into (digest, path) pairs.
/// Lines with fewer than two fields are silently skipped. Returns
/// `CopyError::EmptyManifest` if zero entries survive.
pub fn parse_manifest(path: &Path, contents: &str) -> Result<Vec<(String, PathBuf)>, CopyError> {
    let mut entries = Vec::new();
    for (lineno, raw) in contents.lines().enumerate() {
        if raw.trim().is_empty() {
            continue;
        }
        match parse_line(raw) {
            Some(entry) => entries.push(entry),
            None => warn!(line = lineno + 1, "skipping malformed manifest line"),
        }
    }
    if entries.is_empty() {
        return Err(CopyError::EmptyManifest {
            path: path.to_path_buf(),
        });
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_line_uses_two_spaces() {
        let line = HashLine {
            digest: "f572d396fae9206628714fb2ce00f72e94f2258".to_string(),
            dest: PathBuf::from("out/a.txt"),
        };
        assert_eq!(
            render_line(&line),
            "f572d396fae9206628714fb2ce00f72e94f2258  out/a.txt\n"
        );
    }

    #[test]
    fn render_line_matches_manifest_format_regex() {
        let line = HashLine {
            digest: "a".repeat(40),
            dest: PathBuf::from("some/path.bin"),
        };
        let rendered = render_line(&line);
        assert!(rendered.starts_with(&"a".repeat(40)));
        assert!(rendered.contains("  "));
        assert!(rendered.ends_with('\n'));
    }

    #[test]
    fn parse_line_splits_on_two_spaces() {
        let (digest, path) = parse_line("f572d396fae9206628714fb2ce00f72e94f2258  out/a.txt").unwrap();
        assert_eq!(digest, "f572d396fae9206628714fb2ce00f72e94f2258");
        assert_eq!(path, PathBuf::from("out/a.txt"));
    }

    #[test]
    fn parse_line_splits_on_single_space_without_off_by_one() {
        // Intentionally not reproducing the substring(idx+2) bug: a single
        // space must still parse the path correctly, not drop its first byte.
        let (digest, path) = parse_line("aaaa out/b.bin").unwrap();
        assert_eq!(digest, "aaaa");
        assert_eq!(path, PathBuf::from("out/b.bin"));
    }

    #[test]
    fn parse_line_rejects_single_field() {
        assert!(parse_line("justonefield").is_none());
    }

    #[test]
    fn parse_line_rejects_blank() {
        assert!(parse_line("   ").is_none());
    }

    #[test]
    fn parse_line_trims_path_whitespace() {
        let (_, path) = parse_line("aaaa   out/c.dat   ").unwrap();
        assert_eq!(path, PathBuf::from("out/c.dat"));
    }

    #[test]
    fn parse_manifest_skips_malformed_and_blank_lines() {
        let contents = "f572d396fae9206628714fb2ce00f72e94f2258  out/a.txt\n\n\
garbage\n\
a02a05b025b928c039cf1ae7e8ee04e7c190c0db  out/b.bin\n";
        let entries = parse_manifest(Path::new("hashes.sha1"), contents).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].1, PathBuf::from("out/a.txt"));
        assert_eq!(entries[1].1, PathBuf::from("out/b.bin"));
    }

    #[test]
    fn parse_manifest_empty_is_hard_error() {
        let result = parse_manifest(Path::new("hashes.sha1"), "\n\n   \n");
        assert!(matches!(result, Err(CopyError::EmptyManifest { .. })));
    }

    #[test]
    fn parse_manifest_all_malformed_is_hard_error() {
        let result = parse_manifest(Path::new("hashes.sha1"), "nope\nalsonope\n");
        assert!(matches!(result, Err(CopyError::EmptyManifest { .. })));
    }

    #[test]
    fn render_then_parse_round_trips() {
        let lines = vec![
            HashLine { digest: "b".repeat(40), dest: PathBuf::from("out/x") },
            HashLine { digest: "c".repeat(40), dest: PathBuf::from("out/y z") },
        ];
        let rendered: String = lines.iter().map(render_line).collect();
        let parsed = parse_manifest(Path::new("m"), &rendered).unwrap();
        assert_eq!(parsed[0], (lines[0].digest.clone(), lines[0].dest.clone()));
        assert_eq!(parsed[1], (lines[1].digest.clone(), lines[1].dest.clone()));
    }

    #[test]
    fn write_manifest_truncates_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hashes.sha1");
        std::fs::write(&path, "stale content that should be gone\n").unwrap();

        write_manifest(&path, &[]).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "");
    }

    #[test]
    fn write_manifest_writes_all_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hashes.sha1");
        let lines = vec![HashLine {
            digest: "f572d396fae9206628714fb2ce00f72e94f2258".to_string(),
            dest: PathBuf::from("out/a.txt"),
        }];
        write_manifest(&path, &lines).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "f572d396fae9206628714fb2ce00f72e94f2258  out/a.txt\n"
        );
    }
}
