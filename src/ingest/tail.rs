use std::collections::HashMap;
use std::fs;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::SourceError;

/// Incrementally tails line-delimited files, tracking a byte offset per file.
///
/// The first time a file is seen its offset is set to the current end, so
/// history is never replayed. A trailing line without its newline is left
/// unread until a later call finds it completed. A file that shrinks is
/// treated as a new session and re-anchored at its new end.
#[derive(Debug, Default)]
pub struct LineTail {
    positions: HashMap<PathBuf, u64>,
}

impl LineTail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current byte offset for `path`, if it has been seen.
    pub fn position(&self, path: &Path) -> Option<u64> {
        self.positions.get(path).copied()
    }

    /// Stop tracking `path`; seeing it again anchors at its end.
    pub fn forget(&mut self, path: &Path) {
        self.positions.remove(path);
    }

    /// Complete, non-blank lines appended to `path` since the last call.
    pub fn read_new_lines(&mut self, path: &Path) -> Result<Vec<String>, SourceError> {
        let len = fs::metadata(path)?.len();

        let Some(pos) = self.position(path) else {
            // Start at the current end of file so we only get new lines.
            self.positions.insert(path.to_path_buf(), len);
            return Ok(Vec::new());
        };

        if len < pos {
            debug!(path = %path.display(), pos, len, "file shrank, re-anchoring at end");
            self.positions.insert(path.to_path_buf(), len);
            return Ok(Vec::new());
        }
        if len == pos {
            return Ok(Vec::new());
        }

        let file = fs::File::open(path)?;
        let mut reader = BufReader::new(file);
        reader.seek(SeekFrom::Start(pos))?;

        let mut lines = Vec::new();
        let mut consumed = 0u64;
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let n = reader.read_until(b'\n', &mut buf)?;
            if n == 0 || buf.last() != Some(&b'\n') {
                break;
            }
            consumed += n as u64;
            let text = String::from_utf8_lossy(&buf);
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                lines.push(trimmed.to_string());
            }
        }

        self.positions.insert(path.to_path_buf(), pos + consumed);
        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn append(path: &Path, text: &str) {
        let mut f = fs::OpenOptions::new().append(true).create(true).open(path).unwrap();
        f.write_all(text.as_bytes()).unwrap();
    }

    #[test]
    fn first_read_anchors_at_end() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("s.jsonl");
        append(&path, "old-1\nold-2\n");

        let mut tail = LineTail::new();
        assert!(tail.read_new_lines(&path).unwrap().is_empty());
        assert_eq!(tail.position(&path), Some(12));
    }

    #[test]
    fn reads_only_appended_lines() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("s.jsonl");
        append(&path, "old\n");

        let mut tail = LineTail::new();
        tail.read_new_lines(&path).unwrap();
        append(&path, "new-1\n\nnew-2\n");

        assert_eq!(tail.read_new_lines(&path).unwrap(), vec!["new-1", "new-2"]);
        assert!(tail.read_new_lines(&path).unwrap().is_empty());
    }

    #[test]
    fn partial_line_waits_for_newline() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("s.jsonl");
        append(&path, "");

        let mut tail = LineTail::new();
        tail.read_new_lines(&path).unwrap();

        append(&path, "complete\n{\"half\":");
        assert_eq!(tail.read_new_lines(&path).unwrap(), vec!["complete"]);
        let after_first = tail.position(&path).unwrap();
        assert_eq!(after_first, 9);

        append(&path, "true}\n");
        assert_eq!(tail.read_new_lines(&path).unwrap(), vec![r#"{"half":true}"#]);
        assert!(tail.position(&path).unwrap() > after_first);
    }

    #[test]
    fn shrunk_file_re_anchors() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("s.jsonl");
        append(&path, "aaaaaaaaaa\n");

        let mut tail = LineTail::new();
        tail.read_new_lines(&path).unwrap();
        fs::write(&path, "b\n").unwrap();

        assert!(tail.read_new_lines(&path).unwrap().is_empty());
        assert_eq!(tail.position(&path), Some(2));
        append(&path, "c\n");
        assert_eq!(tail.read_new_lines(&path).unwrap(), vec!["c"]);
    }

    #[test]
    fn missing_file_is_an_error_and_not_tracked() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("absent.jsonl");
        let mut tail = LineTail::new();
        assert!(tail.read_new_lines(&path).is_err());
        assert_eq!(tail.position(&path), None);
    }
}
