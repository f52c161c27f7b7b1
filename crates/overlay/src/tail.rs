use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Follows an append-only file by byte offset.
pub struct LogTail {
    path: PathBuf,
    offset: u64,
}

impl LogTail {
    /// Start at the current end of `path`, so only later writes are seen.
    pub fn at_end(path: &Path) -> Self {
        let offset = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        Self { path: path.to_path_buf(), offset }
    }

    /// Text appended since the last call. Empty when nothing new was written.
    ///
    /// The offset only moves forward: a file that shrinks is ignored until it
    /// grows past the remembered position again.
    pub fn read_new(&mut self) -> io::Result<String> {
        let size = match std::fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(String::new()),
            Err(e) => return Err(e),
        };
        if size <= self.offset {
            return Ok(String::new());
        }

        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(self.offset))?;
        let mut bytes = Vec::with_capacity((size - self.offset) as usize);
        file.take(size - self.offset).read_to_end(&mut bytes)?;
        self.offset += bytes.len() as u64;

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }
}

/// The last `n` lines of the file at `path`.
pub fn recent_lines(path: &Path, n: usize) -> io::Result<Vec<String>> {
    let bytes = std::fs::read(path)?;
    let text = String::from_utf8_lossy(&bytes);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    Ok(lines[start..].iter().map(|l| l.to_string()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn append(path: &Path, text: &str) {
        let mut file = std::fs::OpenOptions::new().create(true).append(true).open(path).unwrap();
        file.write_all(text.as_bytes()).unwrap();
    }

    #[test]
    fn starts_at_end_and_reads_only_deltas() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plugin.log");
        append(&path, "old line\n");

        let mut tail = LogTail::at_end(&path);
        assert_eq!(tail.read_new().unwrap(), "");

        append(&path, "first\n");
        assert_eq!(tail.read_new().unwrap(), "first\n");
        append(&path, "second\nthird\n");
        assert_eq!(tail.read_new().unwrap(), "second\nthird\n");
        assert_eq!(tail.read_new().unwrap(), "");
    }

    #[test]
    fn missing_file_reads_nothing_until_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plugin.log");
        let mut tail = LogTail::at_end(&path);
        assert_eq!(tail.read_new().unwrap(), "");

        append(&path, "hello\n");
        assert_eq!(tail.read_new().unwrap(), "hello\n");
    }

    #[test]
    fn never_rewinds_after_truncation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plugin.log");
        append(&path, "0123456789\n");
        let mut tail = LogTail::at_end(&path);

        std::fs::write(&path, "new\n").unwrap();
        assert_eq!(tail.read_new().unwrap(), "");
        assert_eq!(tail.offset(), 11);
    }

    #[test]
    fn recent_lines_returns_tail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plugin.log");
        let text: String = (1..=15).map(|i| format!("line {i}\n")).collect();
        std::fs::write(&path, text).unwrap();

        let lines = recent_lines(&path, 10).unwrap();
        assert_eq!(lines.len(), 10);
        assert_eq!(lines[0], "line 6");
        assert_eq!(lines[9], "line 15");
    }
}
