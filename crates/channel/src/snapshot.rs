use std::fs;
use std::io;
use std::path::Path;

/// Overwrite the chat-context file with `display`.
pub fn write_snapshot(path: &Path, display: &str) -> io::Result<()> {
    fs::write(path, display)
}

/// Read the chat-context file, trimmed. `None` if it does not exist or
/// cannot be read.
pub fn read_snapshot(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(contents) => Some(contents.trim().to_string()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => {
            tracing::warn!("Cannot read chat context {}: {e}", path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_is_overwritten_wholesale() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ctx.txt");

        write_snapshot(&path, "User: a long first message\nAria: reply").unwrap();
        write_snapshot(&path, "User: short").unwrap();

        assert_eq!(read_snapshot(&path).as_deref(), Some("User: short"));
    }

    #[test]
    fn missing_snapshot_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(read_snapshot(&dir.path().join("absent.txt")), None);
    }
}
