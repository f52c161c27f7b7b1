/// Logged by the plugin before every streamed chunk it forwards.
pub const CHUNK_TAG: &str = "Response chunk:";
/// Logged by the plugin once a stream has been fully forwarded.
pub const COMPLETION_TAG: &str = "Response completed successfully";

/// A load-bearing event recovered from a slice of the plugin log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSignal {
    Chunk(String),
    Completed,
}

/// Scan `text` line by line for chunk and completion tags.
///
/// Both tags match case-insensitively. Chunk text is everything after the tag,
/// trimmed; tagged lines with no text are dropped.
pub fn parse_signals(text: &str) -> Vec<LogSignal> {
    let chunk_tag = CHUNK_TAG.to_ascii_lowercase();
    let completion_tag = COMPLETION_TAG.to_ascii_lowercase();

    let mut signals = Vec::new();
    for line in text.lines() {
        // ASCII lowercasing keeps byte offsets aligned with `line`.
        let lower = line.to_ascii_lowercase();
        if let Some(pos) = lower.find(&chunk_tag) {
            let chunk = line[pos + chunk_tag.len()..].trim();
            if !chunk.is_empty() {
                signals.push(LogSignal::Chunk(chunk.to_string()));
            }
        } else if lower.contains(&completion_tag) {
            signals.push(LogSignal::Completed);
        }
    }
    signals
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_chunks_and_completion_in_order() {
        let log = "\
2025-01-01 10:00:00 INFO plugin::session: Response chunk: Hello senpai
2025-01-01 10:00:00 INFO plugin::session: Response chunk: ! How are you?
2025-01-01 10:00:01 INFO plugin::session: Response completed successfully
";
        assert_eq!(
            parse_signals(log),
            vec![
                LogSignal::Chunk("Hello senpai".into()),
                LogSignal::Chunk("! How are you?".into()),
                LogSignal::Completed,
            ]
        );
    }

    #[test]
    fn tags_match_case_insensitively() {
        let log = "RESPONSE CHUNK: loud\nresponse COMPLETED successfully\n";
        assert_eq!(
            parse_signals(log),
            vec![LogSignal::Chunk("loud".into()), LogSignal::Completed]
        );
    }

    #[test]
    fn ignores_untagged_and_empty_chunk_lines() {
        let log = "Received input: hi\nResponse chunk:   \nsomething else\n";
        assert!(parse_signals(log).is_empty());
    }

    #[test]
    fn keeps_non_ascii_chunk_text_intact() {
        let log = "İNFO Response chunk: Merhaba, nasılsın?\n";
        assert_eq!(
            parse_signals(log),
            vec![LogSignal::Chunk("Merhaba, nasılsın?".into())]
        );
    }
}
