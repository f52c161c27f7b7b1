use std::time::{Duration, Instant};

/// Characters that attach to the previous chunk without a space.
const TIGHT_LEADERS: &[char] = &['!', '?', '.', ',', '~', '^', '_'];

/// Collects the chunks of one streamed answer until it is complete.
///
/// Every push restarts a short completion deadline; the answer is flushed
/// when the completion tag is seen or the deadline passes, whichever comes
/// first.
pub struct ResponseAccumulator {
    chunks: Vec<String>,
    deadline: Option<Instant>,
    settle: Duration,
}

impl ResponseAccumulator {
    pub fn new(settle: Duration) -> Self {
        Self { chunks: Vec::new(), deadline: None, settle }
    }

    pub fn push(&mut self, chunk: String, now: Instant) {
        self.chunks.push(chunk);
        self.deadline = Some(now + self.settle);
    }

    /// Flush on an explicit completion marker.
    pub fn complete(&mut self) -> Option<String> {
        self.flush()
    }

    /// Flush if the completion deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        match self.deadline {
            Some(deadline) if now >= deadline => self.flush(),
            _ => None,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    fn flush(&mut self) -> Option<String> {
        self.deadline = None;
        if self.chunks.is_empty() {
            return None;
        }
        let text = join_chunks(&self.chunks);
        self.chunks.clear();
        Some(text)
    }
}

/// Join chunks with a single space, except where the next chunk starts with
/// punctuation or whitespace, or the text so far already ends in a space.
pub fn join_chunks(chunks: &[String]) -> String {
    let mut joined = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        let tight = i == 0
            || chunk.starts_with(TIGHT_LEADERS)
            || chunk.starts_with(' ')
            || joined.ends_with(' ');
        if !tight {
            joined.push(' ');
        }
        joined.push_str(chunk);
    }
    joined.trim().to_string()
}
