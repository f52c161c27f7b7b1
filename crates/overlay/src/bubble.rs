use std::time::{Duration, Instant};

pub const MAX_CHARS: usize = 300;
pub const PADDING: f32 = 20.0;
pub const MIN_HEIGHT: f32 = 60.0;
pub const MAX_HEIGHT: f32 = 250.0;

/// What triggered the bubble; decides how long it stays up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BubbleKind {
    /// A finished answer from the model.
    Speech,
    /// The conversation snapshot changed.
    Context,
}

/// The speech bubble above the avatar.
pub struct SpeechBubble {
    text: String,
    hide_at: Option<Instant>,
    speech_for: Duration,
    context_for: Duration,
}

impl SpeechBubble {
    pub fn new(speech_for: Duration, context_for: Duration) -> Self {
        Self { text: String::new(), hide_at: None, speech_for, context_for }
    }

    pub fn show(&mut self, text: &str, kind: BubbleKind, now: Instant) {
        self.text = truncate(text.trim(), MAX_CHARS);
        let visible_for = match kind {
            BubbleKind::Speech => self.speech_for,
            BubbleKind::Context => self.context_for,
        };
        self.hide_at = Some(now + visible_for);
    }

    /// Hide the bubble once its time is up. Returns true if it just hid.
    pub fn expire(&mut self, now: Instant) -> bool {
        match self.hide_at {
            Some(at) if now >= at => {
                self.hide_at = None;
                true
            }
            _ => false,
        }
    }

    /// Visible text, if any.
    pub fn text(&self) -> Option<&str> {
        (self.hide_at.is_some() && !self.text.is_empty()).then_some(self.text.as_str())
    }

    pub fn hide_at(&self) -> Option<Instant> {
        self.hide_at
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max - 3).collect();
    format!("{kept}...")
}

/// Box width for a message of `chars` characters.
pub fn box_width(chars: usize) -> f32 {
    match chars {
        0..=29 => 300.0,
        30..=59 => 400.0,
        60..=119 => 480.0,
        _ => 520.0,
    }
}

/// Box height for wrapped text, clamped to the allowed range.
pub fn box_height(lines: usize, line_height: f32) -> f32 {
    (lines as f32 * line_height + PADDING * 2.0).clamp(MIN_HEIGHT, MAX_HEIGHT)
}

/// Greedy word wrap. `measure` returns the rendered width of a string.
/// A single word wider than `max_width` gets a line of its own.
pub fn wrap_words(text: &str, max_width: f32, measure: impl Fn(&str) -> f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if measure(&candidate) > max_width {
            if current.is_empty() {
                lines.push(word.to_string());
            } else {
                lines.push(std::mem::replace(&mut current, word.to_string()));
            }
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
