use std::path::PathBuf;
use std::time::{Instant, SystemTime};

use channel::{parse_signals, read_snapshot, LogSignal, Paths};
use tracing::{info, warn};

use crate::accumulator::ResponseAccumulator;
use crate::bubble::{BubbleKind, SpeechBubble};
use crate::config::OverlayConfig;
use crate::emotion::{classify, Emotion};
use crate::liveness::{self, Liveness};
use crate::tail::{recent_lines, LogTail};

/// Log lines scanned for emotion keywords.
const EMOTION_WINDOW: usize = 10;

/// Outcome of one pass of the overlay timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Keep running; `repaint` is set when something visible changed.
    Running { repaint: bool },
    /// The plugin is gone; close the window.
    Exit(Liveness),
}

/// Everything the overlay window shows, driven by polling the shared files.
pub struct OverlayState {
    log_file: PathBuf,
    chat_context: PathBuf,
    tail: LogTail,
    last_context: String,
    accumulator: ResponseAccumulator,
    bubble: SpeechBubble,
    emotion: Emotion,
    config: OverlayConfig,
    next_emotion_poll: Instant,
    next_liveness_poll: Instant,
}

impl OverlayState {
    pub fn new(paths: &Paths, config: OverlayConfig, now: Instant) -> Self {
        Self {
            log_file: paths.log_file.clone(),
            chat_context: paths.chat_context.clone(),
            tail: LogTail::at_end(&paths.log_file),
            last_context: String::new(),
            accumulator: ResponseAccumulator::new(config.completion()),
            bubble: SpeechBubble::new(config.speech(), config.context()),
            emotion: Emotion::Idle,
            next_emotion_poll: now,
            next_liveness_poll: now + config.liveness_interval(),
            config,
        }
    }

    pub fn emotion(&self) -> Emotion {
        self.emotion
    }

    pub fn bubble_text(&self) -> Option<&str> {
        self.bubble.text()
    }

    /// Run whichever timers are due at `now`.
    pub fn step(&mut self, now: Instant, wall: SystemTime) -> Step {
        let mut repaint = false;

        if now >= self.next_liveness_poll {
            self.next_liveness_poll = now + self.config.liveness_interval();
            let status = self.poll_liveness(wall);
            if status.should_exit() {
                return Step::Exit(status);
            }
        }
        if now >= self.next_emotion_poll {
            self.next_emotion_poll = now + self.config.emotion_interval();
            repaint |= self.poll_emotion(now);
        }
        repaint |= self.tick(now);

        Step::Running { repaint }
    }

    /// Earliest instant at which `step` has something to do.
    pub fn next_wakeup(&self) -> Instant {
        [
            Some(self.next_emotion_poll),
            Some(self.next_liveness_poll),
            self.accumulator.deadline(),
            self.bubble.hide_at(),
        ]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(self.next_emotion_poll)
    }

    /// Read new log output and the chat context, then re-derive the emotion.
    /// Returns true if anything visible changed.
    pub fn poll_emotion(&mut self, now: Instant) -> bool {
        if !self.log_file.exists() {
            return false;
        }
        let mut changed = self.check_context(now);
        changed |= self.follow_log(now);

        match recent_lines(&self.log_file, EMOTION_WINDOW) {
            Ok(lines) => {
                let emotion = classify(&lines.join("\n"));
                if emotion != self.emotion {
                    self.emotion = emotion;
                    changed = true;
                }
            }
            Err(e) => warn!("Cannot read {}: {e}", self.log_file.display()),
        }
        changed
    }

    pub fn poll_liveness(&self, wall: SystemTime) -> Liveness {
        let status = liveness::check(&self.log_file, wall, self.config.stale_after());
        match status {
            Liveness::Alive => {}
            Liveness::Stale(age) => info!("Plugin log idle for {}s, closing overlay", age.as_secs()),
            Liveness::Missing => info!("Plugin log not found, closing overlay"),
        }
        status
    }

    /// Flush an answer whose completion deadline passed and hide an expired
    /// bubble.
    pub fn tick(&mut self, now: Instant) -> bool {
        let mut changed = false;
        if let Some(text) = self.accumulator.poll(now) {
            self.bubble.show(&text, BubbleKind::Speech, now);
            changed = true;
        }
        changed |= self.bubble.expire(now);
        changed
    }

    fn follow_log(&mut self, now: Instant) -> bool {
        let delta = match self.tail.read_new() {
            Ok(delta) => delta,
            Err(e) => {
                warn!("Cannot tail {}: {e}", self.log_file.display());
                return false;
            }
        };

        let mut changed = false;
        for signal in parse_signals(&delta) {
            match signal {
                LogSignal::Chunk(chunk) => self.accumulator.push(chunk, now),
                LogSignal::Completed => {
                    if let Some(text) = self.accumulator.complete() {
                        self.bubble.show(&text, BubbleKind::Speech, now);
                        changed = true;
                    }
                }
            }
        }
        changed
    }

    fn check_context(&mut self, now: Instant) -> bool {
        let Some(context) = read_snapshot(&self.chat_context) else {
            return false;
        };
        if context == self.last_context {
            return false;
        }
        self.last_context = context;
        if self.last_context.is_empty() {
            return false;
        }
        self.bubble.show(&self.last_context, BubbleKind::Context, now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::Path;
    use std::time::Duration;

    fn append(path: &Path, text: &str) {
        let mut file = std::fs::OpenOptions::new().create(true).append(true).open(path).unwrap();
        file.write_all(text.as_bytes()).unwrap();
    }

    fn setup() -> (tempfile::TempDir, Paths) {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::rooted(dir.path());
        append(&paths.log_file, "INFO plugin: Plugin started\n");
        (dir, paths)
    }

    #[test]
    fn streamed_answer_becomes_one_bubble() {
        let (_dir, paths) = setup();
        let now = Instant::now();
        let mut state = OverlayState::new(&paths, OverlayConfig::default(), now);

        append(
            &paths.log_file,
            "INFO plugin::session: Response chunk: Hello\n\
             INFO plugin::session: Response chunk: !\n\
             INFO plugin::session: Response chunk: How are you\n",
        );
        assert!(state.poll_emotion(now));
        assert_eq!(state.emotion(), Emotion::Greeting);
        assert_eq!(state.bubble_text(), None);

        append(&paths.log_file, "INFO plugin::session: Response completed successfully\n");
        state.poll_emotion(now);
        assert_eq!(state.bubble_text(), Some("Hello! How are you"));
    }

    #[test]
    fn quiet_stream_flushes_after_deadline() {
        let (_dir, paths) = setup();
        let now = Instant::now();
        let mut state = OverlayState::new(&paths, OverlayConfig::default(), now);

        append(&paths.log_file, "INFO Response chunk: Still thinking\n");
        state.poll_emotion(now);
        assert!(!state.tick(now + Duration::from_millis(100)));
        assert!(state.tick(now + Duration::from_millis(300)));
        assert_eq!(state.bubble_text(), Some("Still thinking"));

        assert!(state.tick(now + Duration::from_millis(300) + Duration::from_secs(15)));
        assert_eq!(state.bubble_text(), None);
    }

    #[test]
    fn earlier_log_content_is_not_replayed() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::rooted(dir.path());
        append(&paths.log_file, "INFO Response chunk: old answer\nINFO Response completed successfully\n");

        let now = Instant::now();
        let mut state = OverlayState::new(&paths, OverlayConfig::default(), now);
        state.poll_emotion(now);
        assert_eq!(state.bubble_text(), None);
    }

    #[test]
    fn context_change_shows_once() {
        let (_dir, paths) = setup();
        let now = Instant::now();
        let mut state = OverlayState::new(&paths, OverlayConfig::default(), now);

        std::fs::write(&paths.chat_context, "User: what now?\n").unwrap();
        assert!(state.poll_emotion(now));
        assert_eq!(state.bubble_text(), Some("User: what now?"));

        assert!(state.tick(now + Duration::from_secs(8)));
        assert!(!state.poll_emotion(now + Duration::from_secs(9)));
        assert_eq!(state.bubble_text(), None);
    }

    #[test]
    fn anger_wins_over_happiness() {
        let (_dir, paths) = setup();
        let now = Instant::now();
        let mut state = OverlayState::new(&paths, OverlayConfig::default(), now);

        append(&paths.log_file, "INFO Response chunk: I love it\nINFO Response chunk: but I hate the boss\n");
        state.poll_emotion(now);
        assert_eq!(state.emotion(), Emotion::Angry);
        assert_eq!(state.emotion().frame(), 2);
    }

    #[test]
    fn stale_log_exits_on_next_liveness_poll() {
        let (_dir, paths) = setup();
        let now = Instant::now();
        let mut state = OverlayState::new(&paths, OverlayConfig::default(), now);
        let stale_wall = SystemTime::now() + Duration::from_secs(200);

        // Not due yet.
        assert_eq!(state.step(now, stale_wall), Step::Running { repaint: false });
        let due = now + Duration::from_secs(5);
        assert!(matches!(state.step(due, stale_wall), Step::Exit(Liveness::Stale(_))));
    }

    #[test]
    fn missing_log_exits() {
        let (_dir, paths) = setup();
        let now = Instant::now();
        let state = OverlayState::new(&paths, OverlayConfig::default(), now);

        std::fs::remove_file(&paths.log_file).unwrap();
        assert_eq!(state.poll_liveness(SystemTime::now()), Liveness::Missing);
    }

    #[test]
    fn wakeup_tracks_nearest_deadline() {
        let (_dir, paths) = setup();
        let now = Instant::now();
        let mut state = OverlayState::new(&paths, OverlayConfig::default(), now);
        state.step(now, SystemTime::now());
        assert_eq!(state.next_wakeup(), now + Duration::from_secs(1));

        append(&paths.log_file, "INFO Response chunk: hm\n");
        let later = now + Duration::from_secs(1);
        state.step(later, SystemTime::now());
        assert_eq!(state.next_wakeup(), later + Duration::from_millis(300));
    }
}
