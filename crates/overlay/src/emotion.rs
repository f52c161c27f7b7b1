/// Expression shown by the avatar. Values are cells of the 5x2 sprite sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emotion {
    Idle,
    Happy,
    Angry,
    Greeting,
    Sad,
    Speaking,
}

impl Emotion {
    pub fn frame(self) -> usize {
        match self {
            Self::Idle => 0,
            Self::Happy => 1,
            Self::Angry => 2,
            Self::Greeting => 3,
            Self::Sad => 4,
            Self::Speaking => 9,
        }
    }
}

/// Evaluated top to bottom; the first row with any keyword in the text wins.
/// Keywords are plain substrings, so "hated" and "winning" count too.
const RULES: &[(&[&str], Emotion)] = &[
    (&["angry", "mad", "pissed", "furious", "rage", "hate"], Emotion::Angry),
    (&["sad", "sorry", "upset", "disappointed", "depressed", "cry"], Emotion::Sad),
    (&["hello", "hi", "hey", "greetings", "good morning"], Emotion::Greeting),
    (&["happy", "great", "awesome", "love", "amazing", "win"], Emotion::Happy),
    (&["response chunk"], Emotion::Speaking),
];

/// Pick the expression for a slice of recent log text.
pub fn classify(text: &str) -> Emotion {
    let text = text.to_lowercase();
    RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| text.contains(k)))
        .map(|(_, emotion)| *emotion)
        .unwrap_or(Emotion::Idle)
}
