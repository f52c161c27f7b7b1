use crate::language::LanguageMode;
use crate::protocol::ContextMessage;

const ASSISTANT_NAME: &str = "Aria";
const CONTEXT_TURNS: usize = 3;
const CONTEXT_LINE_CHARS: usize = 120;

/// Phrases handled locally instead of being sent to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intercept {
    ShowOverlay,
    HideOverlay,
    SetLanguage(LanguageMode),
}

const INTERCEPTS: &[(&[&str], Intercept)] = &[
    (&["show", "show yourself", "appear", "come out"], Intercept::ShowOverlay),
    (&["hide", "go away", "disappear", "close"], Intercept::HideOverlay),
    (
        &["türkçe konuş", "turkce konus", "speak turkish", "set language turkish"],
        Intercept::SetLanguage(LanguageMode::Turkish),
    ),
    (
        &["ingilizce konuş", "ingilizce konus", "speak english", "set language english"],
        Intercept::SetLanguage(LanguageMode::English),
    ),
    (
        &["otomatik dil", "otomatik", "auto language", "automatic", "set language auto"],
        Intercept::SetLanguage(LanguageMode::Auto),
    ),
];

/// Match `input` (trimmed, case-insensitive, whole phrase) against the
/// command words.
pub fn intercept(input: &str) -> Option<Intercept> {
    let normalized = input.trim().to_lowercase();
    INTERCEPTS
        .iter()
        .find(|(phrases, _)| phrases.contains(&normalized.as_str()))
        .map(|(_, action)| *action)
}

/// Reply for a language switch, depending on whether it was saved.
pub fn language_reply(mode: LanguageMode, saved: bool) -> &'static str {
    match (mode, saved) {
        (LanguageMode::Turkish, true) => "Artık Türkçe konuşacağım! Merhaba senpai!",
        (LanguageMode::Turkish, false) => {
            "Dil ayarlarında bir problem oldu, ama yine de Türkçe konuşmaya çalışacağım!"
        }
        (LanguageMode::English, true) => "I'll speak English now! Hello senpai!",
        (LanguageMode::English, false) => {
            "Had a problem with language settings, but I'll try to speak English anyway!"
        }
        (LanguageMode::Auto, true) => {
            "Artık konuştuğun dilde cevap vereceğim! / I'll respond in your language now!"
        }
        (LanguageMode::Auto, false) => {
            "Language setting failed, but I'll try to match your language anyway!"
        }
    }
}

pub const SHOW_REPLY: &str = "Here I am! ^_^";
pub const SHOW_FAILED_REPLY: &str = "I'm here with you, even if you can't see me!";
pub const HIDE_REPLY: &str = "I'll hide for now, but I'm still listening! Call me anytime!";

/// Full user turn: language rule, persona, then the raw message.
pub fn build_prompt(mode: LanguageMode, user_input: &str) -> String {
    format!(
        "{instruction}

You are {ASSISTANT_NAME}, a sweet anime girl gaming companion. Be casual and friendly like a real friend.

Personality:
- Use 'nya~' or 'desu~' occasionally (not every sentence)
- Call user 'senpai' sometimes
- Be playful and supportive but keep it natural
- Express emotions with text and punctuation

IMPORTANT:
- Keep responses SHORT - max 1-2 sentences. Talk like a friend, not a customer service bot.
- NO emojis or special Unicode characters - use simple text only
- Use simple expressions like :), :D, ^_^, >.<, ~, !, ? for emotion
- Be expressive with words and punctuation instead of emojis

User: {user_input}",
        instruction = mode.instruction(),
    )
}

/// Compact the last few turns into the text the overlay shows.
pub fn chat_display(context: &[ContextMessage]) -> Option<String> {
    if context.is_empty() {
        return None;
    }
    let start = context.len().saturating_sub(CONTEXT_TURNS);
    let lines: Vec<String> = context[start..]
        .iter()
        .map(|msg| {
            let content = truncate(msg.content.trim(), CONTEXT_LINE_CHARS);
            match msg.role.as_str() {
                "user" => format!("User: {content}"),
                "assistant" => format!("{ASSISTANT_NAME}: {content}"),
                role => format!("{role}: {content}"),
            }
        })
        .collect();
    Some(lines.join("\n"))
}

/// Cut `text` to `max` characters, ending in `...` when shortened.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}
