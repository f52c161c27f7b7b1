use std::io::Write;

use channel::{Paths, CHUNK_TAG, COMPLETION_TAG};
use serde_json::Value;
use tracing::{debug, error, info};

use crate::bridge::write_response;
use crate::config::{ApiConfig, Config};
use crate::credentials::{find_api_key, API_KEY_URL};
use crate::gemini::{ChatBackend, ChatError, GeminiClient};
use crate::language;
use crate::persona::{self, Intercept};
use crate::protocol::{ContextMessage, Response};
use crate::supervisor::OverlayControl;

/// Parameter keys that may carry the user's message, in priority order.
const INPUT_KEYS: &[&str] = &["message", "input", "text", "query", "prompt"];

pub type BackendFactory =
    Box<dyn Fn(&str, &ApiConfig) -> Result<Box<dyn ChatBackend>, ChatError>>;

/// Everything a command needs, scoped to one bridge run.
pub struct Session {
    paths: Paths,
    config: Config,
    backend: Option<Box<dyn ChatBackend>>,
    overlay: Box<dyn OverlayControl>,
    connect: BackendFactory,
}

impl Session {
    pub fn new(paths: Paths, config: Config, overlay: Box<dyn OverlayControl>) -> Self {
        Self {
            paths,
            config,
            backend: None,
            overlay,
            connect: Box::new(|key: &str, api: &ApiConfig| {
                GeminiClient::new(key, api).map(|c| Box::new(c) as Box<dyn ChatBackend>)
            }),
        }
    }

    /// Replace how a backend is built from an API key.
    pub fn with_backend_factory(mut self, connect: BackendFactory) -> Self {
        self.connect = connect;
        self
    }

    /// Resolve the API key and build the chat client. Always succeeds so the
    /// host keeps the plugin loaded; chat reports the configuration problem.
    pub fn initialize(&mut self) -> Response {
        info!("Initializing Aria plugin");
        self.backend = None;

        let key = match find_api_key(&self.paths.api_key) {
            Ok(key) => key,
            Err(e) => {
                error!("API key initialization failed: {e}");
                return Response::success();
            }
        };

        match (self.connect)(&key, &self.config.api) {
            Ok(backend) => {
                info!("Successfully configured Gemini API for Aria");
                self.backend = Some(backend);
            }
            Err(e) => error!("Gemini API configuration failed: {e}"),
        }
        Response::success()
    }

    pub fn shutdown(&mut self) -> Response {
        info!("Aria plugin shutdown - overlay will close once the log goes quiet");
        Response::success()
    }

    /// Answer one chat message, streaming chunks to `writer` as they arrive.
    pub fn chat(
        &mut self,
        params: Option<&Value>,
        context: &[ContextMessage],
        system_info: Option<&Value>,
        writer: &mut dyn Write,
    ) -> Response {
        info!("Starting chat request");
        debug!("params: {params:?}, context turns: {}, system_info: {system_info:?}", context.len());

        let user_input = match extract_input(params, context) {
            Ok(input) => input,
            Err(response) => return response,
        };
        info!("User input: {}", persona::truncate(&user_input, 50));

        if let Some(action) = persona::intercept(&user_input) {
            return self.run_intercept(action, writer);
        }

        if self.backend.is_none() {
            info!("Auto-initializing...");
            self.initialize();
        }
        if self.backend.is_none() {
            return match find_api_key(&self.paths.api_key) {
                Err(e) => Response::failure(format!("Gemini API not configured: {e}")),
                Ok(_) => Response::failure(
                    "Gemini API client not initialized. Please check your API key configuration.",
                ),
            };
        }

        self.overlay.show();
        self.externalize_context(context);

        let mode = language::read_mode(&self.paths.language_config);
        info!("Using language mode: {mode}");
        let prompt = persona::build_prompt(mode, &user_input);

        let Some(backend) = self.backend.as_deref() else {
            return Response::failure("Gemini API client not initialized.");
        };
        let result = backend.stream_chat(mode.instruction(), &prompt, &mut |chunk: &str| {
            if chunk.is_empty() {
                return;
            }
            // One log line per chunk; the overlay reads these back.
            info!("{CHUNK_TAG} {}", chunk.replace(['\r', '\n'], " "));
            write_response(writer, &Response::message(chunk));
        });

        match result {
            Ok(()) => {
                info!("{COMPLETION_TAG}");
                Response::success()
            }
            Err(ChatError::Client(e)) => {
                error!("Client not properly initialized: {e}");
                Response::failure(format!(
                    "Gemini API client error. Please verify your API key is valid and from: {API_KEY_URL}"
                ))
            }
            Err(ChatError::Remote(e)) => {
                error!("Gemini API error: {e}");
                Response::failure(format!(
                    "Gemini API error: {e}. Verify your API key at: {API_KEY_URL}"
                ))
            }
        }
    }

    fn run_intercept(&mut self, action: Intercept, writer: &mut dyn Write) -> Response {
        info!("Handling command word: {action:?}");
        let reply = match action {
            Intercept::ShowOverlay => {
                if self.overlay.show() {
                    persona::SHOW_REPLY
                } else {
                    persona::SHOW_FAILED_REPLY
                }
            }
            Intercept::HideOverlay => {
                self.overlay.hide();
                persona::HIDE_REPLY
            }
            Intercept::SetLanguage(mode) => {
                let saved = match language::write_mode(&self.paths.language_config, mode) {
                    Ok(()) => true,
                    Err(e) => {
                        error!("Error saving language config: {e}");
                        false
                    }
                };
                persona::language_reply(mode, saved)
            }
        };
        write_response(writer, &Response::message(reply));
        Response::success()
    }

    fn externalize_context(&self, context: &[ContextMessage]) {
        let Some(snapshot) = persona::chat_display(context) else {
            info!("No context provided, continuing with direct message");
            return;
        };
        match channel::write_snapshot(&self.paths.chat_context, &snapshot) {
            Ok(()) => info!("Chat context saved: {}", persona::truncate(&snapshot, 50)),
            Err(e) => error!("Error saving chat context: {e}"),
        }
    }
}

/// Find the user's message: plain-string params, a recognized params key,
/// the first params value, then the last context turn.
fn extract_input(params: Option<&Value>, context: &[ContextMessage]) -> Result<String, Response> {
    let mut input = match params {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Object(map)) => {
            let keyed = INPUT_KEYS
                .iter()
                .find_map(|key| map.get(*key))
                .map(value_text)
                .unwrap_or_default();
            if keyed.is_empty() {
                map.values().next().map(value_text).unwrap_or_default()
            } else {
                keyed
            }
        }
        _ => String::new(),
    };

    if input.is_empty() {
        if let Some(last) = context.last() {
            info!("Used context fallback");
            input = last.content.clone();
        }
    }

    if input.is_empty() {
        error!("No message found. Params: {params:?}, Context: {context:?}");
        return Err(Response::failure(
            "No message provided. Check aria_plugin.log for the received request.",
        ));
    }
    if input.trim().is_empty() {
        error!("Empty user message");
        return Err(Response::failure("Empty user message"));
    }
    Ok(input)
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[derive(Clone)]
    pub(crate) struct FakeBackend {
        chunks: Vec<String>,
        error: Option<fn(String) -> ChatError>,
        pub calls: Rc<Cell<usize>>,
        pub last_system: Rc<RefCell<Option<String>>>,
        pub last_prompt: Rc<RefCell<Option<String>>>,
    }

    impl FakeBackend {
        pub fn new(chunks: &[&str]) -> Self {
            Self {
                chunks: chunks.iter().map(|c| c.to_string()).collect(),
                error: None,
                calls: Rc::default(),
                last_system: Rc::default(),
                last_prompt: Rc::default(),
            }
        }

        fn failing(chunks: &[&str], error: fn(String) -> ChatError) -> Self {
            Self { error: Some(error), ..Self::new(chunks) }
        }
    }

    impl ChatBackend for FakeBackend {
        fn stream_chat(
            &self,
            system_instruction: &str,
            prompt: &str,
            on_chunk: &mut dyn FnMut(&str),
        ) -> Result<(), ChatError> {
            self.calls.set(self.calls.get() + 1);
            *self.last_system.borrow_mut() = Some(system_instruction.to_string());
            *self.last_prompt.borrow_mut() = Some(prompt.to_string());
            for chunk in &self.chunks {
                on_chunk(chunk);
            }
            match self.error {
                Some(make) => Err(make("quota exceeded".into())),
                None => Ok(()),
            }
        }
    }

    #[derive(Default)]
    struct FakeOverlay {
        shows: Rc<Cell<usize>>,
        hides: Rc<Cell<usize>>,
    }

    impl OverlayControl for FakeOverlay {
        fn show(&mut self) -> bool {
            self.shows.set(self.shows.get() + 1);
            true
        }

        fn hide(&mut self) -> bool {
            self.hides.set(self.hides.get() + 1);
            true
        }
    }

    struct Harness {
        session: Session,
        dir: tempfile::TempDir,
        shows: Rc<Cell<usize>>,
        hides: Rc<Cell<usize>>,
        connects: Rc<Cell<usize>>,
    }

    fn harness(backend: FakeBackend, key: Option<&str>) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::rooted(dir.path());
        if let Some(key) = key {
            std::fs::write(&paths.api_key, key).unwrap();
        }

        let overlay = FakeOverlay::default();
        let (shows, hides) = (overlay.shows.clone(), overlay.hides.clone());
        let connects = Rc::new(Cell::new(0));
        let counter = connects.clone();

        let session = Session::new(paths, Config::default(), Box::new(overlay))
            .with_backend_factory(Box::new(move |_: &str, _: &ApiConfig| {
                counter.set(counter.get() + 1);
                Ok(Box::new(backend.clone()) as Box<dyn ChatBackend>)
            }));
        Harness { session, dir, shows, hides, connects }
    }

    /// Session with a valid key whose backend is `backend`.
    pub(crate) fn fake_session(backend: FakeBackend) -> (Session, tempfile::TempDir) {
        let h = harness(backend, Some("AIza-test-key"));
        (h.session, h.dir)
    }

    fn chat(session: &mut Session, params: Value, context: &[ContextMessage]) -> (Response, Vec<Response>) {
        let mut out = Vec::new();
        let response = session.chat(Some(&params), context, None, &mut out);
        let text = String::from_utf8(out).unwrap();
        let messages = text
            .split(crate::protocol::END_MARKER)
            .filter(|s| !s.is_empty())
            .map(|s| {
                let v: Value = serde_json::from_str(s).unwrap();
                Response::message(v["message"].as_str().unwrap())
            })
            .collect();
        (response, messages)
    }

    #[test]
    fn show_yourself_never_calls_the_model() {
        let backend = FakeBackend::new(&["should not stream"]);
        let calls = backend.calls.clone();
        // No key on disk: the command word must still work.
        let mut h = harness(backend, None);

        let (response, messages) = chat(&mut h.session, json!({"message": "Show yourself"}), &[]);

        assert_eq!(response, Response::success());
        assert_eq!(messages, vec![Response::message(persona::SHOW_REPLY)]);
        assert_eq!(calls.get(), 0);
        assert_eq!(h.shows.get(), 1);
        assert_eq!(h.connects.get(), 0);
    }

    #[test]
    fn hide_word_hides_overlay() {
        let mut h = harness(FakeBackend::new(&[]), Some("key"));
        let (response, messages) = chat(&mut h.session, json!("go away"), &[]);
        assert!(response.is_success());
        assert_eq!(messages, vec![Response::message(persona::HIDE_REPLY)]);
        assert_eq!(h.hides.get(), 1);
    }

    #[test]
    fn language_switch_persists_and_applies_to_next_chat() {
        let backend = FakeBackend::new(&["Merhaba!"]);
        let last_system = backend.last_system.clone();
        let mut h = harness(backend, Some("key"));

        let (response, messages) = chat(&mut h.session, json!({"message": "speak turkish"}), &[]);
        assert!(response.is_success());
        assert_eq!(messages.len(), 1);
        let config = std::fs::read_to_string(h.dir.path().join("aria_language.config")).unwrap();
        assert_eq!(config, "turkish");

        chat(&mut h.session, json!({"message": "how are you"}), &[]);
        assert_eq!(
            last_system.borrow().as_deref(),
            Some(language::LanguageMode::Turkish.instruction())
        );
    }

    #[test]
    fn streams_chunks_in_order_then_succeeds() {
        let backend = FakeBackend::new(&["Hi", "", " senpai", "~"]);
        let prompt = backend.last_prompt.clone();
        let (mut session, _dir) = fake_session(backend);

        let (response, messages) = chat(&mut session, json!({"query": "hello"}), &[]);

        assert_eq!(response, Response::success());
        assert_eq!(
            messages,
            vec![Response::message("Hi"), Response::message(" senpai"), Response::message("~")]
        );
        assert!(prompt.borrow().as_deref().unwrap().ends_with("User: hello"));
    }

    #[test]
    fn missing_key_reports_configuration_error() {
        let backend = FakeBackend::new(&[]);
        let calls = backend.calls.clone();
        let mut h = harness(backend, None);

        assert_eq!(h.session.initialize(), Response::success());
        let (response, messages) = chat(&mut h.session, json!({"message": "hello"}), &[]);

        assert!(messages.is_empty());
        assert_eq!(response.success, Some(false));
        let message = response.message.unwrap();
        assert!(message.starts_with("Gemini API not configured: No API key file found"));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn placeholder_key_has_its_own_message() {
        let mut h = harness(FakeBackend::new(&[]), Some("YOUR_GEMINI_API_KEY_HERE"));
        let (response, _) = chat(&mut h.session, json!({"message": "hello"}), &[]);
        assert!(response.message.unwrap().contains("empty or contains placeholder"));
    }

    #[test]
    fn backend_is_built_lazily_once() {
        let mut h = harness(FakeBackend::new(&["ok"]), Some("key"));
        chat(&mut h.session, json!({"message": "one"}), &[]);
        chat(&mut h.session, json!({"message": "two"}), &[]);
        assert_eq!(h.connects.get(), 1);
    }

    #[test]
    fn client_and_remote_errors_are_reported_once() {
        let (mut session, _dir) = fake_session(FakeBackend::failing(&[], ChatError::Client));
        let (response, _) = chat(&mut session, json!({"message": "hi"}), &[]);
        assert!(response.message.unwrap().starts_with("Gemini API client error."));

        let backend = FakeBackend::failing(&["partial"], ChatError::Remote);
        let calls = backend.calls.clone();
        let (mut session, _dir) = fake_session(backend);
        let (response, messages) = chat(&mut session, json!({"message": "hi"}), &[]);
        assert_eq!(messages, vec![Response::message("partial")]);
        assert_eq!(response.success, Some(false));
        let message = response.message.unwrap();
        assert!(message.starts_with("Gemini API error: quota exceeded."));
        assert!(message.contains(API_KEY_URL));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn context_is_written_for_the_overlay() {
        let mut h = harness(FakeBackend::new(&["sure"]), Some("key"));
        let context = vec![
            ContextMessage { role: "user".into(), content: "hello".into() },
            ContextMessage { role: "assistant".into(), content: "hi senpai".into() },
            ContextMessage { role: "user".into(), content: "tell me a joke".into() },
        ];
        let (response, _) = chat(&mut h.session, json!({}), &context);
        assert!(response.is_success());

        let snapshot = channel::read_snapshot(&h.dir.path().join("aria_chat_context.txt"));
        assert_eq!(
            snapshot.as_deref(),
            Some("User: hello\nAria: hi senpai\nUser: tell me a joke")
        );
        assert_eq!(h.shows.get(), 1);
    }

    #[test]
    fn input_extraction_priority() {
        let ctx = vec![ContextMessage { role: "user".into(), content: "from context".into() }];

        assert_eq!(extract_input(Some(&json!("plain")), &ctx).unwrap(), "plain");
        assert_eq!(
            extract_input(Some(&json!({"other": "first", "prompt": "keyed"})), &ctx).unwrap(),
            "keyed"
        );
        assert_eq!(
            extract_input(Some(&json!({"zeta": "first value", "text": ""})), &ctx).unwrap(),
            "first value"
        );
        // An empty first value is not skipped; the context turn is used instead.
        assert_eq!(
            extract_input(Some(&json!({"text": "", "zeta": "later value"})), &ctx).unwrap(),
            "from context"
        );
        assert_eq!(extract_input(Some(&json!({"n": 7})), &ctx).unwrap(), "7");
        assert_eq!(extract_input(None, &ctx).unwrap(), "from context");
    }

    #[test]
    fn empty_input_fails_without_calling_model() {
        let backend = FakeBackend::new(&["x"]);
        let calls = backend.calls.clone();
        let (mut session, _dir) = fake_session(backend);

        let (response, _) = chat(&mut session, json!({}), &[]);
        assert!(response.message.unwrap().starts_with("No message provided"));

        let (response, _) = chat(&mut session, json!({"message": "   "}), &[]);
        assert_eq!(response, Response::failure("Empty user message"));
        assert_eq!(calls.get(), 0);
    }
}
