//! Chat turn orchestration.
//!
//! One turn: validate, load history, interpret, optionally query the store
//! and render cards, then append the exchange to history. A failed model
//! call or query yields an apology reply and leaves the history untouched.

use std::sync::Arc;

use tracing::{debug, info, warn};

use mediconnect_core::config::ChatConfig;
use mediconnect_core::{ActionDescriptor, ConversationTurn, SessionId};
use mediconnect_storage::DoctorStore;

use crate::error::ChatError;
use crate::history::ConversationHistory;
use crate::interpreter::QueryInterpreter;
use crate::render::{escape_html, ResultRenderer};
use crate::session::SessionStore;

pub const UNAVAILABLE_MESSAGE: &str = "AI service unavailable. Please configure a Gemini API key.";

pub const DEFAULT_SEARCH_INTRO: &str = "Here are the doctors I found:";

/// How a reply was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Chat,
    Search { results: usize },
    Unavailable,
    Apology,
}

/// Bot reply for one turn. `html` is ready to embed in the chat page.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub html: String,
    pub kind: ReplyKind,
}

pub struct ChatService {
    interpreter: Option<QueryInterpreter>,
    store: Arc<dyn DoctorStore>,
    sessions: Arc<dyn SessionStore>,
    renderer: ResultRenderer,
    config: ChatConfig,
}

impl ChatService {
    /// `interpreter` is `None` when no text model is configured.
    pub fn new(
        interpreter: Option<QueryInterpreter>,
        store: Arc<dyn DoctorStore>,
        sessions: Arc<dyn SessionStore>,
        renderer: ResultRenderer,
        config: ChatConfig,
    ) -> Self {
        Self {
            interpreter,
            store,
            sessions,
            renderer,
            config,
        }
    }

    pub fn is_available(&self) -> bool {
        self.interpreter.is_some()
    }

    /// Stored history of a session (empty for unknown sessions).
    pub fn history(&self, session: &SessionId) -> Result<ConversationHistory, ChatError> {
        let turns = self.sessions.get(session)?.unwrap_or_default();
        Ok(ConversationHistory::from_turns(
            turns,
            self.config.history_turns,
        ))
    }

    /// Handle one user message.
    ///
    /// Only input validation and session-store failures are returned as
    /// errors; every other outcome is a reply.
    pub async fn handle_turn(
        &self,
        session: &SessionId,
        message: &str,
    ) -> Result<ChatReply, ChatError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if message.chars().count() > self.config.max_message_length {
            return Err(ChatError::MessageTooLong(self.config.max_message_length));
        }

        let Some(interpreter) = self.interpreter.as_ref() else {
            debug!("Chat turn without a text model");
            return Ok(ChatReply {
                html: UNAVAILABLE_MESSAGE.to_string(),
                kind: ReplyKind::Unavailable,
            });
        };

        let history = self.history(session)?;
        let summary = match self.store.summary() {
            Ok(summary) => Some(summary),
            Err(e) => {
                warn!(error = %e, "Directory summary unavailable, prompting without it");
                None
            }
        };

        let interpretation = match interpreter
            .interpret(
                message,
                history.context_window(self.config.context_turns),
                summary.as_ref(),
            )
            .await
        {
            Ok(interpretation) => interpretation,
            Err(e) => return Ok(apology(&e)),
        };

        let reply = match &interpretation.action {
            ActionDescriptor::Search {
                filter,
                message: intro,
            } => {
                let records = match self
                    .store
                    .filter(filter, Some(self.config.ai_result_limit))
                {
                    Ok(records) => records,
                    Err(e) => return Ok(apology(&ChatError::from(e))),
                };
                info!(results = records.len(), "Chat search");
                let intro = intro.as_deref().unwrap_or(DEFAULT_SEARCH_INTRO);
                let cards = self.renderer.render(&records).await;
                ChatReply {
                    html: format!(
                        "<div style='margin-bottom: 12px;'>{}</div>{}",
                        escape_html(intro),
                        cards
                    ),
                    kind: ReplyKind::Search {
                        results: records.len(),
                    },
                }
            }
            ActionDescriptor::Chat { message: text } => ChatReply {
                html: escape_html(text),
                kind: ReplyKind::Chat,
            },
        };

        let history = history.append(
            ConversationTurn::user(message),
            ConversationTurn::assistant(interpretation.history_text()),
        );
        if let Err(e) = self.sessions.set(session, history.into_turns()) {
            warn!(error = %e, "Failed to persist chat history");
        }

        Ok(reply)
    }
}

fn apology(err: &ChatError) -> ChatReply {
    warn!(error = %err, "Chat turn failed");
    ChatReply {
        html: escape_html(&format!("Sorry, I encountered an error: {}", err)),
        kind: ReplyKind::Apology,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use mediconnect_avatar::AvatarResolver;
    use mediconnect_core::config::AvatarConfig;
    use mediconnect_core::{NewDoctor, Role};
    use mediconnect_llm::mock::{FailingTextGenerator, ScriptedTextGenerator};
    use mediconnect_llm::TextGenerator;
    use mediconnect_storage::{Database, DoctorRepository};

    use crate::session::InMemorySessionStore;

    const CARDIOLOGIST_REPLY: &str = r#"{"action": "search", "specialty": "cardiologist", "city": "Chicago", "max_fees": 200, "min_rating": null, "message": "Searching for affordable cardiologists in Chicago..."}"#;

    struct Fixture {
        service: ChatService,
        sessions: Arc<InMemorySessionStore>,
        store: Arc<DoctorRepository>,
    }

    fn doctor(name: &str, specialty: &str, city: &str, rating: f64, fees: f64) -> NewDoctor {
        NewDoctor {
            full_name: name.to_string(),
            specialty: specialty.to_string(),
            city: city.to_string(),
            rating,
            fees,
            ..NewDoctor::default()
        }
    }

    fn fixture(generator: Option<Arc<dyn TextGenerator>>) -> Fixture {
        fixture_with(generator, ChatConfig::default())
    }

    fn fixture_with(generator: Option<Arc<dyn TextGenerator>>, config: ChatConfig) -> Fixture {
        let db = Arc::new(Database::in_memory().unwrap());
        let store = Arc::new(DoctorRepository::new(db));
        store
            .create(&doctor("Dr. Ada", "Cardiologist", "Chicago", 4.8, 180.0))
            .unwrap();
        store
            .create(&doctor("Dr. Ben", "Cardiologist", "Chicago", 4.9, 250.0))
            .unwrap();
        store
            .create(&doctor("Dr. Cy", "Cardiologist", "Chicago", 4.2, 120.0))
            .unwrap();
        store
            .create(&doctor("Dr. Dee", "Dermatologist", "Boston", 4.7, 90.0))
            .unwrap();

        let sessions = Arc::new(InMemorySessionStore::new());
        let renderer = ResultRenderer::new(Arc::new(AvatarResolver::new(AvatarConfig::default())));
        let interpreter = generator.map(|g| QueryInterpreter::new(g, Duration::from_secs(5)));
        let service = ChatService::new(
            interpreter,
            store.clone(),
            sessions.clone(),
            renderer,
            config,
        );
        Fixture {
            service,
            sessions,
            store,
        }
    }

    #[tokio::test]
    async fn test_search_turn_renders_ranked_cards() {
        let fx = fixture(Some(Arc::new(ScriptedTextGenerator::new([CARDIOLOGIST_REPLY]))));
        let session = SessionId::new();
        let reply = fx
            .service
            .handle_turn(&session, "Find me a cardiologist in Chicago under $200")
            .await
            .unwrap();

        assert_eq!(reply.kind, ReplyKind::Search { results: 2 });
        assert!(reply.html.starts_with(
            "<div style='margin-bottom: 12px;'>Searching for affordable cardiologists in Chicago...</div>"
        ));
        let ada = reply.html.find("Dr. Ada").unwrap();
        let cy = reply.html.find("Dr. Cy").unwrap();
        assert!(ada < cy);
        assert!(!reply.html.contains("Dr. Ben"));

        let history = fx.service.history(&session).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history.turns()[0].role, Role::User);
        assert_eq!(
            history.turns()[1].content,
            "Searching for affordable cardiologists in Chicago..."
        );
    }

    #[tokio::test]
    async fn test_search_without_message_uses_default_intro() {
        let fx = fixture(Some(Arc::new(ScriptedTextGenerator::new([
            r#"{"action":"search","specialty":"pediatrician"}"#,
        ]))));
        let reply = fx
            .service
            .handle_turn(&SessionId::new(), "any pediatricians?")
            .await
            .unwrap();
        assert_eq!(reply.kind, ReplyKind::Search { results: 0 });
        assert!(reply.html.contains(DEFAULT_SEARCH_INTRO));
        assert!(reply.html.contains("No doctors found matching your criteria"));
    }

    #[tokio::test]
    async fn test_ai_search_is_capped() {
        let fx = fixture(Some(Arc::new(ScriptedTextGenerator::new([
            r#"{"action":"search","message":"All doctors"}"#,
        ]))));
        for i in 0..12 {
            fx.store
                .create(&doctor(&format!("Dr. Extra {}", i), "GP", "Denver", 3.0, 50.0))
                .unwrap();
        }
        let reply = fx
            .service
            .handle_turn(&SessionId::new(), "show everyone")
            .await
            .unwrap();
        assert_eq!(reply.kind, ReplyKind::Search { results: 10 });
    }

    #[tokio::test]
    async fn test_prose_reply_is_chat() {
        let prose = "Hello! How can I help you find a doctor today?";
        let fx = fixture(Some(Arc::new(ScriptedTextGenerator::new([prose]))));
        let session = SessionId::new();
        let reply = fx.service.handle_turn(&session, "hi").await.unwrap();
        assert_eq!(reply.kind, ReplyKind::Chat);
        assert_eq!(reply.html, escape_html(prose));
        assert_eq!(fx.service.history(&session).unwrap().turns()[1].content, prose);
    }

    #[tokio::test]
    async fn test_unavailable_without_model() {
        let fx = fixture(None);
        let session = SessionId::new();
        let reply = fx.service.handle_turn(&session, "hi").await.unwrap();
        assert_eq!(reply.kind, ReplyKind::Unavailable);
        assert_eq!(reply.html, UNAVAILABLE_MESSAGE);
        assert!(!fx.service.is_available());
        assert!(fx.sessions.get(&session).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_model_failure_apologizes_and_keeps_history() {
        let fx = fixture(Some(Arc::new(FailingTextGenerator::new())));
        let session = SessionId::new();
        fx.sessions
            .set(&session, vec![ConversationTurn::user("earlier")])
            .unwrap();

        let reply = fx.service.handle_turn(&session, "hi").await.unwrap();
        assert_eq!(reply.kind, ReplyKind::Apology);
        assert!(reply.html.starts_with("Sorry, I encountered an error: "));
        assert!(reply.html.contains("service unavailable"));

        let turns = fx.sessions.get(&session).unwrap().unwrap();
        assert_eq!(turns, vec![ConversationTurn::user("earlier")]);
    }

    #[tokio::test]
    async fn test_history_window_and_cap_across_turns() {
        let generator = Arc::new(ScriptedTextGenerator::always(
            r#"{"action":"chat","message":"ok"}"#,
        ));
        let fx = fixture(Some(generator.clone()));
        let session = SessionId::new();
        for i in 1..=11 {
            fx.service
                .handle_turn(&session, &format!("message {}", i))
                .await
                .unwrap();
        }

        let history = fx.service.history(&session).unwrap();
        assert_eq!(history.len(), 20);
        assert_eq!(history.turns()[0].content, "message 2");

        // The 11th prompt carries turns from exchanges 8 to 10 only.
        let last_prompt = generator.prompts().pop().unwrap();
        assert!(last_prompt.contains("User: message 8\n"));
        assert!(!last_prompt.contains("User: message 7\n"));
        assert!(last_prompt.ends_with("User: message 11\nAssistant:"));
    }

    #[tokio::test]
    async fn test_input_validation() {
        let fx = fixture(Some(Arc::new(ScriptedTextGenerator::always("x"))));
        let session = SessionId::new();
        assert!(matches!(
            fx.service.handle_turn(&session, "   ").await,
            Err(ChatError::EmptyMessage)
        ));
        let long = "a".repeat(2001);
        assert!(matches!(
            fx.service.handle_turn(&session, &long).await,
            Err(ChatError::MessageTooLong(2000))
        ));
    }

    #[tokio::test]
    async fn test_context_turns_setting_sizes_the_prompt() {
        let generator = Arc::new(ScriptedTextGenerator::always(
            r#"{"action":"chat","message":"ok"}"#,
        ));
        let config = ChatConfig {
            context_turns: 2,
            ..ChatConfig::default()
        };
        let fx = fixture_with(Some(generator.clone()), config);
        let session = SessionId::new();
        for i in 1..=4 {
            fx.service
                .handle_turn(&session, &format!("message {}", i))
                .await
                .unwrap();
        }

        let last_prompt = generator.prompts().pop().unwrap();
        assert!(last_prompt.contains("\n\nConversation:\nUser: message 3\nAssistant: ok\nUser: message 4\n"));
        assert!(!last_prompt.contains("User: message 2\n"));
        assert_eq!(fx.service.history(&session).unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_empty_chat_message_is_recorded() {
        let fx = fixture(Some(Arc::new(ScriptedTextGenerator::new([
            r#"{"action":"chat","message":""}"#,
        ]))));
        let session = SessionId::new();
        let reply = fx.service.handle_turn(&session, "hi").await.unwrap();
        assert_eq!(reply.kind, ReplyKind::Chat);
        assert_eq!(reply.html, "");
        assert_eq!(fx.service.history(&session).unwrap().turns()[1].content, "");
    }
}
