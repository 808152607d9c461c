//! Natural-language query interpretation.
//!
//! Builds a prompt from fixed instructions, a directory summary and the
//! trailing conversation, calls the text model, and reduces its reply to an
//! [`ActionDescriptor`]. Replies that are not a JSON object degrade to a
//! chat descriptor carrying the raw text.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use mediconnect_core::{ActionDescriptor, ConversationTurn, DirectorySummary, SearchFilter};
use mediconnect_llm::{with_timeout, TextGenerator};

use crate::error::ChatError;

pub const SYSTEM_PROMPT: &str = r#"You are an AI medical assistant for MediConnect, a doctor finder platform.

Your capabilities:
1. Help users find doctors by understanding natural language queries
2. Search the database when users ask for doctor recommendations
3. Provide friendly, helpful medical guidance (not medical advice)

When users ask to find doctors, you should:
- Extract: specialty, city, max fees, min rating from their query
- Respond in JSON format for database search
- After showing results, continue natural conversation

Response Formats:

1. FOR DOCTOR SEARCH (when user asks to find/search/show doctors):
Respond ONLY with valid JSON:
{
    "action": "search",
    "specialty": "pediatrician" or null,
    "city": "New York" or null,
    "max_fees": 200 or null,
    "min_rating": 4.5 or null,
    "message": "Looking for pediatricians in New York..."
}

2. FOR REGULAR CONVERSATION:
{
    "action": "chat",
    "message": "Your friendly response here"
}

Examples:
User: "Find me a cardiologist in Chicago under $200"
You: {"action": "search", "specialty": "cardiologist", "city": "Chicago", "max_fees": 200, "min_rating": null, "message": "Searching for affordable cardiologists in Chicago..."}

User: "What's the difference between a dermatologist and a pediatrician?"
You: {"action": "chat", "message": "A dermatologist specializes in skin conditions, while a pediatrician focuses on children's health. Would you like me to find either one for you?"}

User: "Show me top rated surgeons"
You: {"action": "search", "specialty": "surgeon", "city": null, "max_fees": null, "min_rating": 4.5, "message": "Finding top-rated surgeons for you..."}

IMPORTANT:
- Always respond with valid JSON only
- Never include markdown, code blocks, or extra text
- Be conversational but concise
- Encourage users to search for doctors when appropriate
"#;

/// A parsed model reply plus the raw text it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Interpretation {
    pub action: ActionDescriptor,
    pub raw: String,
}

impl Interpretation {
    /// Text recorded as the assistant turn: the descriptor's message, or
    /// the raw reply when it has none.
    pub fn history_text(&self) -> &str {
        self.action.message().unwrap_or(&self.raw)
    }
}

/// Sends user input to the text model and interprets the reply.
pub struct QueryInterpreter {
    generator: Arc<dyn TextGenerator>,
    timeout: Duration,
}

impl QueryInterpreter {
    pub fn new(generator: Arc<dyn TextGenerator>, timeout: Duration) -> Self {
        Self { generator, timeout }
    }

    /// Interpret one user message against the trailing conversation.
    ///
    /// `window` is sent as given; the caller picks how many turns it holds.
    /// A malformed reply is not an error; failures of the model call are.
    pub async fn interpret(
        &self,
        input: &str,
        window: &[ConversationTurn],
        summary: Option<&DirectorySummary>,
    ) -> Result<Interpretation, ChatError> {
        let prompt = build_prompt(summary, window, input);
        let raw = with_timeout(self.timeout, self.generator.generate(&prompt)).await?;
        let action = parse_reply(&raw);
        debug!(search = action.is_search(), "Interpreted chat reply");
        Ok(Interpretation { action, raw })
    }
}

/// The one-line directory summary appended to the system instructions.
pub fn summary_line(summary: &DirectorySummary) -> String {
    format!(
        "\nDatabase: {} doctors. Specialties: {}. Cities: {}.",
        summary.total,
        summary.specialties.join(", "),
        summary.cities.join(", ")
    )
}

/// Assemble the full prompt. `window` is sent verbatim as `Role: content`
/// lines.
pub fn build_prompt(
    summary: Option<&DirectorySummary>,
    window: &[ConversationTurn],
    input: &str,
) -> String {
    let mut prompt = String::from(SYSTEM_PROMPT);
    if let Some(summary) = summary {
        prompt.push_str(&summary_line(summary));
    }
    prompt.push_str("\n\nConversation:\n");
    for turn in window {
        prompt.push_str(&format!("{}: {}\n", turn.role, turn.content));
    }
    prompt.push_str(&format!("User: {}\nAssistant:", input));
    prompt
}

/// Reduce a raw model reply to an action descriptor. Never fails.
pub fn parse_reply(raw: &str) -> ActionDescriptor {
    let cleaned = strip_code_fence(raw);
    let object = match serde_json::from_str::<Value>(cleaned) {
        Ok(Value::Object(object)) => object,
        Ok(_) => {
            debug!("Model reply is JSON but not an object, treating as chat");
            return chat_fallback(raw);
        }
        Err(e) => {
            warn!(error = %e, "Model reply is not valid JSON, treating as chat");
            return chat_fallback(raw);
        }
    };

    let is_search = object
        .get("action")
        .and_then(Value::as_str)
        .map(|a| a == "search")
        .unwrap_or(false);

    if is_search {
        let filter = SearchFilter {
            specialty: text_field(&object, "specialty"),
            city: text_field(&object, "city"),
            max_fees: number_field(&object, "max_fees"),
            min_rating: number_field(&object, "min_rating"),
        }
        .normalized();
        ActionDescriptor::Search {
            filter,
            message: text_field(&object, "message"),
        }
    } else {
        // An empty chat message is kept as the reply.
        let message = match object.get("message").and_then(Value::as_str) {
            Some(message) => message.to_string(),
            None => raw.to_string(),
        };
        ActionDescriptor::Chat { message }
    }
}

/// Strip a leading ```json or bare ``` fence and everything after the
/// closing fence.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = match rest.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => &rest[4..],
        _ => rest,
    };
    let body = match rest.find("```") {
        Some(end) => &rest[..end],
        None => rest,
    };
    body.trim()
}

fn chat_fallback(raw: &str) -> ActionDescriptor {
    ActionDescriptor::Chat {
        message: raw.to_string(),
    }
}

fn text_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Numbers or numeric strings such as "$200"; anything else is absent.
fn number_field(object: &Map<String, Value>, key: &str) -> Option<f64> {
    match object.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s
            .trim()
            .trim_start_matches('$')
            .trim()
            .replace(',', "")
            .parse::<f64>()
            .ok(),
        _ => None,
    }
}
