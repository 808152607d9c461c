//! Domain types shared across the MediConnect crates.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Doctor records
// =============================================================================

/// A persisted doctor entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoctorRecord {
    /// Server-assigned, unique and stable identifier.
    pub id: i64,
    pub full_name: String,
    pub specialty: String,
    pub city: String,
    pub address: String,
    /// Rating on a 0 to 5 scale.
    pub rating: f64,
    /// Consultation fee, non-negative.
    pub fees: f64,
    pub phone: String,
}

/// The user-supplied fields of a doctor entry (everything except `id`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewDoctor {
    pub full_name: String,
    pub specialty: String,
    pub city: String,
    pub address: String,
    pub rating: f64,
    pub fees: f64,
    pub phone: String,
}

impl DoctorRecord {
    /// Combine stored fields with an assigned id.
    pub fn from_fields(id: i64, fields: NewDoctor) -> Self {
        Self {
            id,
            full_name: fields.full_name,
            specialty: fields.specialty,
            city: fields.city,
            address: fields.address,
            rating: fields.rating,
            fees: fields.fees,
            phone: fields.phone,
        }
    }

    /// The editable fields of this record.
    pub fn fields(&self) -> NewDoctor {
        NewDoctor {
            full_name: self.full_name.clone(),
            specialty: self.specialty.clone(),
            city: self.city.clone(),
            address: self.address.clone(),
            rating: self.rating,
            fees: self.fees,
            phone: self.phone.clone(),
        }
    }
}

/// Aggregate view of the directory used to ground model prompts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectorySummary {
    pub total: u64,
    pub specialties: Vec<String>,
    pub cities: Vec<String>,
}

// =============================================================================
// Search filter
// =============================================================================

/// Optional predicates for the recommendation and AI search paths.
///
/// Every field is independent; an absent field imposes no constraint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilter {
    /// Case-insensitive substring of the specialty.
    pub specialty: Option<String>,
    /// Case-insensitive substring of the city.
    pub city: Option<String>,
    /// Upper bound (inclusive) on fees.
    pub max_fees: Option<f64>,
    /// Lower bound (inclusive) on rating.
    pub min_rating: Option<f64>,
}

impl SearchFilter {
    /// Drop values that carry no constraint: blank strings and
    /// zero, negative or non-finite numbers.
    pub fn normalized(self) -> Self {
        fn text(v: Option<String>) -> Option<String> {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        }
        fn number(v: Option<f64>) -> Option<f64> {
            v.filter(|n| n.is_finite() && *n > 0.0)
        }
        Self {
            specialty: text(self.specialty),
            city: text(self.city),
            max_fees: number(self.max_fees),
            min_rating: number(self.min_rating),
        }
    }

    /// True when no field constrains the result.
    pub fn is_empty(&self) -> bool {
        self.specialty.is_none()
            && self.city.is_none()
            && self.max_fees.is_none()
            && self.min_rating.is_none()
    }
}

// =============================================================================
// Conversation
// =============================================================================

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "User"),
            Role::Assistant => write!(f, "Assistant"),
        }
    }
}

/// One message in a chat session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Opaque identity of a chat session, supplied by the HTTP layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a session id from its string form; `None` for anything invalid.
    pub fn parse(value: &str) -> Option<Self> {
        Uuid::parse_str(value.trim()).ok().map(Self)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The model's reply, reduced to one of the two legal shapes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ActionDescriptor {
    /// Conversational reply shown verbatim.
    Chat { message: String },
    /// Database search request.
    Search {
        #[serde(flatten)]
        filter: SearchFilter,
        message: Option<String>,
    },
}

impl ActionDescriptor {
    /// The message carried by the descriptor, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            ActionDescriptor::Chat { message } => Some(message),
            ActionDescriptor::Search { message, .. } => message.as_deref(),
        }
    }

    pub fn is_search(&self) -> bool {
        matches!(self, ActionDescriptor::Search { .. })
    }
}

// =============================================================================
// Avatars
// =============================================================================

/// How an avatar reference was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvatarMethod {
    /// Image synthesized by the image-generation service.
    GeneratedImage,
    /// Parametric avatar whose style was chosen by the text model.
    AiStyle,
    /// Sample image picked after the text model classified the doctor.
    ClassifiedSample,
    /// Sample image picked by hashing the name and description.
    HashedSample,
    /// Remote initials placeholder.
    Placeholder,
}

impl AvatarMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AvatarMethod::GeneratedImage => "generated_image",
            AvatarMethod::AiStyle => "ai_style",
            AvatarMethod::ClassifiedSample => "classified_sample",
            AvatarMethod::HashedSample => "hashed_sample",
            AvatarMethod::Placeholder => "placeholder",
        }
    }
}

impl fmt::Display for AvatarMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of a parametric avatar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvatarStyle {
    pub style: String,
    pub seed: String,
    pub background_color: String,
}

/// A usable image reference plus how it was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvatarResult {
    /// URL, site-relative path, or `data:` URI.
    pub url: String,
    pub method: AvatarMethod,
    /// Present only for [`AvatarMethod::AiStyle`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<AvatarStyle>,
}

impl AvatarResult {
    pub fn new(url: impl Into<String>, method: AvatarMethod) -> Self {
        Self {
            url: url.into(),
            method,
            style: None,
        }
    }
}
