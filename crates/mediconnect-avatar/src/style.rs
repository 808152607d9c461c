//! Parametric avatar styles chosen by the text model.

use serde::Deserialize;
use url::Url;

use mediconnect_core::AvatarStyle;

/// Styles the parametric avatar service is asked for. Anything else in a
/// model reply is rejected.
pub const STYLES: &[&str] = &[
    "avataaars",
    "personas",
    "micah",
    "lorelei",
    "notionists",
    "adventurer",
    "big-smile",
    "open-peeps",
];

const DEFAULT_BACKGROUND: &str = "b6e3f4";

#[derive(Debug, Deserialize)]
struct StyleReply {
    style: Option<String>,
    seed: Option<serde_json::Value>,
    #[serde(alias = "color", alias = "backgroundColor")]
    background_color: Option<String>,
}

/// Prompt asking the model to pick a style for a free-text description.
pub fn style_prompt(name: &str, description: &str) -> String {
    format!(
        "You design cartoon profile avatars for a doctor directory.\n\
         Doctor: {name}\n\
         Description: {description}\n\n\
         Pick the avatar style that best matches the description from this list: {styles}.\n\
         Reply with JSON only, in this exact format:\n\
         {{\"style\": \"<style>\", \"seed\": \"<short word>\", \"background_color\": \"<6-digit hex>\"}}",
        name = name.trim(),
        description = description.trim(),
        styles = STYLES.join(", "),
    )
}

/// Parse a model reply into an [`AvatarStyle`].
///
/// The style must come from [`STYLES`]. A missing seed falls back to
/// `fallback_seed`; a missing or malformed color falls back to a default.
pub fn parse_style_reply(reply: &str, fallback_seed: &str) -> Result<AvatarStyle, String> {
    let json = extract_json_object(reply).ok_or_else(|| "reply has no JSON object".to_string())?;
    let parsed: StyleReply =
        serde_json::from_str(json).map_err(|e| format!("malformed style JSON: {}", e))?;

    let style = parsed
        .style
        .map(|s| s.trim().to_lowercase())
        .filter(|s| STYLES.contains(&s.as_str()))
        .ok_or_else(|| "style outside the known vocabulary".to_string())?;

    let seed = match parsed.seed {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => fallback_seed.trim().to_string(),
    };

    let background_color = parsed
        .background_color
        .as_deref()
        .and_then(normalize_hex)
        .unwrap_or_else(|| DEFAULT_BACKGROUND.to_string());

    Ok(AvatarStyle {
        style,
        seed,
        background_color,
    })
}

/// Build the parametric avatar URL for a style.
pub fn style_url(base_url: &str, style: &AvatarStyle) -> Result<String, url::ParseError> {
    let mut url = Url::parse(&format!(
        "{}/{}/svg",
        base_url.trim_end_matches('/'),
        style.style
    ))?;
    url.query_pairs_mut()
        .append_pair("seed", &style.seed)
        .append_pair("backgroundColor", &style.background_color);
    Ok(url.into())
}

/// Slice from the first `{` to the last `}`, which tolerates code fences
/// and chatter around the object.
pub(crate) fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn normalize_hex(raw: &str) -> Option<String> {
    let hex = raw.trim().trim_start_matches('#');
    (hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit())).then(|| hex.to_lowercase())
}
