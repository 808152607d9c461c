//! HTML fragments for chat search results.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::warn;

use mediconnect_avatar::{AvatarRequest, AvatarResolver};
use mediconnect_core::DoctorRecord;

pub const NO_RESULTS_HTML: &str =
    "<p>No doctors found matching your criteria. Try adjusting your search!</p>";

/// Renders matched records as doctor cards, one avatar resolution per card.
#[derive(Clone)]
pub struct ResultRenderer {
    avatars: Arc<AvatarResolver>,
}

impl ResultRenderer {
    pub fn new(avatars: Arc<AvatarResolver>) -> Self {
        Self { avatars }
    }

    /// Render `records` in order. An empty slice yields the no-results
    /// fragment.
    pub async fn render(&self, records: &[DoctorRecord]) -> String {
        if records.is_empty() {
            return NO_RESULTS_HTML.to_string();
        }

        let mut tasks = JoinSet::new();
        for (index, record) in records.iter().enumerate() {
            let avatars = Arc::clone(&self.avatars);
            let request = AvatarRequest::new(record.full_name.clone());
            tasks.spawn(async move { (index, avatars.resolve(&request).await.url) });
        }

        let mut urls: Vec<Option<String>> = vec![None; records.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, url)) => urls[index] = Some(url),
                Err(e) => warn!(error = %e, "avatar task failed"),
            }
        }

        records
            .iter()
            .zip(urls)
            .map(|(record, url)| {
                let url = url.unwrap_or_else(|| {
                    self.avatars
                        .resolve_offline(&record.full_name, &record.specialty)
                        .url
                });
                render_card(record, &url)
            })
            .collect()
    }
}

/// One doctor card.
pub fn render_card(record: &DoctorRecord, avatar_url: &str) -> String {
    format!(
        r#"
<div class="doctor-result">
    <img src="{avatar}" alt="{name}" class="result-avatar">
    <div class="result-info">
        <div class="result-name">{name}</div>
        <div class="result-specialty">{specialty}</div>
        <div class="result-details">
            <div class="result-detail">📍 {city}</div>
            <div class="result-detail">⭐ {rating}</div>
            <div class="result-detail">💵 ${fees}</div>
        </div>
        <a class="result-link" href="/profile/{id}/">View Profile →</a>
    </div>
</div>
"#,
        avatar = escape_html(avatar_url),
        name = escape_html(&record.full_name),
        specialty = escape_html(&record.specialty),
        city = escape_html(&record.city),
        rating = format_decimal(record.rating),
        fees = format_decimal(record.fees),
        id = record.id,
    )
}

/// Escape text for safe inclusion in HTML content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Up to two decimals, without trailing zeros: 4.5, 150, 99.99.
pub fn format_decimal(value: f64) -> String {
    let fixed = format!("{:.2}", value);
    fixed
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}
