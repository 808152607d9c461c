//! Server-rendered HTML pages.
//!
//! Every user-supplied value goes through `escape_html`. The only raw HTML
//! inserted is the chatbot reply, which the chat service builds from
//! escaped parts.

use axum::http::StatusCode;

use mediconnect_chat::render::format_decimal;
use mediconnect_chat::escape_html;
use mediconnect_core::DoctorRecord;

use crate::forms::{DoctorForm, FormErrors, RecommendForm};

/// A doctor plus the avatar URL to show next to it.
pub type DoctorEntry = (DoctorRecord, String);

/// One bubble on the chat page.
#[derive(Debug, Clone)]
pub enum ChatBubble {
    /// Plain user text, escaped on render.
    User(String),
    /// Reply HTML from the chat service.
    Bot(String),
}

pub fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} | MediConnect</title>
<link rel="stylesheet" href="/static/style.css">
</head>
<body>
<header>
  <a class="brand" href="/">MediConnect</a>
  <a href="/">Doctors</a>
  <a href="/create/">Add Doctor</a>
  <a href="/recommend/">Recommend</a>
  <a href="/chatbot/">AI Assistant</a>
  <form action="/search/" method="get"><input type="search" name="q" placeholder="Search doctors"><button type="submit">Search</button></form>
</header>
<main>
<h1>{title}</h1>
{body}
</main>
</body>
</html>"#,
        title = escape_html(title),
        body = body,
    )
}

fn doctor_grid(entries: &[DoctorEntry], empty_message: &str) -> String {
    if entries.is_empty() {
        return format!("<p class=\"muted\">{}</p>", escape_html(empty_message));
    }
    let cards: String = entries
        .iter()
        .map(|(doctor, avatar)| {
            format!(
                r#"<div class="card">
  <img src="{avatar}" alt="{name}">
  <div class="name"><a href="/profile/{id}/">{name}</a></div>
  <div class="muted">{specialty} &middot; {city}</div>
  <div>⭐ {rating} &middot; ${fees}</div>
  <div class="actions"><a href="/update/{id}/">Edit</a><a href="/delete/{id}/">Delete</a></div>
</div>"#,
                avatar = escape_html(avatar),
                name = escape_html(&doctor.full_name),
                id = doctor.id,
                specialty = escape_html(&doctor.specialty),
                city = escape_html(&doctor.city),
                rating = format_decimal(doctor.rating),
                fees = format_decimal(doctor.fees),
            )
        })
        .collect();
    format!("<div class=\"grid\">{}</div>", cards)
}

pub fn home_page(entries: &[DoctorEntry]) -> String {
    layout(
        "All Doctors",
        &doctor_grid(entries, "No doctors yet. Add the first one!"),
    )
}

fn input(name: &str, label: &str, value: &str, kind: &str, errors: &FormErrors) -> String {
    let error = errors
        .get(name)
        .map(|msg| format!("<div class=\"errors\">{}</div>", escape_html(msg)))
        .unwrap_or_default();
    format!(
        r#"<label for="{name}">{label}</label>
<input id="{name}" name="{name}" type="{kind}" step="any" value="{value}">
{error}"#,
        value = escape_html(value),
    )
}

/// Create/update form. `action` is the form's POST target.
pub fn doctor_form_page(title: &str, action: &str, form: &DoctorForm, errors: &FormErrors) -> String {
    let body = format!(
        r#"<form class="stacked card" method="post" action="{action}">
{full_name}{specialty}{city}{address}{rating}{fees}{phone}
<button type="submit">Save</button>
</form>"#,
        action = escape_html(action),
        full_name = input("full_name", "Full name", &form.full_name, "text", errors),
        specialty = input("specialty", "Specialty", &form.specialty, "text", errors),
        city = input("city", "City", &form.city, "text", errors),
        address = input("address", "Address", &form.address, "text", errors),
        rating = input("rating", "Rating (0-5)", &form.rating, "number", errors),
        fees = input("fees", "Fees", &form.fees, "number", errors),
        phone = input("phone", "Phone", &form.phone, "tel", errors),
    );
    layout(title, &body)
}

pub fn success_page() -> String {
    layout(
        "Doctor Added",
        r#"<p>The doctor was added to the directory.</p>
<p><a href="/">Back to all doctors</a> &middot; <a href="/create/">Add another</a></p>"#,
    )
}

pub fn profile_page(doctor: &DoctorRecord, avatar: &str) -> String {
    let body = format!(
        r#"<div class="card profile">
  <img src="{avatar}" alt="{name}">
  <p class="muted">{specialty}</p>
  <p>📍 {city}<br>{address}</p>
  <p>⭐ {rating} &middot; 💵 ${fees}</p>
  <p>📞 {phone}</p>
  <div class="actions"><a href="/update/{id}/">Edit</a><a href="/delete/{id}/">Delete</a></div>
</div>"#,
        avatar = escape_html(avatar),
        name = escape_html(&doctor.full_name),
        specialty = escape_html(&doctor.specialty),
        city = escape_html(&doctor.city),
        address = escape_html(&doctor.address),
        rating = format_decimal(doctor.rating),
        fees = format_decimal(doctor.fees),
        phone = escape_html(&doctor.phone),
        id = doctor.id,
    );
    layout(&doctor.full_name, &body)
}

pub fn delete_confirm_page(doctor: &DoctorRecord) -> String {
    let body = format!(
        r#"<form class="card" method="post" action="/delete/{id}/">
<p>Delete <strong>{name}</strong> from the directory?</p>
<button class="danger" type="submit">Delete</button> <a href="/profile/{id}/">Cancel</a>
</form>"#,
        id = doctor.id,
        name = escape_html(&doctor.full_name),
    );
    layout("Delete Doctor", &body)
}

pub fn search_page(query: &str, entries: &[DoctorEntry]) -> String {
    let body = format!(
        "<p class=\"muted\">{} result(s) for \"{}\"</p>{}",
        entries.len(),
        escape_html(query),
        doctor_grid(entries, "No doctors match your search.")
    );
    layout("Search Results", &body)
}

/// Recommendation form, with results once the form has been submitted.
pub fn recommend_page(
    form: &RecommendForm,
    errors: &FormErrors,
    results: Option<&[DoctorEntry]>,
) -> String {
    let mut body = format!(
        r#"<form class="stacked card" method="post" action="/recommend/">
{specialty}{city}{max_fees}{min_rating}
<button type="submit">Find Doctors</button>
</form>"#,
        specialty = input("specialty", "Specialty", &form.specialty, "text", errors),
        city = input("city", "City", &form.city, "text", errors),
        max_fees = input("max_fees", "Maximum fees", &form.max_fees, "number", errors),
        min_rating = input("min_rating", "Minimum rating", &form.min_rating, "number", errors),
    );
    if let Some(results) = results {
        body.push_str("<h2>Recommended Doctors</h2>");
        body.push_str(&doctor_grid(results, "No doctors match these criteria."));
    }
    layout("Find a Doctor", &body)
}

pub fn chat_page(bubbles: &[ChatBubble], available: bool) -> String {
    let mut body = String::new();
    if !available {
        body.push_str(
            "<p class=\"muted\">The AI assistant is not configured. Set a Gemini API key to enable it.</p>",
        );
    }
    body.push_str("<div class=\"chat\">");
    if bubbles.is_empty() {
        body.push_str(
            "<div class=\"bubble bot\">Hi! Tell me what kind of doctor you need, for example \
             \"Find me a cardiologist in Chicago under $200\".</div>",
        );
    }
    for bubble in bubbles {
        match bubble {
            ChatBubble::User(text) => {
                body.push_str(&format!(
                    "<div class=\"bubble user\">{}</div>",
                    escape_html(text)
                ));
            }
            ChatBubble::Bot(html) => {
                body.push_str(&format!("<div class=\"bubble bot\">{}</div>", html));
            }
        }
    }
    body.push_str(
        r#"</div>
<form class="stacked" method="post" action="/chatbot/">
<input name="message" placeholder="Ask me to find a doctor..." autocomplete="off" autofocus>
<button type="submit">Send</button>
</form>"#,
    );
    layout("AI Assistant", &body)
}

pub fn error_page(status: StatusCode, message: &str) -> String {
    let title = status.canonical_reason().unwrap_or("Error");
    layout(
        title,
        &format!(
            "<p>{}</p><p><a href=\"/\">Back to all doctors</a></p>",
            escape_html(message)
        ),
    )
}
