//! Route handler implementations.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::{Form, Json};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use mediconnect_avatar::AvatarRequest;
use mediconnect_core::{AvatarMethod, DoctorRecord, SessionId};

use crate::error::{ApiError, PageError};
use crate::forms::{AvatarApiRequest, ChatForm, DoctorForm, FormErrors, RecommendForm};
use crate::pages::{self, ChatBubble, DoctorEntry};
use crate::state::AppState;

/// Cookie carrying the chat session id.
pub const SESSION_COOKIE: &str = "mediconnect_session";

type PageResult = Result<Response, PageError>;

/// Attach offline avatars so list pages never wait on the network.
fn with_avatars(state: &AppState, doctors: Vec<DoctorRecord>) -> Vec<DoctorEntry> {
    doctors
        .into_iter()
        .map(|doctor| {
            let avatar = state
                .avatars
                .resolve_offline(&doctor.full_name, &doctor.specialty)
                .url;
            (doctor, avatar)
        })
        .collect()
}

// =============================================================================
// Directory pages
// =============================================================================

/// GET / - every doctor in insertion order.
pub async fn home(State(state): State<AppState>) -> PageResult {
    let doctors = state.store.list()?;
    Ok(Html(pages::home_page(&with_avatars(&state, doctors))).into_response())
}

/// GET /create/
pub async fn create_form() -> Html<String> {
    Html(pages::doctor_form_page(
        "Add Doctor",
        "/create/",
        &DoctorForm::default(),
        &FormErrors::default(),
    ))
}

/// POST /create/ - validate, insert, redirect to the success page.
pub async fn create_submit(State(state): State<AppState>, Form(form): Form<DoctorForm>) -> PageResult {
    match form.validate() {
        Ok(fields) => {
            let doctor = state.store.create(&fields)?;
            info!(id = doctor.id, "Doctor created");
            Ok(Redirect::to("/success/").into_response())
        }
        Err(errors) => Ok(invalid_form("Add Doctor", "/create/", &form, &errors)),
    }
}

/// GET /success/
pub async fn success() -> Html<String> {
    Html(pages::success_page())
}

/// GET /update/{id}/ - form prefilled from the stored record.
pub async fn update_form(State(state): State<AppState>, Path(id): Path<i64>) -> PageResult {
    let doctor = state.store.get(id)?;
    Ok(Html(pages::doctor_form_page(
        "Edit Doctor",
        &format!("/update/{}/", id),
        &DoctorForm::from_record(&doctor),
        &FormErrors::default(),
    ))
    .into_response())
}

/// POST /update/{id}/ - validate, update in place, redirect home.
pub async fn update_submit(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Form(form): Form<DoctorForm>,
) -> PageResult {
    match form.validate() {
        Ok(fields) => {
            state.store.update(id, &fields)?;
            info!(id, "Doctor updated");
            Ok(Redirect::to("/").into_response())
        }
        Err(errors) => {
            // Unknown ids are reported as 404 even when the form is invalid.
            state.store.get(id)?;
            Ok(invalid_form(
                "Edit Doctor",
                &format!("/update/{}/", id),
                &form,
                &errors,
            ))
        }
    }
}

fn invalid_form(title: &str, action: &str, form: &DoctorForm, errors: &FormErrors) -> Response {
    debug!(fields = errors.0.len(), "Rejected doctor form");
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Html(pages::doctor_form_page(title, action, form, errors)),
    )
        .into_response()
}

/// GET /delete/{id}/ - confirmation page.
pub async fn delete_confirm(State(state): State<AppState>, Path(id): Path<i64>) -> PageResult {
    let doctor = state.store.get(id)?;
    Ok(Html(pages::delete_confirm_page(&doctor)).into_response())
}

/// POST /delete/{id}/
pub async fn delete_submit(State(state): State<AppState>, Path(id): Path<i64>) -> PageResult {
    state.store.delete(id)?;
    info!(id, "Doctor deleted");
    Ok(Redirect::to("/").into_response())
}

/// GET /profile/{id}/
pub async fn profile(State(state): State<AppState>, Path(id): Path<i64>) -> PageResult {
    let doctor = state.store.get(id)?;
    let avatar = state
        .avatars
        .resolve_offline(&doctor.full_name, &doctor.specialty)
        .url;
    Ok(Html(pages::profile_page(&doctor, &avatar)).into_response())
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

/// GET /search/?q= - name OR specialty OR city substring match.
pub async fn search(State(state): State<AppState>, Query(params): Query<SearchParams>) -> PageResult {
    let query = params.q.unwrap_or_default();
    let doctors = state.store.search_text(query.trim())?;
    Ok(Html(pages::search_page(&query, &with_avatars(&state, doctors))).into_response())
}

/// GET /recommend/
pub async fn recommend_form() -> Html<String> {
    Html(pages::recommend_page(
        &RecommendForm::default(),
        &FormErrors::default(),
        None,
    ))
}

/// POST /recommend/ - filtered, ranked, uncapped.
pub async fn recommend_submit(
    State(state): State<AppState>,
    Form(form): Form<RecommendForm>,
) -> PageResult {
    let filter = match form.to_filter() {
        Ok(filter) => filter,
        Err(errors) => {
            return Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                Html(pages::recommend_page(&form, &errors, None)),
            )
                .into_response());
        }
    };
    let doctors = state.store.filter(&filter, None)?;
    let entries = with_avatars(&state, doctors);
    Ok(Html(pages::recommend_page(&form, &FormErrors::default(), Some(&entries))).into_response())
}

// =============================================================================
// Chatbot
// =============================================================================

/// Session id from the request cookie, if present and well formed.
pub fn session_from_headers(headers: &HeaderMap) -> Option<SessionId> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| SessionId::parse(value))
}

fn session_cookie(session: &SessionId) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        SESSION_COOKIE, session
    ))
    .ok()
}

fn with_session_cookie(session: &SessionId, mut response: Response) -> Response {
    if let Some(cookie) = session_cookie(session) {
        response.headers_mut().insert(SET_COOKIE, cookie);
    }
    response
}

/// GET /chatbot/
pub async fn chatbot_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session = session_from_headers(&headers).unwrap_or_default();
    let html = pages::chat_page(&[], state.chat.is_available());
    with_session_cookie(&session, Html(html).into_response())
}

/// POST /chatbot/ - one chat turn. Renders the exchange; the chat service
/// never fails a turn for model or query errors.
pub async fn chatbot_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<ChatForm>,
) -> Response {
    let session = session_from_headers(&headers).unwrap_or_default();
    let available = state.chat.is_available();

    let response = match state.chat.handle_turn(&session, &form.message).await {
        Ok(reply) => {
            let bubbles = [
                ChatBubble::User(form.message.trim().to_string()),
                ChatBubble::Bot(reply.html),
            ];
            Html(pages::chat_page(&bubbles, available)).into_response()
        }
        Err(e) => {
            let err = ApiError::from(e);
            let bubbles = [ChatBubble::Bot(mediconnect_chat::escape_html(err.message()))];
            (err.status(), Html(pages::chat_page(&bubbles, available))).into_response()
        }
    };
    with_session_cookie(&session, response)
}

// =============================================================================
// Avatar generator API
// =============================================================================

/// Parameters describing how the avatar was produced.
#[derive(Debug, Serialize, Deserialize)]
pub struct AvatarParams {
    pub method: AvatarMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AvatarResponse {
    pub success: bool,
    pub avatar_url: String,
    pub params: AvatarParams,
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AvatarErrorResponse {
    pub error: String,
    /// Placeholder the client can show anyway.
    pub avatar_url: String,
}

/// POST /api/generate-avatar/
///
/// The body is parsed by hand so malformed JSON still gets the
/// `{error, avatar_url}` shape.
pub async fn generate_avatar(State(state): State<AppState>, body: Bytes) -> Response {
    let request: AvatarApiRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "Malformed avatar request");
            return avatar_error(&state, StatusCode::BAD_REQUEST, "Invalid JSON body");
        }
    };

    let description = request
        .description
        .as_deref()
        .map(str::trim)
        .unwrap_or("")
        .to_string();
    let name = request
        .name
        .as_deref()
        .map(str::trim)
        .unwrap_or("")
        .to_string();
    if description.is_empty() && name.is_empty() {
        return avatar_error(
            &state,
            StatusCode::BAD_REQUEST,
            "A description or name is required",
        );
    }

    let mut avatar_request = AvatarRequest::new(name).with_imagen(request.use_imagen);
    if !description.is_empty() {
        avatar_request = avatar_request.with_description(description.clone());
    }
    let result = state.avatars.resolve(&avatar_request).await;
    info!(method = %result.method, "Avatar generated");

    let style = result.style.as_ref();
    let body = AvatarResponse {
        success: true,
        avatar_url: result.url.clone(),
        params: AvatarParams {
            method: result.method,
            style: style.map(|s| s.style.clone()),
            seed: style.map(|s| s.seed.clone()),
            background_color: style.map(|s| s.background_color.clone()),
        },
        description,
    };
    Json(body).into_response()
}

fn avatar_error(state: &AppState, status: StatusCode, message: &str) -> Response {
    let fallback = state.avatars.resolve_offline("", "");
    (
        status,
        Json(AvatarErrorResponse {
            error: message.to_string(),
            avatar_url: fallback.url,
        }),
    )
        .into_response()
}

// =============================================================================
// Health
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub doctor_count: u64,
    pub ai_available: bool,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let doctor_count = state.store.count()?;
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        doctor_count,
        ai_available: state.chat.is_available(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_from_headers() {
        let id = SessionId::new();
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("theme=dark; {}={}", SESSION_COOKIE, id)).unwrap(),
        );
        assert_eq!(session_from_headers(&headers), Some(id));
    }

    #[test]
    fn test_invalid_or_missing_session_cookie() {
        assert_eq!(session_from_headers(&HeaderMap::new()), None);

        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("mediconnect_session=garbage"),
        );
        assert_eq!(session_from_headers(&headers), None);
    }

    #[test]
    fn test_session_cookie_attributes() {
        let id = SessionId::new();
        let cookie = session_cookie(&id).unwrap();
        let value = cookie.to_str().unwrap();
        assert!(value.starts_with(&format!("{}={}", SESSION_COOKIE, id)));
        assert!(value.contains("HttpOnly"));
        assert!(value.contains("Path=/"));
    }
}
