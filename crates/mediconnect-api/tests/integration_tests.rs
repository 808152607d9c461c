//! Integration tests for the MediConnect HTTP surface.
//!
//! Each test drives a fresh router over an in-memory database with
//! scripted model capabilities.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use mediconnect_api::create_router;
use mediconnect_api::handlers::{HealthResponse, SESSION_COOKIE};
use mediconnect_api::state::AppState;
use mediconnect_avatar::AvatarResolver;
use mediconnect_chat::{ChatService, InMemorySessionStore, QueryInterpreter, ResultRenderer};
use mediconnect_core::{MediConnectConfig, NewDoctor, SessionId};
use mediconnect_llm::mock::ScriptedTextGenerator;
use mediconnect_llm::TextGenerator;
use mediconnect_storage::{Database, DoctorRepository, DoctorStore};

// =============================================================================
// Helpers
// =============================================================================

const CARDIOLOGIST_REPLY: &str = r#"{"action": "search", "specialty": "cardiologist", "city": "Chicago", "max_fees": 200, "min_rating": null, "message": "Searching for affordable cardiologists in Chicago..."}"#;

fn doctor(name: &str, specialty: &str, city: &str, rating: f64, fees: f64) -> NewDoctor {
    NewDoctor {
        full_name: name.to_string(),
        specialty: specialty.to_string(),
        city: city.to_string(),
        address: "1 Main St".to_string(),
        rating,
        fees,
        phone: "555-0100".to_string(),
    }
}

/// Fresh state with four seeded doctors. `generator` backs both the chatbot
/// and the avatar resolver.
fn make_state(generator: Option<Arc<dyn TextGenerator>>) -> AppState {
    let mut config = MediConnectConfig::default();
    config.general.static_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/../../static").to_string();

    let db = Arc::new(Database::in_memory().unwrap());
    let store: Arc<dyn DoctorStore> = Arc::new(DoctorRepository::new(db));
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

    let mut resolver = AvatarResolver::new(config.avatar.clone());
    if let Some(generator) = &generator {
        resolver = resolver.with_text_generator(Arc::clone(generator));
    }
    let avatars = Arc::new(resolver);

    let interpreter = generator.map(|g| QueryInterpreter::new(g, Duration::from_secs(5)));
    let chat = Arc::new(ChatService::new(
        interpreter,
        Arc::clone(&store),
        Arc::new(InMemorySessionStore::new()),
        ResultRenderer::new(Arc::new(AvatarResolver::new(config.avatar.clone()))),
        config.chat.clone(),
    ));

    AppState::new(config, store, chat, avatars)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn post_form(uri: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_json(uri: &str, json: &str) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json.to_string()))
        .unwrap()
}

async fn body_string(resp: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn location(resp: &axum::response::Response) -> &str {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

// =============================================================================
// Health and static files
// =============================================================================

#[tokio::test]
async fn test_health() {
    let app = create_router(make_state(None));
    let resp = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let health: HealthResponse = serde_json::from_str(&body_string(resp).await).unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.doctor_count, 4);
    assert!(!health.ai_available);
}

#[tokio::test]
async fn test_static_files_served() {
    let app = create_router(make_state(None));
    let resp = app.oneshot(get("/static/style.css")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let app = create_router(make_state(None));
    let resp = app
        .oneshot(get("/static/avatars/doctor_1.svg"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

// =============================================================================
// Directory pages
// =============================================================================

#[tokio::test]
async fn test_home_lists_doctors_with_sample_avatars() {
    let app = create_router(make_state(None));
    let resp = app.oneshot(get("/")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let html = body_string(resp).await;
    for name in ["Dr. Ada", "Dr. Ben", "Dr. Cy", "Dr. Dee"] {
        assert!(html.contains(name), "missing {}", name);
    }
    assert!(html.contains("/static/avatars/doctor_"));
}

#[tokio::test]
async fn test_create_redirects_to_success() {
    let state = make_state(None);
    let app = create_router(state.clone());
    let resp = app
        .oneshot(post_form(
            "/create/",
            "full_name=Dr.+Eve&specialty=Pediatrician&city=Denver&address=&rating=4.1&fees=80&phone=",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/success/");
    assert_eq!(state.store.count().unwrap(), 5);

    let created = state.store.search_text("Eve").unwrap();
    assert_eq!(created[0].specialty, "Pediatrician");
    assert_eq!(created[0].fees, 80.0);
}

#[tokio::test]
async fn test_create_invalid_rerenders_form() {
    let state = make_state(None);
    let app = create_router(state.clone());
    let resp = app
        .oneshot(post_form(
            "/create/",
            "full_name=&specialty=Pediatrician&city=Denver&rating=9&fees=80",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let html = body_string(resp).await;
    assert!(html.contains("Full name is required."));
    assert!(html.contains("Rating must be between 0 and 5."));
    assert!(html.contains(r#"value="Pediatrician""#));
    assert_eq!(state.store.count().unwrap(), 4);
}

#[tokio::test]
async fn test_update_prefills_and_saves() {
    let state = make_state(None);

    let app = create_router(state.clone());
    let resp = app.oneshot(get("/update/1/")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_string(resp).await.contains(r#"value="Dr. Ada""#));

    let app = create_router(state.clone());
    let resp = app
        .oneshot(post_form(
            "/update/1/",
            "full_name=Dr.+Ada+King&specialty=Cardiologist&city=Evanston&rating=5&fees=175",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/");

    let updated = state.store.get(1).unwrap();
    assert_eq!(updated.full_name, "Dr. Ada King");
    assert_eq!(updated.city, "Evanston");
    assert_eq!(updated.rating, 5.0);
}

#[tokio::test]
async fn test_update_unknown_is_not_found() {
    let app = create_router(make_state(None));
    let resp = app
        .oneshot(post_form(
            "/update/999/",
            "full_name=X&specialty=Y&city=Z&rating=1&fees=1",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(body_string(resp).await.contains("Doctor not found: 999"));
}

#[tokio::test]
async fn test_delete_flow() {
    let state = make_state(None);

    let app = create_router(state.clone());
    let resp = app.oneshot(get("/delete/2/")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_string(resp).await.contains("Dr. Ben"));
    assert_eq!(state.store.count().unwrap(), 4);

    let app = create_router(state.clone());
    let resp = app.oneshot(post_form("/delete/2/", "")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(state.store.count().unwrap(), 3);

    let app = create_router(state.clone());
    let resp = app.oneshot(get("/profile/2/")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let app = create_router(state);
    let resp = app.oneshot(post_form("/delete/2/", "")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_profile_page() {
    let app = create_router(make_state(None));
    let resp = app.oneshot(get("/profile/4/")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_string(resp).await;
    assert!(html.contains("Dr. Dee"));
    assert!(html.contains("Dermatologist"));
    assert!(html.contains("555-0100"));
}

#[tokio::test]
async fn test_search_matches_any_field() {
    let app = create_router(make_state(None));
    let resp = app.oneshot(get("/search/?q=derma")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_string(resp).await;
    assert!(html.contains("Dr. Dee"));
    assert!(!html.contains("Dr. Ada"));
    assert!(html.contains("1 result(s)"));

    let app = create_router(make_state(None));
    let resp = app.oneshot(get("/search/?q=chicago")).await.unwrap();
    assert!(body_string(resp).await.contains("3 result(s)"));
}

#[tokio::test]
async fn test_recommend_filters_and_ranks_without_cap() {
    let app = create_router(make_state(None));
    let resp = app
        .oneshot(post_form(
            "/recommend/",
            "specialty=cardio&city=&max_fees=200&min_rating=",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let html = body_string(resp).await;
    let ada = html.find("Dr. Ada").unwrap();
    let cy = html.find("Dr. Cy").unwrap();
    assert!(ada < cy);
    assert!(!html.contains("Dr. Ben"));
    assert!(!html.contains("Dr. Dee"));
}

#[tokio::test]
async fn test_recommend_rejects_bad_numbers() {
    let app = create_router(make_state(None));
    let resp = app
        .oneshot(post_form("/recommend/", "max_fees=lots"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body_string(resp)
        .await
        .contains("Maximum fees must be a number."));
}

// =============================================================================
// Chatbot
// =============================================================================

#[tokio::test]
async fn test_chatbot_search_turn_sets_cookie_and_history() {
    let generator = Arc::new(ScriptedTextGenerator::new([
        CARDIOLOGIST_REPLY,
        r#"{"action":"chat","message":"You're welcome!"}"#,
    ]));
    let state = make_state(Some(generator.clone()));

    let app = create_router(state.clone());
    let resp = app
        .oneshot(post_form(
            "/chatbot/",
            "message=Find+me+a+cardiologist+in+Chicago+under+%24200",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let cookie = resp
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(cookie.starts_with(&format!("{}=", SESSION_COOKIE)));
    let session_value = cookie
        .split(';')
        .next()
        .and_then(|pair| pair.split_once('='))
        .map(|(_, v)| v.to_string())
        .unwrap();
    let session = SessionId::parse(&session_value).unwrap();

    let html = body_string(resp).await;
    assert!(html.contains("Searching for affordable cardiologists in Chicago..."));
    assert!(html.contains(r#"href="/profile/1/""#));
    assert!(html.contains(r#"href="/profile/3/""#));
    assert!(!html.contains(r#"href="/profile/2/""#));

    let app = create_router(state.clone());
    let resp = app
        .oneshot(
            Request::post("/chatbot/")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .header(header::COOKIE, format!("{}={}", SESSION_COOKIE, session))
                .body(Body::from("message=thanks"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_string(resp).await.contains("You&#x27;re welcome!"));

    let history = state.chat.history(&session).unwrap();
    assert_eq!(history.len(), 4);
    assert!(generator.prompts()[1].contains("User: Find me a cardiologist in Chicago under $200\n"));
}

#[tokio::test]
async fn test_chatbot_without_model() {
    let app = create_router(make_state(None));
    let resp = app
        .oneshot(post_form("/chatbot/", "message=hello"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_string(resp)
        .await
        .contains("AI service unavailable. Please configure a Gemini API key."));
}

#[tokio::test]
async fn test_chatbot_empty_message() {
    let app = create_router(make_state(Some(Arc::new(ScriptedTextGenerator::always(
        "unused",
    )))));
    let resp = app
        .oneshot(post_form("/chatbot/", "message=+++"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(body_string(resp).await.contains("message cannot be empty"));
}

#[tokio::test]
async fn test_chatbot_page_get() {
    let app = create_router(make_state(None));
    let resp = app.oneshot(get("/chatbot/")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key(header::SET_COOKIE));
    assert!(body_string(resp).await.contains("not configured"));
}

// =============================================================================
// Avatar API
// =============================================================================

#[tokio::test]
async fn test_avatar_api_offline_tiers() {
    let app = create_router(make_state(None));
    let resp = app
        .oneshot(post_json(
            "/api/generate-avatar/",
            r#"{"name": "Dr. Ada", "description": "Friendly cardiologist"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json: Value = serde_json::from_str(&body_string(resp).await).unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["params"]["method"], "hashed_sample");
    assert_eq!(json["description"], "Friendly cardiologist");
    assert!(json["avatar_url"]
        .as_str()
        .unwrap()
        .starts_with("/static/avatars/doctor_"));
}

#[tokio::test]
async fn test_avatar_api_ai_style_params() {
    let generator = Arc::new(ScriptedTextGenerator::new([
        r#"{"style": "lorelei", "seed": "sunny", "background_color": "c0aede"}"#,
    ]));
    let app = create_router(make_state(Some(generator)));
    let resp = app
        .oneshot(post_json(
            "/api/generate-avatar/",
            r#"{"name": "Dr. Ada", "description": "Cheerful pediatrician", "use_imagen": true}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json: Value = serde_json::from_str(&body_string(resp).await).unwrap();
    assert_eq!(json["params"]["method"], "ai_style");
    assert_eq!(json["params"]["style"], "lorelei");
    assert_eq!(json["params"]["seed"], "sunny");
    assert_eq!(json["params"]["background_color"], "c0aede");
    assert_eq!(
        json["avatar_url"],
        "https://api.dicebear.com/7.x/lorelei/svg?seed=sunny&backgroundColor=c0aede"
    );
}

#[tokio::test]
async fn test_avatar_api_errors_carry_fallback_url() {
    let app = create_router(make_state(None));
    let resp = app
        .oneshot(post_json("/api/generate-avatar/", "{not json"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json: Value = serde_json::from_str(&body_string(resp).await).unwrap();
    assert_eq!(json["error"], "Invalid JSON body");
    assert!(!json["avatar_url"].as_str().unwrap().is_empty());

    let app = create_router(make_state(None));
    let resp = app
        .oneshot(post_json("/api/generate-avatar/", r#"{"description": "  "}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json: Value = serde_json::from_str(&body_string(resp).await).unwrap();
    assert!(json.get("success").is_none());
    assert!(json["avatar_url"].is_string());
}
