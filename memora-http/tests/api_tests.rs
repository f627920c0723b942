use axum::{
    body::Bytes,
    extract::{Path as UrlPath, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use memora_core::{
    Autofill, CardDraft, CardImage, CoreError, LessonDraft, LessonGateway, LessonSaver,
    LessonType, SaveTarget, UploadPolicy, Uploader, CARD_PREFIX,
};
use memora_http::ApiClient;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

#[derive(Default)]
struct Seen {
    uploads: Vec<(HashMap<String, String>, Option<String>, Vec<u8>)>,
    autofill: Vec<Value>,
    lessons: Vec<(Option<i64>, Value)>,
}

type Shared = Arc<Mutex<Seen>>;

async fn upload(
    State(seen): State<Shared>,
    Query(q): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, String) {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let folder = q.get("folderPath").cloned().unwrap_or_default();
    seen.lock().unwrap().uploads.push((q, auth, body.to_vec()));
    (StatusCode::OK, format!("\"https://cdn.test/{folder}/upload.png\""))
}

async fn autofill(State(seen): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    seen.lock().unwrap().autofill.push(body.clone());
    let items: Vec<Value> = body["words"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .filter(|w| w["word"] != "skip")
        .map(|w| json!({ "word": w["word"], "meaning": format!("{}!", w["word"].as_str().unwrap_or("")) }))
        .collect();
    Json(json!({ "data": items }))
}

async fn create_lesson(State(seen): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    seen.lock().unwrap().lessons.push((None, body));
    Json(json!({ "id": 42 }))
}

async fn update_lesson(
    State(seen): State<Shared>,
    UrlPath(id): UrlPath<i64>,
    Json(body): Json<Value>,
) -> StatusCode {
    seen.lock().unwrap().lessons.push((Some(id), body));
    StatusCode::NO_CONTENT
}

async fn get_lesson(Query(q): Query<HashMap<String, String>>) -> Json<Value> {
    let id: i64 = q.get("lessonId").and_then(|s| s.parse().ok()).unwrap_or(0);
    Json(json!({
        "id": id,
        "title": "Greetings",
        "order": 4,
        "isLock": false,
        "type": 3,
        "document": { "title": "Greetings doc", "id": 8 },
        "chapterId": 2,
        "dateCreated": "2024-05-01T10:00:00Z"
    }))
}

async fn get_document(UrlPath(id): UrlPath<i64>) -> Json<Value> {
    Json(json!({ "data": { "id": id, "title": "Greetings doc", "content": "<p>xin chào</p>" } }))
}

async fn get_chapter() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "chapter missing")
}

async fn serve() -> (SocketAddr, Shared) {
    let seen: Shared = Arc::default();
    let app = Router::new()
        .route("/api/File/upload", post(upload))
        .route("/api/AI/auto-fill", post(autofill))
        .route("/api/Lesson", post(create_lesson).get(get_lesson))
        .route("/api/Lesson/:id", put(update_lesson))
        .route("/api/Document/:id", get(get_document))
        .route("/api/Chapter/:id", get(get_chapter))
        .with_state(seen.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service()).await.unwrap();
    });
    (addr, seen)
}

fn client(addr: SocketAddr, token: Option<&str>) -> ApiClient {
    ApiClient::new(format!("http://{addr}/api/"), token.map(str::to_string)).unwrap()
}

fn png(dir: &std::path::Path, name: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
    bytes.extend(std::iter::repeat(3u8).take(200_000));
    std::fs::write(&path, bytes).unwrap();
    path
}

#[tokio::test]
async fn upload_sends_file_with_folder_and_token() {
    let (addr, seen) = serve().await;
    let dir = tempfile::tempdir().unwrap();
    let path = png(dir.path(), "dog.png");
    let uploader = Uploader::new(client(addr, Some("secret")), UploadPolicy::images(CARD_PREFIX));

    let res = uploader.upload_path(&path).await.unwrap();

    assert_eq!(res.public_url, "https://cdn.test/images/cards/upload.png");
    assert_eq!(uploader.state().progress, 100);
    let seen = seen.lock().unwrap();
    let (query, auth, body) = &seen.uploads[0];
    assert_eq!(query.get("folderPath").map(String::as_str), Some(CARD_PREFIX));
    assert!(query.get("filename").is_none());
    assert_eq!(auth.as_deref(), Some("Bearer secret"));
    assert!(body.windows(8).any(|w| w == b"\x89PNG\r\n\x1a\n"));
    assert!(body.len() > 200_000);
}

#[tokio::test]
async fn autofill_unwraps_envelope_and_omits_words() {
    let (addr, seen) = serve().await;
    let api = client(addr, None);

    let words = vec!["chó".to_string(), "skip".to_string()];
    let out = api.autofill(&words).await.unwrap();

    assert_eq!(out.len(), 1);
    assert_eq!(out[0].word, "chó");
    assert_eq!(out[0].meaning.as_deref(), Some("chó!"));
    let seen = seen.lock().unwrap();
    assert_eq!(seen.autofill[0], json!({ "words": [{ "word": "chó" }, { "word": "skip" }] }));
}

#[tokio::test]
async fn save_uploads_then_creates_once() {
    let (addr, seen) = serve().await;
    let dir = tempfile::tempdir().unwrap();
    let api = client(addr, Some("t"));
    let saver = LessonSaver::new(api.clone(), api);

    let mut dog = CardDraft::blank("dog").with_meaning("a pet");
    dog.image = CardImage::Pending(png(dir.path(), "dog.png"));
    let mut cat = CardDraft::blank("cat");
    cat.image = CardImage::Remote("https://old/cat.png".into());
    let mut draft = LessonDraft::study_set("Animals", vec![dog, cat]);
    draft.title = "Pets".into();

    let saved = saver.save(&draft, &SaveTarget::Create { chapter_id: 12 }).await.unwrap();

    assert_eq!(saved.id, Some(42));
    let seen = seen.lock().unwrap();
    assert_eq!(seen.uploads.len(), 1);
    assert_eq!(seen.lessons.len(), 1);
    let (id, body) = &seen.lessons[0];
    assert_eq!(*id, None);
    assert_eq!(body["type"], json!(1));
    assert_eq!(body["chapterId"], json!(12));
    assert_eq!(body["document"], Value::Null);
    let cards = body["studySet"]["cards"].as_array().unwrap();
    assert_eq!(cards[0]["imgUrl"], json!("https://cdn.test/images/cards/upload.png"));
    assert_eq!(cards[0]["order"], json!(1));
    assert_eq!(cards[1]["imgUrl"], json!("https://old/cat.png"));
    assert_eq!(cards[1]["order"], json!(2));
    assert!(cards[0].get("key").is_none());
}

#[tokio::test]
async fn update_goes_to_lesson_id() {
    let (addr, seen) = serve().await;
    let api = client(addr, None);
    let saver = LessonSaver::new(api.clone(), api);
    let draft = LessonDraft::study_set("Set", vec![CardDraft::blank("a")]);
    let target = SaveTarget::Update {
        lesson_id: 9,
        chapter_id: 1,
        order: 2,
        resource_id: Some(5),
    };

    let saved = saver.save(&draft, &target).await.unwrap();

    assert_eq!(saved.id, Some(9));
    let seen = seen.lock().unwrap();
    assert_eq!(seen.lessons[0].0, Some(9));
    assert_eq!(seen.lessons[0].1["resourceId"], json!(5));
}

#[tokio::test]
async fn reads_lesson_and_wrapped_document() {
    let (addr, _) = serve().await;
    let api = client(addr, None);

    let lesson = api.get_lesson(7).await.unwrap();
    assert_eq!(lesson.id, 7);
    assert_eq!(lesson.kind, LessonType::Document);

    let (_, draft) = memora_core::load_draft(&api, 7).await.unwrap();
    assert_eq!(draft.title, "Greetings");
    match draft.content {
        memora_core::LessonContent::Document(doc) => {
            assert_eq!(doc.title, "Greetings doc");
            assert_eq!(doc.content, "<p>xin chào</p>");
        }
        other => panic!("unexpected content {other:?}"),
    }
}

#[tokio::test]
async fn http_errors_carry_status_and_body() {
    let (addr, _) = serve().await;
    let api = client(addr, None);

    match api.get_chapter(3).await {
        Err(CoreError::Api { status, message }) => {
            assert_eq!(status, 404);
            assert_eq!(message, "chapter missing");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let api = client(addr, None);

    let err = api.autofill(&["x".to_string()]).await.unwrap_err();
    assert!(matches!(err, CoreError::Transport(_)));
}
