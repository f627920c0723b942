use async_trait::async_trait;
use futures::StreamExt;
use memora_core::ports::{Autofill, FileStore, LessonGateway, ProgressFn, UploadDestination};
use memora_core::{
    Chapter, ChapterId, CoreError, DocumentDetail, Enrichment, LessonDetail, LessonId,
    LessonPayload, LocalFile, SavedLesson, StudySet, UploadResult,
};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5147/api";

const UPLOAD_CHUNK: usize = 64 * 1024;
const ERROR_BODY_LIMIT: usize = 300;

/// Some endpoints wrap their payload in `{ "data": ... }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    fn into_inner(self) -> T {
        match self {
            Envelope::Wrapped { data } => data,
            Envelope::Bare(v) => v,
        }
    }
}

#[derive(Serialize)]
struct AutofillWord<'a> {
    word: &'a str,
}

#[derive(Serialize)]
struct AutofillRequest<'a> {
    words: Vec<AutofillWord<'a>>,
}

/// Decodes an autofill body. Bare arrays, `{ data: [...] }`, `null` and empty bodies are all accepted.
pub fn decode_autofill(body: &[u8]) -> Result<Vec<Enrichment>, CoreError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    let value: Value = serde_json::from_slice(body).map_err(|e| CoreError::Decode(e.to_string()))?;
    let list = match value {
        Value::Object(mut obj) => obj
            .remove("data")
            .ok_or_else(|| CoreError::Decode("autofill response has no data".into()))?,
        other => other,
    };
    if list.is_null() {
        return Ok(Vec::new());
    }
    let items: Vec<Option<Enrichment>> =
        serde_json::from_value(list).map_err(|e| CoreError::Decode(e.to_string()))?;
    Ok(items.into_iter().flatten().collect())
}

/// The upload endpoint answers with the URL itself, as raw text or as a JSON string.
pub fn decode_upload_url(body: &str) -> Result<String, CoreError> {
    let trimmed = body.trim();
    let url = if trimmed.starts_with('"') {
        serde_json::from_str::<String>(trimmed).map_err(|e| CoreError::Decode(e.to_string()))?
    } else {
        trimmed.to_string()
    };
    if url.is_empty() {
        return Err(CoreError::Decode("upload returned no url".into()));
    }
    Ok(url)
}

#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self, CoreError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| CoreError::Transport(format!("http client build failed: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authed(&self, rb: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(t) => rb.bearer_auth(t),
            None => rb,
        }
    }

    async fn send(&self, rb: RequestBuilder) -> Result<Response, CoreError> {
        let resp = self
            .authed(rb)
            .send()
            .await
            .map_err(|e| CoreError::Transport(e.to_string()))?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let mut message = resp.text().await.unwrap_or_default();
        if message.len() > ERROR_BODY_LIMIT {
            let mut cut = ERROR_BODY_LIMIT;
            while !message.is_char_boundary(cut) {
                cut -= 1;
            }
            message.truncate(cut);
        }
        if message.is_empty() {
            message = status.canonical_reason().unwrap_or("request failed").to_string();
        }
        Err(CoreError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn body(resp: Response) -> Result<Vec<u8>, CoreError> {
        resp.bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| CoreError::Transport(e.to_string()))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, CoreError> {
        debug!(path, "GET");
        let resp = self.send(self.http.get(self.url(path)).query(query)).await?;
        let bytes = Self::body(resp).await?;
        let env: Envelope<T> =
            serde_json::from_slice(&bytes).map_err(|e| CoreError::Decode(format!("{path}: {e}")))?;
        Ok(env.into_inner())
    }
}

#[async_trait]
impl FileStore for ApiClient {
    async fn upload(
        &self,
        file: &LocalFile,
        dest: &UploadDestination,
        progress: ProgressFn,
    ) -> Result<UploadResult, CoreError> {
        let bytes = tokio::fs::read(&file.path)
            .await
            .map_err(|e| CoreError::Storage(format!("{}: {e}", file.path.display())))?;
        let total = bytes.len() as u64;

        let chunks: Vec<Result<Vec<u8>, std::io::Error>> =
            bytes.chunks(UPLOAD_CHUNK).map(|c| Ok(c.to_vec())).collect();
        let mut sent = 0u64;
        let stream = futures::stream::iter(chunks).inspect(move |chunk| {
            if let Ok(c) = chunk {
                sent += c.len() as u64;
                if total > 0 {
                    progress(((sent * 100) / total) as u8);
                }
            }
        });

        let part = Part::stream_with_length(Body::wrap_stream(stream), total)
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type)
            .map_err(|e| CoreError::invalid(format!("content type {}: {e}", file.content_type)))?;
        let form = Form::new().part("file", part);

        let mut query = vec![("folderPath", dest.folder_path.clone())];
        if let Some(name) = &dest.filename {
            query.push(("filename", name.clone()));
        }

        debug!(file = %file.file_name, bytes = total, folder = %dest.folder_path, "POST File/upload");
        let resp = self
            .send(self.http.post(self.url("File/upload")).query(&query).multipart(form))
            .await?;
        let text = resp
            .text()
            .await
            .map_err(|e| CoreError::Transport(e.to_string()))?;
        Ok(UploadResult {
            public_url: decode_upload_url(&text)?,
            object_key: None,
        })
    }
}

#[async_trait]
impl Autofill for ApiClient {
    async fn autofill(&self, words: &[String]) -> Result<Vec<Enrichment>, CoreError> {
        let req = AutofillRequest {
            words: words.iter().map(|w| AutofillWord { word: w }).collect(),
        };
        debug!(words = words.len(), "POST AI/auto-fill");
        let resp = self
            .send(self.http.post(self.url("AI/auto-fill")).json(&req))
            .await?;
        decode_autofill(&Self::body(resp).await?)
    }
}

#[async_trait]
impl LessonGateway for ApiClient {
    async fn create_lesson(&self, payload: &LessonPayload) -> Result<SavedLesson, CoreError> {
        debug!(title = %payload.title, "POST Lesson");
        let resp = self
            .send(self.http.post(self.url("Lesson")).json(payload))
            .await?;
        let bytes = Self::body(resp).await?;
        // The id is a convenience; a body we cannot read still means the lesson was created.
        let saved = serde_json::from_slice::<Envelope<SavedLesson>>(&bytes)
            .map(Envelope::into_inner)
            .unwrap_or(SavedLesson { id: None });
        Ok(saved)
    }

    async fn update_lesson(
        &self,
        id: LessonId,
        payload: &LessonPayload,
    ) -> Result<SavedLesson, CoreError> {
        debug!(id, "PUT Lesson");
        self.send(self.http.put(self.url(&format!("Lesson/{id}"))).json(payload))
            .await?;
        Ok(SavedLesson { id: Some(id) })
    }

    async fn get_lesson(&self, id: LessonId) -> Result<LessonDetail, CoreError> {
        self.get_json("Lesson", &[("lessonId", id.to_string())]).await
    }

    async fn get_study_set(&self, id: i64) -> Result<StudySet, CoreError> {
        self.get_json(&format!("StudySet/{id}"), &[]).await
    }

    async fn get_document(&self, id: i64) -> Result<DocumentDetail, CoreError> {
        self.get_json(&format!("Document/{id}"), &[]).await
    }

    async fn get_chapter(&self, id: ChapterId) -> Result<Chapter, CoreError> {
        self.get_json(&format!("Chapter/{id}"), &[]).await
    }
}
