use crate::ports::{Autofill, FileStore, LessonGateway, ProgressFn, UploadDestination};
use crate::{
    Chapter, ChapterId, CoreError, DocumentDetail, Enrichment, LessonDetail, LessonId,
    LessonPayload, LocalFile, SavedLesson, StudySet, UploadResult,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

#[derive(Clone, Debug, PartialEq)]
pub enum LessonWrite {
    Create(LessonPayload),
    Update(LessonId, LessonPayload),
}

/// In-process backend. Records every call so callers can inspect what would have been sent.
#[derive(Default)]
pub struct MemoryBackend {
    enrichments: RwLock<Vec<Enrichment>>,
    lessons: RwLock<HashMap<LessonId, LessonDetail>>,
    study_sets: RwLock<HashMap<i64, StudySet>>,
    documents: RwLock<HashMap<i64, DocumentDetail>>,
    chapters: RwLock<HashMap<ChapterId, Chapter>>,

    failing_uploads: RwLock<HashSet<String>>,
    autofill_down: RwLock<bool>,

    uploads: RwLock<Vec<(String, UploadDestination)>>,
    autofill_calls: RwLock<Vec<Vec<String>>>,
    writes: RwLock<Vec<LessonWrite>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enrichments(records: Vec<Enrichment>) -> Self {
        let b = Self::default();
        *b.enrichments.write() = records;
        b
    }

    pub fn set_enrichments(&self, records: Vec<Enrichment>) {
        *self.enrichments.write() = records;
    }

    pub fn fail_upload_of(&self, file_name: impl Into<String>) {
        self.failing_uploads.write().insert(file_name.into());
    }

    pub fn set_autofill_down(&self, down: bool) {
        *self.autofill_down.write() = down;
    }

    pub fn insert_lesson(&self, lesson: LessonDetail) {
        self.lessons.write().insert(lesson.id, lesson);
    }

    pub fn insert_study_set(&self, set: StudySet) {
        self.study_sets.write().insert(set.id, set);
    }

    pub fn insert_document(&self, doc: DocumentDetail) {
        self.documents.write().insert(doc.id, doc);
    }

    pub fn insert_chapter(&self, chapter: Chapter) {
        self.chapters.write().insert(chapter.id, chapter);
    }

    /// File names uploaded so far, with their destinations.
    pub fn uploads(&self) -> Vec<(String, UploadDestination)> {
        self.uploads.read().clone()
    }

    pub fn autofill_calls(&self) -> Vec<Vec<String>> {
        self.autofill_calls.read().clone()
    }

    pub fn writes(&self) -> Vec<LessonWrite> {
        self.writes.read().clone()
    }
}

#[async_trait]
impl FileStore for MemoryBackend {
    async fn upload(
        &self,
        file: &LocalFile,
        dest: &UploadDestination,
        progress: ProgressFn,
    ) -> Result<UploadResult, CoreError> {
        if self.failing_uploads.read().contains(&file.file_name) {
            return Err(CoreError::Api {
                status: 500,
                message: format!("upload of {} rejected", file.file_name),
            });
        }
        progress(50);
        progress(100);
        let name = dest.filename.clone().unwrap_or_else(|| file.file_name.clone());
        let key = format!("{}/{}", dest.folder_path.trim_end_matches('/'), name);
        self.uploads
            .write()
            .push((file.file_name.clone(), dest.clone()));
        Ok(UploadResult {
            public_url: format!("memory://{key}"),
            object_key: Some(key),
        })
    }
}

#[async_trait]
impl Autofill for MemoryBackend {
    async fn autofill(&self, words: &[String]) -> Result<Vec<Enrichment>, CoreError> {
        self.autofill_calls.write().push(words.to_vec());
        if *self.autofill_down.read() {
            return Err(CoreError::Transport("autofill service unavailable".into()));
        }
        let records = self.enrichments.read();
        Ok(records
            .iter()
            .filter(|r| words.iter().any(|w| *w == r.word))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl LessonGateway for MemoryBackend {
    async fn create_lesson(&self, payload: &LessonPayload) -> Result<SavedLesson, CoreError> {
        let mut writes = self.writes.write();
        writes.push(LessonWrite::Create(payload.clone()));
        let id = 1000 + writes.len() as LessonId;
        Ok(SavedLesson { id: Some(id) })
    }

    async fn update_lesson(
        &self,
        id: LessonId,
        payload: &LessonPayload,
    ) -> Result<SavedLesson, CoreError> {
        self.writes
            .write()
            .push(LessonWrite::Update(id, payload.clone()));
        Ok(SavedLesson { id: Some(id) })
    }

    async fn get_lesson(&self, id: LessonId) -> Result<LessonDetail, CoreError> {
        self.lessons
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("lesson {id}")))
    }

    async fn get_study_set(&self, id: i64) -> Result<StudySet, CoreError> {
        self.study_sets
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("study set {id}")))
    }

    async fn get_document(&self, id: i64) -> Result<DocumentDetail, CoreError> {
        self.documents
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("document {id}")))
    }

    async fn get_chapter(&self, id: ChapterId) -> Result<Chapter, CoreError> {
        self.chapters
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("chapter {id}")))
    }
}
