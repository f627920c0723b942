use crate::{
    Chapter, ChapterId, CoreError, DocumentDetail, Enrichment, LessonDetail, LessonId,
    LessonPayload, LocalFile, SavedLesson, StudySet, UploadResult,
};
use async_trait::async_trait;
use std::sync::Arc;

pub mod memory;
pub use memory::*;

/// Receives upload progress as a whole percentage.
pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadDestination {
    pub folder_path: String,
    pub filename: Option<String>,
}

#[async_trait]
pub trait FileStore: Send + Sync {
    async fn upload(
        &self,
        file: &LocalFile,
        dest: &UploadDestination,
        progress: ProgressFn,
    ) -> Result<UploadResult, CoreError>;
}

#[async_trait]
pub trait Autofill: Send + Sync {
    async fn autofill(&self, words: &[String]) -> Result<Vec<Enrichment>, CoreError>;
}

#[async_trait]
pub trait LessonGateway: Send + Sync {
    // Writes
    async fn create_lesson(&self, payload: &LessonPayload) -> Result<SavedLesson, CoreError>;
    async fn update_lesson(
        &self,
        id: LessonId,
        payload: &LessonPayload,
    ) -> Result<SavedLesson, CoreError>;

    // Reads
    async fn get_lesson(&self, id: LessonId) -> Result<LessonDetail, CoreError>;
    async fn get_study_set(&self, id: i64) -> Result<StudySet, CoreError>;
    async fn get_document(&self, id: i64) -> Result<DocumentDetail, CoreError>;
    async fn get_chapter(&self, id: ChapterId) -> Result<Chapter, CoreError>;
}

#[async_trait]
impl<T: FileStore + ?Sized> FileStore for Arc<T> {
    async fn upload(
        &self,
        file: &LocalFile,
        dest: &UploadDestination,
        progress: ProgressFn,
    ) -> Result<UploadResult, CoreError> {
        (**self).upload(file, dest, progress).await
    }
}

#[async_trait]
impl<T: Autofill + ?Sized> Autofill for Arc<T> {
    async fn autofill(&self, words: &[String]) -> Result<Vec<Enrichment>, CoreError> {
        (**self).autofill(words).await
    }
}

#[async_trait]
impl<T: LessonGateway + ?Sized> LessonGateway for Arc<T> {
    async fn create_lesson(&self, payload: &LessonPayload) -> Result<SavedLesson, CoreError> {
        (**self).create_lesson(payload).await
    }

    async fn update_lesson(
        &self,
        id: LessonId,
        payload: &LessonPayload,
    ) -> Result<SavedLesson, CoreError> {
        (**self).update_lesson(id, payload).await
    }

    async fn get_lesson(&self, id: LessonId) -> Result<LessonDetail, CoreError> {
        (**self).get_lesson(id).await
    }

    async fn get_study_set(&self, id: i64) -> Result<StudySet, CoreError> {
        (**self).get_study_set(id).await
    }

    async fn get_document(&self, id: i64) -> Result<DocumentDetail, CoreError> {
        (**self).get_document(id).await
    }

    async fn get_chapter(&self, id: ChapterId) -> Result<Chapter, CoreError> {
        (**self).get_chapter(id).await
    }
}
