use crate::merge::{apply_enrichment, enrich_range, parse_words, seed_cards, EnrichmentIndex, MergeMode};
use crate::ports::{Autofill, FileStore, LessonGateway};
use crate::upload::{UploadPolicy, Uploader, CARD_PREFIX, STUDY_SET_PREFIX};
use crate::{
    CardDraft, CardImage, CardPayload, CoreError, DocumentPayload, LessonContent, LessonDetail,
    LessonDraft, LessonId, LessonPayload, LessonType, SaveTarget, SavedLesson, StudySetPayload,
    DEFAULT_LESSON_TITLE,
};
use std::ops::Range;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum BulkError {
    #[error("no words to add")]
    NoWords,
    #[error("no cards to fill")]
    NoCards,
    #[error("card {0} has no word")]
    MissingWord(usize),
    #[error("card index {0} out of range")]
    OutOfRange(usize),
    #[error("no suggestion returned for {0:?}")]
    NoSuggestion(String),
    /// The card list was already updated; only the enrichment call failed.
    #[error("enrichment failed: {0}")]
    EnrichmentFailed(#[source] CoreError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BulkOutcome {
    pub added: Range<usize>,
    pub matched: usize,
}

/// Adds or replaces cards from a whitespace-separated word list, then enriches the new ones.
pub async fn bulk_apply<A: Autofill + ?Sized>(
    cards: &mut Vec<CardDraft>,
    input: &str,
    mode: MergeMode,
    autofill: &A,
) -> Result<BulkOutcome, BulkError> {
    let words = parse_words(input);
    if words.is_empty() {
        return Err(BulkError::NoWords);
    }

    let (seeded, range) = seed_cards(cards, &words, mode);
    *cards = seeded;

    let records = autofill
        .autofill(&words)
        .await
        .map_err(|e| {
            warn!(error = %e, words = words.len(), "bulk autofill failed; cards kept");
            BulkError::EnrichmentFailed(e)
        })?;
    let index = EnrichmentIndex::build(&records);
    let matched = enrich_range(cards, range.clone(), &index);
    info!(?mode, words = words.len(), matched, "bulk autofill applied");
    Ok(BulkOutcome {
        added: range,
        matched,
    })
}

/// Enriches every card currently in the list. Returns how many cards matched a suggestion.
pub async fn autofill_existing<A: Autofill + ?Sized>(
    cards: &mut [CardDraft],
    autofill: &A,
) -> Result<usize, BulkError> {
    if cards.is_empty() {
        return Err(BulkError::NoCards);
    }
    let words: Vec<String> = cards
        .iter()
        .filter(|c| !c.word.is_empty())
        .map(|c| c.word.clone())
        .collect();
    if words.is_empty() {
        return Err(BulkError::NoWords);
    }

    let records = autofill
        .autofill(&words)
        .await
        .map_err(BulkError::EnrichmentFailed)?;
    let index = EnrichmentIndex::build(&records);
    let len = cards.len();
    Ok(enrich_range(cards, 0..len, &index))
}

/// Enriches one card. Falls back to the first suggestion when none echoes the word exactly.
pub async fn autofill_card<A: Autofill + ?Sized>(
    cards: &mut [CardDraft],
    index: usize,
    autofill: &A,
) -> Result<usize, BulkError> {
    let card = cards.get_mut(index).ok_or(BulkError::OutOfRange(index))?;
    if card.word.trim().is_empty() {
        return Err(BulkError::MissingWord(index));
    }
    let records = autofill
        .autofill(std::slice::from_ref(&card.word))
        .await
        .map_err(BulkError::EnrichmentFailed)?;
    let rec = records
        .iter()
        .find(|r| r.word == card.word)
        .or_else(|| records.first())
        .ok_or_else(|| BulkError::NoSuggestion(card.word.clone()))?;
    Ok(apply_enrichment(card, rec))
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("image upload failed for {label}: {source}")]
    Upload {
        label: String,
        #[source]
        source: CoreError,
    },
    #[error("saving lesson failed: {0}")]
    Backend(#[source] CoreError),
}

/// Resolves pending images and writes a lesson in a single request.
pub struct LessonSaver<S, G> {
    study_set_images: Uploader<S>,
    card_images: Uploader<S>,
    gateway: G,
}

impl<S: FileStore + Clone, G: LessonGateway> LessonSaver<S, G> {
    pub fn new(store: S, gateway: G) -> Self {
        Self {
            study_set_images: Uploader::new(store.clone(), UploadPolicy::images(STUDY_SET_PREFIX)),
            card_images: Uploader::new(store, UploadPolicy::images(CARD_PREFIX)),
            gateway,
        }
    }
}

impl<S: FileStore, G: LessonGateway> LessonSaver<S, G> {
    pub async fn save(&self, draft: &LessonDraft, target: &SaveTarget) -> Result<SavedLesson, SaveError> {
        validate(draft)?;
        let payload = self.resolve(draft, target).await?;

        let res = match target {
            SaveTarget::Create { .. } => self.gateway.create_lesson(&payload).await,
            SaveTarget::Update { lesson_id, .. } => {
                self.gateway.update_lesson(*lesson_id, &payload).await
            }
        };
        match res {
            Ok(saved) => {
                info!(id = ?saved.id, kind = ?payload.kind, "lesson saved");
                Ok(saved)
            }
            Err(e) => {
                warn!(error = %e, "lesson save rejected");
                Err(SaveError::Backend(e))
            }
        }
    }

    /// Builds the wire payload, uploading pending images one at a time.
    pub async fn resolve(&self, draft: &LessonDraft, target: &SaveTarget) -> Result<LessonPayload, SaveError> {
        let title = match draft.title.trim() {
            "" => DEFAULT_LESSON_TITLE.to_string(),
            t => t.to_string(),
        };
        let description = draft.description.clone().filter(|d| !d.is_empty());
        let (chapter_id, order, resource_id) = match target {
            SaveTarget::Create { chapter_id } => (*chapter_id, 1, None),
            SaveTarget::Update {
                chapter_id,
                order,
                resource_id,
                ..
            } => (*chapter_id, *order, *resource_id),
        };

        let (study_set, document) = match &draft.content {
            LessonContent::Document(doc) => {
                let doc_title = if doc.title.is_empty() { title.clone() } else { doc.title.clone() };
                (
                    None,
                    Some(DocumentPayload {
                        title: doc_title,
                        content: doc.content.clone(),
                    }),
                )
            }
            LessonContent::StudySet(set) => {
                let img_url = resolve_image(&self.study_set_images, &set.image, "study set cover").await?;
                let mut cards = Vec::with_capacity(set.cards.len());
                for (idx, card) in set.cards.iter().enumerate() {
                    let label = format!("card {} ({})", idx + 1, card.word);
                    let img_url = resolve_image(&self.card_images, &card.image, &label).await?;
                    cards.push(card_payload(card, img_url, idx as u32 + 1));
                }
                (
                    Some(StudySetPayload {
                        name: set.name.clone(),
                        keyword: set.keyword.clone().filter(|k| !k.is_empty()),
                        is_public: set.is_public,
                        img_url,
                        cards,
                    }),
                    None,
                )
            }
        };

        Ok(LessonPayload {
            title,
            description,
            kind: draft.lesson_type(),
            chapter_id,
            order,
            resource_id,
            study_set,
            document,
        })
    }
}

fn validate(draft: &LessonDraft) -> Result<(), SaveError> {
    if let LessonContent::StudySet(set) = &draft.content {
        if set.name.trim().is_empty() {
            return Err(SaveError::Validation("study set name is required".into()));
        }
        if let Some(pos) = set.cards.iter().position(|c| c.word.trim().is_empty()) {
            return Err(SaveError::Validation(format!("card {} has no word", pos + 1)));
        }
    }
    Ok(())
}

async fn resolve_image<S: FileStore>(
    uploader: &Uploader<S>,
    image: &CardImage,
    label: &str,
) -> Result<Option<String>, SaveError> {
    match image {
        CardImage::None => Ok(None),
        CardImage::Remote(url) => Ok(Some(url.clone())),
        CardImage::Pending(path) => uploader
            .upload_path(path)
            .await
            .map(|r| Some(r.public_url))
            .map_err(|source| SaveError::Upload {
                label: label.to_string(),
                source,
            }),
    }
}

fn card_payload(card: &CardDraft, img_url: Option<String>, order: u32) -> CardPayload {
    CardPayload {
        id: card.id,
        word: card.word.clone(),
        meaning: card.meaning.clone(),
        pronounce: card.pronounce.clone(),
        ranking: card.ranking,
        sino_vietnamese: card.sino_vietnamese.clone(),
        kind: card.kind.clone(),
        meaning_description: card.meaning_description.clone(),
        example: card.example.clone(),
        example_meaning: card.example_meaning.clone(),
        img_url,
        order,
    }
}

/// Fetches a lesson and whatever backs it, and turns them into an editable draft.
pub async fn load_draft<G: LessonGateway + ?Sized>(
    gateway: &G,
    lesson_id: LessonId,
) -> Result<(LessonDetail, LessonDraft), CoreError> {
    let lesson = gateway.get_lesson(lesson_id).await?;
    let (study_set, document) = match lesson.kind {
        LessonType::StudySet => {
            let id = lesson
                .resource_id
                .ok_or_else(|| CoreError::NotFound(format!("study set for lesson {lesson_id}")))?;
            (Some(gateway.get_study_set(id).await?), None)
        }
        LessonType::Document => {
            let id = lesson
                .document
                .as_ref()
                .and_then(|d| d.id)
                .or(lesson.resource_id);
            let doc = match id {
                Some(id) => Some(gateway.get_document(id).await?),
                None => None,
            };
            (None, doc)
        }
        other => {
            return Err(CoreError::invalid(format!(
                "lesson {lesson_id} is a {other:?} lesson and cannot be edited here"
            )))
        }
    };
    let draft = LessonDraft::from_existing(&lesson, study_set.as_ref(), document.as_ref())
        .ok_or_else(|| CoreError::NotFound(format!("content for lesson {lesson_id}")))?;
    Ok((lesson, draft))
}
