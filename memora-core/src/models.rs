use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

pub type LessonId = i64;
pub type ChapterId = i64;
pub type CardId = i64;

pub const DEFAULT_LESSON_TITLE: &str = "Tài liệu mới";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CardImage {
    #[default]
    None,
    /// A local file that still has to be uploaded.
    Pending(PathBuf),
    /// A public URL returned by an earlier upload.
    Remote(String),
}

impl CardImage {
    pub fn from_url(url: Option<String>) -> Self {
        match url {
            Some(u) if !u.trim().is_empty() => CardImage::Remote(u),
            _ => CardImage::None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CardDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CardId>,
    #[serde(default = "Uuid::new_v4", skip_serializing)]
    pub key: Uuid,
    pub word: String,
    #[serde(default)]
    pub meaning: String,
    #[serde(default)]
    pub pronounce: String,
    #[serde(default)]
    pub ranking: Option<i32>,
    #[serde(default)]
    pub sino_vietnamese: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub meaning_description: String,
    #[serde(default)]
    pub example: String,
    #[serde(default)]
    pub example_meaning: String,
    #[serde(default)]
    pub image: CardImage,
    #[serde(default)]
    pub order: Option<u32>,
}

impl CardDraft {
    pub fn blank(word: impl Into<String>) -> Self {
        Self {
            id: None,
            key: Uuid::new_v4(),
            word: word.into(),
            meaning: String::new(),
            pronounce: String::new(),
            ranking: None,
            sino_vietnamese: String::new(),
            kind: String::new(),
            meaning_description: String::new(),
            example: String::new(),
            example_meaning: String::new(),
            image: CardImage::None,
            order: None,
        }
    }

    pub fn with_meaning(mut self, meaning: impl Into<String>) -> Self {
        self.meaning = meaning.into();
        self
    }

    /// Compares the user-visible content, ignoring the local key.
    pub fn same_content(&self, other: &CardDraft) -> bool {
        let mut a = self.clone();
        a.key = other.key;
        &a == other
    }
}

/// One AI suggestion for a vocabulary word.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", from = "EnrichmentRecord")]
pub struct Enrichment {
    pub word: String,
    #[serde(default)]
    pub meaning: Option<String>,
    #[serde(default)]
    pub pronunciation: Option<String>,
    #[serde(default)]
    pub sino_vietnamese: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub meaning_description: Option<String>,
    #[serde(default)]
    pub example: Option<String>,
    #[serde(default)]
    pub example_meaning: Option<String>,
}

/// Wire shape of an autofill record. The service sends `pronunciation`, `pronounce`, or both.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnrichmentRecord {
    #[serde(default)]
    word: String,
    #[serde(default)]
    meaning: Option<String>,
    #[serde(default)]
    pronunciation: Option<String>,
    #[serde(default)]
    pronounce: Option<String>,
    #[serde(default)]
    sino_vietnamese: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    meaning_description: Option<String>,
    #[serde(default)]
    example: Option<String>,
    #[serde(default)]
    example_meaning: Option<String>,
}

impl From<EnrichmentRecord> for Enrichment {
    fn from(r: EnrichmentRecord) -> Self {
        Self {
            word: r.word,
            meaning: r.meaning,
            pronunciation: r.pronunciation.or(r.pronounce),
            sino_vietnamese: r.sino_vietnamese,
            kind: r.kind,
            meaning_description: r.meaning_description,
            example: r.example,
            example_meaning: r.example_meaning,
        }
    }
}

impl Enrichment {
    pub fn new(word: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            ..Self::default()
        }
    }

    pub fn meaning(mut self, meaning: impl Into<String>) -> Self {
        self.meaning = Some(meaning.into());
        self
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadResult {
    pub public_url: String,
    pub object_key: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocalFile {
    pub path: PathBuf,
    pub file_name: String,
    pub content_type: String,
    pub size: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LessonType {
    Video = 0,
    StudySet = 1,
    Quiz = 2,
    Document = 3,
}

impl LessonType {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(LessonType::Video),
            1 => Some(LessonType::StudySet),
            2 => Some(LessonType::Quiz),
            3 => Some(LessonType::Document),
            _ => None,
        }
    }
}

impl Serialize for LessonType {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u8(*self as u8)
    }
}

impl<'de> Deserialize<'de> for LessonType {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let code = i64::deserialize(d)?;
        LessonType::from_code(code)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown lesson type {code}")))
    }
}

// ===== Drafts =====

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StudySetDraft {
    pub name: String,
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub image: CardImage,
    #[serde(default)]
    pub cards: Vec<CardDraft>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DocumentDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum LessonContent {
    StudySet(StudySetDraft),
    Document(DocumentDraft),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LessonDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub content: LessonContent,
}

impl LessonDraft {
    pub fn study_set(name: impl Into<String>, cards: Vec<CardDraft>) -> Self {
        Self {
            title: String::new(),
            description: None,
            content: LessonContent::StudySet(StudySetDraft {
                name: name.into(),
                keyword: None,
                is_public: false,
                image: CardImage::None,
                cards,
            }),
        }
    }

    pub fn lesson_type(&self) -> LessonType {
        match self.content {
            LessonContent::StudySet(_) => LessonType::StudySet,
            LessonContent::Document(_) => LessonType::Document,
        }
    }

    pub fn cards(&self) -> &[CardDraft] {
        match &self.content {
            LessonContent::StudySet(s) => &s.cards,
            LessonContent::Document(_) => &[],
        }
    }

    pub fn cards_mut(&mut self) -> Option<&mut Vec<CardDraft>> {
        match &mut self.content {
            LessonContent::StudySet(s) => Some(&mut s.cards),
            LessonContent::Document(_) => None,
        }
    }

    /// Builds an editable draft from what the backend returned for a lesson.
    pub fn from_existing(
        lesson: &LessonDetail,
        study_set: Option<&StudySet>,
        document: Option<&DocumentDetail>,
    ) -> Option<Self> {
        let content = match lesson.kind {
            LessonType::StudySet => {
                let set = study_set?;
                LessonContent::StudySet(StudySetDraft {
                    name: set.name.clone(),
                    keyword: set.keyword.clone(),
                    is_public: set.is_public,
                    image: CardImage::from_url(set.img_url.clone()),
                    cards: set.cards.iter().map(CardDraft::from).collect(),
                })
            }
            LessonType::Document => LessonContent::Document(DocumentDraft {
                title: lesson
                    .document
                    .as_ref()
                    .map(|d| d.title.clone())
                    .unwrap_or_else(|| lesson.title.clone()),
                content: document.map(|d| d.content.clone()).unwrap_or_default(),
            }),
            LessonType::Video | LessonType::Quiz => return None,
        };
        Some(Self {
            title: lesson.title.clone(),
            description: lesson.description.clone(),
            content,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SaveTarget {
    Create {
        chapter_id: ChapterId,
    },
    Update {
        lesson_id: LessonId,
        chapter_id: ChapterId,
        order: i32,
        resource_id: Option<i64>,
    },
}

impl SaveTarget {
    pub fn for_lesson(lesson: &LessonDetail) -> Self {
        SaveTarget::Update {
            lesson_id: lesson.id,
            chapter_id: lesson.chapter_id,
            order: lesson.order,
            resource_id: lesson.resource_id,
        }
    }
}

// ===== Wire payloads =====

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CardPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<CardId>,
    pub word: String,
    pub meaning: String,
    pub pronounce: String,
    pub ranking: Option<i32>,
    pub sino_vietnamese: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub meaning_description: String,
    pub example: String,
    pub example_meaning: String,
    pub img_url: Option<String>,
    pub order: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StudySetPayload {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    pub is_public: bool,
    pub img_url: Option<String>,
    pub cards: Vec<CardPayload>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentPayload {
    pub title: String,
    pub content: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LessonPayload {
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: LessonType,
    pub chapter_id: ChapterId,
    pub order: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<i64>,
    pub study_set: Option<StudySetPayload>,
    pub document: Option<DocumentPayload>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SavedLesson {
    pub id: Option<LessonId>,
}

// ===== Read models =====

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub id: Option<i64>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LessonDetail {
    pub id: LessonId,
    pub title: String,
    pub order: i32,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_lock: bool,
    #[serde(rename = "type")]
    pub kind: LessonType,
    #[serde(default)]
    pub resource_id: Option<i64>,
    #[serde(default)]
    pub document: Option<DocumentSummary>,
    pub chapter_id: ChapterId,
    #[serde(default)]
    pub date_created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date_modified: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StudyCard {
    pub id: CardId,
    pub word: String,
    #[serde(default)]
    pub pronounce: Option<String>,
    #[serde(default)]
    pub ranking: Option<i32>,
    #[serde(default)]
    pub sino_vietnamese: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub meaning_description: Option<String>,
    #[serde(default)]
    pub example: Option<String>,
    #[serde(default)]
    pub example_meaning: Option<String>,
    #[serde(default)]
    pub meaning: Option<String>,
    #[serde(default)]
    pub order: Option<u32>,
    #[serde(default)]
    pub img_url: Option<String>,
}

impl From<&StudyCard> for CardDraft {
    fn from(c: &StudyCard) -> Self {
        Self {
            id: Some(c.id),
            key: Uuid::new_v4(),
            word: c.word.clone(),
            meaning: c.meaning.clone().unwrap_or_default(),
            pronounce: c.pronounce.clone().unwrap_or_default(),
            ranking: c.ranking,
            sino_vietnamese: c.sino_vietnamese.clone().unwrap_or_default(),
            kind: c.kind.clone().unwrap_or_default(),
            meaning_description: c.meaning_description.clone().unwrap_or_default(),
            example: c.example.clone().unwrap_or_default(),
            example_meaning: c.example_meaning.clone().unwrap_or_default(),
            image: CardImage::from_url(c.img_url.clone()),
            order: c.order,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StudySet {
    pub id: i64,
    #[serde(default)]
    pub keyword: Option<String>,
    pub name: String,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub img_url: Option<String>,
    #[serde(default)]
    pub total_card: u32,
    #[serde(default)]
    pub cards: Vec<StudyCard>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDetail {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub id: ChapterId,
    pub title: String,
    pub order: i32,
    #[serde(default)]
    pub course_id: Option<i64>,
}

impl Chapter {
    pub fn label(&self) -> String {
        format!("{}. {}", self.order, self.title)
    }
}
