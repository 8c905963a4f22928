//! Question domain model.
//!
//! # Responsibility
//! - Define the canonical exam-question record persisted by core.
//! - Provide partition helpers for soft-delete semantics.
//!
//! # Invariants
//! - `id` is opaque, unique and never reassigned.
//! - `created_at` is set once at construction.
//! - `deleted_at` nullity alone decides the active/trashed partition.
//! - `1 <= difficulty <= 5`.

use serde::{Deserialize, Deserializer, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Opaque question identifier.
///
/// Generated ids are UUID v4 strings; imported records may carry any
/// non-blank text.
pub type QuestionId = String;

pub const MIN_DIFFICULTY: i64 = 1;
pub const MAX_DIFFICULTY: i64 = 5;

/// School subject a question belongs to.
///
/// Persisted and serialized as the user-facing Chinese label. Deserialized
/// leniently: unknown labels become [`Subject::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Subject {
    #[serde(rename = "数学")]
    Math,
    #[serde(rename = "物理")]
    Physics,
    #[serde(rename = "化学")]
    Chemistry,
    #[serde(rename = "生物")]
    Biology,
    #[serde(rename = "英语")]
    English,
    #[serde(rename = "语文")]
    Chinese,
    /// Catch-all, also the landing spot for unrecognized input.
    #[serde(rename = "其他")]
    Other,
}

impl Subject {
    pub const ALL: [Subject; 7] = [
        Subject::Math,
        Subject::Physics,
        Subject::Chemistry,
        Subject::Biology,
        Subject::English,
        Subject::Chinese,
        Subject::Other,
    ];

    /// Storage/wire label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Math => "数学",
            Self::Physics => "物理",
            Self::Chemistry => "化学",
            Self::Biology => "生物",
            Self::English => "英语",
            Self::Chinese => "语文",
            Self::Other => "其他",
        }
    }

    /// Strict label lookup. Returns `None` for unknown text.
    pub fn from_label(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|subject| subject.label() == value)
    }

    /// Lenient parse used for caller input: unknown text maps to `Other`.
    pub fn parse_lenient(value: &str) -> Self {
        Self::from_label(value.trim()).unwrap_or(Self::Other)
    }
}

impl<'de> Deserialize<'de> for Subject {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(Self::parse_lenient(&value))
    }
}

impl Display for Subject {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Which side of the soft-delete split a record lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Partition {
    /// `deleted_at IS NULL`.
    #[default]
    Active,
    /// `deleted_at IS NOT NULL`.
    Trashed,
}

/// Validation failures for question invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionValidationError {
    EmptyId,
    EmptyContent,
    DifficultyOutOfRange(i64),
}

impl Display for QuestionValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId => write!(f, "question id must not be blank"),
            Self::EmptyContent => write!(f, "question content must not be blank"),
            Self::DifficultyOutOfRange(value) => write!(
                f,
                "difficulty {value} is outside {MIN_DIFFICULTY}..={MAX_DIFFICULTY}"
            ),
        }
    }
}

impl Error for QuestionValidationError {}

/// Canonical question record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: QuestionId,
    /// Original captured photo.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// User-cropped diagram.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cropped_diagram: Option<String>,
    pub content: String,
    /// Empty means "no options"; persisted as NULL.
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagram_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    pub analysis: String,
    #[serde(default)]
    pub learning_guide: String,
    /// Empty means "no knowledge points"; persisted as the empty string.
    #[serde(default)]
    pub knowledge_points: Vec<String>,
    pub subject: Subject,
    pub difficulty: i64,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reviewed_at: Option<i64>,
    /// Soft-delete tombstone timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<i64>,
}

impl Question {
    /// Creates an active question with a generated id and `created_at = now`.
    pub fn new(
        content: impl Into<String>,
        analysis: impl Into<String>,
        learning_guide: impl Into<String>,
        subject: Subject,
        difficulty: i64,
    ) -> Self {
        Self::with_id(
            Uuid::new_v4().to_string(),
            content,
            analysis,
            learning_guide,
            subject,
            difficulty,
        )
    }

    /// Creates an active question with a caller-provided id.
    ///
    /// Used by import paths and tests. Does not validate.
    pub fn with_id(
        id: impl Into<QuestionId>,
        content: impl Into<String>,
        analysis: impl Into<String>,
        learning_guide: impl Into<String>,
        subject: Subject,
        difficulty: i64,
    ) -> Self {
        Self {
            id: id.into(),
            image: None,
            cropped_diagram: None,
            content: content.into(),
            options: Vec::new(),
            diagram_description: None,
            answer: None,
            analysis: analysis.into(),
            learning_guide: learning_guide.into(),
            knowledge_points: Vec::new(),
            subject,
            difficulty,
            created_at: now_epoch_ms(),
            last_reviewed_at: None,
            deleted_at: None,
        }
    }

    /// Checks record-level invariants before persistence.
    pub fn validate(&self) -> Result<(), QuestionValidationError> {
        if self.id.trim().is_empty() {
            return Err(QuestionValidationError::EmptyId);
        }
        if self.content.trim().is_empty() {
            return Err(QuestionValidationError::EmptyContent);
        }
        if !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&self.difficulty) {
            return Err(QuestionValidationError::DifficultyOutOfRange(
                self.difficulty,
            ));
        }
        Ok(())
    }

    pub fn partition(&self) -> Partition {
        if self.deleted_at.is_some() {
            Partition::Trashed
        } else {
            Partition::Active
        }
    }

    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// Partial update applied on top of a stored question.
///
/// `None` keeps the stored value. For list fields, `Some(vec![])` clears.
/// For optional text fields, only a present value overwrites.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionPatch {
    pub image: Option<String>,
    pub cropped_diagram: Option<String>,
    pub content: Option<String>,
    pub options: Option<Vec<String>>,
    pub diagram_description: Option<String>,
    pub answer: Option<String>,
    pub analysis: Option<String>,
    pub learning_guide: Option<String>,
    pub knowledge_points: Option<Vec<String>>,
    pub subject: Option<Subject>,
    pub difficulty: Option<i64>,
    pub last_reviewed_at: Option<i64>,
}

impl QuestionPatch {
    /// Applies present fields onto `question`. Identity fields are untouched.
    pub fn apply_to(self, question: &mut Question) {
        if let Some(value) = self.image {
            question.image = Some(value);
        }
        if let Some(value) = self.cropped_diagram {
            question.cropped_diagram = Some(value);
        }
        if let Some(value) = self.content {
            question.content = value;
        }
        if let Some(value) = self.options {
            question.options = value;
        }
        if let Some(value) = self.diagram_description {
            question.diagram_description = Some(value);
        }
        if let Some(value) = self.answer {
            question.answer = Some(value);
        }
        if let Some(value) = self.analysis {
            question.analysis = value;
        }
        if let Some(value) = self.learning_guide {
            question.learning_guide = value;
        }
        if let Some(value) = self.knowledge_points {
            question.knowledge_points = value;
        }
        if let Some(value) = self.subject {
            question.subject = value;
        }
        if let Some(value) = self.difficulty {
            question.difficulty = value;
        }
        if let Some(value) = self.last_reviewed_at {
            question.last_reviewed_at = Some(value);
        }
    }
}

/// Current wall-clock time in Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
