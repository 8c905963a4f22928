//! Question repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD and lifecycle writes over the `questions` table.
//! - Build filtered, ordered, paginated views over either partition.
//! - Keep SQL details and list-column encoding inside the persistence boundary.
//!
//! # Invariants
//! - Write paths call `Question::validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Page total is counted over the filtered set in the same read
//!   transaction that fetches the page.
//! - Empty `options` persist as NULL; empty `knowledge_points` persist as
//!   `''` because that column is NOT NULL.

use crate::db::migrations::latest_version;
use crate::db::{table_exists, table_has_column, DbError};
use crate::model::question::{
    Partition, Question, QuestionId, QuestionValidationError, Subject,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

const QUESTION_SELECT_SQL: &str = "SELECT
    id,
    image,
    cropped_diagram,
    content,
    options,
    diagram_description,
    answer,
    analysis,
    learning_guide,
    knowledge_points,
    subject,
    difficulty,
    created_at,
    last_reviewed_at,
    deleted_at
FROM questions";

const REQUIRED_QUESTION_COLUMNS: &[&str] = &[
    "id",
    "image",
    "cropped_diagram",
    "content",
    "options",
    "diagram_description",
    "answer",
    "analysis",
    "learning_guide",
    "knowledge_points",
    "subject",
    "difficulty",
    "created_at",
    "last_reviewed_at",
    "deleted_at",
];

/// Columns searched by the free-text filter, as SQL expressions.
const TEXT_SEARCH_COLUMNS: &[&str] = &[
    "content",
    "analysis",
    "learning_guide",
    "COALESCE(diagram_description, '')",
    "COALESCE(answer, '')",
    "COALESCE(options, '')",
    "knowledge_points",
];

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for question persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(QuestionValidationError),
    Db(DbError),
    NotFound(QuestionId),
    /// Connection schema is behind the version this binary expects.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "question not found: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "question repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "question repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "question repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted question data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_)
            | Self::UninitializedConnection { .. }
            | Self::MissingRequiredTable(_)
            | Self::MissingRequiredColumn { .. }
            | Self::InvalidData(_) => None,
        }
    }
}

impl From<QuestionValidationError> for RepoError {
    fn from(value: QuestionValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Filter, ordering and pagination options for one page request.
///
/// `page` and `page_size` are raw caller input; they are clamped, never
/// rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionListQuery {
    pub partition: Partition,
    /// Matches when `"<tag>"` occurs inside the stored knowledge-points JSON.
    pub tag: Option<String>,
    /// Case-sensitive substring over the searchable text columns.
    pub text: Option<String>,
    pub subject: Option<Subject>,
    pub page: i64,
    pub page_size: i64,
}

/// One page of results plus the pre-pagination match count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionPage {
    pub items: Vec<Question>,
    pub total: i64,
    /// Effective page after clamping.
    pub page: i64,
    /// Effective page size after clamping.
    pub page_size: i64,
}

/// Repository interface for question persistence.
pub trait QuestionRepository {
    fn create_question(&self, question: &Question) -> RepoResult<QuestionId>;
    /// Replaces every mutable column. `id`, `created_at` and `deleted_at`
    /// are left untouched.
    fn update_question(&self, question: &Question) -> RepoResult<()>;
    /// Loads one question from either partition.
    fn get_question(&self, id: &str) -> RepoResult<Option<Question>>;
    fn list_page(&self, query: &QuestionListQuery) -> RepoResult<QuestionPage>;
    /// Every question in both partitions, oldest first.
    fn list_all(&self) -> RepoResult<Vec<Question>>;
    fn set_deleted_at(&self, id: &str, deleted_at: i64) -> RepoResult<()>;
    fn clear_deleted_at(&self, id: &str) -> RepoResult<()>;
    fn mark_reviewed(&self, id: &str, reviewed_at: i64) -> RepoResult<()>;
    /// Removes the row permanently.
    fn delete_question(&self, id: &str) -> RepoResult<()>;
    /// Deletes every question and inserts `questions` in one transaction.
    fn replace_all(&self, questions: &[Question]) -> RepoResult<usize>;
}

/// SQLite-backed question repository.
pub struct SqliteQuestionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteQuestionRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_question_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl QuestionRepository for SqliteQuestionRepository<'_> {
    fn create_question(&self, question: &Question) -> RepoResult<QuestionId> {
        insert_question(self.conn, question)?;
        Ok(question.id.clone())
    }

    fn update_question(&self, question: &Question) -> RepoResult<()> {
        question.validate()?;

        let changed = self.conn.execute(
            "UPDATE questions
             SET
                image = ?2,
                cropped_diagram = ?3,
                content = ?4,
                options = ?5,
                diagram_description = ?6,
                answer = ?7,
                analysis = ?8,
                learning_guide = ?9,
                knowledge_points = ?10,
                subject = ?11,
                difficulty = ?12,
                last_reviewed_at = ?13
             WHERE id = ?1;",
            params![
                question.id.as_str(),
                question.image.as_deref(),
                question.cropped_diagram.as_deref(),
                question.content.as_str(),
                encode_list(&question.options)?,
                question.diagram_description.as_deref(),
                question.answer.as_deref(),
                question.analysis.as_str(),
                question.learning_guide.as_str(),
                encode_list(&question.knowledge_points)?.unwrap_or_default(),
                question.subject.label(),
                question.difficulty,
                question.last_reviewed_at,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(question.id.clone()));
        }

        Ok(())
    }

    fn get_question(&self, id: &str) -> RepoResult<Option<Question>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{QUESTION_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_question_row(row)?));
        }

        Ok(None)
    }

    fn list_page(&self, query: &QuestionListQuery) -> RepoResult<QuestionPage> {
        let page = normalize_page(query.page);
        let page_size = normalize_page_size(query.page_size);
        let offset = (page - 1).saturating_mul(page_size);

        let (filter_sql, bind_values) = build_filter(query);
        let order_sql = match query.partition {
            Partition::Active => " ORDER BY created_at DESC, id ASC",
            Partition::Trashed => " ORDER BY deleted_at DESC, id ASC",
        };

        let tx = self.conn.unchecked_transaction()?;

        let total: i64 = tx.query_row(
            &format!("SELECT COUNT(*) FROM questions{filter_sql};"),
            params_from_iter(bind_values.iter()),
            |row| row.get(0),
        )?;

        let mut page_binds = bind_values;
        page_binds.push(Value::Integer(page_size));
        page_binds.push(Value::Integer(offset));
        let items = {
            let mut stmt = tx.prepare(&format!(
                "{QUESTION_SELECT_SQL}{filter_sql}{order_sql} LIMIT ? OFFSET ?;"
            ))?;
            let mut rows = stmt.query(params_from_iter(page_binds))?;
            let mut items = Vec::new();
            while let Some(row) = rows.next()? {
                items.push(parse_question_row(row)?);
            }
            items
        };
        tx.commit()?;

        Ok(QuestionPage {
            items,
            total,
            page,
            page_size,
        })
    }

    fn list_all(&self) -> RepoResult<Vec<Question>> {
        let mut stmt = self.conn.prepare(&format!(
            "{QUESTION_SELECT_SQL} ORDER BY created_at ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut questions = Vec::new();
        while let Some(row) = rows.next()? {
            questions.push(parse_question_row(row)?);
        }
        Ok(questions)
    }

    fn set_deleted_at(&self, id: &str, deleted_at: i64) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE questions SET deleted_at = ?2 WHERE id = ?1;",
            params![id, deleted_at],
        )?;
        ensure_changed(changed, id)
    }

    fn clear_deleted_at(&self, id: &str) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("UPDATE questions SET deleted_at = NULL WHERE id = ?1;", [id])?;
        ensure_changed(changed, id)
    }

    fn mark_reviewed(&self, id: &str, reviewed_at: i64) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE questions SET last_reviewed_at = ?2 WHERE id = ?1;",
            params![id, reviewed_at],
        )?;
        ensure_changed(changed, id)
    }

    fn delete_question(&self, id: &str) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM questions WHERE id = ?1;", [id])?;
        ensure_changed(changed, id)
    }

    fn replace_all(&self, questions: &[Question]) -> RepoResult<usize> {
        for question in questions {
            question.validate()?;
        }

        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM questions;", [])?;
        for question in questions {
            insert_question(&tx, question)?;
        }
        tx.commit()?;
        Ok(questions.len())
    }
}

/// Clamps a requested page number: anything below 1 becomes 1.
pub fn normalize_page(page: i64) -> i64 {
    if page <= 0 {
        1
    } else {
        page
    }
}

/// Clamps a requested page size: non-positive becomes the default,
/// oversized becomes the maximum.
pub fn normalize_page_size(page_size: i64) -> i64 {
    if page_size <= 0 {
        DEFAULT_PAGE_SIZE
    } else {
        page_size.min(MAX_PAGE_SIZE)
    }
}

/// Serializes a string list for storage. Empty lists have no representation.
pub fn encode_list(values: &[String]) -> RepoResult<Option<String>> {
    if values.is_empty() {
        return Ok(None);
    }
    serde_json::to_string(values)
        .map(Some)
        .map_err(|err| RepoError::InvalidData(format!("cannot encode string list: {err}")))
}

fn decode_list(column: &str, value: Option<String>) -> RepoResult<Vec<String>> {
    match value.as_deref() {
        None | Some("") => Ok(Vec::new()),
        Some(text) => serde_json::from_str(text).map_err(|err| {
            RepoError::InvalidData(format!("invalid JSON list in questions.{column}: {err}"))
        }),
    }
}

/// Quoted pattern a tag must appear as inside the stored JSON array text.
///
/// This is a substring match, so `"a"` also matches inside `["b","a"]` and
/// a tag whose quoted form is contained in another element's text matches
/// that record too.
pub fn tag_pattern(tag: &str) -> String {
    serde_json::to_string(tag).unwrap_or_else(|_| format!("\"{tag}\""))
}

fn build_filter(query: &QuestionListQuery) -> (String, Vec<Value>) {
    let mut sql = String::from(match query.partition {
        Partition::Active => " WHERE deleted_at IS NULL",
        Partition::Trashed => " WHERE deleted_at IS NOT NULL",
    });
    let mut bind_values: Vec<Value> = Vec::new();

    if let Some(tag) = non_blank(query.tag.as_deref()) {
        sql.push_str(" AND instr(knowledge_points, ?) > 0");
        bind_values.push(Value::Text(tag_pattern(tag)));
    }

    if let Some(text) = non_blank(query.text.as_deref()) {
        let clauses = TEXT_SEARCH_COLUMNS
            .iter()
            .map(|column| format!("instr({column}, ?) > 0"))
            .collect::<Vec<_>>();
        sql.push_str(&format!(" AND ({})", clauses.join(" OR ")));
        for _ in TEXT_SEARCH_COLUMNS {
            bind_values.push(Value::Text(text.to_string()));
        }
    }

    if let Some(subject) = query.subject {
        sql.push_str(" AND subject = ?");
        bind_values.push(Value::Text(subject.label().to_string()));
    }

    (sql, bind_values)
}

// Blankness is judged on the trimmed text; the bound value is left as given.
fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.trim().is_empty())
}

fn insert_question(conn: &Connection, question: &Question) -> RepoResult<()> {
    question.validate()?;

    conn.execute(
        "INSERT INTO questions (
            id,
            image,
            cropped_diagram,
            content,
            options,
            diagram_description,
            answer,
            analysis,
            learning_guide,
            knowledge_points,
            subject,
            difficulty,
            created_at,
            last_reviewed_at,
            deleted_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15);",
        params![
            question.id.as_str(),
            question.image.as_deref(),
            question.cropped_diagram.as_deref(),
            question.content.as_str(),
            encode_list(&question.options)?,
            question.diagram_description.as_deref(),
            question.answer.as_deref(),
            question.analysis.as_str(),
            question.learning_guide.as_str(),
            encode_list(&question.knowledge_points)?.unwrap_or_default(),
            question.subject.label(),
            question.difficulty,
            question.created_at,
            question.last_reviewed_at,
            question.deleted_at,
        ],
    )?;
    Ok(())
}

fn ensure_changed(changed: usize, id: &str) -> RepoResult<()> {
    if changed == 0 {
        return Err(RepoError::NotFound(id.to_string()));
    }
    Ok(())
}

fn parse_question_row(row: &Row<'_>) -> RepoResult<Question> {
    let subject_text: String = row.get("subject")?;
    let subject = Subject::from_label(&subject_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid subject `{subject_text}` in questions.subject"
        ))
    })?;

    let question = Question {
        id: row.get("id")?,
        image: row.get("image")?,
        cropped_diagram: row.get("cropped_diagram")?,
        content: row.get("content")?,
        options: decode_list("options", row.get("options")?)?,
        diagram_description: row.get("diagram_description")?,
        answer: row.get("answer")?,
        analysis: row.get("analysis")?,
        learning_guide: row.get("learning_guide")?,
        knowledge_points: decode_list("knowledge_points", row.get("knowledge_points")?)?,
        subject,
        difficulty: row.get("difficulty")?,
        created_at: row.get("created_at")?,
        last_reviewed_at: row.get("last_reviewed_at")?,
        deleted_at: row.get("deleted_at")?,
    };
    question.validate()?;
    Ok(question)
}

fn ensure_question_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version < expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in ["questions", "ai_configs"] {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }

    for column in REQUIRED_QUESTION_COLUMNS.iter().copied() {
        if !table_has_column(conn, "questions", column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: "questions",
                column,
            });
        }
    }

    Ok(())
}
