//! Question use-case service.
//!
//! # Responsibility
//! - Provide create/get/update/list entry points for core callers.
//! - Own the question lifecycle: soft-delete, restore, hard-delete.
//!
//! # Invariants
//! - Lifecycle is `Active -> Trashed -> Active`, and either state can be
//!   removed permanently. Removal is terminal.
//! - Lifecycle writes are unconditional apart from existence; concurrent
//!   soft-delete/restore on one id is last-write-wins.
//! - Service layer remains storage-agnostic.

use crate::model::question::{now_epoch_ms, Question, QuestionPatch};
use crate::repo::question_repo::{
    QuestionListQuery, QuestionPage, QuestionRepository, RepoError, RepoResult,
};
use log::{info, warn};
use std::fmt::{Display, Formatter};

/// Named lifecycle transition requested by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    /// Active/Trashed -> Trashed, stamping `deleted_at = now`.
    SoftDelete,
    /// Trashed/Active -> Active, clearing `deleted_at`.
    Restore,
    /// Any state -> Removed.
    HardDelete,
}

impl LifecycleAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SoftDelete => "soft_delete",
            Self::Restore => "restore",
            Self::HardDelete => "hard_delete",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "soft_delete" | "delete" => Some(Self::SoftDelete),
            "restore" => Some(Self::Restore),
            "hard_delete" | "purge" => Some(Self::HardDelete),
            _ => None,
        }
    }
}

impl Display for LifecycleAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Question service facade over repository implementations.
pub struct QuestionService<R: QuestionRepository> {
    repo: R,
}

impl<R: QuestionRepository> QuestionService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Persists a new question and returns the stored copy.
    pub fn create_question(&self, question: &Question) -> RepoResult<Question> {
        let id = self.repo.create_question(question)?;
        self.get_question(&id)
    }

    /// Gets one question from either partition.
    ///
    /// # Errors
    /// - `NotFound` when no row has this id.
    pub fn get_question(&self, id: &str) -> RepoResult<Question> {
        self.repo
            .get_question(id)?
            .ok_or_else(|| RepoError::NotFound(id.to_string()))
    }

    /// Applies a partial update and returns the stored result.
    pub fn update_question(&self, id: &str, patch: QuestionPatch) -> RepoResult<Question> {
        let mut question = self.get_question(id)?;
        patch.apply_to(&mut question);
        self.repo.update_question(&question)?;
        self.get_question(id)
    }

    /// Records a review event at the current time.
    pub fn mark_reviewed(&self, id: &str) -> RepoResult<()> {
        self.repo.mark_reviewed(id, now_epoch_ms())
    }

    /// Returns one filtered page of the requested partition.
    pub fn list_questions(&self, query: &QuestionListQuery) -> RepoResult<QuestionPage> {
        self.repo.list_page(query)
    }

    /// Moves a question to the trash.
    pub fn soft_delete(&self, id: &str) -> RepoResult<()> {
        self.apply(id, LifecycleAction::SoftDelete)
    }

    /// Returns a trashed question to the active partition.
    pub fn restore(&self, id: &str) -> RepoResult<()> {
        self.apply(id, LifecycleAction::Restore)
    }

    /// Permanently removes a question. Irreversible.
    pub fn hard_delete(&self, id: &str) -> RepoResult<()> {
        self.apply(id, LifecycleAction::HardDelete)
    }

    /// Runs one lifecycle transition.
    pub fn apply(&self, id: &str, action: LifecycleAction) -> RepoResult<()> {
        let result = match action {
            LifecycleAction::SoftDelete => self.repo.set_deleted_at(id, now_epoch_ms()),
            LifecycleAction::Restore => self.repo.clear_deleted_at(id),
            LifecycleAction::HardDelete => self.repo.delete_question(id),
        };

        match &result {
            Ok(()) => info!(
                "event=question_{} module=service status=ok id={}",
                action, id
            ),
            Err(RepoError::NotFound(_)) => warn!(
                "event=question_{} module=service status=error id={} error_code=not_found",
                action, id
            ),
            Err(err) => warn!(
                "event=question_{} module=service status=error id={} error_code=store_error error={}",
                action, id, err
            ),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::LifecycleAction;

    #[test]
    fn lifecycle_action_names_round_trip() {
        for action in [
            LifecycleAction::SoftDelete,
            LifecycleAction::Restore,
            LifecycleAction::HardDelete,
        ] {
            assert_eq!(LifecycleAction::parse(action.as_str()), Some(action));
        }
        assert_eq!(LifecycleAction::parse("purge"), Some(LifecycleAction::HardDelete));
        assert_eq!(LifecycleAction::parse("archive"), None);
    }
}
