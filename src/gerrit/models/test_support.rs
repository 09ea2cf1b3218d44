//! Builders for constructing changes in tests.

use super::{Approval, Change, ReviewerComment, SUBMIT_APPROVAL};

/// Fluent builder producing [`Change`] values with sensible defaults.
#[derive(Debug, Clone)]
pub struct ChangeBuilder {
    change: Change,
}

impl ChangeBuilder {
    /// Starts a change with the given identifier, created and last updated at
    /// `created_on`, on patch set 1.
    #[must_use]
    pub fn new(id: impl Into<String>, created_on: i64) -> Self {
        Self {
            change: Change {
                id: id.into(),
                number: None,
                project: None,
                created_on,
                last_updated: created_on,
                current_patch_set: 1,
                approvals: Vec::new(),
                comments: Vec::new(),
            },
        }
    }

    /// Sets the last-updated timestamp.
    #[must_use]
    pub const fn last_updated(mut self, last_updated: i64) -> Self {
        self.change.last_updated = last_updated;
        self
    }

    /// Sets the current patch set number.
    #[must_use]
    pub const fn patch_set(mut self, number: u32) -> Self {
        self.change.current_patch_set = number;
        self
    }

    /// Adds an approval of the given type.
    #[must_use]
    pub fn approval(mut self, kind: impl Into<String>, granted_on: i64) -> Self {
        self.change.approvals.push(Approval {
            kind: kind.into(),
            granted_on,
        });
        self
    }

    /// Adds a submit record granted at `granted_on`.
    #[must_use]
    pub fn submitted_at(self, granted_on: i64) -> Self {
        self.approval(SUBMIT_APPROVAL, granted_on)
    }

    /// Adds a review comment.
    #[must_use]
    pub fn comment(
        mut self,
        author: impl Into<String>,
        message: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        self.change.comments.push(ReviewerComment {
            author: author.into(),
            message: message.into(),
            timestamp,
        });
        self
    }

    /// Finishes the builder.
    #[must_use]
    pub fn build(self) -> Change {
        self.change
    }
}
