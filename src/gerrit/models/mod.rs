//! Data models representing Gerrit changes and their review comments.
//!
//! Public types are the domain records the analysis works on and the shape
//! persisted by the result cache. Types prefixed with `Api` are internal
//! deserialisation targets for `gerrit query --format=json` rows that convert
//! into the domain types.

use serde::{Deserialize, Deserializer, Serialize};

use super::error::QueryError;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// One reviewed change ("patch") as returned by Gerrit.
///
/// Timestamps are Unix epoch seconds, exactly as Gerrit reports them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    /// Gerrit change identifier (`I...` Change-Id).
    pub id: String,
    /// Numeric change number, when reported.
    pub number: Option<u64>,
    /// Project the change belongs to.
    pub project: Option<String>,
    /// Creation time of the change.
    pub created_on: i64,
    /// Time of the last update to the change.
    pub last_updated: i64,
    /// Number of the current (latest) patch set.
    pub current_patch_set: u32,
    /// Approvals granted on the current patch set.
    pub approvals: Vec<Approval>,
    /// Review comments in the order Gerrit returned them.
    pub comments: Vec<ReviewerComment>,
}

/// A label vote or submit record on the current patch set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    /// Approval type tag such as `Code-Review`, `Verified` or `SUBM`.
    pub kind: String,
    /// When the approval was granted.
    pub granted_on: i64,
}

/// Approval type tag Gerrit uses for the submit record.
pub const SUBMIT_APPROVAL: &str = "SUBM";

/// A review message left on a change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewerComment {
    /// Display name of the reviewer, falling back to the username.
    pub author: String,
    /// Free-text message body.
    pub message: String,
    /// When the message was posted.
    pub timestamp: i64,
}

/// Full result of a query, ordered by ascending creation time.
pub type RecordSet = Vec<Change>;

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiChange {
    id: String,
    number: Option<u64>,
    project: Option<String>,
    #[serde(rename = "createdOn")]
    created_on: i64,
    #[serde(rename = "lastUpdated")]
    last_updated: i64,
    #[serde(rename = "currentPatchSet")]
    current_patch_set: Option<ApiPatchSet>,
    #[serde(default)]
    comments: Vec<ApiComment>,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiPatchSet {
    #[serde(deserialize_with = "patch_set_number")]
    number: u32,
    #[serde(default)]
    approvals: Vec<ApiApproval>,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiApproval {
    #[serde(rename = "type")]
    kind: String,
    #[serde(rename = "grantedOn")]
    granted_on: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiComment {
    reviewer: ApiAccount,
    #[serde(default)]
    message: String,
    #[serde(default)]
    timestamp: i64,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiAccount {
    name: Option<String>,
    username: Option<String>,
}

/// Older Gerrit releases report patch set numbers as strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(u32),
    Text(String),
}

fn patch_set_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Number(number) => Ok(number),
        NumberOrText::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

impl TryFrom<ApiChange> for Change {
    type Error = QueryError;

    fn try_from(api: ApiChange) -> Result<Self, Self::Error> {
        let Some(patch_set) = api.current_patch_set else {
            return Err(QueryError::Protocol {
                message: format!("change {} has no current patch set", api.id),
            });
        };

        let approvals = patch_set
            .approvals
            .into_iter()
            .filter_map(|approval| {
                approval.granted_on.map(|granted_on| Approval {
                    kind: approval.kind,
                    granted_on,
                })
            })
            .collect();

        let comments = api
            .comments
            .into_iter()
            .map(|comment| ReviewerComment {
                author: comment
                    .reviewer
                    .name
                    .or(comment.reviewer.username)
                    .unwrap_or_default(),
                message: comment.message,
                timestamp: comment.timestamp,
            })
            .collect();

        Ok(Self {
            id: api.id,
            number: api.number,
            project: api.project,
            created_on: api.created_on,
            last_updated: api.last_updated,
            current_patch_set: patch_set.number,
            approvals,
            comments,
        })
    }
}
