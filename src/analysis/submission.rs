//! Resolution of the moment a change was submitted.

use crate::gerrit::Change;
use crate::gerrit::models::SUBMIT_APPROVAL;

/// Returns the Unix timestamp at which `change` was submitted.
///
/// The first `SUBM` approval wins. Changes without approvals, and the odd
/// merged change Gerrit reports without a submit record, fall back to their
/// last-updated time.
#[must_use]
pub fn resolve_submission(change: &Change) -> i64 {
    change
        .approvals
        .iter()
        .find(|approval| approval.kind == SUBMIT_APPROVAL)
        .map_or(change.last_updated, |approval| approval.granted_on)
}
