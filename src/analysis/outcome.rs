//! CI outcome extraction from review comments.
//!
//! Zuul reports each pipeline run as a review comment such as
//! `Patch Set 3: Verified-1\n\nBuild failed (check pipeline). ...`. The
//! [`OutcomeGrammar`] trait isolates how such text is read so the counting
//! rules in [`OutcomeExtractor`] stay independent of the message format.

use std::sync::LazyLock;

use regex::Regex;

use crate::gerrit::Change;

/// Name of the account that posts CI results on OpenDev's Gerrit.
pub const DEFAULT_CI_IDENTITY: &str = "zuul";

#[expect(clippy::expect_used, reason = "pattern is a compile-time constant")]
static PATCH_SET_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Patch Set (\d+):").expect("patch set pattern is valid"));

#[expect(clippy::expect_used, reason = "pattern is a compile-time constant")]
static BUILD_FAILED_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Build failed \(\w+ pipeline\)").expect("build failure pattern is valid")
});

/// Reads CI annotations out of free-text comment messages.
pub trait OutcomeGrammar {
    /// Returns the patch set a message refers to, if it names one.
    fn patch_set_number(&self, message: &str) -> Option<u32>;

    /// Returns true when the message reports a failed build.
    fn has_failure_marker(&self, message: &str) -> bool;
}

/// Grammar for Zuul's `Patch Set N:` / `Build failed (<pipeline> pipeline)`
/// comment format.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZuulGrammar;

impl OutcomeGrammar for ZuulGrammar {
    fn patch_set_number(&self, message: &str) -> Option<u32> {
        PATCH_SET_REGEX
            .captures(message)
            .and_then(|captures| captures.get(1))
            .and_then(|number| number.as_str().parse().ok())
    }

    fn has_failure_marker(&self, message: &str) -> bool {
        BUILD_FAILED_REGEX.is_match(message)
    }
}

/// Counts failed CI builds reported against a change's final patch set.
#[derive(Debug, Clone)]
pub struct OutcomeExtractor<Grammar = ZuulGrammar>
where
    Grammar: OutcomeGrammar,
{
    ci_identity: String,
    grammar: Grammar,
}

impl Default for OutcomeExtractor<ZuulGrammar> {
    fn default() -> Self {
        Self::new(DEFAULT_CI_IDENTITY, ZuulGrammar)
    }
}

impl<Grammar> OutcomeExtractor<Grammar>
where
    Grammar: OutcomeGrammar,
{
    /// Creates an extractor counting comments by `ci_identity` (compared
    /// case-insensitively) and reading them with `grammar`.
    #[must_use]
    pub fn new(ci_identity: impl Into<String>, grammar: Grammar) -> Self {
        Self {
            ci_identity: ci_identity.into(),
            grammar,
        }
    }

    /// Returns the CI account name comments are filtered on.
    #[must_use]
    pub fn ci_identity(&self) -> &str {
        self.ci_identity.as_str()
    }

    /// Returns true when `author` is the CI account.
    #[must_use]
    pub fn is_ci_author(&self, author: &str) -> bool {
        author.to_lowercase() == self.ci_identity.to_lowercase()
    }

    /// Counts the CI comments on `change` that refer to its current patch set
    /// and report a failed build.
    ///
    /// Every such comment counts, including back-to-back failures left by
    /// rechecks on the same patch set. Comments without a patch set marker
    /// are skipped.
    #[must_use]
    pub fn extract(&self, change: &Change) -> u32 {
        let mut build_failures = 0_u32;

        for comment in &change.comments {
            if !self.is_ci_author(&comment.author) {
                continue;
            }

            let Some(patch_set) = self.grammar.patch_set_number(&comment.message) else {
                tracing::debug!("no patch set found for comment: {}", comment.message);
                continue;
            };
            if patch_set != change.current_patch_set {
                tracing::debug!(
                    "comment on {} was for patch set {patch_set}, not {}; skipping",
                    change.id,
                    change.current_patch_set
                );
                continue;
            }

            if self.grammar.has_failure_marker(&comment.message) {
                build_failures = build_failures.saturating_add(1);
            }
        }

        build_failures
    }
}
