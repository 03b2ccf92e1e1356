/// Staged diff retrieval.
pub(crate) mod diff;

/// Applying the final message as a commit.
pub(crate) mod commit;

pub(crate) use commit::{CommitExecutor, GitCommitExecutor};
pub(crate) use diff::{DiffSource, GitDiffSource};
