use std::path::PathBuf;

use tokio::process::Command;
use tracing::{debug, info};

use crate::{AppError, AppResult};

/// Records the staged changes as a commit.
pub trait CommitExecutor {
    async fn commit(&self, message: &str) -> AppResult<()>;
}

/// Quote `s` as a single POSIX shell word.
///
/// Every `'` becomes `'\''`, so the result survives `sh -c` unchanged.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Runs `git commit -m` through the shell so the user's hooks and signing
/// configuration apply.
#[derive(Debug, Clone)]
pub struct GitCommitExecutor {
    workdir: PathBuf,
}

impl GitCommitExecutor {
    pub fn new<P: Into<PathBuf>>(workdir: P) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }
}

impl CommitExecutor for GitCommitExecutor {
    #[tracing::instrument(name = "Committing", level = "info", skip_all)]
    async fn commit(&self, message: &str) -> AppResult<()> {
        let command = format!("git commit -m {}", shell_quote(message));
        debug!("Running: {command}");

        let output = Command::new("sh")
            .arg("-c")
            .arg(&command)
            .current_dir(&self.workdir)
            .output()
            .await
            .map_err(|e| AppError::CommitExecution {
                message: message.to_string(),
                detail: format!("failed to run git: {e}"),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let detail = [stderr.trim(), stdout.trim()]
                .into_iter()
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join("\n");
            return Err(AppError::CommitExecution {
                message: message.to_string(),
                detail: if detail.is_empty() {
                    format!("git commit exited with {}", output.status)
                } else {
                    detail
                },
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if let Some(summary) = stdout.lines().next() {
            info!("{summary}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::Repository;
    use std::path::Path;
    use tempfile::TempDir;

    async fn echo_through_shell(s: &str) -> String {
        let output = Command::new("sh")
            .arg("-c")
            .arg(format!("printf %s {}", shell_quote(s)))
            .output()
            .await
            .unwrap();
        String::from_utf8(output.stdout).unwrap()
    }

    #[test]
    fn quotes_single_quotes() {
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote(""), "''");
    }

    #[tokio::test]
    async fn quoted_text_survives_the_shell() {
        for s in [
            "feat(cli): add flag",
            "fix: don't break on 'quotes'",
            "docs: mention $HOME and `ticks` and \"doubles\"",
            "refactor: split\n\n- one\n- two",
            "chore: a; rm -rf nothing && echo | cat",
        ] {
            assert_eq!(echo_through_shell(s).await, s);
        }
    }

    fn repo_with_identity() -> (TempDir, Repository) {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        {
            let mut config = repo.config().unwrap();
            config.set_str("user.name", "Test").unwrap();
            config.set_str("user.email", "test@example.com").unwrap();
            config.set_bool("commit.gpgsign", false).unwrap();
        }
        (dir, repo)
    }

    #[tokio::test]
    async fn nothing_staged_is_a_commit_failure() {
        let (dir, _repo) = repo_with_identity();
        let executor = GitCommitExecutor::new(dir.path());
        match executor.commit("feat: nothing").await {
            Err(AppError::CommitExecution { message, .. }) => assert_eq!(message, "feat: nothing"),
            other => panic!("expected commit failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn commits_the_exact_message() {
        let (dir, repo) = repo_with_identity();
        std::fs::write(dir.path().join("a.txt"), "a\n").unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new("a.txt")).unwrap();
        index.write().unwrap();

        let message = "fix(core): don't drop 'quoted' input\n\n- handle $VARS";
        GitCommitExecutor::new(dir.path())
            .commit(message)
            .await
            .unwrap();

        let head = repo.head().unwrap().peel_to_commit().unwrap();
        assert_eq!(head.message().unwrap().trim_end(), message);
    }
}
