use std::path::{Path, PathBuf};

use git2::{
    DiffDelta, DiffFindOptions, DiffFormat, DiffOptions, ErrorCode, Pathspec, PathspecFlags,
    Repository, Tree,
};
use tracing::{debug, trace, warn};

use crate::AppResult;

/// Produces the staged changes as patch text.
pub trait DiffSource {
    /// `None` when there is no repository; an empty string when nothing is staged.
    async fn staged_diff(&self) -> AppResult<Option<String>>;
}

/// Reads the index of the repository containing `workdir` with libgit2.
#[derive(Debug, Clone)]
pub struct GitDiffSource {
    workdir: PathBuf,
    exclude: Vec<String>,
}

impl GitDiffSource {
    pub fn new<P: Into<PathBuf>>(workdir: P, exclude: Vec<String>) -> Self {
        Self {
            workdir: workdir.into(),
            exclude,
        }
    }
}

impl DiffSource for GitDiffSource {
    #[tracing::instrument(name = "Reading staged changes", level = "info", skip(self))]
    async fn staged_diff(&self) -> AppResult<Option<String>> {
        let repo = match Repository::discover(&self.workdir) {
            Ok(repo) => repo,
            Err(e) if e.code() == ErrorCode::NotFound => {
                warn!("Warning: Not a git repository.");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Some(staged_diff_text(&repo, &self.exclude)?))
    }
}

#[tracing::instrument(level = "trace")]
fn get_diff_opts() -> DiffOptions {
    let mut opts = DiffOptions::new();
    opts.include_typechange(true)
        .ignore_submodules(false)
        .ignore_filemode(false)
        .skip_binary_check(false)
        .force_text(false)
        .context_lines(3)
        .indent_heuristic(true);
    opts
}

/// Tree of the commit HEAD points at, or `None` on an unborn branch.
fn head_tree(repo: &Repository) -> AppResult<Option<Tree<'_>>> {
    if let Ok(head) = repo.head()
        && let Some(oid) = head.target()
    {
        let commit = repo.find_commit(oid)?;
        return Ok(Some(commit.tree()?));
    }
    Ok(None)
}

fn delta_matches(spec: &Pathspec, delta: &DiffDelta) -> bool {
    let matches = |path: Option<&Path>| {
        path.map(|p| spec.matches_path(p, PathspecFlags::DEFAULT))
            .unwrap_or(false)
    };
    matches(delta.new_file().path()) || matches(delta.old_file().path())
}

/// Render the HEAD-to-index diff as unified patch text, leaving out every
/// file matched by one of the `exclude` pathspecs.
pub fn staged_diff_text(repo: &Repository, exclude: &[String]) -> AppResult<String> {
    let head_tree = head_tree(repo)?;
    let index = repo.index()?;
    let mut diff =
        repo.diff_tree_to_index(head_tree.as_ref(), Some(&index), Some(&mut get_diff_opts()))?;
    diff.find_similar(Some(DiffFindOptions::new().renames(true)))?;

    let excluded = if exclude.is_empty() {
        None
    } else {
        Some(Pathspec::new(exclude.iter().map(String::as_str))?)
    };

    let mut out = String::new();
    let mut skipped = 0usize;
    let mut last_skipped: Option<PathBuf> = None;
    diff.print(DiffFormat::Patch, |delta, _hunk, line| {
        if let Some(spec) = &excluded
            && delta_matches(spec, &delta)
        {
            let path = delta.new_file().path().map(Path::to_path_buf);
            if last_skipped != path {
                trace!("Excluding {:?} from the diff", path);
                skipped += 1;
                last_skipped = path;
            }
            return true;
        }
        if matches!(line.origin(), '+' | '-' | ' ') {
            out.push(line.origin());
        }
        out.push_str(&String::from_utf8_lossy(line.content()));
        true
    })?;

    debug!(
        "Staged diff: {} file(s), {} excluded, {} bytes",
        diff.deltas().len(),
        skipped,
        out.len()
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::Signature;
    use std::fs;
    use tempfile::TempDir;

    fn init_repo() -> (TempDir, Repository) {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        (dir, repo)
    }

    fn stage(repo: &Repository, dir: &TempDir, name: &str, contents: &str) {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, contents).unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new(name)).unwrap();
        index.write().unwrap();
    }

    fn commit_index(repo: &Repository, message: &str) {
        let mut index = repo.index().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = Signature::now("Test", "test@example.com").unwrap();
        let parents = match repo.head() {
            Ok(head) => vec![repo.find_commit(head.target().unwrap()).unwrap()],
            Err(_) => vec![],
        };
        let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)
            .unwrap();
    }

    #[test]
    fn new_file_on_unborn_branch() {
        let (dir, repo) = init_repo();
        stage(&repo, &dir, "hello.txt", "hello\n");
        let diff = staged_diff_text(&repo, &[]).unwrap();
        assert!(diff.contains("diff --git a/hello.txt b/hello.txt"), "{diff}");
        assert!(diff.contains("+hello\n"), "{diff}");
    }

    #[test]
    fn nothing_staged_is_empty() {
        let (_dir, repo) = init_repo();
        assert_eq!(staged_diff_text(&repo, &[]).unwrap(), "");
    }

    #[test]
    fn modification_against_head() {
        let (dir, repo) = init_repo();
        stage(&repo, &dir, "a.txt", "one\ntwo\n");
        commit_index(&repo, "init");
        stage(&repo, &dir, "a.txt", "one\nthree\n");
        let diff = staged_diff_text(&repo, &[]).unwrap();
        assert!(diff.contains("-two\n"), "{diff}");
        assert!(diff.contains("+three\n"), "{diff}");
        assert!(diff.contains(" one\n"), "{diff}");
    }

    #[test]
    fn unstaged_edits_are_ignored() {
        let (dir, repo) = init_repo();
        stage(&repo, &dir, "a.txt", "one\n");
        commit_index(&repo, "init");
        fs::write(dir.path().join("a.txt"), "changed\n").unwrap();
        assert_eq!(staged_diff_text(&repo, &[]).unwrap(), "");
    }

    #[test]
    fn exclude_patterns_drop_matching_files() {
        let (dir, repo) = init_repo();
        stage(&repo, &dir, "src/main.rs", "fn main() {}\n");
        stage(&repo, &dir, "Cargo.lock", "# generated\n");
        stage(&repo, &dir, "dist/bundle.js", "minified\n");
        let diff =
            staged_diff_text(&repo, &["Cargo.lock".to_string(), "dist".to_string()]).unwrap();
        assert!(diff.contains("src/main.rs"), "{diff}");
        assert!(!diff.contains("Cargo.lock"), "{diff}");
        assert!(!diff.contains("bundle.js"), "{diff}");
    }

    #[test]
    fn glob_excludes() {
        let (dir, repo) = init_repo();
        stage(&repo, &dir, "keep.rs", "kept\n");
        stage(&repo, &dir, "package-lock.json", "{}\n");
        let diff = staged_diff_text(&repo, &["*.json".to_string()]).unwrap();
        assert!(diff.contains("keep.rs"), "{diff}");
        assert!(!diff.contains("package-lock.json"), "{diff}");
    }

    #[tokio::test]
    async fn source_reads_from_a_subdirectory() {
        let (dir, repo) = init_repo();
        stage(&repo, &dir, "nested/file.txt", "content\n");
        let source = GitDiffSource::new(dir.path().join("nested"), vec![]);
        let diff = source.staged_diff().await.unwrap().unwrap();
        assert!(diff.contains("+content"), "{diff}");
    }
}
