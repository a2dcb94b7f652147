//! Local clones of remote repositories and file enumeration over them.

use std::path::{Component, Path, PathBuf};

use tokio::process::Command;

use crate::error::{IndexError, Result};
use crate::languages::is_code_file;

/// Directory names never descended into.
pub const IGNORED_DIRS: &[&str] = &["node_modules", "dist", "build", ".git"];

/// A fetched repository clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedRepo {
    pub local_path: PathBuf,
    pub repo_name: String,
}

/// Manages clones under a single storage directory, keyed by repository name.
#[derive(Debug, Clone)]
pub struct RepoFetcher {
    base_dir: PathBuf,
}

impl RepoFetcher {
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Create the storage directory if missing.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the directory cannot be created.
    pub async fn init(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.base_dir).await?;
        Ok(())
    }

    /// Clone `url` into the storage directory, or pull if a clone already exists.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidUrl`] when no name can be derived and
    /// [`IndexError::Git`] when git exits unsuccessfully.
    pub async fn fetch(&self, url: &str) -> Result<FetchedRepo> {
        let repo_name = repo_name_from_url(url)?;
        let local_path = self.base_dir.join(&repo_name);

        if tokio::fs::try_exists(&local_path).await? {
            tracing::info!(repo = %repo_name, "pulling existing clone");
            run_git("pull", Command::new("git").arg("pull").current_dir(&local_path)).await?;
        } else {
            tracing::info!(repo = %repo_name, url, "cloning repository");
            run_git(
                "clone",
                Command::new("git").arg("clone").arg(url).arg(&local_path),
            )
            .await?;
        }

        Ok(FetchedRepo {
            local_path,
            repo_name,
        })
    }

    /// Path of an existing clone.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::NotFound`] when no clone exists for `name`.
    pub async fn repo_path(&self, name: &str) -> Result<PathBuf> {
        validate_repo_name(name)?;
        let path = self.base_dir.join(name);
        if tokio::fs::try_exists(&path).await? {
            Ok(path)
        } else {
            Err(IndexError::NotFound(format!("repository {name}")))
        }
    }

    /// Delete the local clone. Returns `false` when there was nothing to delete.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the directory exists but cannot be removed.
    pub async fn remove(&self, name: &str) -> Result<bool> {
        validate_repo_name(name)?;
        let path = self.base_dir.join(name);
        if !tokio::fs::try_exists(&path).await? {
            return Ok(false);
        }
        tokio::fs::remove_dir_all(&path).await?;
        tracing::info!(repo = %name, "removed local clone");
        Ok(true)
    }
}

async fn run_git(command: &'static str, cmd: &mut Command) -> Result<()> {
    let output = cmd.output().await?;
    if output.status.success() {
        return Ok(());
    }
    Err(IndexError::Git {
        command,
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
    })
}

/// `https://host/owner/repo.git` becomes `owner_repo`.
///
/// # Errors
///
/// Returns [`IndexError::InvalidUrl`] if the URL has fewer than two path segments.
pub fn repo_name_from_url(url: &str) -> Result<String> {
    let segments: Vec<&str> = url.trim().trim_end_matches('/').split('/').collect();
    if segments.len() < 2 {
        return Err(IndexError::InvalidUrl(url.to_owned()));
    }
    let name = segments[segments.len() - 2..].join("_").replacen(".git", "", 1);
    validate_repo_name(&name).map_err(|_| IndexError::InvalidUrl(url.to_owned()))?;
    Ok(name)
}

fn validate_repo_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
    {
        return Err(IndexError::InvalidPath(name.to_owned()));
    }
    Ok(())
}

/// `/`-separated path of `path` relative to `root`.
#[must_use]
pub fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn walk(root: &Path, keep: impl Fn(&Path) -> bool) -> Vec<String> {
    let mut files: Vec<String> = ignore::WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .ignore(false)
        .parents(false)
        .filter_entry(|e| {
            e.file_name()
                .to_str()
                .is_none_or(|name| !IGNORED_DIRS.contains(&name))
        })
        .build()
        .flatten()
        .filter(|e| e.file_type().is_some_and(|ft| ft.is_file()) && keep(e.path()))
        .map(|e| relative_path(root, e.path()))
        .collect();
    files.sort();
    files
}

/// Code files under `root`, relative and sorted.
#[must_use]
pub fn code_files(root: &Path) -> Vec<String> {
    walk(root, is_code_file)
}

/// Every non-ignored file under `root`, relative and sorted.
#[must_use]
pub fn list_files(root: &Path) -> Vec<String> {
    walk(root, |_| true)
}

/// Resolve `rel` inside `root`, refusing absolute paths and `..` components.
///
/// # Errors
///
/// Returns [`IndexError::InvalidPath`] if `rel` would escape `root`.
pub fn resolve_in_root(root: &Path, rel: &str) -> Result<PathBuf> {
    let rel_path = Path::new(rel);
    let escapes = rel_path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if rel.is_empty() || escapes {
        return Err(IndexError::InvalidPath(rel.to_owned()));
    }
    Ok(root.join(rel_path))
}

/// Read a file inside a repository clone as UTF-8 (lossy).
///
/// # Errors
///
/// Returns [`IndexError::NotFound`] when the file is missing and
/// [`IndexError::InvalidPath`] when `rel` escapes the root.
pub async fn read_file(root: &Path, rel: &str) -> Result<String> {
    let path = resolve_in_root(root, rel)?;
    match tokio::fs::read(&path).await {
        Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(IndexError::NotFound(format!("file {rel}")))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "src/main.ts", "import './util';");
        write(root, "src/util.ts", "export const x = 1;");
        write(root, "lib/core.py", "def f(): pass");
        write(root, "README.md", "# readme");
        write(root, "node_modules/pkg/index.js", "module.exports = 1;");
        write(root, "dist/bundle.js", "bundled");
        write(root, "build/out.c", "int main() {}");
        write(root, ".hidden/secret.rs", "fn main() {}");
        write(root, ".env.js", "hidden");
        write(root, "web/.git/hooks/pre.js", "hook");
        dir
    }

    #[test]
    fn repo_name_from_https_url() {
        assert_eq!(
            repo_name_from_url("https://github.com/acme/app.git").unwrap(),
            "acme_app"
        );
        assert_eq!(
            repo_name_from_url("https://github.com/acme/app").unwrap(),
            "acme_app"
        );
        assert_eq!(
            repo_name_from_url("https://github.com/Acme/App/").unwrap(),
            "Acme_App"
        );
    }

    #[test]
    fn repo_name_removes_only_first_git() {
        assert_eq!(
            repo_name_from_url("https://host/acme.github.io/site.git").unwrap(),
            "acmehub.io_site.git"
        );
    }

    #[test]
    fn repo_name_rejects_single_segment() {
        assert!(matches!(
            repo_name_from_url("app"),
            Err(IndexError::InvalidUrl(_))
        ));
    }

    #[test]
    fn code_files_skip_ignored_and_hidden() {
        let dir = fixture();
        assert_eq!(
            code_files(dir.path()),
            ["lib/core.py", "src/main.ts", "src/util.ts"]
        );
    }

    #[test]
    fn list_files_includes_non_code() {
        let dir = fixture();
        assert_eq!(
            list_files(dir.path()),
            ["README.md", "lib/core.py", "src/main.ts", "src/util.ts"]
        );
    }

    #[tokio::test]
    async fn read_file_ok_missing_and_escaping() {
        let dir = fixture();
        assert_eq!(
            read_file(dir.path(), "src/util.ts").await.unwrap(),
            "export const x = 1;"
        );
        assert!(matches!(
            read_file(dir.path(), "src/nope.ts").await,
            Err(IndexError::NotFound(_))
        ));
        assert!(matches!(
            read_file(dir.path(), "../etc/passwd").await,
            Err(IndexError::InvalidPath(_))
        ));
        assert!(matches!(
            read_file(dir.path(), "/etc/passwd").await,
            Err(IndexError::InvalidPath(_))
        ));
    }

    #[tokio::test]
    async fn repo_path_and_remove() {
        let storage = tempfile::tempdir().unwrap();
        let fetcher = RepoFetcher::new(storage.path().join("repos"));
        fetcher.init().await.unwrap();

        assert!(matches!(
            fetcher.repo_path("acme_app").await,
            Err(IndexError::NotFound(_))
        ));

        write(&storage.path().join("repos"), "acme_app/src/a.rs", "fn a() {}");
        let path = fetcher.repo_path("acme_app").await.unwrap();
        assert!(path.ends_with("acme_app"));

        assert!(fetcher.remove("acme_app").await.unwrap());
        assert!(!fetcher.remove("acme_app").await.unwrap());
    }

    #[tokio::test]
    async fn repo_path_rejects_traversal() {
        let fetcher = RepoFetcher::new("/tmp/sidekick-test-repos");
        assert!(matches!(
            fetcher.repo_path("..").await,
            Err(IndexError::InvalidPath(_))
        ));
        assert!(matches!(
            fetcher.repo_path("a/b").await,
            Err(IndexError::InvalidPath(_))
        ));
    }

    #[tokio::test]
    async fn fetch_clones_then_pulls_local_repository() {
        let has_git = std::process::Command::new("git")
            .arg("--version")
            .output()
            .is_ok_and(|o| o.status.success());
        if !has_git {
            return;
        }

        let upstream = tempfile::tempdir().unwrap();
        let origin = upstream.path().join("acme").join("app");
        write(&origin, "src/lib.rs", "pub fn hello() {}\n");
        let git = |args: &[&str]| {
            std::process::Command::new("git")
                .args(args)
                .current_dir(&origin)
                .output()
                .unwrap()
        };
        git(&["init", "-q"]);
        git(&["add", "."]);
        git(&[
            "-c",
            "user.name=t",
            "-c",
            "user.email=t@example.com",
            "commit",
            "-q",
            "-m",
            "init",
        ]);

        let storage = tempfile::tempdir().unwrap();
        let fetcher = RepoFetcher::new(storage.path());
        let url = origin.to_string_lossy().into_owned();

        let fetched = fetcher.fetch(&url).await.unwrap();
        assert_eq!(fetched.repo_name, "acme_app");
        assert!(fetched.local_path.join("src/lib.rs").exists());

        let again = fetcher.fetch(&url).await.unwrap();
        assert_eq!(again, fetched);
    }

    #[tokio::test]
    async fn fetch_surfaces_git_failure() {
        let storage = tempfile::tempdir().unwrap();
        let fetcher = RepoFetcher::new(storage.path());
        let missing = storage.path().join("nowhere").join("repo");
        let result = fetcher.fetch(&missing.to_string_lossy()).await;
        assert!(matches!(
            result,
            Err(IndexError::Git { .. } | IndexError::Io(_))
        ));
    }
}
