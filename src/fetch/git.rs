//! Git fetcher backed by libgit2
//!
//! Authentication is delegated to git's native credential system:
//! - SSH agent and keys from ~/.ssh/
//! - Git credential helpers

use std::borrow::Cow;
use std::path::Path;

use git2::{
    Cred, CredentialType, ErrorClass, FetchOptions, RemoteCallbacks, Repository,
    build::{CheckoutBuilder, RepoBuilder},
};
use tracing::{debug, info};

use crate::error::Result;
use crate::error::backend::fetch_failed;

use super::{FetchRequest, Fetched, Fetcher, scheme};

const ACCEPTED_SCHEMES: &[&str] = &["file", "git", "ssh", "git+ssh", "http", "https"];

pub struct GitFetcher;

impl Fetcher for GitFetcher {
    fn name(&self) -> &'static str {
        "git"
    }

    fn metadata_dir(&self) -> Option<&'static str> {
        Some(".git")
    }

    fn is_valid_src_uri(&self, uri: &str) -> bool {
        match scheme(uri) {
            Some(scheme) => ACCEPTED_SCHEMES.contains(&scheme),
            None => Path::new(uri).is_absolute() || is_scp_like(uri),
        }
    }

    fn fetch(&self, request: &FetchRequest<'_>) -> Result<Fetched> {
        if !self.is_valid_src_uri(request.uri) {
            return Err(crate::error::backend::invalid_uri(self.name(), request.uri));
        }
        info!(uri = %request.uri, dest = %request.dest.display(), "git clone");

        let mut builder = RepoBuilder::new();
        builder.fetch_options(fetch_options());
        let url = normalize_ssh_url(request.uri);
        let repo = builder
            .clone(url.as_ref(), request.dest)
            .map_err(|e| fetch_failed(request.uri, interpret_git_error(&e)))?;

        if let Some(revision) = request.revision {
            let sha = resolve_ref(&repo, Some(revision)).map_err(|e| fetch_failed(request.uri, e))?;
            checkout_commit(&repo, &sha).map_err(|e| fetch_failed(request.uri, e))?;
        }
        Ok(Fetched::Tree(request.dest.to_path_buf()))
    }

    fn update(&self, dest: &Path, uri: Option<&str>, revision: Option<&str>) -> Result<()> {
        let location = uri.map_or_else(|| dest.display().to_string(), str::to_string);
        let fail = |reason: String| fetch_failed(&location, reason);

        let repo = Repository::open(dest).map_err(|e| fail(e.message().to_string()))?;
        info!(dest = %dest.display(), "git fetch");
        {
            let mut remote = match uri {
                Some(uri) => repo.remote_anonymous(normalize_ssh_url(uri).as_ref()),
                None => repo.find_remote("origin"),
            }
            .map_err(|e| fail(e.message().to_string()))?;
            remote
                .fetch(
                    &[
                        "+refs/heads/*:refs/remotes/origin/*",
                        "+refs/tags/*:refs/tags/*",
                    ],
                    Some(&mut fetch_options()),
                    None,
                )
                .map_err(|e| fail(interpret_git_error(&e)))?;
        }

        if let Some(revision) = revision {
            let sha = resolve_ref(&repo, Some(revision)).map_err(fail)?;
            return checkout_commit(&repo, &sha).map_err(fail);
        }

        match head_branch(&repo) {
            Some(branch) => {
                let upstream = format!("refs/remotes/origin/{branch}");
                let sha = resolve_ref(&repo, Some(&upstream)).map_err(fail)?;
                fast_forward(&repo, &branch, &sha).map_err(fail)
            }
            None => {
                debug!(dest = %dest.display(), "detached HEAD, nothing to fast-forward");
                Ok(())
            }
        }
    }
}

/// `user@host:path`, the scp-like syntax git accepts for ssh
fn is_scp_like(uri: &str) -> bool {
    match uri.split_once(':') {
        Some((host, path)) => {
            host.contains('@') && !host.contains('/') && !path.is_empty()
        }
        None => false,
    }
}

/// Normalize SCP-style SSH URLs (git@host:path) to ssh://git@host/path
///
/// libgit2 handles the explicit form more reliably.
fn normalize_ssh_url(url: &str) -> Cow<'_, str> {
    if scheme(url).is_some() || !is_scp_like(url) {
        return Cow::Borrowed(url);
    }
    match url.split_once(':') {
        Some((host, path)) if path.starts_with('/') => Cow::Owned(format!("ssh://{host}{path}")),
        Some((host, path)) => Cow::Owned(format!("ssh://{host}/{path}")),
        None => Cow::Borrowed(url),
    }
}

fn fetch_options() -> FetchOptions<'static> {
    let mut callbacks = RemoteCallbacks::new();
    setup_auth_callbacks(&mut callbacks);
    let mut options = FetchOptions::new();
    options.remote_callbacks(callbacks);
    options
}

/// Interpret a git2 error and provide a more user-friendly message
fn interpret_git_error(err: &git2::Error) -> String {
    let message = err.message().to_lowercase();

    if message.contains("not found") || message.contains("404") {
        "Repository not found".to_string()
    } else if message.contains("authentication") || message.contains("credentials") {
        "Authentication failed".to_string()
    } else if message.contains("permission denied") || message.contains("access denied") {
        "Permission denied".to_string()
    } else if message.contains("connection")
        || message.contains("network")
        || message.contains("timed out")
    {
        format!("Network error: {}", err.message())
    } else if err.class() == ErrorClass::Ssh {
        format!("SSH error: {}", err.message())
    } else {
        err.message().to_string()
    }
}

/// Resolve a ref (branch, tag, remote branch or SHA) to a full SHA
///
/// Defaults to HEAD.
fn resolve_ref(repo: &Repository, git_ref: Option<&str>) -> std::result::Result<String, String> {
    let Some(refname) = git_ref else {
        let head = repo
            .head()
            .and_then(|head| head.peel_to_commit())
            .map_err(|e| format!("Could not resolve HEAD: {}", e.message()))?;
        return Ok(head.id().to_string());
    };

    let candidates = [
        refname.to_string(),
        format!("refs/heads/{refname}"),
        format!("refs/tags/{refname}"),
        format!("refs/remotes/origin/{refname}"),
    ];
    for candidate in &candidates {
        if let Ok(commit) = repo
            .find_reference(candidate)
            .and_then(|reference| reference.peel_to_commit())
        {
            return Ok(commit.id().to_string());
        }
    }

    repo.revparse_single(refname)
        .and_then(|obj| obj.peel_to_commit())
        .map(|commit| commit.id().to_string())
        .map_err(|_| format!("Could not resolve revision '{refname}'"))
}

/// Force the working tree to `sha` and detach HEAD there
fn checkout_commit(repo: &Repository, sha: &str) -> std::result::Result<(), String> {
    let checkout = || -> std::result::Result<(), git2::Error> {
        let commit = repo.find_commit(git2::Oid::from_str(sha)?)?;
        repo.checkout_tree(commit.as_object(), Some(CheckoutBuilder::new().force()))?;
        repo.set_head_detached(commit.id())
    };
    checkout().map_err(|e| format!("Failed to checkout {sha}: {}", e.message()))
}

/// Move local `branch` to `sha` and check it out
fn fast_forward(repo: &Repository, branch: &str, sha: &str) -> std::result::Result<(), String> {
    let update = || -> std::result::Result<(), git2::Error> {
        let commit = repo.find_commit(git2::Oid::from_str(sha)?)?;
        repo.checkout_tree(commit.as_object(), Some(CheckoutBuilder::new().force()))?;
        let refname = format!("refs/heads/{branch}");
        repo.reference(&refname, commit.id(), true, "minimerge: fast-forward")?;
        repo.set_head(&refname)
    };
    update().map_err(|e| format!("Failed to update {branch}: {}", e.message()))
}

/// Branch HEAD points to, `None` when detached
fn head_branch(repo: &Repository) -> Option<String> {
    let head = repo.head().ok()?;
    if head.is_branch() {
        head.shorthand().map(str::to_string)
    } else {
        None
    }
}

/// Delegate authentication to git's native credential system
fn setup_auth_callbacks(callbacks: &mut RemoteCallbacks<'_>) {
    callbacks.credentials(|url, username_from_url, allowed_types| {
        if allowed_types.contains(CredentialType::DEFAULT) {
            return Cred::default();
        }

        if allowed_types.contains(CredentialType::SSH_KEY) {
            if let Some(username) = username_from_url {
                if let Ok(cred) = Cred::ssh_key_from_agent(username) {
                    return Ok(cred);
                }

                let ssh_dir = dirs::home_dir().unwrap_or_default().join(".ssh");
                for key_name in ["id_ed25519", "id_rsa", "id_ecdsa"] {
                    let private_key = ssh_dir.join(key_name);
                    let public_key = ssh_dir.join(format!("{key_name}.pub"));
                    if !private_key.exists() {
                        continue;
                    }
                    let public_key = public_key.exists().then_some(public_key.as_path());
                    if let Ok(cred) = Cred::ssh_key(username, public_key, &private_key, None) {
                        return Ok(cred);
                    }
                }
            }
        }

        if allowed_types.contains(CredentialType::USER_PASS_PLAINTEXT) {
            if let Ok(config) = git2::Config::open_default() {
                if let Ok(cred) = Cred::credential_helper(&config, url, username_from_url) {
                    return Ok(cred);
                }
            }
            // public HTTPS repositories still go through this path
            return Cred::userpass_plaintext(username_from_url.unwrap_or(""), "");
        }

        Err(git2::Error::new(
            git2::ErrorCode::Auth,
            git2::ErrorClass::Http,
            "authentication failed",
        ))
    });
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Commit `file` with `content` on the current branch of `repo`
    fn commit_file(repo: &Repository, file: &str, content: &str) -> git2::Oid {
        let workdir = repo.workdir().expect("non-bare");
        std::fs::write(workdir.join(file), content).expect("write");
        let mut index = repo.index().expect("index");
        index.add_path(Path::new(file)).expect("add");
        index.write().expect("write index");
        let tree = repo.find_tree(index.write_tree().expect("tree")).expect("find tree");
        let sig = git2::Signature::now("Test", "test@test.com").expect("signature");
        let parents = match repo.head().ok().and_then(|h| h.peel_to_commit().ok()) {
            Some(parent) => vec![parent],
            None => vec![],
        };
        let parents: Vec<&git2::Commit<'_>> = parents.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, file, &tree, &parents)
            .expect("commit")
    }

    #[test]
    fn test_uri_validation() {
        let fetcher = GitFetcher;
        assert!(fetcher.is_valid_src_uri("https://example.org/repo.git"));
        assert!(fetcher.is_valid_src_uri("git@example.org:team/repo.git"));
        assert!(fetcher.is_valid_src_uri("/srv/git/repo"));
        assert!(!fetcher.is_valid_src_uri("svn://example.org/repo"));
        assert!(!fetcher.is_valid_src_uri("relative/path"));
    }

    #[test]
    fn test_normalize_ssh_url() {
        assert_eq!(
            normalize_ssh_url("git@github.com:user/repo.git"),
            "ssh://git@github.com/user/repo.git"
        );
        assert_eq!(
            normalize_ssh_url("git@github.com:/abs/repo.git"),
            "ssh://git@github.com/abs/repo.git"
        );
        assert_eq!(
            normalize_ssh_url("https://github.com/user/repo.git"),
            "https://github.com/user/repo.git"
        );
    }

    #[test]
    fn test_fetch_then_update_local_repository() {
        let upstream_dir = TempDir::new().expect("temp dir");
        let upstream = Repository::init(upstream_dir.path()).expect("init");
        let first = commit_file(&upstream, "README", "first");

        let work = TempDir::new().expect("temp dir");
        let dest = work.path().join("dependencies").join("pkg");
        let uri = upstream_dir.path().display().to_string();
        let request = FetchRequest {
            uri: &uri,
            dest: &dest,
            downloads: work.path(),
            revision: None,
        };

        let fetcher = GitFetcher;
        assert!(!fetcher.is_fetched(&dest));
        assert_eq!(
            fetcher.fetch_or_update(&request).expect("clone"),
            Fetched::Tree(dest.clone())
        );
        assert!(fetcher.is_fetched(&dest));
        assert_eq!(std::fs::read_to_string(dest.join("README")).expect("read"), "first");

        commit_file(&upstream, "NEWS", "second");
        fetcher.fetch_or_update(&request).expect("update");
        assert!(dest.join("NEWS").exists());

        fetcher
            .update(&dest, None, Some(&first.to_string()))
            .expect("checkout pinned revision");
        assert!(!dest.join("NEWS").exists());
    }

    #[test]
    fn test_fetch_pinned_revision() {
        let upstream_dir = TempDir::new().expect("temp dir");
        let upstream = Repository::init(upstream_dir.path()).expect("init");
        let first = commit_file(&upstream, "README", "first");
        commit_file(&upstream, "README", "second");

        let work = TempDir::new().expect("temp dir");
        let dest = work.path().join("pkg");
        let uri = upstream_dir.path().display().to_string();
        let revision = first.to_string();
        GitFetcher
            .fetch(&FetchRequest {
                uri: &uri,
                dest: &dest,
                downloads: work.path(),
                revision: Some(&revision),
            })
            .expect("clone");

        assert_eq!(std::fs::read_to_string(dest.join("README")).expect("read"), "first");
    }

    #[test]
    fn test_fetch_invalid_uri() {
        let work = TempDir::new().expect("temp dir");
        let err = GitFetcher
            .fetch(&FetchRequest {
                uri: "relative/repo",
                dest: &work.path().join("pkg"),
                downloads: work.path(),
                revision: None,
            })
            .expect_err("invalid");
        assert!(matches!(err, crate::error::MinimergeError::InvalidSourceUri { .. }));
    }

    #[test]
    fn test_failed_clone_names_the_uri() {
        let work = TempDir::new().expect("temp dir");
        let missing = work.path().join("no-such-repo").display().to_string();
        let err = GitFetcher
            .fetch(&FetchRequest {
                uri: &missing,
                dest: &work.path().join("pkg"),
                downloads: work.path(),
                revision: None,
            })
            .expect_err("nothing to clone");
        match err {
            crate::error::MinimergeError::FetchFailure { uri, .. } => assert_eq!(uri, missing),
            other => panic!("unexpected error: {other}"),
        }
    }
}
