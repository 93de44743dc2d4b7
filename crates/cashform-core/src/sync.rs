//! Keeping the ledger file in step with a remote copy
//!
//! A [`SyncTarget`] is asked to `prepare` before a request opens the ledger
//! and to `publish` after a mutation was saved. Remote tools are driven as
//! child processes (`git`, `aws`).

use async_trait::async_trait;
use cashform_config::{Config, SyncMode};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::process::Command;

use crate::error::{CoreError, CoreResult};

#[async_trait]
pub trait SyncTarget: Send + Sync {
    /// Bring the local ledger up to date before it is opened
    async fn prepare(&self) -> CoreResult<()>;
    /// Push a saved change out, `message` describes it
    async fn publish(&self, message: &str) -> CoreResult<()>;
    /// One-off setup at startup
    async fn ensure_ready(&self) -> CoreResult<()> {
        Ok(())
    }
    fn describe(&self) -> String;
}

pub type SyncRef = Arc<dyn SyncTarget>;

/// Build the target selected in the config
pub fn from_config(config: &Config) -> SyncRef {
    match config.sync.mode {
        SyncMode::Local => Arc::new(LocalSync),
        SyncMode::Git => {
            let git = &config.sync.git;
            Arc::new(GitSync {
                dir: config.data_dir().to_path_buf(),
                book_file: config.data.book_file.clone(),
                remote_url: git.remote_url.clone(),
                remote: git.remote.clone(),
                branch: git.branch.clone(),
                user_name: git.user_name.clone(),
                user_email: git.user_email.clone(),
            })
        }
        SyncMode::ObjectStorage => {
            let store = &config.sync.object_storage;
            Arc::new(ObjectStorageSync {
                local_path: config.ledger_path(),
                bucket: store.bucket.clone(),
                key: config.object_key(),
                endpoint: store.endpoint.clone(),
                region: store.region.clone(),
                cleanup_local: store.cleanup_local,
            })
        }
    }
}

/// Run a command and return its stdout, or a sync error carrying stderr
async fn run(target: &str, program: &str, args: &[String]) -> CoreResult<String> {
    log::debug!("Running {} {}", program, args.join(" "));
    let output = Command::new(program)
        .args(args)
        .output()
        .await
        .map_err(|e| CoreError::SyncError {
            target: target.to_string(),
            message: format!("could not start {}: {}", program, e),
        })?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(CoreError::SyncError {
            target: target.to_string(),
            message: format!("{} exited with {}: {}", program, output.status, stderr.trim()),
        })
    }
}

fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| a.to_string()).collect()
}

// ==================== Local ====================

/// The ledger lives only on this machine
pub struct LocalSync;

#[async_trait]
impl SyncTarget for LocalSync {
    async fn prepare(&self) -> CoreResult<()> {
        Ok(())
    }

    async fn publish(&self, _message: &str) -> CoreResult<()> {
        Ok(())
    }

    fn describe(&self) -> String {
        "local".to_string()
    }
}

// ==================== Git ====================

/// The data directory is a git checkout that is pulled before each request
/// and pushed after each change
pub struct GitSync {
    pub dir: PathBuf,
    pub book_file: String,
    pub remote_url: Option<String>,
    pub remote: String,
    pub branch: String,
    pub user_name: String,
    pub user_email: String,
}

impl GitSync {
    fn in_repo(&self, args: &[&str]) -> Vec<String> {
        let mut out = vec!["-C".to_string(), self.dir.display().to_string()];
        out.extend(strings(args));
        out
    }

    fn discard_args(&self) -> Vec<String> {
        self.in_repo(&["checkout", "--", self.book_file.as_str()])
    }

    fn pull_args(&self) -> Vec<String> {
        self.in_repo(&["pull", self.remote.as_str(), self.branch.as_str()])
    }

    fn add_args(&self) -> Vec<String> {
        self.in_repo(&["add", "."])
    }

    fn commit_args(&self, message: &str) -> Vec<String> {
        self.in_repo(&["commit", "-m", message])
    }

    fn push_args(&self) -> Vec<String> {
        self.in_repo(&["push", self.remote.as_str(), self.branch.as_str()])
    }

    fn config_args(&self, key: &str, value: &str) -> Vec<String> {
        self.in_repo(&["config", key, value])
    }

    fn clone_args(&self, url: &str) -> Vec<String> {
        vec![
            "clone".to_string(),
            "--branch".to_string(),
            self.branch.clone(),
            url.to_string(),
            self.dir.display().to_string(),
        ]
    }

    async fn git(&self, args: Vec<String>) -> CoreResult<String> {
        run("git", "git", &args).await
    }
}

#[async_trait]
impl SyncTarget for GitSync {
    async fn prepare(&self) -> CoreResult<()> {
        log::info!("Discarding uncommitted ledger changes and pulling");
        if let Err(e) = self.git(self.discard_args()).await {
            // nothing to discard when the book is not tracked yet
            log::warn!("{}", e);
        }
        self.git(self.pull_args()).await?;
        Ok(())
    }

    async fn publish(&self, message: &str) -> CoreResult<()> {
        self.git(self.add_args()).await?;
        self.git(self.commit_args(message)).await?;
        self.git(self.push_args()).await?;
        log::info!("Pushed \"{}\" to {}/{}", message, self.remote, self.branch);
        Ok(())
    }

    /// Clone the repository when the data directory is not a checkout yet,
    /// then set the commit identity. Called once at startup.
    async fn ensure_ready(&self) -> CoreResult<()> {
        if !tokio::fs::try_exists(self.dir.join(".git")).await.unwrap_or(false) {
            let Some(url) = &self.remote_url else {
                return Err(CoreError::SyncError {
                    target: "git".to_string(),
                    message: format!("{} is not a git checkout and no remote_url is set", self.dir.display()),
                });
            };
            log::info!("Cloning ledger repository into {}", self.dir.display());
            self.git(self.clone_args(url)).await?;
        }
        self.git(self.config_args("user.name", &self.user_name)).await?;
        self.git(self.config_args("user.email", &self.user_email)).await?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("git ({} {})", self.remote, self.branch)
    }
}

// ==================== Object storage ====================

/// The ledger is downloaded from an S3-compatible bucket before each request
/// and uploaded after each change
pub struct ObjectStorageSync {
    pub local_path: PathBuf,
    pub bucket: String,
    pub key: String,
    pub endpoint: Option<String>,
    pub region: Option<String>,
    /// Delete the local copy once it is uploaded
    pub cleanup_local: bool,
}

impl ObjectStorageSync {
    fn object_url(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key)
    }

    fn copy_args(&self, from: &str, to: &str) -> Vec<String> {
        let mut args = strings(&["s3", "cp", from, to]);
        if let Some(endpoint) = &self.endpoint {
            args.push("--endpoint-url".to_string());
            args.push(endpoint.clone());
        }
        if let Some(region) = &self.region {
            args.push("--region".to_string());
            args.push(region.clone());
        }
        args
    }

    fn download_args(&self) -> Vec<String> {
        self.copy_args(&self.object_url(), &self.local_path.display().to_string())
    }

    fn upload_args(&self) -> Vec<String> {
        self.copy_args(&self.local_path.display().to_string(), &self.object_url())
    }

    async fn remove_local(path: &Path) -> CoreResult<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl SyncTarget for ObjectStorageSync {
    async fn prepare(&self) -> CoreResult<()> {
        if let Some(parent) = self.local_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        run("object storage", "aws", &self.download_args()).await?;
        log::info!("Downloaded {} to {}", self.object_url(), self.local_path.display());
        Ok(())
    }

    async fn publish(&self, message: &str) -> CoreResult<()> {
        run("object storage", "aws", &self.upload_args()).await?;
        log::info!("Uploaded {} after: {}", self.object_url(), message);
        if self.cleanup_local {
            Self::remove_local(&self.local_path).await?;
        }
        Ok(())
    }

    fn describe(&self) -> String {
        self.object_url()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn git_sync(remote_url: Option<&str>, dir: &Path) -> GitSync {
        GitSync {
            dir: dir.to_path_buf(),
            book_file: "book.beancount".to_string(),
            remote_url: remote_url.map(str::to_string),
            remote: "origin".to_string(),
            branch: "main".to_string(),
            user_name: "cashform".to_string(),
            user_email: "cashform@localhost".to_string(),
        }
    }

    #[test]
    fn test_git_commands() {
        let sync = git_sync(Some("https://example.com/ledger.git"), Path::new("/srv/data"));
        assert_eq!(sync.discard_args(), strings(&["-C", "/srv/data", "checkout", "--", "book.beancount"]));
        assert_eq!(sync.pull_args(), strings(&["-C", "/srv/data", "pull", "origin", "main"]));
        assert_eq!(sync.add_args(), strings(&["-C", "/srv/data", "add", "."]));
        assert_eq!(
            sync.commit_args("Coffee, $4.20"),
            strings(&["-C", "/srv/data", "commit", "-m", "Coffee, $4.20"])
        );
        assert_eq!(sync.push_args(), strings(&["-C", "/srv/data", "push", "origin", "main"]));
        assert_eq!(
            sync.config_args("user.name", "cashform"),
            strings(&["-C", "/srv/data", "config", "user.name", "cashform"])
        );
        assert_eq!(
            sync.clone_args("https://example.com/ledger.git"),
            strings(&["clone", "--branch", "main", "https://example.com/ledger.git", "/srv/data"])
        );
    }

    #[tokio::test]
    async fn test_git_needs_checkout_or_remote() {
        let dir = tempfile::tempdir().unwrap();
        let err = git_sync(None, dir.path()).ensure_ready().await.unwrap_err();
        assert!(matches!(err, CoreError::SyncError { ref target, .. } if target == "git"));
    }

    #[test]
    fn test_object_storage_commands() {
        let sync = ObjectStorageSync {
            local_path: PathBuf::from("/tmp/book.beancount"),
            bucket: "ledgers".to_string(),
            key: "home/book.beancount".to_string(),
            endpoint: Some("https://s3.nl-ams.scw.cloud".to_string()),
            region: Some("nl-ams".to_string()),
            cleanup_local: true,
        };
        assert_eq!(
            sync.download_args(),
            strings(&[
                "s3",
                "cp",
                "s3://ledgers/home/book.beancount",
                "/tmp/book.beancount",
                "--endpoint-url",
                "https://s3.nl-ams.scw.cloud",
                "--region",
                "nl-ams",
            ])
        );

        let plain = ObjectStorageSync {
            endpoint: None,
            region: None,
            ..sync
        };
        assert_eq!(
            plain.upload_args(),
            strings(&["s3", "cp", "/tmp/book.beancount", "s3://ledgers/home/book.beancount"])
        );
    }

    #[tokio::test]
    async fn test_missing_program_is_a_sync_error() {
        let err = run("test", "cashform-no-such-program", &[]).await.unwrap_err();
        assert!(matches!(err, CoreError::SyncError { ref message, .. } if message.contains("could not start")));
    }

    #[tokio::test]
    async fn test_from_config_picks_target() {
        let mut config = Config::default();
        assert_eq!(from_config(&config).describe(), "local");
        from_config(&config).publish("noop").await.unwrap();

        config.sync.mode = SyncMode::ObjectStorage;
        config.sync.object_storage.bucket = "ledgers".to_string();
        assert_eq!(from_config(&config).describe(), "s3://ledgers/book.beancount");

        config.sync.mode = SyncMode::Git;
        assert_eq!(from_config(&config).describe(), "git (origin main)");
    }
}
