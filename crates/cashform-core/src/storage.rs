//! Ledger persistence backends

use async_trait::async_trait;
use cashform_parser::{BeancountWriter, DefaultBeancountParser, ParserRef, SimpleBeancountParser};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::book::Book;
use crate::error::{CoreError, CoreResult};

const TMP_SUFFIX: &str = "tmp";

/// Where a book is read from and written to
#[async_trait]
pub trait BookStorage: Send + Sync {
    async fn load(&self) -> CoreResult<Book>;
    async fn save(&self, book: &Book) -> CoreResult<()>;
    /// Human-readable location for logs
    fn describe(&self) -> String;
}

pub type StorageRef = Arc<dyn BookStorage>;

/// Ledger file on local disk
pub struct BeancountStorage {
    path: PathBuf,
    parser: ParserRef,
}

impl BeancountStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_parser(path, Arc::new(DefaultBeancountParser))
    }

    pub fn with_parser(path: impl Into<PathBuf>, parser: ParserRef) -> Self {
        Self {
            path: path.into(),
            parser,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

#[async_trait]
impl BookStorage for BeancountStorage {
    async fn load(&self) -> CoreResult<Book> {
        if !tokio::fs::try_exists(&self.path).await? {
            return Err(CoreError::FileNotFound {
                path: self.path.display().to_string(),
            });
        }
        let directives = self.parser.parse_file(self.path.clone()).await?;
        Book::from_directives(directives)
    }

    async fn save(&self, book: &Book) -> CoreResult<()> {
        let text = BeancountWriter::write(&book.to_directives())?;
        let tmp = tmp_path(&self.path);
        tokio::fs::write(&tmp, text).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        log::debug!("Saved ledger to {}", self.path.display());
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Ledger text held in memory. Goes through the same parser and writer as the
/// file backend, and can be told to fail saves after a number of successes.
pub struct MemoryStorage {
    text: Mutex<String>,
    saves: AtomicUsize,
    fail_after: Option<usize>,
}

impl MemoryStorage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Mutex::new(text.into()),
            saves: AtomicUsize::new(0),
            fail_after: None,
        }
    }

    /// Saves beyond the first `successes` return an IO error
    pub fn failing_after(text: impl Into<String>, successes: usize) -> Self {
        Self {
            fail_after: Some(successes),
            ..Self::new(text)
        }
    }

    /// Number of successful saves so far
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub async fn contents(&self) -> String {
        self.text.lock().await.clone()
    }
}

#[async_trait]
impl BookStorage for MemoryStorage {
    async fn load(&self) -> CoreResult<Book> {
        let text = self.text.lock().await;
        Book::from_directives(SimpleBeancountParser::parse(&text)?)
    }

    async fn save(&self, book: &Book) -> CoreResult<()> {
        if let Some(limit) = self.fail_after {
            if self.save_count() >= limit {
                return Err(CoreError::IoError {
                    message: "simulated write failure".to_string(),
                });
            }
        }
        let rendered = BeancountWriter::write(&book.to_directives())?;
        *self.text.lock().await = rendered;
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
