//! Ledger file parser and writer
//!
//! Reads and writes the Beancount subset the ledger is stored in: options,
//! `open`/`close` with metadata, and two-sided transactions. Anything else is
//! carried through untouched as a raw block.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

pub mod error;
pub mod types;
pub mod directives;
pub mod parser;
pub mod writer;

pub use error::ParseError;
pub use parser::SimpleBeancountParser;
pub use writer::BeancountWriter;

// Re-export commonly used types
pub use types::{escape_string, unescape_string, Account, AccountType, Amount, Meta, SpanInfo, StringValue};
pub use directives::{
    CloseDirective, Directive, OpenDirective, OptionDirective, Posting, RawDirective,
    SpannedDirective, Transaction,
};

// ==================== Parser Trait ====================

/// Parser reference type
pub type ParserRef = Arc<dyn BeancountParserTrait>;

/// Trait for ledger parsers
#[async_trait]
pub trait BeancountParserTrait: Send + Sync {
    /// Parse ledger text and return directives
    async fn parse(&self, content: &str) -> Result<Vec<SpannedDirective>, ParseError>;

    /// Parse a ledger file from disk
    async fn parse_file(&self, path: PathBuf) -> Result<Vec<SpannedDirective>, ParseError>;
}

/// Default parser implementation
#[derive(Debug, Default)]
pub struct DefaultBeancountParser;

#[async_trait]
impl BeancountParserTrait for DefaultBeancountParser {
    async fn parse(&self, content: &str) -> Result<Vec<SpannedDirective>, ParseError> {
        SimpleBeancountParser::parse(content)
    }

    async fn parse_file(&self, path: PathBuf) -> Result<Vec<SpannedDirective>, ParseError> {
        let content = tokio::fs::read_to_string(&path).await?;
        let source_path = path.to_string_lossy().to_string();
        SimpleBeancountParser::parse_with_source(&content, Some(&source_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_parse_file_tags_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.beancount");
        tokio::fs::write(&path, "2020-01-01 open Assets:Cash USD\n").await.unwrap();

        let parser = DefaultBeancountParser;
        let directives = parser.parse_file(path.clone()).await.unwrap();
        assert_eq!(directives.len(), 1);
        assert_eq!(directives[0].source.as_deref(), Some(path.to_string_lossy().as_ref()));
    }

    #[tokio::test]
    async fn test_parse_file_missing_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let parser = DefaultBeancountParser;
        let err = parser.parse_file(dir.path().join("missing.beancount")).await.unwrap_err();
        assert!(matches!(err, ParseError::IoError(_)));
    }
}
