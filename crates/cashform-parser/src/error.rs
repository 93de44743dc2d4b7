//! Error types for cashform-parser

use thiserror::Error;
use std::io;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Syntax error at {location}: {message}")]
    SyntaxError {
        location: String,
        message: String,
    },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("IO error")]
    IoError(#[from] io::Error),
}

impl ParseError {
    pub fn syntax(line: usize, message: impl Into<String>) -> Self {
        ParseError::SyntaxError {
            location: format!("line {}", line),
            message: message.into(),
        }
    }
}
