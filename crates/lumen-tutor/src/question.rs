//! Loading question text produced by the external OCR step.
//!
//! The OCR engine writes the recognised text of a captured page to a file
//! (or pipes it to stdin). This module reads that text, enforces a size limit
//! and normalises the whitespace OCR tends to leave behind.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TutorError};

/// Maximum accepted question file size in bytes (32KB).
pub const MAX_QUESTION_SIZE: u64 = 32 * 1024;

/// Question text captured for a tutoring session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Where the text came from, if it was read from a file.
    pub source: Option<PathBuf>,

    /// Normalised question text.
    pub text: String,
}

impl Question {
    /// Builds a question from raw OCR text.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::EmptyQuestion` if nothing remains after
    /// normalisation.
    pub fn from_text(raw: &str) -> Result<Self> {
        let text = normalize_ocr_text(raw);
        if text.is_empty() {
            return Err(TutorError::EmptyQuestion);
        }
        Ok(Self { source: None, text })
    }

    /// Loads a question from a text file.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::QuestionNotFound` if the file doesn't exist,
    /// `TutorError::QuestionTooLarge` if it exceeds 32KB,
    /// `TutorError::QuestionEncodingError` if it is not valid UTF-8 and
    /// `TutorError::EmptyQuestion` if it holds no text.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let metadata = std::fs::metadata(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TutorError::question_not_found(path)
            } else {
                TutorError::Io(e)
            }
        })?;

        let file_size = metadata.len();
        if file_size > MAX_QUESTION_SIZE {
            return Err(TutorError::question_too_large(path, file_size / 1024));
        }

        let raw = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::InvalidData {
                TutorError::question_encoding(path)
            } else {
                TutorError::Io(e)
            }
        })?;

        let mut question = Self::from_text(&raw)?;
        question.source = Some(path.to_path_buf());
        Ok(question)
    }
}

/// Collapses runs of spaces and blank lines left by OCR.
///
/// Line structure is kept because numbered sub-questions rely on it.
#[must_use]
pub fn normalize_ocr_text(raw: &str) -> String {
    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
