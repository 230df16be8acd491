//! JSON report output.
//!
//! # Example
//!
//! ```rust
//! use lumen_report::{json::JsonGenerator, Report};
//!
//! let report = Report::default();
//! let json = JsonGenerator::new(&report).generate().unwrap();
//! assert!(json.starts_with('{'));
//! ```

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::{Report, ReportError, Result};

/// Serializes a [`Report`] to JSON.
pub struct JsonGenerator<'a> {
    report: &'a Report,
}

impl<'a> JsonGenerator<'a> {
    /// Creates a new JSON generator for the given report.
    #[must_use]
    pub const fn new(report: &'a Report) -> Self {
        Self { report }
    }

    /// Generates compact JSON without whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Serialization`] if serialization fails.
    pub fn generate(&self) -> Result<String> {
        serde_json::to_string(self.report).map_err(ReportError::from)
    }

    /// Generates indented JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Serialization`] if serialization fails.
    pub fn generate_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self.report).map_err(ReportError::from)
    }

    /// Writes the report to `path` (for example `lumen-report.json`).
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Serialization`] if serialization fails.
    /// Returns [`ReportError::Io`] if the file cannot be created or written.
    pub fn write_to_file(&self, path: &Path, pretty: bool) -> Result<()> {
        let json = if pretty {
            self.generate_pretty()?
        } else {
            self.generate()?
        };

        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;

        Ok(())
    }
}
