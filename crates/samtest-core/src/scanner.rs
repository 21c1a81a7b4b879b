//! Resource scanner for deployed-infrastructure templates.
//!
//! The template is treated as flat text. A function resource is a line that
//! reads exactly like the function type marker, paired with the nearest
//! preceding non-blank line of the form `<logicalName><SUFFIX8>:` where the
//! suffix is eight uppercase letters or digits generated by the deploy tool.

use std::path::Path;

use crate::error::{CoreError, Result};
use crate::types::FunctionDescriptor;

/// Marker line identifying a function resource.
pub const FUNCTION_MARKER: &str = "Type: AWS::Lambda::Function";

/// Length of the generated identifier suffix.
pub const SUFFIX_LEN: usize = 8;

/// Extracts function descriptors from template text.
#[derive(Debug, Clone)]
pub struct ResourceScanner {
    marker: String,
}

impl Default for ResourceScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceScanner {
    /// Creates a scanner for the standard function marker.
    #[must_use]
    pub fn new() -> Self {
        Self::with_marker(FUNCTION_MARKER)
    }

    /// Creates a scanner for a custom marker line.
    #[must_use]
    pub fn with_marker(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    /// Reads and scans a template file.
    ///
    /// # Errors
    /// Returns [`CoreError::TemplateNotFound`] if the file cannot be read.
    pub fn scan_file(&self, path: impl AsRef<Path>) -> Result<Vec<FunctionDescriptor>> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| CoreError::TemplateNotFound {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(self.scan(&text))
    }

    /// Scans template text, returning descriptors in document order.
    ///
    /// Duplicated logical names keep their first occurrence.
    #[must_use]
    pub fn scan(&self, text: &str) -> Vec<FunctionDescriptor> {
        let mut found: Vec<FunctionDescriptor> = Vec::new();
        let mut previous: Option<&str> = None;

        for line in text.split(['\r', '\n']) {
            if line.trim().is_empty() {
                continue;
            }

            if line.trim() == self.marker {
                match previous.and_then(parse_identifier) {
                    Some(desc) if found.iter().any(|d| d.logical_name == desc.logical_name) => {
                        tracing::debug!(function = %desc, "duplicate logical name ignored");
                    }
                    Some(desc) => found.push(desc),
                    None => {
                        tracing::debug!(line = ?previous, "function resource without generated id");
                    }
                }
            }

            previous = Some(line);
        }

        found
    }
}

/// Parses `<logicalName><SUFFIX8>:` from a template line.
fn parse_identifier(line: &str) -> Option<FunctionDescriptor> {
    let head = line.trim_end().strip_suffix(':')?;

    let start = head
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_alphanumeric() || *c == '_')
        .last()
        .map(|(i, _)| i)?;
    let word = &head[start..];

    if word.len() <= SUFFIX_LEN {
        return None;
    }

    let (name, suffix) = word.split_at(word.len() - SUFFIX_LEN);
    if !suffix
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        return None;
    }

    Some(FunctionDescriptor::new(name, word))
}
