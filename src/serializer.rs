//! Serialization module for converting OpenAPI documents to and from YAML or JSON.
//!
//! Output is canonical: fields follow the model's declared order and every map keeps its
//! insertion order, so serializing the same document twice yields identical bytes.

use crate::document::Document;
use crate::error::{Error, Result};
use crate::validate::{validate, Violation};
use log::{debug, warn};
use std::fmt;
use std::fs;
use std::path::Path;

/// Serialization format of a specification file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    /// Format implied by a file extension; anything other than `.yml`/`.yaml` is JSON
    pub fn from_path(path: &Path) -> Format {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                Format::Yaml
            }
            _ => Format::Json,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Yaml => "yaml",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Json => f.write_str("JSON"),
            Format::Yaml => f.write_str("YAML"),
        }
    }
}

/// Serializes an OpenAPI document to YAML format.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn serialize_yaml(doc: &Document) -> Result<String> {
    debug!("Serializing OpenAPI document to YAML");
    Ok(serde_yaml::to_string(doc)?)
}

/// Serializes an OpenAPI document to JSON.
///
/// Pretty-printed with two-space indentation unless `minify` is set, in which case the
/// output carries no insignificant whitespace.
///
/// # Arguments
///
/// * `doc` - The OpenAPI document to serialize
/// * `minify` - Emit compact JSON
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn serialize_json(doc: &Document, minify: bool) -> Result<String> {
    debug!("Serializing OpenAPI document to JSON (minify: {})", minify);
    let json = if minify {
        serde_json::to_string(doc)?
    } else {
        serde_json::to_string_pretty(doc)?
    };
    Ok(json)
}

pub fn serialize(doc: &Document, format: Format, minify: bool) -> Result<String> {
    match format {
        Format::Json => serialize_json(doc, minify),
        Format::Yaml => serialize_yaml(doc),
    }
}

/// Parses a document from text.
///
/// Only syntax and shape are checked here; structural problems are reported by
/// [`validate`](crate::validate::validate).
///
/// # Errors
///
/// Returns [`Error::Parse`] carrying the parser's message when the text is malformed.
pub fn parse_document(text: &str, format: Format) -> Result<Document> {
    let parsed = match format {
        Format::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
        Format::Yaml => serde_yaml::from_str(text).map_err(|e| e.to_string()),
    };
    parsed.map_err(|message| Error::Parse { format, message })
}

/// Reads and parses a specification file, choosing the format from its extension.
pub fn read_document(path: &Path) -> Result<Document> {
    debug!("Reading OpenAPI document from {}", path.display());
    let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    parse_document(&text, Format::from_path(path))
}

/// Writes string content to a file.
///
/// Creates the file if it doesn't exist, or overwrites it if it does. Parent directories
/// are created as needed.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written to.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    fs::write(path, content).map_err(|e| Error::io(path, e))?;

    debug!("Successfully wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

/// Outcome of importing a specification file
#[derive(Debug)]
pub struct ImportReport {
    pub document: Document,
    pub violations: Vec<Violation>,
}

/// Imports a specification file.
///
/// With `strict` set, any violation fails the import with [`Error::Validation`];
/// otherwise violations are logged and returned alongside the document.
pub fn import_document(path: &Path, strict: bool) -> Result<ImportReport> {
    let document = read_document(path)?;
    let violations = validate(&document);

    if !violations.is_empty() {
        if strict {
            return Err(Error::Validation(violations));
        }
        for violation in &violations {
            warn!("{}: {}", path.display(), violation);
        }
    }

    Ok(ImportReport {
        document,
        violations,
    })
}
