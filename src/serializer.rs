//! Serialization of generation results and documents to YAML or JSON.

use crate::cli::OutputFormat;
use crate::model::SpecificationDocument;
use crate::variant::DocumentVariantKey;
use anyhow::{Context, Result};
use log::debug;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Serializes a value to YAML.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn serialize_yaml<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    debug!("Serializing to YAML");
    serde_yaml::to_string(value).context("Failed to serialize to YAML")
}

/// Serializes a value to pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn serialize_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    debug!("Serializing to JSON");
    serde_json::to_string_pretty(value).context("Failed to serialize to JSON")
}

pub fn serialize<T: Serialize + ?Sized>(value: &T, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Yaml => serialize_yaml(value),
        OutputFormat::Json => serialize_json(value),
    }
}

/// Writes string content to a file.
///
/// Creates the file and any missing parent directories, or overwrites an
/// existing file.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written to.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(path, content)
        .with_context(|| format!("Failed to write to file: {}", path.display()))?;

    debug!("Successfully wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

/// File name of one variant document: `openapi.yaml` for the default
/// variant, `openapi-{categorizer}-{title}.yaml` otherwise.
pub fn document_file_name(variant: &DocumentVariantKey, format: OutputFormat) -> String {
    if variant.is_default() {
        format!("openapi.{}", format.extension())
    } else {
        format!(
            "openapi-{}-{}.{}",
            sanitize(&variant.categorizer),
            sanitize(&variant.title),
            format.extension()
        )
    }
}

/// Keep ASCII alphanumerics, `-` and `_`; replace everything else.
fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// Write every document into `dir`, one file per variant.
///
/// Returns the written paths in variant order.
pub fn write_documents(
    documents: &BTreeMap<DocumentVariantKey, SpecificationDocument>,
    dir: &Path,
    format: OutputFormat,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(documents.len());

    for (variant, document) in documents {
        let path = dir.join(document_file_name(variant, format));
        let content = serialize(document, format)
            .with_context(|| format!("Failed to serialize document for variant {}", variant))?;
        write_to_file(&content, &path)?;
        written.push(path);
    }

    Ok(written)
}
