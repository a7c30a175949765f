//! Operation identity: path, HTTP method and generated operation id.

use crate::element::Element;
use crate::error::GenerationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Base used to parse URLs documented without scheme and host.
const RELATIVE_URL_BASE: &str = "http://localhost/";

/// HTTP methods an annotated operation may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
    Trace,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Trace => "TRACE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "PUT" => Ok(HttpMethod::Put),
            "POST" => Ok(HttpMethod::Post),
            "DELETE" => Ok(HttpMethod::Delete),
            "OPTIONS" => Ok(HttpMethod::Options),
            "HEAD" => Ok(HttpMethod::Head),
            "PATCH" => Ok(HttpMethod::Patch),
            "TRACE" => Ok(HttpMethod::Trace),
            _ => Err(()),
        }
    }
}

/// Parse a documented URL, absolute or relative to a placeholder host.
pub fn parse_url(raw: &str) -> Result<Url, url::ParseError> {
    match Url::parse(raw) {
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(RELATIVE_URL_BASE)?.join(raw),
        other => other,
    }
}

/// Extract the decoded, absolute path of the unit's single `url` child.
pub fn extract_path(unit: &Element) -> Result<String, GenerationError> {
    let urls: Vec<&Element> = unit.children_named("url").collect();
    let raw = match urls.as_slice() {
        [url] => url.text().to_string(),
        _ => {
            let raw = urls.iter().map(|u| u.text()).collect::<Vec<_>>().join(", ");
            return Err(GenerationError::InvalidPath { raw });
        }
    };

    let invalid = || GenerationError::InvalidPath { raw: raw.clone() };

    if raw.is_empty() {
        return Err(invalid());
    }

    let url = parse_url(&raw).map_err(|_| invalid())?;
    if url.cannot_be_a_base() {
        return Err(invalid());
    }

    let path = urlencoding::decode(url.path()).map_err(|_| invalid())?;
    Ok(path.into_owned())
}

/// Read the unit's `verb` child as an [`HttpMethod`].
pub fn extract_method(unit: &Element, path: &str) -> Result<HttpMethod, GenerationError> {
    let raw = unit.child("verb").map(Element::text).unwrap_or("");
    raw.parse().map_err(|_| GenerationError::InvalidMethod {
        raw: raw.to_string(),
        path: path.to_string(),
    })
}

/// Build a deterministic operation id such as `getV1OrdersByOrderId`.
///
/// Distinct paths that title-case to the same tokens yield the same id; no
/// de-duplication is attempted.
pub fn generate_operation_id(path: &str, method: HttpMethod) -> String {
    let mut id = method.as_str().to_ascii_lowercase();

    for segment in path.split('/').filter(|s| !s.is_empty()) {
        let placeholders = placeholders(segment);
        if placeholders.is_empty() {
            id.push_str(&title_case(segment));
        } else {
            for name in placeholders {
                id.push_str("By");
                id.push_str(&title_case(name));
            }
        }
    }

    id.retain(|c| c.is_ascii_alphanumeric());
    id
}

/// Names of the `{placeholder}`s in one path segment, in order.
fn placeholders(segment: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = segment;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end) => {
                names.push(&after[..end]);
                rest = &after[end + 1..];
            }
            None => break,
        }
    }
    names
}

fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
