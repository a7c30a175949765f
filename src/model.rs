//! OpenAPI document types produced by the generator.

use crate::extract::HttpMethod;
use crate::schema::SchemaFragment;
use serde::Serialize;
use serde_json::Value;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// OpenAPI version written into every document.
pub const OPENAPI_VERSION: &str = "3.0.0";

/// All operations of one URL path, keyed by method.
pub type PathItem = BTreeMap<HttpMethod, Operation>;

/// OpenAPI Info object
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Info {
    /// API title
    pub title: String,
    /// API version
    pub version: String,
    /// API description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// OpenAPI Server object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Server {
    pub url: String,
}

/// One specification document, produced per document variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpecificationDocument {
    /// OpenAPI version
    pub openapi: String,
    /// API info
    pub info: Info,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<Server>,
    /// API paths
    pub paths: BTreeMap<String, PathItem>,
    /// Components (schemas, etc.)
    #[serde(skip_serializing_if = "Components::is_empty")]
    pub components: Components,
}

impl SpecificationDocument {
    pub fn new() -> Self {
        Self {
            openapi: OPENAPI_VERSION.to_string(),
            info: Info::default(),
            servers: Vec::new(),
            paths: BTreeMap::new(),
            components: Components::default(),
        }
    }

    /// Look up one operation by path and method.
    pub fn operation(&self, path: &str, method: HttpMethod) -> Option<&Operation> {
        self.paths.get(path).and_then(|item| item.get(&method))
    }
}

impl Default for SpecificationDocument {
    fn default() -> Self {
        Self::new()
    }
}

/// OpenAPI Components object
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Components {
    /// Schema definitions keyed by registry key
    pub schemas: BTreeMap<String, SchemaFragment>,
}

impl Components {
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

/// OpenAPI Operation object - represents a single API operation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub operation_id: String,
    #[serde(skip)]
    pub method: HttpMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Parameters (path, query, header, cookie)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    /// Responses keyed by status code
    pub responses: BTreeMap<String, Response>,
}

impl Operation {
    pub fn new(operation_id: String, method: HttpMethod) -> Self {
        Self {
            operation_id,
            method,
            summary: None,
            description: None,
            tags: Vec::new(),
            parameters: Vec::new(),
            request_body: None,
            responses: BTreeMap::new(),
        }
    }

    pub fn has_parameter(&self, name: &str, location: ParameterLocation) -> bool {
        self.parameters
            .iter()
            .any(|p| p.name == name && p.location == location)
    }

    /// Copy every field of `defaults` that is still unset here.
    ///
    /// Singular fields are only filled when empty, parameters and responses
    /// only when their key is new; a known response only gets a description
    /// if it has none. Nothing already present is replaced.
    pub fn fill_unset_from(&mut self, defaults: Operation) {
        if self.summary.is_none() {
            self.summary = defaults.summary;
        }
        if self.description.is_none() {
            self.description = defaults.description;
        }
        if self.tags.is_empty() {
            self.tags = defaults.tags;
        }
        for parameter in defaults.parameters {
            if !self.has_parameter(&parameter.name, parameter.location) {
                self.parameters.push(parameter);
            }
        }
        if self.request_body.is_none() {
            self.request_body = defaults.request_body;
        }
        for (code, response) in defaults.responses {
            match self.responses.entry(code) {
                Entry::Vacant(entry) => {
                    entry.insert(response);
                }
                Entry::Occupied(mut entry) => {
                    let existing = entry.get_mut();
                    if existing.description.is_empty() {
                        existing.description = response.description;
                    }
                }
            }
        }
    }

    /// Give every response without a description the standard text of its
    /// status code.
    pub fn describe_responses(&mut self) {
        for (code, response) in self.responses.iter_mut() {
            if response.description.is_empty() {
                response.description = status_text(code);
            }
        }
    }
}

/// Reason phrase of a status code, `Response <code>` for unlisted codes.
fn status_text(code: &str) -> String {
    let text = match code {
        "default" => "Default response",
        "100" => "Continue",
        "200" => "OK",
        "201" => "Created",
        "202" => "Accepted",
        "204" => "No Content",
        "301" => "Moved Permanently",
        "302" => "Found",
        "304" => "Not Modified",
        "400" => "Bad Request",
        "401" => "Unauthorized",
        "403" => "Forbidden",
        "404" => "Not Found",
        "405" => "Method Not Allowed",
        "409" => "Conflict",
        "410" => "Gone",
        "415" => "Unsupported Media Type",
        "422" => "Unprocessable Entity",
        "429" => "Too Many Requests",
        "500" => "Internal Server Error",
        "501" => "Not Implemented",
        "502" => "Bad Gateway",
        "503" => "Service Unavailable",
        "504" => "Gateway Timeout",
        _ => return format!("Response {}", code),
    };
    text.to_string()
}

/// The location of a parameter in an HTTP request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParameterLocation {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "path" => Some(ParameterLocation::Path),
            "query" => Some(ParameterLocation::Query),
            "header" => Some(ParameterLocation::Header),
            "cookie" => Some(ParameterLocation::Cookie),
            _ => None,
        }
    }
}

/// OpenAPI Parameter object
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub schema: SchemaFragment,
}

/// OpenAPI RequestBody object
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RequestBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    /// Content types and their schemas
    pub content: BTreeMap<String, MediaType>,
}

/// OpenAPI MediaType object
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaType {
    pub schema: SchemaFragment,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub examples: BTreeMap<String, Example>,
}

/// OpenAPI Example object
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Example {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub value: Value,
}

/// OpenAPI Response object
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Response {
    pub description: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub content: BTreeMap<String, MediaType>,
}
