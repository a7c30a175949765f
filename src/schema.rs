use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Prefix of every registry-backed `$ref`.
pub const COMPONENTS_PREFIX: &str = "#/components/schemas/";

/// OpenAPI schema fragment
///
/// Either a plain schema, a `$ref` into the document components, or an
/// `anyOf` union of alternative shapes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaFragment {
    /// The type of the schema (string, integer, object, array, etc.)
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
    /// Format for primitive types (e.g., "int32", "int64", "float", "double")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Properties for object types
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, SchemaFragment>,
    /// Required field names for object types
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    /// Items schema for array types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaFragment>>,
    /// Value schema for map types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<Box<SchemaFragment>>,
    /// Enum values for enum types
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    /// Reference to a component schema
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Alternative shapes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub any_of: Option<Vec<SchemaFragment>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
}

impl SchemaFragment {
    /// A schema with only a `type` (and optional `format`).
    pub fn typed(schema_type: &str, format: Option<&str>) -> Self {
        Self {
            schema_type: Some(schema_type.to_string()),
            format: format.map(str::to_string),
            ..Self::default()
        }
    }

    /// Free-form object, also used as the fallback for unknown types.
    pub fn object() -> Self {
        Self::typed("object", None)
    }

    pub fn array(items: SchemaFragment) -> Self {
        Self {
            items: Some(Box::new(items)),
            ..Self::typed("array", None)
        }
    }

    pub fn map(values: SchemaFragment) -> Self {
        Self {
            additional_properties: Some(Box::new(values)),
            ..Self::object()
        }
    }

    /// `$ref` to the component registered under `ref_key`.
    pub fn reference(ref_key: &str) -> Self {
        Self {
            reference: Some(format!("{}{}", COMPONENTS_PREFIX, ref_key)),
            ..Self::default()
        }
    }

    pub fn union(alternatives: Vec<SchemaFragment>) -> Self {
        Self {
            any_of: Some(alternatives),
            ..Self::default()
        }
    }

    /// Registry key of a `$ref` fragment.
    pub fn ref_key(&self) -> Option<&str> {
        self.reference
            .as_deref()
            .and_then(|reference| reference.strip_prefix(COMPONENTS_PREFIX))
    }

    /// True for a bare `anyOf` wrapper.
    pub fn is_union(&self) -> bool {
        self.any_of.is_some() && self.schema_type.is_none() && self.reference.is_none()
    }

    /// Widen this schema so it also accepts `other`.
    ///
    /// A plain schema is wrapped into a new `anyOf` holding both shapes; an
    /// existing union gets `other` appended. Alternatives already present are
    /// not repeated, whatever their example: a known shape keeps its example
    /// and only takes the one of `other` when it has none.
    pub fn widen(&mut self, other: SchemaFragment) {
        if self.same_shape(&other) {
            self.adopt_example(other);
            return;
        }

        if self.is_union() {
            if let Some(alternatives) = self.any_of.as_mut() {
                match alternatives.iter_mut().find(|known| known.same_shape(&other)) {
                    Some(known) => known.adopt_example(other),
                    None => alternatives.push(other),
                }
            }
            return;
        }

        let prior = std::mem::take(self);
        *self = SchemaFragment::union(vec![prior, other]);
    }

    /// Equal apart from the top-level example.
    fn same_shape(&self, other: &SchemaFragment) -> bool {
        SchemaFragment {
            example: None,
            ..self.clone()
        } == SchemaFragment {
            example: None,
            ..other.clone()
        }
    }

    fn adopt_example(&mut self, other: SchemaFragment) {
        if self.example.is_none() {
            self.example = other.example;
        }
    }
}
