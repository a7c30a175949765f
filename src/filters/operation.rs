//! Built-in operation filters.

use super::{OperationFilter, OperationFilterSettings};
use crate::element::Element;
use crate::error::{GenerationError, SchemaResolutionError};
use crate::model::{Example, MediaType, Operation, Parameter, ParameterLocation, RequestBody};
use crate::schema::SchemaFragment;
use crate::type_resolver::TypeRef;
use log::debug;
use serde_json::Value;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// Media type used when a tag does not name one.
pub const DEFAULT_MEDIA_TYPE: &str = "application/json";

/// `summary` → operation summary.
pub struct SummaryFilter;

impl OperationFilter for SummaryFilter {
    fn name(&self) -> &'static str {
        "SummaryFilter"
    }

    fn apply(
        &self,
        operation: &mut Operation,
        unit: &Element,
        _settings: &mut OperationFilterSettings<'_, '_>,
    ) -> Vec<GenerationError> {
        if operation.summary.is_none() {
            operation.summary = non_empty_text(unit.child("summary"));
        }
        Vec::new()
    }
}

/// `remarks` → operation description.
pub struct DescriptionFilter;

impl OperationFilter for DescriptionFilter {
    fn name(&self) -> &'static str {
        "DescriptionFilter"
    }

    fn apply(
        &self,
        operation: &mut Operation,
        unit: &Element,
        _settings: &mut OperationFilterSettings<'_, '_>,
    ) -> Vec<GenerationError> {
        if operation.description.is_none() {
            operation.description = non_empty_text(unit.child("remarks"));
        }
        Vec::new()
    }
}

/// `group` → operation tags.
pub struct TagFilter;

impl OperationFilter for TagFilter {
    fn name(&self) -> &'static str {
        "TagFilter"
    }

    fn apply(
        &self,
        operation: &mut Operation,
        unit: &Element,
        _settings: &mut OperationFilterSettings<'_, '_>,
    ) -> Vec<GenerationError> {
        for group in unit.children_named("group") {
            let tag = group.text();
            if !tag.is_empty() && !operation.tags.iter().any(|known| known == tag) {
                operation.tags.push(tag.to_string());
            }
        }
        Vec::new()
    }
}

/// Non-body `param` tags → operation parameters.
///
/// A `param` without `in` is a path parameter when the path has a matching
/// `{name}` placeholder and a query parameter otherwise.
pub struct ParameterFilter;

impl OperationFilter for ParameterFilter {
    fn name(&self) -> &'static str {
        "ParameterFilter"
    }

    fn apply(
        &self,
        operation: &mut Operation,
        unit: &Element,
        settings: &mut OperationFilterSettings<'_, '_>,
    ) -> Vec<GenerationError> {
        let mut errors = Vec::new();

        for param in unit.children_named("param").filter(|p| !is_body_param(p)) {
            let name = param.attribute("name").map(str::trim).unwrap_or("");
            if name.is_empty() {
                errors.push(GenerationError::fault(self.name(), "param without a name"));
                continue;
            }

            let location = match param.attribute("in") {
                Some(raw) => match ParameterLocation::parse(raw) {
                    Some(location) => location,
                    None => {
                        errors.push(GenerationError::fault(
                            self.name(),
                            format!("param '{}' has unknown location '{}'", name, raw.trim()),
                        ));
                        continue;
                    }
                },
                None if settings.path.contains(&format!("{{{}}}", name)) => ParameterLocation::Path,
                None => ParameterLocation::Query,
            };

            if operation.has_parameter(name, location) {
                debug!("Skipping duplicate parameter {} ({:?})", name, location);
                continue;
            }

            let schema = match referenced_schema(param, settings) {
                Ok(Some(schema)) => schema,
                Ok(None) => SchemaFragment::typed("string", None),
                Err(e) => {
                    errors.push(e);
                    return errors;
                }
            };

            operation.parameters.push(Parameter {
                name: name.to_string(),
                location,
                required: location == ParameterLocation::Path || flag(param, "required", false),
                description: non_empty_text(Some(param)),
                schema,
            });
        }

        errors
    }
}

/// `param in="body"` tags → operation request body.
///
/// Several body tags with the same media type become alternative shapes of
/// one `anyOf` schema.
pub struct RequestBodyFilter;

impl OperationFilter for RequestBodyFilter {
    fn name(&self) -> &'static str {
        "RequestBodyFilter"
    }

    fn apply(
        &self,
        operation: &mut Operation,
        unit: &Element,
        settings: &mut OperationFilterSettings<'_, '_>,
    ) -> Vec<GenerationError> {
        for param in unit.children_named("param").filter(|p| is_body_param(p)) {
            let name = param.attribute("name").map(str::trim).unwrap_or("");

            let media = match media_content(param, settings) {
                Ok(Some(media)) => media,
                Ok(None) => {
                    return vec![GenerationError::MissingTypeReference {
                        tag: param.name.clone(),
                        name: name.to_string(),
                    }];
                }
                Err(e) => return vec![e],
            };

            let body = operation.request_body.get_or_insert_with(RequestBody::default);
            if body.description.is_none() {
                body.description = non_empty_text(Some(param));
            }
            if body.required.is_none() {
                body.required = Some(flag(param, "required", true));
            }
            merge_media(&mut body.content, media_type(param), media);
        }

        Vec::new()
    }
}

/// `response` tags → operation responses, keyed by status code.
pub struct ResponseFilter;

impl OperationFilter for ResponseFilter {
    fn name(&self) -> &'static str {
        "ResponseFilter"
    }

    fn apply(
        &self,
        operation: &mut Operation,
        unit: &Element,
        settings: &mut OperationFilterSettings<'_, '_>,
    ) -> Vec<GenerationError> {
        let mut errors = Vec::new();

        for tag in unit.children_named("response") {
            let code = tag.attribute("code").map(str::trim).unwrap_or("");
            if !is_status_code(code) {
                errors.push(GenerationError::fault(
                    self.name(),
                    format!("invalid response code '{}'", code),
                ));
                continue;
            }

            let media = match media_content(tag, settings) {
                Ok(media) => media,
                Err(e) => {
                    errors.push(e);
                    return errors;
                }
            };

            let response = operation.responses.entry(code.to_string()).or_default();
            if response.description.is_empty() {
                response.description = tag.text().to_string();
            }
            if let Some(media) = media {
                merge_media(&mut response.content, media_type(tag), media);
            }
        }

        errors
    }
}

fn non_empty_text(element: Option<&Element>) -> Option<String> {
    element
        .map(Element::text)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

fn is_body_param(param: &Element) -> bool {
    param
        .attribute("in")
        .map(|location| location.trim().eq_ignore_ascii_case("body"))
        .unwrap_or(false)
}

/// Boolean attribute, `default` when absent.
fn flag(element: &Element, key: &str, default: bool) -> bool {
    element
        .attribute(key)
        .map(|value| value.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

fn media_type(tag: &Element) -> String {
    tag.attribute("type")
        .map(str::trim)
        .filter(|media_type| !media_type.is_empty())
        .unwrap_or(DEFAULT_MEDIA_TYPE)
        .to_string()
}

/// `100`..=`599` or `default`.
fn is_status_code(code: &str) -> bool {
    code == "default"
        || (code.len() == 3 && matches!(code.parse::<u16>(), Ok(100..=599)))
}

/// Type expressions a tag refers to: its `cref` attribute, then every `see cref`.
fn type_references(tag: &Element) -> Vec<&str> {
    tag.attribute("cref")
        .into_iter()
        .chain(tag.children_named("see").filter_map(|see| see.attribute("cref")))
        .map(str::trim)
        .filter(|cref| !cref.is_empty())
        .collect()
}

/// Schema for the types a tag refers to, a union when there are several.
fn referenced_schema(
    tag: &Element,
    settings: &mut OperationFilterSettings<'_, '_>,
) -> Result<Option<SchemaFragment>, GenerationError> {
    let mut schema: Option<SchemaFragment> = None;

    for cref in type_references(tag) {
        let type_ref = TypeRef::parse(cref).map_err(|message| SchemaResolutionError::new(cref, message))?;
        let resolved = settings.registry.resolve(&type_ref, settings.variant)?;
        match schema.as_mut() {
            Some(schema) => schema.widen(resolved),
            None => schema = Some(resolved),
        }
    }

    Ok(schema)
}

/// Schema and examples of a body or response tag, `None` if it names no type.
///
/// The first example is also attached to the schema: on the registry copy
/// for references, so every use in the variant shows it, on the local
/// fragment otherwise.
fn media_content(
    tag: &Element,
    settings: &mut OperationFilterSettings<'_, '_>,
) -> Result<Option<MediaType>, GenerationError> {
    let Some(mut schema) = referenced_schema(tag, settings)? else {
        return Ok(None);
    };

    let declared = examples(tag);
    if let Some((_, first)) = declared.first() {
        let injected = match schema.ref_key() {
            Some(key) => settings
                .registry
                .inject_example(key, settings.variant, first.value.clone()),
            None => false,
        };
        if !injected {
            schema.example = Some(first.value.clone());
        }
    }

    let mut examples = BTreeMap::new();
    for (key, example) in declared {
        examples.entry(key).or_insert(example);
    }

    Ok(Some(MediaType { schema, examples }))
}

/// `example` children in document order, keyed by their `name` or `exampleN`
/// by position.
fn examples(tag: &Element) -> Vec<(String, Example)> {
    let mut examples = Vec::new();

    for (index, example) in tag.children_named("example").enumerate() {
        let text = example
            .child("value")
            .map(Element::text)
            .unwrap_or_else(|| example.text());
        if text.is_empty() {
            continue;
        }

        let key = example
            .attribute("name")
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("example{}", index + 1));

        examples.push((
            key,
            Example {
                summary: example.attribute("summary").map(str::to_string),
                value: example_value(text),
            },
        ));
    }

    examples
}

fn example_value(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// Merge `media` into `content`: new media types are added, existing ones
/// widen their schema; existing example keys win.
fn merge_media(content: &mut BTreeMap<String, MediaType>, media_type: String, media: MediaType) {
    match content.entry(media_type) {
        Entry::Vacant(entry) => {
            entry.insert(media);
        }
        Entry::Occupied(mut entry) => {
            let existing = entry.get_mut();
            existing.schema.widen(media.schema);
            for (key, example) in media.examples {
                existing.examples.entry(key).or_insert(example);
            }
        }
    }
}
