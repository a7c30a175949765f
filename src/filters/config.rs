//! Built-in configuration filters.

use super::{
    apply_operation_filters, targets_variant, DocumentConfigFilter, OperationConfigFilter,
    OperationConfigFilterSettings, OperationFilterSettings,
};
use crate::element::Element;
use crate::error::GenerationError;
use crate::generator::GeneratorSettings;
use crate::model::{Operation, PathItem, SpecificationDocument};
use crate::variant::DocumentVariantKey;
use log::debug;
use std::collections::BTreeMap;

/// Applies the common annotations of the `operation` configuration element.
///
/// The annotations are run through the regular operation filters into a
/// scratch operation, whose fields then fill whatever the documented
/// operation left unset. `variant` blocks addressed to the variant being
/// built are read before the general annotations, so they win.
pub struct CommonAnnotationFilter;

impl OperationConfigFilter for CommonAnnotationFilter {
    fn name(&self) -> &'static str {
        "CommonAnnotationFilter"
    }

    fn apply(
        &self,
        operations: &mut PathItem,
        config: &Element,
        settings: &mut OperationConfigFilterSettings<'_, '_>,
    ) -> Vec<GenerationError> {
        let annotations = effective_annotations(config, settings.variant);
        if annotations.children.is_empty() {
            return Vec::new();
        }

        let mut errors = Vec::new();
        for (method, operation) in operations.iter_mut() {
            debug!(
                "Applying common annotations to {} {} in variant {}",
                method, settings.path, settings.variant
            );

            let mut defaults = Operation::new(operation.operation_id.clone(), *method);
            let mut operation_settings = OperationFilterSettings {
                registry: &mut *settings.registry,
                variant: settings.variant,
                path: settings.path,
            };
            let found = apply_operation_filters(
                settings.operation_filters,
                &mut defaults,
                &annotations,
                &mut operation_settings,
            );

            let fatal = found.iter().any(GenerationError::is_fatal);
            errors.extend(found);
            if fatal {
                break;
            }
            operation.fill_unset_from(defaults);
        }

        errors
    }
}

/// Variant-specific annotations first, then the general ones.
fn effective_annotations(config: &Element, variant: &DocumentVariantKey) -> Element {
    let scoped = config
        .children
        .iter()
        .filter(|child| targets_variant(child, variant))
        .flat_map(|block| block.children.iter());
    let general = config.children.iter().filter(|child| child.name != "variant");

    Element {
        children: scoped.chain(general).cloned().collect(),
        ..Element::new(config.name.clone())
    }
}

/// Applies the `info` element of the `document` configuration.
///
/// An `info` inside a `variant` block addressed to the document wins over the
/// general `info`; fields neither sets keep their defaults.
pub struct DocumentInfoFilter;

impl DocumentConfigFilter for DocumentInfoFilter {
    fn name(&self) -> &'static str {
        "DocumentInfoFilter"
    }

    fn apply(
        &self,
        documents: &mut BTreeMap<DocumentVariantKey, SpecificationDocument>,
        config: &Element,
        _settings: &GeneratorSettings,
    ) -> Vec<GenerationError> {
        for (variant, document) in documents.iter_mut() {
            let candidates: Vec<&Element> = config
                .children
                .iter()
                .filter(|child| targets_variant(child, variant))
                .filter_map(|block| block.child("info"))
                .chain(config.child("info"))
                .collect();

            let attribute = |key: &str| {
                candidates
                    .iter()
                    .filter_map(|info| info.attribute(key).map(str::trim))
                    .find(|value| !value.is_empty())
                    .map(str::to_string)
            };

            if let Some(title) = attribute("title") {
                document.info.title = title;
            }
            if let Some(version) = attribute("version") {
                document.info.version = version;
            }
            if let Some(description) = candidates
                .iter()
                .map(|info| info.text())
                .find(|text| !text.is_empty())
            {
                document.info.description = Some(description.to_string());
            }

            debug!("Document info for variant {}: {:?}", variant, document.info);
        }

        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::HttpMethod;
    use crate::filters::{apply_operation_config_filters, FilterSet};
    use crate::registry::ReferenceRegistry;
    use crate::type_resolver::TypeShape;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn operation_config() -> Element {
        Element::new("operation")
            .with_child(Element::text_element("remarks", "Common remarks"))
            .with_child(Element::text_element("summary", "Common summary"))
            .with_child(
                Element::new("param")
                    .with_attribute("name", "X-Trace")
                    .with_attribute("in", "header"),
            )
            .with_child(Element::new("response").with_attribute("code", "500").with_text("Server error"))
            .with_child(
                Element::new("variant")
                    .with_attribute("categorizer", "swagger")
                    .with_attribute("title", "Public")
                    .with_child(Element::text_element("remarks", "Public remarks")),
            )
    }

    fn apply(operation: Operation, variant: &DocumentVariantKey) -> (Operation, Vec<GenerationError>) {
        let shapes: HashMap<String, TypeShape> = HashMap::new();
        let mut registry = ReferenceRegistry::new(&shapes);
        let filters = FilterSet::default();
        let method = operation.method;

        let mut operations = PathItem::new();
        operations.insert(method, operation);

        let mut settings = OperationConfigFilterSettings {
            registry: &mut registry,
            variant,
            path: "/users",
            operation_filters: &filters.operation,
        };
        let errors = apply_operation_config_filters(
            &filters.operation_config,
            &mut operations,
            &operation_config(),
            &mut settings,
        );

        let operation = operations.remove(&method).unwrap();
        (operation, errors)
    }

    #[test]
    fn test_config_fills_only_unset_fields() {
        let mut operation = Operation::new("getUsers".to_string(), HttpMethod::Get);
        operation.summary = Some("Explicit".to_string());

        let (operation, errors) = apply(operation, &DocumentVariantKey::default());

        assert!(errors.is_empty());
        assert_eq!(operation.operation_id, "getUsers");
        assert_eq!(operation.summary.as_deref(), Some("Explicit"));
        assert_eq!(operation.description.as_deref(), Some("Common remarks"));
        assert_eq!(operation.parameters[0].name, "X-Trace");
        assert_eq!(operation.responses["500"].description, "Server error");
    }

    #[test]
    fn test_variant_block_takes_precedence() {
        let operation = Operation::new("getUsers".to_string(), HttpMethod::Get);

        let (public, _) = apply(operation.clone(), &DocumentVariantKey::new("swagger", "Public"));
        let (partner, _) = apply(operation, &DocumentVariantKey::new("swagger", "Partner"));

        assert_eq!(public.description.as_deref(), Some("Public remarks"));
        assert_eq!(partner.description.as_deref(), Some("Common remarks"));
    }

    #[test]
    fn test_effective_annotations_order() {
        let annotations =
            effective_annotations(&operation_config(), &DocumentVariantKey::new("swagger", "Public"));
        let names: Vec<&str> = annotations.children.iter().map(|c| c.name.as_str()).collect();

        assert_eq!(names, vec!["remarks", "remarks", "summary", "param", "response"]);
        assert_eq!(annotations.children[0].text(), "Public remarks");
    }

    #[test]
    fn test_document_info_from_config() {
        let config = Element::new("document")
            .with_child(
                Element::new("info")
                    .with_attribute("title", "Store API")
                    .with_attribute("version", "2.0.0")
                    .with_text("All operations"),
            )
            .with_child(
                Element::new("variant")
                    .with_attribute("categorizer", "swagger")
                    .with_attribute("title", "Public")
                    .with_child(Element::new("info").with_attribute("title", "Public Store API")),
            );

        let public = DocumentVariantKey::new("swagger", "Public");
        let mut documents = BTreeMap::new();
        documents.insert(DocumentVariantKey::default(), SpecificationDocument::new());
        documents.insert(public.clone(), SpecificationDocument::new());

        let errors = DocumentInfoFilter.apply(&mut documents, &config, &GeneratorSettings::default());

        assert!(errors.is_empty());
        let default_info = &documents[&DocumentVariantKey::default()].info;
        assert_eq!(default_info.title, "Store API");
        assert_eq!(default_info.version, "2.0.0");
        assert_eq!(default_info.description.as_deref(), Some("All operations"));

        let public_info = &documents[&public].info;
        assert_eq!(public_info.title, "Public Store API");
        assert_eq!(public_info.version, "2.0.0");
    }
}
