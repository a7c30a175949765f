//! Built-in document filters.

use super::{DocumentFilter, DocumentFilterSettings};
use crate::element::Element;
use crate::error::GenerationError;
use crate::model::{Server, SpecificationDocument};
use log::debug;
use url::Url;

/// Fills an empty title or version from the generator settings.
pub struct InfoFilter;

impl DocumentFilter for InfoFilter {
    fn name(&self) -> &'static str {
        "InfoFilter"
    }

    fn apply(
        &self,
        document: &mut SpecificationDocument,
        _units: &[&Element],
        settings: &DocumentFilterSettings<'_>,
    ) -> Vec<GenerationError> {
        if document.info.title.is_empty() {
            document.info.title = settings.generator.title.clone();
        }
        if document.info.version.is_empty() {
            document.info.version = settings.generator.version.clone();
        }
        Vec::new()
    }
}

/// Lists the distinct origins of absolute unit URLs as servers.
///
/// Relative URLs contribute nothing.
pub struct ServerFilter;

impl DocumentFilter for ServerFilter {
    fn name(&self) -> &'static str {
        "ServerFilter"
    }

    fn apply(
        &self,
        document: &mut SpecificationDocument,
        units: &[&Element],
        settings: &DocumentFilterSettings<'_>,
    ) -> Vec<GenerationError> {
        for unit in units {
            for raw in unit.children_named("url").map(Element::text) {
                let Ok(url) = Url::parse(raw) else {
                    continue;
                };
                if !url.has_host() {
                    continue;
                }

                let origin = url.origin().ascii_serialization();
                if !document.servers.iter().any(|server| server.url == origin) {
                    debug!("Adding server {} to variant {}", origin, settings.variant);
                    document.servers.push(Server { url: origin });
                }
            }
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::apply_document_filters;
    use crate::filters::FilterSet;
    use crate::generator::GeneratorSettings;
    use crate::variant::DocumentVariantKey;

    fn unit(url: &str) -> Element {
        Element::new("member")
            .with_child(Element::text_element("url", url))
            .with_child(Element::text_element("verb", "GET"))
    }

    #[test]
    fn test_document_filters() {
        let units = [
            unit("https://api.example.com/v1/users"),
            unit("https://api.example.com:443/v1/orders"),
            unit("http://localhost:8080/health"),
            unit("/relative"),
        ];
        let unit_refs: Vec<&Element> = units.iter().collect();
        let variant = DocumentVariantKey::default();
        let generator = GeneratorSettings::default();
        let settings = DocumentFilterSettings {
            variant: &variant,
            generator: &generator,
        };

        let mut document = SpecificationDocument::new();
        document.info.version = "3.1.4".to_string();
        let errors = apply_document_filters(&FilterSet::default().document, &mut document, &unit_refs, &settings);

        assert!(errors.is_empty());
        assert_eq!(document.info.title, generator.title);
        assert_eq!(document.info.version, "3.1.4");

        let servers: Vec<&str> = document.servers.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(servers, vec!["https://api.example.com", "http://localhost:8080"]);
    }
}
