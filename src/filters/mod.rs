//! Filter chain.
//!
//! Operations and documents are built by ordered lists of filters. Each
//! filter reads annotation elements, mutates its target and returns the
//! errors it ran into instead of failing outright, so one bad tag does not
//! hide the rest of the documentation.
//!
//! There are four filter kinds, one per target:
//!
//! - [`OperationFilter`]: one operation, from its annotation element
//! - [`OperationConfigFilter`]: the operations of one path, from the
//!   `operation` configuration element
//! - [`DocumentFilter`]: one variant document, from the units committed to it
//! - [`DocumentConfigFilter`]: all documents, from the `document`
//!   configuration element
//!
//! The built-ins are listed in [`FilterSet::default`]; custom filters are
//! appended after them and run last.

pub mod config;
pub mod document;
pub mod operation;

use crate::element::Element;
use crate::error::GenerationError;
use crate::generator::GeneratorSettings;
use crate::model::{Operation, PathItem, SpecificationDocument};
use crate::registry::ReferenceRegistry;
use crate::variant::DocumentVariantKey;
use log::debug;
use std::collections::BTreeMap;

/// Shared state handed to operation filters.
pub struct OperationFilterSettings<'s, 'r> {
    pub registry: &'s mut ReferenceRegistry<'r>,
    /// Variant the operation is built for
    pub variant: &'s DocumentVariantKey,
    /// Decoded path of the operation
    pub path: &'s str,
}

/// Shared state handed to operation config filters.
pub struct OperationConfigFilterSettings<'s, 'r> {
    pub registry: &'s mut ReferenceRegistry<'r>,
    pub variant: &'s DocumentVariantKey,
    pub path: &'s str,
    /// The operation filters of the run, for filters that build operations
    /// from configuration annotations
    pub operation_filters: &'s [Box<dyn OperationFilter>],
}

/// Shared state handed to document filters.
pub struct DocumentFilterSettings<'s> {
    pub variant: &'s DocumentVariantKey,
    pub generator: &'s GeneratorSettings,
}

/// Builds part of an operation from its annotation element.
pub trait OperationFilter {
    fn name(&self) -> &'static str;

    fn apply(
        &self,
        operation: &mut Operation,
        unit: &Element,
        settings: &mut OperationFilterSettings<'_, '_>,
    ) -> Vec<GenerationError>;
}

/// Applies the `operation` configuration element to the operations of one path.
pub trait OperationConfigFilter {
    fn name(&self) -> &'static str;

    fn apply(
        &self,
        operations: &mut PathItem,
        config: &Element,
        settings: &mut OperationConfigFilterSettings<'_, '_>,
    ) -> Vec<GenerationError>;
}

/// Post-processes one variant document.
pub trait DocumentFilter {
    fn name(&self) -> &'static str;

    fn apply(
        &self,
        document: &mut SpecificationDocument,
        units: &[&Element],
        settings: &DocumentFilterSettings<'_>,
    ) -> Vec<GenerationError>;
}

/// Applies the `document` configuration element to every generated document.
pub trait DocumentConfigFilter {
    fn name(&self) -> &'static str;

    fn apply(
        &self,
        documents: &mut BTreeMap<DocumentVariantKey, SpecificationDocument>,
        config: &Element,
        settings: &GeneratorSettings,
    ) -> Vec<GenerationError>;
}

/// The ordered filter lists of one generation run.
pub struct FilterSet {
    pub operation: Vec<Box<dyn OperationFilter>>,
    pub operation_config: Vec<Box<dyn OperationConfigFilter>>,
    pub document: Vec<Box<dyn DocumentFilter>>,
    pub document_config: Vec<Box<dyn DocumentConfigFilter>>,
}

impl FilterSet {
    /// A set without any filter.
    pub fn empty() -> Self {
        Self {
            operation: Vec::new(),
            operation_config: Vec::new(),
            document: Vec::new(),
            document_config: Vec::new(),
        }
    }

    pub fn with_operation_filter(mut self, filter: impl OperationFilter + 'static) -> Self {
        self.operation.push(Box::new(filter));
        self
    }

    pub fn with_operation_config_filter(mut self, filter: impl OperationConfigFilter + 'static) -> Self {
        self.operation_config.push(Box::new(filter));
        self
    }

    pub fn with_document_filter(mut self, filter: impl DocumentFilter + 'static) -> Self {
        self.document.push(Box::new(filter));
        self
    }

    pub fn with_document_config_filter(mut self, filter: impl DocumentConfigFilter + 'static) -> Self {
        self.document_config.push(Box::new(filter));
        self
    }
}

impl Default for FilterSet {
    /// The built-in filters, in the order they run.
    fn default() -> Self {
        Self::empty()
            .with_operation_filter(operation::SummaryFilter)
            .with_operation_filter(operation::DescriptionFilter)
            .with_operation_filter(operation::TagFilter)
            .with_operation_filter(operation::ParameterFilter)
            .with_operation_filter(operation::RequestBodyFilter)
            .with_operation_filter(operation::ResponseFilter)
            .with_operation_config_filter(config::CommonAnnotationFilter)
            .with_document_filter(document::InfoFilter)
            .with_document_filter(document::ServerFilter)
            .with_document_config_filter(config::DocumentInfoFilter)
    }
}

/// Run operation filters in order.
///
/// Every error is collected; a fatal one skips the filters after it.
pub fn apply_operation_filters(
    filters: &[Box<dyn OperationFilter>],
    operation: &mut Operation,
    unit: &Element,
    settings: &mut OperationFilterSettings<'_, '_>,
) -> Vec<GenerationError> {
    let mut errors = Vec::new();

    for filter in filters {
        let found = filter.apply(operation, unit, settings);
        let fatal = found.iter().any(GenerationError::is_fatal);
        errors.extend(found);
        if fatal {
            debug!(
                "{} failed fatally for {} in variant {}, skipping remaining filters",
                filter.name(),
                settings.path,
                settings.variant
            );
            break;
        }
    }

    errors
}

/// Run operation config filters in order, same rules as [`apply_operation_filters`].
pub fn apply_operation_config_filters(
    filters: &[Box<dyn OperationConfigFilter>],
    operations: &mut PathItem,
    config: &Element,
    settings: &mut OperationConfigFilterSettings<'_, '_>,
) -> Vec<GenerationError> {
    let mut errors = Vec::new();

    for filter in filters {
        let found = filter.apply(operations, config, settings);
        let fatal = found.iter().any(GenerationError::is_fatal);
        errors.extend(found);
        if fatal {
            debug!("{} failed fatally for {}", filter.name(), settings.path);
            break;
        }
    }

    errors
}

/// Run document filters in order.
pub fn apply_document_filters(
    filters: &[Box<dyn DocumentFilter>],
    document: &mut SpecificationDocument,
    units: &[&Element],
    settings: &DocumentFilterSettings<'_>,
) -> Vec<GenerationError> {
    let mut errors = Vec::new();
    for filter in filters {
        debug!("Running {} for variant {}", filter.name(), settings.variant);
        errors.extend(filter.apply(document, units, settings));
    }
    errors
}

/// Run document config filters in order.
pub fn apply_document_config_filters(
    filters: &[Box<dyn DocumentConfigFilter>],
    documents: &mut BTreeMap<DocumentVariantKey, SpecificationDocument>,
    config: &Element,
    settings: &GeneratorSettings,
) -> Vec<GenerationError> {
    let mut errors = Vec::new();
    for filter in filters {
        debug!("Running {}", filter.name());
        errors.extend(filter.apply(documents, config, settings));
    }
    errors
}

/// Whether `block` is a `variant` element addressed to `variant`.
pub(crate) fn targets_variant(block: &Element, variant: &DocumentVariantKey) -> bool {
    block.name == "variant"
        && block.attribute("categorizer").map(str::trim) == Some(variant.categorizer.as_str())
        && block.attribute("title").map(str::trim) == Some(variant.title.as_str())
}
