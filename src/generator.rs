//! Generation orchestrator.
//!
//! Walks every operation element of an annotation document, builds one
//! operation per document variant through the filter chain, commits the
//! units that built cleanly and finally assembles the variant documents.
//! Unit-level problems are reported per unit and never stop the batch.

use crate::element::Element;
use crate::error::{ErrorKind, GenerationError};
use crate::extract::{extract_method, extract_path, generate_operation_id, HttpMethod};
use crate::filters::{
    apply_document_config_filters, apply_document_filters, apply_operation_config_filters,
    apply_operation_filters, DocumentFilterSettings, FilterSet, OperationConfigFilterSettings,
    OperationFilterSettings,
};
use crate::model::{Operation, PathItem, SpecificationDocument};
use crate::registry::ReferenceRegistry;
use crate::type_resolver::TypeShapeResolver;
use crate::variant::{categorizers, variants_for_unit, DocumentVariantKey};
use log::{debug, info, warn};
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};

/// Message of the single outcome reported for an empty annotation document.
pub const NO_OPERATIONS_MESSAGE: &str = "no operations found";

/// Document defaults of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorSettings {
    /// Title of documents that do not configure one
    pub title: String,
    /// Version of documents that do not configure one
    pub version: String,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            title: "Generated API".to_string(),
            version: "1.0.0".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GenerationStatus {
    Success,
    Failure,
}

/// What happened to one operation element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathOutcome {
    pub method: Option<String>,
    pub path: Option<String>,
    pub status: GenerationStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl PathOutcome {
    fn success(path: Option<&str>, method: Option<HttpMethod>, message: impl Into<String>) -> Self {
        Self {
            method: method.map(|m| m.as_str().to_string()),
            path: path.map(str::to_string),
            status: GenerationStatus::Success,
            message: message.into(),
            error_kind: None,
        }
    }

    /// Failure classified by the first error, reporting every distinct message.
    fn failure(path: Option<&str>, method: Option<HttpMethod>, errors: &[GenerationError]) -> Self {
        let mut messages: Vec<String> = Vec::new();
        for message in errors.iter().map(ToString::to_string) {
            if !messages.contains(&message) {
                messages.push(message);
            }
        }

        Self {
            method: method.map(|m| m.as_str().to_string()),
            path: path.map(str::to_string),
            status: GenerationStatus::Failure,
            message: messages.join("; "),
            error_kind: errors.first().map(GenerationError::kind),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == GenerationStatus::Success
    }
}

/// Everything one run produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    /// One outcome per operation element, in document order
    pub per_path: Vec<PathOutcome>,
    /// Documents keyed by variant; only variants with a committed unit exist
    #[serde(serialize_with = "serialize_documents")]
    pub documents: BTreeMap<DocumentVariantKey, SpecificationDocument>,
}

impl GenerationResult {
    pub fn failures(&self) -> impl Iterator<Item = &PathOutcome> {
        self.per_path.iter().filter(|outcome| !outcome.is_success())
    }

    /// The document of the default variant, if any unit was committed.
    pub fn default_document(&self) -> Option<&SpecificationDocument> {
        self.documents.get(&DocumentVariantKey::default_variant())
    }
}

#[derive(Serialize)]
struct VariantDocument<'a> {
    variant: &'a DocumentVariantKey,
    document: &'a SpecificationDocument,
}

/// Struct keys cannot be map keys in JSON, so documents go out as a list.
fn serialize_documents<S>(
    documents: &BTreeMap<DocumentVariantKey, SpecificationDocument>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_seq(
        documents
            .iter()
            .map(|(variant, document)| VariantDocument { variant, document }),
    )
}

/// Compiles annotation documents into specification documents.
pub struct Generator {
    filters: FilterSet,
    settings: GeneratorSettings,
}

impl Generator {
    pub fn new(filters: FilterSet, settings: GeneratorSettings) -> Self {
        Self { filters, settings }
    }

    pub fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }

    /// Run one generation.
    ///
    /// Every call owns a fresh reference registry; `resolver` is asked at
    /// most once per distinct type.
    pub fn generate(
        &self,
        annotations: &Element,
        config: Option<&Element>,
        resolver: &dyn TypeShapeResolver,
    ) -> GenerationResult {
        let units = annotations.operations();
        info!("Found {} operation elements", units.len());

        if units.is_empty() {
            return GenerationResult {
                per_path: vec![PathOutcome::success(None, None, NO_OPERATIONS_MESSAGE)],
                documents: BTreeMap::new(),
            };
        }

        let mut run = Run {
            categorizers: categorizers(config),
            operation_config: config.and_then(|c| c.child("operation")),
            registry: ReferenceRegistry::new(resolver),
            documents: BTreeMap::new(),
            committed: BTreeMap::new(),
        };

        let per_path: Vec<PathOutcome> = units.iter().map(|&unit| self.generate_unit(unit, &mut run)).collect();
        let failed = per_path.iter().filter(|outcome| !outcome.is_success()).count();
        info!(
            "Generated {} operations ({} failed) into {} documents",
            per_path.len() - failed,
            failed,
            run.documents.len()
        );

        let document_config = config.and_then(|c| c.child("document"));
        if let Err(errors) = self.finish_documents(&mut run, document_config) {
            let fault = GenerationError::DocumentStageFault(
                errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "),
            );
            warn!("{}", fault);
            return GenerationResult {
                per_path: vec![PathOutcome::failure(None, None, &[fault])],
                documents: BTreeMap::new(),
            };
        }

        GenerationResult {
            per_path,
            documents: run.documents,
        }
    }

    fn generate_unit<'a>(&self, unit: &'a Element, run: &mut Run<'a, '_>) -> PathOutcome {
        let path = match extract_path(unit) {
            Ok(path) => path,
            Err(e) => {
                warn!("Rejected operation: {}", e);
                return PathOutcome::failure(None, None, &[e]);
            }
        };

        let method = match extract_method(unit, &path) {
            Ok(method) => method,
            Err(e) => {
                warn!("Rejected operation: {}", e);
                return PathOutcome::failure(Some(&path), None, &[e]);
            }
        };

        let variants = variants_for_unit(unit, &run.categorizers);
        debug!("Building {} {} for {} variants", method, path, variants.len());

        // components and examples of a rejected unit must not reach any document
        let snapshot = run.registry.snapshot();
        let mut built: Vec<(DocumentVariantKey, Operation)> = Vec::new();
        let mut errors = Vec::new();
        for variant in variants {
            match self.build_operation(unit, &path, method, &variant, run) {
                Ok(mut operation) => {
                    operation.describe_responses();
                    built.push((variant, operation));
                }
                Err(found) => errors.extend(found),
            }
        }

        if let Some((variant, _)) = built.iter().find(|(variant, _)| {
            run.documents
                .get(variant)
                .and_then(|document| document.operation(&path, method))
                .is_some()
        }) {
            errors.push(GenerationError::DuplicateOperation {
                method: method.to_string(),
                path: path.clone(),
                variant: variant.to_string(),
            });
        }

        if !errors.is_empty() {
            warn!("Skipping {} {}: {} errors", method, path, errors.len());
            run.registry.restore(snapshot);
            return PathOutcome::failure(Some(&path), Some(method), &errors);
        }

        let mut targets = BTreeSet::new();
        for (variant, operation) in built {
            if !targets.insert(variant.clone()) {
                debug!("{} {} already committed to variant {}", method, path, variant);
                continue;
            }
            run.committed.entry(variant.clone()).or_default().push(unit);
            run.documents
                .entry(variant)
                .or_default()
                .paths
                .entry(path.clone())
                .or_default()
                .insert(method, operation);
        }

        PathOutcome::success(
            Some(&path),
            Some(method),
            format!("generated for {} documents", targets.len()),
        )
    }

    /// Build one operation for one variant, config filters included.
    fn build_operation(
        &self,
        unit: &Element,
        path: &str,
        method: HttpMethod,
        variant: &DocumentVariantKey,
        run: &mut Run<'_, '_>,
    ) -> Result<Operation, Vec<GenerationError>> {
        let mut operation = Operation::new(generate_operation_id(path, method), method);

        let mut settings = OperationFilterSettings {
            registry: &mut run.registry,
            variant,
            path,
        };
        let errors = apply_operation_filters(&self.filters.operation, &mut operation, unit, &mut settings);
        if !errors.is_empty() {
            return Err(errors);
        }

        let Some(config) = run.operation_config else {
            return Ok(operation);
        };

        let mut operations = PathItem::new();
        operations.insert(method, operation);
        let mut settings = OperationConfigFilterSettings {
            registry: &mut run.registry,
            variant,
            path,
            operation_filters: &self.filters.operation,
        };
        let errors = apply_operation_config_filters(
            &self.filters.operation_config,
            &mut operations,
            config,
            &mut settings,
        );
        if !errors.is_empty() {
            return Err(errors);
        }

        operations.remove(&method).ok_or_else(|| {
            vec![GenerationError::fault(
                "Generator",
                format!("operation {} {} removed by a config filter", method, path),
            )]
        })
    }

    /// Flush components and run the document stage.
    fn finish_documents(
        &self,
        run: &mut Run<'_, '_>,
        document_config: Option<&Element>,
    ) -> Result<(), Vec<GenerationError>> {
        let mut errors = Vec::new();

        for (variant, document) in run.documents.iter_mut() {
            run.registry.flush(variant, &mut document.components.schemas);

            let units = run.committed.get(variant).map(Vec::as_slice).unwrap_or(&[]);
            let settings = DocumentFilterSettings {
                variant,
                generator: &self.settings,
            };
            errors.extend(apply_document_filters(&self.filters.document, document, units, &settings));
        }

        if let Some(config) = document_config {
            errors.extend(apply_document_config_filters(
                &self.filters.document_config,
                &mut run.documents,
                config,
                &self.settings,
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl Default for Generator {
    fn default() -> Self {
        Self::new(FilterSet::default(), GeneratorSettings::default())
    }
}

/// Mutable state of one `generate` call.
struct Run<'a, 'r> {
    categorizers: Vec<String>,
    operation_config: Option<&'a Element>,
    registry: ReferenceRegistry<'r>,
    documents: BTreeMap<DocumentVariantKey, SpecificationDocument>,
    /// Units committed to each variant, for the document filters
    committed: BTreeMap<DocumentVariantKey, Vec<&'a Element>>,
}
