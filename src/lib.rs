//! OpenAPI from annotations - compile documented operations into OpenAPI documents.
//!
//! The input is an annotation document: a tree of [`element::Element`]s in
//! which every element with a `url` and a `verb` child documents one
//! operation, with nested tags such as `summary`, `param` and `response`.
//! Referenced Rust types are resolved through a [`type_resolver::TypeShapeResolver`]
//! and deduplicated into document components by the [`registry`].
//!
//! # Architecture
//!
//! 1. [`extract`] - Path, method and operation id of each operation element
//! 2. [`variant`] - Which document variants an operation is published into
//! 3. [`filters`] - Ordered filters building operations and documents
//! 4. [`registry`] - Memoized type schemas, per-variant copies and examples
//! 5. [`type_resolver`] / [`modules`] - Type shapes read from Rust sources
//! 6. [`generator`] - The orchestrator tying it together
//! 7. [`serializer`] - YAML or JSON output
//!
//! # Example Usage
//!
//! ```no_run
//! use openapi_from_annotations::{
//!     element::load_element,
//!     generator::Generator,
//!     serializer::serialize_yaml,
//!     type_resolver::SourceTypeResolver,
//! };
//! use std::path::{Path, PathBuf};
//!
//! let annotations = load_element(Path::new("annotations.yaml")).unwrap();
//! let resolver = SourceTypeResolver::from_module_paths(&[PathBuf::from("./src")]).unwrap();
//!
//! let result = Generator::default().generate(&annotations, None, &resolver);
//! for outcome in &result.per_path {
//!     println!("{:?} {:?}: {}", outcome.method, outcome.path, outcome.message);
//! }
//! if let Some(document) = result.default_document() {
//!     println!("{}", serialize_yaml(document).unwrap());
//! }
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module.

pub mod cli;
pub mod element;
pub mod error;
pub mod extract;
pub mod filters;
pub mod generator;
pub mod model;
pub mod modules;
pub mod registry;
pub mod schema;
pub mod serializer;
pub mod type_resolver;
pub mod variant;

use element::Element;
use generator::{GenerationResult, Generator};
use type_resolver::TypeShapeResolver;

/// Generate with the built-in filters and default settings.
pub fn generate(
    annotations: &Element,
    config: Option<&Element>,
    resolver: &dyn TypeShapeResolver,
) -> GenerationResult {
    Generator::default().generate(annotations, config, resolver)
}
