//! Document variants.
//!
//! Besides the default document, an operation can be published into any
//! number of named variants. The configuration declares which tag names act
//! as categorizers; every such tag found inside an operation element puts the
//! operation into the variant `{categorizer, tag text}`.

use crate::element::Element;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Key of one generated document.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentVariantKey {
    pub categorizer: String,
    pub title: String,
}

impl DocumentVariantKey {
    pub fn new(categorizer: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            categorizer: categorizer.into(),
            title: title.into(),
        }
    }

    /// The implicit variant every operation belongs to.
    pub fn default_variant() -> Self {
        Self::default()
    }

    pub fn is_default(&self) -> bool {
        self.categorizer.is_empty() && self.title.is_empty()
    }
}

impl fmt::Display for DocumentVariantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_default() {
            write!(f, "default")
        } else {
            write!(f, "{}:{}", self.categorizer, self.title)
        }
    }
}

/// Categorizer tag names declared as `variant/name` in the configuration.
pub fn categorizers(config: Option<&Element>) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();

    let declarations = config
        .into_iter()
        .flat_map(|config| config.children_named("variant"))
        .flat_map(|variant| variant.children_named("name"));

    for declaration in declarations {
        let name = declaration.text();
        if !name.is_empty() && !names.iter().any(|known| known == name) {
            names.push(name.to_string());
        }
    }

    debug!("Variant categorizers: {:?}", names);
    names
}

/// Every variant one unit is generated for: the default variant first, then
/// one entry per matching categorizer element, in categorizer order.
///
/// The length of the result is the number of generation attempts for the unit.
pub fn variants_for_unit(unit: &Element, categorizers: &[String]) -> Vec<DocumentVariantKey> {
    let mut variants = vec![DocumentVariantKey::default_variant()];
    let descendants = unit.descendants();

    for categorizer in categorizers {
        variants.extend(
            descendants
                .iter()
                .filter(|element| element.name == *categorizer)
                .map(|element| DocumentVariantKey::new(categorizer.as_str(), element.text())),
        );
    }

    variants
}
