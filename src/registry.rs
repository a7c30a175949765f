use crate::error::SchemaResolutionError;
use crate::schema::SchemaFragment;
use crate::type_resolver::{PrimitiveType, TypeRef, TypeShape, TypeShapeResolver};
use crate::variant::DocumentVariantKey;
use log::{debug, warn};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Reference registry - turns type references into schemas, once per type.
///
/// Named types become components: the registry asks the resolver for their
/// shape on first use, stores the result (or the failure) under the type's
/// canonical key, and hands out `$ref` fragments. Each document variant keeps
/// its own copy of every component it uses, so an example injected for one
/// variant does not leak into another.
pub struct ReferenceRegistry<'r> {
    /// Type shape lookup
    resolver: &'r dyn TypeShapeResolver,
    /// Memoized resolutions, successful or not
    resolved: HashMap<String, Result<ResolvedEntry, SchemaResolutionError>>,
    /// Keys currently being built, to break recursive types
    in_progress: HashSet<String>,
    /// Per-variant copies of the components in use
    variants: BTreeMap<DocumentVariantKey, BTreeMap<String, SchemaFragment>>,
}

/// Saved per-variant component copies, see [`ReferenceRegistry::snapshot`].
#[derive(Debug, Clone)]
pub struct RegistrySnapshot {
    variants: BTreeMap<DocumentVariantKey, BTreeMap<String, SchemaFragment>>,
}

#[derive(Debug, Clone)]
struct ResolvedEntry {
    fragment: SchemaFragment,
    /// Components referenced from `fragment`
    dependencies: BTreeSet<String>,
}

impl<'r> ReferenceRegistry<'r> {
    pub fn new(resolver: &'r dyn TypeShapeResolver) -> Self {
        debug!("Initializing ReferenceRegistry");
        Self {
            resolver,
            resolved: HashMap::new(),
            in_progress: HashSet::new(),
            variants: BTreeMap::new(),
        }
    }

    /// Schema for `type_ref` as used in `variant`.
    ///
    /// Named types come back as `$ref` fragments; the referenced components
    /// (and everything they reference) are registered for the variant.
    pub fn resolve(
        &mut self,
        type_ref: &TypeRef,
        variant: &DocumentVariantKey,
    ) -> Result<SchemaFragment, SchemaResolutionError> {
        debug!("Resolving schema for {} in variant {}", type_ref, variant);

        let mut dependencies = BTreeSet::new();
        let fragment = self.inline_schema(type_ref, &mut dependencies)?;
        for key in &dependencies {
            self.copy_into_variant(key, variant);
        }
        Ok(fragment)
    }

    /// The variant's copy of a registered component.
    pub fn lookup(&self, ref_key: &str, variant: &DocumentVariantKey) -> Option<&SchemaFragment> {
        self.variants.get(variant).and_then(|schemas| schemas.get(ref_key))
    }

    /// Set the example of a registered component for one variant.
    ///
    /// Every operation of the variant that references the component sees the
    /// new example. Returns false if the key never resolved successfully.
    pub fn inject_example(&mut self, ref_key: &str, variant: &DocumentVariantKey, example: Value) -> bool {
        self.copy_into_variant(ref_key, variant);
        match self
            .variants
            .get_mut(variant)
            .and_then(|schemas| schemas.get_mut(ref_key))
        {
            Some(fragment) => {
                debug!("Injecting example into {} for variant {}", ref_key, variant);
                fragment.example = Some(example);
                true
            }
            None => false,
        }
    }

    /// Copy the variant's components into `target`, keeping entries already there.
    pub fn flush(&self, variant: &DocumentVariantKey, target: &mut BTreeMap<String, SchemaFragment>) {
        let Some(schemas) = self.variants.get(variant) else {
            return;
        };
        debug!("Flushing {} schemas into variant {}", schemas.len(), variant);
        for (key, fragment) in schemas {
            target.entry(key.clone()).or_insert_with(|| fragment.clone());
        }
    }

    /// Save the per-variant components, so the changes of a unit that is
    /// not committed can be undone with [`Self::restore`].
    ///
    /// Memoized resolutions are not part of the snapshot: they never reach a
    /// document unless a variant uses them.
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            variants: self.variants.clone(),
        }
    }

    pub fn restore(&mut self, snapshot: RegistrySnapshot) {
        debug!("Restoring registry snapshot");
        self.variants = snapshot.variants;
    }

    /// Schema to embed where `type_ref` is used, collecting referenced components.
    fn inline_schema(
        &mut self,
        type_ref: &TypeRef,
        dependencies: &mut BTreeSet<String>,
    ) -> Result<SchemaFragment, SchemaResolutionError> {
        if let Some(primitive) = PrimitiveType::parse(&type_ref.name) {
            return Ok(primitive_to_schema(primitive));
        }

        let first_arg = type_ref.args.first();
        match (type_ref.name.as_str(), first_arg) {
            ("Option" | "Box" | "Arc" | "Rc" | "Cow" | "Json", Some(inner)) => {
                return self.inline_schema(inner, dependencies);
            }
            ("Vec" | "VecDeque" | "LinkedList" | "HashSet" | "BTreeSet" | "IndexSet", Some(inner)) => {
                return Ok(SchemaFragment::array(self.inline_schema(inner, dependencies)?));
            }
            ("HashMap" | "BTreeMap" | "IndexMap", Some(_)) => {
                let values = match type_ref.args.get(1) {
                    Some(value) => self.inline_schema(value, dependencies)?,
                    None => SchemaFragment::object(),
                };
                return Ok(SchemaFragment::map(values));
            }
            _ => {}
        }

        let key = type_ref.ref_key();
        self.register_component(type_ref, &key)?;
        dependencies.insert(key.clone());
        Ok(SchemaFragment::reference(&key))
    }

    /// Resolve and memoize the component for a named type.
    fn register_component(&mut self, type_ref: &TypeRef, key: &str) -> Result<(), SchemaResolutionError> {
        if let Some(entry) = self.resolved.get(key) {
            debug!("Schema for {} already resolved", key);
            return entry.as_ref().map(|_| ()).map_err(Clone::clone);
        }
        if self.in_progress.contains(key) {
            debug!("Recursive reference to {}", key);
            return Ok(());
        }

        self.in_progress.insert(key.to_string());
        let result = match self.resolver.resolve(&type_ref.name) {
            Some(shape) => Ok(self.shape_to_entry(type_ref, shape)),
            None => {
                warn!("Could not resolve type: {}", type_ref);
                Err(SchemaResolutionError::new(key, format!("type {} not found", type_ref)))
            }
        };
        self.in_progress.remove(key);

        let outcome = result.as_ref().map(|_| ()).map_err(Clone::clone);
        self.resolved.insert(key.to_string(), result);
        outcome
    }

    fn shape_to_entry(&mut self, type_ref: &TypeRef, shape: TypeShape) -> ResolvedEntry {
        let mut dependencies = BTreeSet::new();

        let fragment = match shape {
            TypeShape::Struct(shape) => {
                let mut schema = SchemaFragment::object();
                for field in shape.fields {
                    let field_type = field.type_ref.substitute(&shape.generics, &type_ref.args);
                    let mut property = self.nested_schema(&field_type, &mut dependencies);
                    property.description = field.description.clone();
                    if field.is_required() {
                        schema.required.push(field.name.clone());
                    }
                    schema.properties.insert(field.name, property);
                }
                schema
            }
            TypeShape::Newtype(inner) => self.nested_schema(&inner, &mut dependencies),
            TypeShape::Enum(shape) => SchemaFragment {
                enum_values: Some(shape.variants),
                ..SchemaFragment::typed("string", None)
            },
        };

        ResolvedEntry {
            fragment,
            dependencies,
        }
    }

    /// Like [`Self::inline_schema`], falling back to a free-form object for
    /// types that cannot be resolved.
    fn nested_schema(&mut self, type_ref: &TypeRef, dependencies: &mut BTreeSet<String>) -> SchemaFragment {
        match self.inline_schema(type_ref, dependencies) {
            Ok(schema) => schema,
            Err(e) => {
                warn!("Using object placeholder for {}: {}", type_ref, e);
                SchemaFragment::object()
            }
        }
    }

    /// Give `variant` its own copy of a component and of everything it references.
    fn copy_into_variant(&mut self, key: &str, variant: &DocumentVariantKey) {
        let mut pending = vec![key.to_string()];
        while let Some(key) = pending.pop() {
            let schemas = self.variants.entry(variant.clone()).or_default();
            if schemas.contains_key(&key) {
                continue;
            }
            if let Some(Ok(entry)) = self.resolved.get(&key) {
                schemas.insert(key.clone(), entry.fragment.clone());
                pending.extend(entry.dependencies.iter().cloned());
            }
        }
    }
}

/// Convert a primitive type to an OpenAPI schema
fn primitive_to_schema(primitive: PrimitiveType) -> SchemaFragment {
    let (schema_type, format) = match primitive {
        PrimitiveType::String | PrimitiveType::Char => ("string", None),
        PrimitiveType::I8 | PrimitiveType::I16 | PrimitiveType::I32 => ("integer", Some("int32")),
        PrimitiveType::I64 | PrimitiveType::I128 => ("integer", Some("int64")),
        PrimitiveType::U8 | PrimitiveType::U16 | PrimitiveType::U32 => ("integer", Some("int32")),
        PrimitiveType::U64 | PrimitiveType::U128 => ("integer", Some("int64")),
        PrimitiveType::F32 => ("number", Some("float")),
        PrimitiveType::F64 => ("number", Some("double")),
        PrimitiveType::Bool => ("boolean", None),
        PrimitiveType::Uuid => ("string", Some("uuid")),
        PrimitiveType::DateTime => ("string", Some("date-time")),
        PrimitiveType::Date => ("string", Some("date")),
        PrimitiveType::Any => ("object", None),
    };
    SchemaFragment::typed(schema_type, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_resolver::{EnumShape, FieldShape, StructShape};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::cell::RefCell;

    /// Resolver over fixed shapes that records every lookup.
    struct CountingResolver {
        shapes: HashMap<String, TypeShape>,
        calls: RefCell<Vec<String>>,
    }

    impl CountingResolver {
        fn new() -> Self {
            let mut shapes = HashMap::new();
            shapes.insert(
                "User".to_string(),
                TypeShape::Struct(StructShape {
                    generics: vec![],
                    fields: vec![
                        FieldShape::new("id", TypeRef::new("u64")),
                        FieldShape::new("status", TypeRef::new("Status")),
                        FieldShape::new(
                            "nickname",
                            TypeRef::generic("Option", vec![TypeRef::new("String")]),
                        ),
                    ],
                }),
            );
            shapes.insert(
                "Status".to_string(),
                TypeShape::Enum(EnumShape {
                    variants: vec!["Active".to_string(), "Banned".to_string()],
                }),
            );
            shapes.insert(
                "Page".to_string(),
                TypeShape::Struct(StructShape {
                    generics: vec!["T".to_string()],
                    fields: vec![FieldShape::new(
                        "items",
                        TypeRef::generic("Vec", vec![TypeRef::new("T")]),
                    )],
                }),
            );
            shapes.insert(
                "Node".to_string(),
                TypeShape::Struct(StructShape {
                    generics: vec![],
                    fields: vec![FieldShape::new(
                        "children",
                        TypeRef::generic("Vec", vec![TypeRef::new("Node")]),
                    )],
                }),
            );
            shapes.insert(
                "Broken".to_string(),
                TypeShape::Struct(StructShape {
                    generics: vec![],
                    fields: vec![FieldShape::new("ghost", TypeRef::new("Ghost"))],
                }),
            );
            Self {
                shapes,
                calls: RefCell::new(Vec::new()),
            }
        }

        fn calls_for(&self, name: &str) -> usize {
            self.calls.borrow().iter().filter(|c| *c == name).count()
        }
    }

    impl TypeShapeResolver for CountingResolver {
        fn resolve(&self, name: &str) -> Option<TypeShape> {
            self.calls.borrow_mut().push(name.to_string());
            self.shapes.get(name).cloned()
        }
    }

    fn public() -> DocumentVariantKey {
        DocumentVariantKey::new("swagger", "Public")
    }

    #[test]
    fn test_primitive_is_inline() {
        let resolver = CountingResolver::new();
        let mut registry = ReferenceRegistry::new(&resolver);

        let schema = registry
            .resolve(&TypeRef::new("i64"), &DocumentVariantKey::default())
            .unwrap();

        assert_eq!(schema, SchemaFragment::typed("integer", Some("int64")));
        assert!(resolver.calls.borrow().is_empty());
    }

    #[test]
    fn test_struct_becomes_component() {
        let resolver = CountingResolver::new();
        let mut registry = ReferenceRegistry::new(&resolver);
        let variant = DocumentVariantKey::default();

        let schema = registry.resolve(&TypeRef::new("User"), &variant).unwrap();
        assert_eq!(schema, SchemaFragment::reference("User"));

        let user = registry.lookup("User", &variant).unwrap();
        assert_eq!(user.required, vec!["id".to_string(), "status".to_string()]);
        assert_eq!(user.properties["status"], SchemaFragment::reference("Status"));
        assert_eq!(
            user.properties["nickname"],
            SchemaFragment::typed("string", None)
        );

        // nested component registered for the same variant
        let status = registry.lookup("Status", &variant).unwrap();
        assert_eq!(status.enum_values.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn test_resolves_once_and_returns_identical_fragments() {
        let resolver = CountingResolver::new();
        let mut registry = ReferenceRegistry::new(&resolver);

        let first = registry.resolve(&TypeRef::new("User"), &DocumentVariantKey::default()).unwrap();
        let second = registry.resolve(&TypeRef::new("User"), &DocumentVariantKey::default()).unwrap();
        let other_variant = registry.resolve(&TypeRef::new("User"), &public()).unwrap();

        assert_eq!(first, second);
        assert_eq!(first, other_variant);
        assert_eq!(resolver.calls_for("User"), 1);
        assert_eq!(resolver.calls_for("Status"), 1);
        assert_eq!(
            registry.lookup("User", &DocumentVariantKey::default()),
            registry.lookup("User", &public())
        );
    }

    #[test]
    fn test_failure_is_stored_and_replayed() {
        let resolver = CountingResolver::new();
        let mut registry = ReferenceRegistry::new(&resolver);

        let first = registry.resolve(&TypeRef::new("Missing"), &DocumentVariantKey::default());
        let second = registry.resolve(&TypeRef::new("Missing"), &public());

        assert!(first.is_err());
        assert_eq!(first, second);
        assert_eq!(first.unwrap_err().ref_key, "Missing");
        assert_eq!(resolver.calls_for("Missing"), 1);
    }

    #[test]
    fn test_unresolvable_field_falls_back_to_object() {
        let resolver = CountingResolver::new();
        let mut registry = ReferenceRegistry::new(&resolver);
        let variant = DocumentVariantKey::default();

        registry.resolve(&TypeRef::new("Broken"), &variant).unwrap();

        let broken = registry.lookup("Broken", &variant).unwrap();
        assert_eq!(broken.properties["ghost"], SchemaFragment::object());
        // the failure is remembered for direct use
        assert!(registry.resolve(&TypeRef::new("Ghost"), &variant).is_err());
        assert_eq!(resolver.calls_for("Ghost"), 1);
    }

    #[test]
    fn test_generic_arguments_are_substituted() {
        let resolver = CountingResolver::new();
        let mut registry = ReferenceRegistry::new(&resolver);
        let variant = DocumentVariantKey::default();

        let schema = registry
            .resolve(&TypeRef::parse("Page<User>").unwrap(), &variant)
            .unwrap();
        assert_eq!(schema, SchemaFragment::reference("Page.User"));

        let page = registry.lookup("Page.User", &variant).unwrap();
        assert_eq!(
            page.properties["items"],
            SchemaFragment::array(SchemaFragment::reference("User"))
        );
        assert!(registry.lookup("User", &variant).is_some());
    }

    #[test]
    fn test_recursive_type() {
        let resolver = CountingResolver::new();
        let mut registry = ReferenceRegistry::new(&resolver);
        let variant = DocumentVariantKey::default();

        registry.resolve(&TypeRef::new("Node"), &variant).unwrap();

        let node = registry.lookup("Node", &variant).unwrap();
        assert_eq!(
            node.properties["children"],
            SchemaFragment::array(SchemaFragment::reference("Node"))
        );
        assert_eq!(resolver.calls_for("Node"), 1);
    }

    #[test]
    fn test_containers() {
        let resolver = CountingResolver::new();
        let mut registry = ReferenceRegistry::new(&resolver);
        let variant = DocumentVariantKey::default();

        let list = registry
            .resolve(&TypeRef::parse("Option<Vec<User>>").unwrap(), &variant)
            .unwrap();
        let map = registry
            .resolve(&TypeRef::parse("HashMap<String, Status>").unwrap(), &variant)
            .unwrap();

        assert_eq!(list, SchemaFragment::array(SchemaFragment::reference("User")));
        assert_eq!(map, SchemaFragment::map(SchemaFragment::reference("Status")));
    }

    #[test]
    fn test_inject_example_is_variant_scoped() {
        let resolver = CountingResolver::new();
        let mut registry = ReferenceRegistry::new(&resolver);
        let default = DocumentVariantKey::default();

        registry.resolve(&TypeRef::new("User"), &default).unwrap();
        registry.resolve(&TypeRef::new("User"), &public()).unwrap();

        assert!(registry.inject_example("User", &public(), json!({"id": 7})));

        assert_eq!(
            registry.lookup("User", &public()).unwrap().example,
            Some(json!({"id": 7}))
        );
        assert_eq!(registry.lookup("User", &default).unwrap().example, None);
        assert!(!registry.inject_example("Missing", &default, json!(1)));
    }

    #[test]
    fn test_restore_drops_components_and_examples() {
        let resolver = CountingResolver::new();
        let mut registry = ReferenceRegistry::new(&resolver);
        let variant = DocumentVariantKey::default();
        registry.resolve(&TypeRef::new("Status"), &variant).unwrap();

        let snapshot = registry.snapshot();
        registry.resolve(&TypeRef::new("User"), &variant).unwrap();
        registry.inject_example("Status", &variant, json!("Banned"));
        registry.restore(snapshot);

        assert!(registry.lookup("User", &variant).is_none());
        assert_eq!(registry.lookup("Status", &variant).unwrap().example, None);

        // still memoized
        registry.resolve(&TypeRef::new("User"), &variant).unwrap();
        assert_eq!(resolver.calls_for("User"), 1);
        assert!(registry.lookup("User", &variant).is_some());
    }

    #[test]
    fn test_flush_keeps_existing_entries() {
        let resolver = CountingResolver::new();
        let mut registry = ReferenceRegistry::new(&resolver);
        let variant = DocumentVariantKey::default();
        registry.resolve(&TypeRef::new("User"), &variant).unwrap();

        let mut target = BTreeMap::new();
        target.insert("User".to_string(), SchemaFragment::typed("string", None));
        registry.flush(&variant, &mut target);

        assert_eq!(target["User"], SchemaFragment::typed("string", None));
        assert!(target.contains_key("Status"));

        let mut other = BTreeMap::new();
        registry.flush(&public(), &mut other);
        assert!(other.is_empty());
    }
}
