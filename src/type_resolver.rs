//! Type shape resolution.
//!
//! The generator never inspects source code itself. It asks a
//! [`TypeShapeResolver`] for the shape (fields, generics, variants) of every
//! type an annotation references. [`SourceTypeResolver`] answers from the Rust
//! sources found under the configured module paths.

use crate::modules::{ModuleSet, ParsedFile};
use log::debug;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// Lookup interface for reflected type shapes.
pub trait TypeShapeResolver {
    /// Shape of the type named `name` (last path segment, no generic arguments).
    fn resolve(&self, name: &str) -> Option<TypeShape>;
}

/// Fixed set of shapes, mostly useful when embedding the generator.
impl TypeShapeResolver for HashMap<String, TypeShape> {
    fn resolve(&self, name: &str) -> Option<TypeShape> {
        self.get(name).cloned()
    }
}

/// Reflected shape of a user-defined type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeShape {
    /// A struct with named fields
    Struct(StructShape),
    /// A tuple struct wrapping exactly one type
    Newtype(TypeRef),
    /// An enum, serialized as its variant names
    Enum(EnumShape),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructShape {
    /// Generic type parameter names in declaration order
    pub generics: Vec<String>,
    pub fields: Vec<FieldShape>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldShape {
    /// Serialized name (after `#[serde(rename)]`)
    pub name: String,
    pub type_ref: TypeRef,
    /// Field doc comment
    pub description: Option<String>,
}

impl FieldShape {
    pub fn new(name: &str, type_ref: TypeRef) -> Self {
        Self {
            name: name.to_string(),
            type_ref,
            description: None,
        }
    }

    /// A field is required unless it is an `Option<T>`.
    pub fn is_required(&self) -> bool {
        self.type_ref.name != "Option"
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnumShape {
    pub variants: Vec<String>,
}

/// A parsed type expression such as `Page<Vec<User>>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeRef {
    /// Last path segment (`User` for `models::User`)
    pub name: String,
    /// Generic arguments
    pub args: Vec<TypeRef>,
}

impl TypeRef {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            args: Vec::new(),
        }
    }

    pub fn generic(name: &str, args: Vec<TypeRef>) -> Self {
        Self {
            name: name.to_string(),
            args,
        }
    }

    /// Parse a type expression written in Rust syntax.
    pub fn parse(source: &str) -> Result<Self, String> {
        syn::parse_str::<syn::Type>(source.trim())
            .map(|ty| Self::from_syn(&ty))
            .map_err(|e| format!("'{}' is not a type expression: {}", source.trim(), e))
    }

    pub fn from_syn(ty: &syn::Type) -> Self {
        match ty {
            syn::Type::Path(type_path) => Self::from_path(&type_path.path),
            syn::Type::Reference(reference) => Self::from_syn(&reference.elem),
            syn::Type::Paren(paren) => Self::from_syn(&paren.elem),
            syn::Type::Group(group) => Self::from_syn(&group.elem),
            syn::Type::Slice(slice) => Self::generic("Vec", vec![Self::from_syn(&slice.elem)]),
            syn::Type::Array(array) => Self::generic("Vec", vec![Self::from_syn(&array.elem)]),
            // Tuples, trait objects, fn pointers...
            _ => Self::new("Value"),
        }
    }

    fn from_path(path: &syn::Path) -> Self {
        let Some(segment) = path.segments.last() else {
            return Self::new("Value");
        };

        let mut args = Vec::new();
        if let syn::PathArguments::AngleBracketed(bracketed) = &segment.arguments {
            for arg in &bracketed.args {
                if let syn::GenericArgument::Type(inner) = arg {
                    args.push(Self::from_syn(inner));
                }
            }
        }

        Self::generic(&segment.ident.to_string(), args)
    }

    /// Canonical registry key: `Page.User` for `Page<User>`.
    ///
    /// Arguments open with `.`, are separated by `-` and close with `.`;
    /// closing dots at the end are dropped. Neither character can appear in a
    /// Rust identifier, so distinct types never share a key.
    pub fn ref_key(&self) -> String {
        let mut key = String::new();
        self.write_key(&mut key);
        key.trim_end_matches('.').to_string()
    }

    fn write_key(&self, key: &mut String) {
        key.push_str(&self.name);
        if self.args.is_empty() {
            return;
        }
        key.push('.');
        for (index, arg) in self.args.iter().enumerate() {
            if index > 0 {
                key.push('-');
            }
            arg.write_key(key);
        }
        key.push('.');
    }

    /// Replace generic parameters by the matching arguments.
    pub fn substitute(&self, params: &[String], args: &[TypeRef]) -> TypeRef {
        if self.args.is_empty() {
            if let Some(index) = params.iter().position(|p| *p == self.name) {
                return args.get(index).cloned().unwrap_or_else(|| TypeRef::new("Value"));
            }
        }
        TypeRef {
            name: self.name.clone(),
            args: self
                .args
                .iter()
                .map(|arg| arg.substitute(params, args))
                .collect(),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.args.is_empty() {
            let args: Vec<String> = self.args.iter().map(ToString::to_string).collect();
            write!(f, "<{}>", args.join(", "))?;
        }
        Ok(())
    }
}

/// Types with a fixed inline schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveType {
    String,
    I8,
    I16,
    I32,
    I64,
    I128,
    U8,
    U16,
    U32,
    U64,
    U128,
    F32,
    F64,
    Bool,
    Char,
    Uuid,
    DateTime,
    Date,
    /// Free-form JSON value
    Any,
}

impl PrimitiveType {
    pub fn parse(type_name: &str) -> Option<PrimitiveType> {
        match type_name {
            "String" | "str" => Some(PrimitiveType::String),
            "i8" => Some(PrimitiveType::I8),
            "i16" => Some(PrimitiveType::I16),
            "i32" | "isize" => Some(PrimitiveType::I32),
            "i64" => Some(PrimitiveType::I64),
            "i128" => Some(PrimitiveType::I128),
            "u8" => Some(PrimitiveType::U8),
            "u16" => Some(PrimitiveType::U16),
            "u32" | "usize" => Some(PrimitiveType::U32),
            "u64" => Some(PrimitiveType::U64),
            "u128" => Some(PrimitiveType::U128),
            "f32" => Some(PrimitiveType::F32),
            "f64" => Some(PrimitiveType::F64),
            "bool" => Some(PrimitiveType::Bool),
            "char" => Some(PrimitiveType::Char),
            "Uuid" => Some(PrimitiveType::Uuid),
            "DateTime" | "NaiveDateTime" | "OffsetDateTime" => Some(PrimitiveType::DateTime),
            "NaiveDate" | "Date" => Some(PrimitiveType::Date),
            "Value" => Some(PrimitiveType::Any),
            _ => None,
        }
    }
}

/// Resolver backed by Rust sources under the module paths.
pub struct SourceTypeResolver {
    modules: ModuleSet,
}

impl SourceTypeResolver {
    pub fn new(modules: ModuleSet) -> Self {
        debug!("Initializing SourceTypeResolver with {} files", modules.files.len());
        Self { modules }
    }

    /// Scan and parse every module path, then build a resolver over them.
    pub fn from_module_paths(paths: &[PathBuf]) -> anyhow::Result<Self> {
        Ok(Self::new(ModuleSet::load(paths)?))
    }

    fn find_item(&self, name: &str) -> Option<&syn::Item> {
        self.modules
            .files
            .iter()
            .find_map(|file| Self::find_in_items(&file.syntax_tree.items, name, file))
    }

    fn find_in_items<'a>(items: &'a [syn::Item], name: &str, file: &ParsedFile) -> Option<&'a syn::Item> {
        for item in items {
            match item {
                syn::Item::Struct(item_struct) if item_struct.ident == name => {
                    debug!("Found struct {} in {}", name, file.path.display());
                    return Some(item);
                }
                syn::Item::Enum(item_enum) if item_enum.ident == name => {
                    debug!("Found enum {} in {}", name, file.path.display());
                    return Some(item);
                }
                syn::Item::Mod(item_mod) => {
                    if let Some((_, nested)) = &item_mod.content {
                        if let Some(found) = Self::find_in_items(nested, name, file) {
                            return Some(found);
                        }
                    }
                }
                _ => {}
            }
        }
        None
    }

    fn struct_shape(item_struct: &syn::ItemStruct) -> TypeShape {
        let generics = item_struct
            .generics
            .type_params()
            .map(|param| param.ident.to_string())
            .collect();

        match &item_struct.fields {
            syn::Fields::Unnamed(unnamed) if unnamed.unnamed.len() == 1 => {
                TypeShape::Newtype(TypeRef::from_syn(&unnamed.unnamed[0].ty))
            }
            syn::Fields::Named(named) => {
                let fields = named
                    .named
                    .iter()
                    .filter_map(Self::field_shape)
                    .collect::<Vec<_>>();
                debug!("Parsed {} fields of {}", fields.len(), item_struct.ident);
                TypeShape::Struct(StructShape { generics, fields })
            }
            _ => TypeShape::Struct(StructShape {
                generics,
                fields: Vec::new(),
            }),
        }
    }

    fn field_shape(field: &syn::Field) -> Option<FieldShape> {
        let ident = field.ident.as_ref()?.to_string();
        let serde_attrs = SerdeAttributes::parse(&field.attrs);
        if serde_attrs.skip {
            debug!("Skipping field {} (serde skip)", ident);
            return None;
        }

        Some(FieldShape {
            name: serde_attrs.rename.unwrap_or(ident),
            type_ref: TypeRef::from_syn(&field.ty),
            description: doc_comment(&field.attrs),
        })
    }

    fn enum_shape(item_enum: &syn::ItemEnum) -> TypeShape {
        let variants = item_enum
            .variants
            .iter()
            .filter_map(|variant| {
                let attrs = SerdeAttributes::parse(&variant.attrs);
                if attrs.skip {
                    None
                } else {
                    Some(attrs.rename.unwrap_or_else(|| variant.ident.to_string()))
                }
            })
            .collect();
        TypeShape::Enum(EnumShape { variants })
    }
}

impl TypeShapeResolver for SourceTypeResolver {
    fn resolve(&self, name: &str) -> Option<TypeShape> {
        debug!("Resolving type: {}", name);
        match self.find_item(name)? {
            syn::Item::Struct(item_struct) => Some(Self::struct_shape(item_struct)),
            syn::Item::Enum(item_enum) => Some(Self::enum_shape(item_enum)),
            _ => None,
        }
    }
}

/// Serde attributes relevant to the serialized shape
#[derive(Debug, Default)]
struct SerdeAttributes {
    rename: Option<String>,
    skip: bool,
}

impl SerdeAttributes {
    fn parse(attrs: &[syn::Attribute]) -> Self {
        let mut parsed = SerdeAttributes::default();

        for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
            let result = attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") && meta.input.peek(syn::Token![=]) {
                    let value: syn::LitStr = meta.value()?.parse()?;
                    parsed.rename = Some(value.value());
                } else if meta.path.is_ident("skip") {
                    parsed.skip = true;
                } else if meta.input.peek(syn::Token![=]) {
                    let _: syn::Expr = meta.value()?.parse()?;
                } else if meta.input.peek(syn::token::Paren) {
                    meta.parse_nested_meta(|inner| {
                        if inner.input.peek(syn::Token![=]) {
                            let _: syn::Expr = inner.value()?.parse()?;
                        }
                        Ok(())
                    })?;
                }
                Ok(())
            });
            if let Err(e) = result {
                debug!("Ignoring unparsable serde attribute: {}", e);
            }
        }

        parsed
    }
}

/// Join `///` doc lines into one description.
fn doc_comment(attrs: &[syn::Attribute]) -> Option<String> {
    let lines: Vec<String> = attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            syn::Meta::NameValue(syn::MetaNameValue {
                value:
                    syn::Expr::Lit(syn::ExprLit {
                        lit: syn::Lit::Str(text),
                        ..
                    }),
                ..
            }) => Some(text.value().trim().to_string()),
            _ => None,
        })
        .filter(|line| !line.is_empty())
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(lines.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn resolver_from_code(code: &str) -> SourceTypeResolver {
        SourceTypeResolver::new(ModuleSet::from_source("models.rs", code).unwrap())
    }

    #[test]
    fn test_type_ref_parse_and_key() {
        let type_ref = TypeRef::parse("Page<Vec<models::User>>").unwrap();

        assert_eq!(type_ref.name, "Page");
        assert_eq!(type_ref.to_string(), "Page<Vec<User>>");
        assert_eq!(type_ref.ref_key(), "Page.Vec.User");
    }

    #[test]
    fn test_ref_keys_do_not_collide() {
        let key = |source: &str| TypeRef::parse(source).unwrap().ref_key();

        assert_eq!(key("User"), "User");
        assert_eq!(key("HashMap<String, User>"), "HashMap.String-User");
        assert_ne!(key("Page<User>"), key("Page_User"));
        assert_ne!(key("A<B_C>"), key("A<B<C>>"));
        assert_ne!(key("A<B<C, D>>"), key("A<B, C<D>>"));
        assert_ne!(key("A<B<C>, D>"), key("A<B<C, D>>"));
        assert_eq!(key("A<B<C>, D>"), "A.B.C.-D");
    }

    #[test]
    fn test_type_ref_references_and_slices() {
        assert_eq!(TypeRef::parse("&str").unwrap(), TypeRef::new("str"));
        assert_eq!(
            TypeRef::parse("[u8; 4]").unwrap(),
            TypeRef::generic("Vec", vec![TypeRef::new("u8")])
        );
    }

    #[test]
    fn test_type_ref_parse_error() {
        assert!(TypeRef::parse("Vec<").is_err());
        assert!(TypeRef::parse("").is_err());
    }

    #[test]
    fn test_substitute_generic_parameters() {
        let field = TypeRef::parse("Vec<T>").unwrap();
        let substituted = field.substitute(&["T".to_string()], &[TypeRef::new("User")]);
        assert_eq!(substituted.to_string(), "Vec<User>");

        let missing = TypeRef::new("T").substitute(&["T".to_string()], &[]);
        assert_eq!(missing, TypeRef::new("Value"));
    }

    #[test]
    fn test_resolve_struct_with_serde_attributes() {
        let resolver = resolver_from_code(
            r#"
            use serde::{Deserialize, Serialize};

            #[derive(Serialize, Deserialize)]
            pub struct User {
                /// Unique identifier
                pub id: u32,
                #[serde(rename = "userName", default)]
                pub name: String,
                #[serde(skip)]
                pub password: String,
                #[serde(skip_serializing_if = "Option::is_none")]
                pub email: Option<String>,
            }
            "#,
        );

        let Some(TypeShape::Struct(shape)) = resolver.resolve("User") else {
            panic!("User should resolve to a struct");
        };

        let names: Vec<&str> = shape.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["id", "userName", "email"]);
        assert_eq!(shape.fields[0].description.as_deref(), Some("Unique identifier"));
        assert!(shape.fields[0].is_required());
        assert!(!shape.fields[2].is_required());
    }

    #[test]
    fn test_resolve_generic_struct() {
        let resolver = resolver_from_code("pub struct Page<T> { pub items: Vec<T>, pub total: u64 }");

        let Some(TypeShape::Struct(shape)) = resolver.resolve("Page") else {
            panic!("Page should resolve to a struct");
        };
        assert_eq!(shape.generics, vec!["T".to_string()]);
        assert_eq!(shape.fields[0].type_ref.to_string(), "Vec<T>");
    }

    #[test]
    fn test_resolve_enum_and_newtype() {
        let resolver = resolver_from_code(
            r#"
            pub enum Status {
                Active,
                #[serde(rename = "on_hold")]
                OnHold,
            }
            pub struct OrderId(pub String);
            "#,
        );

        assert_eq!(
            resolver.resolve("Status"),
            Some(TypeShape::Enum(EnumShape {
                variants: vec!["Active".to_string(), "on_hold".to_string()]
            }))
        );
        assert_eq!(
            resolver.resolve("OrderId"),
            Some(TypeShape::Newtype(TypeRef::new("String")))
        );
    }

    #[test]
    fn test_resolve_inside_inline_module() {
        let resolver = resolver_from_code("mod dto { pub struct Item { pub sku: String } }");
        assert!(resolver.resolve("Item").is_some());
    }

    #[test]
    fn test_resolve_unknown_type() {
        let resolver = resolver_from_code("pub struct User { pub id: u32 }");
        assert!(resolver.resolve("Order").is_none());
    }

    #[test]
    fn test_map_resolver() {
        let mut shapes = HashMap::new();
        shapes.insert("Tag".to_string(), TypeShape::Enum(EnumShape::default()));

        assert!(shapes.resolve("Tag").is_some());
        assert!(shapes.resolve("Other").is_none());
    }

    #[test]
    fn test_primitive_names() {
        assert_eq!(PrimitiveType::parse("usize"), Some(PrimitiveType::U32));
        assert_eq!(PrimitiveType::parse("Uuid"), Some(PrimitiveType::Uuid));
        assert_eq!(PrimitiveType::parse("User"), None);
    }
}
