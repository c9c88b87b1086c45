//! Read-only descriptor tree handed to the generator.
//!
//! Input is the JSON form of a `FileDescriptorSet` (or a single
//! `FileDescriptorProto`). Loading happens in two passes:
//! 1. register every message and enum of every file by fully-qualified name;
//! 2. build `FileDesc` trees, resolving field types against that registry
//!    so cross-file references and map entries are known up front.
pub mod raw;

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::DescriptorError;
use crate::golang;
use crate::path_de::from_value_with_path;
use raw::{FieldDescriptorProto, FieldType, Label};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone)]
pub struct FileDesc {
    /// Path of the `.proto` file, e.g. `e2e/e2e.proto`.
    pub name: String,
    pub package: String,
    pub go_package_name: String,
    pub messages: Vec<MessageDesc>,
}

#[derive(Debug, Clone)]
pub struct MessageDesc {
    /// Without the leading dot, e.g. `acme.Outer.Inner`.
    pub full_name: String,
    pub name: String,
    /// Go type name, e.g. `Outer_Inner`.
    pub go_ident: String,
    /// Declaration order. Extensions declared in the message follow its fields.
    pub fields: Vec<FieldDesc>,
    pub messages: Vec<MessageDesc>,
    pub is_map_entry: bool,
}

#[derive(Debug, Clone)]
pub struct FieldDesc {
    pub name: String,
    pub json_name: String,
    pub go_name: String,
    pub number: i32,
    pub kind: Kind,
    pub cardinality: Cardinality,
    /// Name of the containing one-of, synthetic ones included.
    pub oneof: Option<String>,
    pub proto3_optional: bool,
    pub is_extension: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Bool,
    String,
    Bytes,
    Int32,
    Sint32,
    Sfixed32,
    Uint32,
    Fixed32,
    Int64,
    Sint64,
    Sfixed64,
    Uint64,
    Fixed64,
    Float,
    Double,
    Enum(String),
    Message(String),
    Map { key: Box<Kind>, value: Box<Kind> },
    Group(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    Optional,
    Required,
    Repeated,
}

impl FileDesc {
    /// `dir/name.proto` → `dir/name.pb.json.go`.
    pub fn output_name(&self) -> String {
        let stem = self.name.strip_suffix(".proto").unwrap_or(&self.name);
        format!("{stem}.pb.json.go")
    }
}

// ————————————————————————————————————————————————————————————————————————————
// LOADING
// ————————————————————————————————————————————————————————————————————————————

/// Accepts a `FileDescriptorSet` (`{"file": [...]}`) or a single file.
pub fn parse_document(value: Value) -> Result<raw::FileDescriptorSet, DescriptorError> {
    if value.get("file").is_some() {
        from_value_with_path(value)
    } else {
        let file: raw::FileDescriptorProto = from_value_with_path(value)?;
        Ok(raw::FileDescriptorSet { file: vec![file] })
    }
}

pub fn load_document(value: Value) -> Result<Vec<FileDesc>, DescriptorError> {
    resolve(&parse_document(value)?)
}

pub fn resolve(set: &raw::FileDescriptorSet) -> Result<Vec<FileDesc>, DescriptorError> {
    let mut registry = Registry::default();
    for file in &set.file {
        registry.register_file(file);
    }
    debug!(types = registry.types.len(), files = set.file.len(), "registered descriptor types");
    set.file.iter().map(|file| registry.build_file(file)).collect()
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

enum TypeEntry<'a> {
    Message { map_entry: Option<(&'a FieldDescriptorProto, &'a FieldDescriptorProto)> },
    Enum,
}

#[derive(Default)]
struct Registry<'a> {
    /// Keyed by fully-qualified name with the leading dot, as in `type_name`.
    types: IndexMap<String, TypeEntry<'a>>,
}

fn qualify(scope: &str, name: &str) -> String {
    if scope.is_empty() { name.to_string() } else { format!("{scope}.{name}") }
}

impl<'a> Registry<'a> {
    fn register_file(&mut self, file: &'a raw::FileDescriptorProto) {
        for e in &file.enum_type {
            self.types.insert(format!(".{}", qualify(&file.package, &e.name)), TypeEntry::Enum);
        }
        for m in &file.message_type {
            self.register_message(&file.package, m);
        }
    }

    fn register_message(&mut self, scope: &str, msg: &'a raw::DescriptorProto) {
        let full = qualify(scope, &msg.name);
        let is_map_entry = msg.options.as_ref().is_some_and(|o| o.map_entry);
        let map_entry = if is_map_entry {
            let key = msg.field.iter().find(|f| f.number == 1 || f.name == "key");
            let value = msg.field.iter().find(|f| f.number == 2 || f.name == "value");
            key.zip(value)
        } else {
            None
        };
        self.types.insert(format!(".{full}"), TypeEntry::Message { map_entry });
        for e in &msg.enum_type {
            self.types.insert(format!(".{}", qualify(&full, &e.name)), TypeEntry::Enum);
        }
        for nested in &msg.nested_type {
            self.register_message(&full, nested);
        }
    }

    /// Fully-qualified names start with `.`; anything else is resolved
    /// C++-style from the innermost scope outwards.
    fn lookup(&self, type_name: &str, scope: &str) -> Option<(&str, &TypeEntry<'a>)> {
        if type_name.starts_with('.') {
            return self.types.get_key_value(type_name).map(|(k, v)| (k.as_str(), v));
        }
        let mut scope = scope;
        loop {
            let candidate = format!(".{}", qualify(scope, type_name));
            if let Some((k, v)) = self.types.get_key_value(&candidate) {
                return Some((k.as_str(), v));
            }
            if scope.is_empty() {
                return None;
            }
            scope = scope.rsplit_once('.').map(|(parent, _)| parent).unwrap_or("");
        }
    }

    fn build_file(&self, file: &raw::FileDescriptorProto) -> Result<FileDesc, DescriptorError> {
        let go_package = file.options.as_ref().and_then(|o| o.go_package.as_deref());
        let go_package_name = golang::package_name(go_package, &file.package, &file.name)
            .ok_or_else(|| DescriptorError::NoPackageName { file: file.name.clone() })?;
        let messages = file
            .message_type
            .iter()
            .map(|m| self.build_message(&file.package, &file.package, m))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(FileDesc {
            name: file.name.clone(),
            package: file.package.clone(),
            go_package_name,
            messages,
        })
    }

    fn build_message(&self, package: &str, scope: &str, msg: &raw::DescriptorProto) -> Result<MessageDesc, DescriptorError> {
        let full_name = qualify(scope, &msg.name);
        let local = full_name
            .strip_prefix(package)
            .map(|rest| rest.trim_start_matches('.'))
            .unwrap_or(&full_name);
        let mut fields = Vec::with_capacity(msg.field.len() + msg.extension.len());
        for f in &msg.field {
            fields.push(self.build_field(&full_name, msg, f, false)?);
        }
        let mut names = golang::FieldNames::new();
        let mut oneofs = HashSet::new();
        for field in &mut fields {
            field.go_name = names.claim(&field.go_name, true);
            if let Some(oneof) = &field.oneof {
                if oneofs.insert(oneof.clone()) {
                    names.claim(&golang::camel_case(oneof), false);
                }
            }
        }
        for f in &msg.extension {
            fields.push(self.build_field(&full_name, msg, f, true)?);
        }
        let messages = msg
            .nested_type
            .iter()
            .map(|m| self.build_message(package, &full_name, m))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(MessageDesc {
            go_ident: golang::camel_case(local),
            name: msg.name.clone(),
            full_name,
            fields,
            messages,
            is_map_entry: msg.options.as_ref().is_some_and(|o| o.map_entry),
        })
    }

    fn build_field(
        &self,
        scope: &str,
        msg: &raw::DescriptorProto,
        field: &FieldDescriptorProto,
        is_extension: bool,
    ) -> Result<FieldDesc, DescriptorError> {
        let qualified = qualify(scope, &field.name);
        let oneof = field
            .oneof_index
            .and_then(|i| usize::try_from(i).ok())
            .and_then(|i| msg.oneof_decl.get(i))
            .map(|o| o.name.clone());
        let cardinality = match field.label {
            Some(Label::Repeated) => Cardinality::Repeated,
            Some(Label::Required) => Cardinality::Required,
            Some(Label::Optional) | None => Cardinality::Optional,
        };
        Ok(FieldDesc {
            json_name: field.json_name.clone().unwrap_or_else(|| golang::json_name(&field.name)),
            go_name: golang::camel_case(&field.name),
            name: field.name.clone(),
            number: field.number,
            kind: self.resolve_kind(&qualified, scope, field)?,
            cardinality,
            oneof,
            proto3_optional: field.proto3_optional,
            is_extension: is_extension || field.extendee.is_some(),
        })
    }

    fn resolve_kind(&self, qualified: &str, scope: &str, field: &FieldDescriptorProto) -> Result<Kind, DescriptorError> {
        let referenced = match field.type_name.as_deref() {
            Some(type_name) => Some(self.lookup(type_name, scope).ok_or_else(|| {
                DescriptorError::UnresolvedType {
                    field: qualified.to_string(),
                    type_name: type_name.to_string(),
                }
            })?),
            None => None,
        };
        let field_type = match (field.type_, referenced) {
            (Some(t), _) => t,
            (None, Some((_, TypeEntry::Enum))) => FieldType::TypeEnum,
            (None, Some((_, TypeEntry::Message { .. }))) => FieldType::TypeMessage,
            (None, None) => {
                return Err(DescriptorError::MissingType { field: qualified.to_string() });
            }
        };
        let type_name = |kind: &'static str| {
            referenced
                .map(|(name, _)| name.trim_start_matches('.').to_string())
                .ok_or_else(|| DescriptorError::MissingTypeName { field: qualified.to_string(), kind })
        };
        let kind = match field_type {
            FieldType::TypeBool => Kind::Bool,
            FieldType::TypeString => Kind::String,
            FieldType::TypeBytes => Kind::Bytes,
            FieldType::TypeInt32 => Kind::Int32,
            FieldType::TypeSint32 => Kind::Sint32,
            FieldType::TypeSfixed32 => Kind::Sfixed32,
            FieldType::TypeUint32 => Kind::Uint32,
            FieldType::TypeFixed32 => Kind::Fixed32,
            FieldType::TypeInt64 => Kind::Int64,
            FieldType::TypeSint64 => Kind::Sint64,
            FieldType::TypeSfixed64 => Kind::Sfixed64,
            FieldType::TypeUint64 => Kind::Uint64,
            FieldType::TypeFixed64 => Kind::Fixed64,
            FieldType::TypeFloat => Kind::Float,
            FieldType::TypeDouble => Kind::Double,
            FieldType::TypeEnum => Kind::Enum(type_name("enum")?),
            FieldType::TypeGroup => Kind::Group(type_name("group")?),
            FieldType::TypeMessage => {
                let name = type_name("message")?;
                match referenced {
                    Some((_, TypeEntry::Message { map_entry: Some((key, value)) }))
                        if field.label == Some(Label::Repeated) =>
                    {
                        let entry_scope = name.as_str();
                        Kind::Map {
                            key: Box::new(self.resolve_kind(qualified, entry_scope, key)?),
                            value: Box::new(self.resolve_kind(qualified, entry_scope, value)?),
                        }
                    }
                    Some((_, TypeEntry::Message { map_entry: Some(_) })) => {
                        return Err(DescriptorError::MalformedMapEntry { entry: name });
                    }
                    _ => Kind::Message(name),
                }
            }
        };
        Ok(kind)
    }
}
