//! Wire shape of `google.protobuf.FileDescriptorSet` in protobuf's JSON
//! mapping (camelCase keys, enum values by name). Only what generation reads.
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDescriptorSet {
    #[serde(default)]
    pub file: Vec<FileDescriptorProto>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDescriptorProto {
    pub name: String,
    #[serde(default)]
    pub package: String,
    #[serde(default)]
    pub message_type: Vec<DescriptorProto>,
    #[serde(default)]
    pub enum_type: Vec<EnumDescriptorProto>,
    #[serde(default)]
    pub options: Option<FileOptions>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileOptions {
    #[serde(default)]
    pub go_package: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptorProto {
    pub name: String,
    #[serde(default)]
    pub field: Vec<FieldDescriptorProto>,
    #[serde(default)]
    pub extension: Vec<FieldDescriptorProto>,
    #[serde(default)]
    pub nested_type: Vec<DescriptorProto>,
    #[serde(default)]
    pub enum_type: Vec<EnumDescriptorProto>,
    #[serde(default)]
    pub oneof_decl: Vec<OneofDescriptorProto>,
    #[serde(default)]
    pub options: Option<MessageOptions>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageOptions {
    #[serde(default)]
    pub map_entry: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptorProto {
    pub name: String,
    #[serde(default)]
    pub number: i32,
    #[serde(default)]
    pub label: Option<Label>,
    #[serde(default, rename = "type")]
    pub type_: Option<FieldType>,
    #[serde(default)]
    pub type_name: Option<String>,
    #[serde(default)]
    pub extendee: Option<String>,
    #[serde(default)]
    pub json_name: Option<String>,
    #[serde(default)]
    pub oneof_index: Option<i32>,
    #[serde(default)]
    pub proto3_optional: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OneofDescriptorProto {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnumDescriptorProto {
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Label {
    #[serde(rename = "LABEL_OPTIONAL")]
    Optional,
    #[serde(rename = "LABEL_REQUIRED")]
    Required,
    #[serde(rename = "LABEL_REPEATED")]
    Repeated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
    TypeDouble,
    TypeFloat,
    TypeInt64,
    TypeUint64,
    TypeInt32,
    TypeFixed64,
    TypeFixed32,
    TypeBool,
    TypeString,
    TypeGroup,
    TypeMessage,
    TypeBytes,
    TypeUint32,
    TypeEnum,
    TypeSfixed32,
    TypeSfixed64,
    TypeSint32,
    TypeSint64,
}
