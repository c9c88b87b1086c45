use serde::Serialize;
use tracing::debug;

use crate::config::Options;
use crate::context::EmissionContext;
use crate::descriptor::{Cardinality, FieldDesc, Kind, MessageDesc};
use crate::ir::{IntWidth, MapKey, RenderNode};

/// Loop variable bound to each element of a repeated field.
pub const LOOP_VAR: &str = "item";
/// Loop variables bound to each map entry.
pub const MAP_KEY_VAR: &str = "key";
pub const MAP_VALUE_VAR: &str = "value";

/// Encoded by protojson, not the generated hooks.
const WELL_KNOWN_PREFIX: &str = "google.protobuf.";
/// Always `null` in protobuf JSON.
const NULL_VALUE: &str = "google.protobuf.NullValue";

/// Why a field is left out of the encoded object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Member of a one-of (proto3 `optional` included): presence is a runtime
    /// property and the object layout is fixed at generation time.
    Oneof,
    Extension,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldPlan {
    pub name: String,
    pub number: i32,
    pub kind: Kind,
    pub key: Option<String>,
    pub node: Option<RenderNode>,
    pub skipped: Option<SkipReason>,
}

/// `msg.GetFooBar()`
pub fn accessor(ctx: &EmissionContext, field: &FieldDesc) -> String {
    format!("{}.Get{}()", ctx.record_name(), field.go_name)
}

pub fn skip_reason(field: &FieldDesc) -> Option<SkipReason> {
    if field.is_extension {
        Some(SkipReason::Extension)
    } else if field.oneof.is_some() || field.proto3_optional {
        Some(SkipReason::Oneof)
    } else {
        None
    }
}

pub fn key_name<'a>(field: &'a FieldDesc, options: &Options) -> &'a str {
    if options.use_original_field_names { &field.name } else { &field.json_name }
}

/// Placeholder for kinds outside the dispatch table: an empty JSON string.
pub fn unsupported() -> RenderNode {
    RenderNode::quoted_text("")
}

pub fn lower_field(ctx: &EmissionContext, field: &FieldDesc, options: &Options) -> RenderNode {
    let expr = accessor(ctx, field);
    match (&field.kind, field.cardinality) {
        (Kind::Map { .. }, _) => lower_value(&field.kind, &expr, options),
        (kind, Cardinality::Repeated) => RenderNode::Repeated {
            expr,
            var: LOOP_VAR.to_string(),
            item: Box::new(lower_value(kind, LOOP_VAR, options)),
        },
        (kind, _) => lower_value(kind, &expr, options),
    }
}

fn lower_value(kind: &Kind, expr: &str, options: &Options) -> RenderNode {
    let int = |width, signed| RenderNode::Integer { expr: expr.to_string(), width, signed };
    match kind {
        Kind::Bool => RenderNode::Bool(expr.to_string()),
        Kind::String => RenderNode::Marshal(expr.to_string()),
        Kind::Bytes => RenderNode::quoted(RenderNode::Base64(expr.to_string())),
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => int(IntWidth::Bits32, true),
        Kind::Uint32 | Kind::Fixed32 => int(IntWidth::Bits32, false),
        Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => int(IntWidth::Bits64, true),
        Kind::Uint64 | Kind::Fixed64 => int(IntWidth::Bits64, false),
        Kind::Float | Kind::Double => RenderNode::Float(expr.to_string()),
        Kind::Enum(name) if name == NULL_VALUE => RenderNode::Null,
        Kind::Enum(_) if options.emit_enums_as_integers => int(IntWidth::Bits32, true),
        Kind::Enum(_) => RenderNode::quoted(RenderNode::RawExpr(format!("{expr}.String()"))),
        Kind::Message(name) if name.starts_with(WELL_KNOWN_PREFIX) => RenderNode::ProtoMarshal(expr.to_string()),
        // Reaches the nested type's own MarshalJSON; nil encodes as null.
        Kind::Message(_) => RenderNode::Marshal(expr.to_string()),
        Kind::Map { key, value } => lower_map(expr, key, value, options),
        Kind::Group(name) => {
            debug!(group = %name, "no lowering for group fields, emitting empty string");
            unsupported()
        }
    }
}

/// Keys become JSON strings (integers and bools via strconv), values follow
/// the same rules as singular fields.
fn lower_map(expr: &str, key: &Kind, value: &Kind, options: &Options) -> RenderNode {
    let var = || MAP_KEY_VAR.to_string();
    let int = |width, signed| RenderNode::Integer { expr: var(), width, signed };
    let (key_type, key_node) = match key {
        Kind::String => (MapKey::String, RenderNode::Marshal(var())),
        Kind::Bool => (MapKey::Bool, RenderNode::quoted(RenderNode::Bool(var()))),
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => (MapKey::Int32, RenderNode::quoted(int(IntWidth::Bits32, true))),
        Kind::Uint32 | Kind::Fixed32 => (MapKey::Uint32, RenderNode::quoted(int(IntWidth::Bits32, false))),
        Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => (MapKey::Int64, int(IntWidth::Bits64, true)),
        Kind::Uint64 | Kind::Fixed64 => (MapKey::Uint64, int(IntWidth::Bits64, false)),
        other => {
            debug!(key = ?other, "map key kind is not a protobuf key type, emitting empty string");
            return unsupported();
        }
    };
    RenderNode::Map {
        expr: expr.to_string(),
        key_type,
        key_var: MAP_KEY_VAR.to_string(),
        value_var: MAP_VALUE_VAR.to_string(),
        key: Box::new(key_node),
        value: Box::new(lower_value(value, MAP_VALUE_VAR, options)),
    }
}

/// The record as a JSON object, one pair per encoded field in declaration order.
pub fn build_record_tree(ctx: &EmissionContext, msg: &MessageDesc, options: &Options) -> RenderNode {
    let pairs = msg
        .fields
        .iter()
        .filter_map(|field| {
            if let Some(reason) = skip_reason(field) {
                debug!(record = %msg.full_name, field = %field.name, ?reason, "skipping field");
                return None;
            }
            let key = RenderNode::quoted_text(key_name(field, options));
            Some((key, lower_field(ctx, field, options)))
        })
        .collect();
    RenderNode::Object(pairs)
}

/// Same walk as `build_record_tree`, reported per field for the debug view.
pub fn plan_record(ctx: &EmissionContext, msg: &MessageDesc, options: &Options) -> Vec<FieldPlan> {
    msg.fields
        .iter()
        .map(|field| {
            let skipped = skip_reason(field);
            let lowered = skipped.is_none();
            FieldPlan {
                name: field.name.clone(),
                number: field.number,
                kind: field.kind.clone(),
                key: lowered.then(|| key_name(field, options).to_string()),
                node: lowered.then(|| lower_field(ctx, field, options)),
                skipped,
            }
        })
        .collect()
}
