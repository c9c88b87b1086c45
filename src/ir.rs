//! Strongly-typed IR for encode procedures. No Go text here until `go_lines`.
//!
//! A `RenderNode` tree is built fresh for one record, rendered once into a flat
//! list of `Stmt`s, and dropped.

use std::collections::HashSet;

use serde::Serialize;
use tracing::trace;

use crate::context::{EmissionContext, Support, SupportSet};
use crate::error::EmissionError;
use crate::golang;

/// Integer range; decides the quoting policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntWidth {
    /// Emitted as a bare JSON number.
    Bits32,
    /// Emitted as a JSON string so 53-bit float consumers keep every digit.
    Bits64,
}

/// Go key type of a map field. Entries are written in ascending key order,
/// `false` before `true` for bool keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MapKey {
    String,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderNode {
    /// Literal text, written verbatim.
    RawText(String),
    /// The runtime value of a string expression.
    RawExpr(String),
    /// `"` + inner + `"`.
    Quoted(Box<RenderNode>),
    Integer { expr: String, width: IntWidth, signed: bool },
    /// Goes through the generic encoder, which rejects NaN and Infinity.
    Float(String),
    Bool(String),
    Null,
    /// Generic encoder fallback. Fails at runtime if the encoder does.
    Marshal(String),
    /// Canonical protobuf JSON of a message expression; nil encodes as `null`.
    ProtoMarshal(String),
    /// Standard base64 text of a byte-slice expression, unquoted.
    Base64(String),
    Array(Vec<RenderNode>),
    Object(Vec<(RenderNode, RenderNode)>),
    /// Runtime-length list: `item` is rendered once per element of `expr`,
    /// bound to the loop variable `var`.
    Repeated { expr: String, var: String, item: Box<RenderNode> },
    /// Runtime-sized map as a JSON object: `key:value` per entry, with the
    /// entry bound to `key_var`/`value_var`. `key` must render a JSON string.
    Map {
        expr: String,
        key_type: MapKey,
        key_var: String,
        value_var: String,
        key: Box<RenderNode>,
        value: Box<RenderNode>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Conversion {
    Verbatim,
    FormatBool,
    FormatInt,
    FormatUint,
    Base64,
}

/// One emission step of the generated encode procedure.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stmt {
    Text(String),
    Expr { expr: String, conversion: Conversion },
    /// Fallible: on error the procedure returns `nil, err`.
    Marshal { expr: String },
    /// Fallible like `Marshal`, through protojson. Writes `null` for nil.
    ProtoMarshal { expr: String },
    /// Writes `,` before every element but the first.
    ForEach { expr: String, var: String, body: Vec<Stmt> },
    /// Map entries in sorted key order, `,` before every entry but the first.
    ForEachEntry {
        expr: String,
        key_type: MapKey,
        key_var: String,
        value_var: String,
        body: Vec<Stmt>,
    },
}

/// Steps produced by one render, with the support libraries they reference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rendered {
    pub stmts: Vec<Stmt>,
    pub support: SupportSet,
}

// ————————————————————————————————————————————————————————————————————————————
// NODES
// ————————————————————————————————————————————————————————————————————————————

impl RenderNode {
    pub fn text(text: impl Into<String>) -> Self {
        RenderNode::RawText(text.into())
    }

    pub fn quoted(inner: RenderNode) -> Self {
        RenderNode::Quoted(Box::new(inner))
    }

    /// A JSON string literal; `value` is JSON-escaped here.
    pub fn quoted_text(value: &str) -> Self {
        RenderNode::quoted(RenderNode::RawText(json_escape(value)))
    }

    pub fn label(&self) -> &'static str {
        match self {
            RenderNode::RawText(_) => "raw_text",
            RenderNode::RawExpr(_) => "raw_expr",
            RenderNode::Quoted(_) => "quoted",
            RenderNode::Integer { .. } => "integer",
            RenderNode::Float(_) => "float",
            RenderNode::Bool(_) => "bool",
            RenderNode::Null => "null",
            RenderNode::Marshal(_) => "marshal",
            RenderNode::ProtoMarshal(_) => "proto_marshal",
            RenderNode::Base64(_) => "base64",
            RenderNode::Array(_) => "array",
            RenderNode::Object(_) => "object",
            RenderNode::Repeated { .. } => "repeated",
            RenderNode::Map { .. } => "map",
        }
    }

    /// Whether the node always writes a JSON string. A `Marshal` counts: map
    /// keys only reach it with a Go string.
    fn is_string_valued(&self) -> bool {
        matches!(
            self,
            RenderNode::Quoted(_)
                | RenderNode::Marshal(_)
                | RenderNode::Integer { width: IntWidth::Bits64, .. }
        )
    }

    /// Lower this node into emission steps. The first failing child aborts the
    /// whole render; no partial step list escapes.
    pub fn render(&self, ctx: &EmissionContext) -> Result<Rendered, EmissionError> {
        let mut out = Rendered::default();
        self.render_into(ctx, &mut out)?;
        trace!(
            record = ctx.record_name(),
            node = self.label(),
            steps = out.stmts.len(),
            "rendered node"
        );
        Ok(out)
    }

    fn render_into(&self, ctx: &EmissionContext, out: &mut Rendered) -> Result<(), EmissionError> {
        match self {
            RenderNode::RawText(text) => out.text(text),
            RenderNode::RawExpr(expr) => out.expr(non_empty(ctx, self, expr)?, Conversion::Verbatim),
            RenderNode::Quoted(inner) => {
                out.text("\"");
                inner.render_into(ctx, out)?;
                out.text("\"");
            }
            RenderNode::Integer { expr, width, signed } => {
                let expr = non_empty(ctx, self, expr)?;
                let conversion = if *signed { Conversion::FormatInt } else { Conversion::FormatUint };
                match width {
                    IntWidth::Bits32 => out.expr(expr, conversion),
                    IntWidth::Bits64 => {
                        out.text("\"");
                        out.expr(expr, conversion);
                        out.text("\"");
                    }
                }
            }
            RenderNode::Float(expr) | RenderNode::Marshal(expr) => {
                let expr = non_empty(ctx, self, expr)?;
                out.push(Stmt::Marshal { expr: expr.to_string() });
            }
            RenderNode::ProtoMarshal(expr) => {
                let expr = non_empty(ctx, self, expr)?;
                out.push(Stmt::ProtoMarshal { expr: expr.to_string() });
            }
            RenderNode::Bool(expr) => out.expr(non_empty(ctx, self, expr)?, Conversion::FormatBool),
            RenderNode::Null => out.text("null"),
            RenderNode::Base64(expr) => out.expr(non_empty(ctx, self, expr)?, Conversion::Base64),
            RenderNode::Array(items) => {
                out.text("[");
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.text(",");
                    }
                    item.render_into(ctx, out)?;
                }
                out.text("]");
            }
            RenderNode::Object(pairs) => {
                let mut seen = HashSet::new();
                out.text("{");
                for (i, (key, value)) in pairs.iter().enumerate() {
                    if let Some(literal) = key_literal(ctx, key)? {
                        if !seen.insert(literal) {
                            return Err(EmissionError::DuplicateKey {
                                record: ctx.record_name().to_string(),
                                key: literal.to_string(),
                            });
                        }
                    }
                    if i > 0 {
                        out.text(",");
                    }
                    key.render_into(ctx, out)?;
                    out.text(":");
                    value.render_into(ctx, out)?;
                }
                out.text("}");
            }
            RenderNode::Repeated { expr, var, item } => {
                let expr = non_empty(ctx, self, expr)?;
                let var = non_empty(ctx, self, var)?;
                let body = item.render(ctx)?;
                out.text("[");
                out.support.merge(&body.support);
                out.stmts.push(Stmt::ForEach {
                    expr: expr.to_string(),
                    var: var.to_string(),
                    body: body.stmts,
                });
                out.text("]");
            }
            RenderNode::Map { expr, key_type, key_var, value_var, key, value } => {
                let expr = non_empty(ctx, self, expr)?;
                let key_var = non_empty(ctx, self, key_var)?;
                let value_var = non_empty(ctx, self, value_var)?;
                if !key.is_string_valued() {
                    return Err(EmissionError::NonStringKey {
                        record: ctx.record_name().to_string(),
                        found: key.label(),
                    });
                }
                let mut body = Rendered::default();
                key.render_into(ctx, &mut body)?;
                body.text(":");
                value.render_into(ctx, &mut body)?;
                out.text("{");
                out.push(Stmt::ForEachEntry {
                    expr: expr.to_string(),
                    key_type: *key_type,
                    key_var: key_var.to_string(),
                    value_var: value_var.to_string(),
                    body: body.stmts,
                });
                out.text("}");
            }
        }
        Ok(())
    }
}

fn non_empty<'a>(ctx: &EmissionContext, node: &RenderNode, expr: &'a str) -> Result<&'a str, EmissionError> {
    if expr.trim().is_empty() {
        return Err(EmissionError::EmptyExpression {
            record: ctx.record_name().to_string(),
            node: node.label(),
        });
    }
    Ok(expr)
}

/// Keys must be quoted strings. Returns the literal text when the key is
/// known at generation time.
fn key_literal<'a>(ctx: &EmissionContext, key: &'a RenderNode) -> Result<Option<&'a str>, EmissionError> {
    match key {
        RenderNode::Quoted(inner) => match inner.as_ref() {
            RenderNode::RawText(text) => Ok(Some(text)),
            _ => Ok(None),
        },
        other => Err(EmissionError::NonStringKey {
            record: ctx.record_name().to_string(),
            found: other.label(),
        }),
    }
}

/// JSON string escaping without the surrounding quotes.
pub fn json_escape(value: &str) -> String {
    let quoted = serde_json::Value::String(value.to_string()).to_string();
    quoted[1..quoted.len() - 1].to_string()
}

// ————————————————————————————————————————————————————————————————————————————
// STEPS
// ————————————————————————————————————————————————————————————————————————————

impl Rendered {
    fn push(&mut self, stmt: Stmt) {
        stmt.collect_support(&mut self.support);
        self.stmts.push(stmt);
    }

    fn text(&mut self, text: &str) {
        self.stmts.push(Stmt::Text(text.to_string()));
    }

    fn expr(&mut self, expr: &str, conversion: Conversion) {
        self.push(Stmt::Expr { expr: expr.to_string(), conversion });
    }

    /// Go statement lines, tab-indented relative to the enclosing block.
    pub fn go_lines(&self, buffer: &str) -> Vec<String> {
        self.stmts.iter().flat_map(|s| s.go_lines(buffer)).collect()
    }
}

impl MapKey {
    pub fn go_type(self) -> &'static str {
        match self {
            MapKey::String => "string",
            MapKey::Int32 => "int32",
            MapKey::Int64 => "int64",
            MapKey::Uint32 => "uint32",
            MapKey::Uint64 => "uint64",
            MapKey::Bool => "bool",
        }
    }

    fn less(self, a: &str, b: &str) -> String {
        match self {
            MapKey::Bool => format!("!{a} && {b}"),
            _ => format!("{a} < {b}"),
        }
    }
}

impl Conversion {
    pub fn support(self) -> Option<Support> {
        match self {
            Conversion::Verbatim => None,
            Conversion::FormatBool | Conversion::FormatInt | Conversion::FormatUint => Some(Support::Strconv),
            Conversion::Base64 => Some(Support::Base64),
        }
    }

    fn apply(self, expr: &str) -> String {
        match self {
            Conversion::Verbatim => expr.to_string(),
            Conversion::FormatBool => format!("strconv.FormatBool({expr})"),
            Conversion::FormatInt => format!("strconv.FormatInt(int64({expr}), 10)"),
            Conversion::FormatUint => format!("strconv.FormatUint(uint64({expr}), 10)"),
            Conversion::Base64 => format!("base64.StdEncoding.EncodeToString({expr})"),
        }
    }
}

impl Stmt {
    pub fn collect_support(&self, into: &mut SupportSet) {
        match self {
            Stmt::Text(_) => {}
            Stmt::Expr { conversion, .. } => {
                if let Some(support) = conversion.support() {
                    into.insert(support);
                }
            }
            Stmt::Marshal { .. } => into.insert(Support::Json),
            Stmt::ProtoMarshal { .. } => into.insert(Support::Protojson),
            Stmt::ForEach { body, .. } => body.iter().for_each(|s| s.collect_support(into)),
            Stmt::ForEachEntry { body, .. } => {
                into.insert(Support::Sort);
                body.iter().for_each(|s| s.collect_support(into));
            }
        }
    }

    pub fn go_lines(&self, buffer: &str) -> Vec<String> {
        match self {
            Stmt::Text(text) => vec![format!("{buffer}.WriteString({})", golang::quote(text))],
            Stmt::Expr { expr, conversion } => {
                vec![format!("{buffer}.WriteString({})", conversion.apply(expr))]
            }
            Stmt::Marshal { expr } => vec![
                "{".to_string(),
                format!("\tres, err := json.Marshal({expr})"),
                "\tif err != nil {".to_string(),
                "\t\treturn nil, err".to_string(),
                "\t}".to_string(),
                format!("\t{buffer}.Write(res)"),
                "}".to_string(),
            ],
            Stmt::ForEach { expr, var, body } => {
                let mut lines = vec![
                    format!("for i, {var} := range {expr} {{"),
                    "\tif i > 0 {".to_string(),
                    format!("\t\t{buffer}.WriteString(\",\")"),
                    "\t}".to_string(),
                ];
                for stmt in body {
                    lines.extend(stmt.go_lines(buffer).into_iter().map(|l| format!("\t{l}")));
                }
                lines.push("}".to_string());
                lines
            }
            Stmt::ProtoMarshal { expr } => vec![
                format!("if {expr} == nil {{"),
                format!("\t{buffer}.WriteString(\"null\")"),
                "} else {".to_string(),
                format!("\tres, err := protojson.Marshal({expr})"),
                "\tif err != nil {".to_string(),
                "\t\treturn nil, err".to_string(),
                "\t}".to_string(),
                format!("\t{buffer}.Write(res)"),
                "}".to_string(),
            ],
            Stmt::ForEachEntry { expr, key_type, key_var, value_var, body } => {
                let mut lines = vec![
                    "{".to_string(),
                    format!("\tkeys := make([]{}, 0, len({expr}))", key_type.go_type()),
                    format!("\tfor k := range {expr} {{"),
                    "\t\tkeys = append(keys, k)".to_string(),
                    "\t}".to_string(),
                    format!(
                        "\tsort.Slice(keys, func(i, j int) bool {{ return {} }})",
                        key_type.less("keys[i]", "keys[j]")
                    ),
                    format!("\tfor i, {key_var} := range keys {{"),
                    "\t\tif i > 0 {".to_string(),
                    format!("\t\t\t{buffer}.WriteString(\",\")"),
                    "\t\t}".to_string(),
                    format!("\t\t{value_var} := {expr}[{key_var}]"),
                ];
                for stmt in body {
                    lines.extend(stmt.go_lines(buffer).into_iter().map(|l| format!("\t\t{l}")));
                }
                lines.push("\t}".to_string());
                lines.push("}".to_string());
                lines
            }
        }
    }
}

/// Merge adjacent literal steps and drop empty ones. The bytes written are
/// unchanged; only the number of `WriteString` calls shrinks.
pub fn fuse_text(stmts: Vec<Stmt>) -> Vec<Stmt> {
    let mut out: Vec<Stmt> = Vec::with_capacity(stmts.len());
    for stmt in stmts {
        match stmt {
            Stmt::Text(text) if text.is_empty() => {}
            Stmt::Text(text) => {
                if let Some(Stmt::Text(prev)) = out.last_mut() {
                    prev.push_str(&text);
                } else {
                    out.push(Stmt::Text(text));
                }
            }
            Stmt::ForEach { expr, var, body } => out.push(Stmt::ForEach {
                expr,
                var,
                body: fuse_text(body),
            }),
            Stmt::ForEachEntry { expr, key_type, key_var, value_var, body } => out.push(Stmt::ForEachEntry {
                expr,
                key_type,
                key_var,
                value_var,
                body: fuse_text(body),
            }),
            other => out.push(other),
        }
    }
    out
}
