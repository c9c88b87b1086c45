//! Walks emission steps the way the generated Go `MarshalJSON` does, against
//! a table of accessor values, so encoded output can be checked without a Go
//! toolchain.
#![allow(dead_code)]

use std::cmp::Ordering;
use std::collections::HashMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use protojson_gen::config::Options;
use protojson_gen::context::{DEFAULT_RECORD, EmissionContext};
use protojson_gen::descriptor::{self, MessageDesc};
use protojson_gen::ir::{Conversion, Rendered, Stmt};
use protojson_gen::lower;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Val {
    Bool(bool),
    Str(String),
    Bytes(Vec<u8>),
    Int(i64),
    Uint(u64),
    Float(f64),
    /// Name and number.
    Enum(String, i32),
    List(Vec<Val>),
    /// Entries in Go's unspecified map order.
    Map(Vec<(Val, Val)>),
    /// A nil message pointer.
    Nil,
    /// Output of a nested record's own `MarshalJSON`.
    Json(String),
}

pub type Env = HashMap<String, Val>;

pub fn env<const N: usize>(pairs: [(&str, Val); N]) -> Env {
    pairs.into_iter().map(|(k, v)| (format!("{DEFAULT_RECORD}.{k}"), v)).collect()
}

/// The bytes a successful run writes. A failing step yields `Err` and the
/// buffer is discarded, as `return nil, err` does.
pub fn run(stmts: &[Stmt], env: &Env) -> Result<String, String> {
    let mut buf = String::new();
    exec(stmts, env, &mut buf)?;
    Ok(buf)
}

fn exec(stmts: &[Stmt], env: &Env, buf: &mut String) -> Result<(), String> {
    for stmt in stmts {
        match stmt {
            Stmt::Text(text) => buf.push_str(text),
            Stmt::Expr { expr, conversion } => buf.push_str(&convert(lookup(env, expr)?, *conversion)?),
            Stmt::Marshal { expr } => buf.push_str(&marshal(&lookup(env, expr)?)?),
            Stmt::ProtoMarshal { expr } => match lookup(env, expr)? {
                Val::Nil => buf.push_str("null"),
                Val::Json(raw) => buf.push_str(&raw),
                other => return Err(format!("{expr} is not a message: {other:?}")),
            },
            Stmt::ForEach { expr, var, body } => {
                let Val::List(items) = lookup(env, expr)? else {
                    return Err(format!("{expr} is not a list"));
                };
                for (i, item) in items.into_iter().enumerate() {
                    if i > 0 {
                        buf.push(',');
                    }
                    let mut scoped = env.clone();
                    scoped.insert(var.clone(), item);
                    exec(body, &scoped, buf)?;
                }
            }
            Stmt::ForEachEntry { expr, key_var, value_var, body, .. } => {
                let Val::Map(mut entries) = lookup(env, expr)? else {
                    return Err(format!("{expr} is not a map"));
                };
                entries.sort_by(|(a, _), (b, _)| key_order(a, b));
                for (i, (key, value)) in entries.into_iter().enumerate() {
                    if i > 0 {
                        buf.push(',');
                    }
                    let mut scoped = env.clone();
                    scoped.insert(key_var.clone(), key);
                    scoped.insert(value_var.clone(), value);
                    exec(body, &scoped, buf)?;
                }
            }
        }
    }
    Ok(())
}

fn key_order(a: &Val, b: &Val) -> Ordering {
    match (a, b) {
        (Val::Str(a), Val::Str(b)) => a.cmp(b),
        (Val::Int(a), Val::Int(b)) => a.cmp(b),
        (Val::Uint(a), Val::Uint(b)) => a.cmp(b),
        (Val::Bool(a), Val::Bool(b)) => a.cmp(b),
        (a, b) => panic!("mixed map keys {a:?} and {b:?}"),
    }
}

fn lookup(env: &Env, expr: &str) -> Result<Val, String> {
    if let Some(base) = expr.strip_suffix(".String()") {
        return match lookup(env, base)? {
            Val::Enum(name, _) => Ok(Val::Str(name)),
            other => Err(format!("{base} has no String(): {other:?}")),
        };
    }
    env.get(expr).cloned().ok_or_else(|| format!("unbound expression {expr}"))
}

fn convert(val: Val, conversion: Conversion) -> Result<String, String> {
    match (conversion, val) {
        (Conversion::Verbatim, Val::Str(s)) => Ok(s),
        (Conversion::FormatBool, Val::Bool(b)) => Ok(b.to_string()),
        (Conversion::FormatInt, Val::Int(i)) => Ok(i.to_string()),
        (Conversion::FormatInt, Val::Enum(_, n)) => Ok(n.to_string()),
        (Conversion::FormatUint, Val::Uint(u)) => Ok(u.to_string()),
        (Conversion::Base64, Val::Bytes(b)) => Ok(STANDARD.encode(b)),
        (conversion, val) => Err(format!("cannot apply {conversion:?} to {val:?}")),
    }
}

/// `json.Marshal` for the shapes the tests use.
fn marshal(val: &Val) -> Result<String, String> {
    match val {
        Val::Bool(b) => Ok(b.to_string()),
        Val::Str(s) => serde_json::to_string(s).map_err(|e| e.to_string()),
        Val::Bytes(b) => Ok(format!("\"{}\"", STANDARD.encode(b))),
        Val::Int(i) => Ok(i.to_string()),
        Val::Uint(u) => Ok(u.to_string()),
        Val::Float(f) if !f.is_finite() => Err(format!("json: unsupported value: {f}")),
        Val::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => Ok(format!("{}", *f as i64)),
        Val::Float(f) => Ok(f.to_string()),
        Val::Enum(_, n) => Ok(n.to_string()),
        Val::List(items) => {
            let items = items.iter().map(marshal).collect::<Result<Vec<_>, _>>()?;
            Ok(format!("[{}]", items.join(",")))
        }
        Val::Json(raw) => Ok(raw.clone()),
        Val::Nil => Ok("null".to_string()),
        Val::Map(_) => Err("maps are encoded entry by entry".to_string()),
    }
}

/// First record of the first file of a descriptor document.
pub fn record(doc: Value) -> MessageDesc {
    let mut files = descriptor::load_document(doc).unwrap();
    files.remove(0).messages.remove(0)
}

pub fn render(msg: &MessageDesc, options: &Options) -> Rendered {
    let ctx = EmissionContext::new(DEFAULT_RECORD);
    lower::build_record_tree(&ctx, msg, options).render(&ctx).unwrap()
}

/// Encode `msg` with default options.
pub fn encode(msg: &MessageDesc, env: &Env) -> Result<String, String> {
    run(&render(msg, &Options::default()).stmts, env)
}
