//! Template assembler: one Go source file per proto file.
//!
//! Layout of a generated file:
//! - header: banner, source, options, `package`, imports;
//! - per record, depth-first in declaration order: `UnmarshalJSON`
//!   (delegating to protojson) then `MarshalJSON` (the linearized IR).
//!
//! The import block is computed last, from what the records actually used.
use tracing::{debug, info};

use crate::config::Options;
use crate::context::{DEFAULT_BUFFER, DEFAULT_RECORD, EmissionContext, Support, SupportSet};
use crate::descriptor::{FileDesc, MessageDesc};
use crate::error::GenerateError;
use crate::golang;
use crate::ir::{self, Rendered};
use crate::lower;

pub const BANNER: &str = "// Code generated by protojson-gen. DO NOT EDIT.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    /// Relative output path, e.g. `e2e/e2e.pb.json.go`.
    pub name: String,
    pub content: String,
}

struct Unit {
    source: String,
    package: String,
}

pub struct Codegen {
    options: Options,
    unit: Option<Unit>,
    body: String,
    support: SupportSet,
    records: usize,
}

impl Codegen {
    pub fn new(options: Options) -> Self {
        Codegen {
            options,
            unit: None,
            body: String::new(),
            support: SupportSet::new(),
            records: 0,
        }
    }

    /// Emit every record of `file`. Aborts on the first record that fails;
    /// nothing from the failing record reaches the output.
    pub fn emit(&mut self, file: &FileDesc) -> Result<(), GenerateError> {
        ensure_identifier(&file.go_package_name)?;
        info!(file = %file.name, package = %file.go_package_name, "generating");
        self.unit = Some(Unit {
            source: file.name.clone(),
            package: file.go_package_name.clone(),
        });
        self.emit_messages(&file.messages)
    }

    fn emit_messages(&mut self, messages: &[MessageDesc]) -> Result<(), GenerateError> {
        for msg in messages {
            if msg.is_map_entry {
                debug!(record = %msg.full_name, "skipping map entry");
                continue;
            }
            self.emit_record(msg)?;
            self.emit_messages(&msg.messages)?;
        }
        Ok(())
    }

    fn emit_record(&mut self, msg: &MessageDesc) -> Result<(), GenerateError> {
        ensure_identifier(&msg.go_ident)?;
        info!(record = %msg.full_name, go_ident = %msg.go_ident, "processing record");

        let mut ctx = EmissionContext::new(DEFAULT_RECORD).with_buffer(DEFAULT_BUFFER);
        let tree = lower::build_record_tree(&ctx, msg, &self.options);
        let rendered = tree.render(&ctx)?;

        ctx.add_support(Support::Protojson);
        ctx.add_support(Support::Bytes);
        ctx.merge_support(&rendered.support);

        let segment = self.record_segment(&ctx, &msg.go_ident, rendered);
        self.body.push_str(&segment);
        self.support.merge(ctx.required_support());
        self.records += 1;
        Ok(())
    }

    fn record_segment(&self, ctx: &EmissionContext, go_ident: &str, rendered: Rendered) -> String {
        let rec = ctx.record_name();
        let buf = ctx.buffer_name();
        let discard_unknown = !self.options.reject_unknown_fields;

        let mut out = String::new();
        out.push_str("\n// UnmarshalJSON implements json.Unmarshaler\n");
        out.push_str(&format!("func ({rec} *{go_ident}) UnmarshalJSON(b []byte) error {{\n"));
        out.push_str("\treturn protojson.UnmarshalOptions{\n");
        out.push_str(&format!("\t\tDiscardUnknown: {discard_unknown},\n"));
        out.push_str(&format!("\t}}.Unmarshal(b, {rec})\n"));
        out.push_str("}\n");

        out.push_str("\n// MarshalJSON implements json.Marshaler\n");
        out.push_str(&format!("func ({rec} *{go_ident}) MarshalJSON() ([]byte, error) {{\n"));
        out.push_str(&format!("\tvar {buf} bytes.Buffer\n"));
        for stmt in ir::fuse_text(rendered.stmts) {
            for line in stmt.go_lines(buf) {
                out.push('\t');
                out.push_str(&line);
                out.push('\n');
            }
        }
        out.push_str(&format!("\treturn {buf}.Bytes(), nil\n"));
        out.push_str("}\n");
        out
    }

    /// Union of every emitted record's support libraries.
    pub fn required_support(&self) -> &SupportSet {
        &self.support
    }

    pub fn records(&self) -> usize {
        self.records
    }

    pub fn into_string(self) -> String {
        let mut out = self.header();
        out.push_str(&self.body);
        out
    }

    fn header(&self) -> String {
        let Some(unit) = &self.unit else {
            return String::new();
        };
        let mut out = String::new();
        out.push_str(BANNER);
        out.push('\n');
        out.push_str(&format!("// source: {}\n", unit.source));
        out.push_str(&format!("// options: {}\n", self.options.to_parameter()));
        out.push_str(&format!("\npackage {}\n", unit.package));

        let (std, third_party): (Vec<Support>, Vec<Support>) = self.support.iter().partition(|s| s.is_std());
        if std.is_empty() && third_party.is_empty() {
            return out;
        }
        let paths = |group: &[Support]| {
            let mut paths: Vec<_> = group.iter().map(|s| s.import_path()).collect();
            paths.sort_unstable();
            paths
        };
        out.push_str("\nimport (\n");
        for path in paths(std.as_slice()) {
            out.push_str(&format!("\t\"{path}\"\n"));
        }
        if !std.is_empty() && !third_party.is_empty() {
            out.push('\n');
        }
        for path in paths(third_party.as_slice()) {
            out.push_str(&format!("\t\"{path}\"\n"));
        }
        out.push_str(")\n");
        out
    }
}

pub fn generate_file(file: &FileDesc, options: Options) -> Result<GeneratedFile, GenerateError> {
    let mut cg = Codegen::new(options);
    cg.emit(file)?;
    Ok(GeneratedFile {
        name: file.output_name(),
        content: cg.into_string(),
    })
}

fn ensure_identifier(name: &str) -> Result<(), GenerateError> {
    if golang::is_identifier(name) {
        Ok(())
    } else {
        Err(GenerateError::InvalidIdentifier(name.to_string()))
    }
}
