//! Minimal CLI: descriptors → (go | plan)
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use serde_json::{Value, json};
use tracing::info;

use crate::codegen;
use crate::config::Options;
use crate::context::{DEFAULT_RECORD, EmissionContext};
use crate::descriptor::{self, FileDesc, MessageDesc, raw};
use crate::lower;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// generate Go JSON encode/decode methods for protobuf messages from JSON descriptor sets
#[derive(Parser, Debug)]
#[command(name = "protojson-gen", version)]
pub struct CommandLineInterface {
    /// more logging (-v info, -vv debug, -vvv trace); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// emit one `.pb.json.go` file per proto file
    Go(GoOut),
    /// print the per-field lowering plan as JSON (debug view)
    Plan(PlanOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// JSON Pointer to the descriptor set inside each document (e.g. /request/descriptors)
    #[arg(long)]
    json_pointer: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,

    /// only generate these proto files (all when omitted)
    #[arg(long = "file")]
    files: Vec<String>,
}

#[derive(Args, Debug, Clone)]
struct OptionSettings {
    /// protoc-style parameter string, e.g. `enums_as_ints,orig_name=true`
    #[arg(long)]
    param: Option<String>,

    /// JSON file with generation options
    #[arg(long)]
    options_file: Option<PathBuf>,

    /// write enums as numbers
    #[arg(long)]
    enums_as_ints: bool,

    /// recorded in the generated header; encoding always writes default-valued fields
    #[arg(long)]
    emit_defaults: bool,

    /// use proto field names as JSON keys
    #[arg(long)]
    orig_name: bool,

    /// make UnmarshalJSON fail on unknown fields
    #[arg(long)]
    reject_unknown: bool,
}

#[derive(clap::Parser, Debug)]
struct GoOut {
    #[command(flatten)]
    input_settings: InputSettings,

    #[command(flatten)]
    option_settings: OptionSettings,

    /// output directory (stdout if omitted)
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

#[derive(clap::Parser, Debug)]
struct PlanOut {
    #[command(flatten)]
    input_settings: InputSettings,

    #[command(flatten)]
    option_settings: OptionSettings,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    /// Every document is merged into one set before resolving, so types may
    /// reference files from other inputs.
    fn load(&self) -> Result<Vec<FileDesc>> {
        let source_paths = resolve_file_path_patterns(&self.input)
            .context("failed to resolve input file paths")?;
        let mut merged = raw::FileDescriptorSet::default();
        for source_path in source_paths {
            let source_path_str = source_path.to_string_lossy().to_string();
            let source = std::fs::read_to_string(&source_path)
                .with_context(|| format!("failed to read source file ({source_path_str})"))?;
            let json_value = serde_json::from_str::<Value>(&source)
                .with_context(|| format!("failed to parse JSON source file ({source_path_str})"))?;
            let json_value = match self.json_pointer.as_deref() {
                None => json_value,
                Some(pointer) => json_value
                    .pointer(pointer)
                    .cloned()
                    .ok_or_else(|| anyhow!("JSON pointer {pointer} matched nothing in {source_path_str}"))?,
            };
            let set = descriptor::parse_document(json_value)
                .with_context(|| format!("invalid descriptor document ({source_path_str})"))?;
            info!(path = %source_path_str, files = set.file.len(), "loaded descriptors");
            merged.file.extend(set.file);
        }

        let files = descriptor::resolve(&merged)?;
        if self.files.is_empty() {
            return Ok(files);
        }
        for wanted in &self.files {
            if !files.iter().any(|f| &f.name == wanted) {
                bail!("no descriptor for requested file `{wanted}`");
            }
        }
        Ok(files.into_iter().filter(|f| self.files.contains(&f.name)).collect())
    }
}

impl OptionSettings {
    /// Options file, then parameter string, then flags.
    fn resolve(&self) -> Result<Options> {
        let mut options = match self.options_file.as_ref() {
            Some(path) => {
                let source = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read options file ({})", path.display()))?;
                serde_json::from_str::<Options>(&source)
                    .with_context(|| format!("invalid options file ({})", path.display()))?
            }
            None => Options::default(),
        };
        if let Some(param) = self.param.as_deref() {
            options.apply_parameter(param)?;
        }
        options.emit_enums_as_integers |= self.enums_as_ints;
        options.emit_default_valued_fields |= self.emit_defaults;
        options.use_original_field_names |= self.orig_name;
        options.reject_unknown_fields |= self.reject_unknown;
        Ok(options)
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn verbosity(&self) -> u8 {
        self.verbose
    }

    pub fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Go(target) => {
                // debug path
                if target.no_op {
                    eprintln!("{self:#?}");
                    return Ok(());
                }
                let options = target.option_settings.resolve()?;
                let files = target.input_settings.load()?;
                for file in &files {
                    let generated = codegen::generate_file(file, options)
                        .with_context(|| format!("failed to generate {}", file.name))?;
                    match target.out_dir.as_ref() {
                        Some(out_dir) => {
                            let out = out_dir.join(&generated.name);
                            write_file(&out, &generated.content)?;
                            eprintln!("{} {}", "wrote".green().bold(), out.display());
                        }
                        None => print!("{}", generated.content),
                    }
                }
                Ok(())
            }
            Command::Plan(target) => {
                // debug path
                if target.no_op {
                    eprintln!("{self:#?}");
                    return Ok(());
                }
                let options = target.option_settings.resolve()?;
                let files = target.input_settings.load()?;
                let plan = json!({
                    "options": options,
                    "files": files.iter().map(|f| plan_file(f, &options)).collect::<Vec<_>>(),
                });
                let plan_src = serde_json::to_string_pretty(&plan)?;
                match target.out.as_ref() {
                    Some(out) => write_file(out, &plan_src)?,
                    None => println!("{plan_src}"),
                }
                Ok(())
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn plan_file(file: &FileDesc, options: &Options) -> Value {
    fn walk(messages: &[MessageDesc], options: &Options, out: &mut Vec<Value>) {
        for msg in messages.iter().filter(|m| !m.is_map_entry) {
            let ctx = EmissionContext::new(DEFAULT_RECORD);
            out.push(json!({
                "record": msg.full_name,
                "go_ident": msg.go_ident,
                "fields": lower::plan_record(&ctx, msg, options),
            }));
            walk(&msg.messages, options, out);
        }
    }
    let mut records = Vec::new();
    walk(&file.messages, options, &mut records);
    json!({
        "file": file.name,
        "output": file.output_name(),
        "package": file.go_package_name,
        "records": records,
    })
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                // Pattern was explicitly a glob but matched nothing -> surface as an error
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
