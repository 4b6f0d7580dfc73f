//! CLI: compile models → (schema | tools | validate)
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rayon::prelude::*;
use serde_json::Value;

use crate::compiler::{CompiledModel, compile_model};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// compile interface models (JSON AST) into validation schemas
#[derive(Parser, Debug)]
#[command(name = "shapegen")]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// compile and print JSON Schema for one shape or the whole model
    Schema(SchemaOut),
    /// compile and print one tool descriptor per operation
    Tools(ToolsOut),
    /// validate JSON documents against a compiled shape
    Validate(ValidateArgs),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// JSON Pointer to the model inside each input (e.g. /model)
    #[arg(long)]
    json_pointer: Option<String>,

    /// JQ pre-process filter for each input; every output is compiled as its own model
    #[arg(long)]
    jq_expr: Option<String>,

    /// One or more model files. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct SchemaOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// root shape id (whole model under `$defs` if omitted)
    #[arg(long)]
    shape: Option<String>,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct ToolsOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// tool name prefix (defaults to each input's file stem)
    #[arg(long)]
    prefix: Option<String>,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct ValidateArgs {
    #[command(flatten)]
    input_settings: InputSettings,

    /// shape id, or an operation name to validate against its request shape
    #[arg(long)]
    shape: String,

    /// JSON documents to check. Literal paths or quoted glob patterns
    #[arg(long, num_args = 1.., required = true)]
    data: Vec<String>,
}

/// One compiled model plus where it came from.
struct Loaded {
    label: String,
    stem: String,
    model: CompiledModel,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    /// Compile every input in parallel; each model gets its own compiler.
    fn load_models(&self) -> Result<Vec<Loaded>> {
        let source_paths = resolve_file_path_patterns(&self.input)?;
        let batches = source_paths
            .par_iter()
            .map(|path| self.load_path(path))
            .collect::<Result<Vec<_>>>()?;
        Ok(batches.into_iter().flatten().collect())
    }

    fn load_path(&self, source_path: &Path) -> Result<Vec<Loaded>> {
        let source_path_str = source_path.to_string_lossy().to_string();
        let stem = source_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let mut document = read_json(source_path)?;
        if let Some(pointer) = self.json_pointer.as_deref() {
            document = document
                .pointer(pointer)
                .cloned()
                .ok_or_else(|| anyhow!("{source_path_str}: nothing at JSON pointer {pointer}"))?;
        }
        let documents = match self.jq_expr.as_deref() {
            None => vec![document],
            Some(jq_expr) => crate::jq_exec::apply_filter(jq_expr, &document).with_context(|| {
                format!("Failed to apply jq expression to source file ({source_path_str})")
            })?,
        };
        let many = documents.len() > 1;
        documents
            .iter()
            .enumerate()
            .map(|(i, document)| -> Result<Loaded> {
                let label = if many { format!("{source_path_str}[{i}]") } else { source_path_str.clone() };
                let model = compile_model(document).with_context(|| format!("Failed to compile {label}"))?;
                for diagnostic in model.diagnostics() {
                    eprintln!("{} {label}: {}: {}", "warning:".yellow().bold(), diagnostic.shape, diagnostic.message);
                }
                Ok(Loaded { label, stem: stem.clone(), model })
            })
            .collect()
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Schema(target) => {
                let loaded = target.input_settings.load_models()?;
                let mut outputs = Vec::with_capacity(loaded.len());
                for Loaded { label, model, .. } in &loaded {
                    let schema = match target.shape.as_deref() {
                        None => crate::emit::model_to_json_schema(model),
                        Some(id) => {
                            let root = model
                                .get(id)
                                .ok_or_else(|| anyhow!("{label}: shape not found: {id}"))?;
                            crate::emit::to_json_schema(model, root)
                        }
                    };
                    outputs.push((label.clone(), schema));
                }
                write_output(target.out.as_deref(), collate(outputs))
            }
            Command::Tools(target) => {
                let loaded = target.input_settings.load_models()?;
                let mut tools = Vec::new();
                for Loaded { stem, model, .. } in &loaded {
                    let prefix = target.prefix.as_deref().unwrap_or(stem);
                    tools.extend(model.tools(prefix));
                }
                write_output(target.out.as_deref(), serde_json::to_value(&tools)?)
            }
            Command::Validate(target) => {
                let loaded = target.input_settings.load_models()?;
                let data_paths = resolve_file_path_patterns(&target.data)?;
                let mut failures = 0usize;
                for Loaded { label, model, .. } in &loaded {
                    let root = model
                        .get(&target.shape)
                        .or_else(|| model.request_schema(&target.shape))
                        .ok_or_else(|| anyhow!("{label}: shape not found: {}", target.shape))?;
                    for data_path in &data_paths {
                        let value = read_json(data_path)?;
                        let violations = crate::validate::validate(model, root, &value);
                        let shown = data_path.display();
                        if violations.is_empty() {
                            println!("{} {shown}", "✅".green());
                            continue;
                        }
                        failures += 1;
                        println!("{} {shown}", "❌".red());
                        for violation in violations {
                            println!("    {violation}");
                        }
                    }
                }
                if failures > 0 {
                    bail!("{failures} document(s) failed validation");
                }
                Ok(())
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn read_json(path: &Path) -> Result<Value> {
    let shown = path.display();
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read source file ({shown})"))?;
    serde_json::from_str::<Value>(&source)
        .with_context(|| format!("Failed to parse JSON source file ({shown})"))
}

/// A single input prints bare; several are keyed by their label.
fn collate(mut outputs: Vec<(String, Value)>) -> Value {
    if outputs.len() == 1 {
        return outputs.remove(0).1;
    }
    Value::Object(outputs.into_iter().collect())
}

fn write_output(out: Option<&Path>, value: Value) -> Result<()> {
    let rendered = serde_json::to_string_pretty(&value)?;
    match out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(out, &rendered).with_context(|| format!("Failed to write {}", out.display()))
        }
        None => {
            println!("{rendered}");
            Ok(())
        }
    }
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'['))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let before = out.len();
            for entry in glob::glob(pattern)? {
                out.push(entry?);
            }
            if out.len() == before {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn literal_paths_pass_through() {
        let paths = resolve_file_path_patterns(["models/acme.json"]).unwrap();
        assert_eq!(paths, vec![PathBuf::from("models/acme.json")]);
    }

    #[test]
    fn braces_are_literal_path_characters() {
        let paths = resolve_file_path_patterns(["models/{draft}.json"]).unwrap();
        assert_eq!(paths, vec![PathBuf::from("models/{draft}.json")]);
    }

    #[test]
    fn empty_glob_is_an_error() {
        assert!(resolve_file_path_patterns(["/definitely/not/here/*.json"]).is_err());
    }

    #[test]
    fn collate_keys_multiple_outputs() {
        let single = collate(vec![("a".into(), json!(1))]);
        assert_eq!(single, json!(1));
        let many = collate(vec![("a".into(), json!(1)), ("b".into(), json!(2))]);
        assert_eq!(many, json!({ "a": 1, "b": 2 }));
    }

    #[test]
    fn cli_parses_validate() {
        let cli = CommandLineInterface::try_parse_from([
            "shapegen", "validate", "-i", "acme.json", "--shape", "GetForecast", "--data", "a.json", "b.json",
        ])
        .unwrap();
        let Command::Validate(args) = cli.cmd else { panic!("expected validate") };
        assert_eq!(args.shape, "GetForecast");
        assert_eq!(args.data.len(), 2);
    }
}
