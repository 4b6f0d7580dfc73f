//! Compile interface-definition models (a JSON AST of shapes and traits) into
//! runtime-checkable validation schemas, one per shape.
//!
//! ```text
//! document ─▶ ShapeRegistry ─▶ SchemaCompiler ─▶ CompiledModel ─┬─▶ emit (JSON Schema)
//!                                   │                           ├─▶ tools (operation lookups)
//!                              constraints                      └─▶ validate (JSON values)
//! ```
pub mod error;
pub mod model;
pub mod registry;
pub mod constraints;
pub mod ir;
pub mod compiler;
pub mod emit;
pub mod tools;
pub mod validate;
pub mod jq_exec;
pub mod cli;

pub use compiler::{CompiledModel, Diagnostic, SchemaCompiler, compile_model};
pub use error::{CompileError, Result};
pub use ir::{NodeRef, SchemaNode};
pub use registry::ShapeRegistry;
pub use tools::ToolDescriptor;
