//! dynaproto-compiler
//!
//! This crate implements:
//!  1) A tokenizer + parser for protobuf-style IDL text,
//!  2) An AST (`ProtoFile`, `MessageNode`, `FieldNode`, `EnumNode`),
//!  3) A two-phase schema builder (`create` / `resolve_all` / `build`),
//!  4) `compile_schema` tying the pipeline together, and
//!  5) Error types (`ProtoError`).

pub mod ast;
pub mod builder;
pub mod compiler;
pub mod error;
pub mod parser;
pub mod tokenizer;
pub mod utils;

pub use builder::Builder;
pub use compiler::compile_schema;
pub use error::ProtoError;
