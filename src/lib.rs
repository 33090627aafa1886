//! Tsw_compiler: a statically-typed, TypeScript-flavored language compiler
//! targeting WebAssembly
//!
//! # Architecture
//! - `types`: Cross-cutting type system used across all compilation phases
//! - `ast`: Abstract syntax tree as produced by the upstream parser
//! - `program`: Sources, element table, resolver and diagnostics
//! - `codegen`: Declaration driver, statement/expression lowering,
//!   conversions, builtins, memory layout
//! - `backend`: WebAssembly module IR and binary assembly
//! - `driver`: Compilation orchestration and format conversions

// Core compiler modules
pub mod ast;
pub mod backend;
pub mod codegen;
pub mod diagnostics;
pub mod driver;
pub mod program;
pub mod types;
