//! Cross-cutting type system for the Tsw compiler
//!
//! This module contains type definitions and utilities used across all
//! compilation phases. Source-level types know how to project themselves
//! onto the four WebAssembly value kinds, which is the only type knowledge
//! the backend ever needs.

mod native;
mod source_types;

// Re-export all public types
pub use native::{NativeType, Target};
pub use source_types::Type;
