//! Compilation orchestration and format conversions
//!
//! Pure functions only: the core takes a resolved program and hands back
//! an in-memory module or its binary serialization. File I/O and the CLI
//! live with the embedder.

mod conversion;
mod pipeline;

pub use conversion::wasm_to_wat;
pub use pipeline::{compile_program, compile_to_wasm};
