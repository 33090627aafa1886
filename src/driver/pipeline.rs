//! Compilation pipeline orchestration

use crate::backend::{assemble, Module};
use crate::codegen::{self, Options};
use crate::program::Program;

/// Compile a program to the in-memory module representation.
///
/// Diagnostics accumulate on the program; callers treat any error entry as
/// compilation failure even though a module is always produced.
pub fn compile_program(program: &Program, options: Options) -> Module {
    codegen::compile(program, options)
}

/// Compile a program straight to WebAssembly binary bytes.
pub fn compile_to_wasm(program: &Program, options: Options) -> Vec<u8> {
    let module = compile_program(program, options);
    assemble(&module)
}
