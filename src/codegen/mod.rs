//! Code generation
//!
//! The compilation driver and the lowering procedures grouped by syntactic
//! category:
//! - `declarations`: what to emit: sources, globals, enums, functions,
//!   namespaces, exports, tree-shaking
//! - `statements`: structured control flow to labelled blocks and loops
//! - `expressions`: expression lowering under a contextual type
//! - `conversions`: type-directed truncation, extension and coercion
//! - `builtins`: intrinsic calls dispatched to single opcodes
//! - `memory`: linear-memory segment layout
//!
//! The driver is strictly single-threaded: one [`Compiler`] owns the output
//! module and the mutable lowering state (`current_function`,
//! `current_type`, `disallow_continue`), which is saved and restored across
//! every recursion into the start function.

mod builtins;
mod conversions;
mod declarations;
mod expressions;
mod memory;
mod statements;

use std::collections::HashSet;
use std::rc::Rc;

use crate::backend::{Expr, MemorySegment, Module};
use crate::program::{Function, Program};
use crate::types::{NativeType, Target, Type};

/// Compilation options.
#[derive(Debug, Clone, Copy)]
pub struct Options {
    pub target: Target,
    /// Compile every declaration regardless of export status.
    pub no_tree_shaking: bool,
    /// Make the backend inert; useful for diagnostics-only runs.
    pub no_emit: bool,
}

impl Default for Options {
    fn default() -> Options {
        Options {
            target: Target::Wasm32,
            no_tree_shaking: false,
            no_emit: false,
        }
    }
}

/// Upper bound published with the memory declaration.
pub(crate) const MAX_MEMORY_PAGES: u32 = 0xffff;
pub(crate) const PAGE_SIZE: u64 = 0x10000;

/// Compile a program to an in-memory WebAssembly module.
///
/// Recoverable errors land in the program's diagnostic sink and leave
/// `unreachable` nodes behind; a module is returned either way.
pub fn compile(program: &Program, options: Options) -> Module {
    Compiler::new(program, options).run()
}

pub(crate) struct Compiler<'a> {
    pub(crate) program: &'a Program,
    pub(crate) options: Options,
    pub(crate) module: Module,
    /// Synthetic `() -> void` function collecting top-level side effects
    /// and deferred initializers.
    pub(crate) start_function: Rc<Function>,
    pub(crate) start_body: Vec<Expr>,
    pub(crate) current_function: Rc<Function>,
    /// Type produced by the most recently lowered expression.
    pub(crate) current_type: Type,
    /// True inside switch bodies, where `continue` has no target.
    pub(crate) disallow_continue: bool,
    /// Next free linear-memory byte.
    pub(crate) memory_offset: u64,
    pub(crate) memory_segments: Vec<MemorySegment>,
    /// Already-compiled source paths.
    pub(crate) files: HashSet<String>,
    /// Path of the source currently being compiled; scope for top-level
    /// statements routed into the start function.
    pub(crate) current_path: String,
}

impl<'a> Compiler<'a> {
    pub(crate) fn new(program: &'a Program, options: Options) -> Compiler<'a> {
        let start_function = Rc::new(Function::new(
            "start".to_string(),
            None,
            Vec::new(),
            Type::Void,
            Default::default(),
            false,
        ));
        let mut module = Module::new(options.target);
        module.set_no_emit(options.no_emit);
        Compiler {
            program,
            options,
            module,
            start_function: start_function.clone(),
            start_body: Vec::new(),
            current_function: start_function,
            current_type: Type::Void,
            disallow_continue: false,
            memory_offset: 2 * options.target.usize_size() as u64,
            memory_segments: Vec::new(),
            files: HashSet::new(),
            current_path: String::new(),
        }
    }

    pub(crate) fn run(mut self) -> Module {
        self.program.initialize(self.options.target);
        let program = self.program;
        for source in program.sources.iter().filter(|s| s.is_entry) {
            self.compile_source(source);
        }
        self.finalize_start_function();
        self.finalize_memory();
        self.module
    }

    fn finalize_start_function(&mut self) {
        if self.start_body.is_empty() {
            return;
        }
        let type_ref = match self
            .module
            .get_function_type_by_signature(&[], NativeType::None)
        {
            Some(type_ref) => type_ref,
            None => self.module.add_function_type(Vec::new(), NativeType::None),
        };
        let body = std::mem::take(&mut self.start_body);
        let block = self.module.create_block(None, body, NativeType::None);
        self.module.add_function(
            "start",
            type_ref,
            self.start_function.additional_locals(),
            block,
        );
        self.module.set_start("start");
    }

    /// Whether a top-level declaration of `source` with the given export
    /// flag should be compiled eagerly.
    pub(crate) fn is_eligible(&self, is_entry: bool, is_export: bool) -> bool {
        self.options.no_tree_shaking || (is_entry && is_export)
    }
}
