//! WebAssembly module IR
//!
//! The code generator builds an in-memory module out of the expression
//! nodes in `ir` plus the registries below (function types, functions,
//! imports, globals, exports, memory, start). `asm` serializes the result
//! to the binary format.
//!
//! All node creators and registrations go through [`Module`] so the
//! `no_emit` toggle can make every one of them inert; the code generator
//! uses that for dry-run type discovery.

mod asm;
mod ir;

pub use asm::assemble;
pub use ir::{BinaryOp, Expr, HostOp, UnaryOp};

use std::collections::HashMap;

use crate::types::{NativeType, Target};

/// A chunk of static data placed in linear memory.
#[derive(Debug, Clone, PartialEq)]
pub struct MemorySegment {
    pub bytes: Vec<u8>,
    pub offset: u64,
}

/// Finalized linear-memory declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct MemorySpec {
    pub initial_pages: u32,
    pub max_pages: u32,
    pub segments: Vec<MemorySegment>,
    pub export_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionType {
    pub params: Vec<NativeType>,
    pub result: NativeType,
}

pub type FunctionTypeRef = usize;

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub type_ref: FunctionTypeRef,
    /// Locals beyond the parameters.
    pub locals: Vec<NativeType>,
    pub body: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionImport {
    pub name: String,
    pub module: String,
    pub base: String,
    pub type_ref: FunctionTypeRef,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GlobalDef {
    pub name: String,
    pub ty: NativeType,
    pub mutable: bool,
    pub init: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionExport {
    pub external_name: String,
    pub internal_name: String,
}

/// An in-memory WebAssembly module under construction.
#[derive(Debug)]
pub struct Module {
    target: Target,
    no_emit: bool,
    function_types: Vec<FunctionType>,
    types_by_signature: HashMap<FunctionType, FunctionTypeRef>,
    functions: Vec<FunctionDef>,
    function_imports: Vec<FunctionImport>,
    globals: Vec<GlobalDef>,
    exports: Vec<FunctionExport>,
    start: Option<String>,
    memory: Option<MemorySpec>,
}

impl Module {
    pub fn new(target: Target) -> Module {
        Module {
            target,
            no_emit: false,
            function_types: Vec::new(),
            types_by_signature: HashMap::new(),
            functions: Vec::new(),
            function_imports: Vec::new(),
            globals: Vec::new(),
            exports: Vec::new(),
            start: None,
            memory: None,
        }
    }

    pub fn target(&self) -> Target {
        self.target
    }

    /// While set, every creator returns a nop and every registration is
    /// dropped, so expressions can be compiled purely to observe their type.
    pub fn set_no_emit(&mut self, no_emit: bool) {
        self.no_emit = no_emit;
    }

    pub fn no_emit(&self) -> bool {
        self.no_emit
    }

    // --- Node creators ---

    pub fn create_i32(&self, value: i32) -> Expr {
        if self.no_emit {
            return Expr::Nop;
        }
        Expr::I32Const(value)
    }

    pub fn create_i64(&self, value: i64) -> Expr {
        if self.no_emit {
            return Expr::Nop;
        }
        Expr::I64Const(value)
    }

    pub fn create_f32(&self, value: f32) -> Expr {
        if self.no_emit {
            return Expr::Nop;
        }
        Expr::F32Const(value)
    }

    pub fn create_f64(&self, value: f64) -> Expr {
        if self.no_emit {
            return Expr::Nop;
        }
        Expr::F64Const(value)
    }

    pub fn create_unary(&self, op: UnaryOp, value: Expr) -> Expr {
        if self.no_emit {
            return Expr::Nop;
        }
        Expr::Unary {
            op,
            value: Box::new(value),
        }
    }

    pub fn create_binary(&self, op: BinaryOp, left: Expr, right: Expr) -> Expr {
        if self.no_emit {
            return Expr::Nop;
        }
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn create_host(&self, op: HostOp, operands: Vec<Expr>) -> Expr {
        if self.no_emit {
            return Expr::Nop;
        }
        Expr::Host { op, operands }
    }

    pub fn create_block(&self, label: Option<String>, body: Vec<Expr>, ty: NativeType) -> Expr {
        if self.no_emit {
            return Expr::Nop;
        }
        Expr::Block { label, body, ty }
    }

    pub fn create_loop(&self, label: String, body: Expr) -> Expr {
        if self.no_emit {
            return Expr::Nop;
        }
        Expr::Loop {
            label,
            body: Box::new(body),
        }
    }

    pub fn create_if(&self, condition: Expr, if_true: Expr, if_false: Option<Expr>) -> Expr {
        if self.no_emit {
            return Expr::Nop;
        }
        Expr::If {
            condition: Box::new(condition),
            if_true: Box::new(if_true),
            if_false: if_false.map(Box::new),
        }
    }

    pub fn create_break(&self, label: String, condition: Option<Expr>) -> Expr {
        if self.no_emit {
            return Expr::Nop;
        }
        Expr::Break {
            label,
            condition: condition.map(Box::new),
        }
    }

    pub fn create_return(&self, value: Option<Expr>) -> Expr {
        if self.no_emit {
            return Expr::Nop;
        }
        Expr::Return {
            value: value.map(Box::new),
        }
    }

    pub fn create_nop(&self) -> Expr {
        Expr::Nop
    }

    pub fn create_unreachable(&self) -> Expr {
        if self.no_emit {
            return Expr::Nop;
        }
        Expr::Unreachable
    }

    pub fn create_drop(&self, value: Expr) -> Expr {
        if self.no_emit {
            return Expr::Nop;
        }
        Expr::Drop {
            value: Box::new(value),
        }
    }

    pub fn create_select(&self, condition: Expr, if_true: Expr, if_false: Expr) -> Expr {
        if self.no_emit {
            return Expr::Nop;
        }
        Expr::Select {
            condition: Box::new(condition),
            if_true: Box::new(if_true),
            if_false: Box::new(if_false),
        }
    }

    pub fn create_get_local(&self, index: u32, ty: NativeType) -> Expr {
        if self.no_emit {
            return Expr::Nop;
        }
        Expr::GetLocal { index, ty }
    }

    pub fn create_set_local(&self, index: u32, value: Expr) -> Expr {
        if self.no_emit {
            return Expr::Nop;
        }
        Expr::SetLocal {
            index,
            value: Box::new(value),
        }
    }

    pub fn create_tee_local(&self, index: u32, value: Expr, ty: NativeType) -> Expr {
        if self.no_emit {
            return Expr::Nop;
        }
        Expr::TeeLocal {
            index,
            value: Box::new(value),
            ty,
        }
    }

    pub fn create_get_global(&self, name: String, ty: NativeType) -> Expr {
        if self.no_emit {
            return Expr::Nop;
        }
        Expr::GetGlobal { name, ty }
    }

    pub fn create_set_global(&self, name: String, value: Expr) -> Expr {
        if self.no_emit {
            return Expr::Nop;
        }
        Expr::SetGlobal {
            name,
            value: Box::new(value),
        }
    }

    pub fn create_call(&self, target: String, operands: Vec<Expr>, ty: NativeType) -> Expr {
        if self.no_emit {
            return Expr::Nop;
        }
        Expr::Call {
            target,
            operands,
            ty,
        }
    }

    pub fn create_call_import(&self, target: String, operands: Vec<Expr>, ty: NativeType) -> Expr {
        if self.no_emit {
            return Expr::Nop;
        }
        Expr::CallImport {
            target,
            operands,
            ty,
        }
    }

    // --- Registries ---

    pub fn get_function_type_by_signature(
        &self,
        params: &[NativeType],
        result: NativeType,
    ) -> Option<FunctionTypeRef> {
        let key = FunctionType {
            params: params.to_vec(),
            result,
        };
        self.types_by_signature.get(&key).copied()
    }

    /// Registers a function type; entries are never removed, so a returned
    /// reference stays valid for the lifetime of the module.
    pub fn add_function_type(&mut self, params: Vec<NativeType>, result: NativeType) -> FunctionTypeRef {
        let key = FunctionType { params, result };
        if let Some(&existing) = self.types_by_signature.get(&key) {
            return existing;
        }
        let type_ref = self.function_types.len();
        if self.no_emit {
            // Dry runs must not grow the cache.
            return type_ref;
        }
        self.types_by_signature.insert(key.clone(), type_ref);
        self.function_types.push(key);
        type_ref
    }

    pub fn add_function(
        &mut self,
        name: &str,
        type_ref: FunctionTypeRef,
        locals: Vec<NativeType>,
        body: Expr,
    ) {
        if self.no_emit {
            return;
        }
        self.functions.push(FunctionDef {
            name: name.to_string(),
            type_ref,
            locals,
            body,
        });
    }

    pub fn add_function_import(
        &mut self,
        name: &str,
        module: &str,
        base: &str,
        type_ref: FunctionTypeRef,
    ) {
        if self.no_emit {
            return;
        }
        self.function_imports.push(FunctionImport {
            name: name.to_string(),
            module: module.to_string(),
            base: base.to_string(),
            type_ref,
        });
    }

    pub fn add_global(&mut self, name: &str, ty: NativeType, mutable: bool, init: Expr) {
        if self.no_emit {
            return;
        }
        self.globals.push(GlobalDef {
            name: name.to_string(),
            ty,
            mutable,
            init,
        });
    }

    pub fn add_export(&mut self, external_name: &str, internal_name: &str) {
        if self.no_emit {
            return;
        }
        self.exports.push(FunctionExport {
            external_name: external_name.to_string(),
            internal_name: internal_name.to_string(),
        });
    }

    pub fn set_start(&mut self, name: &str) {
        if self.no_emit {
            return;
        }
        self.start = Some(name.to_string());
    }

    pub fn set_memory(
        &mut self,
        initial_pages: u32,
        max_pages: u32,
        segments: Vec<MemorySegment>,
        export_name: Option<&str>,
    ) {
        if self.no_emit {
            return;
        }
        self.memory = Some(MemorySpec {
            initial_pages,
            max_pages,
            segments,
            export_name: export_name.map(str::to_string),
        });
    }

    // --- Accessors ---

    pub fn function_types(&self) -> &[FunctionType] {
        &self.function_types
    }

    pub fn functions(&self) -> &[FunctionDef] {
        &self.functions
    }

    pub fn function(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn function_imports(&self) -> &[FunctionImport] {
        &self.function_imports
    }

    pub fn globals(&self) -> &[GlobalDef] {
        &self.globals
    }

    pub fn global(&self, name: &str) -> Option<&GlobalDef> {
        self.globals.iter().find(|g| g.name == name)
    }

    pub fn exports(&self) -> &[FunctionExport] {
        &self.exports
    }

    pub fn start(&self) -> Option<&str> {
        self.start.as_deref()
    }

    pub fn memory(&self) -> Option<&MemorySpec> {
        self.memory.as_ref()
    }
}
