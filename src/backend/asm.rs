//! Binary assembly
//!
//! Serializes an in-memory [`Module`](super::Module) to the WebAssembly
//! binary format via `wasm-encoder`. This is where string labels become
//! relative branch depths and names become section indices; an unresolved
//! label or call target at this point is a driver invariant violation, not
//! a user error, and panics.

use std::collections::HashMap;

use wasm_encoder::{
    BlockType, CodeSection, ConstExpr, DataSection, EntityType, ExportKind, ExportSection,
    Function, FunctionSection, GlobalSection, GlobalType, ImportSection,
    Instruction, MemorySection, MemoryType, Module as BinaryModule, StartSection, TypeSection,
    ValType,
};

use super::ir::{BinaryOp, Expr, HostOp, UnaryOp};
use super::Module;
use crate::types::{NativeType, Target};

fn val_type(ty: NativeType) -> ValType {
    match ty {
        NativeType::I32 => ValType::I32,
        NativeType::I64 => ValType::I64,
        NativeType::F32 => ValType::F32,
        NativeType::F64 => ValType::F64,
        NativeType::None => panic!("'none' has no value representation"),
    }
}

fn block_type(ty: NativeType) -> BlockType {
    match ty {
        NativeType::None => BlockType::Empty,
        other => BlockType::Result(val_type(other)),
    }
}

fn const_expr(init: &Expr) -> ConstExpr {
    match init {
        Expr::I32Const(v) => ConstExpr::i32_const(*v),
        Expr::I64Const(v) => ConstExpr::i64_const(*v),
        Expr::F32Const(v) => ConstExpr::f32_const(*v),
        Expr::F64Const(v) => ConstExpr::f64_const(*v),
        other => panic!("global initializer must be a constant, got {:?}", other),
    }
}

/// Serialize `module` to WebAssembly binary bytes.
pub fn assemble(module: &Module) -> Vec<u8> {
    let memory64 = module.target() == Target::Wasm64;

    let mut types = TypeSection::new();
    for ft in module.function_types() {
        let params: Vec<ValType> = ft.params.iter().map(|t| val_type(*t)).collect();
        let results: Vec<ValType> = match ft.result {
            NativeType::None => Vec::new(),
            other => vec![val_type(other)],
        };
        types.ty().function(params, results);
    }

    // Function index space: imports first, then defined functions.
    let mut func_indices: HashMap<&str, u32> = HashMap::new();
    let mut imports = ImportSection::new();
    for (i, im) in module.function_imports().iter().enumerate() {
        imports.import(&im.module, &im.base, EntityType::Function(im.type_ref as u32));
        func_indices.insert(&im.name, i as u32);
    }
    let import_count = module.function_imports().len() as u32;
    for (i, f) in module.functions().iter().enumerate() {
        func_indices.insert(&f.name, import_count + i as u32);
    }

    let mut functions = FunctionSection::new();
    for f in module.functions() {
        functions.function(f.type_ref as u32);
    }

    let mut memories = MemorySection::new();
    if let Some(spec) = module.memory() {
        memories.memory(MemoryType {
            minimum: spec.initial_pages as u64,
            maximum: Some(spec.max_pages as u64),
            memory64,
            shared: false,
            page_size_log2: None,
        });
    }

    let mut global_indices: HashMap<&str, u32> = HashMap::new();
    let mut globals = GlobalSection::new();
    for (i, g) in module.globals().iter().enumerate() {
        global_indices.insert(&g.name, i as u32);
        globals.global(
            GlobalType {
                val_type: val_type(g.ty),
                mutable: g.mutable,
                shared: false,
            },
            &const_expr(&g.init),
        );
    }

    let mut exports = ExportSection::new();
    for e in module.exports() {
        let index = *func_indices
            .get(e.internal_name.as_str())
            .unwrap_or_else(|| panic!("exported function '{}' was never added", e.internal_name));
        exports.export(&e.external_name, ExportKind::Func, index);
    }
    if let Some(spec) = module.memory() {
        if let Some(name) = &spec.export_name {
            exports.export(name, ExportKind::Memory, 0);
        }
    }

    let start = module.start().map(|name| StartSection {
        function_index: *func_indices
            .get(name)
            .unwrap_or_else(|| panic!("start function '{}' was never added", name)),
    });

    let mut code = CodeSection::new();
    for f in module.functions() {
        let locals: Vec<(u32, ValType)> = f.locals.iter().map(|t| (1, val_type(*t))).collect();
        let mut body = Function::new(locals);
        let mut emitter = CodeEmitter {
            func_indices: &func_indices,
            global_indices: &global_indices,
            labels: Vec::new(),
        };
        // The root block is unlabelled and untargetable; flatten it so a
        // trailing `return` leaves the function frame itself unreachable.
        match &f.body {
            Expr::Block {
                label: None,
                body: members,
                ..
            } => {
                for member in members {
                    emitter.emit(&mut body, member);
                }
            }
            other => emitter.emit(&mut body, other),
        }
        body.instruction(&Instruction::End);
        code.function(&body);
    }

    let mut data = DataSection::new();
    if let Some(spec) = module.memory() {
        for seg in &spec.segments {
            let offset = if memory64 {
                ConstExpr::i64_const(seg.offset as i64)
            } else {
                ConstExpr::i32_const(seg.offset as i32)
            };
            data.active(0, &offset, seg.bytes.iter().copied());
        }
    }

    // Section order is fixed by the binary format.
    let mut out = BinaryModule::new();
    out.section(&types);
    out.section(&imports);
    out.section(&functions);
    out.section(&memories);
    out.section(&globals);
    out.section(&exports);
    if let Some(start) = &start {
        out.section(start);
    }
    out.section(&code);
    out.section(&data);
    out.finish()
}

struct CodeEmitter<'a> {
    func_indices: &'a HashMap<&'a str, u32>,
    global_indices: &'a HashMap<&'a str, u32>,
    /// Enclosing frames, innermost last; `None` frames (if-arms) count for
    /// depth but cannot be targeted.
    labels: Vec<Option<String>>,
}

impl<'a> CodeEmitter<'a> {
    fn depth_of(&self, label: &str) -> u32 {
        for (depth, frame) in self.labels.iter().rev().enumerate() {
            if frame.as_deref() == Some(label) {
                return depth as u32;
            }
        }
        panic!("branch target '{}' is not defined by any enclosing block", label);
    }

    fn func_index(&self, name: &str) -> u32 {
        *self
            .func_indices
            .get(name)
            .unwrap_or_else(|| panic!("call target '{}' was never added", name))
    }

    fn global_index(&self, name: &str) -> u32 {
        *self
            .global_indices
            .get(name)
            .unwrap_or_else(|| panic!("global '{}' was never added", name))
    }

    fn emit(&mut self, out: &mut Function, expr: &Expr) {
        match expr {
            Expr::I32Const(v) => {
                out.instruction(&Instruction::I32Const(*v));
            }
            Expr::I64Const(v) => {
                out.instruction(&Instruction::I64Const(*v));
            }
            Expr::F32Const(v) => {
                out.instruction(&Instruction::F32Const(*v));
            }
            Expr::F64Const(v) => {
                out.instruction(&Instruction::F64Const(*v));
            }
            Expr::Unary { op, value } => {
                self.emit(out, value);
                out.instruction(&unary_instruction(*op));
            }
            Expr::Binary { op, left, right } => {
                self.emit(out, left);
                self.emit(out, right);
                out.instruction(&binary_instruction(*op));
            }
            Expr::Host { op, operands } => {
                for operand in operands {
                    self.emit(out, operand);
                }
                match op {
                    HostOp::CurrentMemory => out.instruction(&Instruction::MemorySize(0)),
                    HostOp::GrowMemory => out.instruction(&Instruction::MemoryGrow(0)),
                };
            }
            Expr::Block { label, body, ty } => {
                out.instruction(&Instruction::Block(block_type(*ty)));
                self.labels.push(label.clone());
                for member in body {
                    self.emit(out, member);
                }
                out.instruction(&Instruction::End);
                self.labels.pop();
            }
            Expr::Loop { label, body } => {
                out.instruction(&Instruction::Loop(BlockType::Empty));
                self.labels.push(Some(label.clone()));
                self.emit(out, body);
                out.instruction(&Instruction::End);
                self.labels.pop();
            }
            Expr::If {
                condition,
                if_true,
                if_false,
            } => {
                self.emit(out, condition);
                out.instruction(&Instruction::If(BlockType::Empty));
                self.labels.push(None);
                self.emit(out, if_true);
                if let Some(if_false) = if_false {
                    out.instruction(&Instruction::Else);
                    self.emit(out, if_false);
                }
                out.instruction(&Instruction::End);
                self.labels.pop();
            }
            Expr::Break { label, condition } => {
                let depth = self.depth_of(label);
                match condition {
                    Some(condition) => {
                        self.emit(out, condition);
                        out.instruction(&Instruction::BrIf(depth));
                    }
                    None => {
                        out.instruction(&Instruction::Br(depth));
                    }
                }
            }
            Expr::Return { value } => {
                if let Some(value) = value {
                    self.emit(out, value);
                }
                out.instruction(&Instruction::Return);
            }
            Expr::Nop => {
                out.instruction(&Instruction::Nop);
            }
            Expr::Unreachable => {
                out.instruction(&Instruction::Unreachable);
            }
            Expr::Drop { value } => {
                self.emit(out, value);
                out.instruction(&Instruction::Drop);
            }
            Expr::Select {
                condition,
                if_true,
                if_false,
            } => {
                self.emit(out, if_true);
                self.emit(out, if_false);
                self.emit(out, condition);
                out.instruction(&Instruction::Select);
            }
            Expr::GetLocal { index, .. } => {
                out.instruction(&Instruction::LocalGet(*index));
            }
            Expr::SetLocal { index, value } => {
                self.emit(out, value);
                out.instruction(&Instruction::LocalSet(*index));
            }
            Expr::TeeLocal { index, value, .. } => {
                self.emit(out, value);
                out.instruction(&Instruction::LocalTee(*index));
            }
            Expr::GetGlobal { name, .. } => {
                out.instruction(&Instruction::GlobalGet(self.global_index(name)));
            }
            Expr::SetGlobal { name, value } => {
                self.emit(out, value);
                out.instruction(&Instruction::GlobalSet(self.global_index(name)));
            }
            Expr::Call {
                target, operands, ..
            }
            | Expr::CallImport {
                target, operands, ..
            } => {
                for operand in operands {
                    self.emit(out, operand);
                }
                out.instruction(&Instruction::Call(self.func_index(target)));
            }
        }
    }
}

fn unary_instruction(op: UnaryOp) -> Instruction<'static> {
    match op {
        UnaryOp::ClzI32 => Instruction::I32Clz,
        UnaryOp::CtzI32 => Instruction::I32Ctz,
        UnaryOp::PopcntI32 => Instruction::I32Popcnt,
        UnaryOp::EqzI32 => Instruction::I32Eqz,
        UnaryOp::ClzI64 => Instruction::I64Clz,
        UnaryOp::CtzI64 => Instruction::I64Ctz,
        UnaryOp::PopcntI64 => Instruction::I64Popcnt,
        UnaryOp::EqzI64 => Instruction::I64Eqz,
        UnaryOp::NegF32 => Instruction::F32Neg,
        UnaryOp::AbsF32 => Instruction::F32Abs,
        UnaryOp::CeilF32 => Instruction::F32Ceil,
        UnaryOp::FloorF32 => Instruction::F32Floor,
        UnaryOp::TruncF32 => Instruction::F32Trunc,
        UnaryOp::NearestF32 => Instruction::F32Nearest,
        UnaryOp::SqrtF32 => Instruction::F32Sqrt,
        UnaryOp::NegF64 => Instruction::F64Neg,
        UnaryOp::AbsF64 => Instruction::F64Abs,
        UnaryOp::CeilF64 => Instruction::F64Ceil,
        UnaryOp::FloorF64 => Instruction::F64Floor,
        UnaryOp::TruncF64 => Instruction::F64Trunc,
        UnaryOp::NearestF64 => Instruction::F64Nearest,
        UnaryOp::SqrtF64 => Instruction::F64Sqrt,
        UnaryOp::WrapI64 => Instruction::I32WrapI64,
        UnaryOp::ExtendSI32 => Instruction::I64ExtendI32S,
        UnaryOp::ExtendUI32 => Instruction::I64ExtendI32U,
        UnaryOp::PromoteF32 => Instruction::F64PromoteF32,
        UnaryOp::DemoteF64 => Instruction::F32DemoteF64,
        UnaryOp::TruncSF32ToI32 => Instruction::I32TruncF32S,
        UnaryOp::TruncUF32ToI32 => Instruction::I32TruncF32U,
        UnaryOp::TruncSF32ToI64 => Instruction::I64TruncF32S,
        UnaryOp::TruncUF32ToI64 => Instruction::I64TruncF32U,
        UnaryOp::TruncSF64ToI32 => Instruction::I32TruncF64S,
        UnaryOp::TruncUF64ToI32 => Instruction::I32TruncF64U,
        UnaryOp::TruncSF64ToI64 => Instruction::I64TruncF64S,
        UnaryOp::TruncUF64ToI64 => Instruction::I64TruncF64U,
        UnaryOp::ConvertSI32ToF32 => Instruction::F32ConvertI32S,
        UnaryOp::ConvertUI32ToF32 => Instruction::F32ConvertI32U,
        UnaryOp::ConvertSI32ToF64 => Instruction::F64ConvertI32S,
        UnaryOp::ConvertUI32ToF64 => Instruction::F64ConvertI32U,
        UnaryOp::ConvertSI64ToF32 => Instruction::F32ConvertI64S,
        UnaryOp::ConvertUI64ToF32 => Instruction::F32ConvertI64U,
        UnaryOp::ConvertSI64ToF64 => Instruction::F64ConvertI64S,
        UnaryOp::ConvertUI64ToF64 => Instruction::F64ConvertI64U,
    }
}

fn binary_instruction(op: BinaryOp) -> Instruction<'static> {
    match op {
        BinaryOp::AddI32 => Instruction::I32Add,
        BinaryOp::SubI32 => Instruction::I32Sub,
        BinaryOp::MulI32 => Instruction::I32Mul,
        BinaryOp::DivSI32 => Instruction::I32DivS,
        BinaryOp::DivUI32 => Instruction::I32DivU,
        BinaryOp::RemSI32 => Instruction::I32RemS,
        BinaryOp::RemUI32 => Instruction::I32RemU,
        BinaryOp::AndI32 => Instruction::I32And,
        BinaryOp::OrI32 => Instruction::I32Or,
        BinaryOp::XorI32 => Instruction::I32Xor,
        BinaryOp::ShlI32 => Instruction::I32Shl,
        BinaryOp::ShrSI32 => Instruction::I32ShrS,
        BinaryOp::ShrUI32 => Instruction::I32ShrU,
        BinaryOp::RotlI32 => Instruction::I32Rotl,
        BinaryOp::RotrI32 => Instruction::I32Rotr,
        BinaryOp::EqI32 => Instruction::I32Eq,
        BinaryOp::NeI32 => Instruction::I32Ne,
        BinaryOp::LtSI32 => Instruction::I32LtS,
        BinaryOp::LtUI32 => Instruction::I32LtU,
        BinaryOp::LeSI32 => Instruction::I32LeS,
        BinaryOp::LeUI32 => Instruction::I32LeU,
        BinaryOp::GtSI32 => Instruction::I32GtS,
        BinaryOp::GtUI32 => Instruction::I32GtU,
        BinaryOp::GeSI32 => Instruction::I32GeS,
        BinaryOp::GeUI32 => Instruction::I32GeU,
        BinaryOp::AddI64 => Instruction::I64Add,
        BinaryOp::SubI64 => Instruction::I64Sub,
        BinaryOp::MulI64 => Instruction::I64Mul,
        BinaryOp::DivSI64 => Instruction::I64DivS,
        BinaryOp::DivUI64 => Instruction::I64DivU,
        BinaryOp::RemSI64 => Instruction::I64RemS,
        BinaryOp::RemUI64 => Instruction::I64RemU,
        BinaryOp::AndI64 => Instruction::I64And,
        BinaryOp::OrI64 => Instruction::I64Or,
        BinaryOp::XorI64 => Instruction::I64Xor,
        BinaryOp::ShlI64 => Instruction::I64Shl,
        BinaryOp::ShrSI64 => Instruction::I64ShrS,
        BinaryOp::ShrUI64 => Instruction::I64ShrU,
        BinaryOp::RotlI64 => Instruction::I64Rotl,
        BinaryOp::RotrI64 => Instruction::I64Rotr,
        BinaryOp::EqI64 => Instruction::I64Eq,
        BinaryOp::NeI64 => Instruction::I64Ne,
        BinaryOp::LtSI64 => Instruction::I64LtS,
        BinaryOp::LtUI64 => Instruction::I64LtU,
        BinaryOp::LeSI64 => Instruction::I64LeS,
        BinaryOp::LeUI64 => Instruction::I64LeU,
        BinaryOp::GtSI64 => Instruction::I64GtS,
        BinaryOp::GtUI64 => Instruction::I64GtU,
        BinaryOp::GeSI64 => Instruction::I64GeS,
        BinaryOp::GeUI64 => Instruction::I64GeU,
        BinaryOp::AddF32 => Instruction::F32Add,
        BinaryOp::SubF32 => Instruction::F32Sub,
        BinaryOp::MulF32 => Instruction::F32Mul,
        BinaryOp::DivF32 => Instruction::F32Div,
        BinaryOp::CopysignF32 => Instruction::F32Copysign,
        BinaryOp::MinF32 => Instruction::F32Min,
        BinaryOp::MaxF32 => Instruction::F32Max,
        BinaryOp::EqF32 => Instruction::F32Eq,
        BinaryOp::NeF32 => Instruction::F32Ne,
        BinaryOp::LtF32 => Instruction::F32Lt,
        BinaryOp::LeF32 => Instruction::F32Le,
        BinaryOp::GtF32 => Instruction::F32Gt,
        BinaryOp::GeF32 => Instruction::F32Ge,
        BinaryOp::AddF64 => Instruction::F64Add,
        BinaryOp::SubF64 => Instruction::F64Sub,
        BinaryOp::MulF64 => Instruction::F64Mul,
        BinaryOp::DivF64 => Instruction::F64Div,
        BinaryOp::CopysignF64 => Instruction::F64Copysign,
        BinaryOp::MinF64 => Instruction::F64Min,
        BinaryOp::MaxF64 => Instruction::F64Max,
        BinaryOp::EqF64 => Instruction::F64Eq,
        BinaryOp::NeF64 => Instruction::F64Ne,
        BinaryOp::LtF64 => Instruction::F64Lt,
        BinaryOp::LeF64 => Instruction::F64Le,
        BinaryOp::GtF64 => Instruction::F64Gt,
        BinaryOp::GeF64 => Instruction::F64Ge,
    }
}
