//! Builtin intrinsic dispatch
//!
//! Calls whose prototype carries a builtin tag compile to single opcodes
//! (or tiny canned sequences) instead of real calls. Integer intrinsics
//! pick their width from the integer context, float intrinsics from the
//! float context, defaulting to the 64-bit form.

use super::Compiler;
use crate::ast::{Expression, TypeNode};
use crate::backend::{BinaryOp, Expr, HostOp, UnaryOp};
use crate::diagnostics::DiagnosticCode;
use crate::program::Builtin;
use crate::types::{Target, Type};

impl<'a> Compiler<'a> {
    pub(crate) fn compile_builtin_call(
        &mut self,
        builtin: Builtin,
        type_arguments: &[TypeNode],
        arguments: &[Expression],
        contextual_type: &Type,
    ) -> Expr {
        match builtin {
            Builtin::Clz | Builtin::Ctz | Builtin::Popcnt => {
                self.integer_unary(builtin, arguments, contextual_type)
            }
            Builtin::Rotl | Builtin::Rotr => {
                self.integer_binary(builtin, arguments, contextual_type)
            }
            Builtin::Abs
            | Builtin::Ceil
            | Builtin::Floor
            | Builtin::Nearest
            | Builtin::Sqrt
            | Builtin::Trunc => self.float_unary(builtin, arguments, contextual_type),
            Builtin::Copysign | Builtin::Min | Builtin::Max => {
                self.float_binary(builtin, arguments, contextual_type)
            }
            Builtin::CurrentMemory => {
                if !self.check_arity(0, arguments, contextual_type) {
                    return self.module.create_unreachable();
                }
                self.current_type = Type::I32;
                self.module.create_host(HostOp::CurrentMemory, Vec::new())
            }
            Builtin::GrowMemory => {
                if !self.check_arity(1, arguments, contextual_type) {
                    return self.module.create_unreachable();
                }
                self.program
                    .diagnostics
                    .warning(DiagnosticCode::UnsafeOperation("grow_memory"));
                let pages = self.compile_expression(&arguments[0], &Type::I32, true);
                self.current_type = Type::I32;
                self.module.create_host(HostOp::GrowMemory, vec![pages])
            }
            Builtin::Unreachable => self.module.create_unreachable(),
            Builtin::SizeOf => self.compile_sizeof(type_arguments, contextual_type),
            Builtin::IsNaN => self.compile_is_nan(arguments, contextual_type),
            Builtin::IsFinite => self.compile_is_finite(arguments, contextual_type),
        }
    }

    fn check_arity(
        &mut self,
        expected: usize,
        arguments: &[Expression],
        contextual_type: &Type,
    ) -> bool {
        if arguments.len() == expected {
            return true;
        }
        self.program
            .diagnostics
            .error(DiagnosticCode::TooManyArguments {
                expected,
                found: arguments.len(),
            });
        self.current_type = contextual_type.clone();
        false
    }

    fn integer_operand_type(&self, contextual_type: &Type) -> Type {
        if contextual_type.is_any_integer() {
            contextual_type.clone()
        } else {
            Type::I64
        }
    }

    fn float_operand_type(&self, contextual_type: &Type) -> Type {
        if contextual_type.is_any_float() {
            contextual_type.clone()
        } else {
            Type::F64
        }
    }

    fn integer_unary(
        &mut self,
        builtin: Builtin,
        arguments: &[Expression],
        contextual_type: &Type,
    ) -> Expr {
        if !self.check_arity(1, arguments, contextual_type) {
            return self.module.create_unreachable();
        }
        let operand_type = self.integer_operand_type(contextual_type);
        let value = self.compile_expression(&arguments[0], &operand_type, true);
        let long = operand_type.is_long_integer();
        let op = match builtin {
            Builtin::Clz => {
                if long {
                    UnaryOp::ClzI64
                } else {
                    UnaryOp::ClzI32
                }
            }
            Builtin::Ctz => {
                if long {
                    UnaryOp::CtzI64
                } else {
                    UnaryOp::CtzI32
                }
            }
            _ => {
                if long {
                    UnaryOp::PopcntI64
                } else {
                    UnaryOp::PopcntI32
                }
            }
        };
        self.current_type = operand_type;
        self.module.create_unary(op, value)
    }

    fn integer_binary(
        &mut self,
        builtin: Builtin,
        arguments: &[Expression],
        contextual_type: &Type,
    ) -> Expr {
        if !self.check_arity(2, arguments, contextual_type) {
            return self.module.create_unreachable();
        }
        let operand_type = self.integer_operand_type(contextual_type);
        let left = self.compile_expression(&arguments[0], &operand_type, true);
        let right = self.compile_expression(&arguments[1], &operand_type, true);
        let long = operand_type.is_long_integer();
        let op = match builtin {
            Builtin::Rotl => {
                if long {
                    BinaryOp::RotlI64
                } else {
                    BinaryOp::RotlI32
                }
            }
            _ => {
                if long {
                    BinaryOp::RotrI64
                } else {
                    BinaryOp::RotrI32
                }
            }
        };
        self.current_type = operand_type;
        self.module.create_binary(op, left, right)
    }

    fn float_unary(
        &mut self,
        builtin: Builtin,
        arguments: &[Expression],
        contextual_type: &Type,
    ) -> Expr {
        if !self.check_arity(1, arguments, contextual_type) {
            return self.module.create_unreachable();
        }
        let operand_type = self.float_operand_type(contextual_type);
        let value = self.compile_expression(&arguments[0], &operand_type, true);
        let single = operand_type == Type::F32;
        let op = match builtin {
            Builtin::Abs => {
                if single {
                    UnaryOp::AbsF32
                } else {
                    UnaryOp::AbsF64
                }
            }
            Builtin::Ceil => {
                if single {
                    UnaryOp::CeilF32
                } else {
                    UnaryOp::CeilF64
                }
            }
            Builtin::Floor => {
                if single {
                    UnaryOp::FloorF32
                } else {
                    UnaryOp::FloorF64
                }
            }
            Builtin::Nearest => {
                if single {
                    UnaryOp::NearestF32
                } else {
                    UnaryOp::NearestF64
                }
            }
            Builtin::Sqrt => {
                if single {
                    UnaryOp::SqrtF32
                } else {
                    UnaryOp::SqrtF64
                }
            }
            _ => {
                if single {
                    UnaryOp::TruncF32
                } else {
                    UnaryOp::TruncF64
                }
            }
        };
        self.current_type = operand_type;
        self.module.create_unary(op, value)
    }

    fn float_binary(
        &mut self,
        builtin: Builtin,
        arguments: &[Expression],
        contextual_type: &Type,
    ) -> Expr {
        if !self.check_arity(2, arguments, contextual_type) {
            return self.module.create_unreachable();
        }
        let operand_type = self.float_operand_type(contextual_type);
        let left = self.compile_expression(&arguments[0], &operand_type, true);
        let right = self.compile_expression(&arguments[1], &operand_type, true);
        let single = operand_type == Type::F32;
        let op = match builtin {
            Builtin::Copysign => {
                if single {
                    BinaryOp::CopysignF32
                } else {
                    BinaryOp::CopysignF64
                }
            }
            Builtin::Min => {
                if single {
                    BinaryOp::MinF32
                } else {
                    BinaryOp::MinF64
                }
            }
            _ => {
                if single {
                    BinaryOp::MaxF32
                } else {
                    BinaryOp::MaxF64
                }
            }
        };
        self.current_type = operand_type;
        self.module.create_binary(op, left, right)
    }

    /// `sizeof<T>()`: a compile-time constant of pointer width.
    fn compile_sizeof(&mut self, type_arguments: &[TypeNode], contextual_type: &Type) -> Expr {
        let Some(node) = type_arguments.first() else {
            self.program
                .diagnostics
                .error(DiagnosticCode::TypeArgumentMismatch {
                    expected: 1,
                    found: 0,
                });
            self.current_type = contextual_type.clone();
            return self.module.create_unreachable();
        };
        let map = &self.current_function.type_argument_map;
        let Some(ty) = self.program.resolve_type(node, Some(map), true) else {
            self.current_type = contextual_type.clone();
            return self.module.create_unreachable();
        };
        let byte_size = ty.byte_size();
        self.current_type = self.program.usize_type();
        match self.options.target {
            Target::Wasm32 => self.module.create_i32(byte_size as i32),
            Target::Wasm64 => self.module.create_i64(byte_size as i64),
        }
    }

    /// `isNaN(x)`: materialize `x` once, then `x != x`.
    fn compile_is_nan(&mut self, arguments: &[Expression], contextual_type: &Type) -> Expr {
        if !self.check_arity(1, arguments, contextual_type) {
            return self.module.create_unreachable();
        }
        let operand_type = self.float_operand_type(contextual_type);
        let native = operand_type.native_type();
        let value = self.compile_expression(&arguments[0], &operand_type, true);
        let temp = self.current_function.add_local(None, operand_type.clone());
        let tee = self.module.create_tee_local(temp, value, native);
        let get = self.module.create_get_local(temp, native);
        let op = if operand_type == Type::F32 {
            BinaryOp::NeF32
        } else {
            BinaryOp::NeF64
        };
        self.current_type = Type::Bool;
        self.module.create_binary(op, tee, get)
    }

    /// `isFinite(x)`: `(x != x) ? false : abs(x) != Infinity`, evaluating
    /// `x` once through a temp.
    fn compile_is_finite(&mut self, arguments: &[Expression], contextual_type: &Type) -> Expr {
        if !self.check_arity(1, arguments, contextual_type) {
            return self.module.create_unreachable();
        }
        let operand_type = self.float_operand_type(contextual_type);
        let native = operand_type.native_type();
        let value = self.compile_expression(&arguments[0], &operand_type, true);
        let temp = self.current_function.add_local(None, operand_type.clone());
        let single = operand_type == Type::F32;

        let tee = self.module.create_tee_local(temp, value, native);
        let get = self.module.create_get_local(temp, native);
        let ne = if single { BinaryOp::NeF32 } else { BinaryOp::NeF64 };
        let condition = self.module.create_binary(ne, tee, get);

        let get_again = self.module.create_get_local(temp, native);
        let abs = self.module.create_unary(
            if single { UnaryOp::AbsF32 } else { UnaryOp::AbsF64 },
            get_again,
        );
        let infinity = if single {
            self.module.create_f32(f32::INFINITY)
        } else {
            self.module.create_f64(f64::INFINITY)
        };
        let finite = self.module.create_binary(ne, abs, infinity);

        let if_true = self.module.create_i32(0);
        self.current_type = Type::Bool;
        self.module.create_select(condition, if_true, finite)
    }
}
