//! Type-directed conversions
//!
//! Inserted whenever an expression's produced type differs from its
//! contextual type. Small integers normalize through a shl/shr pair
//! (signed) or an and-mask (unsigned); WebAssembly MVP has no narrowing
//! instruction and backend optimizers recognize the pattern.

use super::Compiler;
use crate::backend::{BinaryOp, Expr, UnaryOp};
use crate::types::Type;

impl<'a> Compiler<'a> {
    /// Convert `expr` from `from` to `to`. Converting *to* void drops the
    /// value; converting *from* void is a driver bug.
    pub(crate) fn convert_expression(&mut self, expr: Expr, from: &Type, to: &Type) -> Expr {
        let from = from.machine_type();
        let to = to.machine_type();
        if from == to {
            return expr;
        }
        if to == Type::Void {
            return self.module.create_drop(expr);
        }
        if from == Type::Void {
            panic!("cannot convert away from a void expression");
        }

        if from.is_any_float() {
            if to.is_any_float() {
                let op = match from {
                    Type::F32 => UnaryOp::PromoteF32,
                    _ => UnaryOp::DemoteF64,
                };
                return self.module.create_unary(op, expr);
            }
            if to.is_any_integer() {
                let signed = to.is_signed_integer();
                let op = match (&from, to.is_long_integer(), signed) {
                    (Type::F32, true, true) => UnaryOp::TruncSF32ToI64,
                    (Type::F32, true, false) => UnaryOp::TruncUF32ToI64,
                    (Type::F32, false, true) => UnaryOp::TruncSF32ToI32,
                    (Type::F32, false, false) => UnaryOp::TruncUF32ToI32,
                    (_, true, true) => UnaryOp::TruncSF64ToI64,
                    (_, true, false) => UnaryOp::TruncUF64ToI64,
                    (_, false, true) => UnaryOp::TruncSF64ToI32,
                    (_, false, false) => UnaryOp::TruncUF64ToI32,
                };
                let truncated = self.module.create_unary(op, expr);
                return self.normalize_small_integer(truncated, &to);
            }
            panic!("no conversion from {} to {}", from, to);
        }

        if from.is_any_integer() {
            if to.is_any_float() {
                let signed = from.is_signed_integer();
                let op = match (from.is_long_integer(), &to, signed) {
                    (true, Type::F32, true) => UnaryOp::ConvertSI64ToF32,
                    (true, Type::F32, false) => UnaryOp::ConvertUI64ToF32,
                    (true, _, true) => UnaryOp::ConvertSI64ToF64,
                    (true, _, false) => UnaryOp::ConvertUI64ToF64,
                    (false, Type::F32, true) => UnaryOp::ConvertSI32ToF32,
                    (false, Type::F32, false) => UnaryOp::ConvertUI32ToF32,
                    (false, _, true) => UnaryOp::ConvertSI32ToF64,
                    (false, _, false) => UnaryOp::ConvertUI32ToF64,
                };
                return self.module.create_unary(op, expr);
            }
            if to.is_any_integer() {
                if from.is_long_integer() {
                    if to.is_long_integer() {
                        // i64 and u64 share a representation.
                        return expr;
                    }
                    let wrapped = self.module.create_unary(UnaryOp::WrapI64, expr);
                    return self.normalize_small_integer(wrapped, &to);
                }
                if to.is_long_integer() {
                    let op = if from.is_signed_integer() {
                        UnaryOp::ExtendSI32
                    } else {
                        UnaryOp::ExtendUI32
                    };
                    return self.module.create_unary(op, expr);
                }
                // Both 32-bit-or-narrower: re-normalize when the target is
                // narrower, or when signage differs at the same width.
                if to.is_small_integer()
                    && (from.size() > to.size()
                        || (from.size() == to.size()
                            && from.is_signed_integer() != to.is_signed_integer()))
                {
                    return self.normalize_small_integer(expr, &to);
                }
                return expr;
            }
        }

        panic!("no conversion from {} to {}", from, to);
    }

    /// Sign-extend or zero-mask a small integer carried in an i32; wider
    /// types pass through.
    pub(crate) fn normalize_small_integer(&mut self, expr: Expr, ty: &Type) -> Expr {
        if !ty.is_small_integer() {
            return expr;
        }
        if ty.is_signed_integer() {
            let shift = ty.small_integer_shift() as i32;
            let left = self.module.create_i32(shift);
            let right = self.module.create_i32(shift);
            let shifted = self.module.create_binary(BinaryOp::ShlI32, expr, left);
            self.module
                .create_binary(BinaryOp::ShrSI32, shifted, right)
        } else {
            let mask = self.module.create_i32(ty.small_integer_mask());
            self.module.create_binary(BinaryOp::AndI32, expr, mask)
        }
    }
}
