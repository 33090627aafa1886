//! Expression lowering
//!
//! Every expression compiles under a contextual type. `current_type`
//! tracks the type actually produced; when it differs from the context and
//! conversion was requested, `convert_expression` closes the gap. Binary
//! and unary operators pick their concrete instruction from the type the
//! left (or only) operand settles on.

use super::Compiler;
use crate::ast::{BinaryOperator, Expression, UnaryOperator};
use crate::backend::{BinaryOp, Expr, UnaryOp};
use crate::diagnostics::DiagnosticCode;
use crate::program::Element;
use crate::types::{NativeType, Target, Type};

impl<'a> Compiler<'a> {
    /// Lower `expression` under `contextual_type`. On return,
    /// `current_type` equals the contextual type when `convert` is set,
    /// or the type the expression actually produced otherwise.
    pub(crate) fn compile_expression(
        &mut self,
        expression: &Expression,
        contextual_type: &Type,
        convert: bool,
    ) -> Expr {
        self.current_type = contextual_type.clone();
        let compiled = match expression {
            Expression::Integer(value) => self.compile_integer_literal(*value, contextual_type),
            Expression::Float(value) => self.compile_float_literal(*value, contextual_type),
            Expression::Identifier(name) => {
                self.compile_identifier(expression, name, contextual_type)
            }
            Expression::Parenthesized(inner) => {
                return self.compile_expression(inner, contextual_type, convert)
            }
            Expression::Binary { op, left, right } => {
                self.compile_binary(*op, left, right, contextual_type)
            }
            Expression::UnaryPrefix { op, operand } => {
                self.compile_unary_prefix(*op, operand, contextual_type)
            }
            Expression::UnaryPostfix { op, operand } => {
                self.compile_unary_postfix(*op, operand, contextual_type)
            }
            Expression::Call { .. } => self.compile_call(expression, contextual_type),
            Expression::Conditional {
                condition,
                if_true,
                if_false,
            } => self.compile_conditional(condition, if_true, if_false, contextual_type),
            Expression::String(_) => self.unsupported("string literals", contextual_type),
            Expression::Array(_) => self.unsupported("array literals", contextual_type),
            Expression::PropertyAccess { .. } => {
                self.unsupported("property access", contextual_type)
            }
            Expression::ElementAccess { .. } => {
                self.unsupported("element access", contextual_type)
            }
            Expression::New { .. } => self.unsupported("'new' expressions", contextual_type),
        };
        if convert && self.current_type != *contextual_type {
            let from = self.current_type.clone();
            let converted = self.convert_expression(compiled, &from, contextual_type);
            self.current_type = contextual_type.clone();
            converted
        } else {
            compiled
        }
    }

    /// Report an unimplemented form and keep the block structure
    /// well-formed with an `unreachable` node.
    pub(crate) fn unsupported(&mut self, what: &'static str, contextual_type: &Type) -> Expr {
        self.program
            .diagnostics
            .error(DiagnosticCode::NotImplemented(what));
        self.current_type = contextual_type.clone();
        self.module.create_unreachable()
    }

    // --- Literals ---

    fn compile_integer_literal(&mut self, value: i64, contextual_type: &Type) -> Expr {
        if *contextual_type == Type::Bool && (value == 0 || value == 1) {
            self.current_type = Type::Bool;
            return self.module.create_i32(value as i32);
        }
        if contextual_type.is_long_integer() {
            self.current_type = contextual_type.clone();
            return self.module.create_i64(value);
        }
        if value >= i32::MIN as i64 && value <= i32::MAX as i64 {
            self.current_type = Type::I32;
            self.module.create_i32(value as i32)
        } else {
            self.current_type = Type::I64;
            self.module.create_i64(value)
        }
    }

    fn compile_float_literal(&mut self, value: f64, contextual_type: &Type) -> Expr {
        if *contextual_type == Type::F32 {
            self.current_type = Type::F32;
            self.module.create_f32(value as f32)
        } else {
            self.current_type = Type::F64;
            self.module.create_f64(value)
        }
    }

    // --- Identifiers ---

    fn compile_identifier(
        &mut self,
        expression: &Expression,
        name: &str,
        contextual_type: &Type,
    ) -> Expr {
        match name {
            "null" => {
                if matches!(contextual_type, Type::Class { .. }) {
                    // Keep the class context; null is the zero reference.
                    self.current_type = contextual_type.clone();
                } else {
                    self.current_type = match self.options.target {
                        Target::Wasm32 => Type::U32,
                        Target::Wasm64 => Type::U64,
                    };
                }
                return match self.current_type.native_type() {
                    NativeType::I64 => self.module.create_i64(0),
                    _ => self.module.create_i32(0),
                };
            }
            "true" => {
                self.current_type = Type::Bool;
                return self.module.create_i32(1);
            }
            "false" => {
                self.current_type = Type::Bool;
                return self.module.create_i32(0);
            }
            "this" => {
                if self.current_function.is_instance {
                    let class = self
                        .current_function
                        .instance_method_of
                        .clone()
                        .unwrap_or_default();
                    let usize_type = self.program.usize_type();
                    self.current_type = Type::Class {
                        name: class,
                        size: usize_type.size(),
                    };
                    return self.module.create_get_local(0, usize_type.native_type());
                }
                self.program
                    .diagnostics
                    .error(DiagnosticCode::ThisOutsideInstanceMethod);
                self.current_type = contextual_type.clone();
                return self.module.create_unreachable();
            }
            "NaN" => {
                return if *contextual_type == Type::F32 {
                    self.current_type = Type::F32;
                    self.module.create_f32(f32::NAN)
                } else {
                    self.current_type = Type::F64;
                    self.module.create_f64(f64::NAN)
                };
            }
            "Infinity" => {
                return if *contextual_type == Type::F32 {
                    self.current_type = Type::F32;
                    self.module.create_f32(f32::INFINITY)
                } else {
                    self.current_type = Type::F64;
                    self.module.create_f64(f64::INFINITY)
                };
            }
            _ => {}
        }

        let element =
            self.program
                .resolve_element(expression, &self.current_function, &self.current_path);
        match element {
            Some(Element::Local(local)) => {
                self.current_type = local.ty.clone();
                self.module
                    .create_get_local(local.index, local.ty.native_type())
            }
            Some(Element::Global(global)) => {
                if !global.is_compiled.get() && !self.module.no_emit() {
                    self.compile_global(&global);
                }
                match self.global_type(&global) {
                    Some(ty) => {
                        self.current_type = ty.clone();
                        self.module
                            .create_get_global(global.internal_name.clone(), ty.native_type())
                    }
                    None => {
                        self.current_type = contextual_type.clone();
                        self.module.create_unreachable()
                    }
                }
            }
            Some(Element::EnumMember(member)) => {
                self.current_type = Type::I32;
                match member.constant_value.get() {
                    Some(value) => self.module.create_i32(value as i32),
                    None => self
                        .module
                        .create_get_global(member.internal_name.clone(), NativeType::I32),
                }
            }
            _ => {
                self.program
                    .diagnostics
                    .error(DiagnosticCode::CannotResolve(name.to_string()));
                self.current_type = contextual_type.clone();
                self.module.create_unreachable()
            }
        }
    }

    // --- Binary operators ---

    fn compile_binary(
        &mut self,
        op: BinaryOperator,
        left: &Expression,
        right: &Expression,
        contextual_type: &Type,
    ) -> Expr {
        if op == BinaryOperator::Assign {
            return self.compile_assignment(left, right, contextual_type);
        }
        if let Some(base) = op.compound_base() {
            let combined = self.compile_binary_operator(base, left, right, contextual_type);
            let tee = *contextual_type != Type::Void;
            return self.compile_assignment_with_value(left, combined, tee);
        }
        self.compile_binary_operator(op, left, right, contextual_type)
    }

    pub(crate) fn compile_binary_operator(
        &mut self,
        op: BinaryOperator,
        left: &Expression,
        right: &Expression,
        contextual_type: &Type,
    ) -> Expr {
        use BinaryOperator as Op;
        match op {
            Op::Add | Op::Sub | Op::Mul | Op::Div | Op::Rem => {
                let left_expr = self.compile_expression(left, contextual_type, false);
                let operand_type = self.current_type.clone();
                if op == Op::Rem && operand_type.is_any_float() {
                    self.program
                        .diagnostics
                        .error(DiagnosticCode::NotImplemented("floating-point remainder"));
                    self.current_type = contextual_type.clone();
                    return self.module.create_unreachable();
                }
                let right_expr = self.compile_expression(right, &operand_type, true);
                let selected = select_arithmetic(op, &operand_type);
                self.current_type = operand_type;
                self.module.create_binary(selected, left_expr, right_expr)
            }
            Op::Eq | Op::Ne | Op::Lt | Op::Le | Op::Gt | Op::Ge => {
                let left_expr = self.compile_expression(left, contextual_type, false);
                let operand_type = self.current_type.clone();
                let right_expr = self.compile_expression(right, &operand_type, true);
                let selected = select_comparison(op, &operand_type);
                self.current_type = Type::Bool;
                self.module.create_binary(selected, left_expr, right_expr)
            }
            Op::Shl | Op::Shr | Op::Shru | Op::BitAnd | Op::BitOr | Op::BitXor => {
                // Bit operations have no float form; substitute a long
                // integer context instead.
                let compile_type = if contextual_type.is_any_float() {
                    if op == Op::Shru {
                        Type::U64
                    } else {
                        Type::I64
                    }
                } else {
                    contextual_type.clone()
                };
                let left_expr = self.compile_expression(left, &compile_type, false);
                let operand_type = self.current_type.clone();
                if operand_type.is_any_float() {
                    self.program
                        .diagnostics
                        .error(DiagnosticCode::InvalidOperation(operand_type.to_string()));
                    self.current_type = contextual_type.clone();
                    return self.module.create_unreachable();
                }
                let right_expr = self.compile_expression(right, &operand_type, true);
                let selected = select_bitwise(op, &operand_type);
                self.current_type = operand_type;
                self.module.create_binary(selected, left_expr, right_expr)
            }
            Op::LogicalAnd | Op::LogicalOr => {
                self.unsupported("logical '&&' and '||'", contextual_type)
            }
            _ => unreachable!("assignment operators are routed before selection"),
        }
    }

    // --- Assignment ---

    fn compile_assignment(
        &mut self,
        target: &Expression,
        value: &Expression,
        contextual_type: &Type,
    ) -> Expr {
        let element_type = self.determine_expression_type(target);
        let value_expr = self.compile_expression(value, &element_type, true);
        let tee = *contextual_type != Type::Void;
        self.compile_assignment_with_value(target, value_expr, tee)
    }

    /// Store `value` into the element `target` resolves to. With `tee`,
    /// the produced expression also yields the stored value.
    pub(crate) fn compile_assignment_with_value(
        &mut self,
        target: &Expression,
        value: Expr,
        tee: bool,
    ) -> Expr {
        let element =
            self.program
                .resolve_element(target, &self.current_function, &self.current_path);
        match element {
            Some(Element::Local(local)) => {
                if tee {
                    self.current_type = local.ty.clone();
                    self.module
                        .create_tee_local(local.index, value, local.ty.native_type())
                } else {
                    self.current_type = Type::Void;
                    self.module.create_set_local(local.index, value)
                }
            }
            Some(Element::Global(global)) => {
                if !global.is_compiled.get() && !self.module.no_emit() {
                    self.compile_global(&global);
                }
                let ty = match self.global_type(&global) {
                    Some(ty) => ty,
                    None => {
                        self.current_type = Type::Void;
                        return self.module.create_unreachable();
                    }
                };
                let native = ty.native_type();
                let set = self
                    .module
                    .create_set_global(global.internal_name.clone(), value);
                if tee {
                    let get = self
                        .module
                        .create_get_global(global.internal_name.clone(), native);
                    self.current_type = ty;
                    self.module.create_block(None, vec![set, get], native)
                } else {
                    self.current_type = Type::Void;
                    set
                }
            }
            _ => {
                // Fields and setters are a reserved seam.
                self.program
                    .diagnostics
                    .error(DiagnosticCode::NotAssignable);
                if !tee {
                    self.current_type = Type::Void;
                }
                self.module.create_unreachable()
            }
        }
    }

    /// Type a target would produce, discovered by a scoped dry run with
    /// the backend inert.
    pub(crate) fn determine_expression_type(&mut self, expression: &Expression) -> Type {
        let saved_type = self.current_type.clone();
        let saved_no_emit = self.module.no_emit();
        self.module.set_no_emit(true);
        self.compile_expression(expression, &Type::I32, false);
        self.module.set_no_emit(saved_no_emit);
        let ty = self.current_type.clone();
        self.current_type = saved_type;
        ty
    }

    // --- Unary operators ---

    fn compile_unary_prefix(
        &mut self,
        op: UnaryOperator,
        operand: &Expression,
        contextual_type: &Type,
    ) -> Expr {
        match op {
            UnaryOperator::Plus => self.compile_expression(operand, contextual_type, false),
            UnaryOperator::Minus => {
                let value = self.compile_expression(operand, contextual_type, false);
                let operand_type = self.current_type.clone();
                match operand_type.machine_type() {
                    Type::F32 => self.module.create_unary(UnaryOp::NegF32, value),
                    Type::F64 => self.module.create_unary(UnaryOp::NegF64, value),
                    ty if ty.is_long_integer() => {
                        let zero = self.module.create_i64(0);
                        self.module.create_binary(BinaryOp::SubI64, zero, value)
                    }
                    _ => {
                        let zero = self.module.create_i32(0);
                        self.module.create_binary(BinaryOp::SubI32, zero, value)
                    }
                }
            }
            UnaryOperator::Not => {
                let value = self.compile_expression(operand, contextual_type, false);
                let operand_type = self.current_type.clone();
                let result = match operand_type.machine_type() {
                    Type::F32 => {
                        let zero = self.module.create_f32(0.0);
                        self.module.create_binary(BinaryOp::EqF32, value, zero)
                    }
                    Type::F64 => {
                        let zero = self.module.create_f64(0.0);
                        self.module.create_binary(BinaryOp::EqF64, value, zero)
                    }
                    ty if ty.is_long_integer() => {
                        self.module.create_unary(UnaryOp::EqzI64, value)
                    }
                    _ => self.module.create_unary(UnaryOp::EqzI32, value),
                };
                self.current_type = Type::Bool;
                result
            }
            UnaryOperator::BitNot => {
                let compile_type = if contextual_type.is_any_float() {
                    Type::I64
                } else {
                    contextual_type.clone()
                };
                let value = self.compile_expression(operand, &compile_type, false);
                let operand_type = self.current_type.clone();
                if operand_type.is_any_float() {
                    self.program
                        .diagnostics
                        .error(DiagnosticCode::InvalidOperation(operand_type.to_string()));
                    self.current_type = contextual_type.clone();
                    return self.module.create_unreachable();
                }
                if operand_type.is_long_integer() {
                    let ones = self.module.create_i64(-1);
                    self.module.create_binary(BinaryOp::XorI64, value, ones)
                } else {
                    let ones = self.module.create_i32(-1);
                    self.module.create_binary(BinaryOp::XorI32, value, ones)
                }
            }
            UnaryOperator::Increment | UnaryOperator::Decrement => {
                // Prefix increment is a compound add yielding the new value.
                let one = Expression::Integer(1);
                let base = if op == UnaryOperator::Increment {
                    BinaryOperator::Add
                } else {
                    BinaryOperator::Sub
                };
                let combined = self.compile_binary_operator(base, operand, &one, contextual_type);
                let tee = *contextual_type != Type::Void;
                self.compile_assignment_with_value(operand, combined, tee)
            }
        }
    }

    /// `x++` / `x--`: a two-element block `{ get; set }` whose value is the
    /// pre-increment value.
    fn compile_unary_postfix(
        &mut self,
        op: UnaryOperator,
        operand: &Expression,
        contextual_type: &Type,
    ) -> Expr {
        let element =
            self.program
                .resolve_element(operand, &self.current_function, &self.current_path);
        match element {
            Some(Element::Local(local)) => {
                let native = local.ty.native_type();
                let one = self.make_one(&local.ty);
                let selected = select_step(op, &local.ty);
                let get_value = self.module.create_get_local(local.index, native);
                let get_again = self.module.create_get_local(local.index, native);
                let stepped = self.module.create_binary(selected, get_again, one);
                let set_value = self.module.create_set_local(local.index, stepped);
                self.current_type = local.ty.clone();
                self.module
                    .create_block(None, vec![get_value, set_value], native)
            }
            Some(Element::Global(global)) => {
                if !global.is_compiled.get() && !self.module.no_emit() {
                    self.compile_global(&global);
                }
                let ty = match self.global_type(&global) {
                    Some(ty) => ty,
                    None => {
                        self.current_type = contextual_type.clone();
                        return self.module.create_unreachable();
                    }
                };
                let native = ty.native_type();
                let one = self.make_one(&ty);
                let selected = select_step(op, &ty);
                let get_value = self
                    .module
                    .create_get_global(global.internal_name.clone(), native);
                let get_again = self
                    .module
                    .create_get_global(global.internal_name.clone(), native);
                let stepped = self.module.create_binary(selected, get_again, one);
                let set_value = self
                    .module
                    .create_set_global(global.internal_name.clone(), stepped);
                self.current_type = ty;
                self.module
                    .create_block(None, vec![get_value, set_value], native)
            }
            _ => {
                self.program
                    .diagnostics
                    .error(DiagnosticCode::NotAssignable);
                self.current_type = contextual_type.clone();
                self.module.create_unreachable()
            }
        }
    }

    fn make_one(&self, ty: &Type) -> Expr {
        match ty.machine_type() {
            Type::F32 => self.module.create_f32(1.0),
            Type::F64 => self.module.create_f64(1.0),
            ty if ty.is_long_integer() => self.module.create_i64(1),
            _ => self.module.create_i32(1),
        }
    }

    // --- Calls ---

    fn compile_call(&mut self, expression: &Expression, contextual_type: &Type) -> Expr {
        let Expression::Call {
            callee,
            type_arguments,
            arguments,
        } = expression
        else {
            unreachable!("compile_call expects a call expression");
        };

        let element =
            self.program
                .resolve_element(callee, &self.current_function, &self.current_path);
        let Some(Element::FunctionPrototype(prototype)) = element else {
            let name = match callee.as_ref() {
                Expression::Identifier(name) => name.clone(),
                _ => "<call target>".to_string(),
            };
            self.program
                .diagnostics
                .error(DiagnosticCode::CannotResolve(name));
            self.current_type = contextual_type.clone();
            return self.module.create_unreachable();
        };

        if let Some(builtin) = prototype.builtin {
            return self.compile_builtin_call(builtin, type_arguments, arguments, contextual_type);
        }

        let mut resolved_type_arguments = Vec::with_capacity(type_arguments.len());
        for node in type_arguments {
            let map = &self.current_function.type_argument_map;
            match self.program.resolve_type(node, Some(map), true) {
                Some(ty) => resolved_type_arguments.push(ty),
                None => {
                    self.current_type = contextual_type.clone();
                    return self.module.create_unreachable();
                }
            }
        }
        let Some(instance) = prototype.resolve(self.program, &resolved_type_arguments) else {
            self.current_type = contextual_type.clone();
            return self.module.create_unreachable();
        };

        if arguments.len() > instance.parameters.len() {
            self.program
                .diagnostics
                .error(DiagnosticCode::TooManyArguments {
                    expected: instance.parameters.len(),
                    found: arguments.len(),
                });
            self.current_type = contextual_type.clone();
            return self.module.create_unreachable();
        }

        let declaration = instance.declaration.clone();
        let mut operands = Vec::with_capacity(instance.parameters.len());
        for (i, parameter) in instance.parameters.iter().enumerate() {
            if let Some(argument) = arguments.get(i) {
                operands.push(self.compile_expression(argument, &parameter.ty, true));
                continue;
            }
            // TODO: synthesize per-overload stubs holding the defaults;
            // lowering them here evaluates the initializer in the caller's
            // scope.
            let initializer = declaration
                .as_ref()
                .and_then(|d| d.parameters.get(i))
                .and_then(|p| p.initializer.clone());
            match initializer {
                Some(initializer) => {
                    operands.push(self.compile_expression(&initializer, &parameter.ty, true));
                }
                None => {
                    self.program
                        .diagnostics
                        .error(DiagnosticCode::MissingArgument(parameter.name.clone()));
                    self.current_type = contextual_type.clone();
                    return self.module.create_unreachable();
                }
            }
        }

        if !self.module.no_emit() {
            self.maybe_compile_function(&instance);
        }

        let return_type = instance.return_type.clone();
        let native = return_type.native_type();
        self.current_type = return_type;
        if instance.is_import {
            self.module
                .create_call_import(instance.internal_name.clone(), operands, native)
        } else {
            self.module
                .create_call(instance.internal_name.clone(), operands, native)
        }
    }

    // --- Conditional ---

    fn compile_conditional(
        &mut self,
        condition: &Expression,
        if_true: &Expression,
        if_false: &Expression,
        contextual_type: &Type,
    ) -> Expr {
        let condition = self.compile_expression(condition, &Type::I32, true);
        let if_true = self.compile_expression(if_true, contextual_type, true);
        let if_false = self.compile_expression(if_false, contextual_type, true);
        self.current_type = contextual_type.clone();
        self.module.create_select(condition, if_true, if_false)
    }
}

// --- Instruction selection by operand type ---

fn select_arithmetic(op: BinaryOperator, ty: &Type) -> BinaryOp {
    use BinaryOperator as Op;
    let machine = ty.machine_type();
    match machine {
        Type::F32 => match op {
            Op::Add => BinaryOp::AddF32,
            Op::Sub => BinaryOp::SubF32,
            Op::Mul => BinaryOp::MulF32,
            Op::Div => BinaryOp::DivF32,
            _ => unreachable!("float remainder is rejected before selection"),
        },
        Type::F64 => match op {
            Op::Add => BinaryOp::AddF64,
            Op::Sub => BinaryOp::SubF64,
            Op::Mul => BinaryOp::MulF64,
            Op::Div => BinaryOp::DivF64,
            _ => unreachable!("float remainder is rejected before selection"),
        },
        ty if ty.is_long_integer() => {
            let signed = ty.is_signed_integer();
            match op {
                Op::Add => BinaryOp::AddI64,
                Op::Sub => BinaryOp::SubI64,
                Op::Mul => BinaryOp::MulI64,
                Op::Div => {
                    if signed {
                        BinaryOp::DivSI64
                    } else {
                        BinaryOp::DivUI64
                    }
                }
                Op::Rem => {
                    if signed {
                        BinaryOp::RemSI64
                    } else {
                        BinaryOp::RemUI64
                    }
                }
                _ => unreachable!(),
            }
        }
        ty => {
            let signed = ty.is_signed_integer();
            match op {
                Op::Add => BinaryOp::AddI32,
                Op::Sub => BinaryOp::SubI32,
                Op::Mul => BinaryOp::MulI32,
                Op::Div => {
                    if signed {
                        BinaryOp::DivSI32
                    } else {
                        BinaryOp::DivUI32
                    }
                }
                Op::Rem => {
                    if signed {
                        BinaryOp::RemSI32
                    } else {
                        BinaryOp::RemUI32
                    }
                }
                _ => unreachable!(),
            }
        }
    }
}

fn select_comparison(op: BinaryOperator, ty: &Type) -> BinaryOp {
    use BinaryOperator as Op;
    let machine = ty.machine_type();
    match machine {
        Type::F32 => match op {
            Op::Eq => BinaryOp::EqF32,
            Op::Ne => BinaryOp::NeF32,
            Op::Lt => BinaryOp::LtF32,
            Op::Le => BinaryOp::LeF32,
            Op::Gt => BinaryOp::GtF32,
            Op::Ge => BinaryOp::GeF32,
            _ => unreachable!(),
        },
        Type::F64 => match op {
            Op::Eq => BinaryOp::EqF64,
            Op::Ne => BinaryOp::NeF64,
            Op::Lt => BinaryOp::LtF64,
            Op::Le => BinaryOp::LeF64,
            Op::Gt => BinaryOp::GtF64,
            Op::Ge => BinaryOp::GeF64,
            _ => unreachable!(),
        },
        ty if ty.is_long_integer() => {
            let signed = ty.is_signed_integer();
            match op {
                Op::Eq => BinaryOp::EqI64,
                Op::Ne => BinaryOp::NeI64,
                Op::Lt => {
                    if signed {
                        BinaryOp::LtSI64
                    } else {
                        BinaryOp::LtUI64
                    }
                }
                Op::Le => {
                    if signed {
                        BinaryOp::LeSI64
                    } else {
                        BinaryOp::LeUI64
                    }
                }
                Op::Gt => {
                    if signed {
                        BinaryOp::GtSI64
                    } else {
                        BinaryOp::GtUI64
                    }
                }
                Op::Ge => {
                    if signed {
                        BinaryOp::GeSI64
                    } else {
                        BinaryOp::GeUI64
                    }
                }
                _ => unreachable!(),
            }
        }
        ty => {
            let signed = ty.is_signed_integer();
            match op {
                Op::Eq => BinaryOp::EqI32,
                Op::Ne => BinaryOp::NeI32,
                Op::Lt => {
                    if signed {
                        BinaryOp::LtSI32
                    } else {
                        BinaryOp::LtUI32
                    }
                }
                Op::Le => {
                    if signed {
                        BinaryOp::LeSI32
                    } else {
                        BinaryOp::LeUI32
                    }
                }
                Op::Gt => {
                    if signed {
                        BinaryOp::GtSI32
                    } else {
                        BinaryOp::GtUI32
                    }
                }
                Op::Ge => {
                    if signed {
                        BinaryOp::GeSI32
                    } else {
                        BinaryOp::GeUI32
                    }
                }
                _ => unreachable!(),
            }
        }
    }
}

fn select_bitwise(op: BinaryOperator, ty: &Type) -> BinaryOp {
    use BinaryOperator as Op;
    let long = ty.is_long_integer();
    let signed = ty.is_signed_integer();
    if long {
        match op {
            Op::Shl => BinaryOp::ShlI64,
            Op::Shr => {
                if signed {
                    BinaryOp::ShrSI64
                } else {
                    BinaryOp::ShrUI64
                }
            }
            Op::Shru => BinaryOp::ShrUI64,
            Op::BitAnd => BinaryOp::AndI64,
            Op::BitOr => BinaryOp::OrI64,
            Op::BitXor => BinaryOp::XorI64,
            _ => unreachable!(),
        }
    } else {
        match op {
            Op::Shl => BinaryOp::ShlI32,
            Op::Shr => {
                if signed {
                    BinaryOp::ShrSI32
                } else {
                    BinaryOp::ShrUI32
                }
            }
            Op::Shru => BinaryOp::ShrUI32,
            Op::BitAnd => BinaryOp::AndI32,
            Op::BitOr => BinaryOp::OrI32,
            Op::BitXor => BinaryOp::XorI32,
            _ => unreachable!(),
        }
    }
}

fn select_step(op: UnaryOperator, ty: &Type) -> BinaryOp {
    let increment = op == UnaryOperator::Increment;
    match ty.machine_type() {
        Type::F32 => {
            if increment {
                BinaryOp::AddF32
            } else {
                BinaryOp::SubF32
            }
        }
        Type::F64 => {
            if increment {
                BinaryOp::AddF64
            } else {
                BinaryOp::SubF64
            }
        }
        ty if ty.is_long_integer() => {
            if increment {
                BinaryOp::AddI64
            } else {
                BinaryOp::SubI64
            }
        }
        _ => {
            if increment {
                BinaryOp::AddI32
            } else {
                BinaryOp::SubI32
            }
        }
    }
}
