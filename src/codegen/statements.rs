//! Statement lowering
//!
//! Structured control flow becomes WebAssembly's label-based block/loop
//! form. Loops and switches open a break context on the current function,
//! yielding the fresh `break$N` / `continue$N` labels their jumps target.

use std::rc::Rc;

use super::Compiler;
use crate::ast::{Expression, Statement, SwitchCase, VariableStatement};
use crate::backend::{BinaryOp, Expr};
use crate::diagnostics::DiagnosticCode;
use crate::types::{NativeType, Type};

impl<'a> Compiler<'a> {
    /// Lower one statement to a single backend expression of type `none`.
    pub(crate) fn compile_statement(&mut self, statement: &Statement) -> Expr {
        match statement {
            Statement::Block(statements) => {
                let members = statements
                    .iter()
                    .map(|s| self.compile_statement(s))
                    .collect();
                self.module.create_block(None, members, NativeType::None)
            }
            Statement::Break => self.compile_break(),
            Statement::Continue => self.compile_continue(),
            Statement::Do { body, condition } => self.compile_do(body, condition),
            Statement::Empty => self.module.create_nop(),
            Statement::Expression(expression) => {
                self.compile_expression(expression, &Type::Void, true)
            }
            Statement::For {
                initializer,
                condition,
                incrementor,
                body,
            } => self.compile_for(initializer.as_deref(), condition.as_ref(), incrementor.as_ref(), body),
            Statement::If {
                condition,
                if_true,
                if_false,
            } => {
                let condition = self.compile_expression(condition, &Type::I32, true);
                let if_true = self.compile_statement(if_true);
                let if_false = if_false.as_deref().map(|s| self.compile_statement(s));
                self.module.create_if(condition, if_true, if_false)
            }
            Statement::Return(value) => {
                let value = value.as_ref().map(|expression| {
                    let return_type = self.current_function.return_type.clone();
                    self.compile_expression(expression, &return_type, true)
                });
                self.module.create_return(value)
            }
            Statement::Switch { condition, cases } => self.compile_switch(condition, cases),
            Statement::Throw(_) => {
                // Exception handling is not modeled; a throw traps.
                self.module.create_unreachable()
            }
            Statement::Try { .. } => {
                self.program
                    .diagnostics
                    .error(DiagnosticCode::NotImplemented("try statements"));
                self.module.create_unreachable()
            }
            Statement::Variable(stmt) => self.compile_variable_statement(stmt),
            Statement::While { condition, body } => self.compile_while(condition, body),
            Statement::Class(_)
            | Statement::Function(_)
            | Statement::Enum(_)
            | Statement::Namespace(_)
            | Statement::Import(_)
            | Statement::Export(_) => {
                self.program
                    .diagnostics
                    .error(DiagnosticCode::NotImplemented("nested declarations"));
                self.module.create_unreachable()
            }
        }
    }

    fn compile_break(&mut self) -> Expr {
        match self.current_function.break_context() {
            Some(stem) => self.module.create_break(format!("break${}", stem), None),
            None => {
                self.program
                    .diagnostics
                    .error(DiagnosticCode::BreakOutsideContext);
                self.module.create_unreachable()
            }
        }
    }

    fn compile_continue(&mut self) -> Expr {
        match self.current_function.break_context() {
            Some(stem) if !self.disallow_continue => self
                .module
                .create_break(format!("continue${}", stem), None),
            _ => {
                self.program
                    .diagnostics
                    .error(DiagnosticCode::ContinueOutsideContext);
                self.module.create_unreachable()
            }
        }
    }

    /// ```text
    /// block break$N {
    ///   loop continue$N {
    ///     if (cond) block { body ; br continue$N }
    ///   }
    /// }
    /// ```
    fn compile_while(&mut self, condition: &Expression, body: &Statement) -> Expr {
        let stem = self.current_function.enter_break_context();
        let saved_disallow = std::mem::replace(&mut self.disallow_continue, false);
        let break_label = format!("break${}", stem);
        let continue_label = format!("continue${}", stem);

        let condition = self.compile_expression(condition, &Type::I32, true);
        let body = self.compile_statement(body);

        self.disallow_continue = saved_disallow;
        self.current_function.leave_break_context();

        let back_edge = self.module.create_break(continue_label.clone(), None);
        let inner = self
            .module
            .create_block(None, vec![body, back_edge], NativeType::None);
        let guarded = self.module.create_if(condition, inner, None);
        let loop_node = self.module.create_loop(continue_label, guarded);
        self.module
            .create_block(Some(break_label), vec![loop_node], NativeType::None)
    }

    /// Same skeleton as `while`, but the body precedes the conditional
    /// back-edge.
    fn compile_do(&mut self, body: &Statement, condition: &Expression) -> Expr {
        let stem = self.current_function.enter_break_context();
        let saved_disallow = std::mem::replace(&mut self.disallow_continue, false);
        let break_label = format!("break${}", stem);
        let continue_label = format!("continue${}", stem);

        let body = self.compile_statement(body);
        let condition = self.compile_expression(condition, &Type::I32, true);

        self.disallow_continue = saved_disallow;
        self.current_function.leave_break_context();

        let back_edge = self
            .module
            .create_break(continue_label.clone(), Some(condition));
        let sequence = self
            .module
            .create_block(None, vec![body, back_edge], NativeType::None);
        let loop_node = self.module.create_loop(continue_label, sequence);
        self.module
            .create_block(Some(break_label), vec![loop_node], NativeType::None)
    }

    fn compile_for(
        &mut self,
        initializer: Option<&Statement>,
        condition: Option<&Expression>,
        incrementor: Option<&Expression>,
        body: &Statement,
    ) -> Expr {
        let stem = self.current_function.enter_break_context();
        let saved_disallow = std::mem::replace(&mut self.disallow_continue, false);
        let break_label = format!("break${}", stem);
        let continue_label = format!("continue${}", stem);

        let initializer = match initializer {
            Some(statement) => self.compile_statement(statement),
            None => self.module.create_nop(),
        };
        let condition = match condition {
            Some(expression) => self.compile_expression(expression, &Type::I32, true),
            None => self.module.create_i32(1),
        };
        let incrementor = match incrementor {
            Some(expression) => self.compile_expression(expression, &Type::Void, true),
            None => self.module.create_nop(),
        };
        let body = self.compile_statement(body);

        self.disallow_continue = saved_disallow;
        self.current_function.leave_break_context();

        let back_edge = self.module.create_break(continue_label.clone(), None);
        let inner = self.module.create_block(
            None,
            vec![body, incrementor, back_edge],
            NativeType::None,
        );
        let guarded = self.module.create_if(condition, inner, None);
        let loop_node = self.module.create_loop(continue_label, guarded);
        self.module.create_block(
            Some(break_label),
            vec![initializer, loop_node],
            NativeType::None,
        )
    }

    /// Cascade of nested blocks: the innermost holds the temp assignment
    /// and the `br_if` dispatch chain, each enclosing block ends right
    /// where the next case's statements begin, and falling off a case runs
    /// into the following one.
    fn compile_switch(&mut self, condition: &Expression, cases: &[SwitchCase]) -> Expr {
        let stem = self.current_function.enter_break_context();
        let saved_disallow = std::mem::replace(&mut self.disallow_continue, true);
        let break_label = format!("break${}", stem);

        let condition = self.compile_expression(condition, &Type::I32, true);
        let temp_index = self.current_function.add_local(None, Type::I32);
        let set_temp = self.module.create_set_local(temp_index, condition);

        // Jump target of the i-th case; numbering is by overall position.
        let case_labels: Vec<String> = cases
            .iter()
            .enumerate()
            .map(|(i, case)| match case.label {
                Some(_) => format!("case{}${}", i, stem),
                None => format!("case_default${}", stem),
            })
            .collect();

        let mut header = vec![set_temp];
        for (i, case) in cases.iter().enumerate() {
            if let Some(label) = &case.label {
                let value = self.compile_expression(label, &Type::I32, true);
                let probe = self.module.create_get_local(temp_index, NativeType::I32);
                let matches = self.module.create_binary(BinaryOp::EqI32, probe, value);
                header.push(self.module.create_break(case_labels[i].clone(), Some(matches)));
            }
        }
        let fallback = cases
            .iter()
            .position(|case| case.label.is_none())
            .map(|i| case_labels[i].clone())
            .unwrap_or_else(|| break_label.clone());
        header.push(self.module.create_break(fallback, None));

        let innermost_label = case_labels
            .first()
            .cloned()
            .unwrap_or_else(|| break_label.clone());
        let mut current = self
            .module
            .create_block(Some(innermost_label), header, NativeType::None);
        for (i, case) in cases.iter().enumerate() {
            let enclosing_label = if i + 1 < cases.len() {
                case_labels[i + 1].clone()
            } else {
                break_label.clone()
            };
            let mut body = vec![current];
            for statement in &case.statements {
                body.push(self.compile_statement(statement));
            }
            current = self
                .module
                .create_block(Some(enclosing_label), body, NativeType::None);
        }

        self.disallow_continue = saved_disallow;
        self.current_function.leave_break_context();
        current
    }

    fn compile_variable_statement(&mut self, stmt: &VariableStatement) -> Expr {
        // At the top level every declaration becomes a global.
        if Rc::ptr_eq(&self.current_function, &self.start_function) {
            for declaration in &stmt.declarations {
                self.compile_global_declaration(declaration);
            }
            return self.module.create_nop();
        }

        let mut initializers = Vec::new();
        for declaration in &stmt.declarations {
            let ty = match &declaration.type_node {
                Some(node) => {
                    let map = &self.current_function.type_argument_map;
                    match self.program.resolve_type(node, Some(map), true) {
                        Some(ty) => ty,
                        None => continue,
                    }
                }
                None => {
                    self.program
                        .diagnostics
                        .error(DiagnosticCode::TypeAnnotationRequired(
                            declaration.name.clone(),
                        ));
                    continue;
                }
            };
            if self.current_function.local(&declaration.name).is_some() {
                self.program
                    .diagnostics
                    .error(DiagnosticCode::DuplicateLocal(declaration.name.clone()));
                continue;
            }
            self.current_function
                .add_local(Some(&declaration.name), ty.clone());
            if let Some(initializer) = &declaration.initializer {
                let target = Expression::Identifier(declaration.name.clone());
                let value = self.compile_expression(initializer, &ty, true);
                initializers.push(self.compile_assignment_with_value(&target, value, false));
            }
        }
        match initializers.len() {
            0 => self.module.create_nop(),
            1 => initializers.pop().unwrap(),
            _ => self
                .module
                .create_block(None, initializers, NativeType::None),
        }
    }
}
