//! Shared AST construction helpers for the integration tests.
//!
//! The parser is out of scope, so tests build the post-parse tree
//! directly; these helpers keep that construction readable.

#![allow(dead_code)]

use std::rc::Rc;

use tsw_compiler::ast::*;
use tsw_compiler::backend::Module;
use tsw_compiler::codegen::Options;
use tsw_compiler::driver::compile_program;
use tsw_compiler::program::{Program, Source};
use tsw_compiler::types::Target;

pub fn source(path: &str, is_entry: bool, statements: Vec<Statement>) -> Source {
    Source {
        normalized_path: path.to_string(),
        is_entry,
        statements,
    }
}

/// A program with a single entry source named "main".
pub fn entry_program(statements: Vec<Statement>) -> Program {
    Program::new(vec![source("main", true, statements)])
}

pub fn compile(program: &Program) -> Module {
    compile_program(program, Options::default())
}

pub fn compile_with(program: &Program, options: Options) -> Module {
    compile_program(program, options)
}

pub fn wasm64_options() -> Options {
    Options {
        target: Target::Wasm64,
        ..Options::default()
    }
}

// --- Types ---

pub fn ty(name: &str) -> TypeNode {
    TypeNode::plain(name)
}

// --- Expressions ---

pub fn ident(name: &str) -> Expression {
    Expression::Identifier(name.to_string())
}

pub fn int(value: i64) -> Expression {
    Expression::Integer(value)
}

pub fn float(value: f64) -> Expression {
    Expression::Float(value)
}

pub fn binary(op: BinaryOperator, left: Expression, right: Expression) -> Expression {
    Expression::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

pub fn assign(target: Expression, value: Expression) -> Expression {
    binary(BinaryOperator::Assign, target, value)
}

pub fn call(name: &str, arguments: Vec<Expression>) -> Expression {
    Expression::Call {
        callee: Box::new(ident(name)),
        type_arguments: Vec::new(),
        arguments,
    }
}

pub fn call_generic(name: &str, type_arguments: Vec<TypeNode>, arguments: Vec<Expression>) -> Expression {
    Expression::Call {
        callee: Box::new(ident(name)),
        type_arguments,
        arguments,
    }
}

// --- Statements ---

pub fn expr_stmt(expression: Expression) -> Statement {
    Statement::Expression(expression)
}

pub fn ret(value: Option<Expression>) -> Statement {
    Statement::Return(value)
}

pub fn param(name: &str, type_name: &str) -> ParameterDeclaration {
    ParameterDeclaration {
        name: name.to_string(),
        type_node: ty(type_name),
        initializer: None,
    }
}

pub fn function(
    name: &str,
    parameters: Vec<ParameterDeclaration>,
    return_type: Option<&str>,
    body: Vec<Statement>,
    is_export: bool,
) -> Statement {
    Statement::Function(Rc::new(FunctionDeclaration {
        name: name.to_string(),
        type_parameters: Vec::new(),
        parameters,
        return_type: return_type.map(ty),
        body: Some(body),
        is_export,
        is_declare: false,
    }))
}

pub fn generic_function(
    name: &str,
    type_parameters: Vec<&str>,
    parameters: Vec<ParameterDeclaration>,
    return_type: Option<&str>,
    body: Vec<Statement>,
    is_export: bool,
) -> Statement {
    Statement::Function(Rc::new(FunctionDeclaration {
        name: name.to_string(),
        type_parameters: type_parameters.iter().map(|s| s.to_string()).collect(),
        parameters,
        return_type: return_type.map(ty),
        body: Some(body),
        is_export,
        is_declare: false,
    }))
}

pub fn variable(
    name: &str,
    type_name: Option<&str>,
    initializer: Option<Expression>,
    is_const: bool,
    is_export: bool,
) -> Statement {
    Statement::Variable(Rc::new(VariableStatement {
        declarations: vec![Rc::new(VariableDeclaration {
            name: name.to_string(),
            type_node: type_name.map(ty),
            initializer,
            is_const,
        })],
        is_export,
    }))
}

pub fn local(name: &str, type_name: &str, initializer: Option<Expression>) -> Statement {
    variable(name, Some(type_name), initializer, false, false)
}

pub fn enum_decl(name: &str, members: Vec<(&str, Option<Expression>)>, is_export: bool) -> Statement {
    Statement::Enum(Rc::new(EnumDeclaration {
        name: name.to_string(),
        members: members
            .into_iter()
            .map(|(name, value)| EnumValueDeclaration {
                name: name.to_string(),
                value,
            })
            .collect(),
        is_export,
    }))
}

pub fn import(path: &str) -> Statement {
    Statement::Import(Rc::new(ImportStatement {
        path: path.to_string(),
    }))
}

pub fn export(members: Vec<(&str, &str)>, path: Option<&str>) -> Statement {
    Statement::Export(Rc::new(ExportStatement {
        members: members
            .into_iter()
            .map(|(local_name, exported_name)| ExportMember {
                local_name: local_name.to_string(),
                exported_name: exported_name.to_string(),
            })
            .collect(),
        path: path.map(str::to_string),
    }))
}

pub fn case(label: Expression, statements: Vec<Statement>) -> SwitchCase {
    SwitchCase {
        label: Some(label),
        statements,
    }
}

pub fn default_case(statements: Vec<Statement>) -> SwitchCase {
    SwitchCase {
        label: None,
        statements,
    }
}
