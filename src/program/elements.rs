//! Program elements
//!
//! Everything the resolver can hand the code generator is one of the
//! tagged variants below. Elements carry interior-mutable compilation
//! state (`is_compiled`, break contexts, locals) because a single-threaded
//! driver walks them while the program keeps ownership.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::{
    ClassDeclaration, EnumDeclaration, EnumValueDeclaration, FunctionDeclaration,
    NamespaceDeclaration, VariableDeclaration,
};
use crate::types::{NativeType, Type};

/// Compile-time constant attached to a `const` global.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstantValue {
    Integer(i64),
    Float(f64),
}

/// The builtin functions the resolver seeds; dispatch happens on this tag
/// rather than by re-parsing internal names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Clz,
    Ctz,
    Popcnt,
    Rotl,
    Rotr,
    Abs,
    Ceil,
    Floor,
    Nearest,
    Sqrt,
    Trunc,
    Copysign,
    Min,
    Max,
    CurrentMemory,
    GrowMemory,
    Unreachable,
    SizeOf,
    IsNaN,
    IsFinite,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Local {
    pub index: u32,
    pub ty: Type,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub ty: Type,
}

#[derive(Debug)]
pub struct Global {
    pub internal_name: String,
    pub simple_name: String,
    pub is_mutable: bool,
    pub declaration: Option<Rc<VariableDeclaration>>,
    pub constant_value: Cell<Option<ConstantValue>>,
    /// Resolved lazily from the declaration's type annotation.
    pub ty: RefCell<Option<Type>>,
    pub is_compiled: Cell<bool>,
}

#[derive(Debug)]
pub struct EnumMember {
    pub internal_name: String,
    pub simple_name: String,
    pub declaration: EnumValueDeclaration,
    pub constant_value: Cell<Option<i64>>,
    pub is_compiled: Cell<bool>,
}

#[derive(Debug)]
pub struct Enum {
    pub internal_name: String,
    pub simple_name: String,
    pub declaration: Rc<EnumDeclaration>,
    pub members: Vec<Rc<EnumMember>>,
    pub is_compiled: Cell<bool>,
}

#[derive(Debug)]
pub struct FunctionPrototype {
    pub internal_name: String,
    pub simple_name: String,
    /// `None` for resolver-seeded builtins.
    pub declaration: Option<Rc<FunctionDeclaration>>,
    pub is_generic: bool,
    pub is_export: bool,
    pub builtin: Option<Builtin>,
    pub instance_method_of: Option<String>,
    pub instances: RefCell<HashMap<String, Rc<Function>>>,
}

/// A concrete function: resolved prototype plus type arguments.
#[derive(Debug)]
pub struct Function {
    pub internal_name: String,
    pub declaration: Option<Rc<FunctionDeclaration>>,
    pub parameters: Vec<Parameter>,
    pub return_type: Type,
    /// Generic parameter name to concrete argument, for resolving types in
    /// the body.
    pub type_argument_map: HashMap<String, Type>,
    pub is_instance: bool,
    pub instance_method_of: Option<String>,
    pub is_import: bool,
    pub is_builtin: bool,
    pub is_compiled: Cell<bool>,
    pub global_export_name: RefCell<Option<String>>,
    locals: RefCell<Vec<Local>>,
    locals_by_name: RefCell<HashMap<String, u32>>,
    break_stack: RefCell<Vec<u32>>,
    next_break_id: Cell<u32>,
}

impl Function {
    pub fn new(
        internal_name: String,
        declaration: Option<Rc<FunctionDeclaration>>,
        parameters: Vec<Parameter>,
        return_type: Type,
        type_argument_map: HashMap<String, Type>,
        is_import: bool,
    ) -> Function {
        let mut locals = Vec::with_capacity(parameters.len());
        let mut locals_by_name = HashMap::with_capacity(parameters.len());
        for (index, param) in parameters.iter().enumerate() {
            locals.push(Local {
                index: index as u32,
                ty: param.ty.clone(),
                name: Some(param.name.clone()),
            });
            locals_by_name.insert(param.name.clone(), index as u32);
        }
        Function {
            internal_name,
            declaration,
            parameters,
            return_type,
            type_argument_map,
            is_instance: false,
            instance_method_of: None,
            is_import,
            is_builtin: false,
            is_compiled: Cell::new(false),
            global_export_name: RefCell::new(None),
            locals: RefCell::new(locals),
            locals_by_name: RefCell::new(locals_by_name),
            break_stack: RefCell::new(Vec::new()),
            next_break_id: Cell::new(0),
        }
    }

    /// Allocates the next local index. Named locals also enter the lookup
    /// table; the caller is responsible for rejecting duplicates first.
    pub fn add_local(&self, name: Option<&str>, ty: Type) -> u32 {
        let mut locals = self.locals.borrow_mut();
        let index = locals.len() as u32;
        locals.push(Local {
            index,
            ty,
            name: name.map(str::to_string),
        });
        if let Some(name) = name {
            self.locals_by_name
                .borrow_mut()
                .insert(name.to_string(), index);
        }
        index
    }

    pub fn local(&self, name: &str) -> Option<Local> {
        let index = *self.locals_by_name.borrow().get(name)?;
        Some(self.locals.borrow()[index as usize].clone())
    }

    pub fn local_type(&self, index: u32) -> Type {
        self.locals.borrow()[index as usize].ty.clone()
    }

    /// Native types of the locals introduced beyond the parameters.
    pub fn additional_locals(&self) -> Vec<NativeType> {
        self.locals
            .borrow()
            .iter()
            .skip(self.parameters.len())
            .map(|l| l.ty.native_type())
            .collect()
    }

    /// Opens a fresh break context and returns its label stem.
    pub fn enter_break_context(&self) -> String {
        let id = self.next_break_id.get();
        self.next_break_id.set(id + 1);
        self.break_stack.borrow_mut().push(id);
        id.to_string()
    }

    pub fn leave_break_context(&self) {
        self.break_stack.borrow_mut().pop();
    }

    /// Label stem of the innermost enclosing break context, if any.
    pub fn break_context(&self) -> Option<String> {
        self.break_stack.borrow().last().map(|id| id.to_string())
    }
}

#[derive(Debug)]
pub struct ClassPrototype {
    pub internal_name: String,
    pub simple_name: String,
    pub declaration: Rc<ClassDeclaration>,
    pub is_generic: bool,
    pub is_export: bool,
}

/// A concrete class: resolved prototype plus type arguments. Layout and
/// method emission are reserved seams.
#[derive(Debug)]
pub struct Class {
    pub internal_name: String,
    pub type_arguments: Vec<Type>,
}

#[derive(Debug)]
pub struct Namespace {
    pub internal_name: String,
    pub simple_name: String,
    pub declaration: Rc<NamespaceDeclaration>,
    pub is_export: bool,
}

/// A class field; layout is a reserved seam.
#[derive(Debug)]
pub struct Field {
    pub internal_name: String,
    pub simple_name: String,
    pub ty: Type,
}

#[derive(Debug, Clone)]
pub enum Element {
    Global(Rc<Global>),
    Enum(Rc<Enum>),
    EnumMember(Rc<EnumMember>),
    FunctionPrototype(Rc<FunctionPrototype>),
    Function(Rc<Function>),
    ClassPrototype(Rc<ClassPrototype>),
    Class(Rc<Class>),
    Namespace(Rc<Namespace>),
    Local(Local),
    Field(Rc<Field>),
}
