//! Element seeding and resolution
//!
//! `initialize` fixes the pointer width, seeds the builtin prototypes and
//! indexes every source's top-level declarations into the element table.
//! Resolution maps type references and identifier expressions back onto
//! elements; it performs no type checking of its own.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use super::elements::{
    Builtin, ClassPrototype, ConstantValue, Element, Enum, EnumMember, Function,
    FunctionPrototype, Global, Namespace, Parameter,
};
use super::{Program, Source};
use crate::ast::{Expression, Statement, TypeNode};
use crate::diagnostics::DiagnosticCode;
use crate::types::{Target, Type};

const BUILTINS: &[(&str, Builtin)] = &[
    ("clz", Builtin::Clz),
    ("ctz", Builtin::Ctz),
    ("popcnt", Builtin::Popcnt),
    ("rotl", Builtin::Rotl),
    ("rotr", Builtin::Rotr),
    ("abs", Builtin::Abs),
    ("ceil", Builtin::Ceil),
    ("floor", Builtin::Floor),
    ("nearest", Builtin::Nearest),
    ("sqrt", Builtin::Sqrt),
    ("trunc", Builtin::Trunc),
    ("copysign", Builtin::Copysign),
    ("min", Builtin::Min),
    ("max", Builtin::Max),
    ("current_memory", Builtin::CurrentMemory),
    ("grow_memory", Builtin::GrowMemory),
    ("unreachable", Builtin::Unreachable),
    ("sizeof", Builtin::SizeOf),
    ("isNaN", Builtin::IsNaN),
    ("isFinite", Builtin::IsFinite),
];

impl Program {
    /// Populates the element table for the selected target: builtin
    /// prototypes under their bare names, then every source's top-level
    /// declarations under `<path>/<name>`.
    pub fn initialize(&self, target: Target) {
        self.set_target(target);
        for (name, builtin) in BUILTINS {
            self.add_element(
                name,
                Element::FunctionPrototype(Rc::new(FunctionPrototype {
                    internal_name: name.to_string(),
                    simple_name: name.to_string(),
                    declaration: None,
                    is_generic: false,
                    is_export: false,
                    builtin: Some(*builtin),
                    instance_method_of: None,
                    instances: RefCell::new(HashMap::new()),
                })),
            );
        }
        for source in &self.sources {
            self.index_source(source);
        }
    }

    fn index_source(&self, source: &Source) {
        for statement in &source.statements {
            self.index_statement(&source.normalized_path, "", statement);
        }
    }

    fn index_statement(&self, path: &str, prefix: &str, statement: &Statement) {
        match statement {
            Statement::Function(decl) => {
                let internal_name = format!("{}/{}{}", path, prefix, decl.name);
                self.add_element(
                    &internal_name,
                    Element::FunctionPrototype(Rc::new(FunctionPrototype {
                        internal_name: internal_name.clone(),
                        simple_name: decl.name.clone(),
                        declaration: Some(decl.clone()),
                        is_generic: !decl.type_parameters.is_empty(),
                        is_export: decl.is_export,
                        builtin: None,
                        instance_method_of: None,
                        instances: RefCell::new(HashMap::new()),
                    })),
                );
            }
            Statement::Class(decl) => {
                let internal_name = format!("{}/{}{}", path, prefix, decl.name);
                self.add_element(
                    &internal_name,
                    Element::ClassPrototype(Rc::new(ClassPrototype {
                        internal_name: internal_name.clone(),
                        simple_name: decl.name.clone(),
                        declaration: decl.clone(),
                        is_generic: !decl.type_parameters.is_empty(),
                        is_export: decl.is_export,
                    })),
                );
            }
            Statement::Enum(decl) => {
                let internal_name = format!("{}/{}{}", path, prefix, decl.name);
                let mut members = Vec::with_capacity(decl.members.len());
                for value in &decl.members {
                    let member = Rc::new(EnumMember {
                        internal_name: format!("{}.{}", internal_name, value.name),
                        simple_name: value.name.clone(),
                        declaration: value.clone(),
                        constant_value: Cell::new(None),
                        is_compiled: Cell::new(false),
                    });
                    self.add_element(&member.internal_name, Element::EnumMember(member.clone()));
                    members.push(member);
                }
                self.add_element(
                    &internal_name,
                    Element::Enum(Rc::new(Enum {
                        internal_name: internal_name.clone(),
                        simple_name: decl.name.clone(),
                        declaration: decl.clone(),
                        members,
                        is_compiled: Cell::new(false),
                    })),
                );
            }
            Statement::Variable(stmt) => {
                for decl in &stmt.declarations {
                    let internal_name = format!("{}/{}{}", path, prefix, decl.name);
                    let constant_value = if decl.is_const {
                        match &decl.initializer {
                            Some(Expression::Integer(v)) => Some(ConstantValue::Integer(*v)),
                            Some(Expression::Float(v)) => Some(ConstantValue::Float(*v)),
                            _ => None,
                        }
                    } else {
                        None
                    };
                    self.add_element(
                        &internal_name,
                        Element::Global(Rc::new(Global {
                            internal_name: internal_name.clone(),
                            simple_name: decl.name.clone(),
                            is_mutable: !decl.is_const,
                            declaration: Some(decl.clone()),
                            constant_value: Cell::new(constant_value),
                            ty: RefCell::new(None),
                            is_compiled: Cell::new(false),
                        })),
                    );
                }
            }
            Statement::Namespace(decl) => {
                let internal_name = format!("{}/{}{}", path, prefix, decl.name);
                self.add_element(
                    &internal_name,
                    Element::Namespace(Rc::new(Namespace {
                        internal_name: internal_name.clone(),
                        simple_name: decl.name.clone(),
                        declaration: decl.clone(),
                        is_export: decl.is_export,
                    })),
                );
                let member_prefix = format!("{}{}.", prefix, decl.name);
                for member in &decl.members {
                    self.index_statement(path, &member_prefix, member);
                }
            }
            Statement::Export(stmt) => {
                let target_path = stmt.path.as_deref().unwrap_or(path);
                for member in &stmt.members {
                    self.record_export(
                        &member.exported_name,
                        &format!("{}/{}", target_path, member.local_name),
                    );
                }
            }
            _ => {}
        }
    }

    /// Resolve a type reference. Contextual type arguments (generic
    /// parameters in scope) take precedence over every other name.
    pub fn resolve_type(
        &self,
        node: &TypeNode,
        contextual: Option<&HashMap<String, Type>>,
        report_errors: bool,
    ) -> Option<Type> {
        if let Some(map) = contextual {
            if let Some(ty) = map.get(&node.name) {
                return Some(ty.clone());
            }
        }
        let ty = match node.name.as_str() {
            "void" => Type::Void,
            "bool" | "boolean" => Type::Bool,
            "i8" => Type::I8,
            "i16" => Type::I16,
            "i32" => Type::I32,
            "i64" => Type::I64,
            "u8" => Type::U8,
            "u16" => Type::U16,
            "u32" => Type::U32,
            "u64" => Type::U64,
            "f32" => Type::F32,
            "f64" => Type::F64,
            "usize" => self.usize_type(),
            name => match self.find_class_prototype(name) {
                Some(prototype) => Type::Class {
                    name: prototype.internal_name.clone(),
                    size: self.target().usize_bits(),
                },
                None => {
                    if report_errors {
                        self.diagnostics
                            .error(DiagnosticCode::UnknownType(name.to_string()));
                    }
                    return None;
                }
            },
        };
        Some(ty)
    }

    fn find_class_prototype(&self, simple_name: &str) -> Option<Rc<ClassPrototype>> {
        for source in &self.sources {
            if let Some(Element::ClassPrototype(prototype)) =
                self.element(&format!("{}/{}", source.normalized_path, simple_name))
            {
                return Some(prototype);
            }
        }
        None
    }

    /// Resolve an identifier expression to an element: locals of the
    /// current function first, then the function's file scope, then global
    /// intrinsics. Property access resolution is a reserved seam.
    pub fn resolve_element(
        &self,
        expression: &Expression,
        current_function: &Function,
        fallback_path: &str,
    ) -> Option<Element> {
        match expression {
            Expression::Identifier(name) => {
                if let Some(local) = current_function.local(name) {
                    return Some(Element::Local(local));
                }
                let path = current_function
                    .internal_name
                    .rsplit_once('/')
                    .map(|(path, _)| path)
                    .unwrap_or(fallback_path);
                if let Some(element) = self.element(&format!("{}/{}", path, name)) {
                    return Some(element);
                }
                self.element(name)
            }
            Expression::Parenthesized(inner) => {
                self.resolve_element(inner, current_function, fallback_path)
            }
            _ => None,
        }
    }
}

impl FunctionPrototype {
    /// Resolve this prototype to a concrete instance for the given type
    /// arguments, reusing a cached instance when one exists.
    pub fn resolve(
        self: &Rc<FunctionPrototype>,
        program: &Program,
        type_arguments: &[Type],
    ) -> Option<Rc<Function>> {
        let declaration = self.declaration.as_ref()?;
        if declaration.type_parameters.len() != type_arguments.len() {
            program
                .diagnostics
                .error(DiagnosticCode::TypeArgumentMismatch {
                    expected: declaration.type_parameters.len(),
                    found: type_arguments.len(),
                });
            return None;
        }

        let instance_key = if type_arguments.is_empty() {
            self.internal_name.clone()
        } else {
            let names: Vec<String> = type_arguments.iter().map(|t| t.to_string()).collect();
            format!("{}<{}>", self.internal_name, names.join(","))
        };
        if let Some(instance) = self.instances.borrow().get(&instance_key) {
            return Some(instance.clone());
        }

        let mut type_argument_map = HashMap::with_capacity(type_arguments.len());
        for (name, ty) in declaration.type_parameters.iter().zip(type_arguments) {
            type_argument_map.insert(name.clone(), ty.clone());
        }

        let mut parameters = Vec::with_capacity(declaration.parameters.len());
        for param in &declaration.parameters {
            let ty = program.resolve_type(&param.type_node, Some(&type_argument_map), true)?;
            parameters.push(Parameter {
                name: param.name.clone(),
                ty,
            });
        }
        let return_type = match &declaration.return_type {
            Some(node) => program.resolve_type(node, Some(&type_argument_map), true)?,
            None => Type::Void,
        };

        let mut function = Function::new(
            instance_key.clone(),
            Some(declaration.clone()),
            parameters,
            return_type,
            type_argument_map,
            declaration.is_declare,
        );
        function.is_builtin = self.builtin.is_some();
        if let Some(class) = &self.instance_method_of {
            function.is_instance = true;
            function.instance_method_of = Some(class.clone());
        }
        let instance = Rc::new(function);
        self.instances
            .borrow_mut()
            .insert(instance_key, instance.clone());
        Some(instance)
    }
}
