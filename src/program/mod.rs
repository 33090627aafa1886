//! Program representation
//!
//! A [`Program`] is the read-only view the upstream parser/resolver hands
//! to the code generator: the ordered sources, the element table keyed by
//! hierarchical internal name, the named-export table, and the diagnostic
//! sink. The resolver half (element seeding, type and identifier
//! resolution) lives in `resolver`.

mod elements;
mod resolver;

pub use elements::{
    Builtin, Class, ClassPrototype, ConstantValue, Element, Enum, EnumMember, Field, Function,
    FunctionPrototype, Global, Local, Namespace, Parameter,
};

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use crate::ast::Statement;
use crate::diagnostics::Diagnostics;
use crate::types::{Target, Type};

/// A single parsed file.
#[derive(Debug)]
pub struct Source {
    pub normalized_path: String,
    pub is_entry: bool,
    pub statements: Vec<Statement>,
}

#[derive(Debug)]
pub struct Program {
    pub sources: Vec<Source>,
    pub diagnostics: Diagnostics,
    elements: RefCell<HashMap<String, Element>>,
    exports: RefCell<HashMap<String, String>>,
    target: Cell<Target>,
}

impl Program {
    pub fn new(sources: Vec<Source>) -> Program {
        Program {
            sources,
            diagnostics: Diagnostics::new(),
            elements: RefCell::new(HashMap::new()),
            exports: RefCell::new(HashMap::new()),
            target: Cell::new(Target::Wasm32),
        }
    }

    pub fn target(&self) -> Target {
        self.target.get()
    }

    pub(crate) fn set_target(&self, target: Target) {
        self.target.set(target);
    }

    pub fn source(&self, normalized_path: &str) -> Option<&Source> {
        self.sources
            .iter()
            .find(|s| s.normalized_path == normalized_path)
    }

    pub fn element(&self, internal_name: &str) -> Option<Element> {
        self.elements.borrow().get(internal_name).cloned()
    }

    pub fn add_element(&self, internal_name: &str, element: Element) {
        self.elements
            .borrow_mut()
            .insert(internal_name.to_string(), element);
    }

    pub(crate) fn record_export(&self, exported_name: &str, internal_name: &str) {
        self.exports
            .borrow_mut()
            .insert(exported_name.to_string(), internal_name.to_string());
    }

    /// Exported name to internal name, as declared by export statements.
    pub fn exports(&self) -> HashMap<String, String> {
        self.exports.borrow().clone()
    }

    /// The concrete `usize` type for the initialized target.
    pub fn usize_type(&self) -> Type {
        self.target.get().usize_type()
    }
}
