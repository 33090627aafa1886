mod common;

use common::*;
use tsw_compiler::backend::{BinaryOp, Expr};
use tsw_compiler::codegen::Options;
use tsw_compiler::diagnostics::DiagnosticCode;
use tsw_compiler::types::NativeType;

#[test]
fn literal_const_global_is_emitted_inline() {
    let program = entry_program(vec![variable("X", Some("i32"), Some(int(42)), true, true)]);
    let module = compile(&program);

    let global = module.global("main/X").expect("X must be compiled");
    assert_eq!(global.ty, NativeType::I32);
    assert!(!global.mutable);
    assert_eq!(global.init, Expr::I32Const(42));
    // No start-function entry for a literal initializer.
    assert!(module.start().is_none());
}

#[test]
fn global_uses_the_native_type_of_its_logical_type() {
    let program = entry_program(vec![
        variable("A", Some("i64"), Some(int(7)), true, true),
        variable("B", Some("f64"), Some(float(1.5)), true, true),
        variable("C", Some("f32"), Some(float(0.5)), true, true),
    ]);
    let module = compile(&program);
    assert_eq!(module.global("main/A").unwrap().ty, NativeType::I64);
    assert_eq!(module.global("main/A").unwrap().init, Expr::I64Const(7));
    assert_eq!(module.global("main/B").unwrap().ty, NativeType::F64);
    assert_eq!(module.global("main/C").unwrap().ty, NativeType::F32);
}

#[test]
fn computed_global_defers_to_the_start_function() {
    let program = entry_program(vec![
        function("compute", vec![], Some("i32"), vec![ret(Some(int(42)))], false),
        variable("Y", Some("i32"), Some(call("compute", vec![])), false, true),
    ]);
    let module = compile(&program);
    assert!(!program.diagnostics.has_errors());

    let global = module.global("main/Y").expect("Y must be compiled");
    assert!(global.mutable);
    assert_eq!(global.init, Expr::I32Const(-1));

    // compute() is reachable through the initializer and must be compiled.
    assert!(module.function("main/compute").is_some());

    let start = module.function("start").expect("start must exist");
    assert_eq!(module.start(), Some("start"));
    let Expr::Block { body, .. } = &start.body else {
        panic!("start body must be a block");
    };
    assert_eq!(
        body[0],
        Expr::SetGlobal {
            name: "main/Y".to_string(),
            value: Box::new(Expr::Call {
                target: "main/compute".to_string(),
                operands: vec![],
                ty: NativeType::I32,
            }),
        }
    );
}

#[test]
fn uninitialized_global_gets_a_type_zero() {
    let program = entry_program(vec![variable("z", Some("f64"), None, false, true)]);
    let module = compile(&program);
    let global = module.global("main/z").unwrap();
    assert_eq!(global.init, Expr::F64Const(0.0));
    assert!(module.start().is_none());
}

#[test]
fn enum_members_fold_in_declaration_order() {
    let program = entry_program(vec![enum_decl(
        "E",
        vec![("A", None), ("B", None), ("C", Some(int(7))), ("D", None)],
        true,
    )]);
    let module = compile(&program);
    assert!(!program.diagnostics.has_errors());

    assert_eq!(module.global("main/E.A").unwrap().init, Expr::I32Const(0));
    assert_eq!(module.global("main/E.B").unwrap().init, Expr::I32Const(1));
    assert_eq!(module.global("main/E.C").unwrap().init, Expr::I32Const(7));
    assert_eq!(module.global("main/E.D").unwrap().init, Expr::I32Const(8));
    assert!(module.start().is_none());
}

#[test]
fn runtime_enum_initializers_chain_through_the_start_function() {
    let program = entry_program(vec![
        function("seed", vec![], Some("i32"), vec![ret(Some(int(3)))], false),
        enum_decl("E", vec![("A", Some(call("seed", vec![]))), ("B", None)], true),
    ]);
    let module = compile(&program);
    assert!(!program.diagnostics.has_errors());

    assert_eq!(module.global("main/E.A").unwrap().init, Expr::I32Const(-1));
    assert!(module.global("main/E.A").unwrap().mutable);
    assert_eq!(module.global("main/E.B").unwrap().init, Expr::I32Const(-1));

    let start = module.function("start").expect("start must exist");
    let Expr::Block { body, .. } = &start.body else {
        panic!("start body must be a block");
    };
    // Declaration order: A is materialized before B reads it.
    assert_eq!(
        body[0],
        Expr::SetGlobal {
            name: "main/E.A".to_string(),
            value: Box::new(Expr::Call {
                target: "main/seed".to_string(),
                operands: vec![],
                ty: NativeType::I32,
            }),
        }
    );
    assert_eq!(
        body[1],
        Expr::SetGlobal {
            name: "main/E.B".to_string(),
            value: Box::new(Expr::Binary {
                op: BinaryOp::AddI32,
                left: Box::new(Expr::GetGlobal {
                    name: "main/E.A".to_string(),
                    ty: NativeType::I32,
                }),
                right: Box::new(Expr::I32Const(1)),
            }),
        }
    );
}

#[test]
fn tree_shaking_skips_unexported_declarations() {
    let statements = vec![function("helper", vec![], None, vec![], false)];
    let shaken = entry_program(statements.clone());
    let module = compile(&shaken);
    assert!(module.function("main/helper").is_none());

    let kept = entry_program(statements);
    let module = compile_with(
        &kept,
        Options {
            no_tree_shaking: true,
            ..Options::default()
        },
    );
    assert!(module.function("main/helper").is_some());
}

#[test]
fn repeated_imports_compile_each_source_once() {
    let program = tsw_compiler::program::Program::new(vec![
        source("main", true, vec![import("lib"), import("lib")]),
        source("lib", false, vec![function("helper", vec![], None, vec![], false)]),
    ]);
    let module = compile_with(
        &program,
        Options {
            no_tree_shaking: true,
            ..Options::default()
        },
    );
    assert!(!program.diagnostics.has_errors());
    let count = module
        .functions()
        .iter()
        .filter(|f| f.name == "lib/helper")
        .count();
    assert_eq!(count, 1);
}

#[test]
fn missing_import_is_a_lookup_diagnostic() {
    let program = entry_program(vec![import("missing")]);
    let _module = compile(&program);
    assert!(program
        .diagnostics
        .contains(|d| d.code == DiagnosticCode::FileNotFound("missing".to_string())));
}

#[test]
fn export_statement_materializes_under_the_exported_name() {
    let program = entry_program(vec![
        function("f", vec![], None, vec![], false),
        export(vec![("f", "renamed")], None),
    ]);
    let module = compile(&program);
    assert!(module.function("main/f").is_some());
    assert_eq!(module.exports().len(), 1);
    assert_eq!(module.exports()[0].external_name, "renamed");
}

#[test]
fn foreign_re_export_compiles_the_other_source() {
    let program = tsw_compiler::program::Program::new(vec![
        source("main", true, vec![export(vec![("g", "g")], Some("lib"))]),
        source("lib", false, vec![function("g", vec![], None, vec![], false)]),
    ]);
    let module = compile(&program);
    assert!(!program.diagnostics.has_errors());
    assert!(module.function("lib/g").is_some());
    assert_eq!(module.exports()[0].external_name, "g");
    assert_eq!(module.exports()[0].internal_name, "lib/g");
}

#[test]
fn loose_top_level_statements_collect_into_the_start_function() {
    let program = entry_program(vec![expr_stmt(int(1))]);
    let module = compile(&program);
    let start = module.function("start").expect("start must exist");
    let Expr::Block { body, .. } = &start.body else {
        panic!("start body must be a block");
    };
    assert_eq!(body[0], Expr::Drop {
        value: Box::new(Expr::I32Const(1)),
    });
}

#[test]
fn namespace_members_compile_but_namespaces_stay_flagged() {
    use std::rc::Rc;
    use tsw_compiler::ast::{NamespaceDeclaration, Statement};
    let ns = Statement::Namespace(Rc::new(NamespaceDeclaration {
        name: "NS".to_string(),
        members: vec![function("inner", vec![], None, vec![], true)],
        is_export: true,
    }));
    let program = entry_program(vec![ns]);
    let module = compile(&program);
    assert!(module.function("main/NS.inner").is_some());
    assert!(program
        .diagnostics
        .contains(|d| d.code == DiagnosticCode::NotImplemented("namespaces")));
}
