mod common;

use common::*;
use tsw_compiler::ast::BinaryOperator;
use tsw_compiler::backend::{BinaryOp, Expr};
use tsw_compiler::codegen::Options;
use tsw_compiler::driver::compile_to_wasm;
use tsw_compiler::types::NativeType;

#[test]
fn empty_entry_source_produces_bare_module() {
    let program = entry_program(vec![]);
    let module = compile(&program);

    assert!(module.functions().is_empty());
    assert!(module.globals().is_empty());
    assert!(module.exports().is_empty());
    assert!(module.start().is_none());

    let memory = module.memory().expect("memory must always be declared");
    assert_eq!(memory.initial_pages, 1);
    assert_eq!(memory.export_name.as_deref(), Some("memory"));
    // Only the heap-start pointer segment, at offset sizeof(usize),
    // containing little-endian 2*sizeof(usize).
    assert_eq!(memory.segments.len(), 1);
    assert_eq!(memory.segments[0].offset, 4);
    assert_eq!(memory.segments[0].bytes, 8u32.to_le_bytes().to_vec());
    assert!(!program.diagnostics.has_errors());
}

#[test]
fn exported_add_function_compiles_to_single_return() {
    let program = entry_program(vec![function(
        "add",
        vec![param("a", "i32"), param("b", "i32")],
        Some("i32"),
        vec![ret(Some(binary(
            BinaryOperator::Add,
            ident("a"),
            ident("b"),
        )))],
        true,
    )]);
    let module = compile(&program);
    assert!(!program.diagnostics.has_errors());

    let types = module.function_types();
    assert_eq!(types.len(), 1);
    assert_eq!(types[0].params, vec![NativeType::I32, NativeType::I32]);
    assert_eq!(types[0].result, NativeType::I32);

    let function = module.function("main/add").expect("add must be compiled");
    let expected = Expr::Block {
        label: None,
        body: vec![Expr::Return {
            value: Some(Box::new(Expr::Binary {
                op: BinaryOp::AddI32,
                left: Box::new(Expr::GetLocal {
                    index: 0,
                    ty: NativeType::I32,
                }),
                right: Box::new(Expr::GetLocal {
                    index: 1,
                    ty: NativeType::I32,
                }),
            })),
        }],
        ty: NativeType::None,
    };
    assert_eq!(function.body, expected);

    assert_eq!(module.exports().len(), 1);
    assert_eq!(module.exports()[0].external_name, "add");
    assert_eq!(module.exports()[0].internal_name, "main/add");
    assert!(module.start().is_none());
}

#[test]
fn generates_well_formed_wasm_bytes() {
    let program = entry_program(vec![function(
        "add",
        vec![param("a", "i32"), param("b", "i32")],
        Some("i32"),
        vec![ret(Some(binary(
            BinaryOperator::Add,
            ident("a"),
            ident("b"),
        )))],
        true,
    )]);
    let bytes = compile_to_wasm(&program, Options::default());
    assert!(bytes.len() > 8, "wasm bytes should be non-trivial");
    assert_eq!(&bytes[0..4], b"\0asm");

    let wat = tsw_compiler::driver::wasm_to_wat(&bytes).expect("binary should print as WAT");
    assert!(wat.contains("(module"));
    assert!(wat.contains("export \"add\""));
    assert!(wat.contains("export \"memory\""));
}
