//! Backend expression nodes
//!
//! A small, Binaryen-flavored tree IR. Structured control flow keeps its
//! labels as strings; they are resolved to relative branch depths only when
//! the module is assembled to binary. Every statement is an expression of
//! native type `None`.

use crate::types::NativeType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    // Integer unaries
    ClzI32,
    CtzI32,
    PopcntI32,
    EqzI32,
    ClzI64,
    CtzI64,
    PopcntI64,
    EqzI64,
    // Float unaries
    NegF32,
    AbsF32,
    CeilF32,
    FloorF32,
    TruncF32,
    NearestF32,
    SqrtF32,
    NegF64,
    AbsF64,
    CeilF64,
    FloorF64,
    TruncF64,
    NearestF64,
    SqrtF64,
    // Width changes
    WrapI64,
    ExtendSI32,
    ExtendUI32,
    PromoteF32,
    DemoteF64,
    // Float to integer truncations
    TruncSF32ToI32,
    TruncUF32ToI32,
    TruncSF32ToI64,
    TruncUF32ToI64,
    TruncSF64ToI32,
    TruncUF64ToI32,
    TruncSF64ToI64,
    TruncUF64ToI64,
    // Integer to float conversions
    ConvertSI32ToF32,
    ConvertUI32ToF32,
    ConvertSI32ToF64,
    ConvertUI32ToF64,
    ConvertSI64ToF32,
    ConvertUI64ToF32,
    ConvertSI64ToF64,
    ConvertUI64ToF64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    AddI32,
    SubI32,
    MulI32,
    DivSI32,
    DivUI32,
    RemSI32,
    RemUI32,
    AndI32,
    OrI32,
    XorI32,
    ShlI32,
    ShrSI32,
    ShrUI32,
    RotlI32,
    RotrI32,
    EqI32,
    NeI32,
    LtSI32,
    LtUI32,
    LeSI32,
    LeUI32,
    GtSI32,
    GtUI32,
    GeSI32,
    GeUI32,
    AddI64,
    SubI64,
    MulI64,
    DivSI64,
    DivUI64,
    RemSI64,
    RemUI64,
    AndI64,
    OrI64,
    XorI64,
    ShlI64,
    ShrSI64,
    ShrUI64,
    RotlI64,
    RotrI64,
    EqI64,
    NeI64,
    LtSI64,
    LtUI64,
    LeSI64,
    LeUI64,
    GtSI64,
    GtUI64,
    GeSI64,
    GeUI64,
    AddF32,
    SubF32,
    MulF32,
    DivF32,
    CopysignF32,
    MinF32,
    MaxF32,
    EqF32,
    NeF32,
    LtF32,
    LeF32,
    GtF32,
    GeF32,
    AddF64,
    SubF64,
    MulF64,
    DivF64,
    CopysignF64,
    MinF64,
    MaxF64,
    EqF64,
    NeF64,
    LtF64,
    LeF64,
    GtF64,
    GeF64,
}

/// Operations that talk to the embedding host rather than the value stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOp {
    CurrentMemory,
    GrowMemory,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    I32Const(i32),
    I64Const(i64),
    F32Const(f32),
    F64Const(f64),
    Unary {
        op: UnaryOp,
        value: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Host {
        op: HostOp,
        operands: Vec<Expr>,
    },
    Block {
        label: Option<String>,
        body: Vec<Expr>,
        ty: NativeType,
    },
    Loop {
        label: String,
        body: Box<Expr>,
    },
    If {
        condition: Box<Expr>,
        if_true: Box<Expr>,
        if_false: Option<Box<Expr>>,
    },
    /// Branch to the end of the labelled block (or back to the labelled
    /// loop header); conditional when `condition` is present.
    Break {
        label: String,
        condition: Option<Box<Expr>>,
    },
    Return {
        value: Option<Box<Expr>>,
    },
    Nop,
    Unreachable,
    Drop {
        value: Box<Expr>,
    },
    Select {
        condition: Box<Expr>,
        if_true: Box<Expr>,
        if_false: Box<Expr>,
    },
    GetLocal {
        index: u32,
        ty: NativeType,
    },
    SetLocal {
        index: u32,
        value: Box<Expr>,
    },
    TeeLocal {
        index: u32,
        value: Box<Expr>,
        ty: NativeType,
    },
    GetGlobal {
        name: String,
        ty: NativeType,
    },
    SetGlobal {
        name: String,
        value: Box<Expr>,
    },
    Call {
        target: String,
        operands: Vec<Expr>,
        ty: NativeType,
    },
    CallImport {
        target: String,
        operands: Vec<Expr>,
        ty: NativeType,
    },
}

impl Expr {
    /// Constant nodes are the only valid global initializers.
    pub fn is_constant(&self) -> bool {
        matches!(
            self,
            Expr::I32Const(_) | Expr::I64Const(_) | Expr::F32Const(_) | Expr::F64Const(_)
        )
    }
}
