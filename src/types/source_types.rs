//! Source-level type definitions
//!
//! The surface language is statically typed; every type an expression can
//! take is one of the variants below. Small integers (narrower than 32
//! bits) have no direct WebAssembly representation and are carried as i32
//! with explicit sign-extension or masking on production.

use std::fmt;

use super::NativeType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Void,
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    /// Pointer-sized unsigned integer; `size` is fixed in bits (32 or 64)
    /// when the resolver is initialized for a target.
    USize { size: u32 },
    /// Reference to a class instance; represented as a pointer into linear
    /// memory, so its width follows the target like `usize`.
    Class { name: String, size: u32 },
}

impl Type {
    pub fn is_any_float(&self) -> bool {
        matches!(self, Type::F32 | Type::F64)
    }

    pub fn is_any_integer(&self) -> bool {
        matches!(
            self,
            Type::Bool
                | Type::I8
                | Type::I16
                | Type::I32
                | Type::I64
                | Type::U8
                | Type::U16
                | Type::U32
                | Type::U64
                | Type::USize { .. }
        )
    }

    /// 64-bit integers, including `usize` on 64-bit targets.
    pub fn is_long_integer(&self) -> bool {
        match self {
            Type::I64 | Type::U64 => true,
            Type::USize { size } => *size == 64,
            _ => false,
        }
    }

    pub fn is_signed_integer(&self) -> bool {
        matches!(self, Type::I8 | Type::I16 | Type::I32 | Type::I64)
    }

    /// Integers narrower than 32 bits, represented as i32 with explicit
    /// normalization.
    pub fn is_small_integer(&self) -> bool {
        matches!(self, Type::Bool | Type::I8 | Type::I16 | Type::U8 | Type::U16)
    }

    /// Size in bits.
    pub fn size(&self) -> u32 {
        match self {
            Type::Void => 0,
            Type::Bool => 1,
            Type::I8 | Type::U8 => 8,
            Type::I16 | Type::U16 => 16,
            Type::I32 | Type::U32 | Type::F32 => 32,
            Type::I64 | Type::U64 | Type::F64 => 64,
            Type::USize { size } | Type::Class { size, .. } => *size,
        }
    }

    /// Size in bytes, rounding bit widths up.
    pub fn byte_size(&self) -> u32 {
        (self.size() + 7) / 8
    }

    /// Shift amount of the shl/shr pair that sign-extends a small integer
    /// held in an i32.
    pub fn small_integer_shift(&self) -> u32 {
        32 - self.size()
    }

    /// Low-bits mask that zero-extends a small unsigned integer held in an
    /// i32.
    pub fn small_integer_mask(&self) -> i32 {
        (u32::MAX >> (32 - self.size())) as i32
    }

    /// Project onto the WebAssembly value kind this type occupies.
    pub fn native_type(&self) -> NativeType {
        match self {
            Type::Void => NativeType::None,
            Type::F32 => NativeType::F32,
            Type::F64 => NativeType::F64,
            Type::I64 | Type::U64 => NativeType::I64,
            Type::USize { size } | Type::Class { size, .. } => {
                if *size == 64 {
                    NativeType::I64
                } else {
                    NativeType::I32
                }
            }
            _ => NativeType::I32,
        }
    }

    /// The integer type a class reference is carried as. Conversions only
    /// ever see machine-level types.
    pub fn machine_type(&self) -> Type {
        match self {
            Type::Class { size, .. } => Type::USize { size: *size },
            other => other.clone(),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Type::Void => "void",
            Type::Bool => "bool",
            Type::I8 => "i8",
            Type::I16 => "i16",
            Type::I32 => "i32",
            Type::I64 => "i64",
            Type::U8 => "u8",
            Type::U16 => "u16",
            Type::U32 => "u32",
            Type::U64 => "u64",
            Type::F32 => "f32",
            Type::F64 => "f64",
            Type::USize { .. } => "usize",
            Type::Class { name, .. } => name,
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_integer_masks_and_shifts() {
        assert_eq!(Type::Bool.small_integer_mask(), 1);
        assert_eq!(Type::U8.small_integer_mask(), 0xff);
        assert_eq!(Type::U16.small_integer_mask(), 0xffff);
        assert_eq!(Type::I8.small_integer_shift(), 24);
        assert_eq!(Type::I16.small_integer_shift(), 16);
    }

    #[test]
    fn usize_follows_target_width() {
        use crate::types::Target;
        assert_eq!(Target::Wasm32.usize_type().native_type(), NativeType::I32);
        assert_eq!(Target::Wasm64.usize_type().native_type(), NativeType::I64);
        assert!(Target::Wasm64.usize_type().is_long_integer());
    }

    #[test]
    fn byte_size_rounds_up() {
        assert_eq!(Type::Bool.byte_size(), 1);
        assert_eq!(Type::I16.byte_size(), 2);
        assert_eq!(Type::F64.byte_size(), 8);
    }
}
